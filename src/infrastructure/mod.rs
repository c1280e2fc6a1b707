pub mod bars_csv;
pub mod ml;
pub mod mock;
pub mod observability;
