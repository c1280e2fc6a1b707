// Historical price input
pub mod series;
pub mod timeframe;
