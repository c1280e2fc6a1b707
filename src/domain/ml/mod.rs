pub mod consensus;
pub mod feature_registry;
pub mod prediction;
