// Market input domain
pub mod market;

// Model outputs and consensus
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
