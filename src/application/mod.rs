// Model adapters and registry
pub mod ml;

// Request orchestration
pub mod forecast_service;
