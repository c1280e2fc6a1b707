//! Observability for Novacast
//!
//! Metrics are kept in a private Prometheus registry and rendered on demand
//! by the HTTP layer (`GET /metrics`). Nothing is pushed.

pub mod metrics;

pub use metrics::Metrics;
