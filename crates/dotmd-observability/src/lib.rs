//! Process-start observability for the `dotmd` CLI and `dotmd-indexer`
//! service: `tracing` initialisation and a small health-report shape.
//! Library crates never call into this — only the two binaries do, once,
//! at startup.

pub mod health;
pub mod tracing_init;

pub use health::{HealthCheckResult, HealthReport, HealthStatus};
pub use tracing_init::init_tracing;
