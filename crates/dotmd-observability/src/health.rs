//! A small health-report shape for the service's `/healthz` endpoint and
//! JSON-RPC `service.info` method. Thin compared to a production
//! multi-dependency health framework: dotmd has exactly one dependency
//! worth reporting on — whether an index has been built yet.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<HealthCheckResult>,
}

impl HealthReport {
    /// `Degraded` when no index has been built yet (queries will fail with
    /// `IndexMissing`, but indexing still works), `Healthy` otherwise.
    pub fn from_index_presence(index_exists: bool) -> Self {
        let check = if index_exists {
            HealthCheckResult {
                name: "index".to_string(),
                status: HealthStatus::Healthy,
                message: "index present".to_string(),
            }
        } else {
            HealthCheckResult {
                name: "index".to_string(),
                status: HealthStatus::Degraded,
                message: "no index built yet; run `dotmd index` first".to_string(),
            }
        };
        Self {
            status: check.status,
            checks: vec![check],
        }
    }
}
