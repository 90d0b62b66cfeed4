use serde::Serialize;
use utoipa::ToSchema;

/// Liveness payload returned by `/healthcheck`.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct HealthResponse {
    /// `ok` while a store is installed and healthy, `degraded` otherwise.
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }

    /// Writes are rejected with 503 until storage comes back.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".into(),
        }
    }
}
