use serde::Serialize;
use utoipa::ToSchema;

/// Body of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: &'static str,
    /// `true` while draws can neither be read nor recorded.
    pub degraded: bool,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            degraded: false,
        }
    }

    pub fn degraded() -> Self {
        Self {
            status: "degraded",
            degraded: true,
        }
    }
}
