//! Health and observability DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ConnectionCounts;

/// Response body for `GET /health`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Crate version.
    pub version: String,
    /// Registry key counts.
    pub active_connections: ConnectionCounts,
}
