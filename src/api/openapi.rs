//! OpenAPI document for the broadcaster's HTTP surface.

use utoipa::OpenApi;

use crate::api::dto::{HealthResponse, NotificationListResponse};
use crate::domain::ConnectionCounts;
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI description, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "pushify-broadcaster",
        description = "Real-time notification fan-out over Server-Sent Events."
    ),
    paths(
        crate::api::handlers::stream::open_stream,
        crate::api::handlers::bus::pubsub_push,
        crate::api::handlers::notifications::list_notifications,
        crate::api::handlers::notifications::mark_read,
        crate::api::handlers::system::health_handler,
    ),
    components(schemas(
        HealthResponse,
        ConnectionCounts,
        NotificationListResponse,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Stream", description = "Long-lived event streams"),
        (name = "Bus", description = "Inbound bus push"),
        (name = "Notifications", description = "Reconciliation and read receipts"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;
