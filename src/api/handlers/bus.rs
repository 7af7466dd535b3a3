//! Bus push endpoint.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;

use crate::app_state::AppState;

/// `POST /_internal/pubsub-handler`: Receive one pushed bus message.
///
/// Always answers `200` so the bus never redelivers. The body is `OK` when
/// the event was dispatched and `ERROR` when the envelope was rejected.
#[utoipa::path(
    post,
    path = "/_internal/pubsub-handler",
    tag = "Bus",
    summary = "Bus push delivery",
    description = "Accepts a push envelope whose `message.data` is a base64-encoded notification event, fans it out to live streams and acknowledges it.",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Acknowledged; body is OK or ERROR", body = String, content_type = "text/plain"),
    )
)]
pub async fn pubsub_push(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let ack = state.bus.handle_push(&body).await;
    (StatusCode::OK, ack.body())
}

/// Bus routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/_internal/pubsub-handler", post(pubsub_push))
}
