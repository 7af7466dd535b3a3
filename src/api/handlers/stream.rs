//! Streaming endpoint: one long-lived SSE response per client connection.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::header::{self, HeaderName};
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::api::dto::StreamParams;
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{BroadcasterError, ErrorResponse};
use crate::session::ConnectionSession;

/// `GET /stream/{user_id}`: Open a notification stream.
///
/// The first frame is a `connected` acknowledgment. Notifications and
/// periodic `heartbeat` frames follow until the client disconnects.
///
/// # Errors
///
/// Returns [`BroadcasterError::MissingRecipient`] if `user_id` is blank.
#[utoipa::path(
    get,
    path = "/stream/{user_id}",
    tag = "Stream",
    summary = "Open a notification stream",
    description = "Opens a text/event-stream response delivering `connected`, `notification` and `heartbeat` events for the user and the listed groups.",
    params(
        ("user_id" = String, Path, description = "Authenticated user identifier"),
        StreamParams,
    ),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = String),
        (status = 400, description = "Missing user identifier", body = ErrorResponse),
    )
)]
pub async fn open_stream(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<StreamParams>,
) -> Result<Response, BroadcasterError> {
    let (_session, stream) = ConnectionSession::open(
        state.registry,
        UserId::new(user_id),
        params.group_ids(),
        state.session_config,
    )
    .await?;

    // Sse sets the content type and `Cache-Control: no-cache`.
    let headers = [
        (header::CONNECTION, "keep-alive"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    Ok((headers, Sse::new(stream)).into_response())
}

/// `GET /stream`: Rejected: a stream needs a user.
///
/// # Errors
///
/// Always returns [`BroadcasterError::MissingRecipient`].
pub async fn missing_user() -> Result<Response, BroadcasterError> {
    Err(BroadcasterError::MissingRecipient)
}

/// Streaming routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stream", get(missing_user))
        .route("/stream/", get(missing_user))
        .route("/stream/{user_id}", get(open_stream))
}
