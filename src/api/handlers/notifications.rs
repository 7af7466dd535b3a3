//! Reconciliation and read-receipt endpoints.
//!
//! Clients call these after (re)connecting to fetch what they missed while
//! offline, and to acknowledge what they have shown.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::api::dto::{ListNotificationsParams, MarkReadParams, NotificationListResponse};
use crate::app_state::AppState;
use crate::domain::{DeliveryStatus, MessageId, RecipientDescriptor, UserId};
use crate::error::{BroadcasterError, ErrorResponse};

fn required_user(user_id: Option<String>) -> Result<UserId, BroadcasterError> {
    user_id
        .map(UserId::new)
        .filter(|u| !u.is_blank())
        .ok_or(BroadcasterError::MissingRecipient)
}

/// `GET /notifications`: List a user's notifications by status.
///
/// # Errors
///
/// Returns [`BroadcasterError::MissingRecipient`] without `userId`,
/// [`BroadcasterError::InvalidRequest`] for an unknown `status`, or
/// [`BroadcasterError::Storage`] if the store fails.
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    summary = "List notifications",
    description = "Returns the user's individually addressed notifications with the given status (default `pending`), newest first.",
    params(ListNotificationsParams),
    responses(
        (status = 200, description = "Matching notifications", body = NotificationListResponse),
        (status = 400, description = "Missing userId or unknown status", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(params): Query<ListNotificationsParams>,
) -> Result<impl IntoResponse, BroadcasterError> {
    let user_id = required_user(params.user_id)?;
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => DeliveryStatus::default(),
        Some(raw) => raw
            .parse::<DeliveryStatus>()
            .map_err(BroadcasterError::InvalidRequest)?,
    };
    let notifications = state.store.list_for_user(&user_id, status).await?;

    Ok(Json(NotificationListResponse {
        user_id: user_id.to_string(),
        status,
        count: notifications.len(),
        notifications,
    }))
}

/// `PATCH /notifications/{id}/read`: Mark a notification read.
///
/// Group and broadcast notifications may be acknowledged by any user;
/// individual ones only by their addressee.
///
/// # Errors
///
/// Returns [`BroadcasterError::NotificationNotFound`] for an unknown ID,
/// [`BroadcasterError::Forbidden`] when another user is the addressee, or
/// [`BroadcasterError::Storage`] if the store fails.
#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    tag = "Notifications",
    summary = "Mark notification read",
    params(
        ("id" = String, Path, description = "Notification message ID"),
        MarkReadParams,
    ),
    responses(
        (status = 204, description = "Marked read (idempotent)"),
        (status = 400, description = "Missing userId", body = ErrorResponse),
        (status = 403, description = "Not addressed to this user", body = ErrorResponse),
        (status = 404, description = "Unknown notification", body = ErrorResponse),
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<MarkReadParams>,
) -> Result<impl IntoResponse, BroadcasterError> {
    let user_id = required_user(params.user_id)?;
    let message_id = MessageId::new(id);

    let Some(stored) = state.store.find(&message_id).await? else {
        return Err(BroadcasterError::NotificationNotFound(message_id));
    };
    if let RecipientDescriptor::Individual(addressee) = &stored.recipient
        && *addressee != user_id
    {
        return Err(BroadcasterError::Forbidden(message_id));
    }

    let changed = state.store.mark_read(&message_id).await?;
    tracing::info!(%message_id, %user_id, changed, "notification marked read");
    Ok(StatusCode::NO_CONTENT)
}

/// Notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", patch(mark_read))
}
