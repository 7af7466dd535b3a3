//! Reconciliation and read-receipt DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{DeliveryStatus, NotificationEvent};

/// Query string of `GET /notifications`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListNotificationsParams {
    /// User whose notifications to list.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Status filter (`pending`, `delivered`, `read`). Defaults to `pending`.
    #[serde(default)]
    pub status: Option<String>,
}

/// Response body of `GET /notifications`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    /// Echo of the queried user.
    pub user_id: String,
    /// Echo of the status filter.
    #[schema(value_type = String)]
    pub status: DeliveryStatus,
    /// Number of notifications returned.
    pub count: usize,
    /// Matching notification documents, newest first.
    #[schema(value_type = Vec<Object>)]
    pub notifications: Vec<NotificationEvent>,
}

/// Query string of `PATCH /notifications/{id}/read`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MarkReadParams {
    /// User acknowledging the notification.
    #[serde(default)]
    pub user_id: Option<String>,
}
