//! HTTP endpoint handlers organized by surface.

pub mod bus;
pub mod notifications;
pub mod stream;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes every route the broadcaster serves.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(stream::routes())
        .merge(bus::routes())
        .merge(notifications::routes())
        .merge(system::routes())
}
