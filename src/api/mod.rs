//! HTTP layer: route handlers, DTOs, and router composition.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::error::BroadcasterError;

async fn not_found() -> BroadcasterError {
    BroadcasterError::EndpointNotFound
}

/// Builds the router with every endpoint and the JSON 404 fallback.
pub fn build_router() -> Router<AppState> {
    let router = handlers::routes().fallback(not_found);

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
}

/// Builds the complete, state-bound application with tracing and CORS.
pub fn build_app(state: AppState) -> Router {
    build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
