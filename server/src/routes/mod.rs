use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, Config, SecurityHeadersLayer};
use crate::handlers::{auth, events, health_check};
use crate::state::AppState;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/status", patch(events::update_event_status))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
}

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(SecurityHeadersLayer::new(config.production))
        .layer(create_cors_layer(config.cors_allowed_origins.as_deref()))
        .with_state(state)
}
