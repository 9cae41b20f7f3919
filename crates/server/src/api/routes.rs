use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, track, ws};
use crate::metrics::metrics_handler;
use crate::pages;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let assets_dir = state.branding().assets_dir.clone();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::tracker_status))
        // Tracking sessions
        .route("/track", post(track::start_tracking))
        .route(
            "/track/{id}",
            get(track::get_session).delete(track::clear_session),
        )
        .route("/track/{id}/dismiss", post(track::dismiss))
        .route("/track/{id}/ws", get(ws::ws_handler))
        .with_state(Arc::clone(&state));

    // Customer pages
    let page_routes = Router::new()
        .route("/", get(pages::index))
        .route(
            "/ticket",
            get(pages::search_form).post(pages::submit_search),
        )
        .route("/ticket/{suffix}", get(pages::search_form_prefilled))
        .route("/ticket/session/{id}", get(pages::session_page))
        .route("/ticket/session/{id}/dismiss", post(pages::dismiss))
        .route("/ticket/session/{id}/clear", post(pages::clear))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .merge(page_routes);

    // Logo and other branding files
    if let Some(dir) = assets_dir {
        router = router.nest_service("/assets", ServeDir::new(dir));
    }

    router
        .fallback(|| async { (StatusCode::NOT_FOUND, "404 Not Found") })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
