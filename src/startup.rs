use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{handlers, middleware, openapi::ApiDoc};

pub fn build_router(state: Arc<crate::AppState>) -> Router {
    let allowed_origin = match state.config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(
                error = %e,
                origin = %state.config.cors_origin,
                "Invalid CORS origin, falling back to localhost"
            );
            HeaderValue::from_static("http://localhost:3000")
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-actor-id"),
            HeaderName::from_static("x-actor-role"),
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true);

    // Listing routes
    let listing_routes = Router::new()
        .route("/", post(handlers::listings_handler::create_listing))
        .route("/{id}", get(handlers::listings_handler::get_listing))
        .route("/{id}", delete(handlers::listings_handler::cancel_listing))
        .route("/{id}/claim", post(handlers::listings_handler::claim_listing))
        .route("/{id}/review", post(handlers::listings_handler::review_listing));

    // Swap routes
    let swap_routes = Router::new()
        .route("/", post(handlers::swaps_handler::create_swap))
        .route("/{id}", get(handlers::swaps_handler::get_swap))
        .route("/{id}", delete(handlers::swaps_handler::cancel_swap))
        .route("/{id}/confirm", post(handlers::swaps_handler::confirm_swap))
        .route("/{id}/review", post(handlers::swaps_handler::review_swap));

    // Marketplace views plus the two resource collections
    let marketplace_routes = Router::new()
        .route("/open", get(handlers::listings_handler::get_open_listings))
        .route("/incoming", get(handlers::swaps_handler::get_incoming_swaps))
        .route("/my", get(handlers::overview_handler::get_my_requests))
        .route("/approvals", get(handlers::overview_handler::get_approvals_queue))
        .route("/dashboard", get(handlers::overview_handler::get_dashboard))
        .nest("/listings", listing_routes)
        .nest("/swaps", swap_routes);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/marketplace", marketplace_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(middleware::request_id_middleware))
        .layer(cors)
        .with_state(state)
}
