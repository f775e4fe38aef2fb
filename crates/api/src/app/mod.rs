//! Router assembly for the admin HTTP API.
//!
//! - `services.rs`: storage, seeding and audit worker startup
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: query DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use axum::{
    Extension, Router,
    body::Body,
    http::Request,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use schoolmart_admin::ServiceContext;
use schoolmart_observability::new_request_id;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router around an already-wired service context.
pub fn build_app(ctx: ServiceContext) -> Router {
    let auth_state = middleware::AuthState {
        jwt: ctx.tokens.clone(),
    };

    // Protected routes: auth runs first, then the op-log recorder.
    let protected = Router::new()
        .nest("/api/v1", routes::router())
        .layer(from_fn_with_state(ctx.clone(), middleware::audit_middleware))
        .layer(from_fn_with_state(auth_state, middleware::auth_middleware));

    Router::new()
        .route("/ping", get(routes::system::ping))
        .route("/health", get(routes::system::health))
        .route("/api/v1/system/login", post(routes::auth::login))
        .merge(protected)
        .layer(Extension(ctx))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                request_id = %new_request_id(),
                method = %req.method(),
                uri = %req.uri(),
            )
        }))
        .layer(CorsLayer::permissive())
}
