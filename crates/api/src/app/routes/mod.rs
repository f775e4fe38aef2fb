use axum::{Router, middleware::from_fn, routing::get};

use crate::middleware::require_platform_role;

pub mod accounts;
pub mod auth;
pub mod logs;
pub mod schools;
pub mod suppliers;
pub mod system;

/// Router for all authenticated endpoints (mounted under `/api/v1`).
pub fn router() -> Router {
    Router::new()
        .route("/system/whoami", get(system::whoami))
        .nest("/accounts", accounts::router())
        .nest("/schools", schools::router().route_layer(from_fn(require_platform_role)))
        .nest("/suppliers", suppliers::router().route_layer(from_fn(require_platform_role)))
        .nest("/logs", logs::router())
}
