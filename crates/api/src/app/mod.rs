//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the operations behind each route (store, tokens, mail)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs, extractors and envelope helpers
//! - `errors.rs`: consistent failure envelopes

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{Extension, Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// `/health` is public, `/api/auth/*` needs no session, every other `/api`
/// route goes through the bearer-token middleware.
pub fn build_app(services: Arc<AppServices>, cors_allow_origin: Option<&str>) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.validator(),
    };

    let protected = routes::router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    let api = Router::new()
        .nest("/auth", routes::auth::router())
        .merge(protected)
        .layer(Extension(services));

    let app = Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http());

    match cors_allow_origin.map(cors_layer) {
        Some(Some(cors)) => app.layer(cors),
        Some(None) => {
            tracing::warn!(origin = ?cors_allow_origin, "ignoring unparsable CORS origin");
            app
        }
        None => app,
    }
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin.trim() == "*" {
        return Some(layer.allow_origin(Any));
    }
    origin
        .trim()
        .parse::<HeaderValue>()
        .ok()
        .map(|value| layer.allow_origin(value))
}
