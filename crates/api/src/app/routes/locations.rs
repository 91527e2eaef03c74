//! Read-only location lookups for the user form. Any session may read them.

use std::sync::Arc;

use axum::{
    Extension, Router,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::app::dto::{self, PathId};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/countries", get(countries))
        .route("/countries/:id/states", get(states))
        .route("/states/:id/cities", get(cities))
}

pub async fn countries(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.countries().await {
        Ok(countries) => dto::ok("Countries", countries),
        Err(e) => e.into_response(),
    }
}

pub async fn states(
    Extension(services): Extension<Arc<AppServices>>,
    PathId(country_id): PathId<i32>,
) -> Response {
    match services.states(country_id).await {
        Ok(states) => dto::ok("States", states),
        Err(e) => e.into_response(),
    }
}

pub async fn cities(
    Extension(services): Extension<Arc<AppServices>>,
    PathId(state_id): PathId<i32>,
) -> Response {
    match services.cities(state_id).await {
        Ok(cities) => dto::ok("Cities", cities),
        Err(e) => e.into_response(),
    }
}
