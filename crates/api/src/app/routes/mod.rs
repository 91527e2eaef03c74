use axum::{Router, routing::get};

pub mod auth;
pub mod cms;
pub mod faqs;
pub mod locations;
pub mod roles;
pub mod system;
pub mod users;

/// Routes that require an authenticated session (mounted under `/api`).
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/users", users::router())
        .nest("/roles", roles::router())
        .nest("/cms", cms::router())
        .nest("/faqs", faqs::router())
        .nest("/locations", locations::router())
}
