use axum::{Extension, http::StatusCode, response::Response};

use crate::app::dto;
use crate::context::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(session): Extension<SessionContext>) -> Response {
    dto::ok(
        "Session",
        dto::WhoAmI {
            user_id: session.user_id(),
            roles: session.roles().to_vec(),
            permissions: session.permissions(),
            permission_names: session.permissions().names(),
            expires_at: session.expires_at(),
        },
    )
}
