//! Login, token refresh and password reset. Mounted without the auth layer.

use std::sync::Arc;

use axum::{Extension, Router, response::IntoResponse, response::Response, routing::post};
use chrono::Utc;

use crate::app::dto::{self, Body};
use crate::app::services::AppServices;

const RESET_REQUESTED: &str =
    "If an account exists for that email, a password reset link has been sent";

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::LoginRequest>,
) -> Response {
    match services.login(&body.email, &body.password, Utc::now()).await {
        Ok(session) => dto::ok("Login successful", session),
        Err(e) => e.into_response(),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::RefreshRequest>,
) -> Response {
    match services.refresh(&body.refresh_token, Utc::now()).await {
        Ok(session) => dto::ok("Token refreshed", session),
        Err(e) => e.into_response(),
    }
}

pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::ForgotPasswordRequest>,
) -> Response {
    match services.forgot_password(&body, Utc::now()).await {
        Ok(()) => dto::done(RESET_REQUESTED),
        Err(e) => e.into_response(),
    }
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::ResetPasswordRequest>,
) -> Response {
    match services.reset_password(&body, Utc::now()).await {
        Ok(()) => dto::done("Password has been reset"),
        Err(e) => e.into_response(),
    }
}
