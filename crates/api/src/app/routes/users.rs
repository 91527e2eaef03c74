use std::sync::Arc;

use axum::{
    Extension, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use backoffice_auth::Permissions;
use backoffice_core::{ListRequest, UserId};
use backoffice_identity::{UserInput, UserQuery};

use crate::app::dto::{self, Body, PathId};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_user))
        .route("/query", post(query_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn query_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Body(body): Body<ListRequest>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::VIEW_USER) {
        return ApiError::from(e).into_response();
    }

    let query = UserQuery::from_request(&body);
    match services.list_users(&query).await {
        Ok(page) => dto::ok("Users fetched successfully", page),
        Err(e) => e.into_listing_response(),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<UserId>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::VIEW_USER) {
        return ApiError::from(e).into_response();
    }

    match services.user(id).await {
        Ok(user) => dto::ok("User fetched successfully", user),
        Err(e) => e.into_response(),
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Body(body): Body<UserInput>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::ADD_USER) {
        return ApiError::from(e).into_response();
    }

    match services.create_user(&body, Utc::now()).await {
        Ok(user) => dto::created("User created successfully", user),
        Err(e) => e.into_response(),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<UserId>,
    Body(body): Body<UserInput>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::EDIT_USER) {
        return ApiError::from(e).into_response();
    }

    match services.update_user(id, &body, Utc::now()).await {
        Ok(user) => dto::ok("User updated successfully", user),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<UserId>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::DELETE_USER) {
        return ApiError::from(e).into_response();
    }

    match services.delete_user(session.user_id(), id, Utc::now()).await {
        Ok(()) => dto::done("User deleted successfully"),
        Err(e) => e.into_response(),
    }
}
