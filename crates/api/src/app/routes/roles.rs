use std::sync::Arc;

use axum::{
    Extension, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use backoffice_auth::{PERMISSION_GROUPS, Permissions};
use backoffice_core::{ListRequest, RoleId};
use backoffice_identity::{RoleInput, RoleQuery};

use crate::app::dto::{self, Body, PathId};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_role))
        .route("/query", post(query_roles))
        .route("/permission-groups", get(permission_groups))
        .route("/:id", get(get_role).put(update_role).delete(delete_role))
}

pub async fn query_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Body(body): Body<ListRequest>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::VIEW_ROLE) {
        return ApiError::from(e).into_response();
    }

    let query = RoleQuery::from_request(&body);
    match services.list_roles(&query).await {
        Ok(page) => dto::ok("Roles fetched successfully", page),
        Err(e) => e.into_listing_response(),
    }
}

/// Permission flags grouped per entity, for the role editor.
pub async fn permission_groups(Extension(session): Extension<SessionContext>) -> Response {
    if let Err(e) = authz::require(&session, Permissions::VIEW_ROLE) {
        return ApiError::from(e).into_response();
    }
    dto::ok("Permission groups", PERMISSION_GROUPS)
}

pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<RoleId>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::VIEW_ROLE) {
        return ApiError::from(e).into_response();
    }

    match services.role(id).await {
        Ok(role) => dto::ok("Role fetched successfully", role),
        Err(e) => e.into_response(),
    }
}

pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Body(body): Body<RoleInput>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::ADD_ROLE) {
        return ApiError::from(e).into_response();
    }

    match services.create_role(&body, Utc::now()).await {
        Ok(role) => dto::created("Role created successfully", role),
        Err(e) => e.into_response(),
    }
}

pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<RoleId>,
    Body(body): Body<RoleInput>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::EDIT_ROLE) {
        return ApiError::from(e).into_response();
    }

    match services.update_role(id, &body, Utc::now()).await {
        Ok(role) => dto::ok("Role updated successfully", role),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<RoleId>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::DELETE_ROLE) {
        return ApiError::from(e).into_response();
    }

    match services.delete_role(id, Utc::now()).await {
        Ok(()) => dto::done("Role deleted successfully"),
        Err(e) => e.into_response(),
    }
}
