use std::sync::Arc;

use axum::{
    Extension, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use backoffice_auth::Permissions;
use backoffice_content::{CmsInput, CmsQuery};
use backoffice_core::{CmsPageId, ListRequest};

use crate::app::dto::{self, Body, PathId};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_page))
        .route("/query", post(query_pages))
        .route("/:id", get(get_page).put(update_page).delete(delete_page))
}

pub async fn query_pages(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Body(body): Body<ListRequest>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::VIEW_CMS) {
        return ApiError::from(e).into_response();
    }

    let query = CmsQuery::from_request(&body);
    match services.list_cms_pages(&query).await {
        Ok(page) => dto::ok("CMS pages fetched successfully", page),
        Err(e) => e.into_listing_response(),
    }
}

pub async fn get_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<CmsPageId>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::VIEW_CMS) {
        return ApiError::from(e).into_response();
    }

    match services.cms_page(id).await {
        Ok(page) => dto::ok("CMS page fetched successfully", page),
        Err(e) => e.into_response(),
    }
}

pub async fn create_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Body(body): Body<CmsInput>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::ADD_CMS) {
        return ApiError::from(e).into_response();
    }

    match services.create_cms_page(&body, Utc::now()).await {
        Ok(page) => dto::created("CMS page created successfully", page),
        Err(e) => e.into_response(),
    }
}

pub async fn update_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<CmsPageId>,
    Body(body): Body<CmsInput>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::EDIT_CMS) {
        return ApiError::from(e).into_response();
    }

    match services.update_cms_page(id, &body, Utc::now()).await {
        Ok(page) => dto::ok("CMS page updated successfully", page),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<CmsPageId>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::DELETE_CMS) {
        return ApiError::from(e).into_response();
    }

    match services.delete_cms_page(id, Utc::now()).await {
        Ok(()) => dto::done("CMS page deleted successfully"),
        Err(e) => e.into_response(),
    }
}
