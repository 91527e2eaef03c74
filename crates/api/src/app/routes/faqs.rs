use std::sync::Arc;

use axum::{
    Extension, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use backoffice_auth::Permissions;
use backoffice_content::{FaqInput, FaqQuery};
use backoffice_core::{FaqId, ListRequest};

use crate::app::dto::{self, Body, PathId};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_faq))
        .route("/query", post(query_faqs))
        .route("/:id", get(get_faq).put(update_faq).delete(delete_faq))
}

pub async fn query_faqs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Body(body): Body<ListRequest>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::VIEW_FAQ) {
        return ApiError::from(e).into_response();
    }

    let query = FaqQuery::from_request(&body);
    match services.list_faqs(&query).await {
        Ok(page) => dto::ok("FAQs fetched successfully", page),
        Err(e) => e.into_listing_response(),
    }
}

pub async fn get_faq(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<FaqId>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::VIEW_FAQ) {
        return ApiError::from(e).into_response();
    }

    match services.faq(id).await {
        Ok(faq) => dto::ok("FAQ fetched successfully", faq),
        Err(e) => e.into_response(),
    }
}

pub async fn create_faq(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Body(body): Body<FaqInput>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::ADD_FAQ) {
        return ApiError::from(e).into_response();
    }

    match services.create_faq(&body, Utc::now()).await {
        Ok(faq) => dto::created("FAQ created successfully", faq),
        Err(e) => e.into_response(),
    }
}

pub async fn update_faq(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<FaqId>,
    Body(body): Body<FaqInput>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::EDIT_FAQ) {
        return ApiError::from(e).into_response();
    }

    match services.update_faq(id, &body, Utc::now()).await {
        Ok(faq) => dto::ok("FAQ updated successfully", faq),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_faq(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    PathId(id): PathId<FaqId>,
) -> Response {
    if let Err(e) = authz::require(&session, Permissions::DELETE_FAQ) {
        return ApiError::from(e).into_response();
    }

    match services.delete_faq(id, Utc::now()).await {
        Ok(()) => dto::done("FAQ deleted successfully"),
        Err(e) => e.into_response(),
    }
}
