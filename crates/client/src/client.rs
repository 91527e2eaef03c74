use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use backoffice_auth::Permissions;
use backoffice_content::{CmsInput, CmsPage, Faq, FaqInput};
use backoffice_core::{ApiResponse, CmsPageId, FaqId, ListRequest, Page, RoleId, UserId};
use backoffice_identity::{City, Country, RoleInput, RoleView, State, UserInput, UserView};

use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Renew the access token this long before it expires.
const DEFAULT_REFRESH_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    pub user_id: UserId,
    pub roles: Vec<String>,
    pub permissions: Permissions,
    pub permission_names: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PermissionOptionView {
    pub key: String,
    pub label: String,
    pub value: Permissions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PermissionGroupView {
    pub key: String,
    pub label: String,
    pub items: Vec<PermissionOptionView>,
}

pub struct BackofficeClient {
    http: reqwest::Client,
    base_url: String,
    refresh_margin: Duration,
    session: Mutex<Option<Session>>,
}

impl BackofficeClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            refresh_margin: Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
            session: Mutex::new(None),
        }
    }

    pub fn refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let body = json!({ "email": email, "password": password });
        let session: Session = self.call(Method::POST, "/api/auth/login", Some(&body), None).await?;
        *self.session.lock().await = Some(session.clone());
        tracing::debug!(user_id = %session.user_id, "logged in");
        Ok(session)
    }

    /// Adopt a session persisted by the caller.
    pub async fn restore(&self, session: Session) {
        *self.session.lock().await = Some(session);
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    pub async fn logout(&self) {
        *self.session.lock().await = None;
    }

    /// Current access token, renewed first when it is about to expire.
    ///
    /// The session lock is held across the refresh call so concurrent
    /// requests trigger at most one renewal.
    async fn access_token(&self) -> ClientResult<String> {
        let mut guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(ClientError::NotAuthenticated)?;
        let now = Utc::now();

        if !session.needs_refresh(now, self.refresh_margin) {
            return Ok(session.access_token.clone());
        }
        if !session.can_refresh(now) {
            *guard = None;
            return Err(ClientError::SessionExpired);
        }

        let body = json!({ "refreshToken": session.refresh_token });
        match self
            .call::<Session, _>(Method::POST, "/api/auth/refresh", Some(&body), None)
            .await
        {
            Ok(renewed) => {
                tracing::debug!(expires_at = %renewed.access_expires_at, "access token renewed");
                let token = renewed.access_token.clone();
                *guard = Some(renewed);
                Ok(token)
            }
            Err(e) if e.status() == Some(StatusCode::UNAUTHORIZED.as_u16()) => {
                *guard = None;
                Err(ClientError::SessionExpired)
            }
            Err(e) => Err(e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────────────

    async fn envelope<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> ClientResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await?;
        if !status.is_success() || !envelope.success {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: envelope.message,
            });
        }
        Ok(envelope)
    }

    async fn call<T, B>(&self, method: Method, path: &str, body: Option<&B>, token: Option<&str>) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        // A successful envelope without data is still a protocol error.
        self.envelope::<T, B>(method, path, body, token)
            .await?
            .into_result()
            .map_err(|message| ClientError::Api {
                status: StatusCode::OK.as_u16(),
                message,
            })
    }

    async fn authed<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let token = self.access_token().await?;
        self.call(method, path, body, Some(&token)).await
    }

    /// Authenticated call whose success carries no payload.
    async fn authed_done<B>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<String>
    where
        B: Serialize + ?Sized,
    {
        let token = self.access_token().await?;
        let envelope = self
            .envelope::<serde_json::Value, B>(method, path, body, Some(&token))
            .await?;
        Ok(envelope.message)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Password reset
    // ─────────────────────────────────────────────────────────────────────

    pub async fn forgot_password(&self, email: &str, client_reset_url: &str) -> ClientResult<String> {
        let body = json!({ "email": email, "clientResetUrl": client_reset_url });
        let envelope = self
            .envelope::<serde_json::Value, _>(Method::POST, "/api/auth/forgot-password", Some(&body), None)
            .await?;
        Ok(envelope.message)
    }

    pub async fn reset_password(&self, email: &str, token: &str, new_password: &str) -> ClientResult<String> {
        let body = json!({ "email": email, "token": token, "newPassword": new_password });
        let envelope = self
            .envelope::<serde_json::Value, _>(Method::POST, "/api/auth/reset-password", Some(&body), None)
            .await?;
        Ok(envelope.message)
    }

    pub async fn whoami(&self) -> ClientResult<WhoAmI> {
        self.authed::<_, ()>(Method::GET, "/api/whoami", None).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    pub async fn query_users(&self, request: &ListRequest) -> ClientResult<Page<UserView>> {
        self.authed(Method::POST, "/api/users/query", Some(request)).await
    }

    pub async fn user(&self, id: UserId) -> ClientResult<UserView> {
        self.authed::<_, ()>(Method::GET, &format!("/api/users/{id}"), None).await
    }

    pub async fn create_user(&self, input: &UserInput) -> ClientResult<UserView> {
        self.authed(Method::POST, "/api/users", Some(input)).await
    }

    pub async fn update_user(&self, id: UserId, input: &UserInput) -> ClientResult<UserView> {
        self.authed(Method::PUT, &format!("/api/users/{id}"), Some(input)).await
    }

    pub async fn delete_user(&self, id: UserId) -> ClientResult<String> {
        self.authed_done::<()>(Method::DELETE, &format!("/api/users/{id}"), None).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────

    pub async fn query_roles(&self, request: &ListRequest) -> ClientResult<Page<RoleView>> {
        self.authed(Method::POST, "/api/roles/query", Some(request)).await
    }

    pub async fn permission_groups(&self) -> ClientResult<Vec<PermissionGroupView>> {
        self.authed::<_, ()>(Method::GET, "/api/roles/permission-groups", None).await
    }

    pub async fn role(&self, id: RoleId) -> ClientResult<RoleView> {
        self.authed::<_, ()>(Method::GET, &format!("/api/roles/{id}"), None).await
    }

    pub async fn create_role(&self, input: &RoleInput) -> ClientResult<RoleView> {
        self.authed(Method::POST, "/api/roles", Some(input)).await
    }

    pub async fn update_role(&self, id: RoleId, input: &RoleInput) -> ClientResult<RoleView> {
        self.authed(Method::PUT, &format!("/api/roles/{id}"), Some(input)).await
    }

    pub async fn delete_role(&self, id: RoleId) -> ClientResult<String> {
        self.authed_done::<()>(Method::DELETE, &format!("/api/roles/{id}"), None).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Content
    // ─────────────────────────────────────────────────────────────────────

    pub async fn query_cms_pages(&self, request: &ListRequest) -> ClientResult<Page<CmsPage>> {
        self.authed(Method::POST, "/api/cms/query", Some(request)).await
    }

    pub async fn cms_page(&self, id: CmsPageId) -> ClientResult<CmsPage> {
        self.authed::<_, ()>(Method::GET, &format!("/api/cms/{id}"), None).await
    }

    pub async fn create_cms_page(&self, input: &CmsInput) -> ClientResult<CmsPage> {
        self.authed(Method::POST, "/api/cms", Some(input)).await
    }

    pub async fn update_cms_page(&self, id: CmsPageId, input: &CmsInput) -> ClientResult<CmsPage> {
        self.authed(Method::PUT, &format!("/api/cms/{id}"), Some(input)).await
    }

    pub async fn delete_cms_page(&self, id: CmsPageId) -> ClientResult<String> {
        self.authed_done::<()>(Method::DELETE, &format!("/api/cms/{id}"), None).await
    }

    pub async fn query_faqs(&self, request: &ListRequest) -> ClientResult<Page<Faq>> {
        self.authed(Method::POST, "/api/faqs/query", Some(request)).await
    }

    pub async fn faq(&self, id: FaqId) -> ClientResult<Faq> {
        self.authed::<_, ()>(Method::GET, &format!("/api/faqs/{id}"), None).await
    }

    pub async fn create_faq(&self, input: &FaqInput) -> ClientResult<Faq> {
        self.authed(Method::POST, "/api/faqs", Some(input)).await
    }

    pub async fn update_faq(&self, id: FaqId, input: &FaqInput) -> ClientResult<Faq> {
        self.authed(Method::PUT, &format!("/api/faqs/{id}"), Some(input)).await
    }

    pub async fn delete_faq(&self, id: FaqId) -> ClientResult<String> {
        self.authed_done::<()>(Method::DELETE, &format!("/api/faqs/{id}"), None).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────

    pub async fn countries(&self) -> ClientResult<Vec<Country>> {
        self.authed::<_, ()>(Method::GET, "/api/locations/countries", None).await
    }

    pub async fn states(&self, country_id: i32) -> ClientResult<Vec<State>> {
        self.authed::<_, ()>(Method::GET, &format!("/api/locations/countries/{country_id}/states"), None)
            .await
    }

    pub async fn cities(&self, state_id: i32) -> ClientResult<Vec<City>> {
        self.authed::<_, ()>(Method::GET, &format!("/api/locations/states/{state_id}/cities"), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn authed_calls_need_a_session() {
        let client = BackofficeClient::new("http://127.0.0.1:9/");
        assert_eq!(client.url("/api/whoami"), "http://127.0.0.1:9/api/whoami");

        let err = client.whoami().await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn fully_expired_session_is_dropped() {
        let client = BackofficeClient::new("http://127.0.0.1:9");
        let past = Utc::now() - Duration::days(8);
        client
            .restore(Session {
                access_token: "a".into(),
                refresh_token: "r".into(),
                access_expires_at: past,
                refresh_expires_at: past + Duration::days(7),
                user_id: UserId::new(),
                full_name: "Ada Lovelace".into(),
                profile_image_url: None,
                roles: Vec::new(),
                permissions: Permissions::empty(),
            })
            .await;

        let err = client.countries().await.unwrap_err();
        assert!(matches!(err, ClientError::SessionExpired));
        assert!(client.session().await.is_none());
    }

    #[test]
    fn permission_groups_deserialize_from_server_shape() {
        let json = serde_json::to_value(backoffice_auth::PERMISSION_GROUPS).unwrap();
        let groups: Vec<PermissionGroupView> = serde_json::from_value(json).unwrap();
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].items[1].value, Permissions::ADD_USER);
        assert_eq!(groups[3].label, "CMS Management");
    }
}
