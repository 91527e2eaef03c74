//! Application services: the operations behind every route.
//!
//! Handlers stay thin: they authorize, parse and render. Everything that
//! talks to the store, the token codec or the mailer lives here.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use backoffice_auth::{
    Hs256JwtCodec, JwtValidator, Principal, TokenType, check_strength,
    effective_permissions, hash_password, hash_reset_token, issue_reset_token, reset_link,
    verify_password,
};
use backoffice_content::{CmsInput, CmsPage, CmsQuery, Faq, FaqInput, FaqQuery};
use backoffice_core::{CmsPageId, DomainError, FaqId, Page, RoleId, UserId};
use backoffice_identity::{
    City, Country, PasswordResetToken, Role, RoleInput, RoleQuery, RoleView, State, User,
    UserInput, UserQuery, UserView,
};
use backoffice_infra::{AppConfig, BackofficeStore, Mailer, OutgoingMail, compose};

use crate::app::dto::{ForgotPasswordRequest, LoginResponse, ResetPasswordRequest};
use crate::app::errors::ApiError;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub struct AppServices {
    store: Arc<dyn BackofficeStore>,
    mailer: Arc<dyn Mailer>,
    jwt: Hs256JwtCodec,
}

impl AppServices {
    pub fn new(store: Arc<dyn BackofficeStore>, mailer: Arc<dyn Mailer>, jwt: Hs256JwtCodec) -> Self {
        Self { store, mailer, jwt }
    }

    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn BackofficeStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let jwt = Hs256JwtCodec::new(
            config.jwt_secret.as_bytes(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        );
        Self::new(store, mailer, jwt)
    }

    /// Access-token validator for the auth middleware.
    pub fn validator(&self) -> Arc<dyn JwtValidator> {
        Arc::new(self.jwt.clone())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str, now: DateTime<Utc>) -> Result<LoginResponse, ApiError> {
        let email = email.trim().to_lowercase();
        let user = self
            .store
            .user_by_email(&email)
            .await?
            .filter(|u| u.is_active)
            .ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))?;

        if !verify_password(password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "login rejected: wrong password");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
        }

        tracing::info!(user_id = %user.id, "login succeeded");
        self.issue_session(&user, now).await
    }

    /// Exchange a refresh token for a new pair carrying current roles.
    pub async fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<LoginResponse, ApiError> {
        let claims = self.jwt.decode(refresh_token.trim(), TokenType::Refresh, now)?;
        let user = self
            .store
            .user(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(ApiError::Unauthorized("Account is no longer active"))?;
        self.issue_session(&user, now).await
    }

    async fn principal_for(&self, user: &User) -> Result<Principal, ApiError> {
        let roles: Vec<Role> = self
            .store
            .roles_by_ids(&user.role_ids)
            .await?
            .into_iter()
            .filter(Role::grants)
            .collect();
        let permissions = effective_permissions(roles.iter().map(|r| r.permissions));
        let names = roles.into_iter().map(|r| r.name).collect();
        Ok(Principal::new(user.id, names, permissions))
    }

    async fn issue_session(&self, user: &User, now: DateTime<Utc>) -> Result<LoginResponse, ApiError> {
        let principal = self.principal_for(user).await?;
        let pair = self.jwt.issue_pair(&principal, now)?;
        Ok(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: self.jwt.access_ttl().num_seconds(),
            access_expires_at: pair.access_expires_at,
            refresh_expires_at: pair.refresh_expires_at,
            user_id: user.id,
            full_name: user.full_name.clone(),
            profile_image_url: user.profile_image_url.clone(),
            roles: principal.roles,
            permissions: principal.permissions,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Password reset
    // ─────────────────────────────────────────────────────────────────────

    /// Issue a reset link when the account exists. Callers always answer the
    /// same way, whatever happened here.
    pub async fn forgot_password(&self, req: &ForgotPasswordRequest, now: DateTime<Utc>) -> Result<(), ApiError> {
        let email = req.email.trim().to_lowercase();
        let issued = issue_reset_token(now);
        let link = reset_link(req.client_reset_url.trim(), &issued.raw, &email)
            .map_err(|_| DomainError::validation("clientResetUrl: must be an absolute URL"))?;

        let Some(user) = self.store.user_by_email(&email).await?.filter(|u| u.is_active) else {
            tracing::info!("password reset requested for unknown or inactive account");
            return Ok(());
        };

        self.store.invalidate_reset_tokens(user.id, now).await?;
        let token = PasswordResetToken::new(user.id, issued.hash, issued.expires_at, now);
        self.store.insert_reset_token(&token).await?;

        let mail = OutgoingMail {
            to: user.email.clone(),
            subject: "Reset your password".to_string(),
            body: format!(
                "Hello {},\n\nUse the link below to choose a new password. It expires at {}.\n\n{}\n",
                user.full_name,
                issued.expires_at.to_rfc3339(),
                link
            ),
        };
        if let Err(e) = self.mailer.send(mail).await {
            tracing::error!(user_id = %user.id, error = %e, "reset mail could not be sent");
        }
        Ok(())
    }

    pub async fn reset_password(&self, req: &ResetPasswordRequest, now: DateTime<Utc>) -> Result<(), ApiError> {
        check_strength(&req.new_password)?;

        let invalid = || DomainError::validation("Invalid or expired reset token");
        let email = req.email.trim().to_lowercase();

        let token = self
            .store
            .reset_token_by_hash(&hash_reset_token(req.token.trim()))
            .await?
            .filter(|t| t.usable_at(now))
            .ok_or_else(invalid)?;

        let user = self
            .store
            .user(token.user_id)
            .await?
            .filter(|u| u.email == email)
            .ok_or_else(invalid)?;

        let password_hash = hash_password(&req.new_password)?;
        self.store.mark_reset_token_used(token.id, now).await?;
        self.store.set_password(user.id, &password_hash, now).await?;
        tracing::info!(user_id = %user.id, "password reset completed");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_users(&self, query: &UserQuery) -> Result<Page<UserView>, ApiError> {
        Ok(compose(self.store.as_ref(), query).await?)
    }

    pub async fn user(&self, id: UserId) -> Result<UserView, ApiError> {
        self.store
            .user_view(id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    pub async fn create_user(&self, input: &UserInput, now: DateTime<Utc>) -> Result<UserView, ApiError> {
        input.validate_for_create()?;
        self.ensure_roles_exist(&input.role_ids).await?;
        self.ensure_email_free(&input.normalized_email(), None).await?;

        let password = input.password.as_deref().unwrap_or_default();
        let user = User::create(input, hash_password(password)?, now);
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "user created");
        self.user(user.id).await
    }

    /// Replace editable fields. An empty `roleIds` keeps the current roles and
    /// a missing password keeps the current one.
    pub async fn update_user(&self, id: UserId, input: &UserInput, now: DateTime<Utc>) -> Result<UserView, ApiError> {
        input.validate_for_update()?;
        let mut user = self.store.user(id).await?.ok_or_else(DomainError::not_found)?;
        self.ensure_roles_exist(&input.role_ids).await?;
        self.ensure_email_free(&input.normalized_email(), Some(id)).await?;

        // Hash before the first write so a hashing failure changes nothing.
        let password_hash = input.password.as_deref().map(hash_password).transpose()?;

        let current_roles = std::mem::take(&mut user.role_ids);
        user.apply(input, now);
        if user.role_ids.is_empty() {
            user.role_ids = current_roles;
        }
        self.store.update_user(&user).await?;

        if let Some(hash) = password_hash {
            self.store.set_password(id, &hash, now).await?;
        }
        self.user(id).await
    }

    pub async fn delete_user(&self, actor: UserId, id: UserId, now: DateTime<Utc>) -> Result<(), ApiError> {
        if actor == id {
            return Err(DomainError::validation("You cannot delete your own account").into());
        }
        self.store.delete_user(id, now).await?;
        tracing::info!(user_id = %id, deleted_by = %actor, "user deleted");
        Ok(())
    }

    async fn ensure_roles_exist(&self, ids: &[RoleId]) -> Result<(), ApiError> {
        let wanted: BTreeSet<RoleId> = ids.iter().copied().collect();
        if wanted.is_empty() {
            return Ok(());
        }
        let ids: Vec<RoleId> = wanted.iter().copied().collect();
        let found = self.store.roles_by_ids(&ids).await?;
        if found.len() != wanted.len() {
            return Err(DomainError::validation("roleIds: unknown or deleted role").into());
        }
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<UserId>) -> Result<(), ApiError> {
        match self.store.user_by_email(email).await? {
            Some(existing) if Some(existing.id) != owner => {
                Err(DomainError::conflict("Email already exists").into())
            }
            _ => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_roles(&self, query: &RoleQuery) -> Result<Page<RoleView>, ApiError> {
        let page = compose(self.store.as_ref(), query).await?;
        Ok(page.map(|role| RoleView::from(&role)))
    }

    pub async fn role(&self, id: RoleId) -> Result<RoleView, ApiError> {
        let role = self.store.role(id).await?.ok_or_else(DomainError::not_found)?;
        Ok(RoleView::from(&role))
    }

    pub async fn create_role(&self, input: &RoleInput, now: DateTime<Utc>) -> Result<RoleView, ApiError> {
        input.check()?;
        self.ensure_role_name_free(&input.name, None).await?;
        let role = Role::create(input, now);
        self.store.insert_role(&role).await?;
        tracing::info!(role_id = %role.id, permissions = %role.permissions, "role created");
        Ok(RoleView::from(&role))
    }

    pub async fn update_role(&self, id: RoleId, input: &RoleInput, now: DateTime<Utc>) -> Result<RoleView, ApiError> {
        input.check()?;
        let mut role = self.store.role(id).await?.ok_or_else(DomainError::not_found)?;
        self.ensure_role_name_free(&input.name, Some(id)).await?;
        role.apply(input, now);
        self.store.update_role(&role).await?;
        Ok(RoleView::from(&role))
    }

    pub async fn delete_role(&self, id: RoleId, now: DateTime<Utc>) -> Result<(), ApiError> {
        self.store.delete_role(id, now).await?;
        Ok(())
    }

    async fn ensure_role_name_free(&self, name: &str, owner: Option<RoleId>) -> Result<(), ApiError> {
        match self.store.role_by_name(name).await? {
            Some(existing) if Some(existing.id) != owner => {
                Err(DomainError::conflict("Role name already exists").into())
            }
            _ => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // CMS pages
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_cms_pages(&self, query: &CmsQuery) -> Result<Page<CmsPage>, ApiError> {
        Ok(compose(self.store.as_ref(), query).await?)
    }

    pub async fn cms_page(&self, id: CmsPageId) -> Result<CmsPage, ApiError> {
        self.store
            .cms_page(id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    pub async fn create_cms_page(&self, input: &CmsInput, now: DateTime<Utc>) -> Result<CmsPage, ApiError> {
        input.check()?;
        self.ensure_cms_key_free(&input.key, None).await?;
        let page = CmsPage::create(input, now);
        self.store.insert_cms_page(&page).await?;
        Ok(page)
    }

    pub async fn update_cms_page(&self, id: CmsPageId, input: &CmsInput, now: DateTime<Utc>) -> Result<CmsPage, ApiError> {
        input.check()?;
        let mut page = self.store.cms_page(id).await?.ok_or_else(DomainError::not_found)?;
        self.ensure_cms_key_free(&input.key, Some(id)).await?;
        page.apply(input, now);
        self.store.update_cms_page(&page).await?;
        Ok(page)
    }

    pub async fn delete_cms_page(&self, id: CmsPageId, now: DateTime<Utc>) -> Result<(), ApiError> {
        self.store.delete_cms_page(id, now).await?;
        Ok(())
    }

    async fn ensure_cms_key_free(&self, key: &str, owner: Option<CmsPageId>) -> Result<(), ApiError> {
        match self.store.cms_page_by_key(key.trim()).await? {
            Some(existing) if Some(existing.id) != owner => {
                Err(DomainError::conflict("CMS key already exists").into())
            }
            _ => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // FAQs
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_faqs(&self, query: &FaqQuery) -> Result<Page<Faq>, ApiError> {
        Ok(compose(self.store.as_ref(), query).await?)
    }

    pub async fn faq(&self, id: FaqId) -> Result<Faq, ApiError> {
        self.store
            .faq(id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    pub async fn create_faq(&self, input: &FaqInput, now: DateTime<Utc>) -> Result<Faq, ApiError> {
        input.check()?;
        let faq = Faq::create(input, now);
        self.store.insert_faq(&faq).await?;
        Ok(faq)
    }

    pub async fn update_faq(&self, id: FaqId, input: &FaqInput, now: DateTime<Utc>) -> Result<Faq, ApiError> {
        input.check()?;
        let mut faq = self.store.faq(id).await?.ok_or_else(DomainError::not_found)?;
        faq.apply(input, now);
        self.store.update_faq(&faq).await?;
        Ok(faq)
    }

    pub async fn delete_faq(&self, id: FaqId, now: DateTime<Utc>) -> Result<(), ApiError> {
        self.store.delete_faq(id, now).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────

    pub async fn countries(&self) -> Result<Vec<Country>, ApiError> {
        Ok(self.store.countries().await?)
    }

    pub async fn states(&self, country_id: i32) -> Result<Vec<State>, ApiError> {
        Ok(self.store.states(country_id).await?)
    }

    pub async fn cities(&self, state_id: i32) -> Result<Vec<City>, ApiError> {
        Ok(self.store.cities(state_id).await?)
    }
}

