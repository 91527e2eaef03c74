//! Storage abstractions for the back office.
//!
//! Every listing goes through [`compose`]: count the matches first, then fetch
//! the requested page. The two calls are separate round trips with no
//! transaction between them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use backoffice_content::{CmsFilter, CmsPage, CmsSort, Faq, FaqFilter, FaqSort};
use backoffice_core::{CmsPageId, FaqId, ListQuery, Page, ResetTokenId, RoleId, UserId};
use backoffice_identity::{
    City, Country, PasswordResetToken, Role, RoleFilter, RoleSort, State, User, UserFilter,
    UserSort, UserView,
};

use crate::error::StoreResult;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Count + fetch for one entity's listing query.
#[async_trait]
pub trait Listing<F, K>: Send + Sync
where
    F: Send + Sync + 'static,
    K: Send + Sync + 'static,
{
    type Item: Send;

    /// Matches of every active predicate, ignoring sort and page.
    async fn count(&self, query: &ListQuery<F, K>) -> StoreResult<u64>;

    /// The sorted, paged slice of matches.
    async fn fetch(&self, query: &ListQuery<F, K>) -> StoreResult<Vec<Self::Item>>;
}

/// Run a listing query: total first, then the page.
pub async fn compose<S, F, K>(store: &S, query: &ListQuery<F, K>) -> StoreResult<Page<S::Item>>
where
    S: Listing<F, K> + ?Sized,
    F: Send + Sync + 'static,
    K: Send + Sync + 'static,
{
    let total = store.count(query).await?;
    let data = store.fetch(query).await?;
    Ok(Page::new(query.page, total, data))
}

#[async_trait]
pub trait UserStore: Listing<UserFilter, UserSort, Item = UserView> {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn user_view(&self, id: UserId) -> StoreResult<Option<UserView>>;

    /// `email` must already be lowercased.
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Replaces fields and role assignments. `NotFound` for missing or deleted users.
    async fn update_user(&self, user: &User) -> StoreResult<()>;

    async fn set_password(&self, id: UserId, password_hash: &str, at: DateTime<Utc>) -> StoreResult<()>;

    async fn delete_user(&self, id: UserId, at: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait RoleStore: Listing<RoleFilter, RoleSort, Item = Role> {
    async fn role(&self, id: RoleId) -> StoreResult<Option<Role>>;

    /// Non-deleted roles among `ids`, ordered by name.
    async fn roles_by_ids(&self, ids: &[RoleId]) -> StoreResult<Vec<Role>>;

    /// Case-insensitive lookup.
    async fn role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;

    async fn insert_role(&self, role: &Role) -> StoreResult<()>;

    async fn update_role(&self, role: &Role) -> StoreResult<()>;

    async fn delete_role(&self, id: RoleId, at: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait CmsStore: Listing<CmsFilter, CmsSort, Item = CmsPage> {
    async fn cms_page(&self, id: CmsPageId) -> StoreResult<Option<CmsPage>>;

    async fn cms_page_by_key(&self, key: &str) -> StoreResult<Option<CmsPage>>;

    async fn insert_cms_page(&self, page: &CmsPage) -> StoreResult<()>;

    async fn update_cms_page(&self, page: &CmsPage) -> StoreResult<()>;

    async fn delete_cms_page(&self, id: CmsPageId, at: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait FaqStore: Listing<FaqFilter, FaqSort, Item = Faq> {
    async fn faq(&self, id: FaqId) -> StoreResult<Option<Faq>>;

    async fn insert_faq(&self, faq: &Faq) -> StoreResult<()>;

    async fn update_faq(&self, faq: &Faq) -> StoreResult<()>;

    async fn delete_faq(&self, id: FaqId, at: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn countries(&self) -> StoreResult<Vec<Country>>;

    async fn states(&self, country_id: i32) -> StoreResult<Vec<State>>;

    async fn cities(&self, state_id: i32) -> StoreResult<Vec<City>>;
}

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    /// Mark every unused token of `user_id` as used at `at`.
    async fn invalidate_reset_tokens(&self, user_id: UserId, at: DateTime<Utc>) -> StoreResult<()>;

    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()>;

    async fn reset_token_by_hash(&self, token_hash: &str) -> StoreResult<Option<PasswordResetToken>>;

    async fn mark_reset_token_used(&self, id: ResetTokenId, at: DateTime<Utc>) -> StoreResult<()>;
}

/// Everything the HTTP layer needs from storage.
pub trait BackofficeStore:
    UserStore + RoleStore + CmsStore + FaqStore + LocationStore + ResetTokenStore
{
}

impl<T> BackofficeStore for T where
    T: UserStore + RoleStore + CmsStore + FaqStore + LocationStore + ResetTokenStore
{
}
