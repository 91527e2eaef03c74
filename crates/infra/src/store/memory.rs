//! In-memory store for development and tests.
//!
//! Tables are insertion-ordered vectors behind one `RwLock`, so ties in a
//! sort keep insertion order. Listing evaluates the same [`ListQuery`] the
//! Postgres store renders to SQL.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use backoffice_content::{CmsFilter, CmsPage, CmsSort, Faq, FaqFilter, FaqSort};
use backoffice_core::{
    CmsPageId, Entity, FaqId, ListQuery, ResetTokenId, RoleId, SoftDelete, UserId,
};
use backoffice_identity::{
    City, Country, LocationNames, PasswordResetToken, Role, RoleFilter, RoleSort, State, User,
    UserFilter, UserSort, UserView,
};

use super::{
    CmsStore, FaqStore, Listing, LocationStore, ResetTokenStore, RoleStore, UserStore,
};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    roles: Vec<Role>,
    cms_pages: Vec<CmsPage>,
    faqs: Vec<Faq>,
    countries: Vec<Country>,
    states: Vec<State>,
    cities: Vec<City>,
    reset_tokens: Vec<PasswordResetToken>,
}

impl Tables {
    fn live<T: SoftDelete + Clone>(rows: &[T]) -> Vec<T> {
        rows.iter().filter(|r| !r.is_deleted()).cloned().collect()
    }

    fn find<'a, T>(rows: &'a [T], id: &T::Id) -> Option<&'a T>
    where
        T: Entity + SoftDelete,
    {
        rows.iter().find(|r| r.id() == id && !r.is_deleted())
    }

    fn find_mut<'a, T>(rows: &'a mut [T], id: &T::Id) -> StoreResult<&'a mut T>
    where
        T: Entity + SoftDelete,
    {
        rows.iter_mut()
            .find(|r| r.id() == id && !r.is_deleted())
            .ok_or(StoreError::NotFound)
    }

    fn live_roles(&self, ids: &[RoleId]) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self
            .roles
            .iter()
            .filter(|r| !r.is_deleted && ids.contains(&r.id))
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    fn project(&self, user: &User) -> UserView {
        let locations = LocationNames {
            country: self
                .countries
                .iter()
                .find(|c| Some(c.id) == user.country_id)
                .map(|c| c.name.clone()),
            state: self
                .states
                .iter()
                .find(|s| Some(s.id) == user.state_id)
                .map(|s| s.name.clone()),
            city: self
                .cities
                .iter()
                .find(|c| Some(c.id) == user.city_id)
                .map(|c| c.name.clone()),
        };
        let roles = self
            .live_roles(&user.role_ids)
            .into_iter()
            .map(|r| (r.id, r.name.clone()))
            .collect();
        UserView::project(user, locations, roles)
    }

    fn user_views(&self) -> Vec<UserView> {
        self.users
            .iter()
            .filter(|u| !u.is_deleted)
            .map(|u| self.project(u))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the sample location lookups.
    pub fn with_sample_locations() -> Self {
        let store = Self::new();
        if let Ok(mut t) = store.inner.write() {
            let (countries, states, cities) = crate::seed::sample_locations();
            t.countries = countries;
            t.states = states;
            t.cities = cities;
        }
        store
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Listings
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Listing<UserFilter, UserSort> for InMemoryStore {
    type Item = UserView;

    async fn count(&self, query: &ListQuery<UserFilter, UserSort>) -> StoreResult<u64> {
        Ok(query.count(&self.read()?.user_views()))
    }

    async fn fetch(&self, query: &ListQuery<UserFilter, UserSort>) -> StoreResult<Vec<UserView>> {
        Ok(query.select(&self.read()?.user_views()))
    }
}

#[async_trait]
impl Listing<RoleFilter, RoleSort> for InMemoryStore {
    type Item = Role;

    async fn count(&self, query: &ListQuery<RoleFilter, RoleSort>) -> StoreResult<u64> {
        Ok(query.count(&Tables::live(&self.read()?.roles)))
    }

    async fn fetch(&self, query: &ListQuery<RoleFilter, RoleSort>) -> StoreResult<Vec<Role>> {
        Ok(query.select(&Tables::live(&self.read()?.roles)))
    }
}

#[async_trait]
impl Listing<CmsFilter, CmsSort> for InMemoryStore {
    type Item = CmsPage;

    async fn count(&self, query: &ListQuery<CmsFilter, CmsSort>) -> StoreResult<u64> {
        Ok(query.count(&Tables::live(&self.read()?.cms_pages)))
    }

    async fn fetch(&self, query: &ListQuery<CmsFilter, CmsSort>) -> StoreResult<Vec<CmsPage>> {
        Ok(query.select(&Tables::live(&self.read()?.cms_pages)))
    }
}

#[async_trait]
impl Listing<FaqFilter, FaqSort> for InMemoryStore {
    type Item = Faq;

    async fn count(&self, query: &ListQuery<FaqFilter, FaqSort>) -> StoreResult<u64> {
        Ok(query.count(&Tables::live(&self.read()?.faqs)))
    }

    async fn fetch(&self, query: &ListQuery<FaqFilter, FaqSort>) -> StoreResult<Vec<Faq>> {
        Ok(query.select(&Tables::live(&self.read()?.faqs)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserStore for InMemoryStore {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(Tables::find(&self.read()?.users, &id).cloned())
    }

    async fn user_view(&self, id: UserId) -> StoreResult<Option<UserView>> {
        let t = self.read()?;
        Ok(Tables::find(&t.users, &id).map(|u| t.project(u)))
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| !u.is_deleted && u.email == email)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.users.iter().any(|u| !u.is_deleted && u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        t.users.push(user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.users
            .iter()
            .any(|u| !u.is_deleted && u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        let stored = Tables::find_mut(&mut t.users, &user.id)?;
        let password_hash = std::mem::take(&mut stored.password_hash);
        *stored = User {
            password_hash,
            created_at: stored.created_at,
            ..user.clone()
        };
        Ok(())
    }

    async fn set_password(&self, id: UserId, password_hash: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let mut t = self.write()?;
        let user = Tables::find_mut(&mut t.users, &id)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = at;
        Ok(())
    }

    async fn delete_user(&self, id: UserId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut t = self.write()?;
        let user = Tables::find_mut(&mut t.users, &id)?;
        user.mark_deleted();
        user.updated_at = at;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        Ok(Tables::find(&self.read()?.roles, &id).cloned())
    }

    async fn roles_by_ids(&self, ids: &[RoleId]) -> StoreResult<Vec<Role>> {
        Ok(self.read()?.live_roles(ids).into_iter().cloned().collect())
    }

    async fn role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        Ok(self
            .read()?
            .roles
            .iter()
            .find(|r| !r.is_deleted && r.same_name(name))
            .cloned())
    }

    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.roles.iter().any(|r| !r.is_deleted && r.same_name(&role.name)) {
            return Err(StoreError::Conflict(format!("role {} already exists", role.name)));
        }
        t.roles.push(role.clone());
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.roles
            .iter()
            .any(|r| !r.is_deleted && r.id != role.id && r.same_name(&role.name))
        {
            return Err(StoreError::Conflict(format!("role {} already exists", role.name)));
        }
        let stored = Tables::find_mut(&mut t.roles, &role.id)?;
        *stored = Role {
            created_at: stored.created_at,
            ..role.clone()
        };
        Ok(())
    }

    async fn delete_role(&self, id: RoleId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut t = self.write()?;
        let role = Tables::find_mut(&mut t.roles, &id)?;
        role.mark_deleted();
        role.updated_at = at;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Content
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl CmsStore for InMemoryStore {
    async fn cms_page(&self, id: CmsPageId) -> StoreResult<Option<CmsPage>> {
        Ok(Tables::find(&self.read()?.cms_pages, &id).cloned())
    }

    async fn cms_page_by_key(&self, key: &str) -> StoreResult<Option<CmsPage>> {
        Ok(self
            .read()?
            .cms_pages
            .iter()
            .find(|p| !p.is_deleted && p.key == key)
            .cloned())
    }

    async fn insert_cms_page(&self, page: &CmsPage) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.cms_pages.iter().any(|p| !p.is_deleted && p.key == page.key) {
            return Err(StoreError::Conflict(format!("cms key {} already exists", page.key)));
        }
        t.cms_pages.push(page.clone());
        Ok(())
    }

    async fn update_cms_page(&self, page: &CmsPage) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.cms_pages
            .iter()
            .any(|p| !p.is_deleted && p.id != page.id && p.key == page.key)
        {
            return Err(StoreError::Conflict(format!("cms key {} already exists", page.key)));
        }
        let stored = Tables::find_mut(&mut t.cms_pages, &page.id)?;
        *stored = CmsPage {
            created_at: stored.created_at,
            ..page.clone()
        };
        Ok(())
    }

    async fn delete_cms_page(&self, id: CmsPageId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut t = self.write()?;
        let page = Tables::find_mut(&mut t.cms_pages, &id)?;
        page.mark_deleted();
        page.updated_at = at;
        Ok(())
    }
}

#[async_trait]
impl FaqStore for InMemoryStore {
    async fn faq(&self, id: FaqId) -> StoreResult<Option<Faq>> {
        Ok(Tables::find(&self.read()?.faqs, &id).cloned())
    }

    async fn insert_faq(&self, faq: &Faq) -> StoreResult<()> {
        self.write()?.faqs.push(faq.clone());
        Ok(())
    }

    async fn update_faq(&self, faq: &Faq) -> StoreResult<()> {
        let mut t = self.write()?;
        let stored = Tables::find_mut(&mut t.faqs, &faq.id)?;
        *stored = Faq {
            created_at: stored.created_at,
            ..faq.clone()
        };
        Ok(())
    }

    async fn delete_faq(&self, id: FaqId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut t = self.write()?;
        let faq = Tables::find_mut(&mut t.faqs, &id)?;
        faq.mark_deleted();
        faq.updated_at = at;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lookups and reset tokens
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LocationStore for InMemoryStore {
    async fn countries(&self) -> StoreResult<Vec<Country>> {
        let mut countries = self.read()?.countries.clone();
        countries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(countries)
    }

    async fn states(&self, country_id: i32) -> StoreResult<Vec<State>> {
        let mut states: Vec<State> = self
            .read()?
            .states
            .iter()
            .filter(|s| s.country_id == country_id)
            .cloned()
            .collect();
        states.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(states)
    }

    async fn cities(&self, state_id: i32) -> StoreResult<Vec<City>> {
        let mut cities: Vec<City> = self
            .read()?
            .cities
            .iter()
            .filter(|c| c.state_id == state_id)
            .cloned()
            .collect();
        cities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cities)
    }
}

#[async_trait]
impl ResetTokenStore for InMemoryStore {
    async fn invalidate_reset_tokens(&self, user_id: UserId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut t = self.write()?;
        for token in t
            .reset_tokens
            .iter_mut()
            .filter(|tk| tk.user_id == user_id && tk.used_at.is_none())
        {
            token.used_at = Some(at);
        }
        Ok(())
    }

    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        self.write()?.reset_tokens.push(token.clone());
        Ok(())
    }

    async fn reset_token_by_hash(&self, token_hash: &str) -> StoreResult<Option<PasswordResetToken>> {
        Ok(self
            .read()?
            .reset_tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn mark_reset_token_used(&self, id: ResetTokenId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut t = self.write()?;
        let token = t
            .reset_tokens
            .iter_mut()
            .find(|tk| tk.id == id)
            .ok_or(StoreError::NotFound)?;
        token.used_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::compose;
    use backoffice_auth::Permissions;
    use backoffice_core::ListRequest;
    use backoffice_identity::{RoleInput, UserInput, UserQuery};
    use chrono::Duration;

    fn role(name: &str) -> Role {
        let input = RoleInput {
            name: name.into(),
            description: String::new(),
            is_active: true,
            permissions: Permissions::VIEW_USER,
        };
        Role::create(&input, Utc::now())
    }

    fn user(name: &str, email: &str, country_id: Option<i32>, roles: Vec<RoleId>, at: DateTime<Utc>) -> User {
        let input = UserInput {
            full_name: name.into(),
            email: email.into(),
            phone_number: None,
            date_of_birth: None,
            country_id,
            state_id: None,
            city_id: None,
            profile_image_url: None,
            is_active: true,
            password: None,
            role_ids: roles,
        };
        User::create(&input, "hash".into(), at)
    }

    async fn seeded() -> (InMemoryStore, Role, Role) {
        let store = InMemoryStore::with_sample_locations();
        let admin = role("SuperAdmin");
        let editor = role("Editor");
        store.insert_role(&admin).await.unwrap();
        store.insert_role(&editor).await.unwrap();

        let t0 = Utc::now();
        let india = Some(1);
        for i in 0..25 {
            let roles = if i % 5 == 0 { vec![admin.id] } else { vec![editor.id] };
            let u = user(
                &format!("User {i:02}"),
                &format!("user{i:02}@example.com"),
                if i % 2 == 0 { india } else { None },
                roles,
                t0 + Duration::seconds(i),
            );
            store.insert_user(&u).await.unwrap();
        }
        (store, admin, editor)
    }

    #[tokio::test]
    async fn second_page_of_users_is_items_eleven_to_twenty() {
        let (store, _, _) = seeded().await;
        let q = UserQuery::from_request(&ListRequest::new(2, 10).sorted_by("createdAt", "asc"));
        let page = compose(&store, &q).await.unwrap();

        assert_eq!(page.total_items, 25);
        let names: Vec<String> = page.data.iter().map(|u| u.full_name.clone()).collect();
        let expected: Vec<String> = (10..20).map(|i| format!("User {i:02}")).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn user_names_sort_without_regard_to_case() {
        let store = InMemoryStore::with_sample_locations();
        let t0 = Utc::now();
        for (i, name) in ["bob Smith", "Zoe Adams", "alice Jones"].into_iter().enumerate() {
            let u = user(name, &format!("u{i}@example.com"), None, vec![], t0 + Duration::seconds(i as i64));
            store.insert_user(&u).await.unwrap();
        }

        let q = UserQuery::from_request(&ListRequest::new(1, 10).sorted_by("fullName", "asc"));
        let page = compose(&store, &q).await.unwrap();

        let names: Vec<&str> = page.data.iter().map(|u| u.full_name.as_str()).collect();
        assert_eq!(names, ["alice Jones", "bob Smith", "Zoe Adams"]);
    }

    #[tokio::test]
    async fn users_filter_by_country_name_and_role() {
        let (store, _, _) = seeded().await;
        let q = UserQuery::from_request(
            &ListRequest::new(1, 50).filter("country", "ind").filter("roles", "admin"),
        );
        let page = compose(&store, &q).await.unwrap();

        // i in {0, 10, 20}: even and divisible by five
        assert_eq!(page.total_items, 3);
        assert!(page.data.iter().all(|u| u.country_name.as_deref() == Some("India")));
        assert!(page.data.iter().all(|u| u.roles == vec!["SuperAdmin".to_string()]));
    }

    #[tokio::test]
    async fn soft_deleted_users_leave_counts_and_lookups() {
        let (store, _, _) = seeded().await;
        let victim = store.user_by_email("user03@example.com").await.unwrap().unwrap();
        store.delete_user(victim.id, Utc::now()).await.unwrap();

        let q = UserQuery::from_request(&ListRequest::default());
        assert_eq!(compose(&store, &q).await.unwrap().total_items, 24);
        assert_eq!(store.user(victim.id).await.unwrap(), None);
        assert!(matches!(
            store.delete_user(victim.id, Utc::now()).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deleted_roles_disappear_from_user_views() {
        let (store, admin, _) = seeded().await;
        store.delete_role(admin.id, Utc::now()).await.unwrap();

        let u = store.user_by_email("user00@example.com").await.unwrap().unwrap();
        let view = store.user_view(u.id).await.unwrap().unwrap();
        assert!(view.roles.is_empty());
        assert!(view.role_ids.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_and_role_name_conflict() {
        let (store, _, _) = seeded().await;
        let dup = user("Dup", "user01@example.com", None, vec![], Utc::now());
        assert!(matches!(store.insert_user(&dup).await, Err(StoreError::Conflict(_))));
        assert!(matches!(store.insert_role(&role("editor")).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_keeps_password_hash_and_creation_time() {
        let (store, _, _) = seeded().await;
        let mut u = store.user_by_email("user04@example.com").await.unwrap().unwrap();
        let created = u.created_at;
        u.full_name = "Renamed".into();
        u.password_hash = String::new();
        u.created_at = Utc::now() + Duration::days(1);
        store.update_user(&u).await.unwrap();

        let stored = store.user(u.id).await.unwrap().unwrap();
        assert_eq!(stored.full_name, "Renamed");
        assert_eq!(stored.password_hash, "hash");
        assert_eq!(stored.created_at, created);
    }

    #[tokio::test]
    async fn issuing_a_reset_token_invalidates_older_ones() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        let now = Utc::now();
        let first = PasswordResetToken::new(user_id, "a".into(), now + Duration::hours(1), now);
        store.insert_reset_token(&first).await.unwrap();

        store.invalidate_reset_tokens(user_id, now).await.unwrap();
        let second = PasswordResetToken::new(user_id, "b".into(), now + Duration::hours(1), now);
        store.insert_reset_token(&second).await.unwrap();

        let a = store.reset_token_by_hash("a").await.unwrap().unwrap();
        let b = store.reset_token_by_hash("b").await.unwrap().unwrap();
        assert!(!a.usable_at(now));
        assert!(b.usable_at(now));
    }

    #[tokio::test]
    async fn states_are_scoped_to_their_country() {
        let store = InMemoryStore::with_sample_locations();
        let states = store.states(1).await.unwrap();
        assert!(!states.is_empty());
        assert!(states.iter().all(|s| s.country_id == 1));
        assert!(store.states(999).await.unwrap().is_empty());
    }
}
