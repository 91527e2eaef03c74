//! Postgres-backed store.
//!
//! Listings are rendered by [`crate::sql`]; everything else is plain
//! parameterized SQL. Soft-deleted rows are filtered in every statement.
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | unique violation (`23505`) | `Conflict` |
//! | pool closed / timed out | `Unavailable` |
//! | column decode / missing column | `Corrupt` |
//! | anything else | `Database` |

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use backoffice_auth::Permissions;
use backoffice_content::{CmsFilter, CmsPage, CmsSort, Faq, FaqFilter, FaqSort};
use backoffice_core::{CmsPageId, FaqId, ListQuery, ResetTokenId, RoleId, UserId};
use backoffice_identity::{
    City, Country, PasswordResetToken, Role, RoleFilter, RoleSort, State, User, UserFilter,
    UserSort, UserView,
};

use super::{
    CmsStore, FaqStore, Listing, LocationStore, ResetTokenStore, RoleStore, UserStore,
};
use crate::error::{StoreError, StoreResult, map_sqlx_error};
use crate::sql::{self, SqlFilter, SqlSort, SqlSource};

/// Embedded migrations under `crates/infra/migrations`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migrations failed: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn count_rows<F, K>(&self, source: &SqlSource, query: &ListQuery<F, K>) -> StoreResult<u64>
    where
        F: SqlFilter,
    {
        let mut builder = sql::count_statement(source, query);
        let total: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn fetch_rows<F, K>(&self, source: &SqlSource, query: &ListQuery<F, K>) -> StoreResult<Vec<PgRow>>
    where
        F: SqlFilter,
        K: SqlSort,
    {
        let mut builder = sql::page_statement(source, query);
        builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_page", e))
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))
    }

    async fn soft_delete(&self, table: &'static str, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        // Table names come from this module only.
        let statement = format!(
            "UPDATE {table} SET is_deleted = TRUE, is_active = FALSE, updated_at = $2 \
             WHERE id = $1 AND NOT is_deleted"
        );
        let result = sqlx::query(&statement)
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("soft_delete", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn decode<T>(operation: &str, rows: Vec<PgRow>, map: fn(&PgRow) -> Result<T, sqlx::Error>) -> StoreResult<Vec<T>> {
    rows.iter()
        .map(|row| map(row).map_err(|e| map_sqlx_error(operation, e)))
        .collect()
}

fn decode_one<T>(operation: &str, row: Option<PgRow>, map: fn(&PgRow) -> Result<T, sqlx::Error>) -> StoreResult<Option<T>> {
    row.as_ref()
        .map(map)
        .transpose()
        .map_err(|e| map_sqlx_error(operation, e))
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "u.id, u.full_name, u.email, u.phone_number, u.date_of_birth, \
     u.country_id, u.state_id, u.city_id, u.profile_image_url, u.is_active, u.password_hash, \
     u.created_at, u.updated_at, u.is_deleted, \
     ARRAY(SELECT ur.role_id FROM user_roles ur WHERE ur.user_id = u.id) AS role_ids";

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let role_ids: Vec<Uuid> = row.try_get("role_ids")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        date_of_birth: row.try_get::<Option<NaiveDate>, _>("date_of_birth")?,
        country_id: row.try_get("country_id")?,
        state_id: row.try_get("state_id")?,
        city_id: row.try_get("city_id")?,
        profile_image_url: row.try_get("profile_image_url")?,
        is_active: row.try_get("is_active")?,
        password_hash: row.try_get("password_hash")?,
        role_ids: role_ids.into_iter().map(RoleId::from_uuid).collect(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        is_deleted: row.try_get("is_deleted")?,
    })
}

fn user_view_from_row(row: &PgRow) -> Result<UserView, sqlx::Error> {
    let role_ids: Vec<Uuid> = row.try_get("role_ids")?;
    Ok(UserView {
        id: UserId::from_uuid(row.try_get("id")?),
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        date_of_birth: row.try_get("date_of_birth")?,
        country_id: row.try_get("country_id")?,
        country_name: row.try_get("country_name")?,
        state_id: row.try_get("state_id")?,
        state_name: row.try_get("state_name")?,
        city_id: row.try_get("city_id")?,
        city_name: row.try_get("city_name")?,
        profile_image_url: row.try_get("profile_image_url")?,
        is_active: row.try_get("is_active")?,
        role_ids: role_ids.into_iter().map(RoleId::from_uuid).collect(),
        roles: row.try_get("role_names")?,
        created_at: row.try_get("created_at")?,
    })
}

fn role_from_row(row: &PgRow) -> Result<Role, sqlx::Error> {
    Ok(Role {
        id: RoleId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        permissions: Permissions::decode(row.try_get("permissions")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        is_deleted: row.try_get("is_deleted")?,
    })
}

fn cms_from_row(row: &PgRow) -> Result<CmsPage, sqlx::Error> {
    Ok(CmsPage {
        id: CmsPageId::from_uuid(row.try_get("id")?),
        key: row.try_get("key")?,
        title: row.try_get("title")?,
        meta_keyword: row.try_get("meta_keyword")?,
        content: row.try_get("content")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        is_deleted: row.try_get("is_deleted")?,
    })
}

fn faq_from_row(row: &PgRow) -> Result<Faq, sqlx::Error> {
    Ok(Faq {
        id: FaqId::from_uuid(row.try_get("id")?),
        question: row.try_get("question")?,
        answer: row.try_get("answer")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        is_deleted: row.try_get("is_deleted")?,
    })
}

fn reset_token_from_row(row: &PgRow) -> Result<PasswordResetToken, sqlx::Error> {
    Ok(PasswordResetToken {
        id: ResetTokenId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        token_hash: row.try_get("token_hash")?,
        expires_at: row.try_get("expires_at")?,
        used_at: row.try_get("used_at")?,
        created_at: row.try_get("created_at")?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Listings
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Listing<UserFilter, UserSort> for PostgresStore {
    type Item = UserView;

    #[instrument(skip(self, query), err)]
    async fn count(&self, query: &ListQuery<UserFilter, UserSort>) -> StoreResult<u64> {
        self.count_rows(&sql::USERS, query).await
    }

    #[instrument(skip(self, query), err)]
    async fn fetch(&self, query: &ListQuery<UserFilter, UserSort>) -> StoreResult<Vec<UserView>> {
        let rows = self.fetch_rows(&sql::USERS, query).await?;
        decode("fetch_users", rows, user_view_from_row)
    }
}

#[async_trait]
impl Listing<RoleFilter, RoleSort> for PostgresStore {
    type Item = Role;

    async fn count(&self, query: &ListQuery<RoleFilter, RoleSort>) -> StoreResult<u64> {
        self.count_rows(&sql::ROLES, query).await
    }

    async fn fetch(&self, query: &ListQuery<RoleFilter, RoleSort>) -> StoreResult<Vec<Role>> {
        let rows = self.fetch_rows(&sql::ROLES, query).await?;
        decode("fetch_roles", rows, role_from_row)
    }
}

#[async_trait]
impl Listing<CmsFilter, CmsSort> for PostgresStore {
    type Item = CmsPage;

    async fn count(&self, query: &ListQuery<CmsFilter, CmsSort>) -> StoreResult<u64> {
        self.count_rows(&sql::CMS_PAGES, query).await
    }

    async fn fetch(&self, query: &ListQuery<CmsFilter, CmsSort>) -> StoreResult<Vec<CmsPage>> {
        let rows = self.fetch_rows(&sql::CMS_PAGES, query).await?;
        decode("fetch_cms_pages", rows, cms_from_row)
    }
}

#[async_trait]
impl Listing<FaqFilter, FaqSort> for PostgresStore {
    type Item = Faq;

    async fn count(&self, query: &ListQuery<FaqFilter, FaqSort>) -> StoreResult<u64> {
        self.count_rows(&sql::FAQS, query).await
    }

    async fn fetch(&self, query: &ListQuery<FaqFilter, FaqSort>) -> StoreResult<Vec<Faq>> {
        let rows = self.fetch_rows(&sql::FAQS, query).await?;
        decode("fetch_faqs", rows, faq_from_row)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

async fn replace_user_roles(
    tx: &mut Transaction<'static, Postgres>,
    user_id: UserId,
    role_ids: &[RoleId],
) -> StoreResult<()> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("replace_user_roles", e))?;

    let ids: Vec<Uuid> = role_ids.iter().map(|id| *id.as_uuid()).collect();
    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id) \
         SELECT $1, role_id FROM UNNEST($2::uuid[]) AS t(role_id) ON CONFLICT DO NOTHING",
    )
    .bind(user_id.as_uuid())
    .bind(ids)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("replace_user_roles", e))?;
    Ok(())
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1 AND NOT u.is_deleted"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("user", e))?;
        decode_one("user", row, user_from_row)
    }

    async fn user_view(&self, id: UserId) -> StoreResult<Option<UserView>> {
        let statement = format!("{} {} AND u.id = $1", sql::USERS.select, sql::USERS.from);
        let row = sqlx::query(&statement)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_view", e))?;
        decode_one("user_view", row, user_view_from_row)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.email = $1 AND NOT u.is_deleted"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("user_by_email", e))?;
        decode_one("user_by_email", row, user_from_row)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO users (id, full_name, email, phone_number, date_of_birth, country_id, \
             state_id, city_id, profile_image_url, is_active, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(user.date_of_birth)
        .bind(user.country_id)
        .bind(user.state_id)
        .bind(user.city_id)
        .bind(&user.profile_image_url)
        .bind(user.is_active)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        replace_user_roles(&mut tx, user.id, &user.role_ids).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("insert_user", e))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(
            "UPDATE users SET full_name = $2, email = $3, phone_number = $4, date_of_birth = $5, \
             country_id = $6, state_id = $7, city_id = $8, profile_image_url = $9, \
             is_active = $10, updated_at = $11 \
             WHERE id = $1 AND NOT is_deleted",
        )
        .bind(user.id.as_uuid())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(user.date_of_birth)
        .bind(user.country_id)
        .bind(user.state_id)
        .bind(user.city_id)
        .bind(&user.profile_image_url)
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        replace_user_roles(&mut tx, user.id, &user.role_ids).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("update_user", e))
    }

    async fn set_password(&self, id: UserId, password_hash: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id.as_uuid())
        .bind(password_hash)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_password", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId, at: DateTime<Utc>) -> StoreResult<()> {
        self.soft_delete("users", *id.as_uuid(), at).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RoleStore for PostgresStore {
    async fn role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        let statement = format!("{} {} AND id = $1", sql::ROLES.select, sql::ROLES.from);
        let row = sqlx::query(&statement)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("role", e))?;
        decode_one("role", row, role_from_row)
    }

    async fn roles_by_ids(&self, ids: &[RoleId]) -> StoreResult<Vec<Role>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let statement = format!(
            "{} {} AND id = ANY($1) ORDER BY name",
            sql::ROLES.select,
            sql::ROLES.from
        );
        let rows = sqlx::query(&statement)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("roles_by_ids", e))?;
        decode("roles_by_ids", rows, role_from_row)
    }

    async fn role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let statement = format!(
            "{} {} AND lower(name) = lower($1)",
            sql::ROLES.select,
            sql::ROLES.from
        );
        let row = sqlx::query(&statement)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("role_by_name", e))?;
        decode_one("role_by_name", row, role_from_row)
    }

    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO roles (id, name, description, is_active, permissions, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(role.id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.is_active)
        .bind(role.permissions.mask())
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE roles SET name = $2, description = $3, is_active = $4, permissions = $5, \
             updated_at = $6 WHERE id = $1 AND NOT is_deleted",
        )
        .bind(role.id.as_uuid())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.is_active)
        .bind(role.permissions.mask())
        .bind(role.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_role", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_role(&self, id: RoleId, at: DateTime<Utc>) -> StoreResult<()> {
        self.soft_delete("roles", *id.as_uuid(), at).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Content
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl CmsStore for PostgresStore {
    async fn cms_page(&self, id: CmsPageId) -> StoreResult<Option<CmsPage>> {
        let statement = format!("{} {} AND id = $1", sql::CMS_PAGES.select, sql::CMS_PAGES.from);
        let row = sqlx::query(&statement)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("cms_page", e))?;
        decode_one("cms_page", row, cms_from_row)
    }

    async fn cms_page_by_key(&self, key: &str) -> StoreResult<Option<CmsPage>> {
        let statement = format!("{} {} AND key = $1", sql::CMS_PAGES.select, sql::CMS_PAGES.from);
        let row = sqlx::query(&statement)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("cms_page_by_key", e))?;
        decode_one("cms_page_by_key", row, cms_from_row)
    }

    async fn insert_cms_page(&self, page: &CmsPage) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO cms_pages (id, key, title, meta_keyword, content, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(page.id.as_uuid())
        .bind(&page.key)
        .bind(&page.title)
        .bind(&page.meta_keyword)
        .bind(&page.content)
        .bind(page.is_active)
        .bind(page.created_at)
        .bind(page.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_cms_page", e))?;
        Ok(())
    }

    async fn update_cms_page(&self, page: &CmsPage) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE cms_pages SET key = $2, title = $3, meta_keyword = $4, content = $5, \
             is_active = $6, updated_at = $7 WHERE id = $1 AND NOT is_deleted",
        )
        .bind(page.id.as_uuid())
        .bind(&page.key)
        .bind(&page.title)
        .bind(&page.meta_keyword)
        .bind(&page.content)
        .bind(page.is_active)
        .bind(page.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_cms_page", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_cms_page(&self, id: CmsPageId, at: DateTime<Utc>) -> StoreResult<()> {
        self.soft_delete("cms_pages", *id.as_uuid(), at).await
    }
}

#[async_trait]
impl FaqStore for PostgresStore {
    async fn faq(&self, id: FaqId) -> StoreResult<Option<Faq>> {
        let statement = format!("{} {} AND id = $1", sql::FAQS.select, sql::FAQS.from);
        let row = sqlx::query(&statement)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("faq", e))?;
        decode_one("faq", row, faq_from_row)
    }

    async fn insert_faq(&self, faq: &Faq) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO faqs (id, question, answer, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(faq.id.as_uuid())
        .bind(&faq.question)
        .bind(&faq.answer)
        .bind(faq.is_active)
        .bind(faq.created_at)
        .bind(faq.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_faq", e))?;
        Ok(())
    }

    async fn update_faq(&self, faq: &Faq) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE faqs SET question = $2, answer = $3, is_active = $4, updated_at = $5 \
             WHERE id = $1 AND NOT is_deleted",
        )
        .bind(faq.id.as_uuid())
        .bind(&faq.question)
        .bind(&faq.answer)
        .bind(faq.is_active)
        .bind(faq.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_faq", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_faq(&self, id: FaqId, at: DateTime<Utc>) -> StoreResult<()> {
        self.soft_delete("faqs", *id.as_uuid(), at).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lookups and reset tokens
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LocationStore for PostgresStore {
    async fn countries(&self) -> StoreResult<Vec<Country>> {
        let rows = sqlx::query("SELECT id, name FROM countries ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("countries", e))?;
        decode("countries", rows, |row| {
            Ok(Country {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            })
        })
    }

    async fn states(&self, country_id: i32) -> StoreResult<Vec<State>> {
        let rows = sqlx::query("SELECT id, country_id, name FROM states WHERE country_id = $1 ORDER BY name")
            .bind(country_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("states", e))?;
        decode("states", rows, |row| {
            Ok(State {
                id: row.try_get("id")?,
                country_id: row.try_get("country_id")?,
                name: row.try_get("name")?,
            })
        })
    }

    async fn cities(&self, state_id: i32) -> StoreResult<Vec<City>> {
        let rows = sqlx::query("SELECT id, state_id, name FROM cities WHERE state_id = $1 ORDER BY name")
            .bind(state_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("cities", e))?;
        decode("cities", rows, |row| {
            Ok(City {
                id: row.try_get("id")?,
                state_id: row.try_get("state_id")?,
                name: row.try_get("name")?,
            })
        })
    }
}

#[async_trait]
impl ResetTokenStore for PostgresStore {
    async fn invalidate_reset_tokens(&self, user_id: UserId, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE password_reset_tokens SET used_at = $2 WHERE user_id = $1 AND used_at IS NULL")
            .bind(user_id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("invalidate_reset_tokens", e))?;
        Ok(())
    }

    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at, used_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(token.id.as_uuid())
        .bind(token.user_id.as_uuid())
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.used_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_reset_token", e))?;
        Ok(())
    }

    async fn reset_token_by_hash(&self, token_hash: &str) -> StoreResult<Option<PasswordResetToken>> {
        let row = sqlx::query(
            "SELECT id, user_id, token_hash, expires_at, used_at, created_at \
             FROM password_reset_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("reset_token_by_hash", e))?;
        decode_one("reset_token_by_hash", row, reset_token_from_row)
    }

    async fn mark_reset_token_used(&self, id: ResetTokenId, at: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE password_reset_tokens SET used_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("mark_reset_token_used", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
