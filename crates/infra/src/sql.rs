//! SQL rendering of listing queries for Postgres.
//!
//! The count statement and the page statement are built from the same
//! [`SqlSource`] and the same [`SqlFilter::push_predicates`] call, so they
//! always carry an identical WHERE clause. ORDER BY only ever emits a column
//! expression taken from a [`SqlSort`] whitelist; user input reaches the
//! statement through bind parameters only.

use sqlx::{Postgres, QueryBuilder};

use backoffice_content::{CmsFilter, CmsSort, FaqFilter, FaqSort};
use backoffice_core::{ListQuery, Sort, SortDirection, SortKey};
use backoffice_identity::{RoleFilter, RoleSort, UserFilter, UserSort};

pub type Builder = QueryBuilder<'static, Postgres>;

/// Projection and row source of one entity's listing.
///
/// `from` must end in a WHERE clause (at least the soft-delete guard) so that
/// predicates can be appended with `AND`.
#[derive(Debug, Clone, Copy)]
pub struct SqlSource {
    pub select: &'static str,
    pub from: &'static str,
}

pub trait SqlFilter {
    /// Append ` AND <predicate>` for every active filter.
    fn push_predicates(&self, builder: &mut Builder);
}

pub trait SqlSort: SortKey {
    /// ORDER BY expression. Text columns are lowercased to match the
    /// case-insensitive in-memory ordering.
    fn column(self) -> &'static str;
}

pub fn count_statement<F: SqlFilter, K>(source: &SqlSource, query: &ListQuery<F, K>) -> Builder {
    let mut builder = Builder::new("SELECT COUNT(*) ");
    builder.push(source.from);
    query.filter.push_predicates(&mut builder);
    builder
}

pub fn page_statement<F: SqlFilter, K: SqlSort>(source: &SqlSource, query: &ListQuery<F, K>) -> Builder {
    let mut builder = Builder::new(source.select);
    builder.push(" ").push(source.from);
    query.filter.push_predicates(&mut builder);
    push_order_by(&mut builder, query.sort);

    let limit = i64::try_from(query.page.limit()).unwrap_or(i64::MAX);
    let offset = i64::try_from(query.page.offset()).unwrap_or(i64::MAX);
    builder.push(" LIMIT ").push_bind(limit);
    builder.push(" OFFSET ").push_bind(offset);
    builder
}

/// Nulls sort as the smallest value, matching in-memory `Option` ordering.
pub fn push_order_by<K: SqlSort>(builder: &mut Builder, sort: Sort<K>) {
    let nulls = match sort.direction {
        SortDirection::Asc => "NULLS FIRST",
        SortDirection::Desc => "NULLS LAST",
    };
    builder
        .push(" ORDER BY ")
        .push(sort.key.column())
        .push(" ")
        .push(sort.direction.as_sql())
        .push(" ")
        .push(nulls);
}

/// Escape LIKE metacharacters so the needle matches literally.
pub fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_prefix(builder: &mut Builder, column: &str, needle: Option<&str>) {
    if let Some(needle) = needle {
        builder
            .push(" AND lower(")
            .push(column)
            .push(") LIKE ")
            .push_bind(format!("{}%", escape_like(needle)));
    }
}

fn push_flag(builder: &mut Builder, column: &str, value: Option<bool>) {
    if let Some(value) = value {
        builder.push(" AND ").push(column).push(" = ").push_bind(value);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

pub const USERS: SqlSource = SqlSource {
    select: "SELECT u.id, u.full_name, u.email, u.phone_number, u.date_of_birth, \
             u.country_id, c.name AS country_name, u.state_id, s.name AS state_name, \
             u.city_id, ci.name AS city_name, u.profile_image_url, u.is_active, u.created_at, \
             ARRAY(SELECT r.id FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
                   WHERE ur.user_id = u.id AND NOT r.is_deleted ORDER BY r.name) AS role_ids, \
             ARRAY(SELECT r.name FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
                   WHERE ur.user_id = u.id AND NOT r.is_deleted ORDER BY r.name) AS role_names",
    from: "FROM users u \
           LEFT JOIN countries c ON c.id = u.country_id \
           LEFT JOIN states s ON s.id = u.state_id \
           LEFT JOIN cities ci ON ci.id = u.city_id \
           WHERE NOT u.is_deleted",
};

impl SqlFilter for UserFilter {
    fn push_predicates(&self, builder: &mut Builder) {
        if let Some(id) = &self.id {
            builder.push(" AND u.id::text = ").push_bind(id.clone());
        }
        push_prefix(builder, "u.full_name", self.full_name.as_deref());
        push_prefix(builder, "u.email", self.email.as_deref());
        push_prefix(builder, "u.phone_number", self.phone_number.as_deref());
        push_prefix(builder, "c.name", self.country.as_deref());
        push_flag(builder, "u.is_active", self.is_active);
        if let Some(role) = &self.roles {
            builder
                .push(
                    " AND EXISTS (SELECT 1 FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
                     WHERE ur.user_id = u.id AND NOT r.is_deleted AND lower(r.name) LIKE ",
                )
                .push_bind(format!("%{}%", escape_like(role)))
                .push(")");
        }
    }
}

impl SqlSort for UserSort {
    fn column(self) -> &'static str {
        match self {
            UserSort::FullName => "lower(u.full_name)",
            UserSort::Email => "lower(u.email)",
            UserSort::PhoneNumber => "lower(u.phone_number)",
            UserSort::DateOfBirth => "u.date_of_birth",
            UserSort::Country => "lower(c.name)",
            UserSort::CreatedAt => "u.created_at",
            UserSort::IsActive => "u.is_active",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

pub const ROLES: SqlSource = SqlSource {
    select: "SELECT id, name, description, is_active, permissions, created_at, updated_at, is_deleted",
    from: "FROM roles WHERE NOT is_deleted",
};

impl SqlFilter for RoleFilter {
    fn push_predicates(&self, builder: &mut Builder) {
        push_prefix(builder, "name", self.name.as_deref());
        push_prefix(builder, "description", self.description.as_deref());
        push_flag(builder, "is_active", self.is_active);
    }
}

impl SqlSort for RoleSort {
    fn column(self) -> &'static str {
        match self {
            RoleSort::Name => "lower(name)",
            RoleSort::Description => "lower(description)",
            RoleSort::IsActive => "is_active",
            RoleSort::CreatedAt => "created_at",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CMS pages
// ─────────────────────────────────────────────────────────────────────────────

pub const CMS_PAGES: SqlSource = SqlSource {
    select: "SELECT id, key, title, meta_keyword, content, is_active, created_at, updated_at, is_deleted",
    from: "FROM cms_pages WHERE NOT is_deleted",
};

impl SqlFilter for CmsFilter {
    fn push_predicates(&self, builder: &mut Builder) {
        push_prefix(builder, "key", self.key.as_deref());
        push_prefix(builder, "title", self.title.as_deref());
        push_prefix(builder, "meta_keyword", self.meta_keyword.as_deref());
        push_flag(builder, "is_active", self.is_active);
    }
}

impl SqlSort for CmsSort {
    fn column(self) -> &'static str {
        match self {
            CmsSort::Key => "lower(key)",
            CmsSort::Title => "lower(title)",
            CmsSort::MetaKeyword => "lower(meta_keyword)",
            CmsSort::IsActive => "is_active",
            CmsSort::CreatedAt => "created_at",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FAQs
// ─────────────────────────────────────────────────────────────────────────────

pub const FAQS: SqlSource = SqlSource {
    select: "SELECT id, question, answer, is_active, created_at, updated_at, is_deleted",
    from: "FROM faqs WHERE NOT is_deleted",
};

impl SqlFilter for FaqFilter {
    fn push_predicates(&self, builder: &mut Builder) {
        push_prefix(builder, "question", self.question.as_deref());
        push_flag(builder, "is_active", self.is_active);
    }
}

impl SqlSort for FaqSort {
    fn column(self) -> &'static str {
        match self {
            FaqSort::Question => "lower(question)",
            FaqSort::IsActive => "is_active",
            FaqSort::CreatedAt => "created_at",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_core::ListRequest;
    use backoffice_identity::UserQuery;

    fn user_query(req: ListRequest) -> UserQuery {
        UserQuery::from_request(&req)
    }

    #[test]
    fn count_and_page_share_the_where_clause() {
        let q = user_query(
            ListRequest::new(2, 10)
                .filter("fullName", "ada")
                .filter("isActive", "true")
                .filter("roles", "admin")
                .sorted_by("country", "asc"),
        );
        let count = count_statement(&USERS, &q);
        let page = page_statement(&USERS, &q);

        let tail = count.sql().trim_start_matches("SELECT COUNT(*) ");
        assert!(page.sql().contains(tail), "page: {}\ncount: {}", page.sql(), count.sql());
        assert!(tail.ends_with("LIKE $3)"));
        assert!(page.sql().ends_with("ORDER BY lower(c.name) ASC NULLS FIRST LIMIT $4 OFFSET $5"));
    }

    #[test]
    fn no_filters_leave_only_the_soft_delete_guard() {
        let q = user_query(ListRequest::default());
        assert!(count_statement(&USERS, &q).sql().ends_with("WHERE NOT u.is_deleted"));
    }

    #[test]
    fn unknown_sort_column_is_never_rendered() {
        let q = user_query(ListRequest::default().sorted_by("password_hash; DROP TABLE users", "asc"));
        let sql = page_statement(&USERS, &q).into_sql();
        assert!(sql.contains("ORDER BY u.created_at DESC NULLS LAST"));
        assert!(!sql.contains("DROP"));
    }

    #[test]
    fn filter_values_are_bound_not_inlined() {
        let q = user_query(ListRequest::default().filter("email", "x' OR '1'='1"));
        let sql = count_statement(&USERS, &q).into_sql();
        assert!(!sql.contains("OR '1'"));
        assert!(sql.contains("lower(u.email) LIKE $1"));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn role_listing_renders_whitelisted_columns() {
        let req = ListRequest::default().filter("name", "sup").sorted_by("NAME", "desc");
        let q = backoffice_identity::RoleQuery::from_request(&req);
        let sql = page_statement(&ROLES, &q).into_sql();
        assert!(sql.contains("WHERE NOT is_deleted AND lower(name) LIKE $1"));
        assert!(sql.contains("ORDER BY lower(name) DESC NULLS LAST"));
    }
}
