use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use backoffice_core::listing::filter;
use backoffice_core::{
    DomainError, DomainResult, Entity, FilterMap, FilterSet, ListQuery, Predicate, RoleId,
    SoftDelete, SortBy, SortKey, UserId, cmp_opt_text, cmp_text,
};

use crate::location::LocationNames;
use crate::validate;

/// Stored user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    /// Always stored lowercase.
    pub email: String,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country_id: Option<i32>,
    pub state_id: Option<i32>,
    pub city_id: Option<i32>,
    pub profile_image_url: Option<String>,
    pub is_active: bool,
    pub password_hash: String,
    pub role_ids: Vec<RoleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

impl SoftDelete for User {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn mark_deleted(&mut self) {
        self.is_deleted = true;
        self.is_active = false;
    }
}

impl User {
    /// New active user from validated input.
    pub fn create(input: &UserInput, password_hash: String, now: DateTime<Utc>) -> Self {
        let mut user = Self {
            id: UserId::new(),
            full_name: String::new(),
            email: String::new(),
            phone_number: None,
            date_of_birth: None,
            country_id: None,
            state_id: None,
            city_id: None,
            profile_image_url: None,
            is_active: input.is_active,
            password_hash,
            role_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };
        user.apply(input, now);
        user
    }

    /// Copy editable fields from `input`. The password is handled separately.
    pub fn apply(&mut self, input: &UserInput, now: DateTime<Utc>) {
        self.full_name = input.full_name.trim().to_string();
        self.email = input.normalized_email();
        self.phone_number = non_blank(input.phone_number.as_deref());
        self.date_of_birth = input.date_of_birth;
        self.country_id = input.country_id;
        self.state_id = input.state_id;
        self.city_id = input.city_id;
        self.profile_image_url = non_blank(input.profile_image_url.as_deref());
        self.is_active = input.is_active;
        self.role_ids = input.role_ids.clone();
        self.updated_at = now;
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ─────────────────────────────────────────────────────────────────────────────
// Projection
// ─────────────────────────────────────────────────────────────────────────────

/// User as returned by list and detail endpoints.
///
/// Location names sit next to their ids; roles are resolved to names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub country_id: Option<i32>,
    pub country_name: Option<String>,
    pub state_id: Option<i32>,
    pub state_name: Option<String>,
    pub city_id: Option<i32>,
    pub city_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub is_active: bool,
    pub role_ids: Vec<RoleId>,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl UserView {
    /// `roles` are the user's live roles as `(id, name)`, already ordered.
    pub fn project(user: &User, locations: LocationNames, roles: Vec<(RoleId, String)>) -> Self {
        let (role_ids, roles) = roles.into_iter().unzip();
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            date_of_birth: user.date_of_birth,
            country_id: user.country_id,
            country_name: locations.country,
            state_id: user.state_id,
            state_name: locations.state,
            city_id: user.city_id,
            city_name: locations.city,
            profile_image_url: user.profile_image_url.clone(),
            is_active: user.is_active,
            role_ids,
            roles,
            created_at: user.created_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Listing
// ─────────────────────────────────────────────────────────────────────────────

/// Recognized user filters. Text needles are lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Exact match on the id's canonical (lowercase, hyphenated) text.
    pub id: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    /// Prefix of the country name.
    pub country: Option<String>,
    pub is_active: Option<bool>,
    /// Substring of any role name. Membership is multi-valued, so this is a
    /// "contains" match rather than a prefix.
    pub roles: Option<String>,
}

impl FilterSet for UserFilter {
    fn from_map(filters: &FilterMap) -> Self {
        Self {
            id: filter::needle(filters, "id"),
            full_name: filter::needle(filters, "fullName"),
            email: filter::needle(filters, "email"),
            phone_number: filter::needle(filters, "phoneNumber"),
            country: filter::needle(filters, "country"),
            is_active: filter::flag(filters, "isActive"),
            roles: filter::needle(filters, "roles"),
        }
    }
}

impl Predicate<UserView> for UserFilter {
    fn matches(&self, u: &UserView) -> bool {
        let opt_prefix = |field: Option<&String>, needle: &str| {
            field.is_some_and(|f| filter::starts_with(f, needle))
        };

        filter::check(self.id.as_deref(), |id| u.id.to_string() == id)
            && filter::check(self.full_name.as_deref(), |n| filter::starts_with(&u.full_name, n))
            && filter::check(self.email.as_deref(), |n| filter::starts_with(&u.email, n))
            && filter::check(self.phone_number.as_deref(), |n| {
                opt_prefix(u.phone_number.as_ref(), n)
            })
            && filter::check(self.country.as_deref(), |n| {
                opt_prefix(u.country_name.as_ref(), n)
            })
            && filter::check(self.is_active.as_ref(), |a| u.is_active == *a)
            && filter::check(self.roles.as_deref(), |n| {
                u.roles.iter().any(|r| filter::contains(r, n))
            })
    }
}

/// Sortable user columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSort {
    FullName,
    Email,
    PhoneNumber,
    DateOfBirth,
    Country,
    CreatedAt,
    IsActive,
}

impl SortKey for UserSort {
    const COLUMNS: &'static [(&'static str, Self)] = &[
        ("fullName", UserSort::FullName),
        ("email", UserSort::Email),
        ("phoneNumber", UserSort::PhoneNumber),
        ("dateOfBirth", UserSort::DateOfBirth),
        ("country", UserSort::Country),
        ("createdAt", UserSort::CreatedAt),
        ("isActive", UserSort::IsActive),
    ];
    const CREATED_AT: Self = UserSort::CreatedAt;
}

impl SortBy<UserSort> for UserView {
    fn compare_by(&self, other: &Self, key: UserSort) -> Ordering {
        match key {
            UserSort::FullName => cmp_text(&self.full_name, &other.full_name),
            UserSort::Email => cmp_text(&self.email, &other.email),
            UserSort::PhoneNumber => {
                cmp_opt_text(self.phone_number.as_deref(), other.phone_number.as_deref())
            }
            UserSort::DateOfBirth => self.date_of_birth.cmp(&other.date_of_birth),
            UserSort::Country => {
                cmp_opt_text(self.country_name.as_deref(), other.country_name.as_deref())
            }
            UserSort::CreatedAt => self.created_at.cmp(&other.created_at),
            UserSort::IsActive => self.is_active.cmp(&other.is_active),
        }
    }
}

pub type UserQuery = ListQuery<UserFilter, UserSort>;

// ─────────────────────────────────────────────────────────────────────────────
// Input
// ─────────────────────────────────────────────────────────────────────────────

fn active_by_default() -> bool {
    true
}

/// Create/update payload of the user form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    #[validate(length(min = 2, max = 50), custom(function = "validate::full_name"))]
    pub full_name: String,
    #[validate(custom(function = "validate::email"))]
    pub email: String,
    #[validate(custom(function = "validate::phone_number"))]
    pub phone_number: Option<String>,
    #[validate(custom(function = "validate::adult"))]
    pub date_of_birth: Option<NaiveDate>,
    pub country_id: Option<i32>,
    pub state_id: Option<i32>,
    pub city_id: Option<i32>,
    #[validate(length(max = 500))]
    pub profile_image_url: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    /// Required on create, optional on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate::password"))]
    pub password: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
}

impl UserInput {
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }

    pub fn validate_for_create(&self) -> DomainResult<()> {
        self.validate().map_err(validate::into_domain)?;
        if self.password.is_none() {
            return Err(DomainError::validation("password: Password is required"));
        }
        if self.role_ids.is_empty() {
            return Err(DomainError::validation("roleIds: At least one role is required"));
        }
        Ok(())
    }

    pub fn validate_for_update(&self) -> DomainResult<()> {
        self.validate().map_err(validate::into_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_core::ListRequest;

    fn input() -> UserInput {
        UserInput {
            full_name: "Ada Lovelace".into(),
            email: "Ada@Example.com".into(),
            phone_number: Some("0123456789".into()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1),
            country_id: Some(1),
            state_id: None,
            city_id: None,
            profile_image_url: None,
            is_active: true,
            password: Some("Str0ng@pass".into()),
            role_ids: vec![RoleId::new()],
        }
    }

    fn view(name: &str, country: Option<&str>, roles: &[&str], active: bool) -> UserView {
        let mut user = User::create(&input(), "hash".into(), Utc::now());
        user.full_name = name.into();
        user.is_active = active;
        let locations = LocationNames {
            country: country.map(str::to_string),
            ..Default::default()
        };
        let roles = roles.iter().map(|r| (RoleId::new(), r.to_string())).collect();
        UserView::project(&user, locations, roles)
    }

    fn filter_of(req: ListRequest) -> UserFilter {
        UserFilter::from_map(&req.filters)
    }

    #[test]
    fn create_normalizes_email_and_trims() {
        let mut i = input();
        i.full_name = "  Ada Lovelace ".into();
        i.phone_number = Some("  ".into());
        let user = User::create(&i, "hash".into(), Utc::now());
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.full_name, "Ada Lovelace");
        assert_eq!(user.phone_number, None);
    }

    #[test]
    fn roles_filter_matches_inside_any_role_name() {
        let f = filter_of(ListRequest::default().filter("roles", "ADMIN"));
        assert!(f.matches(&view("Ada", None, &["Editor", "SuperAdmin"], true)));
        assert!(!f.matches(&view("Ada", None, &["Editor"], true)));
    }

    #[test]
    fn country_is_a_prefix_on_the_resolved_name() {
        let f = filter_of(ListRequest::default().filter("country", "ind"));
        assert!(f.matches(&view("Ada", Some("India"), &[], true)));
        assert!(!f.matches(&view("Ada", Some("Saint Indiana"), &[], true)));
        assert!(!f.matches(&view("Ada", None, &[], true)));
    }

    #[test]
    fn id_filter_is_exact() {
        let v = view("Ada", None, &[], true);
        let exact = filter_of(ListRequest::default().filter("id", v.id.to_string().to_uppercase()));
        assert!(exact.matches(&v));

        let partial = filter_of(ListRequest::default().filter("id", &v.id.to_string()[..8]));
        assert!(!partial.matches(&v));
    }

    #[test]
    fn sort_whitelist_excludes_secrets() {
        assert_eq!(UserSort::lookup("passwordHash"), None);
        assert_eq!(UserSort::lookup("COUNTRY"), Some(UserSort::Country));
    }

    #[test]
    fn create_requires_password_and_role() {
        assert!(input().validate_for_create().is_ok());

        let mut no_password = input();
        no_password.password = None;
        assert!(no_password.validate_for_create().is_err());
        assert!(no_password.validate_for_update().is_ok());

        let mut no_roles = input();
        no_roles.role_ids.clear();
        assert!(no_roles.validate_for_create().is_err());
    }

    #[test]
    fn form_rules_are_enforced() {
        let mut minor = input();
        minor.date_of_birth = Some(Utc::now().date_naive());
        assert!(matches!(minor.validate_for_update(), Err(DomainError::Validation(_))));

        let mut weak = input();
        weak.password = Some("password".into());
        assert!(weak.validate_for_create().is_err());

        let mut short = input();
        short.full_name = "A".into();
        assert!(short.validate_for_update().is_err());
    }

    #[test]
    fn input_reads_camel_case_and_defaults_active() {
        let input: UserInput = serde_json::from_value(serde_json::json!({
            "fullName": "Grace Hopper",
            "email": "grace@example.com",
            "roleIds": []
        }))
        .unwrap();
        assert!(input.is_active);
        assert_eq!(input.password, None);
    }
}
