use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use backoffice_auth::Permissions;
use backoffice_core::listing::filter;
use backoffice_core::{
    DomainResult, Entity, FilterMap, FilterSet, ListQuery, Predicate, RoleId, SoftDelete, SortBy,
    SortKey, cmp_text,
};

use crate::validate;

/// A named permission bundle assigned to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    /// Unique, compared case-insensitively.
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub permissions: Permissions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &RoleId {
        &self.id
    }
}

impl SoftDelete for Role {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn mark_deleted(&mut self) {
        self.is_deleted = true;
        self.is_active = false;
    }
}

impl Role {
    pub fn create(input: &RoleInput, now: DateTime<Utc>) -> Self {
        Self {
            id: RoleId::new(),
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            is_active: input.is_active,
            permissions: input.permissions,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    pub fn apply(&mut self, input: &RoleInput, now: DateTime<Utc>) {
        self.name = input.name.trim().to_string();
        self.description = input.description.trim().to_string();
        self.is_active = input.is_active;
        self.permissions = input.permissions;
        self.updated_at = now;
    }

    /// Whether this role contributes to a holder's effective permissions.
    pub fn grants(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    pub fn same_name(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other.trim())
    }
}

/// Role as returned to clients: the mask plus its member values for editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub permissions: Permissions,
    pub permission_values: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<&Role> for RoleView {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
            description: role.description.clone(),
            is_active: role.is_active,
            permissions: role.permissions,
            permission_values: role.permissions.values(),
            created_at: role.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleFilter {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl FilterSet for RoleFilter {
    fn from_map(filters: &FilterMap) -> Self {
        Self {
            name: filter::needle(filters, "name"),
            description: filter::needle(filters, "description"),
            is_active: filter::flag(filters, "isActive"),
        }
    }
}

impl Predicate<Role> for RoleFilter {
    fn matches(&self, r: &Role) -> bool {
        filter::check(self.name.as_deref(), |n| filter::starts_with(&r.name, n))
            && filter::check(self.description.as_deref(), |n| {
                filter::starts_with(&r.description, n)
            })
            && filter::check(self.is_active.as_ref(), |a| r.is_active == *a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSort {
    Name,
    Description,
    IsActive,
    CreatedAt,
}

impl SortKey for RoleSort {
    const COLUMNS: &'static [(&'static str, Self)] = &[
        ("name", RoleSort::Name),
        ("description", RoleSort::Description),
        ("isActive", RoleSort::IsActive),
        ("createdAt", RoleSort::CreatedAt),
    ];
    const CREATED_AT: Self = RoleSort::CreatedAt;
}

impl SortBy<RoleSort> for Role {
    fn compare_by(&self, other: &Self, key: RoleSort) -> Ordering {
        match key {
            RoleSort::Name => cmp_text(&self.name, &other.name),
            RoleSort::Description => cmp_text(&self.description, &other.description),
            RoleSort::IsActive => self.is_active.cmp(&other.is_active),
            RoleSort::CreatedAt => self.created_at.cmp(&other.created_at),
        }
    }
}

pub type RoleQuery = ListQuery<RoleFilter, RoleSort>;

fn active_by_default() -> bool {
    true
}

/// Create/update payload of the role form.
///
/// `permissions` accepts a mask (`3`) or flag values (`[1, 2]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    #[validate(length(max = 50), custom(function = "validate::not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 250))]
    pub description: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub permissions: Permissions,
}

impl RoleInput {
    pub fn check(&self) -> DomainResult<()> {
        self.validate().map_err(validate::into_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_permissions_read_back_as_mask() {
        let input: RoleInput = serde_json::from_value(serde_json::json!({
            "name": "Support",
            "permissions": [1, 2]
        }))
        .unwrap();
        let view = RoleView::from(&Role::create(&input, Utc::now()));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["permissions"], 3);
        assert_eq!(json["permissionValues"], serde_json::json!([1, 2]));
        assert_eq!(json["isActive"], true);
    }

    #[test]
    fn blank_name_is_rejected() {
        let input: RoleInput = serde_json::from_value(serde_json::json!({ "name": "  " })).unwrap();
        assert!(input.check().is_err());
    }

    #[test]
    fn inactive_or_deleted_roles_grant_nothing() {
        let input: RoleInput =
            serde_json::from_value(serde_json::json!({ "name": "Ops", "permissions": 1 })).unwrap();
        let mut role = Role::create(&input, Utc::now());
        assert!(role.grants());
        role.mark_deleted();
        assert!(!role.grants());
    }

    #[test]
    fn name_comparison_ignores_case() {
        let input: RoleInput = serde_json::from_value(serde_json::json!({ "name": "Admin" })).unwrap();
        assert!(Role::create(&input, Utc::now()).same_name(" ADMIN "));
    }
}
