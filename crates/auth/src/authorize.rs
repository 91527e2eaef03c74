use thiserror::Error;

use crate::{Permissions, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for an operation requiring `required`.
///
/// - No IO
/// - No panics
/// - Every flag of `required` must be held
pub fn authorize(principal: &Principal, required: Permissions) -> Result<(), AuthzError> {
    let missing = required.difference(principal.permissions);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(missing.names().join(", ")))
    }
}

/// Effective permissions of a user: the union of their roles' masks.
pub fn effective_permissions<I>(role_masks: I) -> Permissions
where
    I: IntoIterator<Item = Permissions>,
{
    role_masks
        .into_iter()
        .fold(Permissions::empty(), |acc, mask| acc | mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_core::UserId;

    fn principal(permissions: Permissions) -> Principal {
        Principal::new(UserId::new(), vec!["Editor".into()], permissions)
    }

    #[test]
    fn granted_when_flag_is_held() {
        let p = principal(Permissions::VIEW_USER | Permissions::EDIT_USER);
        assert_eq!(authorize(&p, Permissions::EDIT_USER), Ok(()));
    }

    #[test]
    fn denied_names_the_missing_flag() {
        let p = principal(Permissions::VIEW_USER);
        let err = authorize(&p, Permissions::DELETE_USER).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("DELETE_USER".into()));
    }

    #[test]
    fn every_required_flag_must_be_held() {
        let p = principal(Permissions::VIEW_FAQ);
        assert!(authorize(&p, Permissions::VIEW_FAQ | Permissions::ADD_FAQ).is_err());
    }

    #[test]
    fn roles_union_into_effective_permissions() {
        let effective = effective_permissions([Permissions::VIEW_USER, Permissions::VIEW_CMS | Permissions::ADD_CMS]);
        assert_eq!(effective.mask(), 1 | 4096 | 8192);
        assert!(effective_permissions(std::iter::empty()).is_empty());
    }
}
