//! `backoffice-auth`: pure authentication/authorization boundary.
//!
//! No HTTP and no storage here. Handlers and stores call into it.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod reset;

pub use authorize::{AuthzError, authorize, effective_permissions};
pub use claims::{JwtClaims, TokenType, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtCodec, JwtError, JwtValidator, TokenPair};
pub use password::{PasswordError, check_strength, hash_password, verify_password};
pub use permissions::{PERMISSION_GROUPS, PermissionGroup, PermissionOption, Permissions, PermissionsInput};
pub use principal::Principal;
pub use reset::{IssuedResetToken, RESET_TOKEN_TTL_MINUTES, hash_reset_token, issue_reset_token, reset_link};
