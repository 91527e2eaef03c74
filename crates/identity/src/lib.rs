//! Users and roles of the back office.
//!
//! Records, their listing filters and sort whitelists, and input validation.
//! Storage lives in `backoffice-infra`.

pub mod location;
pub mod reset_token;
pub mod role;
pub mod user;
pub mod validate;

pub use location::{City, Country, LocationNames, State};
pub use reset_token::PasswordResetToken;
pub use role::{Role, RoleFilter, RoleInput, RoleQuery, RoleSort, RoleView};
pub use user::{User, UserFilter, UserInput, UserQuery, UserSort, UserView};
