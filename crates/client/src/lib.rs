//! Typed HTTP client for the back-office API.
//!
//! The client owns an explicit [`Session`] and renews the access token
//! shortly before it expires, so callers never handle refresh themselves.

mod client;
mod error;
mod session;

pub use client::{BackofficeClient, PermissionGroupView, PermissionOptionView, WhoAmI};
pub use error::{ClientError, ClientResult};
pub use session::Session;
