//! Infrastructure layer: configuration, storage, SQL rendering and mail.

pub mod config;
pub mod error;
pub mod mailer;
pub mod seed;
pub mod sql;
pub mod store;

pub use config::{AppConfig, ConfigError, SeedAdmin};
pub use error::{StoreError, StoreResult};
pub use mailer::{InMemoryOutbox, MailError, Mailer, OutgoingMail};
pub use store::{
    BackofficeStore, CmsStore, FaqStore, InMemoryStore, Listing, LocationStore, PostgresStore,
    ResetTokenStore, RoleStore, UserStore, compose,
};
