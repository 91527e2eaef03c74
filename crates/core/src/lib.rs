//! `backoffice-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error, the response envelope and the listing
//! (filter/sort/page) composer shared by every entity.

pub mod entity;
pub mod error;
pub mod id;
pub mod listing;
pub mod response;

pub use entity::{Entity, SoftDelete};
pub use error::{DomainError, DomainResult};
pub use id::{CmsPageId, FaqId, ResetTokenId, RoleId, UserId};
pub use listing::{
    FilterMap, FilterSet, ListQuery, ListRequest, Page, PageSpec, Predicate, Sort, SortBy,
    SortDirection, SortKey, cmp_opt_text, cmp_text,
};
pub use response::ApiResponse;
