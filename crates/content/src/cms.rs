use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use backoffice_core::listing::filter;
use backoffice_core::{
    CmsPageId, DomainResult, Entity, FilterMap, FilterSet, ListQuery, Predicate, SoftDelete,
    SortBy, SortKey, cmp_text,
};

/// A CMS page addressed by a unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmsPage {
    pub id: CmsPageId,
    pub key: String,
    pub title: String,
    pub meta_keyword: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub is_deleted: bool,
}

impl Entity for CmsPage {
    type Id = CmsPageId;

    fn id(&self) -> &CmsPageId {
        &self.id
    }
}

impl SoftDelete for CmsPage {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }
}

impl CmsPage {
    pub fn create(input: &CmsInput, now: DateTime<Utc>) -> Self {
        let mut page = Self {
            id: CmsPageId::new(),
            key: String::new(),
            title: String::new(),
            meta_keyword: String::new(),
            content: String::new(),
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };
        page.apply(input, now);
        page
    }

    pub fn apply(&mut self, input: &CmsInput, now: DateTime<Utc>) {
        self.key = input.key.trim().to_string();
        self.title = input.title.trim().to_string();
        self.meta_keyword = input.meta_keyword.trim().to_string();
        self.content = input.content.clone();
        self.is_active = input.is_active;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmsFilter {
    pub key: Option<String>,
    pub title: Option<String>,
    pub meta_keyword: Option<String>,
    pub is_active: Option<bool>,
}

impl FilterSet for CmsFilter {
    fn from_map(filters: &FilterMap) -> Self {
        Self {
            key: filter::needle(filters, "key"),
            title: filter::needle(filters, "title"),
            meta_keyword: filter::needle(filters, "metaKeyword"),
            is_active: filter::flag(filters, "isActive"),
        }
    }
}

impl Predicate<CmsPage> for CmsFilter {
    fn matches(&self, p: &CmsPage) -> bool {
        filter::check(self.key.as_deref(), |n| filter::starts_with(&p.key, n))
            && filter::check(self.title.as_deref(), |n| filter::starts_with(&p.title, n))
            && filter::check(self.meta_keyword.as_deref(), |n| {
                filter::starts_with(&p.meta_keyword, n)
            })
            && filter::check(self.is_active.as_ref(), |a| p.is_active == *a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmsSort {
    Key,
    Title,
    MetaKeyword,
    IsActive,
    CreatedAt,
}

impl SortKey for CmsSort {
    const COLUMNS: &'static [(&'static str, Self)] = &[
        ("key", CmsSort::Key),
        ("title", CmsSort::Title),
        ("metaKeyword", CmsSort::MetaKeyword),
        ("isActive", CmsSort::IsActive),
        ("createdAt", CmsSort::CreatedAt),
    ];
    const CREATED_AT: Self = CmsSort::CreatedAt;
}

impl SortBy<CmsSort> for CmsPage {
    fn compare_by(&self, other: &Self, key: CmsSort) -> Ordering {
        match key {
            CmsSort::Key => cmp_text(&self.key, &other.key),
            CmsSort::Title => cmp_text(&self.title, &other.title),
            CmsSort::MetaKeyword => cmp_text(&self.meta_keyword, &other.meta_keyword),
            CmsSort::IsActive => self.is_active.cmp(&other.is_active),
            CmsSort::CreatedAt => self.created_at.cmp(&other.created_at),
        }
    }
}

pub type CmsQuery = ListQuery<CmsFilter, CmsSort>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CmsInput {
    #[validate(length(max = 100), custom(function = "crate::required"))]
    pub key: String,
    #[validate(length(max = 150), custom(function = "crate::required"))]
    pub title: String,
    #[validate(length(max = 200), custom(function = "crate::required"))]
    pub meta_keyword: String,
    #[validate(custom(function = "crate::required"))]
    pub content: String,
    #[serde(default = "crate::active_by_default")]
    pub is_active: bool,
}

impl CmsInput {
    pub fn check(&self) -> DomainResult<()> {
        self.validate().map_err(crate::into_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_core::ListRequest;

    fn input(key: &str, title: &str) -> CmsInput {
        CmsInput {
            key: key.into(),
            title: title.into(),
            meta_keyword: "about".into(),
            content: "<p>hello</p>".into(),
            is_active: true,
        }
    }

    #[test]
    fn key_prefix_and_active_flag_combine() {
        let now = Utc::now();
        let mut hidden = CmsPage::create(&input("about-team", "Team"), now);
        hidden.is_active = false;
        let pages = vec![
            CmsPage::create(&input("about-us", "About"), now),
            hidden,
            CmsPage::create(&input("terms", "Terms"), now),
        ];

        let req = ListRequest::new(1, 10).filter("key", "About").filter("isActive", "TRUE");
        let page = CmsQuery::from_request(&req).run(&pages);
        assert_eq!(page.total_items, 1);
        assert_eq!(page.data[0].key, "about-us");
    }

    #[test]
    fn missing_fields_fail_validation() {
        assert!(input("k", "t").check().is_ok());
        assert!(input(" ", "t").check().is_err());
        assert!(input(&"k".repeat(101), "t").check().is_err());
    }
}
