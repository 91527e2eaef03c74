use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use backoffice_core::listing::filter;
use backoffice_core::{
    DomainResult, Entity, FaqId, FilterMap, FilterSet, ListQuery, Predicate, SoftDelete, SortBy,
    SortKey, cmp_text,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub id: FaqId,
    pub question: String,
    pub answer: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub is_deleted: bool,
}

impl Entity for Faq {
    type Id = FaqId;

    fn id(&self) -> &FaqId {
        &self.id
    }
}

impl SoftDelete for Faq {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }
}

impl Faq {
    pub fn create(input: &FaqInput, now: DateTime<Utc>) -> Self {
        Self {
            id: FaqId::new(),
            question: input.question.trim().to_string(),
            answer: input.answer.trim().to_string(),
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    pub fn apply(&mut self, input: &FaqInput, now: DateTime<Utc>) {
        self.question = input.question.trim().to_string();
        self.answer = input.answer.trim().to_string();
        self.is_active = input.is_active;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaqFilter {
    pub question: Option<String>,
    pub is_active: Option<bool>,
}

impl FilterSet for FaqFilter {
    fn from_map(filters: &FilterMap) -> Self {
        Self {
            question: filter::needle(filters, "question"),
            is_active: filter::flag(filters, "isActive"),
        }
    }
}

impl Predicate<Faq> for FaqFilter {
    fn matches(&self, f: &Faq) -> bool {
        filter::check(self.question.as_deref(), |n| filter::starts_with(&f.question, n))
            && filter::check(self.is_active.as_ref(), |a| f.is_active == *a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqSort {
    Question,
    IsActive,
    CreatedAt,
}

impl SortKey for FaqSort {
    const COLUMNS: &'static [(&'static str, Self)] = &[
        ("question", FaqSort::Question),
        ("isActive", FaqSort::IsActive),
        ("createdAt", FaqSort::CreatedAt),
    ];
    const CREATED_AT: Self = FaqSort::CreatedAt;
}

impl SortBy<FaqSort> for Faq {
    fn compare_by(&self, other: &Self, key: FaqSort) -> Ordering {
        match key {
            FaqSort::Question => cmp_text(&self.question, &other.question),
            FaqSort::IsActive => self.is_active.cmp(&other.is_active),
            FaqSort::CreatedAt => self.created_at.cmp(&other.created_at),
        }
    }
}

pub type FaqQuery = ListQuery<FaqFilter, FaqSort>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FaqInput {
    #[validate(custom(function = "crate::required"))]
    pub question: String,
    #[validate(custom(function = "crate::required"))]
    pub answer: String,
    #[serde(default = "crate::active_by_default")]
    pub is_active: bool,
}

impl FaqInput {
    pub fn check(&self) -> DomainResult<()> {
        self.validate().map_err(crate::into_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_core::ListRequest;
    use chrono::Duration;

    fn faq(question: &str, created: DateTime<Utc>) -> Faq {
        Faq::create(
            &FaqInput {
                question: question.into(),
                answer: "Yes.".into(),
                is_active: true,
            },
            created,
        )
    }

    #[test]
    fn default_order_is_newest_first() {
        let t0 = Utc::now();
        let faqs = vec![
            faq("How do I reset?", t0),
            faq("Where is billing?", t0 + Duration::seconds(1)),
            faq("Can I export?", t0 + Duration::seconds(2)),
        ];
        let page = FaqQuery::from_request(&ListRequest::default()).run(&faqs);
        let questions: Vec<&str> = page.data.iter().map(|f| f.question.as_str()).collect();
        assert_eq!(questions, vec!["Can I export?", "Where is billing?", "How do I reset?"]);
    }

    #[test]
    fn question_prefix_ignores_case() {
        let faqs = vec![faq("How do I reset?", Utc::now()), faq("Where?", Utc::now())];
        let req = ListRequest::default().filter("question", "HOW do ");
        assert_eq!(FaqQuery::from_request(&req).count(&faqs), 1);
    }

    #[test]
    fn blank_answer_is_rejected() {
        let input = FaqInput {
            question: "Q?".into(),
            answer: "\n".into(),
            is_active: true,
        };
        assert!(input.check().is_err());
    }
}
