//! Editorial content managed from the back office: CMS pages and FAQs.

pub mod cms;
pub mod faq;

pub use cms::{CmsFilter, CmsInput, CmsPage, CmsQuery, CmsSort};
pub use faq::{Faq, FaqFilter, FaqInput, FaqQuery, FaqSort};

use std::borrow::Cow;

use validator::{ValidationError, ValidationErrors};

use backoffice_core::DomainError;

pub(crate) fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required").with_message(Cow::Borrowed("This field is required")))
    } else {
        Ok(())
    }
}

pub(crate) fn into_domain(errors: ValidationErrors) -> DomainError {
    DomainError::validation(errors.to_string())
}

pub(crate) fn active_by_default() -> bool {
    true
}
