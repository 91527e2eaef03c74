//! Field rules shared by the user and role forms.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{Months, NaiveDate, Utc};
use regex::Regex;
use validator::{ValidationError, ValidationErrors};

use backoffice_core::DomainError;

pub const MIN_AGE_YEARS: u32 = 18;

static FULL_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z ]+$").expect("valid regex"));

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("valid regex")
});

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10,15}$").expect("valid regex"));

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn full_name(value: &str) -> Result<(), ValidationError> {
    if FULL_NAME_REGEX.is_match(value.trim()) {
        Ok(())
    } else {
        Err(rule("full_name", "Full name may contain only letters and spaces"))
    }
}

/// Email shape check. Callers lowercase before storing.
pub fn email(value: &str) -> Result<(), ValidationError> {
    if EMAIL_REGEX.is_match(&value.trim().to_lowercase()) {
        Ok(())
    } else {
        Err(rule("email", "Enter a valid email address"))
    }
}

pub fn phone_number(value: &str) -> Result<(), ValidationError> {
    if PHONE_REGEX.is_match(value.trim()) {
        Ok(())
    } else {
        Err(rule("phone_number", "Phone number must be 10 to 15 digits"))
    }
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(rule("required", "This field is required"))
    } else {
        Ok(())
    }
}

pub fn adult_on(date_of_birth: NaiveDate, today: NaiveDate) -> bool {
    date_of_birth
        .checked_add_months(Months::new(MIN_AGE_YEARS * 12))
        .is_some_and(|eighteenth| eighteenth <= today)
}

pub fn adult(date_of_birth: &NaiveDate) -> Result<(), ValidationError> {
    if adult_on(*date_of_birth, Utc::now().date_naive()) {
        Ok(())
    } else {
        Err(rule("date_of_birth", "User must be at least 18 years old"))
    }
}

pub fn password(value: &str) -> Result<(), ValidationError> {
    backoffice_auth::check_strength(value).map_err(|e| {
        let mut err = ValidationError::new("password");
        err.message = Some(Cow::Owned(e.to_string()));
        err
    })
}

/// Flatten validator output into the domain error.
pub fn into_domain(errors: ValidationErrors) -> DomainError {
    DomainError::validation(errors.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_letters_and_spaces() {
        assert!(full_name("Ada Lovelace").is_ok());
        assert!(full_name("R2D2").is_err());
        assert!(full_name("   ").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(email("ops@example.com").is_ok());
        assert!(email("Ops.Team+1@Example.io").is_ok());
        assert!(email("no-at-sign.com").is_err());
        assert!(email("a@b.c").is_err());
    }

    #[test]
    fn phone_is_ten_to_fifteen_digits() {
        assert!(phone_number("0123456789").is_ok());
        assert!(phone_number("123456789").is_err());
        assert!(phone_number("+1234567890").is_err());
        assert!(phone_number("1234567890123456").is_err());
    }

    #[test]
    fn adulthood_starts_on_eighteenth_birthday() {
        let dob = NaiveDate::from_ymd_opt(2000, 3, 15).unwrap();
        assert!(adult_on(dob, NaiveDate::from_ymd_opt(2018, 3, 15).unwrap()));
        assert!(!adult_on(dob, NaiveDate::from_ymd_opt(2018, 3, 14).unwrap()));
    }
}
