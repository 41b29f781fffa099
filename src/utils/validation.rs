//! Local form validation
//!
//! Every writable entity implements [`Validate`]. Stores run it before any
//! network call, so a rejected form never reaches the server.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static UPPER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]").expect("valid regex"));
static LOWER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]").expect("valid regex"));
static DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").expect("valid regex"));
static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]").expect("valid regex"));

pub const MIN_PASSWORD_LEN: usize = 8;

/// Field name -> list of messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "This field is required.");
        }
    }

    pub fn require_email(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "This field is required.");
        } else if !is_valid_email(value) {
            self.add(field, "Enter a valid email address.");
        }
    }

    pub fn optional_email(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value
            && !value.trim().is_empty()
            && !is_valid_email(value)
        {
            self.add(field, "Enter a valid email address.");
        }
    }

    pub fn non_negative(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value < 0.0 {
            self.add(field, "Must be zero or greater.");
        }
    }

    pub fn positive(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            self.add(field, "Must be greater than zero.");
        }
    }

    /// `end` must not come before `start`
    pub fn date_order(&mut self, field: &str, start: NaiveDate, end: NaiveDate) {
        if end < start {
            self.add(field, format!("Must be on or after {}.", start));
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Form input that can be checked locally
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

/// ISBN-10 or ISBN-13, hyphens and spaces ignored. ISBN-10 may end in X.
pub fn is_valid_isbn(value: &str) -> bool {
    let cleaned = normalize_isbn(value);
    match cleaned.len() {
        13 => cleaned.chars().all(|c| c.is_ascii_digit()),
        10 => {
            let (body, check) = cleaned.split_at(9);
            body.chars().all(|c| c.is_ascii_digit())
                && check.chars().all(|c| c.is_ascii_digit() || c == 'X')
        }
        _ => false,
    }
}

/// Strip separators and upper-case the ISBN-10 check character
pub fn normalize_isbn(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Password policy used by the profile and reset-password forms
pub fn check_password(errors: &mut ValidationErrors, field: &str, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            field,
            format!("Must be at least {} characters.", MIN_PASSWORD_LEN),
        );
    }
    if !UPPER_RE.is_match(password) {
        errors.add(field, "Must contain an uppercase letter.");
    }
    if !LOWER_RE.is_match(password) {
        errors.add(field, "Must contain a lowercase letter.");
    }
    if !DIGIT_RE.is_match(password) {
        errors.add(field, "Must contain a digit.");
    }
    if !SYMBOL_RE.is_match(password) {
        errors.add(field, "Must contain a symbol.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_policy() {
        let mut errors = ValidationErrors::new();
        check_password(&mut errors, "password", "Str0ng!pass");
        assert!(errors.is_empty());

        let mut errors = ValidationErrors::new();
        check_password(&mut errors, "password", "weak");
        let messages = errors.get("password").unwrap();
        assert_eq!(messages.len(), 4); // too short, no upper, no digit, no symbol
    }

    #[test]
    fn test_isbn_shapes() {
        assert!(is_valid_isbn("978-2-264-02484-8"));
        assert!(is_valid_isbn("0-306-40615-2"));
        assert!(is_valid_isbn("080442957x"));
        assert!(!is_valid_isbn("12345"));
        assert!(!is_valid_isbn("97822640248AB"));
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("ada@school.org"));
        assert!(!is_valid_email("ada@school"));
        assert!(!is_valid_email("ada school@x.org"));
    }

    #[test]
    fn test_display_joins_fields() {
        let mut errors = ValidationErrors::new();
        errors.require("title", "");
        errors.non_negative("price", -1.0);
        assert_eq!(
            errors.to_string(),
            "price: Must be zero or greater.; title: This field is required."
        );
    }
}
