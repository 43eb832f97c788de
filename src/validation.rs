use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ClientError, ClientResult};

pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Per-field validation messages. An empty set means the form may be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, &'static str>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.0.get(field).copied()
    }

    pub fn insert(&mut self, field: &'static str, message: &'static str) {
        self.0.insert(field, message);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn into_result(self) -> ClientResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .iter()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
    pub terms_accepted: bool,
}

pub fn validate_registration(form: &Registration<'_>) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if form.name.trim().is_empty() {
        errors.insert("name", "Name is required");
    }
    if !is_valid_email(form.email) {
        errors.insert("email", "Invalid email address");
    }
    if form.password.chars().count() < MIN_PASSWORD_CHARS {
        errors.insert("password", "Password must be at least 6 characters");
    }
    if form.password != form.confirm_password {
        errors.insert("confirmPassword", "Passwords do not match");
    }
    if !form.terms_accepted {
        errors.insert("termsAccepted", "You must accept the terms");
    }
    errors
}

/// Same acceptance as `^[^\s@]+@[^\s@]+\.[^\s@]+$`: one `@`, no whitespace, and a
/// dot inside the domain with something on both sides.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let chars: Vec<char> = domain.chars().collect();
    chars
        .iter()
        .enumerate()
        .any(|(i, c)| *c == '.' && i > 0 && i + 1 < chars.len())
}

pub fn validate_comment(text: &str, rating: u8) -> FieldErrors {
    let mut errors = FieldErrors::default();
    if text.trim().is_empty() {
        errors.insert("comment", "Comment cannot be empty");
    }
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        errors.insert("rating", "Rating must be between 1 and 5");
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form<'a>(name: &'a str, email: &'a str, pw: &'a str, confirm: &'a str) -> Registration<'a> {
        Registration {
            name,
            email,
            password: pw,
            confirm_password: confirm,
            terms_accepted: true,
        }
    }

    #[test]
    fn accepts_a_complete_registration() {
        let errors = validate_registration(&form("Jane", "jane@x.com", "secret1", "secret1"));
        assert!(errors.is_empty(), "{errors}");
    }

    #[test]
    fn reports_every_offending_field() {
        let mut f = form("  ", "jane@x", "abc", "abd");
        f.terms_accepted = false;
        let errors = validate_registration(&f);
        assert_eq!(errors.len(), 5);
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.get("email"), Some("Invalid email address"));
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters")
        );
        assert_eq!(errors.get("confirmPassword"), Some("Passwords do not match"));
        assert!(errors.get("termsAccepted").is_some());
        assert!(matches!(
            errors.into_result(),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn email_shape_matches_the_signup_rule() {
        assert!(is_valid_email("jane@x.com"));
        assert!(is_valid_email("a.b@mail.co.uk"));
        assert!(!is_valid_email("jane@.com"));
        assert!(!is_valid_email("jane@com."));
        assert!(!is_valid_email("jane@@x.com"));
        assert!(!is_valid_email("ja ne@x.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("jane.x.com"));
    }

    #[test]
    fn comment_rules() {
        assert!(validate_comment("Loved it", 5).is_empty());
        let errors = validate_comment("   ", 0);
        assert_eq!(errors.len(), 2);
        assert!(validate_comment("ok", 6).get("rating").is_some());
    }
}
