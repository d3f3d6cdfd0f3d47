//! Input validation for form and JSON requests.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Loose email shape check: something@something.tld, no whitespace
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Column widths the account form enforces
pub const MAX_USERNAME_LEN: usize = 80;
pub const MAX_EMAIL_LEN: usize = 120;

/// Trimmed text to classify, or `None` when nothing is left.
pub fn prediction_text(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Validate already-trimmed signup fields.
pub fn validate_signup(username: &str, email: &str, password: &str) -> Result<(), String> {
    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err("All fields are required.".to_string());
    }

    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username must be at most {} characters.",
            MAX_USERNAME_LEN
        ));
    }

    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(format!("Email must be at most {} characters.", MAX_EMAIL_LEN));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Please enter a valid email address.".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_text() {
        assert_eq!(prediction_text("  hello world \n"), Some("hello world"));
        assert_eq!(prediction_text(""), None);
        assert_eq!(prediction_text(" \t\n "), None);
    }

    #[test]
    fn test_signup_requires_all_fields() {
        assert!(validate_signup("", "a@b.co", "pw").is_err());
        assert!(validate_signup("ada", "", "pw").is_err());
        assert!(validate_signup("ada", "a@b.co", "").is_err());
        assert!(validate_signup("ada", "ada@example.com", "pw").is_ok());
    }

    #[test]
    fn test_signup_email_shape() {
        assert!(validate_signup("ada", "not-an-email", "pw").is_err());
        assert!(validate_signup("ada", "ada@localhost", "pw").is_err());
        assert!(validate_signup("ada", "ada lovelace@example.com", "pw").is_err());
    }

    #[test]
    fn test_signup_lengths() {
        let long_name = "x".repeat(MAX_USERNAME_LEN + 1);
        assert!(validate_signup(&long_name, "ada@example.com", "pw").is_err());

        let long_email = format!("{}@example.com", "x".repeat(MAX_EMAIL_LEN));
        assert!(validate_signup("ada", &long_email, "pw").is_err());
    }
}
