//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    let username = username.trim();
    if username.is_empty() {
        return Err("Username is required.".to_string());
    }

    if username.chars().count() > 32 {
        return Err("Username must be at most 32 characters long.".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[\p{L}\p{N}_ .'-]+$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers, spaces, dots, dashes and underscores."
                .to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required.".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long.".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format.".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required.".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long.".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long.".to_string());
    }

    if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one letter and one digit.".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("Ana María").is_ok());
        assert!(validate_username("  ").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_username("<script>").is_err());
        assert!(validate_username("ana\nmaría").is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("").is_err());
        assert!(validate_email("ana example.com").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("pantry123").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("no-digits-here").is_err());
        assert!(validate_password("12345678").is_err());
    }
}
