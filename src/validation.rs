//! Request field validation shared by the auth and users DTOs.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MAX_FULL_NAME_LEN: usize = 100;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trim, lowercase and check an email address.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if email.len() > MAX_EMAIL_LEN || !is_valid_email(&email) {
        return Err(AppError::bad_request("Invalid email"));
    }
    Ok(email)
}

pub fn check_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request("Password too short"));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("Password too long"));
    }
    Ok(())
}

/// Trim a display name and enforce `min..=MAX_FULL_NAME_LEN` characters.
pub fn normalize_full_name(raw: &str, min: usize) -> Result<String, AppError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < min.max(1) || len > MAX_FULL_NAME_LEN {
        return Err(AppError::bad_request(format!(
            "fullName must be between {} and {} characters",
            min.max(1),
            MAX_FULL_NAME_LEN
        )));
    }
    Ok(name.to_string())
}
