//! Field checks shared by the request handlers. Each returns a 400 naming the field.

use validator::ValidateEmail;

use crate::errors::AppError;

/// Trims and requires a non-empty value no longer than `max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Normalizes an optional text field: blank strings become `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates and lowercases an email address.
pub fn email(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.len() > 254 || !trimmed.validate_email() {
        return Err(AppError::Validation(format!("{field} must be a valid email")));
    }
    Ok(trimmed.to_lowercase())
}

pub fn optional_email(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    optional_text(value).map(|v| email(field, &v)).transpose()
}

/// Usernames: 3 to 50 characters of ASCII letters, digits, `.`, `_` or `-`.
pub fn username(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AppError::Validation(
            "username must be between 3 and 50 characters".to_string(),
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(AppError::Validation(
            "username may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn non_negative(field: &str, value: Option<f64>) -> Result<Option<f64>, AppError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AppError::Validation(format!(
            "{field} must be a non-negative number"
        ))),
        other => Ok(other),
    }
}

/// Escapes `%`, `_` and `\` so user input is matched literally inside ILIKE.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
