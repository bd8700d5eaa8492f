use url::Url;
use validator::ValidateEmail;

use super::error::AppError;

pub const EMAIL_MAX: usize = 255;
pub const NAME_MAX: usize = 100;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 50;
pub const TITLE_MAX: usize = 255;
pub const IMAGE_URL_MAX: usize = 512;

/// RFC-style address check; the domain must also carry a top-level part
pub fn is_valid_email(email: &str) -> bool {
    if !email.validate_email() {
        return false;
    }
    match email.rsplit_once('@') {
        Some((_, domain)) => domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() {
        return Err(AppError::Validation("Email should not be empty.".into()));
    }
    if email.chars().count() > EMAIL_MAX {
        return Err(AppError::Validation(format!("Email cannot be longer than {} characters.", EMAIL_MAX)));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation("Please provide a valid email address.".into()));
    }
    Ok(())
}

/// Non-blank and at most `max` characters
pub fn validate_text(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} should not be empty.", field)));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} cannot be longer than {} characters.",
            field, max
        )));
    }
    Ok(())
}

pub fn validate_password(field: &str, password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN {
        return Err(AppError::Validation(format!(
            "{} must be at least {} characters long.",
            field, PASSWORD_MIN
        )));
    }
    if len > PASSWORD_MAX {
        return Err(AppError::Validation(format!(
            "{} cannot be longer than {} characters.",
            field, PASSWORD_MAX
        )));
    }
    Ok(())
}

/// Absolute http(s) URL with a host
pub fn validate_image_url(raw: &str) -> Result<(), AppError> {
    if raw.chars().count() > IMAGE_URL_MAX {
        return Err(AppError::Validation(format!(
            "Image URL cannot be longer than {} characters.",
            IMAGE_URL_MAX
        )));
    }

    let invalid = || AppError::Validation("Image URL must be a valid URL.".into());
    // The parser would silently strip or encode these
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid());
    }
    let url = Url::parse(raw).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}

/// At least one tag, none blank; surrounding whitespace is trimmed
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, AppError> {
    if tags.is_empty() {
        return Err(AppError::Validation("Tags array should not be empty.".into()));
    }
    tags.iter()
        .map(|tag| {
            let tag = tag.trim();
            if tag.is_empty() {
                Err(AppError::Validation("Each tag must be a non-empty string.".into()))
            } else {
                Ok(tag.to_string())
            }
        })
        .collect()
}

/// Path ids are UUIDs; anything else is rejected before touching storage
pub fn validate_id(id: &str) -> Result<(), AppError> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| AppError::Validation("Validation failed (uuid is expected).".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_valid_email("user1@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("user1example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@exa mple.com"));
        assert!(!is_valid_email("user@example..com"));
        assert!(validate_email(&format!("{}@example.com", "a".repeat(250))).is_err());
    }

    #[test]
    fn test_password_bounds() {
        assert!(validate_password("Password", "short").is_err());
        assert!(validate_password("Password", "Password123!").is_ok());
        assert!(validate_password("Password", &"x".repeat(51)).is_err());
    }

    #[test]
    fn test_text() {
        assert!(validate_text("Title", "   ", TITLE_MAX).is_err());
        assert!(validate_text("Title", "Hello", TITLE_MAX).is_ok());
        assert!(validate_text("First name", &"x".repeat(101), NAME_MAX).is_err());
    }

    #[test]
    fn test_image_url() {
        assert!(validate_image_url("https://picsum.photos/800/400").is_ok());
        assert!(validate_image_url("ftp://example.com/a.png").is_err());
        assert!(validate_image_url("https://").is_err());
        assert!(validate_image_url("http://cdn.example.com:8080/img/a.png?w=800").is_ok());
    }

    #[test]
    fn test_image_url_rejects_malformed() {
        for bad in [
            "https://[not-a-host",
            "http://:::::",
            "https://%%%/x",
            "https://exa<mple>.com",
            "https://example.com/a b.png",
            "picsum.photos/800/400",
            "mailto:someone@example.com",
        ] {
            assert!(validate_image_url(bad).is_err(), "accepted {}", bad);
        }
        let long = format!("https://example.com/{}", "a".repeat(IMAGE_URL_MAX));
        assert!(validate_image_url(&long).is_err());
    }

    #[test]
    fn test_tags() {
        assert_eq!(normalize_tags(&[" rust ".into(), "web".into()]).unwrap(), vec!["rust", "web"]);
        assert!(normalize_tags(&[]).is_err());
        assert!(normalize_tags(&["ok".into(), " ".into()]).is_err());
    }

    #[test]
    fn test_id() {
        assert!(validate_id("0b9f5a3e-2c1d-4f6e-9a8b-7c6d5e4f3a2b").is_ok());
        assert!(validate_id("42").is_err());
    }
}
