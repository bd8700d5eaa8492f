use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::{Role, User};
use crate::utils::AppError;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,           // user id
    pub username: String,      // email at issue time
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

/// Issues a signed session token for the user
pub fn issue_token(config: &AppConfig, user: &User) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = Duration::try_seconds(config.jwt_expires_in_secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| AppError::Internal(format!("Invalid token lifetime: {}s", config.jwt_expires_in_secs)))?;
    let claims = Claims {
        sub: user.id.clone(),
        username: user.email.clone(),
        role: user.role,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        iss: config.jwt_issuer.clone(),
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::internal("Failed to generate token", e))
}

/// Checks signature, issuer and expiry; the user itself is re-fetched by the caller
pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[config.jwt_issuer.as_str()]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::debug!("Token rejected: {}", e);
        AppError::Unauthorized("Invalid or expired token.".into())
    })
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4().to_string(),
            email: "alice@example.com".into(),
            password_hash: "x".into(),
            role: Role::Admin,
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let config = AppConfig::for_tests();
        let user = user();
        let token = issue_token(&config, &user).unwrap();
        let claims = verify_token(&config, &token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "alice@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let config = AppConfig::for_tests();
        let token = issue_token(&config, &user()).unwrap();

        let mut other = AppConfig::for_tests();
        other.jwt_secret = "another-secret".into();
        assert!(matches!(verify_token(&other, &token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_rejects_expired() {
        let mut config = AppConfig::for_tests();
        config.jwt_expires_in_secs = -10;
        let token = issue_token(&config, &user()).unwrap();
        assert!(verify_token(&config, &token).is_err());
    }

    #[test]
    fn test_oversized_lifetime_is_an_error() {
        let mut config = AppConfig::for_tests();
        config.jwt_expires_in_secs = i64::MAX;
        assert!(matches!(issue_token(&config, &user()), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_rejects_garbage() {
        let config = AppConfig::for_tests();
        assert!(verify_token(&config, "not.a.token").is_err());
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
