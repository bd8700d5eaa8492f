use std::env;

/// Runtime configuration, read once at startup from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
    /// MongoDB connection string; `None` runs on the in-memory store
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expires_in_secs: i64,
    pub jwt_issuer: String,
    pub bcrypt_cost: u32,
    pub frontend_url: String,
    pub seed_data: bool,
    pub admin_email: String,
    pub admin_password: String,
    pub allow_admin_registration: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set".to_string())?;
        if jwt_secret.trim().is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }

        let port = var_or("PORT", "3000");
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT '{}': {}", port, e))?;

        let expires_in = var_or("JWT_EXPIRES_IN", "3600s");
        let jwt_expires_in_secs = parse_duration_secs(&expires_in)
            .ok_or_else(|| format!("Invalid JWT_EXPIRES_IN '{}'", expires_in))?;

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or_else(|| format!("Invalid BCRYPT_COST '{}'", raw))?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port,
            api_prefix: normalize_prefix(&var_or("API_PREFIX", "/api")),
            database_url,
            jwt_secret,
            jwt_expires_in_secs,
            jwt_issuer: var_or("JWT_ISSUER", "article-platform"),
            bcrypt_cost,
            frontend_url: var_or("FRONTEND_URL", "http://localhost:5173"),
            seed_data: parse_flag("SEED_DATA")?,
            admin_email: var_or("ADMIN_EMAIL", "admin@example.com"),
            admin_password: var_or("ADMIN_PASSWORD", "Password123!"),
            allow_admin_registration: parse_flag("ALLOW_ADMIN_REGISTRATION")?,
        })
    }

    /// Configuration used by the test suite: memory store, cheap hashing
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            api_prefix: "/api".into(),
            database_url: None,
            jwt_secret: "test-secret".into(),
            jwt_expires_in_secs: 3600,
            jwt_issuer: "article-platform-test".into(),
            bcrypt_cost: 4,
            frontend_url: "http://localhost:5173".into(),
            seed_data: false,
            admin_email: "admin@example.com".into(),
            admin_password: "Password123!".into(),
            allow_admin_registration: false,
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        log::debug!("{} not set, using default: {}", key, default);
        default.to_string()
    })
}

fn parse_flag(key: &str) -> Result<bool, String> {
    match env::var(key) {
        Err(_) => Ok(false),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(format!("Invalid {} '{}': expected true/false", key, raw)),
        },
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Upper bound for token lifetimes (one year)
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 86_400;

/// Parses `3600`, `3600s`, `15m`, `1h`, `7d` into seconds, up to one year
pub fn parse_duration_secs(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => raw.split_at(idx),
        None => (raw, ""),
    };
    let value: i64 = digits.parse().ok()?;
    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => return None,
    };
    let secs = value.checked_mul(multiplier)?;
    if secs > 0 && secs <= MAX_TOKEN_LIFETIME_SECS {
        Some(secs)
    } else {
        None
    }
}
