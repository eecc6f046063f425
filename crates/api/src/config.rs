//! Process configuration.

use chrono::Duration;

/// Authentication configuration, immutable after startup.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Ordered path prefixes that bypass authentication entirely.
    pub public_paths: Vec<String>,
}

impl AuthConfig {
    /// Read configuration from the environment, with development defaults.
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret-not-for-production-0123456789".to_string()
        });

        let token_ttl = env_seconds("JWT_EXPIRATION_SECS", 3600);
        let refresh_ttl = env_seconds("JWT_REFRESH_EXPIRATION_SECS", 7 * 24 * 3600);

        Self {
            jwt_secret,
            token_ttl,
            refresh_ttl,
            public_paths: default_public_paths(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-not-for-production-0123456789".to_string(),
            token_ttl: Duration::hours(1),
            refresh_ttl: Duration::days(7),
            public_paths: default_public_paths(),
        }
    }
}

/// Paths that never require a token.
pub fn default_public_paths() -> Vec<String> {
    [
        "/health",
        "/auth/login",
        "/auth/register",
        "/auth/forgot-password",
        "/auth/reset-password",
        "/auth/social-login",
        "/auth/oauth2/callback",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn env_seconds(key: &str, default_secs: i64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default_secs);
    Duration::seconds(secs)
}
