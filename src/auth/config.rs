use crate::auth::{AuthError, AuthResult};

/// Authentication configuration loaded from environment variables.
///
/// Built once at ignition and carried inside [`crate::auth::AuthState`];
/// nothing in the auth stack reads the environment after startup.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_mins: i64,
    pub session_cookie_name: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub hashing: HashingConfig,
}

/// Argon2id cost parameters. Tunable per deployment; stored hashes carry
/// their own costs, so changing these only affects newly hashed passwords.
#[derive(Debug, Clone)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024, // 19 MiB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let jwt_secret = std::env::var("CARQR_JWT_SECRET")
            .map_err(|_| AuthError::Config("CARQR_JWT_SECRET is required".into()))?;
        let access_token_ttl_mins = std::env::var("CARQR_ACCESS_TOKEN_TTL_MINS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(30);
        let session_cookie_name = std::env::var("CARQR_SESSION_COOKIE_NAME")
            .unwrap_or_else(|_| "carqr_session".into());
        let cookie_domain = std::env::var("CARQR_COOKIE_DOMAIN").ok();
        let cookie_secure = std::env::var("CARQR_COOKIE_SECURE")
            .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "on"))
            .unwrap_or(true);

        Ok(Self {
            jwt_secret,
            access_token_ttl_mins,
            session_cookie_name,
            cookie_domain,
            cookie_secure,
            hashing: HashingConfig::from_env(),
        })
    }
}

impl HashingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_kib: env_u32("CARQR_ARGON2_MEMORY_KIB", defaults.memory_kib),
            iterations: env_u32("CARQR_ARGON2_ITERATIONS", defaults.iterations),
            parallelism: env_u32("CARQR_ARGON2_PARALLELISM", defaults.parallelism),
        }
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}
