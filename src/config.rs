use anyhow::Context;
use axum::http::HeaderValue;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Cost knobs for Argon2id plus the cap on concurrent hashing jobs.
#[derive(Debug, Clone, Deserialize)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Empty means "reflect whatever Origin the browser sends".
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub hashing: HashingConfig,
    pub cors: CorsConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Comma-separated list of exact origins. `*` is refused: credentials are
/// always allowed, and an empty list already reflects any origin.
fn parse_allowed_origins(raw: &str) -> anyhow::Result<Vec<String>> {
    let origins = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    for origin in &origins {
        anyhow::ensure!(
            origin != "*",
            "CORS_ALLOWED_ORIGINS cannot contain \"*\"; leave it unset to reflect any origin"
        );
        HeaderValue::from_str(origin)
            .with_context(|| format!("invalid origin in CORS_ALLOWED_ORIGINS: {origin}"))?;
    }
    Ok(origins)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "quizora".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "quizora-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60 * 24),
        };

        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let hashing = HashingConfig {
            memory_kib: env_or("ARGON2_MEMORY_KIB", argon2::Params::DEFAULT_M_COST),
            iterations: env_or("ARGON2_ITERATIONS", argon2::Params::DEFAULT_T_COST),
            parallelism: env_or("ARGON2_PARALLELISM", argon2::Params::DEFAULT_P_COST),
            max_concurrency: env_or("HASH_MAX_CONCURRENCY", cpus).max(1),
        };

        let allowed_origins =
            parse_allowed_origins(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default())?;

        Ok(Self {
            database_url,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            jwt,
            hashing,
            cors: CorsConfig { allowed_origins },
        })
    }

    /// Settings for tests and local experiments: in-memory store, cheap hashing.
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            database_max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            hashing: HashingConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
                max_concurrency: 4,
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
            },
        }
    }
}
