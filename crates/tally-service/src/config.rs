//! Service configuration.

use std::str::FromStr;

use tally_core::DEFAULT_INITIAL_BALANCE;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/tally").
    pub data_dir: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Balance granted before a user's first settled operation.
    pub initial_balance: i64,

    /// Seed the operation catalog at start-up when it is empty.
    pub seed_operations: bool,

    /// random.org strings endpoint. `None` generates all strings locally.
    pub random_org_url: Option<String>,

    /// Strings fetched per refill; also the cache capacity.
    pub random_string_batch: usize,

    /// Length of each random string.
    pub random_string_length: usize,

    /// Retries after the first random.org attempt.
    pub random_org_max_retries: u32,

    /// Initial random.org retry backoff in milliseconds.
    pub random_org_backoff_ms: u64,

    /// Per-request random.org timeout in seconds.
    pub random_org_timeout_seconds: u64,

    /// Reject a settlement write when another record landed since the balance
    /// was resolved.
    pub settlement_guard: bool,

    /// How often settlement re-resolves after losing the guard.
    pub settlement_conflict_retries: u32,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            initial_balance: env_or("INITIAL_BALANCE", defaults.initial_balance),
            seed_operations: env_or("SEED_OPERATIONS", defaults.seed_operations),
            random_org_url: match std::env::var("RANDOM_ORG_URL") {
                Ok(url) if url.trim().is_empty() => None,
                Ok(url) => Some(url),
                Err(_) => defaults.random_org_url,
            },
            random_string_batch: env_or("RANDOM_STRING_BATCH", defaults.random_string_batch)
                .max(1),
            random_string_length: env_or("RANDOM_STRING_LENGTH", defaults.random_string_length)
                .max(1),
            random_org_max_retries: env_or(
                "RANDOM_ORG_MAX_RETRIES",
                defaults.random_org_max_retries,
            ),
            random_org_backoff_ms: env_or("RANDOM_ORG_BACKOFF_MS", defaults.random_org_backoff_ms),
            random_org_timeout_seconds: env_or(
                "RANDOM_ORG_TIMEOUT_SECONDS",
                defaults.random_org_timeout_seconds,
            ),
            settlement_guard: env_or("SETTLEMENT_GUARD", defaults.settlement_guard),
            settlement_conflict_retries: env_or(
                "SETTLEMENT_CONFLICT_RETRIES",
                defaults.settlement_conflict_retries,
            ),
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is unset
/// or unparsable.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/tally".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            initial_balance: DEFAULT_INITIAL_BALANCE,
            seed_operations: true,
            random_org_url: Some("https://www.random.org/strings/".into()),
            random_string_batch: 10,
            random_string_length: 8,
            random_org_max_retries: 3,
            random_org_backoff_ms: 200,
            random_org_timeout_seconds: 10,
            settlement_guard: true,
            settlement_conflict_retries: 3,
        }
    }
}
