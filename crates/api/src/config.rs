//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CRM_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `CRM_TOKEN_SECRET` - HMAC key for access token hashes (min 32 chars, high entropy)
//!
//! ## Optional
//! - `CRM_HOST` - Bind address (default: 127.0.0.1)
//! - `CRM_PORT` - Listen port (default: 8000)
//! - `CRM_BASE_URL` - Public URL used to build upload links (default: `http://<host>:<port>`)
//! - `CRM_UPLOAD_DIR` - Directory served at `/storage` (default: storage/public)
//! - `CRM_TOKEN_TTL_HOURS` - Access token lifetime (default: tokens never expire)
//! - `CRM_STRICT_OWNERSHIP` - Owner-filter get/update/delete by id (default: false)
//! - `CRM_DEFAULT_PER_PAGE` - Page size when `per_page` is absent (default: 20)
//! - `CRM_MAX_PER_PAGE` - Upper bound for `per_page` (default: 100)
//! - `CRM_CORS_ORIGINS` - Comma-separated allowed origins (default: any origin)
//! - `CRM_LOG_FORMAT` - `json` for structured logs (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `CRM_TLS_CERT` - PEM-encoded certificate chain
//! - `CRM_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_UPLOAD_DIR: &str = "storage/public";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: Url,
    /// Key for hashing access tokens
    pub token_secret: SecretString,
    /// Access token lifetime; `None` means tokens live until logout
    pub token_ttl: Option<Duration>,
    /// Root directory for uploaded files
    pub upload_dir: PathBuf,
    /// Apply the owner filter to single-record reads and writes
    pub strict_ownership: bool,
    /// Pagination limits
    pub pagination: PaginationConfig,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Page size bounds for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_per_page: i64,
    pub max_per_page: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            max_per_page: 100,
        }
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = optional_env("CRM_TLS_CERT");
        let key_pem = optional_env("CRM_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "CRM_TLS_*".to_string(),
                "Both CRM_TLS_CERT and CRM_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl PaginationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let default_per_page = parse_env("CRM_DEFAULT_PER_PAGE", defaults.default_per_page)?;
        let max_per_page = parse_env("CRM_MAX_PER_PAGE", defaults.max_per_page)?;

        if default_per_page < 1 || max_per_page < default_per_page {
            return Err(ConfigError::InvalidEnvVar(
                "CRM_DEFAULT_PER_PAGE".to_string(),
                format!("must be between 1 and CRM_MAX_PER_PAGE ({max_per_page})"),
            ));
        }

        Ok(Self {
            default_per_page,
            max_per_page,
        })
    }

    /// Clamp a requested page size into `1..=max_per_page`.
    #[must_use]
    pub fn per_page(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_per_page)
            .clamp(1, self.max_per_page)
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the token secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = database_url()?;
        let host = env_or("CRM_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CRM_HOST".to_string(), e.to_string()))?;
        let port = parse_env("CRM_PORT", 8000_u16)?;
        let base_url = optional_env("CRM_BASE_URL")
            .unwrap_or_else(|| format!("http://{host}:{port}"));
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ConfigError::InvalidEnvVar("CRM_BASE_URL".to_string(), e.to_string()))?;

        let token_secret = secret_env("CRM_TOKEN_SECRET")?;

        let token_ttl = optional_env("CRM_TOKEN_TTL_HOURS")
            .map(|hours| {
                hours
                    .parse::<i64>()
                    .ok()
                    .filter(|h| *h > 0)
                    .map(Duration::hours)
                    .ok_or_else(|| {
                        ConfigError::InvalidEnvVar(
                            "CRM_TOKEN_TTL_HOURS".to_string(),
                            "must be a positive number of hours".to_string(),
                        )
                    })
            })
            .transpose()?;

        let upload_dir = PathBuf::from(env_or("CRM_UPLOAD_DIR", DEFAULT_UPLOAD_DIR));
        let strict_ownership = parse_env("CRM_STRICT_OWNERSHIP", false)?;
        let pagination = PaginationConfig::from_env()?;
        let cors_origins = optional_env("CRM_CORS_ORIGINS")
            .map(|origins| split_list(&origins))
            .unwrap_or_default();
        let json_logs = optional_env("CRM_LOG_FORMAT").is_some_and(|f| f == "json");

        let sentry_dsn = optional_env("SENTRY_DSN");
        let sentry_environment = optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_env("SENTRY_SAMPLE_RATE", 1.0_f32)?;
        let sentry_traces_sample_rate = parse_env("SENTRY_TRACES_SAMPLE_RATE", 0.1_f32)?;
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            token_secret,
            token_ttl,
            upload_dir,
            strict_ownership,
            pagination,
            cors_origins,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Public URL of a file stored under the upload root.
    #[must_use]
    pub fn storage_url(&self, relative_path: &str) -> String {
        format!(
            "{}/storage/{}",
            self.base_url.as_str().trim_end_matches('/'),
            relative_path.trim_start_matches('/')
        )
    }
}

/// Read a variable, treating blank values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    optional_env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

/// `CRM_DATABASE_URL`, or the conventional `DATABASE_URL` used by sqlx tooling.
fn database_url() -> Result<SecretString, ConfigError> {
    optional_env("CRM_DATABASE_URL")
        .or_else(|| optional_env("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar("CRM_DATABASE_URL".to_string()))
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Split a comma-separated list, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject short, placeholder-looking or low-entropy secrets.
fn check_secret(key: &str, value: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| ConfigError::InsecureSecret(key.to_string(), reason);

    let length = value.chars().count();
    if length < MIN_TOKEN_SECRET_LENGTH {
        return Err(insecure(format!(
            "must be at least {MIN_TOKEN_SECRET_LENGTH} characters (got {length})"
        )));
    }

    let lower = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return Err(insecure(format!(
            "appears to be a placeholder (contains '{pattern}')"
        )));
    }

    let entropy = shannon_entropy(value);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(insecure(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        )));
    }

    Ok(())
}

fn secret_env(key: &str) -> Result<SecretString, ConfigError> {
    let value = required_env(key)?;
    check_secret(key, &value)?;
    Ok(SecretString::from(value))
}
