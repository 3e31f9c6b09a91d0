//! Assistant configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_STOREFRONT_PRIVATE_TOKEN` - Storefront API private access token
//!
//! ## Completion providers (at least one should be set)
//! - `ANTHROPIC_API_KEY` - Provider A (Claude)
//! - `ANTHROPIC_MODEL` - Claude model (default: claude-sonnet-4-20250514)
//! - `OPENAI_API_KEY` - Provider B (`OpenAI`)
//! - `OPENAI_MODEL` - `OpenAI` model (default: gpt-4o-mini)
//!
//! ## Optional
//! - `ASSISTANT_HOST` - Bind address (default: 127.0.0.1)
//! - `ASSISTANT_PORT` - Listen port (default: 3000)
//! - `ASSISTANT_DATABASE_URL` - `PostgreSQL` profile store (falls back to `DATABASE_URL`;
//!   profiles are kept in memory when neither is set)
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `KLAVIYO_PRIVATE_KEY` - Send analytics events to Klaviyo instead of the log
//! - `DEFAULT_LANGUAGE` - Reply language when detection is inconclusive (default: fr)
//! - `RATE_LIMIT_MAX_REQUESTS` - Accepted calls per window (default: 30)
//! - `RATE_LIMIT_WINDOW_SECS` - Window length (default: 60)
//! - `PROVIDER_COOLDOWN_SECS` - Cooldown when a quota error carries no hint (default: 60)
//! - `HEALTH_CHECK_INTERVAL_SECS` - Minimum time between probes of one provider (default: 600)
//! - `SCORING_WEIGHTS_FILE` - YAML file overriding ranking weights
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::TimeDelta;
use secrecy::SecretString;
use thiserror::Error;
use vitaguide_core::Language;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Assistant application configuration.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// `PostgreSQL` profile database URL (contains password)
    pub database_url: Option<SecretString>,
    /// Provider A
    pub claude: Option<ClaudeConfig>,
    /// Provider B
    pub openai: Option<OpenAiConfig>,
    /// Shopify Storefront API configuration
    pub shopify: ShopifyConfig,
    /// Klaviyo analytics configuration
    pub klaviyo: Option<KlaviyoConfig>,
    /// Reply language when detection has nothing to go on
    pub default_language: Language,
    /// Rate limiting and provider circuit settings
    pub limits: LimitsConfig,
    /// Optional YAML override for ranking weights
    pub scoring_weights_file: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Anthropic Messages API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ClaudeConfig {
    pub api_key: SecretString,
    pub model: String,
}

impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// `OpenAI` Chat Completions configuration.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    pub model: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// Shopify Storefront API configuration.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Storefront API private access token (server-side only)
    pub storefront_private_token: SecretString,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_private_token", &"[REDACTED]")
            .finish()
    }
}

/// Klaviyo events API configuration.
#[derive(Clone)]
pub struct KlaviyoConfig {
    pub private_key: SecretString,
}

impl std::fmt::Debug for KlaviyoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlaviyoConfig")
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Rate limiting and provider circuit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitsConfig {
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: TimeDelta,
    pub provider_cooldown: TimeDelta,
    pub health_check_interval: TimeDelta,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit_max_requests: 30,
            rate_limit_window: TimeDelta::seconds(60),
            provider_cooldown: TimeDelta::seconds(60),
            health_check_interval: TimeDelta::minutes(10),
        }
    }
}

impl AssistantConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("ASSISTANT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("ASSISTANT_PORT", "3000")?;
        let database_url = get_database_url("ASSISTANT_DATABASE_URL");

        let claude = get_optional_env("ANTHROPIC_API_KEY")
            .map(|key| -> Result<ClaudeConfig, ConfigError> {
                Ok(ClaudeConfig {
                    api_key: validated_secret(key, "ANTHROPIC_API_KEY")?,
                    model: get_env_or_default("ANTHROPIC_MODEL", "claude-sonnet-4-20250514"),
                })
            })
            .transpose()?;

        let openai = get_optional_env("OPENAI_API_KEY")
            .map(|key| -> Result<OpenAiConfig, ConfigError> {
                Ok(OpenAiConfig {
                    api_key: validated_secret(key, "OPENAI_API_KEY")?,
                    model: get_env_or_default("OPENAI_MODEL", "gpt-4o-mini"),
                })
            })
            .transpose()?;

        let shopify = ShopifyConfig {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2026-01"),
            storefront_private_token: validated_secret(
                get_required_env("SHOPIFY_STOREFRONT_PRIVATE_TOKEN")?,
                "SHOPIFY_STOREFRONT_PRIVATE_TOKEN",
            )?,
        };

        let klaviyo = get_optional_env("KLAVIYO_PRIVATE_KEY")
            .map(|key| -> Result<KlaviyoConfig, ConfigError> {
                Ok(KlaviyoConfig {
                    private_key: validated_secret(key, "KLAVIYO_PRIVATE_KEY")?,
                })
            })
            .transpose()?;

        let default_language = get_env_or_default("DEFAULT_LANGUAGE", "fr")
            .parse::<Language>()
            .map_err(|e| ConfigError::InvalidEnvVar("DEFAULT_LANGUAGE".to_string(), e))?;

        let limits = LimitsConfig {
            rate_limit_max_requests: parse_env_or_default("RATE_LIMIT_MAX_REQUESTS", "30")?,
            rate_limit_window: seconds_env("RATE_LIMIT_WINDOW_SECS", 60)?,
            provider_cooldown: seconds_env("PROVIDER_COOLDOWN_SECS", 60)?,
            health_check_interval: seconds_env("HEALTH_CHECK_INTERVAL_SECS", 600)?,
        };

        Ok(Self {
            host,
            port,
            database_url,
            claude,
            openai,
            shopify,
            klaviyo,
            default_language,
            limits,
            scoring_weights_file: get_optional_env("SCORING_WEIGHTS_FILE").map(PathBuf::from),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a positive number of seconds.
fn seconds_env(key: &str, default: i64) -> Result<TimeDelta, ConfigError> {
    let secs: i64 = parse_env_or_default(key, &default.to_string())?;
    if secs <= 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be a positive number of seconds".to_string(),
        ));
    }
    TimeDelta::try_seconds(secs)
        .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), "out of range".to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real API keys are long random strings
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Validate a secret value and wrap it.
fn validated_secret(value: String, key: &str) -> Result<SecretString, ConfigError> {
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-anthropic-key", "ANTHROPIC_API_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "OPENAI_API_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_realistic_key() {
        let result = validate_secret_strength(
            "sk-ant-REDACTED",
            "ANTHROPIC_API_KEY",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_limits() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.rate_limit_max_requests, 30);
        assert_eq!(limits.rate_limit_window, TimeDelta::seconds(60));
        assert_eq!(limits.health_check_interval, TimeDelta::seconds(600));
    }

    #[test]
    fn test_provider_configs_debug_redacts_keys() {
        let claude = ClaudeConfig {
            api_key: SecretString::from("sk-ant-super-private"),
            model: "claude-sonnet-4-20250514".to_string(),
        };
        let shopify = ShopifyConfig {
            store: "vita.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            storefront_private_token: SecretString::from("shpat_private_value"),
        };

        let claude_debug = format!("{claude:?}");
        assert!(claude_debug.contains("claude-sonnet-4-20250514"));
        assert!(!claude_debug.contains("super-private"));

        let shopify_debug = format!("{shopify:?}");
        assert!(shopify_debug.contains("vita.myshopify.com"));
        assert!(shopify_debug.contains("[REDACTED]"));
        assert!(!shopify_debug.contains("shpat_private_value"));
    }

    #[test]
    fn test_socket_addr() {
        let config = AssistantConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            database_url: None,
            claude: None,
            openai: None,
            shopify: ShopifyConfig {
                store: "vita.myshopify.com".to_string(),
                api_version: "2026-01".to_string(),
                storefront_private_token: SecretString::from("token"),
            },
            klaviyo: None,
            default_language: Language::Fr,
            limits: LimitsConfig::default(),
            scoring_weights_file: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }
}
