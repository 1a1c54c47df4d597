use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
/// `min(60s * 2^attempt, cap)` backoff ceiling for the outbox.
pub const OUTBOX_BACKOFF_CAP_SECS: u64 = 15 * 60;
pub const OUTBOX_DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const TRANSPORT_ALERT_MAX_ATTEMPTS: u32 = 3;
/// Upper bound on session-entry TTL visibility.
pub const SESSION_TTL_GRACE_SECS: u64 = 60;

/// Top-level config (coordinator.toml + COORD_* env overrides).
///
/// Loaded once at startup — no runtime reconfiguration.
#[derive(Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub llm: LlmConfig,
    pub transport: TransportConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub tabular_store: TabularStoreConfig,
    #[serde(default)]
    pub calendar_mail: CalendarMailConfig,
}

#[derive(Default, Clone, Serialize, Deserialize)]
pub struct TabularStoreConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Default, Clone, Serialize, Deserialize)]
pub struct CalendarMailConfig {
    pub base_url: Option<String>,
}

/// Custom Debug impl: never print secret fields.
impl std::fmt::Debug for CoordinatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorConfig")
            .field("gateway", &self.gateway)
            .field("database", &"<redacted>")
            .field("cache", &self.cache.url.as_ref().map(|_| "<configured>"))
            .field("llm", &"<redacted>")
            .field("transport", &"<redacted>")
            .field("encryption", &self.encryption.enabled())
            .field("rate_limit", &self.rate_limit)
            .field("timezone", &self.timezone)
            .field("tabular_store", &self.tabular_store.base_url.as_ref().map(|_| "<configured>"))
            .field("calendar_mail", &self.calendar_mail.base_url.as_ref().map(|_| "<configured>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Shared secret for `/admin/*` routes; always compared in constant time.
    pub admin_secret: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub db_url: String,
}

#[derive(Default, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Absence degrades the session store to in-memory-only.
    pub url: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_transport_base_url")]
    pub base_url: String,
    pub token: String,
    pub boss_user_id: String,
    pub webhook_secret: String,
}

/// 32-byte symmetric key for OAuth token ciphertext. Absence disables
/// encryption and forces plaintext mode with a startup warning.
#[derive(Default, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Hex-encoded 32-byte key, or absent to run in plaintext mode.
    pub key_hex: Option<String>,
}

impl EncryptionConfig {
    pub fn enabled(&self) -> bool {
        self.key_hex.is_some()
    }

    pub fn key_bytes(&self) -> Result<Option<[u8; 32]>> {
        let Some(hex_str) = &self.key_hex else {
            return Ok(None);
        };
        let bytes = hex::decode(hex_str)
            .map_err(|e| CoordinatorError::Config(format!("invalid encryption key hex: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoordinatorError::Config("encryption key must be 32 bytes".into()))?;
        Ok(Some(arr))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests/sec token-bucket rate for authenticated identities.
    #[serde(default = "default_rate_authenticated")]
    pub authenticated: u32,
    /// Requests/sec token-bucket rate for public/unauthenticated sources.
    #[serde(default = "default_rate_public")]
    pub public: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            authenticated: default_rate_authenticated(),
            public: default_rate_public(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_llm_model() -> String {
    "claude-sonnet-4-6".to_string()
}
fn default_llm_timeout_ms() -> u64 {
    10_000
}
fn default_rate_authenticated() -> u32 {
    30
}
fn default_rate_public() -> u32 {
    5
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_transport_base_url() -> String {
    "https://api.transport.invalid".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

impl CoordinatorConfig {
    /// Load config from a TOML file with COORD_* env var overrides.
    ///
    /// Checks, in order: explicit path argument, then `COORD_CONFIG` env,
    /// then `./coordinator.toml`. Fails startup with a clear error if a
    /// required option is missing or malformed — there is no silent-default
    /// fallback for required fields, because this system has no sensible
    /// default credential set.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("COORD_CONFIG").ok())
            .unwrap_or_else(|| "coordinator.toml".to_string());

        let config: CoordinatorConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("COORD_").split("_"))
            .extract()
            .map_err(|e| CoordinatorError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.gateway.admin_secret.trim().is_empty() {
            return Err(CoordinatorError::Config(
                "gateway.admin_secret must be set".into(),
            ));
        }
        if self.transport.webhook_secret.trim().is_empty() {
            return Err(CoordinatorError::Config(
                "transport.webhook_secret must be set".into(),
            ));
        }
        if self.database.db_url.trim().is_empty() {
            return Err(CoordinatorError::Config("database.db_url must be set".into()));
        }
        if self.encryption.key_hex.is_none() {
            tracing::warn!(
                "encryption.key_hex not set — OAuth tokens will be stored in plaintext"
            );
        }
        if self.cache.url.is_none() {
            tracing::warn!("cache.url not set — session store will run in-memory only");
        }
        Ok(())
    }
}
