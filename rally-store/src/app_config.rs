use rally_shared::Masked;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub rules: BusinessRules,
    #[serde(default)]
    pub advisor: AdvisorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Local,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Local JSON cache directory. With the redis backend it receives a mirror.
    pub data_dir: Option<String>,
    pub redis_url: Option<String>,
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String { "rally:changes".into() }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Masked<String>,
    pub jwt_expiration_seconds: u64,
    pub admin_login: String,
    pub admin_password: Masked<String>,
    pub member_login: String,
    pub member_password: Masked<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_grace_period_hours")]
    pub grace_period_hours: i64,
    #[serde(default = "default_max_participants")]
    pub default_max_participants: u32,
    #[serde(default = "default_advice_sample_size")]
    pub advice_sample_size: usize,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_grace_period_hours() -> i64 { 4 }
fn default_max_participants() -> u32 { 8 }
fn default_advice_sample_size() -> usize { 3 }
fn default_currency() -> String { "RM".into() }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            grace_period_hours: default_grace_period_hours(),
            default_max_participants: default_max_participants(),
            advice_sample_size: default_advice_sample_size(),
            currency: default_currency(),
        }
    }
}

/// Text-generation endpoint. Without an endpoint the advisor is disabled.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdvisorConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<Masked<String>>,
    pub model: Option<String>,
}

impl AdvisorConfig {
    pub fn is_enabled(&self) -> bool {
        self.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Uncommitted machine-local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `RALLY_STORAGE__BACKEND=redis`
            .add_source(config::Environment::with_prefix("RALLY").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Parse a single TOML document, without file or environment layering.
    pub fn from_toml(raw: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
