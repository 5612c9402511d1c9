//! Configuration management for the session control plane.
//!
//! Layers, lowest to highest priority:
//! - `config/default.toml` (optional)
//! - `config/{env}.toml` (optional, selected by `SESSIONCTL_ENV`)
//! - process environment, `SESSIONCTL__SECTION__FIELD` for nested fields
//! - the bare operational env vars named in the external interface (`REDIS_HOST`,
//!   `API_KEY`, ...), applied last so existing deployment tooling keeps working
//!   unchanged.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use sessionctl_core::Profile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_redis_host() -> String {
    "redis".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self { host: default_redis_host(), port: default_redis_port(), password: None }
    }
}

impl RedisConfig {
    /// Accepts either a bare port or a `tcp://host:port` URL in `REDIS_PORT`,
    /// matching the external interface's documented quirk.
    pub fn from_env_override(mut self) -> Self {
        if let Ok(host) = std::env::var("REDIS_HOST") {
            self.host = host;
        }
        if let Ok(raw_port) = std::env::var("REDIS_PORT") {
            if let Some(parsed) = parse_redis_port(&raw_port, &mut self.host) {
                self.port = parsed;
            }
        }
        if let Ok(password) = std::env::var("REDIS_PASSWORD") {
            self.password = Some(password);
        }
        self
    }

    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}", password, self.host, self.port),
            None => format!("redis://{}:{}", self.host, self.port),
        }
    }
}

/// Parses `REDIS_PORT` as either a bare integer or a `tcp://host:port` URL.
/// When it's a URL, the host embedded in it overrides `host` too.
fn parse_redis_port(raw: &str, host: &mut String) -> Option<u16> {
    if let Some(rest) = raw.strip_prefix("tcp://") {
        let mut parts = rest.rsplitn(2, ':');
        let port = parts.next()?.parse().ok()?;
        if let Some(embedded_host) = parts.next() {
            *host = embedded_host.to_string();
        }
        Some(port)
    } else {
        raw.parse().ok()
    }
}

/// Deployment profile selection and per-profile knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_base_domain")]
    pub base_domain: String,
    #[serde(default = "default_claim_size_gib")]
    pub claim_size_gib: u32,
    #[serde(default)]
    pub use_autoscaler: bool,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_prefix() -> String {
    "user".to_string()
}

fn default_base_domain() -> String {
    "preview.example".to_string()
}

fn default_claim_size_gib() -> u32 {
    10
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            base_domain: default_base_domain(),
            claim_size_gib: default_claim_size_gib(),
            use_autoscaler: false,
            namespace: default_namespace(),
        }
    }
}

impl ProfileConfig {
    /// Builds the runtime [`Profile`] value threaded through naming, the
    /// orchestrator client, and the lifecycle engine.
    pub fn to_profile(&self) -> Profile {
        Profile::new(self.prefix.clone(), self.base_domain.clone())
            .with_autoscaler(self.use_autoscaler)
            .with_claim_size_gib(self.claim_size_gib)
            .with_namespace(self.namespace.clone())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// Auth / rate-limit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_key: Option<String>,
}

impl AuthConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { api_key: std::env::var("API_KEY").ok() }
    }
}

/// Per-endpoint rate-limit budget: at most `limit` calls per `window_secs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitBudget {
    pub limit: u64,
    pub window_secs: u64,
}

/// All per-endpoint rate limits, defaulted per the external interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_create_budget")]
    pub create: RateLimitBudget,
    #[serde(default = "default_transition_budget")]
    pub wake: RateLimitBudget,
    #[serde(default = "default_transition_budget")]
    pub sleep: RateLimitBudget,
    #[serde(default = "default_transition_budget")]
    pub scale: RateLimitBudget,
    #[serde(default = "default_transition_budget")]
    pub delete: RateLimitBudget,
    #[serde(default = "default_chat_budget")]
    pub chat: RateLimitBudget,
    #[serde(default = "default_status_budget")]
    pub status: RateLimitBudget,
}

fn default_create_budget() -> RateLimitBudget {
    RateLimitBudget { limit: 100, window_secs: 60 }
}
fn default_transition_budget() -> RateLimitBudget {
    RateLimitBudget { limit: 50, window_secs: 60 }
}
fn default_chat_budget() -> RateLimitBudget {
    RateLimitBudget { limit: 100, window_secs: 60 }
}
fn default_status_budget() -> RateLimitBudget {
    RateLimitBudget { limit: 200, window_secs: 60 }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            create: default_create_budget(),
            wake: default_transition_budget(),
            sleep: default_transition_budget(),
            scale: default_transition_budget(),
            delete: default_transition_budget(),
            chat: default_chat_budget(),
            status: default_status_budget(),
        }
    }
}

/// User pod image/port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodConfig {
    #[serde(default = "default_pod_image")]
    pub image: String,
    #[serde(default = "default_pod_port")]
    pub port: u16,
}

fn default_pod_image() -> String {
    "ghcr.io/sessionctl/user-pod:latest".to_string()
}

fn default_pod_port() -> u16 {
    8080
}

impl Default for PodConfig {
    fn default() -> Self {
        Self { image: default_pod_image(), port: default_pod_port() }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub pod: PodConfig,
    /// Time-to-live, in seconds, refreshed on every session record mutation.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_session_ttl() -> u64 {
    86_400
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session_ttl_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if !(1..=1024).contains(&self.profile.claim_size_gib) {
            return Err(ConfigError::InvalidValue {
                field: "profile.claim_size_gib".to_string(),
                message: "must be between 1 and 1024 GiB".to_string(),
            });
        }
        if self.profile.base_domain.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "profile.base_domain".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.pod.image.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "pod.image".to_string(),
                message: "USER_POD_IMAGE must be set".to_string(),
            });
        }
        Ok(())
    }

    fn apply_bare_env_overrides(mut self) -> Self {
        self.redis = self.redis.from_env_override();
        if let Ok(ttl) = std::env::var("SESSION_TTL") {
            if let Ok(parsed) = ttl.parse() {
                self.session_ttl_secs = parsed;
            }
        }
        if let Ok(image) = std::env::var("USER_POD_IMAGE") {
            self.pod.image = image;
        }
        if let Ok(port) = std::env::var("USER_POD_PORT") {
            if let Ok(parsed) = port.parse() {
                self.pod.port = parsed;
            }
        }
        if let Ok(key) = std::env::var("API_KEY") {
            self.auth.api_key = Some(key);
        }
        if let Ok(namespace) = std::env::var("K8S_NAMESPACE") {
            self.profile.namespace = namespace;
        }
        if let Ok(prefix) = std::env::var("HOST_PREFIX") {
            self.profile.prefix = prefix;
        }
        if let Ok(domain) = std::env::var("BASE_DOMAIN") {
            self.profile.base_domain = domain;
        }
        if let Ok(size) = std::env::var("CLAIM_SIZE_GIB") {
            if let Ok(parsed) = size.parse() {
                self.profile.claim_size_gib = parsed;
            }
        }
        self
    }
}

/// Load settings from `config/default.toml`, an optional `config/{env}.toml`,
/// `SESSIONCTL__`-prefixed environment variables, and finally the bare
/// operational env vars documented in the external interface. Validates
/// before returning so the process fails fast on a bad configuration.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();
    builder = builder.add_source(File::with_name("config/default").required(false));
    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }
    builder = builder.add_source(
        Environment::with_prefix("SESSIONCTL").separator("__").try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    let settings = settings.apply_bare_env_overrides();
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut settings = Settings::default();
        settings.session_ttl_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn redis_port_accepts_bare_int_and_tcp_url() {
        let mut host = "redis".to_string();
        assert_eq!(parse_redis_port("6380", &mut host), Some(6380));
        assert_eq!(host, "redis");

        let mut host2 = "redis".to_string();
        assert_eq!(parse_redis_port("tcp://cache.internal:6381", &mut host2), Some(6381));
        assert_eq!(host2, "cache.internal");
    }
}
