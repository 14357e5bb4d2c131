//! Configuration management
//!
//! Configuration is read from `config.yml` and may be overridden through
//! `NEWSROOM_*` environment variables. Missing values fall back to defaults,
//! so an absent or empty file yields a runnable development setup.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Outgoing mail used for subscriber notifications
    #[serde(default)]
    pub email: EmailConfig,
    /// External social feed that receives one post per approval
    #[serde(default)]
    pub social: SocialConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin for API clients
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/newsroom.db".to_string()
}

/// Login session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_expiration_days")]
    pub expiration_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiration_days: default_expiration_days(),
        }
    }
}

fn default_expiration_days() -> i64 {
    7
}

/// SMTP configuration.
///
/// When `smtp_host` is unset, notification mail is written to the log
/// instead of being sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Sender address of every notification
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_address: default_from_address(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "webmaster@localhost".to_string()
}

/// Social feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Endpoint that accepts `{"text": ...}` posts
    #[serde(default = "default_social_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_social_timeout")]
    pub timeout_secs: u64,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: default_social_api_url(),
            bearer_token: None,
            timeout_secs: default_social_timeout(),
        }
    }
}

fn default_social_api_url() -> String {
    "https://api.twitter.com/2/tweets".to_string()
}

fn default_social_timeout() -> u64 {
    10
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields the default configuration; invalid YAML
    /// is an error carrying the line and column of the problem.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file, then apply `NEWSROOM_*` overrides:
    ///
    /// - NEWSROOM_SERVER_HOST, NEWSROOM_SERVER_PORT, NEWSROOM_SERVER_CORS_ORIGIN
    /// - NEWSROOM_DATABASE_URL
    /// - NEWSROOM_SESSION_EXPIRATION_DAYS
    /// - NEWSROOM_SMTP_HOST, NEWSROOM_SMTP_PORT, NEWSROOM_SMTP_USERNAME,
    ///   NEWSROOM_SMTP_PASSWORD, NEWSROOM_EMAIL_FROM
    /// - NEWSROOM_SOCIAL_ENABLED, NEWSROOM_SOCIAL_API_URL,
    ///   NEWSROOM_SOCIAL_BEARER_TOKEN
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("NEWSROOM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("NEWSROOM_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("NEWSROOM_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("NEWSROOM_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(days) = env_parse::<i64>("NEWSROOM_SESSION_EXPIRATION_DAYS") {
            if days > 0 {
                self.session.expiration_days = days;
            }
        }

        if let Ok(host) = std::env::var("NEWSROOM_SMTP_HOST") {
            self.email.smtp_host = Some(host).filter(|h| !h.is_empty());
        }
        if let Some(port) = env_parse::<u16>("NEWSROOM_SMTP_PORT") {
            self.email.smtp_port = port;
        }
        if let Ok(username) = std::env::var("NEWSROOM_SMTP_USERNAME") {
            self.email.smtp_username = Some(username);
        }
        if let Ok(password) = std::env::var("NEWSROOM_SMTP_PASSWORD") {
            self.email.smtp_password = Some(password);
        }
        if let Ok(from) = std::env::var("NEWSROOM_EMAIL_FROM") {
            self.email.from_address = from;
        }

        if let Ok(enabled) = std::env::var("NEWSROOM_SOCIAL_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.social.enabled = true,
                "0" | "false" | "no" => self.social.enabled = false,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("NEWSROOM_SOCIAL_API_URL") {
            self.social.api_url = url;
        }
        if let Ok(token) = std::env::var("NEWSROOM_SOCIAL_BEARER_TOKEN") {
            self.social.bearer_token = Some(token);
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "NEWSROOM_SERVER_HOST",
    "NEWSROOM_SERVER_PORT",
    "NEWSROOM_SERVER_CORS_ORIGIN",
    "NEWSROOM_DATABASE_URL",
    "NEWSROOM_SESSION_EXPIRATION_DAYS",
    "NEWSROOM_SMTP_HOST",
    "NEWSROOM_SMTP_PORT",
    "NEWSROOM_SMTP_USERNAME",
    "NEWSROOM_SMTP_PASSWORD",
    "NEWSROOM_EMAIL_FROM",
    "NEWSROOM_SOCIAL_ENABLED",
    "NEWSROOM_SOCIAL_API_URL",
    "NEWSROOM_SOCIAL_BEARER_TOKEN",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}
