//! Configuration for the ANPR alert daemon.
//!
//! One TOML file plus the environment, layered with figment and then
//! translated into the runtime settings `anpr-core` consumes. Layers, later
//! wins:
//!
//! 1. built-in defaults
//! 2. the TOML file (optional)
//! 3. `ANPR_*` variables, `__` separating sections
//!    (`ANPR_STREAM__CONNECT_TIMEOUT_SECS=5`)
//! 4. the console's own variables (`DB_FILE`, `SMTP_HOST`, `SMTP_PORT`,
//!    `SMTP_USER`, `SMTP_PASS`, `SMTP_AUTH`, `SMTP_FROM`, `EXTERNAL_URL`),
//!    so the daemon can share the console's environment unchanged

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use anpr_core::{
    AlertSettings, ReconnectPolicy, SmtpAuth, SmtpSettings, SmtpTls, StreamSettings,
    WebhookSettings,
};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ANPR_CONFIG";

const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub stream: StreamConfig,
    pub alerts: AlertsConfig,
}

/// `[database]`: the console's SQLite file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./hikvision-anpr-alerts.db"),
        }
    }
}

/// `[stream]`: per-camera connection tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    pub subscription_path: String,
    pub connect_timeout_secs: u64,
    pub max_payload_bytes: usize,
    pub reassembly_window_ms: u64,
    pub shutdown_timeout_secs: u64,
    pub reconnect: ReconnectConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        let defaults = StreamSettings::default();
        Self {
            subscription_path: defaults.subscription_path,
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            max_payload_bytes: defaults.max_payload_bytes,
            reassembly_window_ms: 5_000,
            shutdown_timeout_secs: defaults.shutdown_timeout.as_secs(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// `[stream.reconnect]`: off unless `enabled = true`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub max_delay_secs: u64,
    /// Attempts per outage; `0` retries forever.
    pub max_retries: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay_ms: 1_000,
            max_delay_secs: 30,
            max_retries: 5,
        }
    }
}

/// `[alerts]`: where match notifications go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Operator address; defaults to `smtp.from`.
    pub recipient: Option<String>,
    /// Console URL mentioned in alert bodies.
    pub external_url: Option<String>,
    pub smtp: SmtpConfig,
    pub webhook: WebhookConfig,
}

/// `[alerts.smtp]`: enabled when `host` is set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    #[serde(deserialize_with = "lenient_string")]
    pub username: Option<String>,
    /// Plaintext here; held as a secret once loaded.
    #[serde(deserialize_with = "lenient_string")]
    pub password: Option<String>,
    /// `auto`, `plain`, `login`, or `none`.
    pub auth: String,
    pub from: Option<String>,
    /// `none`, `opportunistic`, `starttls`, or `tls`.
    pub tls: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 25,
            username: None,
            password: None,
            auth: "auto".into(),
            from: None,
            tls: "opportunistic".into(),
        }
    }
}

/// `[alerts.webhook]`: enabled when `url` is set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 10,
        }
    }
}

/// Accept numbers and booleans as text: environment values are parsed,
/// so `SMTP_PASS=1234` arrives as an integer.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

// ── Config file path ────────────────────────────────────────────────

/// Platform config path (`~/.config/anpr-alerts/config.toml` on Linux).
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "hikvision-anpr-alerts", "anpr-alerts").map_or_else(
        || PathBuf::from("anpr-alerts.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// The file to load: `explicit`, then `$ANPR_CONFIG`, then [`config_path`].
///
/// The boolean is `true` when the path was asked for rather than defaulted,
/// in which case it must exist.
pub fn resolve_config_path(explicit: Option<&Path>) -> (PathBuf, bool) {
    if let Some(path) = explicit {
        return (path.to_path_buf(), true);
    }
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => (PathBuf::from(path), true),
        _ => (config_path(), false),
    }
}

// ── Config loading ──────────────────────────────────────────────────

/// Resolve the path, then load and validate.
pub fn load(explicit: Option<&Path>) -> Result<(Config, PathBuf), ConfigError> {
    let (path, required) = resolve_config_path(explicit);
    if required && !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let config = load_from(&path)?;
    Ok((config, path))
}

/// Load from `path` (which may be absent) plus the environment.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ANPR_").ignore(&["config"]).split("__"))
        .merge(legacy_env())
}

/// The console's unprefixed variables, mapped onto config keys.
fn legacy_env() -> Env {
    Env::raw()
        .filter_map(|key| {
            let mapped = match key.as_str().to_ascii_uppercase().as_str() {
                "DB_FILE" => "database.path",
                "SMTP_HOST" => "alerts.smtp.host",
                "SMTP_PORT" => "alerts.smtp.port",
                "SMTP_USER" => "alerts.smtp.username",
                "SMTP_PASS" => "alerts.smtp.password",
                "SMTP_AUTH" => "alerts.smtp.auth",
                "SMTP_FROM" => "alerts.smtp.from",
                "EXTERNAL_URL" => "alerts.external_url",
                _ => return None,
            };
            Some(mapped.into())
        })
}

// ── Validation & redaction ──────────────────────────────────────────

impl Config {
    /// Reject values the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(invalid("database.path", "must not be empty"));
        }

        let stream = &self.stream;
        if !stream.subscription_path.starts_with('/') {
            return Err(invalid("stream.subscription_path", "must start with '/'"));
        }
        if stream.connect_timeout_secs == 0 {
            return Err(invalid("stream.connect_timeout_secs", "must be at least 1"));
        }
        if stream.max_payload_bytes < 1024 {
            return Err(invalid("stream.max_payload_bytes", "must be at least 1024"));
        }
        if stream.reassembly_window_ms == 0 {
            return Err(invalid("stream.reassembly_window_ms", "must be at least 1"));
        }
        if stream.shutdown_timeout_secs == 0 {
            return Err(invalid("stream.shutdown_timeout_secs", "must be at least 1"));
        }
        if stream.reconnect.enabled && stream.reconnect.max_delay_secs == 0 {
            return Err(invalid("stream.reconnect.max_delay_secs", "must be at least 1"));
        }

        if let Some(url) = non_blank(self.alerts.external_url.as_deref()) {
            external_url(url)?;
        }
        if self.alerts.smtp.enabled() {
            parse_auth(&self.alerts.smtp.auth)?;
            parse_tls(&self.alerts.smtp.tls)?;
            if non_blank(self.alerts.smtp.from.as_deref()).is_none() {
                return Err(invalid("alerts.smtp.from", "required when smtp.host is set"));
            }
        }
        if let Some(url) = non_blank(self.alerts.webhook.url.as_deref()) {
            webhook_url(url)?;
        }
        Ok(())
    }

    /// Copy with every secret replaced, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.alerts.smtp.password.is_some() {
            copy.alerts.smtp.password = Some(REDACTED.into());
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl SmtpConfig {
    pub fn enabled(&self) -> bool {
        non_blank(self.host.as_deref()).is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_auth(value: &str) -> Result<SmtpAuth, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "auto" | "unknown" => Ok(SmtpAuth::Auto),
        "plain" => Ok(SmtpAuth::Plain),
        "login" => Ok(SmtpAuth::Login),
        "none" => Ok(SmtpAuth::None),
        other => Err(invalid(
            "alerts.smtp.auth",
            format!("expected 'auto', 'plain', 'login', or 'none', got '{other}'"),
        )),
    }
}

fn parse_tls(value: &str) -> Result<SmtpTls, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "none" => Ok(SmtpTls::None),
        "" | "opportunistic" => Ok(SmtpTls::Opportunistic),
        "starttls" => Ok(SmtpTls::StartTls),
        "tls" => Ok(SmtpTls::Tls),
        other => Err(invalid(
            "alerts.smtp.tls",
            format!("expected 'none', 'opportunistic', 'starttls', or 'tls', got '{other}'"),
        )),
    }
}

/// Console link for alert bodies. The console's own `EXTERNAL_URL` is
/// often a bare host (`localhost`), which gets an `http://` prefix.
fn external_url(value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    let text = if value.contains("://") {
        value.to_string()
    } else {
        format!("http://{value}")
    };
    url::Url::parse(&text).map_err(|e| invalid("alerts.external_url", e.to_string()))?;
    Ok(text)
}

fn webhook_url(value: &str) -> Result<url::Url, ConfigError> {
    let url = url::Url::parse(value).map_err(|e| invalid("alerts.webhook.url", e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(
            "alerts.webhook.url",
            format!("unsupported scheme '{other}'"),
        )),
    }
}

// ── Translation to runtime settings ─────────────────────────────────

impl Config {
    pub fn stream_settings(&self) -> StreamSettings {
        let stream = &self.stream;
        let reconnect = if stream.reconnect.enabled {
            ReconnectPolicy {
                initial_delay: Duration::from_millis(stream.reconnect.initial_delay_ms),
                max_delay: Duration::from_secs(stream.reconnect.max_delay_secs),
                max_retries: (stream.reconnect.max_retries > 0)
                    .then_some(stream.reconnect.max_retries),
            }
        } else {
            ReconnectPolicy::disabled()
        };

        StreamSettings {
            subscription_path: stream.subscription_path.clone(),
            connect_timeout: Duration::from_secs(stream.connect_timeout_secs),
            max_payload_bytes: stream.max_payload_bytes,
            reassembly_window: Duration::from_millis(stream.reassembly_window_ms),
            shutdown_timeout: Duration::from_secs(stream.shutdown_timeout_secs),
            reconnect,
        }
    }

    pub fn alert_settings(&self) -> Result<AlertSettings, ConfigError> {
        let alerts = &self.alerts;

        let smtp = if alerts.smtp.enabled() {
            let cfg = &alerts.smtp;
            Some(SmtpSettings {
                host: non_blank(cfg.host.as_deref()).unwrap_or_default().to_string(),
                port: cfg.port,
                username: non_blank(cfg.username.as_deref()).map(String::from),
                password: cfg.password.clone().map(SecretString::from),
                auth: parse_auth(&cfg.auth)?,
                tls: parse_tls(&cfg.tls)?,
                from: non_blank(cfg.from.as_deref())
                    .ok_or_else(|| invalid("alerts.smtp.from", "required when smtp.host is set"))?
                    .to_string(),
            })
        } else {
            None
        };

        let webhook = match non_blank(alerts.webhook.url.as_deref()) {
            Some(url) => Some(WebhookSettings {
                url: webhook_url(url)?,
                timeout: Duration::from_secs(alerts.webhook.timeout_secs.max(1)),
            }),
            None => None,
        };

        Ok(AlertSettings {
            recipient: non_blank(alerts.recipient.as_deref()).map(String::from),
            external_url: non_blank(alerts.external_url.as_deref())
                .map(external_url)
                .transpose()?,
            smtp,
            webhook,
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();

        let stream = config.stream_settings();
        assert_eq!(stream.connect_timeout, Duration::from_secs(10));
        assert_eq!(stream.reassembly_window, Duration::from_secs(5));
        assert_eq!(stream.shutdown_timeout, Duration::from_secs(30));
        assert!(!stream.reconnect.is_enabled());

        let alerts = config.alert_settings().unwrap();
        assert!(alerts.smtp.is_none());
        assert!(alerts.webhook.is_none());
    }

    #[test]
    fn toml_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [database]
                path = "/var/lib/anpr/console.db"

                [stream]
                connect_timeout_secs = 3

                [stream.reconnect]
                enabled = true
                max_retries = 0

                [alerts.smtp]
                host = "smtp.example.com"
                from = "alerts@example.com"
                tls = "starttls"
                "#,
            )?;
            jail.set_env("ANPR_STREAM__CONNECT_TIMEOUT_SECS", "7");
            jail.set_env("ANPR_ALERTS__RECIPIENT", "ops@example.com");

            let config = load_from(Path::new("config.toml")).unwrap();
            assert_eq!(config.database.path, PathBuf::from("/var/lib/anpr/console.db"));
            assert_eq!(config.stream.connect_timeout_secs, 7);

            let stream = config.stream_settings();
            assert!(stream.reconnect.is_enabled());
            assert_eq!(stream.reconnect.max_retries, None);

            let alerts = config.alert_settings().unwrap();
            let smtp = alerts.smtp.as_ref().unwrap();
            assert_eq!(smtp.tls, SmtpTls::StartTls);
            assert_eq!(alerts.effective_recipient(), Some("ops@example.com"));
            Ok(())
        });
    }

    #[test]
    fn console_environment_is_honoured() {
        Jail::expect_with(|jail| {
            jail.set_env("DB_FILE", "/data/hikvision-anpr-alerts.db");
            jail.set_env("SMTP_HOST", "mail.example.com");
            jail.set_env("SMTP_PORT", "587");
            jail.set_env("SMTP_USER", "alerts");
            jail.set_env("SMTP_PASS", "20240501");
            jail.set_env("SMTP_AUTH", "Plain");
            jail.set_env("SMTP_FROM", "alerts@example.com");
            jail.set_env("EXTERNAL_URL", "https://anpr.example.com");

            let config = load_from(Path::new("missing.toml")).unwrap();
            assert_eq!(config.database.path, PathBuf::from("/data/hikvision-anpr-alerts.db"));

            let alerts = config.alert_settings().unwrap();
            let smtp = alerts.smtp.as_ref().unwrap();
            assert_eq!(smtp.host, "mail.example.com");
            assert_eq!(smtp.port, 587);
            assert_eq!(smtp.username.as_deref(), Some("alerts"));
            assert_eq!(smtp.password.as_ref().unwrap().expose_secret(), "20240501");
            assert_eq!(smtp.auth, SmtpAuth::Plain);
            assert_eq!(alerts.external_url.as_deref(), Some("https://anpr.example.com"));
            assert_eq!(alerts.effective_recipient(), Some("alerts@example.com"));
            Ok(())
        });
    }

    #[test]
    fn bare_console_host_is_accepted() {
        Jail::expect_with(|jail| {
            jail.set_env("EXTERNAL_URL", "localhost");

            let config = load_from(Path::new("missing.toml")).unwrap();
            let alerts = config.alert_settings().unwrap();
            assert_eq!(alerts.external_url.as_deref(), Some("http://localhost"));
            Ok(())
        });

        let mut config = Config::default();
        config.alerts.external_url = Some("http://exa mple.com".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn smtp_host_without_sender_is_rejected() {
        let mut config = Config::default();
        config.alerts.smtp.host = Some("smtp.example.com".into());

        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "alerts.smtp.from"),
            "{err}"
        );
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = Config::default();
        config.stream.connect_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.alerts.webhook.url = Some("ftp://example.com/hook".into());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.alerts.smtp.host = Some("smtp.example.com".into());
        config.alerts.smtp.from = Some("alerts@example.com".into());
        config.alerts.smtp.auth = "crammd5".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn redaction_hides_smtp_password() {
        let mut config = Config::default();
        config.alerts.smtp.password = Some("hunter2".into());

        let toml = config.redacted().to_toml().unwrap();
        assert!(!toml.contains("hunter2"));
        assert!(toml.contains(REDACTED));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let err = load(Some(Path::new("nope.toml"))).unwrap_err();
            assert!(matches!(err, ConfigError::NotFound { .. }), "{err}");
            Ok(())
        });
    }
}
