use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub phrasing: PhrasingConfig,
    pub notifications: NotificationsConfig,
    pub documents: DocumentsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PhrasingConfig {
    pub mode: PhrasingMode,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct DocumentsConfig {
    pub wkhtmltopdf_path: Option<String>,
    pub company_name: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhrasingMode {
    Template,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub phrasing_mode: Option<PhrasingMode>,
    pub notifications_enabled: Option<bool>,
    pub notifications_webhook_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            phrasing: PhrasingConfig {
                mode: PhrasingMode::Template,
                base_url: None,
                api_key: None,
                timeout_secs: 20,
            },
            notifications: NotificationsConfig {
                enabled: false,
                webhook_url: None,
                timeout_secs: 10,
                max_retries: 2,
            },
            documents: DocumentsConfig {
                wkhtmltopdf_path: None,
                company_name: "Cotiza Arquitectos".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for PhrasingMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::Validation(format!(
                "unsupported phrasing mode `{other}` (expected template|http)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cotiza.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(phrasing) = patch.phrasing {
            if let Some(mode) = phrasing.mode {
                self.phrasing.mode = mode;
            }
            if let Some(base_url) = phrasing.base_url {
                self.phrasing.base_url = Some(base_url);
            }
            if let Some(api_key_value) = phrasing.api_key {
                self.phrasing.api_key = Some(secret_value(api_key_value));
            }
            if let Some(timeout_secs) = phrasing.timeout_secs {
                self.phrasing.timeout_secs = timeout_secs;
            }
        }

        if let Some(notifications) = patch.notifications {
            if let Some(enabled) = notifications.enabled {
                self.notifications.enabled = enabled;
            }
            if let Some(webhook_url) = notifications.webhook_url {
                self.notifications.webhook_url = Some(webhook_url);
            }
            if let Some(timeout_secs) = notifications.timeout_secs {
                self.notifications.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = notifications.max_retries {
                self.notifications.max_retries = max_retries;
            }
        }

        if let Some(documents) = patch.documents {
            if let Some(wkhtmltopdf_path) = documents.wkhtmltopdf_path {
                self.documents.wkhtmltopdf_path = Some(wkhtmltopdf_path);
            }
            if let Some(company_name) = documents.company_name {
                self.documents.company_name = company_name;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COTIZA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("COTIZA_SERVER_PORT") {
            self.server.port = parse_u16("COTIZA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("COTIZA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("COTIZA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("COTIZA_PHRASING_MODE") {
            self.phrasing.mode = value.parse()?;
        }
        if let Some(value) = read_env("COTIZA_PHRASING_BASE_URL") {
            self.phrasing.base_url = Some(value);
        }
        if let Some(value) = read_env("COTIZA_PHRASING_API_KEY") {
            self.phrasing.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("COTIZA_PHRASING_TIMEOUT_SECS") {
            self.phrasing.timeout_secs = parse_u64("COTIZA_PHRASING_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COTIZA_NOTIFICATIONS_ENABLED") {
            self.notifications.enabled = parse_bool("COTIZA_NOTIFICATIONS_ENABLED", &value)?;
        }
        if let Some(value) = read_env("COTIZA_NOTIFICATIONS_WEBHOOK_URL") {
            self.notifications.webhook_url = Some(value);
        }
        if let Some(value) = read_env("COTIZA_NOTIFICATIONS_TIMEOUT_SECS") {
            self.notifications.timeout_secs =
                parse_u64("COTIZA_NOTIFICATIONS_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("COTIZA_NOTIFICATIONS_MAX_RETRIES") {
            self.notifications.max_retries =
                parse_u32("COTIZA_NOTIFICATIONS_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("COTIZA_DOCUMENTS_WKHTMLTOPDF_PATH") {
            self.documents.wkhtmltopdf_path = Some(value);
        }
        if let Some(value) = read_env("COTIZA_DOCUMENTS_COMPANY_NAME") {
            self.documents.company_name = value;
        }

        let log_level = read_env("COTIZA_LOGGING_LEVEL").or_else(|| read_env("COTIZA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COTIZA_LOGGING_FORMAT").or_else(|| read_env("COTIZA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(phrasing_mode) = overrides.phrasing_mode {
            self.phrasing.mode = phrasing_mode;
        }
        if let Some(enabled) = overrides.notifications_enabled {
            self.notifications.enabled = enabled;
        }
        if let Some(webhook_url) = overrides.notifications_webhook_url {
            self.notifications.webhook_url = Some(webhook_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_phrasing(&self.phrasing)?;
        validate_notifications(&self.notifications)?;
        validate_documents(&self.documents)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cotiza.toml"), PathBuf::from("config/cotiza.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_phrasing(phrasing: &PhrasingConfig) -> Result<(), ConfigError> {
    if phrasing.timeout_secs == 0 || phrasing.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "phrasing.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if phrasing.mode == PhrasingMode::Http {
        let missing =
            phrasing.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "phrasing.base_url is required when phrasing.mode is `http`".to_string(),
            ));
        }
    }

    if let Some(api_key) = &phrasing.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "phrasing.api_key must not be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_notifications(notifications: &NotificationsConfig) -> Result<(), ConfigError> {
    if notifications.timeout_secs == 0 || notifications.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "notifications.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if notifications.enabled {
        let Some(webhook_url) = &notifications.webhook_url else {
            return Err(ConfigError::Validation(
                "notifications.enabled is true but notifications.webhook_url is not set"
                    .to_string(),
            ));
        };
        if !webhook_url.starts_with("http://") && !webhook_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "notifications.webhook_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_documents(documents: &DocumentsConfig) -> Result<(), ConfigError> {
    if documents.company_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "documents.company_name must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    phrasing: Option<PhrasingPatch>,
    notifications: Option<NotificationsPatch>,
    documents: Option<DocumentsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PhrasingPatch {
    mode: Option<PhrasingMode>,
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationsPatch {
    enabled: Option<bool>,
    webhook_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentsPatch {
    wkhtmltopdf_path: Option<String>,
    company_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
