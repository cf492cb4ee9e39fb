use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cotiza_core::config::{AppConfig, ConfigError, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

pub fn show() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        field_source(
            "server.bind_address",
            Some("COTIZA_SERVER_BIND_ADDRESS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        field_source(
            "server.port",
            Some("COTIZA_SERVER_PORT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        field_source(
            "server.graceful_shutdown_secs",
            Some("COTIZA_SERVER_GRACEFUL_SHUTDOWN_SECS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "phrasing.mode",
        &format!("{:?}", config.phrasing.mode),
        field_source(
            "phrasing.mode",
            Some("COTIZA_PHRASING_MODE"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "phrasing.base_url",
        config.phrasing.base_url.as_deref().unwrap_or("<unset>"),
        field_source(
            "phrasing.base_url",
            Some("COTIZA_PHRASING_BASE_URL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    let phrasing_api_key = if config.phrasing.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "phrasing.api_key",
        phrasing_api_key,
        field_source(
            "phrasing.api_key",
            Some("COTIZA_PHRASING_API_KEY"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "phrasing.timeout_secs",
        &config.phrasing.timeout_secs.to_string(),
        field_source(
            "phrasing.timeout_secs",
            Some("COTIZA_PHRASING_TIMEOUT_SECS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "notifications.enabled",
        &config.notifications.enabled.to_string(),
        field_source(
            "notifications.enabled",
            Some("COTIZA_NOTIFICATIONS_ENABLED"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "notifications.webhook_url",
        config.notifications.webhook_url.as_deref().unwrap_or("<unset>"),
        field_source(
            "notifications.webhook_url",
            Some("COTIZA_NOTIFICATIONS_WEBHOOK_URL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "notifications.timeout_secs",
        &config.notifications.timeout_secs.to_string(),
        field_source(
            "notifications.timeout_secs",
            Some("COTIZA_NOTIFICATIONS_TIMEOUT_SECS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "notifications.max_retries",
        &config.notifications.max_retries.to_string(),
        field_source(
            "notifications.max_retries",
            Some("COTIZA_NOTIFICATIONS_MAX_RETRIES"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "documents.wkhtmltopdf_path",
        config.documents.wkhtmltopdf_path.as_deref().unwrap_or("<unset>"),
        field_source(
            "documents.wkhtmltopdf_path",
            Some("COTIZA_DOCUMENTS_WKHTMLTOPDF_PATH"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "documents.company_name",
        &config.documents.company_name,
        field_source(
            "documents.company_name",
            Some("COTIZA_DOCUMENTS_COMPANY_NAME"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        field_source(
            "logging.level",
            Some("COTIZA_LOGGING_LEVEL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        field_source(
            "logging.format",
            Some("COTIZA_LOGGING_FORMAT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.join("\n")
}

pub fn validate() -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(_) => CommandResult::success("config_validate", "configuration loaded and validated"),
        Err(error) => {
            CommandResult::failure("config_validate", error_class(&error), error.to_string(), 2)
        }
    }
}

fn error_class(error: &ConfigError) -> &'static str {
    match error {
        ConfigError::ReadFile { .. } => "config_read",
        ConfigError::ParseFile { .. } => "config_parse",
        ConfigError::MissingConfigFile(_) => "config_missing",
        ConfigError::MissingEnvInterpolation { .. } | ConfigError::UnterminatedInterpolation => {
            "env_interpolation"
        }
        ConfigError::InvalidEnvOverride { .. } => "env_override",
        ConfigError::Validation(_) => "config_validation",
    }
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("cotiza.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/cotiza.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
