use std::env;
use std::sync::{Mutex, OnceLock};

use cotiza_cli::commands::{config, smoke};
use serde_json::Value;

#[test]
fn smoke_returns_success_report_with_clean_env() {
    with_env(&[], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 0, "expected successful smoke report");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "smoke");
        assert_eq!(payload["status"], "pass");

        let checks = payload["checks"].as_array().expect("checks array");
        assert_eq!(checks.len(), 4);
        assert!(checks.iter().all(|check| check["status"] == "pass"));
    });
}

#[test]
fn smoke_returns_failure_when_env_override_is_invalid() {
    with_env(&[("COTIZA_SERVER_PORT", "not-a-number")], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 6, "expected smoke failure code");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "smoke");
        assert_eq!(payload["status"], "fail");

        let checks = payload["checks"].as_array().expect("checks array");
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "fail");
        assert!(checks.iter().skip(1).all(|check| check["status"] == "skipped"));
    });
}

#[test]
fn config_validate_succeeds_with_clean_env() {
    with_env(&[], || {
        let result = config::validate();
        assert_eq!(result.exit_code, 0, "expected valid default configuration");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config_validate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn config_validate_reports_invalid_env_override() {
    with_env(&[("COTIZA_NOTIFICATIONS_ENABLED", "definitely")], || {
        let result = config::validate();
        assert_eq!(result.exit_code, 2, "expected config failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config_validate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "env_override");
    });
}

#[test]
fn config_show_attributes_sources() {
    with_env(&[("COTIZA_LOGGING_LEVEL", "warn")], || {
        let output = config::show();

        assert!(output.starts_with("effective config"));
        assert!(output.contains("- logging.level = warn (source: env (COTIZA_LOGGING_LEVEL))"));
        assert!(output.contains("- server.port = 8080 (source: default)"));
        assert!(output.contains("- phrasing.api_key = <unset> (source: default)"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "COTIZA_SERVER_BIND_ADDRESS",
        "COTIZA_SERVER_PORT",
        "COTIZA_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "COTIZA_PHRASING_MODE",
        "COTIZA_PHRASING_BASE_URL",
        "COTIZA_PHRASING_API_KEY",
        "COTIZA_PHRASING_TIMEOUT_SECS",
        "COTIZA_NOTIFICATIONS_ENABLED",
        "COTIZA_NOTIFICATIONS_WEBHOOK_URL",
        "COTIZA_NOTIFICATIONS_TIMEOUT_SECS",
        "COTIZA_NOTIFICATIONS_MAX_RETRIES",
        "COTIZA_DOCUMENTS_WKHTMLTOPDF_PATH",
        "COTIZA_DOCUMENTS_COMPANY_NAME",
        "COTIZA_LOGGING_LEVEL",
        "COTIZA_LOGGING_FORMAT",
        "COTIZA_LOG_LEVEL",
        "COTIZA_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
