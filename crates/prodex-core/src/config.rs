use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str = "prodex/0.1 (product-extraction)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can use a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let sites_path = lookup("PRODEX_SITES_PATH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);

    let config = AppConfig {
        env: parse_environment(&or_default("PRODEX_ENV", "development")),
        log_level: or_default("PRODEX_LOG_LEVEL", "info"),
        sites_path,
        request_timeout_secs: parse_var(&lookup, "PRODEX_REQUEST_TIMEOUT_SECS", 30)?,
        user_agent: or_default("PRODEX_USER_AGENT", DEFAULT_USER_AGENT),
        max_retries: parse_var(&lookup, "PRODEX_MAX_RETRIES", 3)?,
        retry_backoff_base_secs: parse_var(&lookup, "PRODEX_RETRY_BACKOFF_BASE_SECS", 2)?,
        image_probe_concurrency: parse_var(&lookup, "PRODEX_IMAGE_PROBE_CONCURRENCY", 4)?,
        image_probe_timeout_secs: parse_var(&lookup, "PRODEX_IMAGE_PROBE_TIMEOUT_SECS", 8)?,
    };

    for (var, value) in [
        ("PRODEX_REQUEST_TIMEOUT_SECS", config.request_timeout_secs),
        ("PRODEX_IMAGE_PROBE_TIMEOUT_SECS", config.image_probe_timeout_secs),
        (
            "PRODEX_IMAGE_PROBE_CONCURRENCY",
            u64::try_from(config.image_probe_concurrency).unwrap_or(u64::MAX),
        ),
    ] {
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
    }

    Ok(config)
}

/// Reads `var` as a `T`, using `default` when it is unset.
fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
