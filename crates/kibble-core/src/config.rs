use crate::app_config::{AppConfig, Environment, ProxySettings, RotationMode};
use crate::ConfigError;

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
/// Every setting has a default, so an empty environment yields a usable
/// development config. Decoupled from the real environment so tests can use
/// a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> { lookup(var).ok().filter(|s| !s.is_empty()) };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let env = parse_environment(&or_default("KIBBLE_ENV", "development"))?;
    let log_level = or_default("KIBBLE_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default(
        "KIBBLE_CATALOG_PATH",
        "./config/retailers.yaml",
    ));

    let fetch_timeout_secs = parse_u64("KIBBLE_FETCH_TIMEOUT_SECS", "30")?;
    let fetch_connect_timeout_secs = parse_u64("KIBBLE_FETCH_CONNECT_TIMEOUT_SECS", "10")?;
    let user_agent_mode = parse_rotation_mode(&or_default("KIBBLE_USER_AGENT_MODE", "round_robin"))?;
    let max_concurrent_crawls = parse_usize("KIBBLE_MAX_CONCURRENT_CRAWLS", "4")?;
    let default_request_delay_ms = parse_u64("KIBBLE_DEFAULT_REQUEST_DELAY_MS", "1000")?;
    let max_retries = parse_u32("KIBBLE_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("KIBBLE_RETRY_BACKOFF_BASE_MS", "1000")?;

    if fetch_connect_timeout_secs > fetch_timeout_secs {
        return Err(ConfigError::InvalidEnvVar {
            var: "KIBBLE_FETCH_CONNECT_TIMEOUT_SECS".to_string(),
            reason: format!(
                "connect timeout ({fetch_connect_timeout_secs}s) exceeds overall timeout ({fetch_timeout_secs}s)"
            ),
        });
    }

    let proxy = ProxySettings {
        endpoint: optional("KIBBLE_PROXY_ENDPOINT"),
        username: optional("KIBBLE_PROXY_USERNAME"),
        password: optional("KIBBLE_PROXY_PASSWORD"),
    };

    Ok(AppConfig {
        env,
        log_level,
        catalog_path,
        fetch_timeout_secs,
        fetch_connect_timeout_secs,
        user_agent_mode,
        max_concurrent_crawls,
        default_request_delay_ms,
        max_retries,
        retry_backoff_base_ms,
        proxy,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "KIBBLE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_rotation_mode(s: &str) -> Result<RotationMode, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "round_robin" | "round-robin" | "roundrobin" => Ok(RotationMode::RoundRobin),
        "random" => Ok(RotationMode::Random),
        other => Err(ConfigError::InvalidEnvVar {
            var: "KIBBLE_USER_AGENT_MODE".to_string(),
            reason: format!("expected 'round_robin' or 'random', got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
