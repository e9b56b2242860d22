use crate::app_config::AppConfig;
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but cannot be parsed.
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
/// Returns `ConfigError` if a variable is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default, so an empty environment yields a usable
/// configuration. Decoupled from the process environment so tests can feed
/// a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>().map_err(|e| invalid(var, e.to_string()))
    };

    let log_level = or_default("ROASTERY_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default(
        "ROASTERY_SOURCES_PATH",
        "./config/sources.yaml",
    ));
    let output_dir = PathBuf::from(or_default("ROASTERY_OUTPUT_DIR", "./data"));

    let request_timeout_secs = parse_u64("ROASTERY_REQUEST_TIMEOUT_SECS", "10")?;
    let user_agent = or_default("ROASTERY_USER_AGENT", DEFAULT_USER_AGENT);
    let max_concurrent_sources = parse_usize("ROASTERY_MAX_CONCURRENT_SOURCES", "4")?.max(1);
    let politeness_delay_ms = parse_u64("ROASTERY_POLITENESS_DELAY_MS", "1000")?;
    let render_settle_ms = parse_u64("ROASTERY_RENDER_SETTLE_MS", "2000")?;
    let browser_pool_size = parse_usize("ROASTERY_BROWSER_POOL_SIZE", "2")?.max(1);
    let max_retries = parse_u32("ROASTERY_MAX_RETRIES", "0")?;
    let retry_backoff_base_secs = parse_u64("ROASTERY_RETRY_BACKOFF_BASE_SECS", "2")?;
    let max_reported_errors = parse_usize("ROASTERY_MAX_REPORTED_ERRORS", "5")?;

    let run_deadline_secs = match lookup("ROASTERY_RUN_DEADLINE_SECS") {
        Ok(raw) if !raw.trim().is_empty() => Some(
            raw.trim()
                .parse::<u64>()
                .map_err(|e| invalid("ROASTERY_RUN_DEADLINE_SECS", e.to_string()))?,
        ),
        _ => None,
    };

    Ok(AppConfig {
        log_level,
        sources_path,
        output_dir,
        request_timeout_secs,
        user_agent,
        max_concurrent_sources,
        politeness_delay_ms,
        render_settle_ms,
        browser_pool_size,
        max_retries,
        retry_backoff_base_secs,
        run_deadline_secs,
        max_reported_errors,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
