use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5173,http://localhost:5174,http://localhost:5175,http://localhost:3000";
const DEFAULT_YELP_BASE_URL: &str = "https://api.yelp.com/v3";
const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
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
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    if !(database_url.starts_with("postgres://") || database_url.starts_with("postgresql://")) {
        return Err(invalid(
            "DATABASE_URL",
            "must be a postgres:// or postgresql:// connection string".to_string(),
        ));
    }
    let yelp_api_key = require("YELP_API_KEY")?;
    let firebase_api_key = require("FIREBASE_API_KEY")?;

    let env = parse_environment(&or_default("DINEWISE_ENV", "development"));

    let bind_addr = or_default("DINEWISE_BIND_ADDR", "0.0.0.0:8000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("DINEWISE_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("DINEWISE_LOG_LEVEL", "info");
    let cors_origins = parse_origin_list(&or_default("DINEWISE_CORS_ORIGINS", DEFAULT_CORS_ORIGINS));

    let yelp_base_url = or_default("YELP_BASE_URL", DEFAULT_YELP_BASE_URL);
    let yelp_timeout_secs = parse_u64("YELP_TIMEOUT_SECS", "15")?;
    let identity_base_url = or_default("IDENTITY_BASE_URL", DEFAULT_IDENTITY_BASE_URL);
    let identity_timeout_secs = parse_u64("IDENTITY_TIMEOUT_SECS", "10")?;

    let db_max_connections = parse_u32("DINEWISE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("DINEWISE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("DINEWISE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        cors_origins,
        yelp_api_key,
        yelp_base_url,
        yelp_timeout_secs,
        firebase_api_key,
        identity_base_url,
        identity_timeout_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
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

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
