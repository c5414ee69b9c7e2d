use std::{env, str::FromStr, time::Duration};

use derive_more::Display;
use dotenv::dotenv;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 2 * 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024;

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ConfigError {
    #[display(fmt = "missing required environment variable '{}'", _0)]
    Missing(String),

    #[display(fmt = "invalid value '{}' for '{}'", value, key)]
    Invalid { key: String, value: String },
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub sweep_interval: Duration,
    pub max_upload_bytes: usize,
}

impl Settings {
    /// Reads settings from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing("DATABASE_URL".to_string()))?;
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let db_max_connections =
            parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        let sweep_secs = parse_or(&lookup, "SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        let max_upload_bytes = parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        if db_max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "0"));
        }
        // tokio intervals panic on a zero period
        if sweep_secs == 0 {
            return Err(invalid("SWEEP_INTERVAL_SECS", "0"));
        }
        if max_upload_bytes == 0 {
            return Err(invalid("MAX_UPLOAD_BYTES", "0"));
        }

        Ok(Self {
            database_url,
            host,
            port,
            db_max_connections,
            sweep_interval: Duration::from_secs(sweep_secs),
            max_upload_bytes,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, &raw)),
        None => Ok(default),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let settings =
            Settings::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/events")]))
                .unwrap();
        assert_eq!(settings.host, DEFAULT_HOST);
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(settings.sweep_interval, Duration::from_secs(120));
        assert_eq!(settings.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(
            Settings::from_lookup(lookup_from(&[])).unwrap_err(),
            ConfigError::Missing("DATABASE_URL".to_string())
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/events"),
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("SWEEP_INTERVAL_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.sweep_interval, Duration::from_secs(30));
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/events"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid value 'eighty' for 'PORT'");

        let err = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/events"),
            ("SWEEP_INTERVAL_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
