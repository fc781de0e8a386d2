use std::env;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Postgres connection string; the in-memory table is used when unset.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_log_format(env::var("LOG_FORMAT").ok().as_deref())?,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            db_max_connections: parse_or_default("DB_MAX_CONNECTIONS", 5)?,
        })
    }
}

fn parse_log_format(raw: Option<&str>) -> Result<LogFormat, AppError> {
    match raw {
        None | Some("compact") => Ok(LogFormat::Compact),
        Some("json") => Ok(LogFormat::Json),
        Some(other) => Err(AppError::Internal(format!(
            "invalid LOG_FORMAT: {other}, expected compact or json"
        ))),
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_compact() {
        assert_eq!(parse_log_format(None).unwrap(), LogFormat::Compact);
        assert_eq!(parse_log_format(Some("json")).unwrap(), LogFormat::Json);
        assert!(parse_log_format(Some("pretty")).is_err());
    }

    #[test]
    fn missing_key_falls_back_to_default() {
        let port: u16 = parse_or_default("COURIER_SERVICE_TEST_UNSET_PORT", 4100).unwrap();
        assert_eq!(port, 4100);
    }
}
