//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT` or `HOST_PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`, or `DB_ADDR`, `DB_PORT`, `DB_NAME`, `DB_LOGIN` and
///   `DB_PASSWD` together: PostgreSQL connection. Without them the server
///   runs on an in-memory store.
/// - `REQUEST_TIMEOUT_MS`: deadline for a single purchase (default: none)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .or_else(|| lookup("HOST_PORT"))
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").or_else(|| database_url_from_parts(&lookup)),
            request_timeout: lookup("REQUEST_TIMEOUT_MS")
                .and_then(|ms| ms.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn database_url_from_parts(lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    let addr = lookup("DB_ADDR")?;
    let name = lookup("DB_NAME")?;
    let login = lookup("DB_LOGIN")?;
    let passwd = lookup("DB_PASSWD").unwrap_or_default();
    let port = lookup("DB_PORT").unwrap_or_else(|| "5432".to_string());

    Some(format!("postgres://{login}:{passwd}@{addr}:{port}/{name}"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            request_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        assert_eq!(from_vars(&[]), Config::default());
    }

    #[test]
    fn test_addr_formatting() {
        let config = from_vars(&[("HOST", "127.0.0.1"), ("PORT", "8080")]);
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_host_port_fallback_and_bad_port() {
        assert_eq!(from_vars(&[("HOST_PORT", "9000")]).port, 9000);
        assert_eq!(from_vars(&[("PORT", "not-a-port")]).port, 3000);
    }

    #[test]
    fn test_database_url_from_parts() {
        let config = from_vars(&[
            ("DB_ADDR", "db"),
            ("DB_NAME", "shop"),
            ("DB_LOGIN", "shop_user"),
            ("DB_PASSWD", "secret"),
        ]);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://shop_user:secret@db:5432/shop")
        );
    }

    #[test]
    fn test_database_url_takes_precedence() {
        let config = from_vars(&[
            ("DATABASE_URL", "postgres://a@b/c"),
            ("DB_ADDR", "db"),
            ("DB_NAME", "shop"),
            ("DB_LOGIN", "shop_user"),
        ]);
        assert_eq!(config.database_url.as_deref(), Some("postgres://a@b/c"));
    }

    #[test]
    fn test_incomplete_db_parts_mean_no_database() {
        let config = from_vars(&[("DB_ADDR", "db"), ("DB_PORT", "5433")]);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_request_timeout() {
        assert_eq!(
            from_vars(&[("REQUEST_TIMEOUT_MS", "1500")]).request_timeout,
            Some(Duration::from_millis(1500))
        );
        assert!(from_vars(&[("REQUEST_TIMEOUT_MS", "0")]).request_timeout.is_none());
        assert!(from_vars(&[("REQUEST_TIMEOUT_MS", "soon")]).request_timeout.is_none());
    }
}
