//! Connection settings for the Postgres database that holds school records.
//!
//! The URL is resolved in this order:
//! 1. `database_url_env`, the name of an environment variable holding the URL
//! 2. `database_url`
//! 3. the individual `host`/`port`/`database`/`username`/`password` fields

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_database_url_env", skip_serializing_if = "Option::is_none")]
    pub database_url_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable holding the password. Wins over `password`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    #[serde(default)]
    pub ssl_mode: SslMode,

    #[serde(default)]
    pub pool: PoolConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            database_url_env: default_database_url_env(),
            database_url: None,
            host: default_host(),
            port: default_port(),
            database: default_database(),
            username: default_username(),
            password: None,
            password_env: None,
            ssl_mode: SslMode::default(),
            pool: PoolConfig::default(),
        }
    }
}

/// libpq `sslmode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Disable,
    Allow,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }
}

/// Connection pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a free connection before failing the action.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
        }
    }
}

impl UpstreamConfig {
    /// Resolve the connection URL.
    pub fn connection_string(&self) -> String {
        if let Some(var) = &self.database_url_env
            && let Ok(url) = std::env::var(var)
            && !url.is_empty()
        {
            return url;
        }

        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let auth = match self.resolve_password() {
            Some(password) => format!("{}:{}", self.username, password),
            None => self.username.clone(),
        };
        let mut url = format!(
            "postgresql://{}@{}:{}/{}",
            auth, self.host, self.port, self.database
        );
        if self.ssl_mode != SslMode::Prefer {
            url.push_str("?sslmode=");
            url.push_str(self.ssl_mode.as_str());
        }
        url
    }

    fn resolve_password(&self) -> Option<String> {
        if let Some(var) = &self.password_env
            && let Ok(password) = std::env::var(var)
        {
            return Some(password);
        }
        self.password.clone()
    }
}

fn default_database_url_env() -> Option<String> {
    Some("DATABASE_URL".to_string())
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_database() -> String {
    "campus".to_string()
}

fn default_username() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_env() -> UpstreamConfig {
        UpstreamConfig {
            database_url_env: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_individual_fields_build_url() {
        let config = UpstreamConfig {
            host: "db".to_string(),
            database: "school".to_string(),
            username: "admin".to_string(),
            password: Some("pw".to_string()),
            ..without_env()
        };
        assert_eq!(config.connection_string(), "postgresql://admin:pw@db:5432/school");
    }

    #[test]
    fn test_direct_url_wins_over_fields() {
        let config = UpstreamConfig {
            database_url: Some("postgresql://u@elsewhere/x".to_string()),
            host: "ignored".to_string(),
            ..without_env()
        };
        assert_eq!(config.connection_string(), "postgresql://u@elsewhere/x");
    }

    #[test]
    fn test_missing_env_var_falls_through() {
        let config = UpstreamConfig {
            database_url_env: Some("CAMPUS_TEST_UNSET_DATABASE_URL_VAR".to_string()),
            database_url: Some("postgresql://fallback/db".to_string()),
            ..Default::default()
        };
        assert_eq!(config.connection_string(), "postgresql://fallback/db");
    }

    #[test]
    fn test_non_default_ssl_mode_is_appended() {
        let config = UpstreamConfig {
            ssl_mode: SslMode::VerifyFull,
            ..without_env()
        };
        assert!(config.connection_string().ends_with("?sslmode=verify-full"));
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("verify-full"));
    }
}
