//! Application configuration loaded from environment variables.
//!
//! Fail-fast: required variables must be present and valid or the
//! process exits with a clear message before anything else starts.

use std::env;
use std::path::PathBuf;

use dirwarden_directory::{DirectoryConfig, DirectoryType};
use thiserror::Error;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address.
    pub host: String,

    /// HTTP listen port.
    pub port: u16,

    /// Tracing filter directive (e.g. "info,dirwarden=debug").
    pub rust_log: String,

    /// Directory connection settings.
    pub directory: DirectoryConfig,

    /// Optional LDIF file loaded at startup.
    pub ldif_path: Option<PathBuf>,

    /// Base DN the LDIF file was written against.
    pub ldif_default_base: String,

    /// Clear the existing subtree before loading the LDIF file.
    pub ldif_clean: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Required Variables
    ///
    /// - `LDAP_HOST` - directory server hostname
    /// - `LDAP_BASE_DN` - base DN (e.g. `dc=example,dc=com`)
    /// - `LDAP_BIND_DN` - admin bind DN
    ///
    /// # Optional Variables
    ///
    /// - `LDAP_PORT` (default: 389), `LDAP_USE_SSL` (default: false)
    /// - `LDAP_BIND_PASSWORD`
    /// - `LDAP_USER_CONTAINER` (default: `ou=people`),
    ///   `LDAP_GROUP_CONTAINER` (default: `ou=groups`)
    /// - `DIRECTORY_TYPE` - `standard` or `ad` (default: `standard`)
    /// - `HOST` (default: `0.0.0.0`), `PORT` (default: 8080)
    /// - `RUST_LOG` (default: `info`)
    /// - `LDIF_PATH`, `LDIF_DEFAULT_BASE` (default: `dc=example,dc=com`),
    ///   `LDIF_CLEAN` (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env if present (development only).
        let _ = dotenvy::dotenv();

        let ldap_host =
            env::var("LDAP_HOST").map_err(|_| ConfigError::MissingVar("LDAP_HOST".to_string()))?;
        let base_dn = env::var("LDAP_BASE_DN")
            .map_err(|_| ConfigError::MissingVar("LDAP_BASE_DN".to_string()))?;
        let bind_dn = env::var("LDAP_BIND_DN")
            .map_err(|_| ConfigError::MissingVar("LDAP_BIND_DN".to_string()))?;

        let mut directory = DirectoryConfig::new(ldap_host, base_dn, bind_dn);

        if parse_bool(&env::var("LDAP_USE_SSL").unwrap_or_default()) {
            directory = directory.with_ssl();
        }
        // An explicit port wins over the scheme default.
        if let Ok(port) = env::var("LDAP_PORT") {
            directory.port = port.parse()?;
        }
        if let Ok(password) = env::var("LDAP_BIND_PASSWORD") {
            directory.bind_password = Some(password);
        }
        if let Ok(container) = env::var("LDAP_USER_CONTAINER") {
            directory.user_container = container;
        }
        if let Ok(container) = env::var("LDAP_GROUP_CONTAINER") {
            directory.group_container = container;
        }

        let directory_type = env::var("DIRECTORY_TYPE").unwrap_or_else(|_| "standard".to_string());
        directory.directory_type =
            directory_type
                .parse::<DirectoryType>()
                .map_err(|e| ConfigError::InvalidValue {
                    var: "DIRECTORY_TYPE".to_string(),
                    message: e.to_string(),
                })?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;
        if port == 0 {
            return Err(ConfigError::InvalidValue {
                var: "PORT".to_string(),
                message: "Port must be between 1 and 65535".to_string(),
            });
        }

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let ldif_path = env::var("LDIF_PATH").ok().map(PathBuf::from);
        let ldif_default_base =
            env::var("LDIF_DEFAULT_BASE").unwrap_or_else(|_| "dc=example,dc=com".to_string());
        let ldif_clean = parse_bool(&env::var("LDIF_CLEAN").unwrap_or_default());

        Ok(Config {
            host,
            port,
            rust_log,
            directory,
            ldif_path,
            ldif_default_base,
            ldif_clean,
        })
    }

    /// The HTTP bind address as a socket address string.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool("YES"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("off"));
    }

    // Env-var-dependent scenarios are consolidated into one test to
    // avoid races when tests run in parallel.
    #[test]
    fn config_from_env() {
        // Scenario 1: missing required variable fails fast.
        env::remove_var("LDAP_HOST");
        env::remove_var("LDAP_BASE_DN");
        env::remove_var("LDAP_BIND_DN");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("LDAP_HOST"));

        // Scenario 2: required variables plus defaults.
        env::set_var("LDAP_HOST", "ldap.example.com");
        env::set_var("LDAP_BASE_DN", "dc=example,dc=com");
        env::set_var("LDAP_BIND_DN", "cn=admin,dc=example,dc=com");
        env::remove_var("LDAP_PORT");
        env::remove_var("DIRECTORY_TYPE");
        env::remove_var("PORT");
        env::remove_var("LDIF_PATH");
        let config = Config::from_env().unwrap();
        assert_eq!(config.directory.port, 389);
        assert_eq!(config.directory.directory_type, DirectoryType::Standard);
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(config.ldif_path.is_none());

        // Scenario 3: overrides, including the AD flavor.
        env::set_var("LDAP_PORT", "10389");
        env::set_var("DIRECTORY_TYPE", "ad");
        env::set_var("LDIF_PATH", "seed.ldif");
        env::set_var("LDIF_CLEAN", "true");
        let config = Config::from_env().unwrap();
        assert_eq!(config.directory.port, 10389);
        assert_eq!(
            config.directory.directory_type,
            DirectoryType::ActiveDirectory
        );
        assert_eq!(config.ldif_path, Some(PathBuf::from("seed.ldif")));
        assert!(config.ldif_clean);

        // Scenario 4: bad directory type is rejected.
        env::set_var("DIRECTORY_TYPE", "novell");
        assert!(Config::from_env().is_err());

        // Clean up.
        for var in [
            "LDAP_HOST",
            "LDAP_BASE_DN",
            "LDAP_BIND_DN",
            "LDAP_PORT",
            "DIRECTORY_TYPE",
            "LDIF_PATH",
            "LDIF_CLEAN",
        ] {
            env::remove_var(var);
        }
    }
}
