//! Directory connection configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};
use crate::types::DirectoryType;

/// Configuration for the directory connection and entry layout.
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory server hostname or IP address.
    pub host: String,

    /// Server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Use LDAPS.
    #[serde(default)]
    pub use_ssl: bool,

    /// Base DN all relative identifiers are scoped under
    /// (e.g. `dc=example,dc=com`).
    pub base_dn: String,

    /// Bind DN for authentication.
    pub bind_dn: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// User container, relative to `base_dn` (e.g. `ou=people`).
    #[serde(default = "default_user_container")]
    pub user_container: String,

    /// Group container, relative to `base_dn` (e.g. `ou=groups`).
    #[serde(default = "default_group_container")]
    pub group_container: String,

    /// Which directory product's write semantics apply.
    #[serde(default = "default_directory_type")]
    pub directory_type: DirectoryType,

    /// Connection timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub connection_timeout_secs: u64,
}

fn default_port() -> u16 {
    389
}

fn default_user_container() -> String {
    "ou=people".to_string()
}

fn default_group_container() -> String {
    "ou=groups".to_string()
}

fn default_directory_type() -> DirectoryType {
    DirectoryType::Standard
}

fn default_timeout_secs() -> u64 {
    10
}

impl DirectoryConfig {
    /// Create a config with required fields and defaults for the rest.
    pub fn new(
        host: impl Into<String>,
        base_dn: impl Into<String>,
        bind_dn: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            use_ssl: false,
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            user_container: default_user_container(),
            group_container: default_group_container(),
            directory_type: default_directory_type(),
            connection_timeout_secs: default_timeout_secs(),
        }
    }

    /// Set the bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Enable LDAPS and switch to port 636.
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the user container (relative to the base DN).
    pub fn with_user_container(mut self, container: impl Into<String>) -> Self {
        self.user_container = container.into();
        self
    }

    /// Set the group container (relative to the base DN).
    pub fn with_group_container(mut self, container: impl Into<String>) -> Self {
        self.group_container = container.into();
        self
    }

    /// Set the directory flavor.
    #[must_use]
    pub fn with_directory_type(mut self, directory_type: DirectoryType) -> Self {
        self.directory_type = directory_type;
        self
    }

    /// The server URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Absolute DN of the user container.
    #[must_use]
    pub fn user_base_dn(&self) -> String {
        format!("{},{}", self.user_container, self.base_dn)
    }

    /// Absolute DN of the group container.
    #[must_use]
    pub fn group_base_dn(&self) -> String {
        format!("{},{}", self.group_container, self.base_dn)
    }

    /// Validate required fields.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.host.is_empty() {
            return Err(DirectoryError::invalid_configuration("host is required"));
        }
        if self.base_dn.is_empty() {
            return Err(DirectoryError::invalid_configuration("base_dn is required"));
        }
        if self.bind_dn.is_empty() {
            return Err(DirectoryError::invalid_configuration("bind_dn is required"));
        }
        if self.user_container.is_empty() || self.group_container.is_empty() {
            return Err(DirectoryError::invalid_configuration(
                "user_container and group_container are required",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("user_container", &self.user_container)
            .field("group_container", &self.group_container)
            .field("directory_type", &self.directory_type)
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> DirectoryConfig {
        DirectoryConfig::new(
            "ldap.example.com",
            "dc=example,dc=com",
            "cn=admin,dc=example,dc=com",
        )
    }

    #[test]
    fn defaults() {
        let config = base_config();
        assert_eq!(config.port, 389);
        assert!(!config.use_ssl);
        assert_eq!(config.user_container, "ou=people");
        assert_eq!(config.group_container, "ou=groups");
        assert_eq!(config.directory_type, DirectoryType::Standard);
    }

    #[test]
    fn ssl_switches_port() {
        let config = base_config().with_ssl();
        assert!(config.use_ssl);
        assert_eq!(config.port, 636);
        assert_eq!(config.url(), "ldaps://ldap.example.com:636");
    }

    #[test]
    fn container_dns() {
        let config = base_config()
            .with_user_container("ou=staff")
            .with_group_container("ou=teams");
        assert_eq!(config.user_base_dn(), "ou=staff,dc=example,dc=com");
        assert_eq!(config.group_base_dn(), "ou=teams,dc=example,dc=com");
    }

    #[test]
    fn validation_catches_missing_fields() {
        assert!(base_config().validate().is_ok());

        let mut config = base_config();
        config.host = String::new();
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.base_dn = String::new();
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.bind_dn = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let config = base_config().with_password("hunter2");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("***REDACTED***"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn serde_round_trip() {
        let config = base_config()
            .with_password("secret")
            .with_directory_type(DirectoryType::ActiveDirectory);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: DirectoryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.host, "ldap.example.com");
        assert_eq!(parsed.directory_type, DirectoryType::ActiveDirectory);
    }
}
