//! ldap3-backed store implementations.
//!
//! A single [`LdapHandle`] owns the lazily-bound connection; the user
//! and group repositories clone it (the underlying `Ldap` handle is
//! cheap to clone) and share the one session.

mod groups;
mod users;

pub use groups::LdapGroupRepo;
pub use users::LdapUserRepo;

use std::sync::Arc;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, SearchEntry};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::DirectoryConfig;
use crate::error::{DirectoryError, DirectoryResult};

/// LDAP result code: no such object.
const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code: invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: entry already exists.
const RC_ENTRY_ALREADY_EXISTS: u32 = 68;

/// A lazily-bound, cached connection to the directory server.
#[derive(Clone)]
pub struct LdapHandle {
    config: Arc<DirectoryConfig>,
    connection: Arc<RwLock<Option<Ldap>>>,
}

impl LdapHandle {
    /// Create a handle over a validated configuration. No connection
    /// is opened until the first operation needs one.
    pub fn new(config: DirectoryConfig) -> DirectoryResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            connection: Arc::new(RwLock::new(None)),
        })
    }

    /// The connection configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Get the shared connection, binding on first use.
    pub async fn get(&self) -> DirectoryResult<Ldap> {
        {
            let guard = self.connection.read().await;
            if let Some(ref ldap) = *guard {
                return Ok(ldap.clone());
            }
        }

        let ldap = self.connect().await?;

        {
            let mut guard = self.connection.write().await;
            *guard = Some(ldap.clone());
        }

        Ok(ldap)
    }

    /// Open a connection and perform the simple bind.
    async fn connect(&self) -> DirectoryResult<Ldap> {
        let url = self.config.url();
        debug!(url = %url, "connecting to directory server");

        let settings = LdapConnSettings::new().set_conn_timeout(std::time::Duration::from_secs(
            self.config.connection_timeout_secs,
        ));

        let (conn, mut ldap) =
            LdapConnAsync::with_settings(settings, &url)
                .await
                .map_err(|e| {
                    DirectoryError::connection_failed_with_source(
                        format!("failed to connect to {url}"),
                        e,
                    )
                })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "performing simple bind");

        let result = ldap.simple_bind(bind_dn, bind_password).await.map_err(|e| {
            DirectoryError::connection_failed_with_source(format!("bind failed for {bind_dn}"), e)
        })?;

        if result.rc == RC_INVALID_CREDENTIALS {
            return Err(DirectoryError::AuthenticationFailed);
        }
        if result.rc != 0 {
            return Err(DirectoryError::connection_failed(format!(
                "bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(host = %self.config.host, "directory connection established");
        Ok(ldap)
    }

    /// Drop the cached connection, unbinding politely.
    pub async fn unbind(&self) {
        let mut guard = self.connection.write().await;
        if let Some(mut ldap) = guard.take() {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "error during LDAP unbind");
            }
        }
    }
}

impl std::fmt::Debug for LdapHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapHandle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Escape special characters in LDAP filter values (RFC 4515).
pub(crate) fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

/// Map a write result code onto the error taxonomy.
pub(crate) fn check_result(
    operation: &str,
    identifier: &str,
    rc: u32,
    text: &str,
) -> DirectoryResult<()> {
    match rc {
        0 => Ok(()),
        RC_NO_SUCH_OBJECT => Err(DirectoryError::not_found(identifier)),
        RC_ENTRY_ALREADY_EXISTS => Err(DirectoryError::AlreadyExists {
            identifier: identifier.to_string(),
        }),
        RC_INVALID_CREDENTIALS => Err(DirectoryError::AuthenticationFailed),
        rc => Err(DirectoryError::write_failed(format!(
            "LDAP {operation} on '{identifier}' failed with code {rc}: {text}"
        ))),
    }
}

/// Map a search error, distinguishing a missing search base from
/// other failures.
pub(crate) fn map_search_err(identifier: &str, err: LdapError) -> DirectoryError {
    match err {
        LdapError::LdapResult { result } if result.rc == RC_NO_SUCH_OBJECT => {
            DirectoryError::not_found(identifier)
        }
        other => DirectoryError::search_failed_with_source(
            format!("search for '{identifier}' failed"),
            other,
        ),
    }
}

/// First value of the named attribute, empty string when absent.
/// Attribute names are matched ASCII-case-insensitively (RFC 4512).
pub(crate) fn first_attr(entry: &SearchEntry, name: &str) -> String {
    entry
        .attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .cloned()
        .unwrap_or_default()
}

/// All values of the named attribute.
pub(crate) fn all_attrs<'a>(entry: &'a SearchEntry, name: &str) -> &'a [String] {
    entry
        .attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values.as_slice())
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_escaping() {
        assert_eq!(escape_filter_value("plain"), "plain");
        assert_eq!(escape_filter_value("a*b"), "a\\2ab");
        assert_eq!(escape_filter_value("(cn=x)"), "\\28cn=x\\29");
        assert_eq!(escape_filter_value("back\\slash"), "back\\5cslash");
    }

    #[test]
    fn result_code_mapping() {
        assert!(check_result("modify", "cn=x", 0, "").is_ok());
        assert!(matches!(
            check_result("modify", "cn=x", 32, "no such object"),
            Err(DirectoryError::NotFound { .. })
        ));
        assert!(matches!(
            check_result("add", "cn=x", 68, "already exists"),
            Err(DirectoryError::AlreadyExists { .. })
        ));
        assert!(matches!(
            check_result("bind", "cn=x", 49, ""),
            Err(DirectoryError::AuthenticationFailed)
        ));
        let err = check_result("modify", "cn=x", 50, "insufficient access").unwrap_err();
        assert!(err.to_string().contains("code 50"));
    }

    #[test]
    fn handle_rejects_invalid_config() {
        let config = DirectoryConfig::new("", "dc=example,dc=com", "cn=admin,dc=example,dc=com");
        assert!(LdapHandle::new(config).is_err());
    }
}
