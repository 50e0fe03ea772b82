//! Directory store error types.

use dirwarden_core::DnError;
use thiserror::Error;

/// Error that can occur while talking to the directory.
///
/// No operation in this crate retries on its own; a failed call is
/// only retried if the caller resubmits the request.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The requested user or group identifier does not resolve.
    #[error("no directory entry found for '{identifier}'")]
    NotFound { identifier: String },

    /// An entry with this identifier already exists (create conflict).
    #[error("directory entry already exists: {identifier}")]
    AlreadyExists { identifier: String },

    /// The directory refused or failed a write.
    #[error("directory write failed: {message}")]
    WriteFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A search could not be completed.
    #[error("directory search failed: {message}")]
    SearchFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to establish or keep a connection to the server.
    #[error("directory connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The bind credentials were rejected.
    #[error("authentication failed: invalid bind credentials")]
    AuthenticationFailed,

    /// The store configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// A DN failed to parse or does not share the configured base path.
    /// Fatal for the request; not retried.
    #[error(transparent)]
    Conversion(#[from] DnError),
}

impl DirectoryError {
    /// Create a not-found error for the given identifier.
    pub fn not_found(identifier: impl Into<String>) -> Self {
        DirectoryError::NotFound {
            identifier: identifier.into(),
        }
    }

    /// Create a write-failed error.
    pub fn write_failed(message: impl Into<String>) -> Self {
        DirectoryError::WriteFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a write-failed error with the underlying cause.
    pub fn write_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::WriteFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a search-failed error.
    pub fn search_failed(message: impl Into<String>) -> Self {
        DirectoryError::SearchFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a search-failed error with the underlying cause.
    pub fn search_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::SearchFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a connection-failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection-failed error with the underlying cause.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        DirectoryError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// True when the error means the target entry does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NotFound { .. })
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use dirwarden_core::Dn;

    #[test]
    fn display_messages() {
        assert_eq!(
            DirectoryError::not_found("cn=missing,ou=people").to_string(),
            "no directory entry found for 'cn=missing,ou=people'"
        );
        assert_eq!(
            DirectoryError::write_failed("server busy").to_string(),
            "directory write failed: server busy"
        );
        assert_eq!(
            DirectoryError::AuthenticationFailed.to_string(),
            "authentication failed: invalid bind credentials"
        );
    }

    #[test]
    fn conversion_wraps_dn_error() {
        let dn_err = Dn::parse("not-a-dn").unwrap_err();
        let err = DirectoryError::from(dn_err);
        assert!(matches!(err, DirectoryError::Conversion(_)));
        assert!(err.to_string().contains("malformed DN"));
    }

    #[test]
    fn write_failed_keeps_source() {
        let io = std::io::Error::other("broken pipe");
        let err = DirectoryError::write_failed_with_source("persist failed", io);
        if let DirectoryError::WriteFailed { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("expected WriteFailed");
        }
    }

    #[test]
    fn is_not_found_only_for_not_found() {
        assert!(DirectoryError::not_found("x").is_not_found());
        assert!(!DirectoryError::write_failed("x").is_not_found());
    }
}
