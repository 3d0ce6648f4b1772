//! Fetch error types.

use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Empty or malformed caller-supplied argument. Raised before any
    /// network activity.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upstream rejected the credential (HTTP 401).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Credential is valid but lacks the scope for the resource (HTTP 403).
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Transport-level failure: connection refused, DNS, timeout.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Any other non-success response.
    #[error("Upstream error (HTTP {status}): {message}")]
    UpstreamError {
        /// HTTP status returned by the upstream.
        status: u16,
        /// Upstream error text, if any.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Every chunk of a batch failed.
    #[error("All {chunks} chunks of the batch failed")]
    AllChunksFailed {
        /// Number of chunks attempted.
        chunks: usize,
    },

    /// The request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Credential persistence error.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

impl FetchError {
    /// Returns true if this error should reach the user so they can act on
    /// their credential (re-enter or widen its scope).
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            FetchError::AuthenticationFailed(_) | FetchError::AuthorizationDenied(_)
        )
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::NetworkUnavailable(_) => true,
            FetchError::UpstreamError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns the upstream HTTP status, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::AuthenticationFailed(_) => Some(401),
            FetchError::AuthorizationDenied(_) => Some(403),
            FetchError::UpstreamError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        FetchError::NetworkUnavailable(err.to_string())
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::InvalidUrl(err.to_string())
    }
}

// ============================================================================
// Transport Error
// ============================================================================

/// Error raised by a [`crate::host::transport::Transport`] before any HTTP
/// status is available.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Could not connect to the host.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other transport failure.
    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

// ============================================================================
// Credential Error
// ============================================================================

/// Error type for credential persistence.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// System keychain failure.
    #[error("Keychain error: {0}")]
    Keychain(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persisted value could not be decoded.
    #[error("Could not decode persisted credential: {0}")]
    Decode(String),

    /// Any other storage backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoStorageAccess(_) => {
                CredentialError::Keychain("Access denied to keychain".to_string())
            }
            keyring::Error::PlatformFailure(e) => CredentialError::Keychain(e.to_string()),
            keyring::Error::BadEncoding(_) => {
                CredentialError::Decode("Keychain entry is not valid UTF-8".to_string())
            }
            _ => CredentialError::Keychain(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors() {
        assert!(FetchError::AuthenticationFailed("x".into()).is_credential_error());
        assert!(FetchError::AuthorizationDenied("x".into()).is_credential_error());
        assert!(!FetchError::NetworkUnavailable("x".into()).is_credential_error());
    }

    #[test]
    fn test_transient_errors() {
        assert!(FetchError::NetworkUnavailable("down".into()).is_transient());
        assert!(
            FetchError::UpstreamError {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !FetchError::UpstreamError {
                status: 404,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!FetchError::InvalidInput("x".into()).is_transient());
    }

    #[test]
    fn test_status_preserved() {
        let err = FetchError::UpstreamError {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.status(), Some(502));
        assert_eq!(FetchError::AuthenticationFailed(String::new()).status(), Some(401));
        assert_eq!(FetchError::InvalidInput(String::new()).status(), None);
    }

    #[test]
    fn test_keychain_bad_encoding_is_decode_error() {
        let err: CredentialError = keyring::Error::BadEncoding(vec![0xff, 0xfe]).into();
        assert!(matches!(err, CredentialError::Decode(_)));

        let err: CredentialError = keyring::Error::NoStorageAccess("locked".into()).into();
        assert!(matches!(err, CredentialError::Keychain(_)));
    }

    #[test]
    fn test_transport_error_maps_to_network_unavailable() {
        let err: FetchError = TransportError::Connect("refused".into()).into();
        assert!(matches!(err, FetchError::NetworkUnavailable(_)));
    }
}
