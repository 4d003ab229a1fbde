//! Error types for the UCMDB REST client.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to UCMDB.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured address is not a usable base URL.
    #[error("Invalid UCMDB address '{address}': {reason}")]
    InvalidUrl {
        /// The address as configured.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration item id that cannot name a single path segment.
    #[error("Invalid configuration item id '{0}'")]
    InvalidId(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The authenticate call was rejected or returned no token.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The session token was rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested configuration item does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("API error ({status}) at {url}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
        /// Truncated response body.
        message: String,
    },

    /// A success response whose body could not be decoded.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Check if this error indicates an authentication failure.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthFailed(_) | Self::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Api {
            status: 500,
            url: "https://ucmdb:8443/rest-api/topologyQuery".into(),
            message: "boom".into(),
        };
        assert_eq!(
            err.to_string(),
            "API error (500) at https://ucmdb:8443/rest-api/topologyQuery: boom"
        );
    }

    #[test]
    fn test_is_auth_error() {
        assert!(ClientError::AuthFailed("bad password".into()).is_auth_error());
        assert!(ClientError::Unauthorized("expired".into()).is_auth_error());
        assert!(!ClientError::NotFound("ci".into()).is_auth_error());
    }
}
