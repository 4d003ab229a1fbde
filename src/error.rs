//! Error types for the UCMDB provider.

use thiserror::Error;

use crate::client::ClientError;

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider configuration is missing or invalid (environment variables, `target_env`).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A resource or data source operation ran before `configure`.
    #[error("Provider not configured: call configure before using resources or data sources")]
    NotConfigured,

    /// The UCMDB client returned an error. Its message is surfaced verbatim.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A field on a server response or state document was missing or had the wrong type.
    #[error("Type mismatch for '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Name of the offending field.
        field: String,
        /// The type that was required.
        expected: &'static str,
        /// What was actually found.
        actual: &'static str,
    },

    /// A create response matched none of the added/updated/ignored shapes.
    #[error("create resource ci failed: {0}")]
    AmbiguousCreate(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Binding or inspecting the server socket failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Build a [`ProviderError::TypeMismatch`] from the JSON value that was found.
    pub fn type_mismatch(
        field: impl Into<String>,
        expected: &'static str,
        found: Option<&serde_json::Value>,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
            actual: found.map(json_type_name).unwrap_or("nothing"),
        }
    }
}

/// Name of a JSON value's type, as used in diagnostics.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;

    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_display() {
        let err = ProviderError::Configuration("missing UCMDB_CMS_ADDRESS".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: missing UCMDB_CMS_ADDRESS"
        );

        let err = ProviderError::UnknownResource("custom_resource".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: custom_resource");

        let err = ProviderError::AmbiguousCreate("added=0 updated=0 ignored=2".to_string());
        assert_eq!(
            format!("{}", err),
            "create resource ci failed: added=0 updated=0 ignored=2"
        );
    }

    #[test]
    fn test_client_error_is_transparent() {
        let err: ProviderError = ClientError::NotFound("/rest-api/dataModel/ci/abc".into()).into();
        assert_eq!(
            err.to_string(),
            ClientError::NotFound("/rest-api/dataModel/ci/abc".into()).to_string()
        );
    }

    #[test]
    fn test_type_mismatch() {
        let err = ProviderError::type_mismatch("name", "string", Some(&json!(42)));
        assert_eq!(
            err.to_string(),
            "Type mismatch for 'name': expected string, got number"
        );

        let err = ProviderError::type_mismatch("description", "string", None);
        assert_eq!(
            err.to_string(),
            "Type mismatch for 'description': expected string, got nothing"
        );
    }
}
