use serde::Serialize;
use thiserror::Error;

/// Message returned whenever a cursor fails to decode, regardless of the
/// underlying reason, so clients cannot probe the cursor format.
pub const INVALID_CURSOR_MESSAGE: &str = "Please provide a valid cursor";

/// Message returned both when a resource does not exist and when the
/// principal is not allowed to see it. The two cases are deliberately
/// indistinguishable.
pub const RESOURCE_NOT_AVAILABLE_MESSAGE: &str = "The resource that you are attempting to access \
does not exist or you don't have permission to perform this action";

#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("Failed to build schema: {message}")]
    Build { message: String },
}

/// Errors produced while resolving a field.
///
/// `Clone` is required so a single bulk-fetch failure can be handed to every
/// lazy value registered in the failed wave.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed or contradictory client input. Raised before any backend
    /// call wherever possible.
    #[error("{message}")]
    Argument { message: String },

    /// The resource is missing or the principal may not see it.
    #[error("The resource that you are attempting to access does not exist or you don't have permission to perform this action")]
    ResourceNotAvailable,

    /// Upstream storage or service failure, wrapped with a stable code and
    /// optional provider diagnostics. Never retried at this layer.
    #[error("{message}")]
    Backend {
        message: String,
        code: String,
        extensions: Option<serde_json::Value>,
    },

    /// The request deadline expired while this field was still pending.
    #[error("Timed out while resolving field '{field}'")]
    Timeout { field: String },

    /// Admission control rejected the request before execution.
    #[error("Query has complexity {cost}, which exceeds max complexity of {limit}")]
    TooComplex { cost: usize, limit: usize },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl Error {
    pub fn argument(message: impl Into<String>) -> Self {
        Error::Argument {
            message: message.into(),
        }
    }

    pub fn invalid_cursor() -> Self {
        Error::argument(INVALID_CURSOR_MESSAGE)
    }

    pub fn backend(message: impl Into<String>, code: impl Into<String>) -> Self {
        Error::Backend {
            message: message.into(),
            code: code.into(),
            extensions: None,
        }
    }

    pub fn backend_with_extensions(
        message: impl Into<String>,
        code: impl Into<String>,
        extensions: serde_json::Value,
    ) -> Self {
        Error::Backend {
            message: message.into(),
            code: code.into(),
            extensions: Some(extensions),
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Error::Argument { .. } => "ArgumentError",
            Error::ResourceNotAvailable => "ResourceNotAvailable",
            Error::Backend { .. } => "BackendError",
            Error::Timeout { .. } => "TimeoutError",
            Error::TooComplex { .. } => "QueryComplexityError",
            Error::Schema(_) => "SchemaError",
        }
    }

    /// Wire-format payload: `{error_class, message, extensions?}`. Backend
    /// errors carry their machine-readable `code` inside `extensions`
    /// alongside any provider-specific diagnostic fields.
    pub fn to_payload(&self) -> ErrorPayload {
        let extensions = match self {
            Error::Backend {
                code, extensions, ..
            } => {
                let mut map = match extensions {
                    Some(serde_json::Value::Object(fields)) => fields.clone(),
                    _ => serde_json::Map::new(),
                };
                map.insert("code".into(), serde_json::Value::String(code.clone()));
                Some(serde_json::Value::Object(map))
            }
            _ => None,
        };
        ErrorPayload {
            error_class: self.error_class(),
            message: self.to_string(),
            extensions,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub error_class: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_error_message() {
        let err = Error::argument("Only one of [a, b] arguments is allowed at the same time.");
        assert_eq!(err.error_class(), "ArgumentError");
        assert_eq!(
            err.to_string(),
            "Only one of [a, b] arguments is allowed at the same time."
        );
    }

    #[test]
    fn test_backend_payload_carries_code_and_diagnostics() {
        let err = Error::backend_with_extensions(
            "upstream unavailable",
            "REGISTRY_DOWN",
            serde_json::json!({ "provider": "npm", "attempt": 3 }),
        );
        let payload = err.to_payload();
        assert_eq!(payload.error_class, "BackendError");
        let ext = payload.extensions.unwrap();
        assert_eq!(ext["code"], "REGISTRY_DOWN");
        assert_eq!(ext["provider"], "npm");
        assert_eq!(ext["attempt"], 3);
    }

    #[test]
    fn test_resource_not_available_is_a_fixed_message() {
        let payload = Error::ResourceNotAvailable.to_payload();
        assert_eq!(payload.message, RESOURCE_NOT_AVAILABLE_MESSAGE);
        assert!(payload.extensions.is_none());
    }

    #[test]
    fn test_payload_serializes_without_empty_extensions() {
        let json = serde_json::to_value(Error::invalid_cursor().to_payload()).unwrap();
        assert_eq!(json["message"], INVALID_CURSOR_MESSAGE);
        assert!(json.get("extensions").is_none());
    }
}
