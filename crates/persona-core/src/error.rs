//! Error types for persona-core

use crate::capability::Capability;
use crate::middleware::body_limit::format_size;
use crate::response::{Response, StatusCode};
use crate::store::StoreError;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or running the gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Invalid route path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Same (method, path) registered twice
    #[error("Duplicate route: {method} {path}")]
    DuplicateRoute { method: String, path: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// Configuration loaded but holds an unusable value
    #[error("Invalid configuration value for `{key}`: {message}")]
    InvalidConfig { key: &'static str, message: String },

    /// Store could not be opened or closed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Logging subscriber could not be installed
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-level failures, each mapped to one status code and body.
///
/// Handlers return `Result<Response, ApiError>`; [`ApiError::into_response`]
/// is the single place where failures become HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required field is missing, empty or of the wrong shape
    #[error("{0}")]
    Validation(String),

    /// A lookup or search matched no rows
    #[error("{0}")]
    NotFound(String),

    /// The store rejected the statement
    #[error("{capability} failed: {source}")]
    Store {
        capability: Capability,
        #[source]
        source: StoreError,
    },

    /// Body exceeded the configured limit
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Body was not valid JSON
    #[error("malformed JSON body: {0}")]
    MalformedJson(#[source] serde_json::Error),

    /// Body could not be read from the connection
    #[error("failed to read request body: {0}")]
    BodyRead(String),
}

impl ApiError {
    pub fn store(capability: Capability, source: StoreError) -> Self {
        ApiError::Store { capability, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedJson(_) | ApiError::BodyRead(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller. Store causes stay server-side.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Validation(message) | ApiError::NotFound(message) => message.clone(),
            ApiError::Store { capability, .. } => capability.store_failure_message().to_string(),
            ApiError::PayloadTooLarge { limit } => format!(
                "El cuerpo de la solicitud excede el límite de {}",
                format_size(*limit)
            ),
            ApiError::MalformedJson(_) => "Cuerpo JSON inválido".to_string(),
            ApiError::BodyRead(_) => "No se pudo leer el cuerpo de la solicitud".to_string(),
        }
    }

    /// Convert to the `{error}` JSON envelope, logging store causes
    pub fn into_response(self) -> Response {
        match &self {
            ApiError::Store { capability, source } => {
                tracing::error!(operation = %capability, error = %source, "store operation failed");
            }
            ApiError::MalformedJson(e) => {
                tracing::debug!(error = %e, "rejecting malformed JSON body");
            }
            ApiError::BodyRead(e) => {
                tracing::debug!(error = %e, "rejecting unreadable body");
            }
            _ => {}
        }
        Response::error(self.status(), &self.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 10 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        let store = ApiError::store(
            Capability::Delete,
            StoreError::QueryFailed("Table 'persona' doesn't exist".into()),
        );
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_cause_not_exposed() {
        let err = ApiError::store(
            Capability::Create,
            StoreError::QueryFailed("Duplicate entry '1' for key 'PRIMARY'".into()),
        );
        let res = err.into_response();
        let body = res.body_string().unwrap();
        assert!(body.contains("Error al insertar datos en la base de datos"));
        assert!(!body.contains("Duplicate entry"));
    }

    #[test]
    fn test_error_envelope_is_json() {
        let res = ApiError::Validation("Faltan datos requeridos".into()).into_response();
        assert_eq!(res.content_type(), Some("application/json"));
        let value: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(value["error"], "Faltan datos requeridos");
    }
}
