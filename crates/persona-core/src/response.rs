//! HTTP Response types

use serde::Serialize;
use smallvec::SmallVec;

/// HTTP Status Code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    // 2xx Success
    pub const OK: StatusCode = StatusCode(200);
    pub const NO_CONTENT: StatusCode = StatusCode(204);

    // 4xx Client Errors
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const PAYLOAD_TOO_LARGE: StatusCode = StatusCode(413);

    // 5xx Server Errors
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);

    /// Get the numeric code
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Get the reason phrase
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            204 => "No Content",
            400 => "Bad Request",
            404 => "Not Found",
            413 => "Payload Too Large",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            _ => "Unknown",
        }
    }

    /// Check if this is a server error status (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// `{ "error": ... }` envelope shared by every JSON failure
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// HTTP Response
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Response headers (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 8]>,
    /// Response body
    pub body: bytes::Bytes,
}

impl Response {
    /// Create a new response
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: SmallVec::new(),
            body: bytes::Bytes::new(),
        }
    }

    /// Create a 200 OK response
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Serialize `value` as a JSON response.
    ///
    /// Serialization failure degrades to a 500 with the error envelope.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => ResponseBuilder::new(status)
                .header("content-type", JSON)
                .body(body)
                .build(),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response body");
                Self::error(StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor")
            }
        }
    }

    /// `{error}` JSON response
    pub fn error(status: StatusCode, message: &str) -> Self {
        // A struct of one &str cannot fail to serialize
        let body = serde_json::to_vec(&ErrorBody { error: message }).unwrap_or_default();
        ResponseBuilder::new(status)
            .header("content-type", JSON)
            .body(body)
            .build()
    }

    /// Create a text response
    pub fn text(status: StatusCode, body: impl Into<bytes::Bytes>) -> Self {
        ResponseBuilder::new(status)
            .header("content-type", TEXT)
            .body(body)
            .build()
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether a header is already set
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Get content-type header
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get body as string (if UTF-8)
    pub fn body_string(&self) -> Option<String> {
        std::str::from_utf8(&self.body).ok().map(|s| s.to_string())
    }

    /// Parse the body as JSON
    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Builder for constructing responses
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Create a new builder
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response::new(status),
        }
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.headers.push((name.into(), value.into()));
        self
    }

    /// Set body
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.response.body = body.into();
        self
    }

    /// Build the response
    pub fn build(self) -> Response {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_code() {
        assert!(StatusCode::INTERNAL_SERVER_ERROR.is_server_error());
        assert!(!StatusCode::PAYLOAD_TOO_LARGE.is_server_error());
        assert_eq!(StatusCode::PAYLOAD_TOO_LARGE.to_string(), "413 Payload Too Large");
    }

    #[test]
    fn test_response_json() {
        let res = Response::json(StatusCode::OK, &json!({ "message": "ok" }));
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.content_type(), Some("application/json"));
        assert_eq!(res.body_json().unwrap()["message"], "ok");
    }

    #[test]
    fn test_response_error_envelope() {
        let res = Response::error(StatusCode::NOT_FOUND, "No se encontró ninguna persona con ese CI");
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(
            res.body_string().unwrap(),
            r#"{"error":"No se encontró ninguna persona con ese CI"}"#
        );
    }

    #[test]
    fn test_response_text() {
        let res = Response::text(StatusCode::NOT_FOUND, "Página no encontrada");
        assert_eq!(res.content_type(), Some("text/plain; charset=utf-8"));
        assert!(res.body_json().is_none());
    }
}
