//! HTTP Request types

use crate::{Error, Result};
use smallvec::SmallVec;

/// HTTP Methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Connect,
    Trace,
}

impl Method {
    /// Parse from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "CONNECT" => Ok(Method::Connect),
            "TRACE" => Ok(Method::Trace),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP Request
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Request headers
    pub headers: SmallVec<[(String, String); 16]>,
    /// Request body, fully buffered
    pub body: bytes::Bytes,
    /// Correlation id, set by the request-id middleware
    pub request_id: Option<String>,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: SmallVec::new(),
            body: bytes::Bytes::new(),
            request_id: None,
        }
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get content-type header
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// True when the media type is `application/json`, ignoring case and
    /// parameters such as `charset`
    pub fn is_json(&self) -> bool {
        self.content_type()
            .and_then(|ct| ct.split(';').next())
            .map(|media| media.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false)
    }

    /// Parse the body as a JSON object.
    ///
    /// A body not declared as `application/json` is not parsed. Like an empty
    /// body or a JSON value that is not an object, it yields an empty map so
    /// that presence validation reports the missing fields. Only a JSON body
    /// that does not parse is rejected.
    pub fn json_object(
        &self,
    ) -> std::result::Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
        if !self.is_json() || self.body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_slice::<serde_json::Value>(&self.body)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Ok(serde_json::Map::new()),
        }
    }
}

/// Builder for constructing requests
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Create a new builder
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request: Request::new(method, path),
        }
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((name.into(), value.into()));
        self
    }

    /// Set body
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.request.body = body.into();
        self
    }

    /// Set a JSON body and matching content-type
    pub fn json(self, value: &serde_json::Value) -> Self {
        let body = value.to_string();
        self.header("content-type", "application/json").body(body)
    }

    /// Build the request
    pub fn build(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::from_str("GET").unwrap(), Method::Get);
        assert_eq!(Method::from_str("post").unwrap(), Method::Post);
        assert!(Method::from_str("PROPFIND").is_err());
    }

    #[test]
    fn test_request_header() {
        let req = RequestBuilder::new(Method::Get, "/")
            .header("Content-Type", "application/json")
            .build();

        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_json_object_body() {
        let req = RequestBuilder::new(Method::Post, "/seleccionar-datos")
            .json(&json!({ "cedula": "0102030405" }))
            .build();
        let map = req.json_object().unwrap();
        assert_eq!(map["cedula"], "0102030405");
    }

    #[test]
    fn test_non_object_bodies_are_empty() {
        let empty = RequestBuilder::new(Method::Post, "/")
            .header("Content-Type", "application/json")
            .build();
        assert!(empty.json_object().unwrap().is_empty());

        let array = RequestBuilder::new(Method::Post, "/").json(&json!([1, 2])).build();
        assert!(array.json_object().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_body_rejected() {
        let req = RequestBuilder::new(Method::Post, "/")
            .header("Content-Type", "application/json")
            .body("{\"cedula\":")
            .build();
        assert!(req.json_object().is_err());
    }

    #[test]
    fn test_body_parsed_only_when_declared_json() {
        let body = r#"{"cedula": "0102030405"}"#;

        let plain = RequestBuilder::new(Method::Post, "/")
            .header("Content-Type", "text/plain")
            .body(body)
            .build();
        assert!(!plain.is_json());
        assert!(plain.json_object().unwrap().is_empty());

        let undeclared = RequestBuilder::new(Method::Post, "/").body(body).build();
        assert!(undeclared.json_object().unwrap().is_empty());

        // Not parsed, so not malformed either
        let form = RequestBuilder::new(Method::Post, "/")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("cedula=0102030405")
            .build();
        assert!(form.json_object().unwrap().is_empty());

        let charset = RequestBuilder::new(Method::Post, "/")
            .header("Content-Type", "Application/JSON; charset=utf-8")
            .body(body)
            .build();
        assert!(charset.is_json());
        assert_eq!(charset.json_object().unwrap()["cedula"], "0102030405");
    }
}
