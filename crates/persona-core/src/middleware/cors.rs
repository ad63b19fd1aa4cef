//! CORS (Cross-Origin Resource Sharing) middleware
//!
//! Stamps the configured CORS headers on every response, whether or not the
//! request carried an `Origin`. Preflights are answered by the app, which
//! knows whether the path is routed.

use super::Middleware;
use crate::{Method, Request, Response};
use smallvec::SmallVec;

const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";

/// CORS configuration
#[derive(Clone)]
pub struct CorsConfig {
    /// Allowed origin value (`*` for any)
    pub origin: String,
    /// Allowed methods
    pub methods: SmallVec<[Method; 8]>,
    /// Allowed request headers
    pub headers: SmallVec<[String; 4]>,
    /// Allow credentials
    pub credentials: bool,
    /// Max age (seconds); omitted when unset
    pub max_age: Option<u32>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: "*".to_string(),
            methods: smallvec::smallvec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Options,
            ],
            headers: smallvec::smallvec!["Content-Type".to_string(), "Authorization".to_string()],
            credentials: true,
            max_age: None,
        }
    }
}

/// CORS middleware
pub struct Cors {
    config: CorsConfig,
    methods: String,
    headers: String,
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        let methods = config
            .methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let headers = config.headers.join(", ");
        Self {
            config,
            methods,
            headers,
        }
    }

    /// Any origin, the gateway's method and header set, credentials allowed
    pub fn permissive() -> Self {
        Self::new(CorsConfig::default())
    }

    /// Add the CORS headers unless a previous pass already did
    pub fn add_cors_headers(&self, res: &mut Response) {
        if res.has_header(ALLOW_ORIGIN) {
            return;
        }
        res.headers
            .push((ALLOW_ORIGIN.to_string(), self.config.origin.clone()));
        res.headers.push((
            "Access-Control-Allow-Methods".to_string(),
            self.methods.clone(),
        ));
        if !self.headers.is_empty() {
            res.headers.push((
                "Access-Control-Allow-Headers".to_string(),
                self.headers.clone(),
            ));
        }
        if self.config.credentials {
            res.headers.push((
                "Access-Control-Allow-Credentials".to_string(),
                "true".to_string(),
            ));
        }
        if let Some(max_age) = self.config.max_age {
            res.headers
                .push(("Access-Control-Max-Age".to_string(), max_age.to_string()));
        }
    }
}

impl Middleware for Cors {
    fn before(&self, _req: &mut Request) -> Option<Response> {
        None
    }

    fn after(&self, _req: &Request, res: &mut Response) {
        self.add_cors_headers(res);
    }
}
