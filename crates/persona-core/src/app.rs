//! Application: route table, middleware and shared state
//!
//! [`App::handle`] is the full request path minus the socket. The server
//! feeds it buffered requests; tests call it directly.

use crate::age::{Clock, SystemClock};
use crate::capability::{Capability, Route};
use crate::config::{Config, NotFoundFormat};
use crate::error::ApiError;
use crate::handlers::{self, NOT_FOUND_TEXT};
use crate::middleware::{body_limit::DEFAULT_LIMIT, Cors, MiddlewareChain, RequestId};
use crate::request::{Method, Request};
use crate::response::{Response, StatusCode};
use crate::router::Router;
use crate::store::PersonaStore;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;

/// Handles shared by every request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PersonaStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(store: Arc<dyn PersonaStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

pub struct App {
    router: Router<Route>,
    middleware: MiddlewareChain,
    state: AppState,
    not_found: NotFoundFormat,
    body_limit: usize,
}

impl App {
    /// App with default settings
    pub fn new(state: AppState) -> Result<Self> {
        Ok(Self {
            router: routes()?,
            middleware: default_middleware(),
            state,
            not_found: NotFoundFormat::default(),
            body_limit: DEFAULT_LIMIT,
        })
    }

    pub fn from_config(config: &Config, state: AppState) -> Result<Self> {
        Ok(Self::new(state)?
            .not_found_format(config.not_found_format)
            .body_limit(config.body_limit_bytes()?))
    }

    pub fn not_found_format(mut self, format: NotFoundFormat) -> Self {
        self.not_found = format;
        self
    }

    /// Maximum accepted body, in bytes
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn max_body_size(&self) -> usize {
        self.body_limit
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> &Router<Route> {
        &self.router
    }

    /// Run a request through middleware and dispatch
    pub async fn handle(&self, mut req: Request) -> Response {
        let started = Instant::now();

        let mut res = match self.middleware.run_before(&mut req) {
            Some(early) => early,
            None => self.dispatch(&req).await,
        };
        self.middleware.run_after(&req, &mut res);

        log_completion(&req, &res, started);
        res
    }

    /// Answer a request that failed before it could be dispatched, e.g. a
    /// body that could not be read. Middleware still runs so the response
    /// carries CORS headers and a request id.
    pub fn reject(&self, mut req: Request, err: ApiError) -> Response {
        let started = Instant::now();

        // Only the request id matters here
        let _ = self.middleware.run_before(&mut req);
        let mut res = err.into_response();
        self.middleware.run_after(&req, &mut res);

        log_completion(&req, &res, started);
        res
    }

    async fn dispatch(&self, req: &Request) -> Response {
        // Preflight for a routed path; CORS headers are added on the way out
        if req.method == Method::Options {
            return if self.router.has_path(&req.path) {
                Response::new(StatusCode::NO_CONTENT)
            } else {
                self.fallback()
            };
        }

        let route = match self.router.match_route(req.method, &req.path) {
            Some(route) => route,
            None => return self.fallback(),
        };

        match route {
            Route::Welcome => handlers::welcome(),
            Route::Persona(capability) => {
                if req.body.len() > self.body_limit {
                    return ApiError::PayloadTooLarge {
                        limit: self.body_limit,
                    }
                    .into_response();
                }
                handlers::persona::handle(capability, &self.state, req)
                    .await
                    .unwrap_or_else(ApiError::into_response)
            }
        }
    }

    fn fallback(&self) -> Response {
        match self.not_found {
            NotFoundFormat::Text => Response::text(StatusCode::NOT_FOUND, NOT_FOUND_TEXT),
            NotFoundFormat::Json => Response::error(StatusCode::NOT_FOUND, NOT_FOUND_TEXT),
        }
    }
}

fn routes() -> Result<Router<Route>> {
    let mut router = Router::new();
    router.get("/", Route::Welcome)?;
    for capability in Capability::ALL {
        router.route(capability.method(), capability.path(), Route::Persona(capability))?;
    }
    Ok(router)
}

fn default_middleware() -> MiddlewareChain {
    let mut chain = MiddlewareChain::new();
    chain.add(RequestId::default());
    chain.add(Cors::permissive());
    chain
}

fn log_completion(req: &Request, res: &Response, started: Instant) {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let request_id = req.request_id.as_deref().unwrap_or("-");
    if res.status.is_server_error() {
        tracing::warn!(
            request_id,
            method = %req.method,
            path = %req.path,
            status = res.status.as_u16(),
            elapsed_ms,
            "request failed"
        );
    } else {
        tracing::info!(
            request_id,
            method = %req.method,
            path = %req.path,
            status = res.status.as_u16(),
            elapsed_ms,
            "request completed"
        );
    }
}
