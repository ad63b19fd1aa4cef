//! Native HTTP server
//!
//! hyper HTTP/1.1 connections on tokio:
//! - listener built with socket2 (SO_REUSEADDR, TCP_NODELAY)
//! - bodies buffered up to the app's limit before dispatch
//! - connection tracking for graceful shutdown

use crate::error::ApiError;
use crate::response::StatusCode;
use crate::{App, Method, Request, Response, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Upper bound on waiting for in-flight connections at shutdown
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            drain_timeout: crate::config::DRAIN_TIMEOUT,
        }
    }
}

/// Tracks active connections for graceful shutdown
#[derive(Debug)]
pub struct ConnectionTracker {
    active: AtomicU64,
    shutting_down: AtomicBool,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            active: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn increment(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    #[inline]
    pub fn decrement(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Current active connection count
    #[inline]
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop admitting new connections
    pub fn start_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

pub struct Server {
    app: Arc<App>,
    config: ServerConfig,
    tracker: Arc<ConnectionTracker>,
    shutdown_tx: watch::Sender<bool>,
}

impl Server {
    pub fn new(app: Arc<App>, config: ServerConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            app,
            config,
            tracker: Arc::new(ConnectionTracker::new()),
            shutdown_tx,
        }
    }

    pub fn tracker(&self) -> Arc<ConnectionTracker> {
        self.tracker.clone()
    }

    /// Bind the configured address. Must be called inside a tokio runtime.
    pub fn bind(&self) -> Result<TcpListener> {
        let socket = create_optimized_socket(&self.config.addr)?;
        let listener = TcpListener::from_std(socket.into())?;
        Ok(listener)
    }

    /// Bind, then serve until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind()?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve an already bound listener until `shutdown` resolves, then drain
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, store = self.app.state().store.kind(), "listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    self.tracker.start_shutdown();
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            if self.tracker.is_shutting_down() {
                                drop(stream);
                                continue;
                            }
                            self.spawn_connection(stream, peer);
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "accept failed");
                        }
                    }
                }
            }
        }
        drop(listener);

        let active = self.tracker.count();
        tracing::info!(active, "shutting down, draining connections");
        // Ask idle keep-alive connections to close after their current exchange
        let _ = self.shutdown_tx.send(true);

        if self.drain().await {
            tracing::info!("all connections drained");
        } else {
            tracing::warn!(
                remaining = self.tracker.count(),
                timeout_ms = self.config.drain_timeout.as_millis() as u64,
                "drain timeout reached"
            );
        }
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let app = self.app.clone();
        let tracker = self.tracker.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tracker.increment();

        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let app = app.clone();
                async move { handle_request(app, req).await }
            });

            let conn = http1::Builder::new().serve_connection(io, service);
            tokio::pin!(conn);

            let result = tokio::select! {
                res = conn.as_mut() => res,
                _ = shutdown_rx.changed() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            };
            if let Err(e) = result {
                tracing::debug!(%peer, error = %e, "connection error");
            }

            tracker.decrement();
        });
    }

    /// Wait for active connections, up to the drain timeout
    async fn drain(&self) -> bool {
        let start = Instant::now();
        loop {
            if self.tracker.count() == 0 {
                return true;
            }
            if start.elapsed() >= self.config.drain_timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Buffer the body and run the request through the app
async fn handle_request(
    app: Arc<App>,
    req: hyper::Request<Incoming>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let method = match Method::from_str(parts.method.as_str()) {
        Ok(method) => method,
        Err(_) => {
            tracing::debug!(method = %parts.method, "unsupported method");
            let res = Response::text(StatusCode::NOT_IMPLEMENTED, "Not Implemented");
            return Ok(to_hyper_response(res));
        }
    };
    let mut request = from_hyper_parts(method, &parts);

    let limit = app.max_body_size();
    let res = match Limited::new(body, limit).collect().await {
        Ok(collected) => {
            request.body = collected.to_bytes();
            app.handle(request).await
        }
        Err(e) => {
            let err = if e.downcast_ref::<LengthLimitError>().is_some() {
                ApiError::PayloadTooLarge { limit }
            } else {
                ApiError::BodyRead(e.to_string())
            };
            app.reject(request, err)
        }
    };

    Ok(to_hyper_response(res))
}

/// Create a TCP listening socket with low-latency options
pub fn create_optimized_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    // tokio requires a non-blocking socket
    socket.set_nonblocking(true)?;

    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

/// Copy the request head into our Request type. The body is filled in later.
pub fn from_hyper_parts(method: Method, parts: &http::request::Parts) -> Request {
    let mut request = Request::new(method, parts.uri.path());

    for (name, value) in &parts.headers {
        if let Ok(v) = value.to_str() {
            request.headers.push((name.to_string(), v.to_string()));
        }
    }

    request
}

/// Convert our Response to a hyper Response
pub fn to_hyper_response(res: Response) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(res.status.as_u16());

    for (name, value) in &res.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder.body(Full::new(res.body)).unwrap_or_else(|e| {
        tracing::error!(error = %e, "invalid response head");
        let mut fallback = hyper::Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
