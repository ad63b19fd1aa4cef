//! Request correlation ids
//!
//! Propagates an incoming `X-Request-ID` or assigns a fresh one, and echoes it
//! on the response so log lines can be matched to client reports.

use super::Middleware;
use crate::{Request, Response};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_HEADER: &str = "X-Request-ID";

/// Longest incoming id that is propagated as-is
const MAX_INCOMING_LEN: usize = 128;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a process-unique id: seconds since epoch plus a sequence number
pub fn generate_request_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:06x}", secs, seq)
}

/// Request-id middleware
pub struct RequestId {
    header_name: String,
}

impl RequestId {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER)
    }
}

impl Middleware for RequestId {
    fn before(&self, req: &mut Request) -> Option<Response> {
        let id = req
            .header(&self.header_name)
            .filter(|v| !v.is_empty() && v.len() <= MAX_INCOMING_LEN)
            .map(|v| v.to_string())
            .unwrap_or_else(generate_request_id);
        req.request_id = Some(id);
        None
    }

    fn after(&self, req: &Request, res: &mut Response) {
        if let Some(id) = &req.request_id {
            res.headers.push((self.header_name.clone(), id.clone()));
        }
    }
}
