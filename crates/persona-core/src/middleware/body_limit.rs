//! Body size limit
//!
//! The limit is enforced while the server buffers the body; this module
//! holds its configuration and the human-readable size helpers.

/// Default limit, matching common JSON body-parser defaults
pub const DEFAULT_LIMIT: usize = 100 * 1024;

/// Body limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimitConfig {
    /// Maximum body size in bytes
    pub max_size: usize,
}

impl BodyLimitConfig {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    /// Parse size from string (e.g., "100kb", "1mb", "512b", "2048")
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();

        let (num_str, multiplier) = if let Some(n) = s.strip_suffix("mb") {
            (n, 1024 * 1024)
        } else if let Some(n) = s.strip_suffix("kb") {
            (n, 1024)
        } else if let Some(n) = s.strip_suffix('b') {
            (n, 1)
        } else {
            (s.as_str(), 1)
        };

        let num: usize = num_str.trim().parse().ok()?;
        let size = num.checked_mul(multiplier)?;
        if size == 0 {
            return None;
        }
        Some(Self::new(size))
    }
}

impl Default for BodyLimitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

/// Format size for display
pub fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}
