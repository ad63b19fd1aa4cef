//! Explicit (method, path) routing table
//!
//! Routes are organized by HTTP method, then looked up by normalized path:
//! - matching is ASCII case-insensitive
//! - one trailing slash is ignored (`/buscar-datos/` == `/buscar-datos`)
//! - `HEAD` falls back to the `GET` route

use crate::{Error, Method, Result};
use std::collections::HashMap;

/// Per-method exact-path table
struct MethodTable<T> {
    routes: HashMap<String, T>,
}

impl<T: Clone> MethodTable<T> {
    fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    fn insert(&mut self, method: Method, path: &str, value: T) -> Result<()> {
        if !path.starts_with('/') {
            return Err(Error::InvalidPath(path.to_string()));
        }
        let key = normalize_path(path);
        if self.routes.contains_key(&key) {
            return Err(Error::DuplicateRoute {
                method: method.to_string(),
                path: key,
            });
        }
        self.routes.insert(key, value);
        Ok(())
    }

    fn at(&self, path: &str) -> Option<T> {
        self.routes.get(&normalize_path(path)).cloned()
    }

    fn len(&self) -> usize {
        self.routes.len()
    }
}

/// Normalize a request path for lookup
pub fn normalize_path(path: &str) -> String {
    let trimmed = match path.strip_suffix('/') {
        Some(rest) if !rest.is_empty() => rest,
        _ => path,
    };
    trimmed.to_ascii_lowercase()
}

/// HTTP router mapping (method, path) to a route value
pub struct Router<T> {
    get: MethodTable<T>,
    post: MethodTable<T>,
    put: MethodTable<T>,
    delete: MethodTable<T>,
    patch: MethodTable<T>,
    options: MethodTable<T>,
}

impl<T: Clone> Router<T> {
    /// Create a new router
    pub fn new() -> Self {
        Self {
            get: MethodTable::new(),
            post: MethodTable::new(),
            put: MethodTable::new(),
            delete: MethodTable::new(),
            patch: MethodTable::new(),
            options: MethodTable::new(),
        }
    }

    /// Add a route
    pub fn route(&mut self, method: Method, path: &str, value: T) -> Result<()> {
        match method {
            Method::Get => self.get.insert(method, path, value),
            Method::Post => self.post.insert(method, path, value),
            Method::Put => self.put.insert(method, path, value),
            Method::Delete => self.delete.insert(method, path, value),
            Method::Patch => self.patch.insert(method, path, value),
            Method::Options => self.options.insert(method, path, value),
            _ => Err(Error::InvalidMethod(method.to_string())),
        }
    }

    /// Add a GET route
    pub fn get(&mut self, path: &str, value: T) -> Result<()> {
        self.route(Method::Get, path, value)
    }

    /// Match a request
    pub fn match_route(&self, method: Method, path: &str) -> Option<T> {
        match method {
            Method::Get => self.get.at(path),
            Method::Post => self.post.at(path),
            Method::Put => self.put.at(path),
            Method::Delete => self.delete.at(path),
            Method::Patch => self.patch.at(path),
            Method::Head => self.get.at(path),
            Method::Options => self.options.at(path),
            _ => None,
        }
    }

    /// Whether any method has a route at `path`
    pub fn has_path(&self, path: &str) -> bool {
        let key = normalize_path(path);
        [
            &self.get,
            &self.post,
            &self.put,
            &self.delete,
            &self.patch,
            &self.options,
        ]
        .iter()
        .any(|table| table.routes.contains_key(&key))
    }

    /// Number of registered routes across all methods
    pub fn len(&self) -> usize {
        self.get.len()
            + self.post.len()
            + self.put.len()
            + self.delete.len()
            + self.patch.len()
            + self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}
