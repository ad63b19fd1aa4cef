//! persona-core: person-record CRUD gateway
//!
//! Maps a handful of JSON endpoints onto single parameterized SQL statements
//! against the `persona` table.
//!
//! ## Layout
//! - `router` / `middleware` / `server` - HTTP plumbing (hyper + tokio)
//! - `handlers` - the five person operations plus the welcome route
//! - `fields` - presence validation of JSON body fields
//! - `query` - statement templates and parameter lists
//! - `store` - store handle trait with MySQL and in-memory backends

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod age;
pub mod app;
pub mod capability;
pub mod config;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod model;
pub mod query;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod store;

// Re-exports
pub use age::{derive_age, is_adult, Clock, FixedClock, SystemClock};
pub use app::{App, AppState};
pub use capability::{Capability, Route};
pub use config::{Config, NotFoundFormat, StoreKind};
pub use error::{ApiError, Error, Result};
pub use model::{AgeSearch, NationalIdKey, Persona, PersonaUpdate};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};
pub use router::Router;
pub use server::{ConnectionTracker, Server, ServerConfig};
pub use store::{MemoryStore, MysqlStore, PersonaStore, SqlValue, Statement, StoreError};

// Middleware re-exports
pub use middleware::{Middleware, MiddlewareChain};
