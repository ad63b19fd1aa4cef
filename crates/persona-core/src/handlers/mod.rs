//! Route handlers
//!
//! One handler per [`Capability`](crate::Capability) plus the welcome text.

pub mod persona;

use crate::response::{Response, StatusCode};

pub const WELCOME_TEXT: &str = "¡Bienvenido al servidor de personas!";
pub const NOT_FOUND_TEXT: &str = "Página no encontrada";

/// `GET /`
pub fn welcome() -> Response {
    Response::text(StatusCode::OK, WELCOME_TEXT)
}
