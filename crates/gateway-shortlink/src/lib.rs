//! Short links: `POST /short` (create), `DELETE /short/:id` (admin-only),
//! `GET /s/:id` (public resolve/redirect).

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod handler;
pub mod service;

use axum::Router;
use axum::routing::{delete, get, post};
use gateway_core::App;

/// `GET /s/:id` resolves and redirects without authentication — short
/// links exist precisely to be handed to third parties who hold no
/// credential.
pub fn public_routes() -> Router<App> {
	Router::new().route("/s/{id}", get(handler::resolve))
}

pub fn authenticated_routes() -> Router<App> {
	Router::new().route("/short", post(handler::create)).route("/short/{id}", delete(handler::delete))
}

// vim: ts=4
