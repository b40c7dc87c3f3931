//! Identity, credential, and grant management: `identity/create`,
//! `identity/app/register`, `identity/invite`, `identity/delete`,
//! `identity/whoami`, and the effective-permission resolver other
//! feature crates depend on.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod handler;
pub mod service;

use axum::Router;
use axum::routing::post;
use gateway_core::App;

/// Routes requiring auth (including the bootstrap escape hatch, handled
/// inside the `create` handler itself).
pub fn routes() -> Router<App> {
	Router::new()
		.route("/identity/create", post(handler::create))
		.route("/identity/list", post(handler::list))
		.route("/identity/delete", post(handler::delete))
		.route("/identity/invite", post(handler::invite))
		.route("/identity/whoami", post(handler::whoami))
		.route("/identity/app/register", post(handler::register_app))
}

// vim: ts=4
