//! Blob storage endpoints and the presigned URL subsystem.
//!
//! `public_routes()` is mounted before the auth middleware: downloads and
//! presigned PUT/GET redeem a signed token or a stored `public` flag
//! instead of an `Authorization` header. Everything else in
//! `authenticated_routes()` requires a caller authenticated the normal
//! way and is scoped by the namespace-ownership policy in `service`.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod handler;
pub mod presign;
pub mod service;

use axum::Router;
use axum::routing::{get, post, put};
use gateway_core::App;

pub fn public_routes() -> Router<App> {
	Router::new()
		.route("/blob/download/{*rest}", get(handler::download))
		.route("/blob/public/{*rest}", get(handler::public))
		.route("/blob/presigned-put", put(handler::presigned_put))
		.route("/blob/presigned-get", get(handler::presigned_get))
}

pub fn authenticated_routes() -> Router<App> {
	Router::new()
		.route("/blob/upload", post(handler::upload))
		.route("/blob/get", post(handler::get))
		.route("/blob/delete", post(handler::delete))
		.route("/blob/list", post(handler::list))
		.route("/blob/visibility", post(handler::visibility))
		.route("/blob/presign-upload", post(handler::presign_upload))
}

// vim: ts=4
