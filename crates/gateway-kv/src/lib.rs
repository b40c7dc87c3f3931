//! Namespaced key-value endpoints: `get`/`set`/`keys`/`bulk/get`/
//! `bulk/set`/`namespaces`/`dump`, all scoped by the namespace-ownership
//! policy in `gateway_identity::service::authorize_namespace`.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod handler;
pub mod service;

use axum::Router;
use axum::routing::post;
use gateway_core::App;

pub fn routes() -> Router<App> {
	Router::new()
		.route("/kv/get", post(handler::get))
		.route("/kv/set", post(handler::set))
		.route("/kv/delete", post(handler::delete))
		.route("/kv/keys", post(handler::keys))
		.route("/kv/bulk/get", post(handler::bulk_get))
		.route("/kv/bulk/set", post(handler::bulk_set))
		.route("/kv/namespaces", post(handler::namespaces))
		.route("/kv/dump", post(handler::dump))
}

// vim: ts=4
