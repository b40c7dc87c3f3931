//! Append-only event channels: atomic sequence assignment, tombstone
//! soft-delete, HMAC capability tokens, and SSE live subscription.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod handler;
pub mod service;
pub mod sse;

use axum::Router;
use axum::routing::{get, post};
use gateway_core::App;

/// `append`/`read`/`delete-event` accept either an API key or a capability
/// token and so cannot sit behind the mandatory `auth_middleware` layer;
/// `subscribe` is always query-token authenticated. All four are mounted
/// here, unauthenticated at the router level.
pub fn public_routes() -> Router<App> {
	Router::new()
		.route("/channel/append", post(handler::append))
		.route("/channel/read", post(handler::read))
		.route("/channel/delete-event", post(handler::delete_event))
		.route("/channel/subscribe", get(sse::subscribe))
}

/// `create`/`list`/`delete`/`token/create` require an authenticated owner
/// or `channel:admin` grantee.
pub fn authenticated_routes() -> Router<App> {
	Router::new()
		.route("/channel/create", post(handler::create))
		.route("/channel/list", post(handler::list))
		.route("/channel/delete", post(handler::delete))
		.route("/channel/token/create", post(handler::create_token))
}

// vim: ts=4
