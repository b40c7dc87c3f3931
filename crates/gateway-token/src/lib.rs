//! Capability tokens (stateless, HMAC-signed, channel-scoped) and
//! stateful tokens (opaque, KV-tracked, used for identity-claim and
//! blob-access one-shot flows).

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod capability;
pub mod handler;
pub mod stateful;

use axum::Router;
use axum::routing::post;
use gateway_core::App;

/// `/token/lookup` and `/token/claim` are public per the component
/// design — invited/shared recipients hold no credential of their own
/// at this point — so they're mounted on the bin's unauthenticated
/// router, not behind `auth_middleware`.
pub fn public_routes() -> Router<App> {
	Router::new().route("/token/lookup", post(handler::lookup)).route("/token/claim", post(handler::claim))
}

pub fn authenticated_routes() -> Router<App> {
	Router::new().route("/token/revoke", post(handler::revoke)).route("/token/list", post(handler::list))
}

// vim: ts=4
