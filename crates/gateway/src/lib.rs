//! The gateway binary's router assembly: wires every feature crate's
//! routes onto one `axum::Router`, split into a public group (mounted
//! ahead of the authentication middleware) and an authenticated group.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod openapi;

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::get;
use gateway_core::App;
use gateway_core::cors::{PrivateNetworkLayer, build_cors_layer};
use gateway_core::middleware::{auth_middleware, request_id_middleware};
use tower_http::trace::TraceLayer;

async fn ping() -> &'static str {
	"pong"
}

/// Routes reachable without an `Authorization` header: liveness, the
/// OpenAPI document, public/presigned blob transfer, channel
/// append/read/delete-event/subscribe (token-authenticated), stateful
/// token lookup/claim, and short-link resolution.
fn public_routes() -> Router<App> {
	Router::new()
		.route("/ping", get(ping))
		.route("/openapi", get(openapi::serve))
		.merge(gateway_blob::public_routes())
		.merge(gateway_channel::public_routes())
		.merge(gateway_token::public_routes())
		.merge(gateway_shortlink::public_routes())
}

/// Routes gated by `auth_middleware`: identity/KV/blob/channel
/// management, token administration, and short-link creation/deletion.
fn authenticated_routes(app: App) -> Router<App> {
	Router::new()
		.merge(gateway_identity::routes())
		.merge(gateway_kv::routes())
		.merge(gateway_blob::authenticated_routes())
		.merge(gateway_channel::authenticated_routes())
		.merge(gateway_token::authenticated_routes())
		.merge(gateway_shortlink::authenticated_routes())
		.layer(axum_middleware::from_fn_with_state(app, auth_middleware))
}

/// Assemble the full application router: public routes, authenticated
/// routes behind the auth middleware, and the ambient layers (CORS,
/// Private-Network-Access echo, request-id tagging, request tracing)
/// applied to every path.
pub fn build_router(app: App) -> Router<()> {
	let cors = build_cors_layer(&app.config);

	Router::new()
		.merge(public_routes())
		.merge(authenticated_routes(app.clone()))
		.layer(axum_middleware::from_fn(request_id_middleware))
		.layer(TraceLayer::new_for_http())
		.layer(PrivateNetworkLayer)
		.layer(cors)
		.with_state(app)
}

// vim: ts=4
