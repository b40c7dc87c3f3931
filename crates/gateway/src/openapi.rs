//! Statically declared OpenAPI document.
//!
//! The route table is enumerated explicitly in [`crate::build_router`]
//! rather than derived reflectively, so the schema here is hand-written
//! `serde_json::Value` rather than generated by a macro layer — it is
//! kept in sync with the route declarations by hand.

use axum::Json;
use serde_json::{Value, json};

fn op(summary: &str, auth: &str) -> Value {
	json!({ "summary": summary, "x-auth": auth })
}

pub fn document() -> Value {
	json!({
		"openapi": "3.0.3",
		"info": { "title": "gateway", "version": env!("CARGO_PKG_VERSION") },
		"paths": {
			"/ping": { "get": op("Liveness check", "none") },
			"/identity/create": { "post": op("Create an identity + first credential", "ApiKey | bootstrap") },
			"/identity/list": { "post": op("List identities", "ApiKey") },
			"/identity/delete": { "post": op("Delete an identity", "ApiKey") },
			"/identity/invite": { "post": op("Invite a claimable identity", "ApiKey") },
			"/identity/whoami": { "post": op("Return the caller's identity", "ApiKey") },
			"/identity/app/register": { "post": op("Idempotent app-identity upsert", "ApiKey") },
			"/kv/get": { "post": op("Get a namespaced value", "ApiKey") },
			"/kv/set": { "post": op("Set a namespaced value", "ApiKey") },
			"/kv/delete": { "post": op("Delete a namespaced value", "ApiKey") },
			"/kv/keys": { "post": op("List keys under a namespace", "ApiKey") },
			"/kv/bulk/get": { "post": op("Bulk get", "ApiKey") },
			"/kv/bulk/set": { "post": op("Bulk set", "ApiKey") },
			"/kv/namespaces": { "post": op("List known namespaces", "ApiKey") },
			"/kv/dump": { "post": op("Dump non-reserved keys grouped by namespace", "ApiKey") },
			"/blob/upload": { "post": op("Upload a blob", "ApiKey") },
			"/blob/get": { "post": op("Get blob metadata + signed download URL", "ApiKey") },
			"/blob/delete": { "post": op("Delete a blob", "ApiKey") },
			"/blob/list": { "post": op("List blobs under a namespace", "ApiKey") },
			"/blob/visibility": { "post": op("Set blob visibility", "ApiKey") },
			"/blob/presign-upload": { "post": op("Issue a presigned upload URL", "ApiKey") },
			"/blob/download/{key}": { "get": op("Authenticated download via URL signature", "URL-sign") },
			"/blob/public/{key}": { "get": op("Public download", "none") },
			"/blob/presigned-put": { "put": op("Gateway-terminated presigned upload", "token") },
			"/blob/presigned-get": { "get": op("Gateway-terminated presigned download", "token") },
			"/channel/create": { "post": op("Create a channel", "ApiKey") },
			"/channel/list": { "post": op("List channels owned by a namespace", "ApiKey") },
			"/channel/delete": { "post": op("Delete a channel", "ApiKey") },
			"/channel/append": { "post": op("Append a message event", "ApiKey | X-Channel-Token") },
			"/channel/read": { "post": op("Read events", "ApiKey | X-Channel-Token") },
			"/channel/delete-event": { "post": op("Append a tombstone", "ApiKey | X-Channel-Token") },
			"/channel/token/create": { "post": op("Mint an HMAC capability token", "ApiKey") },
			"/channel/subscribe": { "get": op("SSE live subscription", "token") },
			"/token/lookup": { "post": op("Inspect a stateful token", "none") },
			"/token/claim": { "post": op("Claim/redeem a stateful token", "none") },
			"/token/revoke": { "post": op("Revoke a stateful token", "ApiKey") },
			"/token/list": { "post": op("List stateful tokens created by the caller", "ApiKey") },
			"/short": { "post": op("Create a short link", "ApiKey") },
			"/short/{id}": { "delete": op("Delete a short link", "ApiKey") },
			"/s/{id}": { "get": op("Resolve + redirect a short link", "none") },
		},
	})
}

pub async fn serve() -> Json<Value> {
	Json(document())
}

// vim: ts=4
