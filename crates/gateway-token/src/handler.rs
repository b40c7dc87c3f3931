//! HTTP handlers for `/token/*`. `lookup` and `claim` are public per the
//! component design (invited/shared recipients hold no credential of
//! their own yet); `revoke` and `list` require an authenticated caller
//! who created the token.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use gateway_core::prelude::*;
use gateway_identity::service as identity_service;
use serde::{Deserialize, Serialize};

use crate::stateful;

#[derive(Serialize)]
pub struct TokenLookupRes {
	pub action: TokenAction,
	pub state: TokenState,
	pub expires_at: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
}

impl From<&StatefulToken> for TokenLookupRes {
	fn from(t: &StatefulToken) -> Self {
		// Only safe metadata ever leaves this endpoint — never the payload
		// (identity id, bucket/key) itself, per spec.md's "lookup returns
		// only safe metadata" contract for blob_access tokens.
		TokenLookupRes { action: t.action, state: t.state, expires_at: t.expires_at, label: t.label.clone() }
	}
}

#[derive(Deserialize)]
pub struct TokenIdReq {
	pub token_id: String,
}

/// `POST /token/lookup`. Public.
pub async fn lookup(State(app): State<App>, Json(req): Json<TokenIdReq>) -> Result<Json<TokenLookupRes>> {
	let token = stateful::lookup(&app, &req.token_id).await?;
	Ok(Json(TokenLookupRes::from(&token)))
}

#[derive(Serialize)]
pub struct IdentityClaimRes {
	pub identity_id: String,
	pub secret: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum ClaimRes {
	IdentityClaim(IdentityClaimRes),
	BlobAccess { bucket: String, key: String },
}

/// `POST /token/claim`. Public. Atomically transitions the token to
/// `used`; a concurrent second caller observes `Conflict` (409).
pub async fn claim(State(app): State<App>, Json(req): Json<TokenIdReq>) -> Result<Json<ClaimRes>> {
	let token = stateful::claim(&app, &req.token_id).await?;
	match token.payload {
		TokenPayload::IdentityClaim { identity_id } => {
			let new_cred = identity_service::activate_claimed_identity(&app, &identity_id).await?;
			Ok(Json(ClaimRes::IdentityClaim(IdentityClaimRes { identity_id, secret: new_cred })))
		}
		TokenPayload::BlobAccess { bucket, key, .. } => Ok(Json(ClaimRes::BlobAccess { bucket, key })),
	}
}

/// `POST /token/revoke`. Requires the caller to have created the token.
pub async fn revoke(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<TokenIdReq>) -> Result<StatusCode> {
	let token = stateful::lookup(&app, &req.token_id).await?;
	if token.created_by != ctx.identity.id {
		let perms = identity_service::resolve_effective_permissions(&app, &ctx.identity).await?;
		if !identity_service::has_capability(&perms, "identity:admin", None) {
			return Err(Error::Forbidden);
		}
	}
	stateful::revoke(&app, &req.token_id).await?;
	Ok(StatusCode::NO_CONTENT)
}

/// `POST /token/list`. Requires `identity:admin`; lists every stateful
/// token the caller created, or all tokens for an admin.
pub async fn list(State(app): State<App>, Auth(ctx): Auth) -> Result<Json<Vec<TokenLookupRes>>> {
	let perms = identity_service::resolve_effective_permissions(&app, &ctx.identity).await?;
	let is_admin = identity_service::has_capability(&perms, "identity:admin", None);

	let listing = app.kv_adapter.list(ListOpts { prefix: Some("__TOKEN:".to_string()), limit: None, cursor: None }).await?;
	let mut out = Vec::new();
	for entry in listing.keys {
		let Some(raw) = app.kv_adapter.get(&entry.name).await? else { continue };
		let Ok(token) = serde_json::from_str::<StatefulToken>(&raw) else { continue };
		if is_admin || token.created_by == ctx.identity.id {
			out.push(TokenLookupRes::from(&token));
		}
	}
	Ok(Json(out))
}

// vim: ts=4
