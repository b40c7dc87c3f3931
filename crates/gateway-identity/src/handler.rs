//! HTTP handlers for `/identity/*`.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use gateway_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::service;

#[derive(Deserialize)]
pub struct CreateIdentityReq {
	pub display_name: String,
	#[serde(rename = "type")]
	pub kind: IdentityType,
}

#[derive(Serialize)]
pub struct IdentityRes {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: IdentityType,
	pub display_name: String,
	pub status: IdentityStatus,
}

impl From<&Identity> for IdentityRes {
	fn from(id: &Identity) -> Self {
		IdentityRes { id: id.id.clone(), kind: id.kind, display_name: id.display_name.clone(), status: id.status }
	}
}

#[derive(Serialize)]
pub struct CredentialRes {
	#[serde(rename = "type")]
	pub kind: CredentialType,
}

#[derive(Serialize)]
pub struct CreateIdentityRes {
	pub identity: IdentityRes,
	pub credential: CredentialRes,
	pub secret: String,
}

/// `POST /identity/create`. Reachable either via `BootstrapAuth` (no
/// identity exists yet) or via an authenticated caller with
/// `identity:admin`.
pub async fn create(
	State(app): State<App>,
	bootstrap: Option<BootstrapAuth>,
	auth: Option<Auth>,
	Json(req): Json<CreateIdentityReq>,
) -> Result<(StatusCode, Json<CreateIdentityRes>)> {
	let created_by = match (bootstrap, auth) {
		(Some(_), _) => None,
		(None, Some(Auth(ctx))) => {
			let perms = service::resolve_effective_permissions(&app, &ctx.identity).await?;
			if !service::has_capability(&perms, "identity:admin", None) {
				return Err(Error::Forbidden);
			}
			Some(ctx.identity.id)
		}
		(None, None) => return Err(Error::Unauthorized),
	};

	let created = service::create_identity(&app, req.kind, req.display_name, created_by).await?;

	Ok((
		StatusCode::OK,
		Json(CreateIdentityRes {
			identity: IdentityRes::from(&created.identity),
			credential: CredentialRes { kind: created.credential.kind },
			secret: created.secret,
		}),
	))
}

/// `POST /identity/whoami`.
pub async fn whoami(Auth(ctx): Auth) -> Json<IdentityRes> {
	Json(IdentityRes::from(&ctx.identity))
}

#[derive(Deserialize)]
pub struct RegisterAppReq {
	pub origin: String,
	pub display_name: String,
	#[serde(default)]
	pub granted_capabilities: Vec<String>,
}

#[derive(Serialize)]
pub struct RegisterAppRes {
	pub identity: IdentityRes,
	pub created: bool,
}

/// `POST /identity/app/register`. Idempotent modulo capability set-union.
pub async fn register_app(
	State(app): State<App>,
	Json(req): Json<RegisterAppReq>,
) -> Result<Json<RegisterAppRes>> {
	let result =
		service::register_app(&app, req.origin, req.display_name, req.granted_capabilities).await?;
	Ok(Json(RegisterAppRes { identity: IdentityRes::from(&result.identity), created: result.created }))
}

#[derive(Deserialize)]
pub struct InviteReq {
	pub display_name: String,
	pub capability: String,
	pub resource_type: String,
	pub resource_id: String,
	#[serde(default = "default_expires_in")]
	pub expires_in_seconds: i64,
}

fn default_expires_in() -> i64 {
	86_400
}

#[derive(Serialize)]
pub struct InviteRes {
	pub identity: IdentityRes,
	pub token_id: String,
	pub expires_at: i64,
}

/// `POST /identity/invite`.
pub async fn invite(
	State(app): State<App>,
	Auth(ctx): Auth,
	Json(req): Json<InviteReq>,
) -> Result<Json<InviteRes>> {
	let result = service::invite(
		&app,
		req.display_name,
		ctx.identity.id,
		req.capability,
		vec![GrantResource { kind: req.resource_type, id: req.resource_id }],
		req.expires_in_seconds,
	)
	.await?;

	Ok(Json(InviteRes {
		identity: IdentityRes::from(&result.identity),
		token_id: result.token_id,
		expires_at: result.expires_at,
	}))
}

/// `POST /identity/list`. Requires `identity:admin`.
pub async fn list(State(app): State<App>, Auth(ctx): Auth) -> Result<Json<Vec<IdentityRes>>> {
	let perms = service::resolve_effective_permissions(&app, &ctx.identity).await?;
	if !service::has_capability(&perms, "identity:admin", None) {
		return Err(Error::Forbidden);
	}

	let listing = app
		.kv_adapter
		.list(ListOpts { prefix: Some("__IDENTITY:".to_string()), limit: None, cursor: None })
		.await?;

	let mut out = Vec::with_capacity(listing.keys.len());
	for entry in listing.keys {
		if let Some(raw) = app.kv_adapter.get(&entry.name).await? {
			if let Ok(identity) = serde_json::from_str::<Identity>(&raw) {
				out.push(IdentityRes::from(&identity));
			}
		}
	}
	Ok(Json(out))
}

#[derive(Deserialize)]
pub struct DeleteIdentityReq {
	pub identity_id: String,
}

/// `POST /identity/delete`. Only `identity:admin` callers may delete an
/// identity other than themselves.
pub async fn delete(
	State(app): State<App>,
	Auth(ctx): Auth,
	Json(req): Json<DeleteIdentityReq>,
) -> Result<StatusCode> {
	if req.identity_id != ctx.identity.id {
		let perms = service::resolve_effective_permissions(&app, &ctx.identity).await?;
		if !service::has_capability(&perms, "identity:admin", None) {
			return Err(Error::Forbidden);
		}
	}
	service::delete_identity(&app, &req.identity_id).await?;
	Ok(StatusCode::NO_CONTENT)
}

// vim: ts=4
