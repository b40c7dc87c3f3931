//! HTTP handlers for `/channel/*`. `append`, `read`, and `delete-event`
//! accept either `Authorization: ApiKey` or `X-Channel-Token` (the
//! dual-auth contract); `create`, `list`, `delete`, and `token/create`
//! require an authenticated owner/admin.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use gateway_core::prelude::*;
use gateway_identity::service as identity_service;
use gateway_token::capability::ChannelPermission;
use serde::{Deserialize, Serialize};

use crate::service::{self, ChannelCaller, ReadArgs};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers.get(name)?.to_str().ok()
}

async fn resolve_channel_caller(
	app: &App,
	headers: &HeaderMap,
	meta: &ChannelMeta,
	author_id: Option<String>,
) -> Result<ChannelCaller> {
	let api_key = header_str(headers, AUTHORIZATION.as_str());
	let channel_token = header_str(headers, "x-channel-token");
	service::resolve_caller(app, meta, api_key, channel_token, author_id).await
}

#[derive(Serialize)]
pub struct ChannelRes {
	pub channel_id: String,
	pub name: String,
	pub owner_namespace: String,
	pub created_at: i64,
}

impl From<&ChannelMeta> for ChannelRes {
	fn from(m: &ChannelMeta) -> Self {
		ChannelRes { channel_id: m.channel_id.clone(), name: m.name.clone(), owner_namespace: m.owner_namespace.clone(), created_at: m.created_at }
	}
}

#[derive(Deserialize)]
pub struct CreateChannelReq {
	pub namespace: String,
	pub name: String,
}

/// `POST /channel/create`. Requires `channel:admin` scoped to `namespace`.
pub async fn create(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<CreateChannelReq>) -> Result<Json<ChannelRes>> {
	let perms = identity_service::resolve_effective_permissions(&app, &ctx.identity).await?;
	if !identity_service::has_capability(&perms, "channel:admin", Some(&req.namespace)) {
		return Err(Error::Forbidden);
	}
	let meta = service::create_channel(&app, req.name, req.namespace).await?;
	Ok(Json(ChannelRes::from(&meta)))
}

#[derive(Deserialize)]
pub struct ListChannelsReq {
	pub namespace: String,
}

/// `POST /channel/list`. Requires `channel:read` scoped to `namespace`.
pub async fn list(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<ListChannelsReq>) -> Result<Json<Vec<ChannelRes>>> {
	let perms = identity_service::resolve_effective_permissions(&app, &ctx.identity).await?;
	if !identity_service::has_capability(&perms, "channel:read", Some(&req.namespace)) {
		return Err(Error::Forbidden);
	}
	let metas = service::list_channels(&app, &req.namespace).await?;
	Ok(Json(metas.iter().map(ChannelRes::from).collect()))
}

#[derive(Deserialize)]
pub struct ChannelIdReq {
	pub channel_id: String,
}

/// `POST /channel/delete`. Requires `channel:admin` scoped to the
/// channel's owning namespace.
pub async fn delete(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<ChannelIdReq>) -> Result<StatusCode> {
	let meta = service::get_metadata(&app, &req.channel_id).await?;
	let perms = identity_service::resolve_effective_permissions(&app, &ctx.identity).await?;
	if !identity_service::has_capability(&perms, "channel:admin", Some(&meta.owner_namespace)) {
		return Err(Error::Forbidden);
	}
	service::delete_channel(&app, &meta).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct AppendReq {
	pub channel_id: String,
	pub content: String,
	#[serde(default)]
	pub author_id: Option<String>,
}

#[derive(Serialize)]
pub struct ChannelEventRes {
	pub id: String,
	pub seq: u64,
	pub author_id: String,
	#[serde(rename = "type")]
	pub kind: ChannelEventType,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_seq: Option<u64>,
	pub created_at: i64,
}

impl From<ChannelEvent> for ChannelEventRes {
	fn from(e: ChannelEvent) -> Self {
		ChannelEventRes { id: e.id, seq: e.seq, author_id: e.author_id, kind: e.kind, content: e.content, target_seq: e.target_seq, created_at: e.created_at }
	}
}

/// `POST /channel/append`. Dual-auth.
pub async fn append(State(app): State<App>, headers: HeaderMap, Json(req): Json<AppendReq>) -> Result<Json<ChannelEventRes>> {
	let meta = service::get_metadata(&app, &req.channel_id).await?;
	let caller = resolve_channel_caller(&app, &headers, &meta, req.author_id).await?;
	let event = service::append(&app, &meta, &caller, req.content).await?;
	Ok(Json(ChannelEventRes::from(event)))
}

#[derive(Deserialize)]
pub struct ReadReq {
	pub channel_id: String,
	#[serde(default)]
	pub after_seq: Option<u64>,
	#[serde(default)]
	pub limit: Option<usize>,
	#[serde(default)]
	pub include_deleted: bool,
	#[serde(default)]
	pub author_id: Option<String>,
}

#[derive(Serialize)]
pub struct VisibleEventRes {
	#[serde(flatten)]
	pub event: ChannelEventRes,
	pub deleted: bool,
}

#[derive(Serialize)]
pub struct ReadRes {
	pub events: Vec<VisibleEventRes>,
	pub has_more: bool,
}

/// `POST /channel/read`. Dual-auth.
pub async fn read(State(app): State<App>, headers: HeaderMap, Json(req): Json<ReadReq>) -> Result<Json<ReadRes>> {
	let meta = service::get_metadata(&app, &req.channel_id).await?;
	let caller = resolve_channel_caller(&app, &headers, &meta, req.author_id).await?;
	let result = service::read(
		&app,
		&meta,
		&caller,
		ReadArgs { after_seq: req.after_seq, limit: req.limit, include_deleted: req.include_deleted },
	)
	.await?;
	Ok(Json(ReadRes {
		events: result
			.events
			.into_iter()
			.map(|v| VisibleEventRes { event: ChannelEventRes::from(v.event), deleted: v.deleted })
			.collect(),
		has_more: result.has_more,
	}))
}

#[derive(Deserialize)]
pub struct DeleteEventReq {
	pub channel_id: String,
	pub target_seq: u64,
	#[serde(default)]
	pub author_id: Option<String>,
}

/// `POST /channel/delete-event`. Dual-auth.
pub async fn delete_event(State(app): State<App>, headers: HeaderMap, Json(req): Json<DeleteEventReq>) -> Result<Json<ChannelEventRes>> {
	let meta = service::get_metadata(&app, &req.channel_id).await?;
	let caller = resolve_channel_caller(&app, &headers, &meta, req.author_id).await?;
	let event = service::append_deletion(&app, &meta, &caller, req.target_seq).await?;
	Ok(Json(ChannelEventRes::from(event)))
}

#[derive(Deserialize)]
pub struct CreateTokenReq {
	pub channel_id: String,
	pub namespace: String,
	pub permissions: Vec<String>,
	#[serde(default)]
	pub author_id: Option<String>,
	#[serde(default = "default_expires_in")]
	pub expires_in_seconds: i64,
}

fn default_expires_in() -> i64 {
	3600
}

#[derive(Serialize)]
pub struct CreateTokenRes {
	pub token: String,
}

/// `POST /channel/token/create`. Requires `channel:admin` scoped to
/// `namespace`; the minted token's own permission set is whatever the
/// caller requested, independent of the caller's own capabilities — the
/// channel owner is trusted to scope down what they hand out.
pub async fn create_token(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<CreateTokenReq>) -> Result<Json<CreateTokenRes>> {
	let perms = identity_service::resolve_effective_permissions(&app, &ctx.identity).await?;
	if !identity_service::has_capability(&perms, "channel:admin", Some(&req.namespace)) {
		return Err(Error::Forbidden);
	}
	let permissions: Vec<ChannelPermission> =
		req.permissions.iter().map(|p| ChannelPermission::parse(p)).collect::<Option<Vec<_>>>().ok_or_else(|| {
			Error::InvalidRequest("unknown channel permission".into())
		})?;
	let token = service::create_capability_token(&app, &req.channel_id, permissions, req.author_id, req.expires_in_seconds).await?;
	Ok(Json(CreateTokenRes { token }))
}

// vim: ts=4
