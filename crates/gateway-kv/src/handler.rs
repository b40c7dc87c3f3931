//! HTTP handlers for `/kv/*`. All routes require `Auth`; namespace
//! ownership is enforced in `service`.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use gateway_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::service;

#[derive(Deserialize)]
pub struct GetReq {
	pub namespace: String,
	pub key: String,
}

#[derive(Serialize)]
pub struct GetRes {
	pub value: Option<String>,
}

pub async fn get(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<GetReq>) -> Result<Json<GetRes>> {
	let value = service::get(&app, &ctx, &req.namespace, &req.key).await?;
	Ok(Json(GetRes { value }))
}

#[derive(Deserialize)]
pub struct SetReq {
	pub namespace: String,
	pub key: String,
	pub value: String,
}

pub async fn set(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<SetReq>) -> Result<StatusCode> {
	service::set(&app, &ctx, &req.namespace, &req.key, &req.value).await?;
	Ok(StatusCode::OK)
}

#[derive(Deserialize)]
pub struct DeleteReq {
	pub namespace: String,
	pub key: String,
}

pub async fn delete(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<DeleteReq>) -> Result<StatusCode> {
	service::delete(&app, &ctx, &req.namespace, &req.key).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct KeysReq {
	pub namespace: String,
	#[serde(default)]
	pub prefix: Option<String>,
	#[serde(default)]
	pub limit: Option<usize>,
	#[serde(default)]
	pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct KeyRes {
	pub name: String,
}

#[derive(Serialize)]
pub struct KeysRes {
	pub keys: Vec<KeyRes>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cursor: Option<String>,
	pub list_complete: bool,
}

pub async fn keys(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<KeysReq>) -> Result<Json<KeysRes>> {
	let result =
		service::list_keys(&app, &ctx, &req.namespace, req.prefix.as_deref(), req.limit, req.cursor).await?;
	Ok(Json(KeysRes {
		keys: result.keys.into_iter().map(|k| KeyRes { name: k.name }).collect(),
		cursor: result.cursor,
		list_complete: result.list_complete,
	}))
}

#[derive(Deserialize)]
pub struct BulkGetReq {
	pub namespace: String,
	pub keys: Vec<String>,
}

#[derive(Serialize)]
pub struct BulkGetRes {
	pub values: std::collections::HashMap<String, Option<String>>,
}

pub async fn bulk_get(
	State(app): State<App>,
	Auth(ctx): Auth,
	Json(req): Json<BulkGetReq>,
) -> Result<Json<BulkGetRes>> {
	let values = service::bulk_get(&app, &ctx, &req.namespace, &req.keys).await?;
	Ok(Json(BulkGetRes { values }))
}

#[derive(Deserialize)]
pub struct BulkSetEntry {
	pub key: String,
	pub value: String,
}

#[derive(Deserialize)]
pub struct BulkSetReq {
	pub namespace: String,
	pub entries: Vec<BulkSetEntry>,
}

pub async fn bulk_set(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<BulkSetReq>) -> Result<StatusCode> {
	let entries: Vec<(String, String)> = req.entries.into_iter().map(|e| (e.key, e.value)).collect();
	service::bulk_set(&app, &ctx, &req.namespace, &entries).await?;
	Ok(StatusCode::OK)
}

pub async fn namespaces(State(app): State<App>, Auth(ctx): Auth) -> Result<Json<Vec<String>>> {
	Ok(Json(service::namespaces(&app, &ctx).await?))
}

pub async fn dump(
	State(app): State<App>,
	Auth(ctx): Auth,
) -> Result<Json<std::collections::HashMap<String, std::collections::HashMap<String, String>>>> {
	Ok(Json(service::dump(&app, &ctx).await?))
}

// vim: ts=4
