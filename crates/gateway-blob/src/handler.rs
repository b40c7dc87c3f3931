//! HTTP handlers for `/blob/*`.
//!
//! `upload` reads `namespace`/`key`/`visibility` from headers (per the
//! CORS allow-list's `X-Blob-Namespace`/`X-Blob-Key`/`X-Blob-Visibility`/
//! `X-Blob-Public`) and streams the raw request body straight into the
//! configured `BlobStore`; every other authenticated operation takes a
//! JSON body like the rest of the gateway's handlers. The four pre-auth
//! routes (`download`, `public`, `presigned-put`, `presigned-get`) are
//! mounted before the auth middleware and police themselves.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt as _;
use gateway_core::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::presign;
use crate::service::{self, BlobVisibility};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers.get(name)?.to_str().ok()
}

fn body_reader(body: Body) -> Box<dyn tokio::io::AsyncRead + Send + Unpin> {
	let stream = body.into_data_stream().map_err(std::io::Error::other);
	Box::new(StreamReader::new(stream))
}

fn stream_response(blob: BlobBody) -> Response {
	let content_type = blob.content_type.clone().unwrap_or_else(|| "application/octet-stream".to_string());
	let stream = ReaderStream::new(blob.reader);
	([(header::CONTENT_TYPE, content_type), (header::CONTENT_LENGTH, blob.size.to_string())], Body::from_stream(stream)).into_response()
}

#[derive(Serialize)]
pub struct BlobMetaRes {
	pub namespace: String,
	pub key: String,
	pub content_type: Option<String>,
	pub visibility: BlobVisibility,
	pub size: u64,
	pub created_at: i64,
	pub download_url: String,
}

/// `POST /blob/upload`.
pub async fn upload(State(app): State<App>, Auth(ctx): Auth, headers: HeaderMap, body: Body) -> Result<Json<BlobMetaRes>> {
	let namespace = header_str(&headers, "x-blob-namespace").ok_or_else(|| Error::InvalidRequest("missing X-Blob-Namespace".into()))?;
	let key = header_str(&headers, "x-blob-key").ok_or_else(|| Error::InvalidRequest("missing X-Blob-Key".into()))?;
	let content_type = header_str(&headers, header::CONTENT_TYPE.as_str()).map(str::to_string);

	let visibility = if let Some(v) = header_str(&headers, "x-blob-visibility") {
		BlobVisibility::parse(v).ok_or_else(|| Error::InvalidRequest("unknown X-Blob-Visibility".into()))?
	} else if header_str(&headers, "x-blob-public") == Some("true") {
		BlobVisibility::Public
	} else {
		BlobVisibility::Private
	};

	let meta = service::upload(&app, &ctx, namespace, key, content_type, visibility, body_reader(body)).await?;
	Ok(Json(BlobMetaRes {
		namespace: namespace.to_string(),
		key: key.to_string(),
		content_type: meta.content_type,
		visibility: meta.visibility,
		size: meta.size,
		created_at: meta.created_at,
		download_url: String::new(),
	}))
}

#[derive(Deserialize)]
pub struct NamespaceKeyReq {
	pub namespace: String,
	pub key: String,
}

/// `POST /blob/get`: returns stored metadata plus a freshly-signed
/// download URL, never the object body itself.
pub async fn get(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<NamespaceKeyReq>) -> Result<Json<BlobMetaRes>> {
	let result = service::get_metadata(&app, &ctx, &req.namespace, &req.key).await?;
	Ok(Json(BlobMetaRes {
		namespace: req.namespace,
		key: req.key,
		content_type: result.meta.content_type,
		visibility: result.meta.visibility,
		size: result.meta.size,
		created_at: result.meta.created_at,
		download_url: result.download_url,
	}))
}

/// `POST /blob/delete`.
pub async fn delete(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<NamespaceKeyReq>) -> Result<StatusCode> {
	service::delete(&app, &ctx, &req.namespace, &req.key).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ListReq {
	pub namespace: String,
	#[serde(default)]
	pub prefix: Option<String>,
	#[serde(default)]
	pub limit: Option<usize>,
	#[serde(default)]
	pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct BlobObjectRes {
	pub key: String,
	pub size: u64,
}

#[derive(Serialize)]
pub struct ListRes {
	pub objects: Vec<BlobObjectRes>,
	pub truncated: bool,
	pub cursor: Option<String>,
}

/// `POST /blob/list`.
pub async fn list(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<ListReq>) -> Result<Json<ListRes>> {
	let result = service::list(&app, &ctx, &req.namespace, req.prefix.as_deref(), req.limit, req.cursor).await?;
	Ok(Json(ListRes {
		objects: result.objects.into_iter().map(|o| BlobObjectRes { key: o.key, size: o.size }).collect(),
		truncated: result.truncated,
		cursor: result.cursor,
	}))
}

#[derive(Deserialize)]
pub struct VisibilityReq {
	pub namespace: String,
	pub key: String,
	pub visibility: String,
}

/// `POST /blob/visibility`.
pub async fn visibility(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<VisibilityReq>) -> Result<StatusCode> {
	let visibility = BlobVisibility::parse(&req.visibility).ok_or_else(|| Error::InvalidRequest("unknown visibility".into()))?;
	service::set_visibility(&app, &ctx, &req.namespace, &req.key, visibility).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct PresignUploadReq {
	pub namespace: String,
	pub key: String,
	pub content_type: String,
	pub content_length: u64,
}

#[derive(Serialize)]
pub struct PresignUploadRes {
	pub upload_url: String,
}

/// `POST /blob/presign-upload`: issues a time-limited upload URL without
/// writing anything yet — the object lands when the caller redeems the
/// URL against `PUT /blob/presigned-put`.
pub async fn presign_upload(State(app): State<App>, Auth(ctx): Auth, Json(req): Json<PresignUploadReq>) -> Result<Json<PresignUploadRes>> {
	let upload_url = service::presign_upload(&app, &ctx, &req.namespace, &req.key, &req.content_type, req.content_length).await?;
	Ok(Json(PresignUploadRes { upload_url }))
}

fn split_namespace_key(rest: &str) -> Result<(&str, &str)> {
	rest.split_once('/').filter(|(_, k)| !k.is_empty()).ok_or_else(|| Error::InvalidRequest("path must be <namespace>/<key>".into()))
}

#[derive(Deserialize)]
pub struct TokenQuery {
	pub token: String,
}

/// `GET /blob/download/{*rest}`: pre-auth, authenticated purely by a
/// signed download token whose `key` claim must match the requested
/// path — this is the URL-signed download contract distinct from the
/// generic `/blob/presigned-get` route, which trusts the token alone.
pub async fn download(State(app): State<App>, Path(rest): Path<String>, Query(q): Query<TokenQuery>) -> Result<Response> {
	let (namespace, key) = split_namespace_key(&rest)?;
	let claims = presign::verify_get_token(&app.config.signing_secret, &q.token, now_ms())?;
	if claims.bucket != app.config.bucket || claims.key != service::full_key(namespace, key) {
		return Err(Error::Unauthorized);
	}
	let blob = app.blob_adapter.get(&claims.key).await?.ok_or(Error::NotFound)?;
	Ok(stream_response(blob))
}

/// `GET /blob/public/{*rest}`: pre-auth, served only when the object's
/// stored visibility is `public`. Missing and non-public objects both
/// come back as 404 so the route never confirms a private object's
/// existence to an unauthenticated caller.
pub async fn public(State(app): State<App>, Path(rest): Path<String>) -> Result<Response> {
	let (namespace, key) = split_namespace_key(&rest)?;
	let meta = app.kv_adapter.get(&gateway_types::id::keys::blob_meta(namespace, key)).await?.ok_or(Error::NotFound)?;
	let meta: service::BlobMeta = serde_json::from_str(&meta)?;
	if meta.visibility != BlobVisibility::Public {
		return Err(Error::NotFound);
	}
	let blob = app.blob_adapter.get(&service::full_key(namespace, key)).await?.ok_or(Error::NotFound)?;
	Ok(stream_response(blob))
}

/// `PUT /blob/presigned-put?token=...`: redeems an upload token minted by
/// `presign_upload`. The token binds an exact content-type and
/// content-length; both the `Content-Type` header and the actual
/// written byte count must match, or the partially-written object is
/// removed and the request rejected.
pub async fn presigned_put(
	State(app): State<App>,
	Query(q): Query<TokenQuery>,
	headers: HeaderMap,
	body: Body,
) -> Result<StatusCode> {
	let claims = presign::verify_put_token(&app.config.signing_secret, &q.token, now_ms())?;
	if claims.bucket != app.config.bucket {
		return Err(Error::Unauthorized);
	}
	let content_type = header_str(&headers, header::CONTENT_TYPE.as_str()).unwrap_or_default();
	if content_type != claims.content_type {
		return Err(Error::InvalidRequest("Content-Type does not match presigned token".into()));
	}

	let written = app
		.blob_adapter
		.put(&claims.key, body_reader(body), BlobPutOpts { content_type: Some(claims.content_type.clone()) })
		.await?;
	if written != claims.content_length {
		let _ = app.blob_adapter.delete(&claims.key).await;
		return Err(Error::InvalidRequest("uploaded body length does not match presigned token".into()));
	}
	Ok(StatusCode::OK)
}

/// `GET /blob/presigned-get?token=...`: redeems a download token minted
/// by `presign_download`, independent of any path-embedded namespace.
pub async fn presigned_get(State(app): State<App>, Query(q): Query<TokenQuery>) -> Result<Response> {
	let claims = presign::verify_get_token(&app.config.signing_secret, &q.token, now_ms())?;
	if claims.bucket != app.config.bucket {
		return Err(Error::Unauthorized);
	}
	let blob = app.blob_adapter.get(&claims.key).await?.ok_or(Error::NotFound)?;
	Ok(stream_response(blob))
}

// vim: ts=4
