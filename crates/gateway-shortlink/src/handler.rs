//! HTTP handlers for `/short`, `/short/:id`, and the public `/s/:id`
//! resolver.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use gateway_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::service;

#[derive(Deserialize)]
pub struct CreateReq {
	pub target_url: String,
}

#[derive(Serialize)]
pub struct ShortLinkRes {
	pub id: String,
	pub target_url: String,
	pub created_at: i64,
}

impl From<ShortLink> for ShortLinkRes {
	fn from(l: ShortLink) -> Self {
		ShortLinkRes { id: l.id, target_url: l.target_url, created_at: l.created_at }
	}
}

/// `POST /short`. Any authenticated identity may mint a short link.
pub async fn create(State(app): State<App>, _auth: Auth, Json(req): Json<CreateReq>) -> Result<Json<ShortLinkRes>> {
	let link = service::create_short_link(&app, req.target_url).await?;
	Ok(Json(ShortLinkRes::from(link)))
}

/// `DELETE /short/:id`. Requires `shortlink:admin`.
pub async fn delete(State(app): State<App>, Auth(ctx): Auth, Path(id): Path<String>) -> Result<StatusCode> {
	service::delete_short_link(&app, &ctx, &id).await?;
	Ok(StatusCode::NO_CONTENT)
}

/// `GET /s/:id`. Public; redirects to the stored target URL.
pub async fn resolve(State(app): State<App>, Path(id): Path<String>) -> Result<Redirect> {
	let link = service::resolve(&app, &id).await?;
	Ok(Redirect::to(&link.target_url))
}

// vim: ts=4
