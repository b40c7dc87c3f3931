//! Request-scoped middleware: request-id tagging and the authentication
//! pipeline described in the component design.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use gateway_types::id::keys;
use gateway_types::prelude::*;
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use crate::app::App;
use crate::extract::{Auth, RequestId};

pub async fn request_id_middleware(mut req: Request<Body>, next: Next) -> Response {
	let id = Uuid::new_v4().to_string();
	req.extensions_mut().insert(RequestId(id.clone()));
	let span = tracing::info_span!("request", request_id = %id, path = %req.uri().path());
	let _guard = span.enter();
	next.run(req).await
}

fn sha256_hex(secret: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(secret.as_bytes());
	gateway_types::id::hex_encode(&hasher.finalize())
}

/// Parse `Authorization: ApiKey <secret>`. Returns `None` if the header is
/// absent or malformed (anything but `ApiKey <token-chars>`).
fn parse_api_key_header(value: &str) -> Option<&str> {
	let secret = value.strip_prefix("ApiKey ")?;
	if !secret.is_empty() && secret.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
		Some(secret)
	} else {
		None
	}
}

/// Resolve `Authorization: ApiKey <secret>` to an `AuthCtx` without going
/// through the mandatory middleware layer. Used by the handful of
/// dual-auth endpoints (channel append/read/delete-event) that accept
/// either an API key or a capability token and so cannot sit behind
/// `auth_middleware`'s unconditional 401-on-missing-header behavior.
pub async fn resolve_api_key_header(app: &App, header_value: Option<&str>) -> Result<Option<AuthCtx>> {
	let Some(header_value) = header_value else { return Ok(None) };
	let Some(secret) = parse_api_key_header(header_value) else { return Ok(None) };
	load_active_credential(app, secret).await
}

async fn load_active_credential(app: &App, secret: &str) -> Result<Option<AuthCtx>> {
	let hash = sha256_hex(secret);
	let Some(raw) = app.kv_adapter.get(&keys::credential(&hash)).await? else {
		return Ok(None);
	};
	let credential: Credential = serde_json::from_str(&raw)?;
	if credential.status != CredentialStatus::Active {
		return Ok(None);
	}
	if let Some(expires_at) = credential.expires_at {
		if now_ms() > expires_at {
			return Ok(None);
		}
	}
	let Some(raw_identity) = app.kv_adapter.get(&keys::identity(&credential.identity_id)).await? else {
		return Ok(None);
	};
	let identity: Identity = serde_json::from_str(&raw_identity)?;
	if identity.status != IdentityStatus::Active {
		return Ok(None);
	}
	Ok(Some(AuthCtx { identity, credential }))
}

async fn any_identity_exists(app: &App) -> Result<bool> {
	let res = app
		.kv_adapter
		.list(ListOpts { prefix: Some("__IDENTITY:".to_string()), limit: Some(1), cursor: None })
		.await?;
	Ok(!res.keys.is_empty())
}

pub fn now_ms() -> i64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_millis() as i64)
		.unwrap_or(0)
}

/// Gate every non-public path. Populates the `Auth` extension on success
/// per the contract in the component design: bootstrap key first, then
/// hashed-credential lookup, then the active-identity check. Rejection
/// reasons are logged but never surfaced — every failure maps to 401.
pub async fn auth_middleware(State(app): State<App>, mut req: Request<Body>, next: Next) -> Response {
	let header = req
		.headers()
		.get(axum::http::header::AUTHORIZATION)
		.and_then(|v| v.to_str().ok())
		.map(str::to_string);

	let Some(header) = header else {
		tracing::warn!(reason = "missing_header", "auth rejected");
		return Error::Unauthorized.into_response();
	};

	let Some(secret) = parse_api_key_header(&header) else {
		tracing::warn!(reason = "malformed_header", "auth rejected");
		return Error::Unauthorized.into_response();
	};

	if let Some(bootstrap_key) = &app.config.bootstrap_api_key {
		if secret == bootstrap_key {
			match any_identity_exists(&app).await {
				Ok(false) => {
					req.extensions_mut().insert(crate::extract::BootstrapAuth);
					return next.run(req).await;
				}
				Ok(true) => {
					tracing::warn!(reason = "bootstrap_locked_out", "auth rejected");
					return Error::Unauthorized.into_response();
				}
				Err(err) => {
					tracing::warn!(reason = "bootstrap_lookup_failed", error = %err, "auth rejected");
					return Error::Upstream(err.to_string()).into_response();
				}
			}
		}
	}

	match load_active_credential(&app, secret).await {
		Ok(Some(ctx)) => {
			req.extensions_mut().insert(Auth(ctx));
			next.run(req).await
		}
		Ok(None) => {
			tracing::warn!(reason = "unknown_or_inactive_credential", "auth rejected");
			Error::Unauthorized.into_response()
		}
		Err(err) => {
			tracing::warn!(reason = "lookup_failed", error = %err, "auth rejected");
			Error::Upstream(err.to_string()).into_response()
		}
	}
}

use axum::response::IntoResponse as _;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_well_formed_header() {
		assert_eq!(parse_api_key_header("ApiKey abc-123_XYZ"), Some("abc-123_XYZ"));
	}

	#[test]
	fn rejects_missing_scheme() {
		assert_eq!(parse_api_key_header("Bearer abc"), None);
	}

	#[test]
	fn rejects_embedded_whitespace() {
		assert_eq!(parse_api_key_header("ApiKey abc def"), None);
	}

	#[test]
	fn rejects_empty_secret() {
		assert_eq!(parse_api_key_header("ApiKey "), None);
	}
}

// vim: ts=4
