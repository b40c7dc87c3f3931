//! Extractors reading request-scoped state set by the auth middleware.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use gateway_types::prelude::*;

/// The resolved caller, populated by [`crate::middleware::auth_middleware`].
///
/// Handlers behind the auth layer take this by value; it is always present
/// once the middleware has run, so extraction failure here indicates a
/// routing bug (a handler mounted without the auth layer), not a caller
/// error.
#[derive(Debug, Clone)]
pub struct Auth(pub AuthCtx);

impl<S> FromRequestParts<S> for Auth
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
		parts.extensions.get::<Auth>().cloned().ok_or(Error::Unauthorized)
	}
}

/// Like [`Auth`] but never rejects; used by the dual-mode channel routes
/// that accept either `Authorization: ApiKey` or `X-Channel-Token`, where
/// the capability-token branch never populates `Auth`.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<AuthCtx>);

impl<S> FromRequestParts<S> for OptionalAuth
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
		Ok(OptionalAuth(parts.extensions.get::<Auth>().cloned().map(|a| a.0)))
	}
}

/// Marker inserted instead of [`Auth`] when the caller authenticated with
/// the one-shot bootstrap key (no identity exists yet). Handlers that
/// allow the bootstrap escape hatch (`identity/create` while empty, the
/// admin-check endpoints) extract this directly; everything else only
/// takes `Auth` and so is unreachable via the bootstrap key.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapAuth;

impl<S> FromRequestParts<S> for BootstrapAuth
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
		parts.extensions.get::<BootstrapAuth>().copied().ok_or(Error::Unauthorized)
	}
}

/// A per-request id minted by [`crate::middleware::request_id_middleware`],
/// carried in the tracing span so adapter-level logs can be correlated
/// back to the originating request.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl<S> FromRequestParts<S> for RequestId
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
		parts.extensions.get::<RequestId>().cloned().ok_or(Error::Upstream("request id missing".into()))
	}
}

// vim: ts=4
