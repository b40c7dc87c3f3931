//! Error taxonomy shared by every handler and adapter.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// The gateway's single error type.
///
/// Variants map 1:1 onto the HTTP status codes documented for the public
/// API; adapters and middleware convert their own error types into one of
/// these via the `From` impls below rather than leaking implementation
/// detail to callers.
#[derive(Debug)]
pub enum Error {
	Unauthorized,
	Forbidden,
	NotFound,
	InvalidRequest(String),
	Conflict(String),
	Upstream(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	fn status_and_body(&self) -> (StatusCode, serde_json::Value) {
		match self {
			Error::Unauthorized => {
				(StatusCode::UNAUTHORIZED, json!({ "code": "unauthorized", "message": "unauthorized" }))
			}
			Error::Forbidden => {
				(StatusCode::FORBIDDEN, json!({ "code": "forbidden", "message": "forbidden" }))
			}
			Error::NotFound => {
				(StatusCode::NOT_FOUND, json!({ "code": "not_found", "message": "not found" }))
			}
			Error::InvalidRequest(msg) => {
				(StatusCode::BAD_REQUEST, json!({ "code": "invalid_request", "message": msg }))
			}
			Error::Conflict(msg) => {
				(StatusCode::CONFLICT, json!({ "code": "conflict", "message": msg }))
			}
			Error::Upstream(msg) => {
				tracing::warn!(error = %msg, "upstream adapter error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					json!({ "code": "upstream", "message": "upstream storage error" }),
				)
			}
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let (status, body) = self.status_and_body();
		(status, Json(body)).into_response()
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::Unauthorized => write!(f, "unauthorized"),
			Error::Forbidden => write!(f, "forbidden"),
			Error::NotFound => write!(f, "not found"),
			Error::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
			Error::Conflict(msg) => write!(f, "conflict: {msg}"),
			Error::Upstream(msg) => write!(f, "upstream error: {msg}"),
		}
	}
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		match err.kind() {
			std::io::ErrorKind::NotFound => Error::NotFound,
			_ => Error::Upstream(err.to_string()),
		}
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::InvalidRequest(err.to_string())
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		match err {
			sqlx::Error::RowNotFound => Error::NotFound,
			other => Error::Upstream(other.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use http_body_util::BodyExt as _;

	async fn parts(err: Error) -> (StatusCode, serde_json::Value) {
		let resp = err.into_response();
		let status = resp.status();
		let bytes = resp.into_body().collect().await.unwrap().to_bytes();
		(status, serde_json::from_slice(&bytes).unwrap())
	}

	#[tokio::test]
	async fn unauthorized_is_401() {
		let (status, body) = parts(Error::Unauthorized).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		assert_eq!(body["code"], "unauthorized");
	}

	#[tokio::test]
	async fn upstream_hides_detail() {
		let (status, body) = parts(Error::Upstream("disk full".into())).await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(body["message"], "upstream storage error");
	}

	#[test]
	fn row_not_found_maps_to_not_found() {
		let err: Error = sqlx::Error::RowNotFound.into();
		assert!(matches!(err, Error::NotFound));
	}
}

// vim: ts=4
