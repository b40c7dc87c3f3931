//! Gateway-terminated presigned URLs.
//!
//! Mirrors the channel capability-token wire format in
//! `gateway-token::capability`: a version-prefixed, HMAC-SHA256-signed,
//! base64url payload. Two claim shapes, one per direction:
//!
//! ```text
//! v1.<base64url(json payload)>.<base64url(hmac)>
//! ```
//!
//! `PutClaims` binds the exact content-type and content-length the
//! eventual PUT must match; `GetClaims` only binds the object key. Any
//! prefix other than `v1.` is rejected before parsing, same policy as
//! the channel tokens.

use async_trait::async_trait;
use base64::Engine as _;
use gateway_core::middleware::now_ms;
use gateway_types::error::{Error, Result};
use gateway_types::presign_adapter::Presigner;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq as _;

const VERSION_PREFIX: &str = "v1.";
type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutClaims {
	pub bucket: String,
	pub key: String,
	pub content_type: String,
	pub content_length: u64,
	pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetClaims {
	pub bucket: String,
	pub key: String,
	pub expires_at: i64,
}

fn sign(secret: &[u8], payload_b64: &str) -> Result<Vec<u8>> {
	let mut mac =
		HmacSha256::new_from_slice(secret).map_err(|e| Error::Upstream(format!("invalid hmac key: {e}")))?;
	mac.update(VERSION_PREFIX.as_bytes());
	mac.update(payload_b64.as_bytes());
	Ok(mac.finalize().into_bytes().to_vec())
}

fn encode<T: Serialize>(secret: &[u8], payload: &T) -> Result<String> {
	let b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD;
	let payload_b64 = b64.encode(serde_json::to_vec(payload)?);
	let sig_b64 = b64.encode(sign(secret, &payload_b64)?);
	Ok(format!("{VERSION_PREFIX}{payload_b64}.{sig_b64}"))
}

fn decode<T: serde::de::DeserializeOwned>(secret: &[u8], token: &str) -> Result<T> {
	let rest = token.strip_prefix(VERSION_PREFIX).ok_or(Error::Unauthorized)?;
	let mut parts = rest.splitn(2, '.');
	let (payload_b64, sig_b64) = match (parts.next(), parts.next()) {
		(Some(a), Some(b)) => (a, b),
		_ => return Err(Error::Unauthorized),
	};

	let b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD;
	let expected_sig = sign(secret, payload_b64)?;
	let given_sig = b64.decode(sig_b64).map_err(|_| Error::Unauthorized)?;
	if expected_sig.ct_eq(&given_sig).unwrap_u8() != 1 {
		return Err(Error::Unauthorized);
	}

	let payload_json = b64.decode(payload_b64).map_err(|_| Error::Unauthorized)?;
	serde_json::from_slice(&payload_json).map_err(|_| Error::Unauthorized)
}

pub fn issue_put_token(secret: &[u8], claims: &PutClaims) -> Result<String> {
	encode(secret, claims)
}

pub fn verify_put_token(secret: &[u8], token: &str, now: i64) -> Result<PutClaims> {
	let claims: PutClaims = decode(secret, token)?;
	if now > claims.expires_at {
		return Err(Error::Unauthorized);
	}
	Ok(claims)
}

pub fn issue_get_token(secret: &[u8], claims: &GetClaims) -> Result<String> {
	encode(secret, claims)
}

pub fn verify_get_token(secret: &[u8], token: &str, now: i64) -> Result<GetClaims> {
	let claims: GetClaims = decode(secret, token)?;
	if now > claims.expires_at {
		return Err(Error::Unauthorized);
	}
	Ok(claims)
}

/// Gateway-terminated [`Presigner`]: issued URLs resolve back to this
/// gateway's own `/blob/presigned-{put,get}` routes rather than an
/// external object store.
pub struct GatewayPresigner {
	signing_secret: Vec<u8>,
}

impl GatewayPresigner {
	pub fn new(signing_secret: Vec<u8>) -> Self {
		Self { signing_secret }
	}
}

#[async_trait]
impl Presigner for GatewayPresigner {
	async fn presign_upload(
		&self,
		bucket: &str,
		key: &str,
		content_type: &str,
		content_length: u64,
		expires_in_secs: i64,
	) -> Result<String> {
		let claims = PutClaims {
			bucket: bucket.to_string(),
			key: key.to_string(),
			content_type: content_type.to_string(),
			content_length,
			expires_at: now_ms() + expires_in_secs * 1000,
		};
		let token = issue_put_token(&self.signing_secret, &claims)?;
		Ok(format!("/blob/presigned-put?token={token}"))
	}

	async fn presign_download(&self, bucket: &str, key: &str, expires_in_secs: i64) -> Result<String> {
		let claims =
			GetClaims { bucket: bucket.to_string(), key: key.to_string(), expires_at: now_ms() + expires_in_secs * 1000 };
		let token = issue_get_token(&self.signing_secret, &claims)?;
		Ok(format!("/blob/presigned-get?token={token}"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn put_token_round_trips() {
		let secret = b"secret".to_vec();
		let claims = PutClaims {
			bucket: "default".into(),
			key: "ns1:f.txt".into(),
			content_type: "text/plain".into(),
			content_length: 11,
			expires_at: 1_000_000,
		};
		let token = issue_put_token(&secret, &claims).unwrap();
		let verified = verify_put_token(&secret, &token, 500_000).unwrap();
		assert_eq!(verified.key, "ns1:f.txt");
		assert_eq!(verified.content_length, 11);
	}

	#[test]
	fn put_token_rejects_after_expiry() {
		let secret = b"secret".to_vec();
		let claims =
			PutClaims { bucket: "default".into(), key: "ns1:f".into(), content_type: "text/plain".into(), content_length: 1, expires_at: 100 };
		let token = issue_put_token(&secret, &claims).unwrap();
		assert!(matches!(verify_put_token(&secret, &token, 200), Err(Error::Unauthorized)));
	}

	#[test]
	fn get_token_rejects_wrong_secret() {
		let secret = b"secret".to_vec();
		let claims = GetClaims { bucket: "default".into(), key: "ns1:f".into(), expires_at: 1_000_000 };
		let token = issue_get_token(&secret, &claims).unwrap();
		assert!(verify_get_token(b"other-secret", &token, 0).is_err());
	}

	#[test]
	fn rejects_unknown_version_prefix() {
		let secret = b"secret".to_vec();
		assert!(matches!(verify_get_token(&secret, "v2.whatever", 0), Err(Error::Unauthorized)));
	}
}

// vim: ts=4
