//! HMAC capability tokens (channel tokens).
//!
//! Stateless: given the channel secret, a token encodes
//! `{channelId, permissions, authorId, expiresAt}` plus an HMAC-SHA256
//! signature over a canonical encoding. Wire format, the one canonical
//! version this gateway issues and accepts (closing the Open Question
//! in spec.md §9 over multiple token-encoding versions):
//!
//! ```text
//! v1.<base64url(channelId)>.<base64url(json payload)>.<base64url(hmac)>
//! ```
//!
//! Any prefix other than literally `v1.` is rejected as Unauthorized
//! before any parsing is attempted — this is the whole rejection policy
//! for future version bumps: a v2 verifier would add a new match arm,
//! never attempt to interpret a v1 payload as v2 or vice versa.

use base64::Engine as _;
use gateway_types::error::{Error, Result};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq as _;

const VERSION_PREFIX: &str = "v1.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPermission {
	Read,
	Append,
	ReadDeleted,
	DeleteOwn,
	DeleteAny,
}

impl ChannelPermission {
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"read" => Some(Self::Read),
			"append" => Some(Self::Append),
			"read:deleted" => Some(Self::ReadDeleted),
			"delete:own" => Some(Self::DeleteOwn),
			"delete:any" => Some(Self::DeleteAny),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenPayload {
	channel_id: String,
	permissions: Vec<ChannelPermission>,
	author_id: String,
	expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct CapabilityToken {
	pub channel_id: String,
	pub permissions: Vec<ChannelPermission>,
	pub author_id: String,
	pub expires_at: i64,
}

impl CapabilityToken {
	pub fn has(&self, perm: ChannelPermission) -> bool {
		self.permissions.contains(&perm)
	}
}

type HmacSha256 = Hmac<Sha256>;

fn sign(channel_secret: &str, channel_id_b64: &str, payload_b64: &str) -> Result<Vec<u8>> {
	let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
		.map_err(|e| Error::Upstream(format!("invalid hmac key: {e}")))?;
	mac.update(VERSION_PREFIX.as_bytes());
	mac.update(channel_id_b64.as_bytes());
	mac.update(b".");
	mac.update(payload_b64.as_bytes());
	Ok(mac.finalize().into_bytes().to_vec())
}

/// Issue a v1 capability token bound to `channel_secret`.
pub fn issue(
	channel_id: &str,
	channel_secret: &str,
	permissions: Vec<ChannelPermission>,
	author_id: String,
	expires_at: i64,
) -> Result<String> {
	let b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD;
	let channel_id_b64 = b64.encode(channel_id.as_bytes());

	let payload = TokenPayload { channel_id: channel_id.to_string(), permissions, author_id, expires_at };
	let payload_json = serde_json::to_vec(&payload)?;
	let payload_b64 = b64.encode(&payload_json);

	let sig = sign(channel_secret, &channel_id_b64, &payload_b64)?;
	let sig_b64 = b64.encode(&sig);

	Ok(format!("{VERSION_PREFIX}{channel_id_b64}.{payload_b64}.{sig_b64}"))
}

/// Verify a capability token against `channel_secret` and the current
/// time. Rejects unknown version prefixes, malformed wire format,
/// signature mismatch (constant-time compare), and expiry — all
/// collapsed to `Error::Unauthorized` per the propagation policy that a
/// token failure never reveals which check failed.
pub fn verify(token: &str, channel_secret: &str, now: i64) -> Result<CapabilityToken> {
	let rest = token.strip_prefix(VERSION_PREFIX).ok_or(Error::Unauthorized)?;
	let mut parts = rest.splitn(3, '.');
	let (channel_id_b64, payload_b64, sig_b64) =
		match (parts.next(), parts.next(), parts.next()) {
			(Some(a), Some(b), Some(c)) => (a, b, c),
			_ => return Err(Error::Unauthorized),
		};

	let b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD;
	let expected_sig = sign(channel_secret, channel_id_b64, payload_b64)?;
	let given_sig = b64.decode(sig_b64).map_err(|_| Error::Unauthorized)?;

	if expected_sig.ct_eq(&given_sig).unwrap_u8() != 1 {
		return Err(Error::Unauthorized);
	}

	let payload_json = b64.decode(payload_b64).map_err(|_| Error::Unauthorized)?;
	let payload: TokenPayload = serde_json::from_slice(&payload_json).map_err(|_| Error::Unauthorized)?;

	if now > payload.expires_at {
		return Err(Error::Unauthorized);
	}

	Ok(CapabilityToken {
		channel_id: payload.channel_id,
		permissions: payload.permissions,
		author_id: payload.author_id,
		expires_at: payload.expires_at,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_a_valid_token() {
		let token = issue("ch1", "secret", vec![ChannelPermission::Read, ChannelPermission::Append], "alice".into(), 1_000_000).unwrap();
		let verified = verify(&token, "secret", 500_000).unwrap();
		assert_eq!(verified.channel_id, "ch1");
		assert_eq!(verified.author_id, "alice");
		assert!(verified.has(ChannelPermission::Read));
		assert!(!verified.has(ChannelPermission::DeleteAny));
	}

	#[test]
	fn rejects_wrong_secret() {
		let token = issue("ch1", "secret", vec![ChannelPermission::Read], "alice".into(), 1_000_000).unwrap();
		assert!(verify(&token, "wrong-secret", 500_000).is_err());
	}

	#[test]
	fn rejects_expired_token() {
		let token = issue("ch1", "secret", vec![ChannelPermission::Read], "alice".into(), 100).unwrap();
		assert!(verify(&token, "secret", 200).is_err());
	}

	#[test]
	fn rejects_unknown_version_prefix() {
		assert!(verify("v2.whatever", "secret", 0).is_err());
	}

	#[test]
	fn rejects_tampered_payload() {
		let token = issue("ch1", "secret", vec![ChannelPermission::Read], "alice".into(), 1_000_000).unwrap();
		let mut tampered = token.clone();
		tampered.push('x');
		assert!(verify(&tampered, "secret", 500_000).is_err());
	}
}

// vim: ts=4
