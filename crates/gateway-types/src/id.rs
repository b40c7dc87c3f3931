//! Random id generation and reserved KV key conventions shared across crates.

use rand::Rng as _;

const BASE62: [u8; 62] = *b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a base62-encoded random id of `len` characters.
///
/// `len` characters of a 62-symbol alphabet carry `len * log2(62)` bits of
/// entropy; callers that need the ">=128 bits" floor from the data model
/// (stateful tokens) should pick `len` accordingly — 22 characters already
/// clears 128 bits.
pub fn random_base62(len: usize) -> String {
	let mut rng = rand::rng();
	(0..len).map(|_| BASE62[rng.random_range(0..BASE62.len())] as char).collect()
}

/// Generate `n` random bytes, hex-encoded.
pub fn random_hex(n: usize) -> String {
	let mut rng = rand::rng();
	let bytes: Vec<u8> = (0..n).map(|_| rng.random::<u8>()).collect();
	hex_encode(&bytes)
}

pub fn hex_encode(bytes: &[u8]) -> String {
	bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// `ident_<22 base62 chars>` — identity ids.
pub fn new_identity_id() -> String {
	format!("ident_{}", random_base62(22))
}

/// Stateful token ids: >=128 bits of entropy, base62, no prefix (they
/// travel in URLs and are meant to look opaque).
pub fn new_token_id() -> String {
	random_base62(22)
}

/// Short link ids: base62 of a 64-bit random value.
pub fn new_shortlink_id() -> String {
	random_base62(11)
}

/// 12 hex character channel id.
pub fn new_channel_id() -> String {
	random_hex(6)
}

/// 256-bit random channel HMAC secret, hex encoded.
pub fn new_channel_secret() -> String {
	random_hex(32)
}

/// 4 hex char author-id nonce used when a capability token caller supplies none.
pub fn new_author_nonce() -> String {
	random_hex(2)
}

/// Reserved KV key prefixes. All persistent entities other than raw user
/// data (`<namespace>:<key>`) live under one of these.
pub mod keys {
	pub fn identity(id: &str) -> String {
		format!("__IDENTITY:{id}")
	}

	pub fn credential(secret_hash: &str) -> String {
		format!("__CREDENTIAL:{secret_hash}")
	}

	pub const CREDENTIAL_PREFIX: &str = "__CREDENTIAL:";

	pub fn credential_id_index(credential_id: &str) -> String {
		format!("__CREDENTIAL_ID:{credential_id}")
	}

	pub fn grant(grant_id: &str) -> String {
		format!("__GRANT:{grant_id}")
	}

	pub const GRANT_PREFIX: &str = "__GRANT:";

	pub fn token(id: &str) -> String {
		format!("__TOKEN:{id}")
	}

	pub fn channel_owner(channel_id: &str) -> String {
		format!("__CHANNEL_OWNER:{channel_id}")
	}

	pub fn channel_index(namespace: &str, channel_id: &str) -> String {
		format!("__CHANNEL_INDEX:{namespace}:{channel_id}")
	}

	pub fn channel_index_prefix(namespace: &str) -> String {
		format!("__CHANNEL_INDEX:{namespace}:")
	}

	pub fn app_origin(namespace: &str) -> String {
		format!("__APP_ORIGIN:{namespace}")
	}

	pub fn shortlink(id: &str) -> String {
		format!("__SHORTLINK:{id}")
	}

	pub fn ns_owner(namespace: &str) -> String {
		format!("__NS_OWNER:{namespace}")
	}

	pub fn blob_meta(namespace: &str, key: &str) -> String {
		format!("__BLOB_META:{namespace}:{key}")
	}
}

/// Namespaces match `^[A-Za-z0-9._~:-]+$` and may not start with `__`.
pub fn is_valid_namespace(ns: &str) -> bool {
	if ns.starts_with("__") || ns.is_empty() {
		return false;
	}
	ns.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | ':' | '-'))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn random_base62_has_requested_length() {
		assert_eq!(random_base62(24).len(), 24);
	}

	#[test]
	fn identity_id_has_prefix() {
		assert!(new_identity_id().starts_with("ident_"));
	}

	#[test]
	fn channel_id_is_12_hex_chars() {
		let id = new_channel_id();
		assert_eq!(id.len(), 12);
		assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
	}

	#[test]
	fn namespace_validation_rejects_reserved_prefix() {
		assert!(!is_valid_namespace("__ORG"));
		assert!(!is_valid_namespace(""));
		assert!(is_valid_namespace("ns1"));
		assert!(is_valid_namespace("home.example.com"));
	}
}

// vim: ts=4
