//! The `KVStore` adapter boundary.

use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct ListOpts {
	pub prefix: Option<String>,
	pub limit: Option<usize>,
	pub cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KeyEntry {
	pub name: String,
}

#[derive(Debug, Clone)]
pub struct ListResult {
	pub keys: Vec<KeyEntry>,
	pub cursor: Option<String>,
	pub list_complete: bool,
}

/// A namespaced key-value store.
///
/// Implementations back every higher-level entity in the gateway
/// (identities, credentials, grants, tokens, channel metadata) as well as
/// the raw `<namespace>:<key>` data surface exposed to callers. `get` is a
/// plain passthrough to the backing store, including for the reserved key
/// `__ORG:permissions`; callers that need that key to synthesize `"{}"`
/// when unwritten go through [`get_with_org_default`] instead of calling
/// `get` directly.
#[async_trait]
pub trait KVStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>>;
	async fn put(&self, key: &str, value: &str) -> Result<()>;
	async fn delete(&self, key: &str) -> Result<()>;
	async fn list(&self, opts: ListOpts) -> Result<ListResult>;
}

pub const ORG_PERMISSIONS_KEY: &str = "__ORG:permissions";

/// Wraps any `KVStore` so `get` synthesizes the reserved default.
///
/// Adapters implement the raw interface; this helper is applied at the one
/// call site that needs the reserved-key default (`gateway-kv`'s `get`
/// handler) rather than burdening every adapter with the same special case.
pub async fn get_with_org_default(store: &dyn KVStore, key: &str) -> Result<Option<String>> {
	if key == ORG_PERMISSIONS_KEY {
		match store.get(key).await? {
			Some(v) => Ok(Some(v)),
			None => Ok(Some("{}".to_string())),
		}
	} else {
		store.get(key).await
	}
}

// vim: ts=4
