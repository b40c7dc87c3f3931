//! Application state.

use std::collections::HashMap;
use std::sync::Arc;

use gateway_types::prelude::*;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::Config;
use crate::extensions::Extensions;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A keyed map of per-resource write locks.
///
/// Channels and stateful-token claims both need single-writer discipline
/// scoped to one id; this is the shared shape for both lock maps on
/// `AppState`. Entries are created lazily on first use and never evicted —
/// the number of distinct channels/tokens created over a gateway's
/// lifetime is bounded by storage, so the lock map grows at the same rate
/// as the data it protects.
#[derive(Default)]
pub struct KeyedLocks {
	inner: std::sync::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
	pub fn new() -> Self {
		Self::default()
	}

	fn get(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
		map.entry(key.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	/// Run `f` while holding the exclusive lock for `key`, then drop the
	/// map entry if nobody else picked up a reference while we worked —
	/// keeps the map from growing by one entry per channel/token ever
	/// created.
	pub async fn with_lock<F, Fut, T>(&self, key: &str, f: F) -> T
	where
		F: FnOnce() -> Fut,
		Fut: std::future::Future<Output = T>,
	{
		let lock = self.get(key);
		let result = {
			let _guard = lock.lock().await;
			f().await
		};
		let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
		if let Some(entry) = map.get(key) {
			if Arc::strong_count(entry) <= 2 {
				map.remove(key);
			}
		}
		drop(lock);
		result
	}
}

pub struct AppState {
	pub config: Config,

	pub kv_adapter: Arc<dyn KVStore>,
	pub blob_adapter: Arc<dyn BlobStore>,
	pub channel_adapter: Arc<dyn ChannelStore>,
	pub shortlink_adapter: Arc<dyn ShortLinkStore>,

	/// Per-channel write locks serializing `append`/`appendDeletion`.
	pub channel_locks: KeyedLocks,
	/// Per-token locks serializing stateful-token claim/redeem.
	pub token_locks: KeyedLocks,

	/// Type-erased extension map for feature-specific state that doesn't
	/// belong on this struct directly (e.g. a `Presigner` trait object).
	pub extensions: Extensions,
}

impl AppState {
	pub fn ext<T: Send + Sync + 'static>(&self) -> Result<&T> {
		self.extensions
			.get::<T>()
			.ok_or_else(|| Error::Upstream(format!("extension {} not registered", std::any::type_name::<T>())))
	}
}

/// `App = Arc<AppState>`, shared by every clone of the `Router`.
pub type App = Arc<AppState>;

pub struct Adapters {
	pub kv_adapter: Arc<dyn KVStore>,
	pub blob_adapter: Arc<dyn BlobStore>,
	pub channel_adapter: Arc<dyn ChannelStore>,
	pub shortlink_adapter: Arc<dyn ShortLinkStore>,
}

pub fn build_app(config: Config, adapters: Adapters, extensions: Extensions) -> App {
	Arc::new(AppState {
		config,
		kv_adapter: adapters.kv_adapter,
		blob_adapter: adapters.blob_adapter,
		channel_adapter: adapters.channel_adapter,
		shortlink_adapter: adapters.shortlink_adapter,
		channel_locks: KeyedLocks::new(),
		token_locks: KeyedLocks::new(),
		extensions,
	})
}

// vim: ts=4
