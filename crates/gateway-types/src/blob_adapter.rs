//! The `BlobStore` adapter boundary.

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::Result;

pub struct BlobBody {
	pub size: u64,
	pub content_type: Option<String>,
	pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

#[derive(Debug, Clone, Default)]
pub struct BlobPutOpts {
	pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BlobListOpts {
	pub prefix: Option<String>,
	pub limit: Option<usize>,
	pub cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BlobObject {
	pub key: String,
	pub size: u64,
}

#[derive(Debug, Clone)]
pub struct BlobListResult {
	pub objects: Vec<BlobObject>,
	pub truncated: bool,
	pub cursor: Option<String>,
}

/// A content-addressed blob store keyed by an opaque string key
/// (`<namespace>:<key>` by convention at the handler layer).
///
/// Bodies are streaming on both read and write; adapters must not require
/// the full object to be buffered in memory.
#[async_trait]
pub trait BlobStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<BlobBody>>;
	async fn put(
		&self,
		key: &str,
		body: Box<dyn AsyncRead + Send + Unpin>,
		opts: BlobPutOpts,
	) -> Result<u64>;
	async fn delete(&self, key: &str) -> Result<()>;
	async fn list(&self, opts: BlobListOpts) -> Result<BlobListResult>;
}

// vim: ts=4
