//! The `ShortLinkStore` adapter boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortLink {
	pub id: String,
	pub target_url: String,
	pub created_at: i64,
}

#[async_trait]
pub trait ShortLinkStore: Send + Sync {
	async fn create(&self, id: &str, target_url: &str) -> Result<ShortLink>;
	async fn resolve(&self, id: &str) -> Result<Option<ShortLink>>;
	async fn delete(&self, id: &str) -> Result<()>;
}

// vim: ts=4
