//! The `ChannelStore` adapter boundary.
//!
//! `append`/`append_deletion` carry the atomicity requirement described in
//! the component design: implementations must serialize writes per channel
//! (a lock per `channelId`, or an equivalent CAS loop) so that concurrently
//! racing callers still observe gap-free, unique, strictly-increasing
//! sequence numbers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMeta {
	pub channel_id: String,
	pub name: String,
	pub owner_namespace: String,
	pub created_at: i64,
	pub secret: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelEventType {
	Message,
	Deletion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEvent {
	pub id: String,
	pub seq: u64,
	pub author_id: String,
	#[serde(rename = "type")]
	pub kind: ChannelEventType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub target_seq: Option<u64>,
	pub created_at: i64,
}

pub struct AppendMessage {
	pub author_id: String,
	pub content: String,
}

pub struct AppendDeletion {
	pub author_id: String,
	pub target_seq: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ReadOpts {
	pub after_seq: u64,
	pub limit: usize,
	pub include_deleted: bool,
}

/// A raw channel event as returned from a read scan, annotated with
/// whether it has been soft-deleted (set by the read path, not stored).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibleEvent {
	#[serde(flatten)]
	pub event: ChannelEvent,
	pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct ReadResult {
	pub events: Vec<VisibleEvent>,
	pub has_more: bool,
}

#[async_trait]
pub trait ChannelStore: Send + Sync {
	async fn create(
		&self,
		channel_id: &str,
		name: &str,
		owner_namespace: &str,
		secret: &str,
	) -> Result<ChannelMeta>;
	async fn get_metadata(&self, channel_id: &str) -> Result<Option<ChannelMeta>>;
	async fn append(&self, channel_id: &str, msg: AppendMessage) -> Result<ChannelEvent>;
	async fn append_deletion(
		&self,
		channel_id: &str,
		del: AppendDeletion,
	) -> Result<ChannelEvent>;
	async fn read(&self, channel_id: &str, opts: ReadOpts) -> Result<ReadResult>;
	async fn get_event(&self, channel_id: &str, seq: u64) -> Result<Option<ChannelEvent>>;
	async fn delete(&self, channel_id: &str) -> Result<()>;
}

// vim: ts=4
