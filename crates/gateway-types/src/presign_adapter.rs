//! The `Presigner` adapter boundary: issues time-limited URLs for
//! uploading to or downloading from blob storage without requiring the
//! caller to hold a gateway credential at request time.
//!
//! Two implementations are specified: a delegated mode pointing directly
//! at an S3-compatible backend, and a gateway-terminated mode where the
//! URL resolves back to this gateway's own `/blob/presigned-{put,get}`
//! routes. Both are registered on [`crate::error::Result`]-returning
//! trait methods so either can fail with the shared error taxonomy.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Presigner: Send + Sync {
	/// Issue a time-limited upload URL bound to an exact content-type and
	/// content-length; the eventual PUT must match both exactly.
	async fn presign_upload(
		&self,
		bucket: &str,
		key: &str,
		content_type: &str,
		content_length: u64,
		expires_in_secs: i64,
	) -> Result<String>;

	/// Issue a time-limited download URL.
	async fn presign_download(&self, bucket: &str, key: &str, expires_in_secs: i64) -> Result<String>;
}

// vim: ts=4
