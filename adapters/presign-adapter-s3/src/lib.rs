//! Presigner backed directly by an S3-compatible object store.
//!
//! Unlike [`gateway_blob::presign::GatewayPresigner`], this delegates to
//! the SDK's own request presigning: the issued URL resolves straight
//! against the configured endpoint, and the actual PUT/GET never
//! touches this gateway at all.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use gateway_types::error::{Error, Result};
use gateway_types::presign_adapter::Presigner;

pub struct S3Presigner {
	client: Client,
}

impl S3Presigner {
	pub fn new(client: Client) -> Self {
		Self { client }
	}

	/// Build a client from the ambient AWS environment
	/// (`AWS_ACCESS_KEY_ID`, `AWS_ENDPOINT_URL`, `AWS_REGION`, ...) — the
	/// same resolution order the AWS CLI uses, so an S3-compatible store
	/// like MinIO just needs `AWS_ENDPOINT_URL` set.
	pub async fn from_env() -> Self {
		let config = aws_config::load_from_env().await;
		Self { client: Client::new(&config) }
	}
}

fn to_duration(secs: i64) -> Result<Duration> {
	u64::try_from(secs).map(Duration::from_secs).map_err(|_| Error::InvalidRequest("expiry must be non-negative".into()))
}

#[async_trait]
impl Presigner for S3Presigner {
	async fn presign_upload(
		&self,
		bucket: &str,
		key: &str,
		content_type: &str,
		content_length: u64,
		expires_in_secs: i64,
	) -> Result<String> {
		let presigning_config =
			PresigningConfig::expires_in(to_duration(expires_in_secs)?).map_err(|e| Error::Upstream(e.to_string()))?;
		let presigned = self
			.client
			.put_object()
			.bucket(bucket)
			.key(key)
			.content_type(content_type)
			.content_length(content_length as i64)
			.presigned(presigning_config)
			.await
			.map_err(|e| Error::Upstream(e.to_string()))?;
		Ok(presigned.uri().to_string())
	}

	async fn presign_download(&self, bucket: &str, key: &str, expires_in_secs: i64) -> Result<String> {
		let presigning_config =
			PresigningConfig::expires_in(to_duration(expires_in_secs)?).map_err(|e| Error::Upstream(e.to_string()))?;
		let presigned = self
			.client
			.get_object()
			.bucket(bucket)
			.key(key)
			.presigned(presigning_config)
			.await
			.map_err(|e| Error::Upstream(e.to_string()))?;
		Ok(presigned.uri().to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn negative_expiry_is_rejected() {
		assert!(to_duration(-1).is_err());
	}

	#[test]
	fn positive_expiry_round_trips() {
		assert_eq!(to_duration(3600).unwrap(), Duration::from_secs(3600));
	}
}

// vim: ts=4
