//! Blob operations: upload, metadata/get, delete, list, visibility, and
//! the two presign-issuing operations backed by whichever [`Presigner`]
//! the binary registered. Visibility is tracked as KV-side metadata
//! alongside each object (`__BLOB_META:<namespace>:<key>`) rather than
//! inside the `BlobStore` trait, keeping the storage adapter boundary
//! storage-only per spec.md §4.6.

use std::sync::Arc;

use gateway_core::prelude::*;
use gateway_identity::service as identity_service;
use gateway_types::id::{is_valid_namespace, keys};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobVisibility {
	Public,
	Presigned,
	Private,
}

impl BlobVisibility {
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"public" => Some(Self::Public),
			"presigned" => Some(Self::Presigned),
			"private" => Some(Self::Private),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobMeta {
	pub content_type: Option<String>,
	pub visibility: BlobVisibility,
	pub size: u64,
	pub created_at: i64,
}

pub fn full_key(namespace: &str, key: &str) -> String {
	format!("{namespace}:{key}")
}

async fn load_meta(app: &App, namespace: &str, key: &str) -> Result<Option<BlobMeta>> {
	match app.kv_adapter.get(&keys::blob_meta(namespace, key)).await? {
		Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
		None => Ok(None),
	}
}

async fn put_meta(app: &App, namespace: &str, key: &str, meta: &BlobMeta) -> Result<()> {
	let body = serde_json::to_string(meta)?;
	app.kv_adapter.put(&keys::blob_meta(namespace, key), &body).await
}

async fn require_read(app: &App, ctx: &AuthCtx, namespace: &str) -> Result<()> {
	let perms = identity_service::resolve_effective_permissions(app, &ctx.identity).await?;
	identity_service::authorize_namespace(app, &ctx.identity, &perms, "blob:read", namespace, false).await
}

async fn require_write(app: &App, ctx: &AuthCtx, namespace: &str) -> Result<()> {
	let perms = identity_service::resolve_effective_permissions(app, &ctx.identity).await?;
	identity_service::authorize_namespace(app, &ctx.identity, &perms, "blob:write", namespace, true).await
}

/// `blob/upload`: streams `body` straight into the configured
/// `BlobStore` without buffering the full object in memory.
pub async fn upload(
	app: &App,
	ctx: &AuthCtx,
	namespace: &str,
	key: &str,
	content_type: Option<String>,
	visibility: BlobVisibility,
	body: Box<dyn AsyncRead + Send + Unpin>,
) -> Result<BlobMeta> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_write(app, ctx, namespace).await?;
	let size = app
		.blob_adapter
		.put(&full_key(namespace, key), body, BlobPutOpts { content_type: content_type.clone() })
		.await?;
	let meta = BlobMeta { content_type, visibility, size, created_at: now_ms() };
	put_meta(app, namespace, key, &meta).await?;
	Ok(meta)
}

pub struct ObjectMeta {
	pub meta: BlobMeta,
	pub download_url: String,
}

/// `blob/get`: returns stored metadata plus a freshly-issued signed
/// download URL from the registered `Presigner`.
pub async fn get_metadata(app: &App, ctx: &AuthCtx, namespace: &str, key: &str) -> Result<ObjectMeta> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_read(app, ctx, namespace).await?;
	let meta = load_meta(app, namespace, key).await?.ok_or(Error::NotFound)?;
	let presigner = app.ext::<Arc<dyn Presigner>>()?;
	let download_url =
		presigner.presign_download(&app.config.bucket, &full_key(namespace, key), app.config.presign_expires_in).await?;
	Ok(ObjectMeta { meta, download_url })
}

pub async fn delete(app: &App, ctx: &AuthCtx, namespace: &str, key: &str) -> Result<()> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_write(app, ctx, namespace).await?;
	app.blob_adapter.delete(&full_key(namespace, key)).await?;
	app.kv_adapter.delete(&keys::blob_meta(namespace, key)).await
}

pub async fn list(
	app: &App,
	ctx: &AuthCtx,
	namespace: &str,
	prefix: Option<&str>,
	limit: Option<usize>,
	cursor: Option<String>,
) -> Result<BlobListResult> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_read(app, ctx, namespace).await?;
	let scan_prefix = format!("{namespace}:{}", prefix.unwrap_or(""));
	let result = app.blob_adapter.list(BlobListOpts { prefix: Some(scan_prefix), limit, cursor }).await?;
	Ok(BlobListResult {
		objects: result
			.objects
			.into_iter()
			.map(|o| BlobObject {
				key: o.key.strip_prefix(&format!("{namespace}:")).unwrap_or(&o.key).to_string(),
				size: o.size,
			})
			.collect(),
		truncated: result.truncated,
		cursor: result.cursor,
	})
}

pub async fn set_visibility(
	app: &App,
	ctx: &AuthCtx,
	namespace: &str,
	key: &str,
	visibility: BlobVisibility,
) -> Result<()> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_write(app, ctx, namespace).await?;
	let mut meta = load_meta(app, namespace, key).await?.ok_or(Error::NotFound)?;
	meta.visibility = visibility;
	put_meta(app, namespace, key, &meta).await
}

/// `blob/presign-upload`: issues a gateway- or S3-terminated upload URL
/// bound to an exact content-type and content-length, without writing
/// anything yet — the object is written later when the caller redeems
/// the URL.
pub async fn presign_upload(
	app: &App,
	ctx: &AuthCtx,
	namespace: &str,
	key: &str,
	content_type: &str,
	content_length: u64,
) -> Result<String> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_write(app, ctx, namespace).await?;
	let presigner = app.ext::<Arc<dyn Presigner>>()?;
	presigner
		.presign_upload(&app.config.bucket, &full_key(namespace, key), content_type, content_length, app.config.presign_expires_in)
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	use gateway_core::app::{Adapters, build_app};
	use gateway_core::config::{BlobMode, TlsMode};
	use gateway_core::extensions::Extensions;
	use gateway_core::Config;
	use kv_adapter_sqlite::KvAdapterSqlite;

	fn test_config() -> Config {
		Config {
			bootstrap_api_key: None,
			signing_secret: vec![0u8; 32],
			cors_origin: "*".into(),
			presign_expires_in: 3600,
			bucket: "default".into(),
			blob_mode: BlobMode::Filesystem,
			data_dir: std::env::temp_dir(),
			listen: "127.0.0.1:0".into(),
			admin_check_enabled: false,
			tls_mode: TlsMode::Off,
		}
	}

	struct NoopChannel;
	#[async_trait::async_trait]
	impl ChannelStore for NoopChannel {
		async fn create(&self, _id: &str, _name: &str, _ns: &str, _secret: &str) -> Result<ChannelMeta> {
			Err(Error::Upstream("unused in test".into()))
		}
		async fn get_metadata(&self, _id: &str) -> Result<Option<ChannelMeta>> {
			Ok(None)
		}
		async fn append(&self, _id: &str, _msg: AppendMessage) -> Result<ChannelEvent> {
			Err(Error::Upstream("unused in test".into()))
		}
		async fn append_deletion(&self, _id: &str, _del: AppendDeletion) -> Result<ChannelEvent> {
			Err(Error::Upstream("unused in test".into()))
		}
		async fn read(&self, _id: &str, _opts: ReadOpts) -> Result<ReadResult> {
			Ok(ReadResult { events: vec![], has_more: false })
		}
		async fn get_event(&self, _id: &str, _seq: u64) -> Result<Option<ChannelEvent>> {
			Ok(None)
		}
		async fn delete(&self, _id: &str) -> Result<()> {
			Ok(())
		}
	}

	struct NoopShortlink;
	#[async_trait::async_trait]
	impl ShortLinkStore for NoopShortlink {
		async fn create(&self, _id: &str, _target_url: &str) -> Result<ShortLink> {
			Err(Error::Upstream("unused in test".into()))
		}
		async fn resolve(&self, _id: &str) -> Result<Option<ShortLink>> {
			Ok(None)
		}
		async fn delete(&self, _id: &str) -> Result<()> {
			Ok(())
		}
	}

	struct StubPresigner;
	#[async_trait::async_trait]
	impl Presigner for StubPresigner {
		async fn presign_upload(&self, _b: &str, key: &str, _ct: &str, _len: u64, _exp: i64) -> Result<String> {
			Ok(format!("/blob/presigned-put?token=stub-{key}"))
		}
		async fn presign_download(&self, _b: &str, key: &str, _exp: i64) -> Result<String> {
			Ok(format!("/blob/presigned-get?token=stub-{key}"))
		}
	}

	async fn test_app() -> App {
		let kv = Arc::new(KvAdapterSqlite::in_memory().await.unwrap());
		let blob_dir = tempfile::tempdir().unwrap();
		let blob = Arc::new(blob_adapter_fs::BlobAdapterFs::new(blob_dir.path().to_path_buf()).await.unwrap());
		let mut extensions = Extensions::new();
		extensions.insert::<Arc<dyn Presigner>>(Arc::new(StubPresigner));
		build_app(
			test_config(),
			Adapters { kv_adapter: kv, blob_adapter: blob, channel_adapter: Arc::new(NoopChannel), shortlink_adapter: Arc::new(NoopShortlink) },
			extensions,
		)
	}

	fn user_ctx(id: &str) -> AuthCtx {
		AuthCtx {
			identity: Identity {
				id: id.to_string(),
				kind: IdentityType::User,
				display_name: id.to_string(),
				status: IdentityStatus::Active,
				created_at: 0,
				created_by: None,
				app_config: None,
			},
			credential: Credential {
				id: "cred".into(),
				identity_id: id.to_string(),
				kind: CredentialType::ApiKey,
				secret_hash: "hash".into(),
				status: CredentialStatus::Active,
				created_at: 0,
				expires_at: None,
			},
		}
	}

	#[tokio::test]
	async fn upload_then_get_metadata_round_trips() {
		let app = test_app().await;
		let ctx = user_ctx("alice");
		upload(&app, &ctx, "ns1", "f.txt", Some("text/plain".into()), BlobVisibility::Private, Box::new(Cursor::new(b"hello".to_vec())))
			.await
			.unwrap();

		let got = get_metadata(&app, &ctx, "ns1", "f.txt").await.unwrap();
		assert_eq!(got.meta.size, 5);
		assert!(got.download_url.contains("presigned-get"));
	}

	#[tokio::test]
	async fn second_identity_cannot_write_anothers_namespace() {
		let app = test_app().await;
		let alice = user_ctx("alice");
		let bob = user_ctx("bob");
		upload(&app, &alice, "ns1", "f.txt", None, BlobVisibility::Private, Box::new(Cursor::new(b"x".to_vec()))).await.unwrap();
		assert!(matches!(
			upload(&app, &bob, "ns1", "f.txt", None, BlobVisibility::Private, Box::new(Cursor::new(b"y".to_vec()))).await,
			Err(Error::Forbidden)
		));
	}

	#[tokio::test]
	async fn delete_removes_object_and_metadata() {
		let app = test_app().await;
		let ctx = user_ctx("alice");
		upload(&app, &ctx, "ns1", "f.txt", None, BlobVisibility::Private, Box::new(Cursor::new(b"x".to_vec()))).await.unwrap();
		delete(&app, &ctx, "ns1", "f.txt").await.unwrap();
		assert!(get_metadata(&app, &ctx, "ns1", "f.txt").await.is_err());
	}

	#[tokio::test]
	async fn set_visibility_updates_stored_meta() {
		let app = test_app().await;
		let ctx = user_ctx("alice");
		upload(&app, &ctx, "ns1", "f.txt", None, BlobVisibility::Private, Box::new(Cursor::new(b"x".to_vec()))).await.unwrap();
		set_visibility(&app, &ctx, "ns1", "f.txt", BlobVisibility::Public).await.unwrap();
		let got = get_metadata(&app, &ctx, "ns1", "f.txt").await.unwrap();
		assert_eq!(got.meta.visibility, BlobVisibility::Public);
	}
}

// vim: ts=4
