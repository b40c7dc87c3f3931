//! Short link creation, resolution, and admin deletion.

use gateway_core::prelude::*;
use gateway_identity::service as identity_service;
use gateway_types::id::new_shortlink_id;

pub async fn create_short_link(app: &App, target_url: String) -> Result<ShortLink> {
	let id = new_shortlink_id();
	app.shortlink_adapter.create(&id, &target_url).await
}

pub async fn resolve(app: &App, id: &str) -> Result<ShortLink> {
	app.shortlink_adapter.resolve(id).await?.ok_or(Error::NotFound)
}

/// `shortlink:admin` is required to delete any link — short links carry
/// no owning namespace of their own, so this is an unscoped capability
/// check rather than the namespace-ownership policy used by kv/blob.
pub async fn delete_short_link(app: &App, ctx: &AuthCtx, id: &str) -> Result<()> {
	let perms = identity_service::resolve_effective_permissions(app, &ctx.identity).await?;
	if !identity_service::has_capability(&perms, "shortlink:admin", None) {
		return Err(Error::Forbidden);
	}
	app.shortlink_adapter.delete(id).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	use gateway_core::app::{Adapters, build_app};
	use gateway_core::config::{BlobMode, TlsMode};
	use gateway_core::extensions::Extensions;
	use gateway_core::Config;
	use shortlink_adapter_sqlite::ShortLinkAdapterSqlite;

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

	struct NoopKv;
	#[async_trait::async_trait]
	impl KVStore for NoopKv {
		async fn get(&self, _key: &str) -> Result<Option<String>> {
			Ok(None)
		}
		async fn put(&self, _key: &str, _value: &str) -> Result<()> {
			Ok(())
		}
		async fn delete(&self, _key: &str) -> Result<()> {
			Ok(())
		}
		async fn list(&self, _opts: ListOpts) -> Result<ListResult> {
			Ok(ListResult { keys: vec![], cursor: None, list_complete: true })
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

	struct NoopBlob;
	#[async_trait::async_trait]
	impl BlobStore for NoopBlob {
		async fn get(&self, _key: &str) -> Result<Option<BlobBody>> {
			Ok(None)
		}
		async fn put(&self, _key: &str, _body: Box<dyn tokio::io::AsyncRead + Send + Unpin>, _opts: BlobPutOpts) -> Result<u64> {
			Ok(0)
		}
		async fn delete(&self, _key: &str) -> Result<()> {
			Ok(())
		}
		async fn list(&self, _opts: BlobListOpts) -> Result<BlobListResult> {
			Ok(BlobListResult { objects: vec![], truncated: false, cursor: None })
		}
	}

	async fn test_app() -> App {
		build_app(
			test_config(),
			Adapters {
				kv_adapter: Arc::new(NoopKv),
				blob_adapter: Arc::new(NoopBlob),
				channel_adapter: Arc::new(NoopChannel),
				shortlink_adapter: Arc::new(ShortLinkAdapterSqlite::in_memory().await.unwrap()),
			},
			Extensions::new(),
		)
	}

	fn admin_ctx() -> AuthCtx {
		AuthCtx {
			identity: Identity {
				id: "ident_admin".into(),
				kind: IdentityType::User,
				display_name: "admin".into(),
				status: IdentityStatus::Active,
				created_at: 0,
				created_by: None,
				app_config: None,
			},
			credential: Credential {
				id: "cred".into(),
				identity_id: "ident_admin".into(),
				kind: CredentialType::ApiKey,
				secret_hash: "hash".into(),
				status: CredentialStatus::Active,
				created_at: 0,
				expires_at: None,
			},
		}
	}

	#[tokio::test]
	async fn create_then_resolve_round_trips() {
		let app = test_app().await;
		let link = create_short_link(&app, "https://example.com/page".into()).await.unwrap();
		let resolved = resolve(&app, &link.id).await.unwrap();
		assert_eq!(resolved.target_url, "https://example.com/page");
	}

	#[tokio::test]
	async fn resolve_missing_is_not_found() {
		let app = test_app().await;
		assert!(matches!(resolve(&app, "doesnotexist").await, Err(Error::NotFound)));
	}

	#[tokio::test]
	async fn delete_then_resolve_fails() {
		let app = test_app().await;
		let ctx = admin_ctx();
		let link = create_short_link(&app, "https://example.com".into()).await.unwrap();
		delete_short_link(&app, &ctx, &link.id).await.unwrap();
		assert!(resolve(&app, &link.id).await.is_err());
	}
}

// vim: ts=4
