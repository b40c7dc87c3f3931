//! Channel operations: create, append, append-deletion, read, delete.
//! The atomic sequence-assignment discipline itself lives in the
//! `ChannelStore` adapter (see `channel-adapter-sqlite`); this module
//! owns authorization policy and the HMAC-capability-token integration
//! on top of it.

use gateway_core::prelude::*;
use gateway_identity::service as identity_service;
use gateway_token::capability::{self, ChannelPermission};
use gateway_types::id::keys;
use gateway_types::id::{new_author_nonce, new_channel_id, new_channel_secret};

const MAX_CONTENT_LEN: usize = 10_000;
const DEFAULT_READ_LIMIT: usize = 50;
const MAX_READ_LIMIT: usize = 100;

pub async fn create_channel(app: &App, name: String, owner_namespace: String) -> Result<ChannelMeta> {
	let id = new_channel_id();
	let secret = new_channel_secret();
	let meta = app.channel_adapter.create(&id, &name, &owner_namespace, &secret).await?;
	app.kv_adapter.put(&keys::channel_index(&owner_namespace, &id), &id).await?;
	Ok(meta)
}

pub async fn get_metadata(app: &App, channel_id: &str) -> Result<ChannelMeta> {
	app.channel_adapter.get_metadata(channel_id).await?.ok_or(Error::NotFound)
}

/// List every channel indexed under `namespace`, skipping index entries
/// whose channel has already been removed by `delete_channel`.
pub async fn list_channels(app: &App, namespace: &str) -> Result<Vec<ChannelMeta>> {
	let listing = app
		.kv_adapter
		.list(ListOpts { prefix: Some(keys::channel_index_prefix(namespace)), limit: None, cursor: None })
		.await?;
	let mut out = Vec::with_capacity(listing.keys.len());
	for entry in listing.keys {
		let Some(channel_id) = app.kv_adapter.get(&entry.name).await? else { continue };
		if let Some(meta) = app.channel_adapter.get_metadata(&channel_id).await? {
			out.push(meta);
		}
	}
	Ok(out)
}

/// The resolved caller behind a channel operation: either the identity
/// authenticated by API key (checked against its effective capabilities,
/// scoped to the channel's `ownerNamespace`), or the permission set and
/// bound `authorId` carried by a capability token.
pub enum ChannelCaller {
	ApiKey { author_id: String, perms: Vec<EffectivePermission> },
	Token(capability::CapabilityToken),
}

/// Resolve the caller from whichever of `Authorization`/`X-Channel-Token`
/// is present, per the dual-auth contract: a capability token always
/// wins if both are supplied, since third parties redeeming a token
/// never hold the owning credential.
pub async fn resolve_caller(
	app: &App,
	meta: &ChannelMeta,
	api_key_header: Option<&str>,
	channel_token_header: Option<&str>,
	caller_supplied_author_id: Option<String>,
) -> Result<ChannelCaller> {
	if let Some(token) = channel_token_header {
		let verified = capability::verify(token, &meta.secret, now_ms())?;
		if verified.channel_id != meta.channel_id {
			return Err(Error::Forbidden);
		}
		return Ok(ChannelCaller::Token(verified));
	}

	if let Some(ctx) = resolve_api_key_header(app, api_key_header).await? {
		let author_id = caller_supplied_author_id.ok_or_else(|| {
			Error::InvalidRequest("authorId is required when authenticating with an API key".into())
		})?;
		let perms = identity_service::resolve_effective_permissions(app, &ctx.identity).await?;
		return Ok(ChannelCaller::ApiKey { author_id, perms });
	}

	Err(Error::Unauthorized)
}

fn require_namespace_capability(perms: &[EffectivePermission], capability: &str, namespace: &str) -> Result<()> {
	if identity_service::has_capability(perms, capability, Some(namespace)) {
		Ok(())
	} else {
		Err(Error::Forbidden)
	}
}

pub async fn append(app: &App, meta: &ChannelMeta, caller: &ChannelCaller, content: String) -> Result<ChannelEvent> {
	if content.chars().count() > MAX_CONTENT_LEN {
		return Err(Error::InvalidRequest(format!("content exceeds {MAX_CONTENT_LEN} characters")));
	}
	let author_id = match caller {
		ChannelCaller::ApiKey { author_id, perms } => {
			require_namespace_capability(perms, "channel:append", &meta.owner_namespace)?;
			author_id.clone()
		}
		ChannelCaller::Token(token) => {
			if !token.has(ChannelPermission::Append) {
				return Err(Error::Forbidden);
			}
			token.author_id.clone()
		}
	};
	let channel_id = meta.channel_id.clone();
	let lock_key = channel_id.clone();
	app.channel_locks
		.with_lock(&lock_key, || async move { app.channel_adapter.append(&channel_id, AppendMessage { author_id, content }).await })
		.await
}

pub async fn append_deletion(app: &App, meta: &ChannelMeta, caller: &ChannelCaller, target_seq: u64) -> Result<ChannelEvent> {
	let author_id = match caller {
		ChannelCaller::ApiKey { author_id, perms } => {
			require_namespace_capability(perms, "channel:admin", &meta.owner_namespace)?;
			author_id.clone()
		}
		ChannelCaller::Token(token) => {
			let target = app.channel_adapter.get_event(&meta.channel_id, target_seq).await?.ok_or(Error::NotFound)?;
			if token.has(ChannelPermission::DeleteAny) {
				token.author_id.clone()
			} else if token.has(ChannelPermission::DeleteOwn) && target.author_id == token.author_id {
				token.author_id.clone()
			} else {
				return Err(Error::Forbidden);
			}
		}
	};
	app.channel_adapter.append_deletion(&meta.channel_id, AppendDeletion { author_id, target_seq }).await
}

pub struct ReadArgs {
	pub after_seq: Option<u64>,
	pub limit: Option<usize>,
	pub include_deleted: bool,
}

pub async fn read(app: &App, meta: &ChannelMeta, caller: &ChannelCaller, args: ReadArgs) -> Result<ReadResult> {
	match caller {
		ChannelCaller::ApiKey { perms, .. } => {
			require_namespace_capability(perms, "channel:read", &meta.owner_namespace)?;
		}
		ChannelCaller::Token(token) => {
			if !token.has(ChannelPermission::Read) {
				return Err(Error::Forbidden);
			}
			if args.include_deleted && !token.has(ChannelPermission::ReadDeleted) {
				return Err(Error::Forbidden);
			}
		}
	}

	let limit = args.limit.unwrap_or(DEFAULT_READ_LIMIT).min(MAX_READ_LIMIT).max(1);
	app.channel_adapter
		.read(&meta.channel_id, ReadOpts { after_seq: args.after_seq.unwrap_or(0), limit, include_deleted: args.include_deleted })
		.await
}

pub async fn delete_channel(app: &App, meta: &ChannelMeta) -> Result<()> {
	app.channel_adapter.delete(&meta.channel_id).await?;
	app.kv_adapter.delete(&keys::channel_index(&meta.owner_namespace, &meta.channel_id)).await
}

/// `channel/token/create`: mint a v1 HMAC capability token bound to this
/// channel's secret. `author_id` defaults to a random 4-hex nonce when
/// the caller does not supply one (e.g. a link shared before the
/// recipient has chosen a display name).
pub async fn create_capability_token(
	app: &App,
	channel_id: &str,
	permissions: Vec<ChannelPermission>,
	author_id: Option<String>,
	expires_in_secs: i64,
) -> Result<String> {
	let meta = get_metadata(app, channel_id).await?;
	let author_id = author_id.unwrap_or_else(new_author_nonce);
	let expires_at = now_ms() + expires_in_secs * 1000;
	capability::issue(channel_id, &meta.secret, permissions, author_id, expires_at)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	use channel_adapter_sqlite::ChannelAdapterSqlite;
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

	async fn test_app() -> App {
		let kv = Arc::new(KvAdapterSqlite::in_memory().await.unwrap());
		let channel = Arc::new(ChannelAdapterSqlite::in_memory().await.unwrap());
		build_app(
			test_config(),
			Adapters {
				kv_adapter: kv,
				blob_adapter: Arc::new(NoopBlob),
				channel_adapter: channel,
				shortlink_adapter: Arc::new(NoopShortlink),
			},
			Extensions::new(),
		)
	}

	fn owner_caller(author_id: &str) -> ChannelCaller {
		ChannelCaller::ApiKey {
			author_id: author_id.to_string(),
			perms: vec![
				EffectivePermission { capability: "channel:append".into(), resources: None },
				EffectivePermission { capability: "channel:read".into(), resources: None },
				EffectivePermission { capability: "channel:admin".into(), resources: None },
			],
		}
	}

	#[tokio::test]
	async fn append_then_read_round_trips() {
		let app = test_app().await;
		let meta = create_channel(&app, "c".into(), "ns1".into()).await.unwrap();
		let caller = owner_caller("alice");
		append(&app, &meta, &caller, "hi".into()).await.unwrap();

		let res = read(&app, &meta, &caller, ReadArgs { after_seq: None, limit: None, include_deleted: false }).await.unwrap();
		assert_eq!(res.events.len(), 1);
		assert_eq!(res.events[0].event.content.as_deref(), Some("hi"));
	}

	#[tokio::test]
	async fn oversized_content_is_rejected() {
		let app = test_app().await;
		let meta = create_channel(&app, "c".into(), "ns1".into()).await.unwrap();
		let caller = owner_caller("alice");
		let huge = "x".repeat(MAX_CONTENT_LEN + 1);
		assert!(append(&app, &meta, &caller, huge).await.is_err());
	}

	#[tokio::test]
	async fn apikey_caller_without_namespace_capability_is_forbidden() {
		let app = test_app().await;
		let meta = create_channel(&app, "c".into(), "ns1".into()).await.unwrap();
		let caller = ChannelCaller::ApiKey { author_id: "alice".into(), perms: vec![] };
		assert!(append(&app, &meta, &caller, "hi".into()).await.is_err());
	}

	#[tokio::test]
	async fn token_without_append_permission_is_forbidden() {
		let app = test_app().await;
		let meta = create_channel(&app, "c".into(), "ns1".into()).await.unwrap();
		let token_str = create_capability_token(&app, &meta.channel_id, vec![ChannelPermission::Read], Some("bob".into()), 60).await.unwrap();
		let verified = capability::verify(&token_str, &meta.secret, now_ms()).unwrap();
		let caller = ChannelCaller::Token(verified);
		assert!(append(&app, &meta, &caller, "hi".into()).await.is_err());
	}

	#[tokio::test]
	async fn delete_own_rejects_other_authors_event() {
		let app = test_app().await;
		let meta = create_channel(&app, "c".into(), "ns1".into()).await.unwrap();
		let owner = owner_caller("owner");
		append(&app, &meta, &owner, "hi".into()).await.unwrap();

		let token_str = create_capability_token(
			&app,
			&meta.channel_id,
			vec![ChannelPermission::Read, ChannelPermission::DeleteOwn],
			Some("bob".into()),
			60,
		)
		.await
		.unwrap();
		let verified = capability::verify(&token_str, &meta.secret, now_ms()).unwrap();
		let caller = ChannelCaller::Token(verified);
		assert!(append_deletion(&app, &meta, &caller, 1).await.is_err());
	}

	#[tokio::test]
	async fn list_channels_reflects_create_and_delete() {
		let app = test_app().await;
		let a = create_channel(&app, "a".into(), "ns1".into()).await.unwrap();
		let _b = create_channel(&app, "b".into(), "ns1".into()).await.unwrap();
		create_channel(&app, "c".into(), "ns2".into()).await.unwrap();

		let ns1 = list_channels(&app, "ns1").await.unwrap();
		assert_eq!(ns1.len(), 2);

		delete_channel(&app, &a).await.unwrap();
		let ns1_after = list_channels(&app, "ns1").await.unwrap();
		assert_eq!(ns1_after.len(), 1);
	}
}

// vim: ts=4
