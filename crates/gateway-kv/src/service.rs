//! KV operations over `<namespace>:<key>` data, plus the one reserved
//! read carved out for `__ORG:permissions` (see [`get`]).

use std::collections::HashMap;

use gateway_core::prelude::*;
use gateway_identity::service as identity_service;
use gateway_types::id::is_valid_namespace;

fn full_key(namespace: &str, key: &str) -> String {
	format!("{namespace}:{key}")
}

/// Strip the `<namespace>:` prefix a full key was stored under, for
/// responses that are already scoped to one namespace.
fn strip_namespace<'a>(namespace: &str, full: &'a str) -> &'a str {
	full.strip_prefix(&format!("{namespace}:")).unwrap_or(full)
}

async fn require_read(app: &App, ctx: &AuthCtx, namespace: &str) -> Result<()> {
	let perms = identity_service::resolve_effective_permissions(app, &ctx.identity).await?;
	identity_service::authorize_namespace(app, &ctx.identity, &perms, "kv:read", namespace, false).await
}

async fn require_write(app: &App, ctx: &AuthCtx, namespace: &str) -> Result<()> {
	let perms = identity_service::resolve_effective_permissions(app, &ctx.identity).await?;
	identity_service::authorize_namespace(app, &ctx.identity, &perms, "kv:write", namespace, true).await
}

/// `kv/get`. The reserved `__ORG:permissions` row is a process-wide
/// default the adapter boundary synthesizes as `"{}"` when never
/// written (spec.md §4.1/§8 S6) — it has no owning identity, so it is
/// readable by any authenticated caller and bypasses namespace
/// validation entirely. Every other namespace must pass the regular
/// namespace-ownership check and may not start with `__`.
pub async fn get(app: &App, ctx: &AuthCtx, namespace: &str, key: &str) -> Result<Option<String>> {
	if namespace == "__ORG" && key == "permissions" {
		return get_with_org_default(app.kv_adapter.as_ref(), ORG_PERMISSIONS_KEY).await;
	}
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_read(app, ctx, namespace).await?;
	app.kv_adapter.get(&full_key(namespace, key)).await
}

pub async fn set(app: &App, ctx: &AuthCtx, namespace: &str, key: &str, value: &str) -> Result<()> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_write(app, ctx, namespace).await?;
	app.kv_adapter.put(&full_key(namespace, key), value).await
}

pub async fn delete(app: &App, ctx: &AuthCtx, namespace: &str, key: &str) -> Result<()> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_write(app, ctx, namespace).await?;
	app.kv_adapter.delete(&full_key(namespace, key)).await
}

pub async fn list_keys(
	app: &App,
	ctx: &AuthCtx,
	namespace: &str,
	prefix: Option<&str>,
	limit: Option<usize>,
	cursor: Option<String>,
) -> Result<ListResult> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_read(app, ctx, namespace).await?;
	let scan_prefix = format!("{namespace}:{}", prefix.unwrap_or(""));
	let result = app.kv_adapter.list(ListOpts { prefix: Some(scan_prefix), limit, cursor }).await?;
	Ok(ListResult {
		keys: result
			.keys
			.into_iter()
			.map(|e| KeyEntry { name: strip_namespace(namespace, &e.name).to_string() })
			.collect(),
		cursor: result.cursor,
		list_complete: result.list_complete,
	})
}

pub async fn bulk_get(
	app: &App,
	ctx: &AuthCtx,
	namespace: &str,
	keys_req: &[String],
) -> Result<HashMap<String, Option<String>>> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_read(app, ctx, namespace).await?;
	let mut out = HashMap::with_capacity(keys_req.len());
	for key in keys_req {
		let value = app.kv_adapter.get(&full_key(namespace, key)).await?;
		out.insert(key.clone(), value);
	}
	Ok(out)
}

pub async fn bulk_set(app: &App, ctx: &AuthCtx, namespace: &str, entries: &[(String, String)]) -> Result<()> {
	if !is_valid_namespace(namespace) {
		return Err(Error::InvalidRequest("namespace may not start with __".into()));
	}
	require_write(app, ctx, namespace).await?;
	for (key, value) in entries {
		app.kv_adapter.put(&full_key(namespace, key), value).await?;
	}
	Ok(())
}

/// Group every non-reserved key by its leading `namespace:` component,
/// restricted to namespaces the caller holds `kv:read` over. Used by
/// both `kv/namespaces` (distinct namespace names only) and `kv/dump`.
async fn scan_readable_namespaces(app: &App, ctx: &AuthCtx) -> Result<HashMap<String, Vec<(String, String)>>> {
	let perms = identity_service::resolve_effective_permissions(app, &ctx.identity).await?;
	let listing = app.kv_adapter.list(ListOpts { prefix: None, limit: None, cursor: None }).await?;

	let mut grouped: HashMap<String, Vec<(String, String)>> = HashMap::new();
	for entry in listing.keys {
		if entry.name.starts_with("__") {
			continue;
		}
		let Some((namespace, key)) = entry.name.split_once(':') else { continue };
		if !identity_service::has_capability(&perms, "kv:read", Some(namespace)) {
			continue;
		}
		let Some(value) = app.kv_adapter.get(&entry.name).await? else { continue };
		grouped.entry(namespace.to_string()).or_default().push((key.to_string(), value));
	}
	Ok(grouped)
}

pub async fn namespaces(app: &App, ctx: &AuthCtx) -> Result<Vec<String>> {
	let mut names: Vec<String> = scan_readable_namespaces(app, ctx).await?.into_keys().collect();
	names.sort();
	Ok(names)
}

pub async fn dump(app: &App, ctx: &AuthCtx) -> Result<HashMap<String, HashMap<String, String>>> {
	let grouped = scan_readable_namespaces(app, ctx).await?;
	Ok(grouped.into_iter().map(|(ns, entries)| (ns, entries.into_iter().collect())).collect())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

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
		build_app(
			test_config(),
			Adapters {
				kv_adapter: kv,
				blob_adapter: Arc::new(NoopBlob),
				channel_adapter: Arc::new(NoopChannel),
				shortlink_adapter: Arc::new(NoopShortlink),
			},
			Extensions::new(),
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
	async fn org_permissions_synthesizes_default_without_namespace_checks() {
		let app = test_app().await;
		let ctx = user_ctx("alice");
		let value = get(&app, &ctx, "__ORG", "permissions").await.unwrap();
		assert_eq!(value.as_deref(), Some("{}"));
	}

	#[tokio::test]
	async fn set_then_get_round_trips() {
		let app = test_app().await;
		let ctx = user_ctx("alice");
		set(&app, &ctx, "ns1", "foo", "bar").await.unwrap();
		let value = get(&app, &ctx, "ns1", "foo").await.unwrap();
		assert_eq!(value.as_deref(), Some("bar"));
	}

	#[tokio::test]
	async fn reserved_namespace_prefix_is_rejected() {
		let app = test_app().await;
		let ctx = user_ctx("alice");
		assert!(set(&app, &ctx, "__anything", "foo", "bar").await.is_err());
	}

	#[tokio::test]
	async fn second_identity_cannot_write_anothers_namespace() {
		let app = test_app().await;
		let alice = user_ctx("alice");
		let bob = user_ctx("bob");
		set(&app, &alice, "ns1", "foo", "bar").await.unwrap();
		assert!(matches!(set(&app, &bob, "ns1", "foo", "baz").await, Err(Error::Forbidden)));
	}

	#[tokio::test]
	async fn bulk_set_then_bulk_get_round_trips() {
		let app = test_app().await;
		let ctx = user_ctx("alice");
		bulk_set(&app, &ctx, "ns1", &[("a".into(), "1".into()), ("b".into(), "2".into())]).await.unwrap();
		let got = bulk_get(&app, &ctx, "ns1", &["a".into(), "b".into(), "c".into()]).await.unwrap();
		assert_eq!(got.get("a").cloned().flatten().as_deref(), Some("1"));
		assert_eq!(got.get("c").cloned().flatten(), None);
	}

	#[tokio::test]
	async fn namespaces_and_dump_reflect_writes() {
		let app = test_app().await;
		let ctx = user_ctx("alice");
		set(&app, &ctx, "ns1", "foo", "bar").await.unwrap();
		set(&app, &ctx, "ns2", "k", "v").await.unwrap();

		let names = namespaces(&app, &ctx).await.unwrap();
		assert!(names.contains(&"ns1".to_string()));
		assert!(names.contains(&"ns2".to_string()));

		let dumped = dump(&app, &ctx).await.unwrap();
		assert_eq!(dumped.get("ns1").and_then(|m| m.get("foo")).map(String::as_str), Some("bar"));
	}
}

// vim: ts=4
