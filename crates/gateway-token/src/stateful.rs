//! Stateful tokens: opaque ids persisted under `__TOKEN:<id>`, used for
//! the identity-claim and blob-access flows. Single-use actions are made
//! atomic against double-claim by combining a process-wide keyed lock on
//! the token id (the same `KeyedLocks` shape `gateway-core` uses for
//! channel writes) with a re-check of `state == unused` after acquiring
//! the lock — a racer that read the KV value before the lock was taken
//! still loses once it re-reads inside the lock.

use gateway_core::prelude::*;
use gateway_types::id::{keys, new_token_id};

async fn put_json<T: serde::Serialize>(app: &App, key: &str, value: &T) -> Result<()> {
	let body = serde_json::to_string(value)?;
	app.kv_adapter.put(key, &body).await
}

async fn get_json<T: serde::de::DeserializeOwned>(app: &App, key: &str) -> Result<Option<T>> {
	match app.kv_adapter.get(key).await? {
		Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
		None => Ok(None),
	}
}

pub async fn lookup(app: &App, token_id: &str) -> Result<StatefulToken> {
	get_json(app, &keys::token(token_id)).await?.ok_or(Error::NotFound)
}

/// Create a stateful token with the given payload, returning its id.
pub async fn create(
	app: &App,
	created_by: String,
	expires_in_secs: i64,
	label: Option<String>,
	payload: TokenPayload,
) -> Result<StatefulToken> {
	let now = now_ms();
	let action = match &payload {
		TokenPayload::IdentityClaim { .. } => TokenAction::IdentityClaim,
		TokenPayload::BlobAccess { .. } => TokenAction::BlobAccess,
	};
	let token = StatefulToken {
		id: new_token_id(),
		action,
		state: TokenState::Unused,
		created_by,
		created_at: now,
		expires_at: now + expires_in_secs * 1000,
		label,
		payload,
	};
	put_json(app, &keys::token(&token.id), &token).await?;
	Ok(token)
}

/// Atomically transition `token_id` from `unused` to `used`, returning
/// the token as it stood right before the transition. Fails `Conflict`
/// if another caller already consumed, revoked, or outran expiry.
pub async fn claim(app: &App, token_id: &str) -> Result<StatefulToken> {
	app.token_locks
		.with_lock(token_id, || async {
			let mut token: StatefulToken = lookup(app, token_id).await?;
			if !token.is_usable(now_ms()) {
				return Err(Error::Conflict("token already used, revoked, or expired".into()));
			}
			let snapshot = token.clone();
			token.state = TokenState::Used;
			put_json(app, &keys::token(token_id), &token).await?;
			Ok(snapshot)
		})
		.await
}

pub async fn revoke(app: &App, token_id: &str) -> Result<()> {
	app.token_locks
		.with_lock(token_id, || async {
			let mut token: StatefulToken = lookup(app, token_id).await?;
			token.state = TokenState::Revoked;
			put_json(app, &keys::token(token_id), &token).await
		})
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	use gateway_core::{AppState, app::Adapters, extensions::Extensions};
	use kv_adapter_sqlite::KvAdapterSqlite;

	async fn test_app() -> App {
		let kv = Arc::new(KvAdapterSqlite::in_memory().await.unwrap());
		Arc::new(AppState {
			config: test_config(),
			kv_adapter: kv.clone(),
			blob_adapter: Arc::new(NoopBlob),
			channel_adapter: Arc::new(NoopChannel),
			shortlink_adapter: Arc::new(NoopShortlink),
			channel_locks: gateway_core::app::KeyedLocks::new(),
			token_locks: gateway_core::app::KeyedLocks::new(),
			extensions: Extensions::new(),
		})
	}

	fn test_config() -> Config {
		Config {
			bootstrap_api_key: None,
			signing_secret: vec![0u8; 32],
			cors_origin: "*".into(),
			presign_expires_in: 3600,
			bucket: "default".into(),
			blob_mode: gateway_core::config::BlobMode::Filesystem,
			data_dir: std::env::temp_dir(),
			listen: "127.0.0.1:0".into(),
			admin_check_enabled: false,
			tls_mode: gateway_core::config::TlsMode::Off,
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

	#[tokio::test]
	async fn claim_race_has_exactly_one_winner() {
		let app = test_app().await;
		let token = create(
			&app,
			"admin".into(),
			3600,
			None,
			TokenPayload::IdentityClaim { identity_id: "ident_x".into() },
		)
		.await
		.unwrap();

		let app1 = app.clone();
		let app2 = app.clone();
		let id1 = token.id.clone();
		let id2 = token.id.clone();
		let (r1, r2) = tokio::join!(
			tokio::spawn(async move { claim(&app1, &id1).await }),
			tokio::spawn(async move { claim(&app2, &id2).await }),
		);
		let results = [r1.unwrap(), r2.unwrap()];
		let successes = results.iter().filter(|r| r.is_ok()).count();
		let conflicts = results.iter().filter(|r| matches!(r, Err(Error::Conflict(_)))).count();
		assert_eq!(successes, 1);
		assert_eq!(conflicts, 1);
	}

	#[tokio::test]
	async fn revoked_token_cannot_be_claimed() {
		let app = test_app().await;
		let token =
			create(&app, "admin".into(), 3600, None, TokenPayload::IdentityClaim { identity_id: "ident_x".into() })
				.await
				.unwrap();
		revoke(&app, &token.id).await.unwrap();
		assert!(claim(&app, &token.id).await.is_err());
	}
}

// vim: ts=4
