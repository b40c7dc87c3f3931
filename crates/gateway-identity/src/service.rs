//! Identity, credential, and grant operations.

use gateway_core::middleware::now_ms;
use gateway_core::prelude::*;
use gateway_types::id::{keys, new_identity_id, random_base62};
use sha2::{Digest as _, Sha256};

pub fn hash_secret(secret: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(secret.as_bytes());
	gateway_types::id::hex_encode(&hasher.finalize())
}

fn new_secret() -> String {
	random_base62(32)
}

pub struct NewIdentity {
	pub identity: Identity,
	pub credential: Credential,
	pub secret: String,
}

/// Derive an app namespace from its origin: lowercase, strip scheme,
/// `.` and `:` become `_`.
pub fn derive_app_namespace(origin: &str) -> String {
	let stripped =
		origin.strip_prefix("https://").or_else(|| origin.strip_prefix("http://")).unwrap_or(origin);
	stripped.to_lowercase().replace(['.', ':'], "_")
}

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

/// `identity/create`: mints a new identity plus its first credential.
/// Returns the plaintext secret exactly once — callers are responsible
/// for surfacing it in the response and never persisting it themselves.
pub async fn create_identity(
	app: &App,
	kind: IdentityType,
	display_name: String,
	created_by: Option<String>,
) -> Result<NewIdentity> {
	let id = new_identity_id();
	let now = now_ms();

	let identity = Identity {
		id: id.clone(),
		kind,
		display_name,
		status: IdentityStatus::Active,
		created_at: now,
		created_by,
		app_config: None,
	};

	let secret = new_secret();
	let secret_hash = hash_secret(&secret);
	let credential = Credential {
		id: random_base62(16),
		identity_id: id.clone(),
		kind: CredentialType::ApiKey,
		secret_hash: secret_hash.clone(),
		status: CredentialStatus::Active,
		created_at: now,
		expires_at: None,
	};

	put_json(app, &keys::identity(&id), &identity).await?;
	put_json(app, &keys::credential(&secret_hash), &credential).await?;
	app.kv_adapter.put(&keys::credential_id_index(&credential.id), &id).await?;

	Ok(NewIdentity { identity, credential, secret })
}

pub struct RegisteredApp {
	pub identity: Identity,
	pub created: bool,
}

/// `identity/app/register`: idempotent upsert keyed by the app's derived
/// namespace. New capabilities are merged into `grantedCapabilities` as a
/// set union, so re-registration never narrows an app's access.
pub async fn register_app(
	app: &App,
	origin: String,
	display_name: String,
	new_capabilities: Vec<String>,
) -> Result<RegisteredApp> {
	let namespace = derive_app_namespace(&origin);
	let origin_key = keys::app_origin(&namespace);

	if let Some(existing_id) = app.kv_adapter.get(&origin_key).await? {
		let mut identity: Identity =
			get_json(app, &keys::identity(&existing_id)).await?.ok_or(Error::NotFound)?;
		if let Some(cfg) = identity.app_config.as_mut() {
			for cap in new_capabilities {
				if !cfg.granted_capabilities.contains(&cap) {
					cfg.granted_capabilities.push(cap);
				}
			}
		}
		put_json(app, &keys::identity(&existing_id), &identity).await?;
		return Ok(RegisteredApp { identity, created: false });
	}

	let id = new_identity_id();
	let now = now_ms();
	let identity = Identity {
		id: id.clone(),
		kind: IdentityType::App,
		display_name,
		status: IdentityStatus::Active,
		created_at: now,
		created_by: None,
		app_config: Some(AppConfig {
			origin,
			namespace: namespace.clone(),
			granted_capabilities: new_capabilities,
			frame_access: false,
		}),
	};

	put_json(app, &keys::identity(&id), &identity).await?;
	app.kv_adapter.put(&origin_key, &id).await?;

	Ok(RegisteredApp { identity, created: true })
}

pub struct Invitation {
	pub identity: Identity,
	pub token_id: String,
	pub expires_at: i64,
}

/// `identity/invite`: creates a claimable identity, grants over the given
/// resources, and a stateful identity-claim token.
pub async fn invite(
	app: &App,
	display_name: String,
	created_by: String,
	capability: String,
	resources: Vec<GrantResource>,
	expires_in_secs: i64,
) -> Result<Invitation> {
	let id = new_identity_id();
	let now = now_ms();

	let identity = Identity {
		id: id.clone(),
		kind: IdentityType::User,
		display_name,
		status: IdentityStatus::Claimable,
		created_at: now,
		created_by: Some(created_by.clone()),
		app_config: None,
	};
	put_json(app, &keys::identity(&id), &identity).await?;

	let grant = Grant {
		grant_id: random_base62(16),
		identity_id: id.clone(),
		capability,
		source: "invitation".to_string(),
		source_id: id.clone(),
		scope: GrantScope { resources },
		granted_by: created_by,
		granted_at: now,
	};
	put_json(app, &keys::grant(&grant.grant_id), &grant).await?;

	let expires_at = now + expires_in_secs * 1000;
	let token = StatefulToken {
		id: gateway_types::id::new_token_id(),
		action: TokenAction::IdentityClaim,
		state: TokenState::Unused,
		created_by: identity.created_by.clone().unwrap_or_default(),
		created_at: now,
		expires_at,
		label: None,
		payload: TokenPayload::IdentityClaim { identity_id: id.clone() },
	};
	put_json(app, &keys::token(&token.id), &token).await?;

	Ok(Invitation { identity, token_id: token.id, expires_at })
}

/// `identity/delete`: flips status, revokes every credential, and drops
/// grants tied to the identity. Deletion is terminal.
pub async fn delete_identity(app: &App, identity_id: &str) -> Result<()> {
	let mut identity: Identity =
		get_json(app, &keys::identity(identity_id)).await?.ok_or(Error::NotFound)?;
	identity.status = IdentityStatus::Deleted;
	put_json(app, &keys::identity(identity_id), &identity).await?;

	let listing = app
		.kv_adapter
		.list(ListOpts { prefix: Some(keys::CREDENTIAL_PREFIX.to_string()), limit: None, cursor: None })
		.await?;
	for entry in listing.keys {
		if let Some(raw) = app.kv_adapter.get(&entry.name).await? {
			if let Ok(mut cred) = serde_json::from_str::<Credential>(&raw) {
				if cred.identity_id == identity_id {
					cred.status = CredentialStatus::Revoked;
					put_json(app, &entry.name, &cred).await?;
					app.kv_adapter.delete(&keys::credential_id_index(&cred.id)).await?;
				}
			}
		}
	}

	let grants = app
		.kv_adapter
		.list(ListOpts { prefix: Some(keys::GRANT_PREFIX.to_string()), limit: None, cursor: None })
		.await?;
	for entry in grants.keys {
		if let Some(raw) = app.kv_adapter.get(&entry.name).await? {
			if let Ok(grant) = serde_json::from_str::<Grant>(&raw) {
				if grant.identity_id == identity_id {
					app.kv_adapter.delete(&entry.name).await?;
				}
			}
		}
	}

	Ok(())
}

/// Activate a claimable identity and mint its first credential. Called by
/// the token subsystem once an `identity_claim` stateful token has been
/// atomically transitioned to `used`; the identity must currently be
/// `claimable` (an already-active identity has nothing to claim).
/// Returns the new credential's plaintext secret, shown exactly once.
pub async fn activate_claimed_identity(app: &App, identity_id: &str) -> Result<String> {
	let mut identity: Identity = get_json(app, &keys::identity(identity_id)).await?.ok_or(Error::NotFound)?;
	if identity.status != IdentityStatus::Claimable {
		return Err(Error::Conflict("identity is not claimable".into()));
	}
	identity.status = IdentityStatus::Active;
	put_json(app, &keys::identity(identity_id), &identity).await?;

	let now = now_ms();
	let secret = new_secret();
	let secret_hash = hash_secret(&secret);
	let credential = Credential {
		id: random_base62(16),
		identity_id: identity_id.to_string(),
		kind: CredentialType::ApiKey,
		secret_hash: secret_hash.clone(),
		status: CredentialStatus::Active,
		created_at: now,
		expires_at: None,
	};
	put_json(app, &keys::credential(&secret_hash), &credential).await?;
	app.kv_adapter.put(&keys::credential_id_index(&credential.id), identity_id).await?;

	Ok(secret)
}

/// Union of an identity's type-intrinsic powers and its matching grants.
pub async fn resolve_effective_permissions(
	app: &App,
	identity: &Identity,
) -> Result<Vec<EffectivePermission>> {
	let mut perms = Vec::new();

	match identity.kind {
		IdentityType::User | IdentityType::Service | IdentityType::Agent => {
			perms.push(EffectivePermission { capability: "kv:read".into(), resources: None });
			perms.push(EffectivePermission { capability: "kv:write".into(), resources: None });
			perms.push(EffectivePermission { capability: "blob:read".into(), resources: None });
			perms.push(EffectivePermission { capability: "blob:write".into(), resources: None });
			perms.push(EffectivePermission { capability: "channel:read".into(), resources: None });
			perms.push(EffectivePermission { capability: "channel:append".into(), resources: None });
			perms.push(EffectivePermission { capability: "channel:admin".into(), resources: None });
			perms.push(EffectivePermission { capability: "identity:admin".into(), resources: None });
			perms.push(EffectivePermission { capability: "shortlink:admin".into(), resources: None });
		}
		IdentityType::App => {
			if let Some(cfg) = &identity.app_config {
				for cap in &cfg.granted_capabilities {
					perms.push(EffectivePermission {
						capability: cap.clone(),
						resources: Some(vec![GrantResource {
							kind: "namespace".into(),
							id: cfg.namespace.clone(),
						}]),
					});
				}
			}
		}
		IdentityType::Anonymous => {}
	}

	let grants = app
		.kv_adapter
		.list(ListOpts { prefix: Some(keys::GRANT_PREFIX.to_string()), limit: None, cursor: None })
		.await?;
	for entry in grants.keys {
		if let Some(raw) = app.kv_adapter.get(&entry.name).await? {
			if let Ok(grant) = serde_json::from_str::<Grant>(&raw) {
				if grant.identity_id == identity.id {
					perms.push(EffectivePermission {
						capability: grant.capability,
						resources: Some(grant.scope.resources),
					});
				}
			}
		}
	}

	Ok(perms)
}

/// Check whether `perms` grants `capability` over `resource_id` (or
/// unscoped), used by handlers enforcing per-endpoint policy.
pub fn has_capability(perms: &[EffectivePermission], capability: &str, resource_id: Option<&str>) -> bool {
	perms.iter().any(|p| {
		if p.capability != capability {
			return false;
		}
		match (&p.resources, resource_id) {
			(None, _) => true,
			(Some(resources), Some(id)) => resources.iter().any(|r| r.id == id),
			(Some(_), None) => false,
		}
	})
}

/// Whether `perms` grants `capability` over `namespace` via an explicit
/// grant scoped to that namespace specifically (as opposed to an
/// identity's unscoped type-intrinsic powers).
fn has_explicit_namespace_grant(perms: &[EffectivePermission], capability: &str, namespace: &str) -> bool {
	perms.iter().any(|p| {
		p.capability == capability && p.resources.as_ref().is_some_and(|rs| rs.iter().any(|r| r.id == namespace))
	})
}

/// Authorize a namespace-scoped KV/blob operation, concretizing the
/// "exact mapping identity -> allowed namespaces" policy: a namespace is
/// implicitly owned by whichever identity first successfully writes to
/// it (`__NS_OWNER:<namespace>`); later access by a different identity
/// requires an explicit grant scoped to that namespace, even if the
/// identity's type otherwise carries the capability unscoped.
///
/// `claim_on_write` should be `true` for operations that create data in
/// a previously unowned namespace (so the gateway records the owner),
/// and `false` for read-only operations (which must not silently claim
/// an empty namespace).
pub async fn authorize_namespace(
	app: &App,
	identity: &Identity,
	perms: &[EffectivePermission],
	capability: &str,
	namespace: &str,
	claim_on_write: bool,
) -> Result<()> {
	if !has_capability(perms, capability, Some(namespace)) {
		return Err(Error::Forbidden);
	}

	let owner_key = keys::ns_owner(namespace);
	match app.kv_adapter.get(&owner_key).await? {
		None => {
			if claim_on_write {
				app.kv_adapter.put(&owner_key, &identity.id).await?;
			}
			Ok(())
		}
		Some(owner_id) if owner_id == identity.id => Ok(()),
		Some(_) => {
			if has_explicit_namespace_grant(perms, capability, namespace) {
				Ok(())
			} else {
				Err(Error::Forbidden)
			}
		}
	}
}


// vim: ts=4
