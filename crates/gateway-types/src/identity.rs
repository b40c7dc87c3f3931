//! Domain types for identities, credentials, grants, and stateful tokens.
//!
//! These are pure data shapes with no storage behavior; `gateway-identity`
//! and `gateway-token` own the operations that create and mutate them. They
//! live here because the auth middleware (in `gateway-core`) and several
//! feature crates all need to read them off `AppState`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityType {
	User,
	Service,
	Agent,
	App,
	Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStatus {
	Active,
	Suspended,
	Deleted,
	Claimable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
	pub origin: String,
	pub namespace: String,
	#[serde(default)]
	pub granted_capabilities: Vec<String>,
	#[serde(default)]
	pub frame_access: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: IdentityType,
	pub display_name: String,
	pub status: IdentityStatus,
	pub created_at: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_by: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_config: Option<AppConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
	ApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
	Active,
	Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
	pub id: String,
	pub identity_id: String,
	#[serde(rename = "type")]
	pub kind: CredentialType,
	pub secret_hash: String,
	pub status: CredentialStatus,
	pub created_at: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantResource {
	#[serde(rename = "type")]
	pub kind: String,
	pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantScope {
	pub resources: Vec<GrantResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
	pub grant_id: String,
	pub identity_id: String,
	pub capability: String,
	pub source: String,
	pub source_id: String,
	pub scope: GrantScope,
	pub granted_by: String,
	pub granted_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAction {
	IdentityClaim,
	BlobAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
	Unused,
	Used,
	Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TokenPayload {
	IdentityClaim { identity_id: String },
	BlobAccess { bucket: String, key: String, content_type: String, content_length: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatefulToken {
	pub id: String,
	pub action: TokenAction,
	pub state: TokenState,
	pub created_by: String,
	pub created_at: i64,
	pub expires_at: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	pub payload: TokenPayload,
}

impl StatefulToken {
	pub fn is_usable(&self, now: i64) -> bool {
		self.state == TokenState::Unused && now <= self.expires_at
	}
}

/// The resolved caller identity for the current request, populated by the
/// authentication middleware and read back by handlers via the `Auth`
/// extractor.
#[derive(Debug, Clone)]
pub struct AuthCtx {
	pub identity: Identity,
	pub credential: Credential,
}

/// Resolved capability + scope for a caller, as returned by the
/// effective-permission resolver.
#[derive(Debug, Clone)]
pub struct EffectivePermission {
	pub capability: String,
	/// `None` means unscoped (the identity's own namespace/resources).
	pub resources: Option<Vec<GrantResource>>,
}

// vim: ts=4
