//! Convenience re-exports for downstream crates.

pub use crate::error::{Error, Result};
pub use crate::identity::{
	AppConfig, AuthCtx, Credential, CredentialStatus, CredentialType, EffectivePermission, Grant,
	GrantResource, GrantScope, Identity, IdentityStatus, IdentityType, StatefulToken, TokenAction,
	TokenPayload, TokenState,
};
pub use crate::kv_adapter::{
	KVStore, KeyEntry, ListOpts, ListResult, ORG_PERMISSIONS_KEY, get_with_org_default,
};
pub use crate::blob_adapter::{BlobBody, BlobListOpts, BlobListResult, BlobObject, BlobPutOpts, BlobStore};
pub use crate::channel_adapter::{
	AppendDeletion, AppendMessage, ChannelEvent, ChannelEventType, ChannelMeta, ChannelStore,
	ReadOpts, ReadResult, VisibleEvent,
};
pub use crate::shortlink_adapter::{ShortLink, ShortLinkStore};
pub use crate::presign_adapter::Presigner;

// vim: ts=4
