//! Convenience re-exports for downstream crates.

pub use gateway_types::prelude::*;

pub use crate::app::{Adapters, App, AppState, KeyedLocks, build_app};
pub use crate::config::Config;
pub use crate::extensions::Extensions;
pub use crate::extract::{Auth, BootstrapAuth, OptionalAuth, RequestId};
pub use crate::middleware::{now_ms, resolve_api_key_header};

// vim: ts=4
