//! Core infrastructure for the gateway: app state, configuration, the
//! authentication middleware, and the extractors handlers use to read
//! request-scoped state.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod app;
pub mod config;
pub mod cors;
pub mod extensions;
pub mod extract;
pub mod middleware;
pub mod prelude;

pub use app::{Adapters, App, AppState};
pub use config::Config;
pub use extract::{Auth, BootstrapAuth, OptionalAuth, RequestId};

// vim: ts=4
