//! Gateway entry point: load configuration, construct the storage
//! adapters and presigner, assemble the router, and serve it.

use std::sync::Arc;

use blob_adapter_fs::BlobAdapterFs;
use channel_adapter_sqlite::ChannelAdapterSqlite;
use gateway::build_router;
use gateway_core::config::BlobMode;
use gateway_core::prelude::*;
use gateway_types::presign_adapter::Presigner;
use kv_adapter_sqlite::KvAdapterSqlite;
use presign_adapter_s3::S3Presigner;
use shortlink_adapter_sqlite::ShortLinkAdapterSqlite;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
	let filter = std::env::var("GATEWAY_LOG")
		.or_else(|_| std::env::var("RUST_LOG"))
		.unwrap_or_else(|_| "info".to_string());
	tracing_subscriber::fmt().with_env_filter(EnvFilter::new(filter)).init();
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
	init_tracing();

	let config = Config::load()?;
	tracing::info!(listen = %config.listen, "starting gateway");

	let kv_adapter: Arc<dyn KVStore> =
		Arc::new(KvAdapterSqlite::new(&config.data_dir.join("gateway.db")).await?);
	let blob_adapter: Arc<dyn BlobStore> =
		Arc::new(BlobAdapterFs::new(config.data_dir.join("blobs")).await?);
	let channel_adapter: Arc<dyn ChannelStore> =
		Arc::new(ChannelAdapterSqlite::new(&config.data_dir.join("channels.db")).await?);
	let shortlink_adapter: Arc<dyn ShortLinkStore> =
		Arc::new(ShortLinkAdapterSqlite::new(&config.data_dir.join("shortlinks.db")).await?);

	let presigner: Arc<dyn Presigner> = match config.blob_mode {
		BlobMode::S3 => Arc::new(S3Presigner::from_env().await),
		BlobMode::Filesystem => Arc::new(gateway_blob::presign::GatewayPresigner::new(config.signing_secret.clone())),
	};

	let mut extensions = Extensions::new();
	extensions.insert::<Arc<dyn Presigner>>(presigner);

	let listen = config.listen.clone();
	let adapters = Adapters { kv_adapter, blob_adapter, channel_adapter, shortlink_adapter };
	let app = build_app(config, adapters, extensions);

	let router = build_router(app);
	let listener = tokio::net::TcpListener::bind(&listen).await?;
	tracing::info!(listen = %listen, "gateway listening");

	axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		let _ = tokio::signal::ctrl_c().await;
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
			}
			Err(err) => {
				tracing::warn!(error = %err, "failed to install SIGTERM handler");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}

	tracing::info!("shutdown signal received");
}

// vim: ts=4
