//! SQLite-backed `ShortLinkStore`: a single table, no per-resource locking
//! needed since short links are create-once and never mutated.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use std::path::Path;

use async_trait::async_trait;
use gateway_types::error::{Error, Result};
use gateway_types::shortlink_adapter::{ShortLink, ShortLinkStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row as _;

async fn init_db(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS shortlinks (
			id text NOT NULL,
			target_url text NOT NULL,
			created_at integer NOT NULL,
			PRIMARY KEY(id)
		)",
	)
	.execute(pool)
	.await?;
	Ok(())
}

pub struct ShortLinkAdapterSqlite {
	pool: SqlitePool,
}

impl ShortLinkAdapterSqlite {
	pub async fn new(db_path: &Path) -> Result<Self> {
		let opts = SqliteConnectOptions::new().filename(db_path).create_if_missing(true);
		let pool = SqlitePoolOptions::new()
			.max_connections(8)
			.connect_with(opts)
			.await
			.map_err(|e| Error::Upstream(e.to_string()))?;
		init_db(&pool).await?;
		Ok(Self { pool })
	}

	pub async fn in_memory() -> Result<Self> {
		let opts = SqliteConnectOptions::new().filename(":memory:").create_if_missing(true);
		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.connect_with(opts)
			.await
			.map_err(|e| Error::Upstream(e.to_string()))?;
		init_db(&pool).await?;
		Ok(Self { pool })
	}
}

#[async_trait]
impl ShortLinkStore for ShortLinkAdapterSqlite {
	async fn create(&self, id: &str, target_url: &str) -> Result<ShortLink> {
		let created_at = std::time::SystemTime::now()
			.duration_since(std::time::UNIX_EPOCH)
			.map(|d| d.as_millis() as i64)
			.unwrap_or(0);
		sqlx::query("INSERT INTO shortlinks (id, target_url, created_at) VALUES (?1, ?2, ?3)")
			.bind(id)
			.bind(target_url)
			.bind(created_at)
			.execute(&self.pool)
			.await?;
		Ok(ShortLink { id: id.to_string(), target_url: target_url.to_string(), created_at })
	}

	async fn resolve(&self, id: &str) -> Result<Option<ShortLink>> {
		let row = sqlx::query("SELECT id, target_url, created_at FROM shortlinks WHERE id = ?1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.map(|r| ShortLink { id: r.get("id"), target_url: r.get("target_url"), created_at: r.get("created_at") }))
	}

	async fn delete(&self, id: &str) -> Result<()> {
		sqlx::query("DELETE FROM shortlinks WHERE id = ?1").bind(id).execute(&self.pool).await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn create_then_resolve_round_trips() {
		let store = ShortLinkAdapterSqlite::in_memory().await.unwrap();
		store.create("abc123", "https://example.com/target").await.unwrap();
		let link = store.resolve("abc123").await.unwrap().unwrap();
		assert_eq!(link.target_url, "https://example.com/target");
	}

	#[tokio::test]
	async fn resolve_missing_is_none() {
		let store = ShortLinkAdapterSqlite::in_memory().await.unwrap();
		assert!(store.resolve("nope").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn delete_removes_link() {
		let store = ShortLinkAdapterSqlite::in_memory().await.unwrap();
		store.create("abc123", "https://example.com").await.unwrap();
		store.delete("abc123").await.unwrap();
		assert!(store.resolve("abc123").await.unwrap().is_none());
	}
}

// vim: ts=4
