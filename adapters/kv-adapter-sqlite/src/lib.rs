//! SQLite-backed `KVStore`: one `kv` table keyed by the full
//! `<namespace>:<key>` string (including the reserved `__PREFIX:` rows —
//! the table has no notion of namespace beyond the key's own text).

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use std::path::Path;

use async_trait::async_trait;
use gateway_types::error::{Error, Result};
use gateway_types::kv_adapter::{KVStore, KeyEntry, ListOpts, ListResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row as _;

pub struct KvAdapterSqlite {
	pool: SqlitePool,
}

async fn init_db(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS kv (
			key text NOT NULL,
			value text NOT NULL,
			PRIMARY KEY(key)
		)",
	)
	.execute(pool)
	.await?;
	Ok(())
}

impl KvAdapterSqlite {
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
impl KVStore for KvAdapterSqlite {
	async fn get(&self, key: &str) -> Result<Option<String>> {
		let row = sqlx::query("SELECT value FROM kv WHERE key = ?1")
			.bind(key)
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.map(|r| r.get::<String, _>("value")))
	}

	async fn put(&self, key: &str, value: &str) -> Result<()> {
		sqlx::query(
			"INSERT INTO kv (key, value) VALUES (?1, ?2)
			 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
		)
		.bind(key)
		.bind(value)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<()> {
		sqlx::query("DELETE FROM kv WHERE key = ?1").bind(key).execute(&self.pool).await?;
		Ok(())
	}

	async fn list(&self, opts: ListOpts) -> Result<ListResult> {
		let limit = opts.limit.unwrap_or(1000).min(10_000) as i64;
		// Lexicographic prefix scan; the cursor is the last key returned, so
		// pagination resumes with a strict `>` bound rather than an offset —
		// stable under concurrent writes to keys outside the current page.
		let after = opts.cursor.unwrap_or_default();
		let prefix = opts.prefix.unwrap_or_default();
		let upper_bound = prefix_upper_bound(&prefix);

		let rows = match &upper_bound {
			Some(upper) => {
				sqlx::query("SELECT key FROM kv WHERE key >= ?1 AND key < ?2 AND key > ?3 ORDER BY key ASC LIMIT ?4")
					.bind(&prefix)
					.bind(upper)
					.bind(&after)
					.bind(limit + 1)
					.fetch_all(&self.pool)
					.await?
			}
			None => {
				sqlx::query("SELECT key FROM kv WHERE key >= ?1 AND key > ?2 ORDER BY key ASC LIMIT ?3")
					.bind(&prefix)
					.bind(&after)
					.bind(limit + 1)
					.fetch_all(&self.pool)
					.await?
			}
		};

		let mut keys: Vec<KeyEntry> =
			rows.into_iter().map(|r| KeyEntry { name: r.get::<String, _>("key") }).collect();

		let list_complete = keys.len() <= limit as usize;
		let cursor = if list_complete {
			None
		} else {
			keys.truncate(limit as usize);
			keys.last().map(|k| k.name.clone())
		};

		Ok(ListResult { keys, cursor, list_complete })
	}
}

/// The lexicographically-smallest string that is not prefixed by `prefix`,
/// used to bound a prefix scan with a half-open range. `None` for an empty
/// prefix (the whole keyspace) or a prefix with no successor (all `0xff`
/// bytes, which cannot occur for valid UTF-8 key text in practice).
fn prefix_upper_bound(prefix: &str) -> Option<String> {
	if prefix.is_empty() {
		return None;
	}
	let mut chars: Vec<char> = prefix.chars().collect();
	while let Some(last) = chars.pop() {
		if let Some(next) = char::from_u32(last as u32 + 1) {
			chars.push(next);
			return Some(chars.into_iter().collect());
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn store() -> KvAdapterSqlite {
		KvAdapterSqlite::in_memory().await.unwrap()
	}

	#[tokio::test]
	async fn round_trips_a_value() {
		let kv = store().await;
		kv.put("ns1:a", "hello").await.unwrap();
		assert_eq!(kv.get("ns1:a").await.unwrap(), Some("hello".to_string()));
	}

	#[tokio::test]
	async fn missing_key_is_none() {
		let kv = store().await;
		assert_eq!(kv.get("ns1:missing").await.unwrap(), None);
	}

	#[tokio::test]
	async fn delete_removes_key() {
		let kv = store().await;
		kv.put("ns1:a", "x").await.unwrap();
		kv.delete("ns1:a").await.unwrap();
		assert_eq!(kv.get("ns1:a").await.unwrap(), None);
	}

	#[tokio::test]
	async fn list_scopes_to_prefix_and_stays_lexicographic() {
		let kv = store().await;
		kv.put("ns1:b", "1").await.unwrap();
		kv.put("ns1:a", "2").await.unwrap();
		kv.put("ns2:a", "3").await.unwrap();

		let res = kv.list(ListOpts { prefix: Some("ns1:".into()), limit: None, cursor: None }).await.unwrap();
		let names: Vec<_> = res.keys.iter().map(|k| k.name.as_str()).collect();
		assert_eq!(names, vec!["ns1:a", "ns1:b"]);
		assert!(res.list_complete);
	}

	#[tokio::test]
	async fn list_paginates_via_cursor() {
		let kv = store().await;
		for i in 0..5 {
			kv.put(&format!("ns:{i}"), "v").await.unwrap();
		}
		let page1 = kv.list(ListOpts { prefix: Some("ns:".into()), limit: Some(2), cursor: None }).await.unwrap();
		assert_eq!(page1.keys.len(), 2);
		assert!(!page1.list_complete);

		let page2 = kv
			.list(ListOpts { prefix: Some("ns:".into()), limit: Some(10), cursor: page1.cursor })
			.await
			.unwrap();
		assert_eq!(page2.keys.len(), 3);
		assert!(page2.list_complete);
	}

	#[tokio::test]
	async fn put_overwrites_existing_value() {
		let kv = store().await;
		kv.put("ns1:a", "1").await.unwrap();
		kv.put("ns1:a", "2").await.unwrap();
		assert_eq!(kv.get("ns1:a").await.unwrap(), Some("2".to_string()));
	}
}

// vim: ts=4
