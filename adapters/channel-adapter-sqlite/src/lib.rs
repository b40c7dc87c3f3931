//! SQLite-backed `ChannelStore`.
//!
//! `append`/`append_deletion` carry the only atomicity requirement in the
//! adapter boundary: concurrent callers must observe gap-free, unique,
//! strictly-increasing sequence numbers for a given channel. This adapter
//! serializes writes through an in-process per-channel lock map (mirroring
//! the keyed-lock pattern used for per-document state elsewhere in this
//! codebase) and backs it with a `UNIQUE(channel_id, seq)` constraint as a
//! second line of defense against a bug in the lock discipline — a
//! conflicting insert fails loudly rather than silently duplicating a seq.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use gateway_types::channel_adapter::{
	AppendDeletion, AppendMessage, ChannelEvent, ChannelEventType, ChannelMeta, ChannelStore,
	ReadOpts, ReadResult, VisibleEvent,
};
use gateway_types::error::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row as _;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

async fn init_db(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS channels (
			channel_id text NOT NULL,
			name text NOT NULL,
			owner_namespace text NOT NULL,
			secret text NOT NULL,
			seq integer NOT NULL DEFAULT 0,
			created_at integer NOT NULL,
			PRIMARY KEY(channel_id)
		)",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS channel_events (
			channel_id text NOT NULL,
			seq integer NOT NULL,
			id text NOT NULL,
			author_id text NOT NULL,
			kind text NOT NULL,
			content text,
			target_seq integer,
			created_at integer NOT NULL,
			PRIMARY KEY(channel_id, seq)
		)",
	)
	.execute(pool)
	.await?;

	Ok(())
}

/// A keyed map of per-channel write locks, created lazily and evicted once
/// no other caller holds a reference.
#[derive(Default)]
struct ChannelLocks {
	inner: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ChannelLocks {
	fn get(&self, channel_id: &str) -> Arc<AsyncMutex<()>> {
		let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
		map.entry(channel_id.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	fn release(&self, channel_id: &str, lock: Arc<AsyncMutex<()>>) {
		drop(lock);
		let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
		if let Some(entry) = map.get(channel_id) {
			if Arc::strong_count(entry) <= 1 {
				map.remove(channel_id);
			}
		}
	}
}

pub struct ChannelAdapterSqlite {
	pool: SqlitePool,
	locks: ChannelLocks,
}

impl ChannelAdapterSqlite {
	pub async fn new(db_path: &Path) -> Result<Self> {
		let opts = SqliteConnectOptions::new().filename(db_path).create_if_missing(true);
		let pool = SqlitePoolOptions::new()
			.max_connections(8)
			.connect_with(opts)
			.await
			.map_err(|e| Error::Upstream(e.to_string()))?;
		init_db(&pool).await?;
		Ok(Self { pool, locks: ChannelLocks::default() })
	}

	pub async fn in_memory() -> Result<Self> {
		let opts = SqliteConnectOptions::new().filename(":memory:").create_if_missing(true);
		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.connect_with(opts)
			.await
			.map_err(|e| Error::Upstream(e.to_string()))?;
		init_db(&pool).await?;
		Ok(Self { pool, locks: ChannelLocks::default() })
	}

	async fn next_seq(&self, channel_id: &str) -> Result<u64> {
		let row = sqlx::query("SELECT seq FROM channels WHERE channel_id = ?1")
			.bind(channel_id)
			.fetch_optional(&self.pool)
			.await?
			.ok_or(Error::NotFound)?;
		Ok(row.get::<i64, _>("seq") as u64)
	}

	fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<ChannelEvent> {
		let kind_str: String = row.get("kind");
		let kind = match kind_str.as_str() {
			"message" => ChannelEventType::Message,
			"deletion" => ChannelEventType::Deletion,
			_ => return Err(Error::Upstream(format!("unknown event kind: {kind_str}"))),
		};
		Ok(ChannelEvent {
			id: row.get("id"),
			seq: row.get::<i64, _>("seq") as u64,
			author_id: row.get("author_id"),
			kind,
			content: row.get("content"),
			target_seq: row.get::<Option<i64>, _>("target_seq").map(|v| v as u64),
			created_at: row.get("created_at"),
		})
	}
}

#[async_trait]
impl ChannelStore for ChannelAdapterSqlite {
	async fn create(
		&self,
		channel_id: &str,
		name: &str,
		owner_namespace: &str,
		secret: &str,
	) -> Result<ChannelMeta> {
		let created_at = now_ms();
		sqlx::query(
			"INSERT INTO channels (channel_id, name, owner_namespace, secret, seq, created_at)
			 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
		)
		.bind(channel_id)
		.bind(name)
		.bind(owner_namespace)
		.bind(secret)
		.bind(created_at)
		.execute(&self.pool)
		.await?;

		Ok(ChannelMeta {
			channel_id: channel_id.to_string(),
			name: name.to_string(),
			owner_namespace: owner_namespace.to_string(),
			created_at,
			secret: secret.to_string(),
		})
	}

	async fn get_metadata(&self, channel_id: &str) -> Result<Option<ChannelMeta>> {
		let row = sqlx::query("SELECT channel_id, name, owner_namespace, secret, created_at FROM channels WHERE channel_id = ?1")
			.bind(channel_id)
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.map(|r| ChannelMeta {
			channel_id: r.get("channel_id"),
			name: r.get("name"),
			owner_namespace: r.get("owner_namespace"),
			created_at: r.get("created_at"),
			secret: r.get("secret"),
		}))
	}

	async fn append(&self, channel_id: &str, msg: AppendMessage) -> Result<ChannelEvent> {
		let lock = self.locks.get(channel_id);
		let result = async {
			let _guard = lock.lock().await;
			let seq = self.next_seq(channel_id).await?;
			let new_seq = seq + 1;
			let event = ChannelEvent {
				id: Uuid::new_v4().to_string(),
				seq: new_seq,
				author_id: msg.author_id,
				kind: ChannelEventType::Message,
				content: Some(msg.content),
				target_seq: None,
				created_at: now_ms(),
			};

			let mut tx = self.pool.begin().await?;
			sqlx::query("UPDATE channels SET seq = ?1 WHERE channel_id = ?2 AND seq = ?3")
				.bind(new_seq as i64)
				.bind(channel_id)
				.bind(seq as i64)
				.execute(&mut *tx)
				.await?;
			sqlx::query(
				"INSERT INTO channel_events (channel_id, seq, id, author_id, kind, content, target_seq, created_at)
				 VALUES (?1, ?2, ?3, ?4, 'message', ?5, NULL, ?6)",
			)
			.bind(channel_id)
			.bind(event.seq as i64)
			.bind(&event.id)
			.bind(&event.author_id)
			.bind(&event.content)
			.bind(event.created_at)
			.execute(&mut *tx)
			.await?;
			tx.commit().await?;

			Ok(event)
		}
		.await;
		self.locks.release(channel_id, lock);
		result
	}

	async fn append_deletion(&self, channel_id: &str, del: AppendDeletion) -> Result<ChannelEvent> {
		let lock = self.locks.get(channel_id);
		let result = async {
			let _guard = lock.lock().await;
			let seq = self.next_seq(channel_id).await?;
			let new_seq = seq + 1;
			let event = ChannelEvent {
				id: Uuid::new_v4().to_string(),
				seq: new_seq,
				author_id: del.author_id,
				kind: ChannelEventType::Deletion,
				content: None,
				target_seq: Some(del.target_seq),
				created_at: now_ms(),
			};

			let mut tx = self.pool.begin().await?;
			sqlx::query("UPDATE channels SET seq = ?1 WHERE channel_id = ?2 AND seq = ?3")
				.bind(new_seq as i64)
				.bind(channel_id)
				.bind(seq as i64)
				.execute(&mut *tx)
				.await?;
			sqlx::query(
				"INSERT INTO channel_events (channel_id, seq, id, author_id, kind, content, target_seq, created_at)
				 VALUES (?1, ?2, ?3, ?4, 'deletion', NULL, ?5, ?6)",
			)
			.bind(channel_id)
			.bind(event.seq as i64)
			.bind(&event.id)
			.bind(&event.author_id)
			.bind(event.target_seq.map(|s| s as i64))
			.bind(event.created_at)
			.execute(&mut *tx)
			.await?;
			tx.commit().await?;

			Ok(event)
		}
		.await;
		self.locks.release(channel_id, lock);
		result
	}

	async fn read(&self, channel_id: &str, opts: ReadOpts) -> Result<ReadResult> {
		let limit = opts.limit.max(1);
		// Tombstones and their targets are interleaved, so a window of
		// `limit` raw rows can contain fewer than `limit` visible events;
		// scan 3x and stop once enough visible events are collected, per
		// the documented scan strategy.
		let scan_budget = (limit * 3).max(limit + 1);

		let rows = sqlx::query(
			"SELECT id, seq, author_id, kind, content, target_seq, created_at
			 FROM channel_events WHERE channel_id = ?1 AND seq > ?2
			 ORDER BY seq ASC LIMIT ?3",
		)
		.bind(channel_id)
		.bind(opts.after_seq as i64)
		.bind(scan_budget as i64 + 1)
		.fetch_all(&self.pool)
		.await?;

		let mut raw = Vec::with_capacity(rows.len());
		for row in &rows {
			match Self::row_to_event(row) {
				Ok(ev) => raw.push(ev),
				Err(_) => continue, // fail-closed: skip unparseable rows
			}
		}

		let mut deleted: std::collections::HashSet<u64> = std::collections::HashSet::new();
		for ev in &raw {
			if ev.kind == ChannelEventType::Deletion {
				if let Some(target) = ev.target_seq {
					deleted.insert(target);
				}
			}
		}

		let mut visible = Vec::new();
		let mut considered = 0usize;
		let mut has_more = false;
		for ev in raw {
			considered += 1;
			if considered > scan_budget {
				has_more = true;
				break;
			}
			if ev.kind == ChannelEventType::Deletion {
				continue;
			}
			let is_deleted = deleted.contains(&ev.seq);
			if is_deleted && !opts.include_deleted {
				continue;
			}
			if visible.len() == limit {
				has_more = true;
				break;
			}
			visible.push(VisibleEvent { deleted: is_deleted, event: ev });
		}

		Ok(ReadResult { events: visible, has_more })
	}

	async fn get_event(&self, channel_id: &str, seq: u64) -> Result<Option<ChannelEvent>> {
		let row = sqlx::query(
			"SELECT id, seq, author_id, kind, content, target_seq, created_at
			 FROM channel_events WHERE channel_id = ?1 AND seq = ?2",
		)
		.bind(channel_id)
		.bind(seq as i64)
		.fetch_optional(&self.pool)
		.await?;
		row.map(|r| Self::row_to_event(&r)).transpose()
	}

	async fn delete(&self, channel_id: &str) -> Result<()> {
		let mut tx = self.pool.begin().await?;
		sqlx::query("DELETE FROM channel_events WHERE channel_id = ?1").bind(channel_id).execute(&mut *tx).await?;
		sqlx::query("DELETE FROM channels WHERE channel_id = ?1").bind(channel_id).execute(&mut *tx).await?;
		tx.commit().await?;
		Ok(())
	}
}

fn now_ms() -> i64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_millis() as i64)
		.unwrap_or(0)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc as StdArc;

	async fn store() -> ChannelAdapterSqlite {
		ChannelAdapterSqlite::in_memory().await.unwrap()
	}

	#[tokio::test]
	async fn append_assigns_sequential_seqs() {
		let ch = store().await;
		ch.create("ch1", "c", "ns1", "secret").await.unwrap();
		let e1 = ch.append("ch1", AppendMessage { author_id: "a".into(), content: "x".into() }).await.unwrap();
		let e2 = ch.append("ch1", AppendMessage { author_id: "a".into(), content: "y".into() }).await.unwrap();
		assert_eq!(e1.seq, 1);
		assert_eq!(e2.seq, 2);
	}

	#[tokio::test]
	async fn concurrent_appends_are_gap_free_and_unique() {
		let ch = StdArc::new(store().await);
		ch.create("ch1", "c", "ns1", "secret").await.unwrap();

		let mut handles = Vec::new();
		for i in 0..20 {
			let ch = ch.clone();
			handles.push(tokio::spawn(async move {
				ch.append("ch1", AppendMessage { author_id: "a".into(), content: format!("m{i}") }).await.unwrap()
			}));
		}
		let mut seqs: Vec<u64> = Vec::new();
		for h in handles {
			seqs.push(h.await.unwrap().seq);
		}
		seqs.sort_unstable();
		assert_eq!(seqs, (1..=20).collect::<Vec<_>>());
	}

	#[tokio::test]
	async fn read_hides_tombstoned_events_by_default() {
		let ch = store().await;
		ch.create("ch1", "c", "ns1", "secret").await.unwrap();
		ch.append("ch1", AppendMessage { author_id: "a".into(), content: "a".into() }).await.unwrap();
		ch.append("ch1", AppendMessage { author_id: "a".into(), content: "b".into() }).await.unwrap();
		ch.append("ch1", AppendMessage { author_id: "a".into(), content: "c".into() }).await.unwrap();
		ch.append_deletion("ch1", AppendDeletion { author_id: "a".into(), target_seq: 2 }).await.unwrap();

		let res = ch.read("ch1", ReadOpts { after_seq: 0, limit: 10, include_deleted: false }).await.unwrap();
		let seqs: Vec<u64> = res.events.iter().map(|e| e.event.seq).collect();
		assert_eq!(seqs, vec![1, 3]);
		assert!(!res.has_more);
	}

	#[tokio::test]
	async fn read_with_include_deleted_flags_tombstoned_targets() {
		let ch = store().await;
		ch.create("ch1", "c", "ns1", "secret").await.unwrap();
		ch.append("ch1", AppendMessage { author_id: "a".into(), content: "a".into() }).await.unwrap();
		ch.append("ch1", AppendMessage { author_id: "a".into(), content: "b".into() }).await.unwrap();
		ch.append_deletion("ch1", AppendDeletion { author_id: "a".into(), target_seq: 2 }).await.unwrap();

		let res = ch.read("ch1", ReadOpts { after_seq: 0, limit: 10, include_deleted: true }).await.unwrap();
		assert_eq!(res.events.len(), 2);
		assert!(!res.events[0].deleted);
		assert!(res.events[1].deleted);
		// Tombstones never appear as raw events regardless of the flag.
		assert!(res.events.iter().all(|e| e.event.kind == ChannelEventType::Message));
	}

	#[tokio::test]
	async fn delete_purges_events_and_metadata() {
		let ch = store().await;
		ch.create("ch1", "c", "ns1", "secret").await.unwrap();
		ch.append("ch1", AppendMessage { author_id: "a".into(), content: "a".into() }).await.unwrap();
		ch.delete("ch1").await.unwrap();
		assert!(ch.get_metadata("ch1").await.unwrap().is_none());
	}
}

// vim: ts=4
