//! Filesystem-backed `BlobStore`.
//!
//! Objects are sharded two levels deep by the first four hex characters of
//! a SHA-256 of the key, to avoid one huge flat directory — the same
//! shape this codebase uses for content-addressed file storage, adapted
//! here to shard by the caller-supplied key rather than a content hash
//! (blob keys in this gateway are caller-chosen, not derived from the
//! body). Writes land in a temp file and are renamed into place, so a
//! reader never observes a partially-written object; reads and writes are
//! both streaming and never buffer a full object in memory.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gateway_types::blob_adapter::{
	BlobBody, BlobListOpts, BlobListResult, BlobObject, BlobPutOpts, BlobStore,
};
use gateway_types::error::{Error, Result};
use sha2::{Digest as _, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt as _};
use tokio_util::io::ReaderStream;

fn shard_of(key: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(key.as_bytes());
	let digest = hasher.finalize();
	format!("{:02x}{:02x}", digest[0], digest[1])
}

fn obj_dir(base_dir: &Path, key: &str) -> PathBuf {
	let shard = shard_of(key);
	base_dir.join(&shard[0..2]).join(&shard[2..4])
}

fn obj_path(base_dir: &Path, key: &str) -> PathBuf {
	obj_dir(base_dir, key).join(sanitize(key))
}

fn meta_path(base_dir: &Path, key: &str) -> PathBuf {
	obj_dir(base_dir, key).join(format!("{}.meta", sanitize(key)))
}

/// Blob keys may contain `:` and other namespace-separator characters that
/// are awkward as bare filenames on some filesystems; percent-encode the
/// handful of characters that matter rather than pull in a URL-encoding
/// crate for one call site.
fn sanitize(key: &str) -> String {
	key.chars()
		.map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c.to_string() } else { format!("%{:02x}", c as u32) })
		.collect()
}

pub struct BlobAdapterFs {
	base_dir: PathBuf,
}

impl BlobAdapterFs {
	pub async fn new(base_dir: PathBuf) -> Result<Self> {
		tokio::fs::create_dir_all(&base_dir).await?;
		Ok(Self { base_dir })
	}
}

#[async_trait]
impl BlobStore for BlobAdapterFs {
	async fn get(&self, key: &str) -> Result<Option<BlobBody>> {
		let path = obj_path(&self.base_dir, key);
		let file = match File::open(&path).await {
			Ok(f) => f,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		let size = file.metadata().await?.len();
		let content_type = tokio::fs::read_to_string(meta_path(&self.base_dir, key)).await.ok();
		let stream = ReaderStream::new(file);
		let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(tokio_util::io::StreamReader::new(
			stream.map(|r| r.map_err(std::io::Error::from)),
		));
		Ok(Some(BlobBody { size, content_type, reader }))
	}

	async fn put(
		&self,
		key: &str,
		mut body: Box<dyn AsyncRead + Send + Unpin>,
		opts: BlobPutOpts,
	) -> Result<u64> {
		let dir = obj_dir(&self.base_dir, key);
		tokio::fs::create_dir_all(&dir).await?;

		let tmp_path = dir.join(format!("tmp-{}", gateway_types::id::random_base62(16)));
		let mut file = File::create(&tmp_path).await?;
		let written = match tokio::io::copy(&mut body, &mut file).await {
			Ok(n) => n,
			Err(e) => {
				let _ = tokio::fs::remove_file(&tmp_path).await;
				return Err(e.into());
			}
		};
		file.flush().await?;
		drop(file);

		tokio::fs::rename(&tmp_path, obj_path(&self.base_dir, key)).await?;

		if let Some(content_type) = opts.content_type {
			let mut meta = File::create(meta_path(&self.base_dir, key)).await?;
			meta.write_all(content_type.as_bytes()).await?;
		}

		Ok(written)
	}

	async fn delete(&self, key: &str) -> Result<()> {
		let path = obj_path(&self.base_dir, key);
		match tokio::fs::remove_file(&path).await {
			Ok(()) => {}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
			Err(e) => return Err(e.into()),
		}
		let _ = tokio::fs::remove_file(meta_path(&self.base_dir, key)).await;
		Ok(())
	}

	async fn list(&self, opts: BlobListOpts) -> Result<BlobListResult> {
		// The filesystem layout is sharded by key hash, not by prefix, so a
		// prefix-scoped list has to walk every shard and filter in memory.
		// Acceptable for the reference adapter; a production deployment
		// backed by an object store lists natively by prefix instead.
		let prefix = opts.prefix.unwrap_or_default();
		let limit = opts.limit.unwrap_or(1000);
		let mut objects = Vec::new();
		let mut truncated = false;

		let mut stack = vec![self.base_dir.clone()];
		'walk: while let Some(dir) = stack.pop() {
			let mut entries = match tokio::fs::read_dir(&dir).await {
				Ok(e) => e,
				Err(_) => continue,
			};
			while let Some(entry) = entries.next_entry().await? {
				let path = entry.path();
				if path.is_dir() {
					stack.push(path);
					continue;
				}
				let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
				if name.ends_with(".meta") || name.starts_with("tmp-") {
					continue;
				}
				let key = desanitize(name);
				if !key.starts_with(&prefix) {
					continue;
				}
				if objects.len() >= limit {
					truncated = true;
					break 'walk;
				}
				let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
				objects.push(BlobObject { key, size });
			}
		}

		objects.sort_by(|a, b| a.key.cmp(&b.key));
		Ok(BlobListResult { objects, truncated, cursor: None })
	}
}

fn desanitize(name: &str) -> String {
	let mut out = String::new();
	let mut chars = name.chars();
	while let Some(c) = chars.next() {
		if c == '%' {
			let hex: String = chars.by_ref().take(2).collect();
			if let Ok(code) = u32::from_str_radix(&hex, 16) {
				if let Some(ch) = char::from_u32(code) {
					out.push(ch);
					continue;
				}
			}
		}
		out.push(c);
	}
	out
}

use futures::StreamExt as _;

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	async fn store() -> (BlobAdapterFs, tempfile::TempDir) {
		let dir = tempfile::tempdir().unwrap();
		let adapter = BlobAdapterFs::new(dir.path().to_path_buf()).await.unwrap();
		(adapter, dir)
	}

	#[tokio::test]
	async fn put_then_get_round_trips_body_and_content_type() {
		let (store, _dir) = store().await;
		store
			.put("ns:file.txt", Box::new(Cursor::new(b"hello world".to_vec())), BlobPutOpts { content_type: Some("text/plain".into()) })
			.await
			.unwrap();

		let mut body = store.get("ns:file.txt").await.unwrap().unwrap();
		assert_eq!(body.size, 11);
		assert_eq!(body.content_type.as_deref(), Some("text/plain"));

		let mut buf = Vec::new();
		tokio::io::AsyncReadExt::read_to_end(&mut body.reader, &mut buf).await.unwrap();
		assert_eq!(buf, b"hello world");
	}

	#[tokio::test]
	async fn get_missing_key_is_none() {
		let (store, _dir) = store().await;
		assert!(store.get("ns:missing").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn delete_removes_object_and_metadata() {
		let (store, _dir) = store().await;
		store.put("ns:f", Box::new(Cursor::new(b"x".to_vec())), BlobPutOpts::default()).await.unwrap();
		store.delete("ns:f").await.unwrap();
		assert!(store.get("ns:f").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn list_filters_by_prefix() {
		let (store, _dir) = store().await;
		store.put("ns1:a", Box::new(Cursor::new(b"1".to_vec())), BlobPutOpts::default()).await.unwrap();
		store.put("ns1:b", Box::new(Cursor::new(b"2".to_vec())), BlobPutOpts::default()).await.unwrap();
		store.put("ns2:a", Box::new(Cursor::new(b"3".to_vec())), BlobPutOpts::default()).await.unwrap();

		let res = store.list(BlobListOpts { prefix: Some("ns1:".into()), limit: None, cursor: None }).await.unwrap();
		let keys: Vec<_> = res.objects.iter().map(|o| o.key.as_str()).collect();
		assert_eq!(keys, vec!["ns1:a", "ns1:b"]);
	}
}

// vim: ts=4
