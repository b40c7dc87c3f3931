//! Typed configuration, loaded once at startup from the environment.

use std::fs;
use std::path::PathBuf;

use gateway_types::prelude::*;
use rand::RngCore as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobMode {
	Filesystem,
	S3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
	Off,
	Auto,
	Acme,
	Custom,
}

#[derive(Debug, Clone)]
pub struct Config {
	pub bootstrap_api_key: Option<String>,
	pub signing_secret: Vec<u8>,
	pub cors_origin: String,
	pub presign_expires_in: i64,
	pub bucket: String,
	pub blob_mode: BlobMode,
	pub data_dir: PathBuf,
	pub listen: String,
	pub admin_check_enabled: bool,
	pub tls_mode: TlsMode,
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
	/// Load configuration from the environment. Fails fast with a
	/// descriptive message when a field is malformed; unset fields fall
	/// back to their documented defaults, except the signing secret,
	/// which is generated and persisted under `data_dir` on first boot.
	pub fn load() -> Result<Config> {
		let data_dir =
			PathBuf::from(env_var("GATEWAY_DATA_DIR").unwrap_or_else(|| "./data".to_string()));
		fs::create_dir_all(&data_dir)
			.map_err(|e| Error::InvalidRequest(format!("cannot create data dir: {e}")))?;

		let signing_secret = match env_var("GATEWAY_SIGNING_SECRET") {
			Some(s) => s.into_bytes(),
			None => load_or_generate_signing_secret(&data_dir)?,
		};

		let blob_mode = match env_var("GATEWAY_BLOB_MODE").as_deref() {
			None | Some("filesystem") => BlobMode::Filesystem,
			Some("s3") => BlobMode::S3,
			Some(other) => {
				return Err(Error::InvalidRequest(format!("unknown GATEWAY_BLOB_MODE: {other}")));
			}
		};

		let tls_mode = match env_var("GATEWAY_TLS_MODE").as_deref() {
			None | Some("off") => TlsMode::Off,
			Some("auto") => TlsMode::Auto,
			Some("acme") => TlsMode::Acme,
			Some("custom") => TlsMode::Custom,
			Some(other) => {
				return Err(Error::InvalidRequest(format!("unknown GATEWAY_TLS_MODE: {other}")));
			}
		};

		let presign_expires_in = match env_var("GATEWAY_PRESIGN_EXPIRES_IN") {
			Some(v) => v
				.parse::<i64>()
				.map_err(|_| Error::InvalidRequest("GATEWAY_PRESIGN_EXPIRES_IN must be an integer".into()))?,
			None => 3600,
		};

		Ok(Config {
			bootstrap_api_key: env_var("GATEWAY_BOOTSTRAP_KEY"),
			signing_secret,
			cors_origin: env_var("GATEWAY_CORS_ORIGIN").unwrap_or_else(|| "*".to_string()),
			presign_expires_in,
			bucket: env_var("GATEWAY_BUCKET").unwrap_or_else(|| "default".to_string()),
			blob_mode,
			data_dir,
			listen: env_var("GATEWAY_LISTEN").unwrap_or_else(|| "0.0.0.0:8787".to_string()),
			admin_check_enabled: matches!(env_var("GATEWAY_ADMIN_CHECK_ENABLED").as_deref(), Some("true")),
			tls_mode,
		})
	}
}

fn load_or_generate_signing_secret(data_dir: &std::path::Path) -> Result<Vec<u8>> {
	let path = data_dir.join("signing.secret");
	if let Ok(existing) = fs::read(&path) {
		if !existing.is_empty() {
			return Ok(existing);
		}
	}

	let mut secret = vec![0u8; 32];
	rand::rng().fill_bytes(&mut secret);
	fs::write(&path, &secret).map_err(|e| Error::Upstream(format!("cannot persist signing secret: {e}")))?;

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt as _;
		let perms = fs::Permissions::from_mode(0o600);
		let _ = fs::set_permissions(&path, perms);
	}

	Ok(secret)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generates_and_persists_signing_secret() {
		let dir = std::env::temp_dir().join(format!("gateway-cfg-test-{}", std::process::id()));
		let _ = fs::create_dir_all(&dir);
		let first = load_or_generate_signing_secret(&dir).unwrap();
		let second = load_or_generate_signing_secret(&dir).unwrap();
		assert_eq!(first, second);
		assert_eq!(first.len(), 32);
		let _ = fs::remove_dir_all(&dir);
	}
}

// vim: ts=4
