//! File-backed [`TokenCache`] that keeps one token file per application.

// std
use std::{
	fs::{self, OpenOptions},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	token::{
		AppInfo, TokenSecret,
		cache::{CacheError, CacheFuture, TokenCache},
	},
};

/// Directory under the home directory shared with the gateway's own tooling.
pub const DEFAULT_CACHE_DIR: &str = ".cloudflared";

/// Persists tokens as `<app_domain>-<app_aud>-token` files inside a directory.
#[derive(Debug)]
pub struct FileCache {
	dir: PathBuf,
	write_lock: Mutex<()>,
}
impl FileCache {
	/// Opens (or creates) a cache rooted at `dir`.
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let dir = dir.into();

		fs::create_dir_all(&dir).map_err(|e| CacheError::Backend {
			message: format!("Failed to create cache directory {}: {e}", dir.display()),
		})?;

		Ok(Self { dir, write_lock: Mutex::new(()) })
	}

	/// Returns the default cache directory, `~/.cloudflared`.
	pub fn default_dir() -> Result<PathBuf, ConfigError> {
		home::home_dir().map(|home| home.join(DEFAULT_CACHE_DIR)).ok_or(ConfigError::CacheLocation)
	}

	/// Path of the token file for `app`.
	pub fn token_path(&self, app: &AppInfo) -> PathBuf {
		self.dir.join(app.cache_key())
	}

	fn read_now(path: &Path) -> Result<Option<TokenSecret>, CacheError> {
		match fs::read_to_string(path) {
			Ok(raw) => {
				let token = raw.trim();

				Ok((!token.is_empty()).then(|| TokenSecret::new(token)))
			},
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(CacheError::Backend {
				message: format!("Failed to read {}: {e}", path.display()),
			}),
		}
	}

	fn write_now(&self, path: &Path, token: &TokenSecret) -> Result<(), CacheError> {
		let _guard = self.write_lock.lock();
		let mut tmp_name = path.as_os_str().to_owned();

		tmp_name.push(".tmp");

		let tmp_path = PathBuf::from(tmp_name);

		{
			let mut options = OpenOptions::new();

			options.write(true).create(true).truncate(true);

			#[cfg(unix)]
			{
				use std::os::unix::fs::OpenOptionsExt;

				options.mode(0o600);
			}

			let mut file = options.open(&tmp_path).map_err(|e| CacheError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(token.expose().as_bytes()).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}

	fn remove_now(&self, path: &Path) -> Result<bool, CacheError> {
		let _guard = self.write_lock.lock();

		match fs::remove_file(path) {
			Ok(()) => Ok(true),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
			Err(e) => Err(CacheError::Backend {
				message: format!("Failed to remove {}: {e}", path.display()),
			}),
		}
	}
}
impl TokenCache for FileCache {
	fn load<'a>(&'a self, app: &'a AppInfo) -> CacheFuture<'a, Option<TokenSecret>> {
		Box::pin(async move { Self::read_now(&self.token_path(app)) })
	}

	fn save<'a>(&'a self, app: &'a AppInfo, token: TokenSecret) -> CacheFuture<'a, ()> {
		Box::pin(async move { self.write_now(&self.token_path(app), &token) })
	}

	fn remove<'a>(&'a self, app: &'a AppInfo) -> CacheFuture<'a, bool> {
		Box::pin(async move { self.remove_now(&self.token_path(app)) })
	}
}
