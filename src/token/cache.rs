//! Storage contracts and built-in caches for issued access tokens.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

// self
use crate::{
	_prelude::*,
	token::{AppInfo, ClaimsError, TokenSecret},
};

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Storage backend contract for per-application access tokens.
///
/// Caches store raw tokens; freshness is judged by the caller from the token's claims.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Returns the stored token for `app`, if any.
	fn load<'a>(&'a self, app: &'a AppInfo) -> CacheFuture<'a, Option<TokenSecret>>;

	/// Persists or replaces the token for `app`.
	fn save<'a>(&'a self, app: &'a AppInfo, token: TokenSecret) -> CacheFuture<'a, ()>;

	/// Drops the token for `app`, returning whether one was stored.
	fn remove<'a>(&'a self, app: &'a AppInfo) -> CacheFuture<'a, bool>;
}

/// Error type produced by [`TokenCache`] implementations and cached-token checks.
#[derive(Debug, ThisError)]
pub enum CacheError {
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// Stored token cannot be decoded.
	#[error("Cached token is unreadable.")]
	Claims(#[from] ClaimsError),
}
