//! Application discovery, token caching, and token fetching behind one capability.
//!
//! [`AccessClient`](crate::AccessClient) only talks to a [`TokenService`]. The built-in
//! [`EdgeTokenService`] composes an [`AppInfoResolver`], a [`TokenCache`], and an optional
//! [`TokenFetcher`]; tests and embedders may implement [`TokenService`] directly.

pub mod app_info;
pub mod cache;
pub mod claims;
pub mod edge;
pub mod fetch;
pub mod secret;

pub use app_info::*;
pub use cache::{CacheError, CacheFuture, FileCache, MemoryCache, TokenCache};
pub use claims::*;
pub use edge::*;
pub use fetch::*;
pub use secret::*;

// self
use crate::_prelude::*;

/// Boxed future returned by [`TokenService`] operations.
pub type TokenFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// External token-service boundary used by the requester.
pub trait TokenService
where
	Self: Send + Sync,
{
	/// Resolves the protected application behind `url`.
	fn app_info<'a>(&'a self, url: &'a Url) -> TokenFuture<'a, AppInfo, AppInfoError>;

	/// Returns a still-valid cached token for `app`, or `None` when there is none.
	fn token_if_exists<'a>(
		&'a self,
		app: &'a AppInfo,
	) -> TokenFuture<'a, Option<TokenSecret>, CacheError>;

	/// Obtains a token for `url` behind `app`.
	fn fetch_token<'a>(
		&'a self,
		url: &'a Url,
		app: &'a AppInfo,
	) -> TokenFuture<'a, TokenSecret, FetchError>;
}
