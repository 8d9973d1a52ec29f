//! Thread-safe in-memory [`TokenCache`] for short-lived processes and tests.

// self
use crate::{
	_prelude::*,
	token::{
		AppInfo, TokenSecret,
		cache::{CacheFuture, TokenCache},
	},
};

type CacheMap = Arc<RwLock<HashMap<AppInfo, TokenSecret>>>;

/// Keeps tokens in-process, keyed by application.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(CacheMap);
impl MemoryCache {
	/// Number of cached tokens.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl TokenCache for MemoryCache {
	fn load<'a>(&'a self, app: &'a AppInfo) -> CacheFuture<'a, Option<TokenSecret>> {
		let token = self.0.read().get(app).cloned();

		Box::pin(async move { Ok(token) })
	}

	fn save<'a>(&'a self, app: &'a AppInfo, token: TokenSecret) -> CacheFuture<'a, ()> {
		self.0.write().insert(app.to_owned(), token);

		Box::pin(async move { Ok(()) })
	}

	fn remove<'a>(&'a self, app: &'a AppInfo) -> CacheFuture<'a, bool> {
		let removed = self.0.write().remove(app).is_some();

		Box::pin(async move { Ok(removed) })
	}
}
