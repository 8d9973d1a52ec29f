//! Default [`TokenService`] composed from a resolver, a cache, and an optional fetcher.
//!
//! Cached tokens are only handed out while their `exp` claim lies in the future; expired
//! ones are evicted on sight. Fetches run behind a per-application guard and re-check the
//! cache once the guard is held, so concurrent callers sharing one service piggy-back on a
//! single exchange instead of stampeding the gateway.

// self
use crate::{
	_prelude::*,
	token::{
		AppInfo, AppInfoError, AppInfoResolver, CacheError, FetchError, TokenCache, TokenClaims,
		TokenFetcher, TokenFuture, TokenSecret, TokenService,
	},
};
#[cfg(feature = "reqwest")]
use crate::{
	error::ConfigError,
	token::{FileCache, GatewayAppInfoResolver},
};

/// Token service backed by pluggable discovery, storage, and fetch strategies.
#[derive(Clone)]
pub struct EdgeTokenService {
	/// Resolver used for application discovery.
	pub resolver: Arc<dyn AppInfoResolver>,
	/// Cache holding previously issued tokens.
	pub cache: Arc<dyn TokenCache>,
	/// Strategy for obtaining fresh tokens, if any.
	pub fetcher: Option<Arc<dyn TokenFetcher>>,
	fetch_guards: Arc<Mutex<HashMap<AppInfo, Arc<AsyncMutex<()>>>>>,
}
impl EdgeTokenService {
	/// Creates a service without a fetcher; only cached tokens can be served.
	pub fn new(resolver: Arc<dyn AppInfoResolver>, cache: Arc<dyn TokenCache>) -> Self {
		Self { resolver, cache, fetcher: None, fetch_guards: Default::default() }
	}

	/// Sets or replaces the fetch strategy.
	pub fn with_fetcher(mut self, fetcher: Arc<dyn TokenFetcher>) -> Self {
		self.fetcher = Some(fetcher);

		self
	}

	/// Returns the cached token for `app` if its claims are still valid.
	pub async fn fresh_cached(&self, app: &AppInfo) -> Result<Option<TokenSecret>, CacheError> {
		let Some(token) = self.cache.load(app).await?.filter(|token| !token.is_empty()) else {
			return Ok(None);
		};
		let claims = TokenClaims::decode(token.expose())?;

		if claims.is_expired_at(OffsetDateTime::now_utc())? {
			self.cache.remove(app).await?;

			return Ok(None);
		}

		Ok(Some(token))
	}

	fn fetch_guard<'a>(&'a self, app: &'a AppInfo) -> FetchGuardLease<'a> {
		let mut guards = self.fetch_guards.lock();
		let guard =
			guards.entry(app.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone();

		FetchGuardLease { service: self, app, guard }
	}

	#[cfg(test)]
	fn pending_fetch_guards(&self) -> usize {
		self.fetch_guards.lock().len()
	}
}

/// Shared handle on an application's fetch guard.
///
/// Dropping the last lease removes the guard from the service's map, including when the
/// fetch future is cancelled.
struct FetchGuardLease<'a> {
	service: &'a EdgeTokenService,
	app: &'a AppInfo,
	guard: Arc<AsyncMutex<()>>,
}
impl Drop for FetchGuardLease<'_> {
	fn drop(&mut self) {
		let mut guards = self.service.fetch_guards.lock();

		// Only the map and this lease are left.
		if Arc::strong_count(&self.guard) == 2 {
			guards.remove(self.app);
		}
	}
}
#[cfg(feature = "reqwest")]
impl EdgeTokenService {
	/// Wires gateway discovery and the `~/.cloudflared` file cache, without a fetcher.
	pub fn with_defaults() -> Result<Self, ConfigError> {
		let resolver = GatewayAppInfoResolver::new()?;
		let cache = FileCache::open(FileCache::default_dir()?)
			.map_err(|source| ConfigError::CacheOpen { source })?;

		Ok(Self::new(Arc::new(resolver), Arc::new(cache)))
	}
}
impl Debug for EdgeTokenService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EdgeTokenService")
			.field("fetcher_set", &self.fetcher.is_some())
			.finish_non_exhaustive()
	}
}
impl TokenService for EdgeTokenService {
	fn app_info<'a>(&'a self, url: &'a Url) -> TokenFuture<'a, AppInfo, AppInfoError> {
		self.resolver.resolve(url)
	}

	fn token_if_exists<'a>(
		&'a self,
		app: &'a AppInfo,
	) -> TokenFuture<'a, Option<TokenSecret>, CacheError> {
		Box::pin(self.fresh_cached(app))
	}

	fn fetch_token<'a>(
		&'a self,
		url: &'a Url,
		app: &'a AppInfo,
	) -> TokenFuture<'a, TokenSecret, FetchError> {
		Box::pin(async move {
			let fetcher = self.fetcher.as_ref().ok_or(FetchError::NoFetcher)?;
			let lease = self.fetch_guard(app);
			let _singleflight = lease.guard.lock().await;

			if let Ok(Some(token)) = self.fresh_cached(app).await {
				return Ok(token);
			}

			let token = fetcher.fetch(url, app).await?;

			if token.is_empty() {
				return Err(FetchError::EmptyToken);
			}

			self.cache.save(app, token.clone()).await?;

			Ok(token)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::token::{
		ClaimsError, FetchFuture, MemoryCache, ResolveFuture, claims::encode_test_token,
	};

	struct StaticResolver(AppInfo);
	impl AppInfoResolver for StaticResolver {
		fn resolve<'a>(&'a self, _url: &'a Url) -> ResolveFuture<'a> {
			let app = self.0.clone();

			Box::pin(async move { Ok(app) })
		}
	}

	struct CountingFetcher {
		token: String,
		calls: AtomicUsize,
	}
	impl CountingFetcher {
		fn new(token: impl Into<String>) -> Self {
			Self { token: token.into(), calls: AtomicUsize::new(0) }
		}
	}
	impl TokenFetcher for CountingFetcher {
		fn fetch<'a>(&'a self, _url: &'a Url, _app: &'a AppInfo) -> FetchFuture<'a> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let token = TokenSecret::new(self.token.clone());

			Box::pin(async move { Ok(token) })
		}
	}

	fn app() -> AppInfo {
		AppInfo::new("team.example.com", "aud-edge", "access-tester.pages.dev")
	}

	fn url() -> Url {
		Url::parse("https://access-tester.pages.dev").expect("URL fixture should parse.")
	}

	fn future_exp() -> i64 {
		OffsetDateTime::now_utc().unix_timestamp() + 3_600
	}

	fn service(cache: Arc<MemoryCache>) -> EdgeTokenService {
		EdgeTokenService::new(Arc::new(StaticResolver(app())), cache)
	}

	#[tokio::test]
	async fn expired_tokens_are_evicted() {
		let cache = Arc::new(MemoryCache::default());
		let stale = encode_test_token(OffsetDateTime::now_utc().unix_timestamp() - 60);

		cache.save(&app(), TokenSecret::new(stale)).await.expect("Seeding cache should succeed.");

		let found = service(cache.clone())
			.token_if_exists(&app())
			.await
			.expect("Expired lookup should succeed.");

		assert!(found.is_none());
		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn undecodable_cached_token_is_an_error() {
		let cache = Arc::new(MemoryCache::default());

		cache.save(&app(), TokenSecret::new("opaque")).await.expect("Seeding cache should succeed.");

		let err = service(cache)
			.token_if_exists(&app())
			.await
			.expect_err("Opaque cached token should not decode.");

		assert!(matches!(err, CacheError::Claims(_)));
	}

	#[tokio::test]
	async fn out_of_range_expiry_is_an_error() {
		let cache = Arc::new(MemoryCache::default());

		cache
			.save(&app(), TokenSecret::new(encode_test_token(i64::MAX)))
			.await
			.expect("Seeding cache should succeed.");

		let err = service(cache.clone())
			.token_if_exists(&app())
			.await
			.expect_err("Unrepresentable expiry should not be served.");

		assert!(matches!(err, CacheError::Claims(ClaimsError::ExpiryOutOfRange)));
		assert_eq!(cache.len(), 1);
	}

	#[tokio::test]
	async fn fetch_without_fetcher_fails() {
		let err = service(Arc::new(MemoryCache::default()))
			.fetch_token(&url(), &app())
			.await
			.expect_err("Fetching without a fetcher should fail.");

		assert!(matches!(err, FetchError::NoFetcher));
	}

	#[tokio::test]
	async fn fetched_token_is_cached_and_reused() {
		let cache = Arc::new(MemoryCache::default());
		let fetcher = Arc::new(CountingFetcher::new(encode_test_token(future_exp())));
		let service = service(cache.clone()).with_fetcher(fetcher.clone());
		let first = service.fetch_token(&url(), &app()).await.expect("First fetch should succeed.");
		let second =
			service.fetch_token(&url(), &app()).await.expect("Second fetch should succeed.");

		assert_eq!(first, second);
		assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
		assert_eq!(cache.len(), 1);
	}

	#[tokio::test]
	async fn concurrent_fetches_share_one_exchange() {
		let fetcher = Arc::new(CountingFetcher::new(encode_test_token(future_exp())));
		let service = service(Arc::new(MemoryCache::default())).with_fetcher(fetcher.clone());
		let (url, app) = (url(), app());
		let (first, second) =
			tokio::join!(service.fetch_token(&url, &app), service.fetch_token(&url, &app));

		assert!(first.is_ok() && second.is_ok());
		assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
		assert_eq!(service.pending_fetch_guards(), 0);
	}

	#[tokio::test]
	async fn fetch_guards_are_released_after_each_fetch() {
		let fetcher = Arc::new(CountingFetcher::new(""));
		let service = service(Arc::new(MemoryCache::default())).with_fetcher(fetcher);
		let other = AppInfo::new("team.example.com", "aud-other", "other.pages.dev");

		service
			.fetch_token(&url(), &app())
			.await
			.expect_err("Empty fetched token should be rejected.");
		service
			.fetch_token(&url(), &other)
			.await
			.expect_err("Empty fetched token should be rejected.");

		assert_eq!(service.pending_fetch_guards(), 0);
	}

	#[tokio::test]
	async fn empty_fetched_token_is_rejected() {
		let service = service(Arc::new(MemoryCache::default()))
			.with_fetcher(Arc::new(CountingFetcher::new("")));
		let err = service
			.fetch_token(&url(), &app())
			.await
			.expect_err("Empty fetched token should be rejected.");

		assert!(matches!(err, FetchError::EmptyToken));
	}
}
