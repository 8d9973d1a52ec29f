//! Access-aware requester: one linear pass from URL to response body.
//!
//! [`AccessClient::get_with_access`] parses the URL, resolves the protected application,
//! reuses or fetches a token according to [`FetchMode`], and sends a single GET carrying
//! the token header, the identifying `user-agent`, and any caller headers. Nothing is
//! retried; every failure aborts the call with the [`Error`] variant naming the step.

// crates.io
use http::{HeaderMap, HeaderValue, Method, Request, Uri, header::USER_AGENT};
// self
use crate::{
	_prelude::*,
	config::{AccessConfig, FetchMode, LookupErrorPolicy},
	obs::{self, RequestOutcome, RequestSpan, TokenSource},
	token::{AppInfo, FetchError, TokenSecret, TokenService},
	transport::{ResourceHttpClient, ResourceResponse, ResponseBody},
};
#[cfg(feature = "reqwest")]
use crate::{token::EdgeTokenService, transport::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAccessClient = AccessClient<ReqwestHttpClient>;

/// Performs GET requests against gateway-protected URLs.
pub struct AccessClient<C>
where
	C: ResourceHttpClient,
{
	/// Transport used for the request to the protected resource.
	pub http_client: Arc<C>,
	/// Token service resolving applications and tokens.
	pub tokens: Arc<dyn TokenService>,
	/// Timeout, header names, and token acquisition mode.
	pub config: AccessConfig,
}
impl<C> AccessClient<C>
where
	C: ResourceHttpClient,
{
	/// Creates a client that reuses the caller-provided transport and token service.
	pub fn with_http_client(
		http_client: impl Into<Arc<C>>,
		tokens: Arc<dyn TokenService>,
	) -> Self {
		Self { http_client: http_client.into(), tokens, config: AccessConfig::default() }
	}

	/// Replaces the request configuration.
	pub fn with_config(mut self, config: AccessConfig) -> Self {
		self.config = config;

		self
	}

	/// Fetches `app_url` with an access token attached and returns the raw response body.
	///
	/// `extra_headers` are appended after the token and `user-agent` headers; a key that is
	/// already present gains an additional value instead of being replaced. The body is
	/// returned whatever the response status.
	pub async fn get_with_access(
		&self,
		app_url: &str,
		extra_headers: &[HeaderMap],
	) -> Result<Vec<u8>> {
		let span = RequestSpan::new(self.config.fetch_mode, "get_with_access");

		obs::record_request_outcome(RequestOutcome::Attempt);

		let result = span
			.instrument(async move {
				let url = Url::parse(app_url).map_err(|source| Error::InvalidUrl { source })?;
				let app = self.tokens.app_info(&url).await.map_err(Error::AppInfo)?;
				let token = self.resolve_token(&url, &app).await?;
				let request = self.build_request(app_url, &url, &token, extra_headers)?;
				let ResourceResponse { body, .. } = self
					.http_client
					.execute(request, self.config.timeout)
					.await
					.map_err(Error::transport)?;

				body.read_all().await.map_err(Error::body_read)
			})
			.await;

		match &result {
			Ok(_) => obs::record_request_outcome(RequestOutcome::Success),
			Err(_) => obs::record_request_outcome(RequestOutcome::Failure),
		}

		result
	}

	async fn resolve_token(&self, url: &Url, app: &AppInfo) -> Result<TokenSecret> {
		if self.config.fetch_mode == FetchMode::CacheFirst {
			match self.tokens.token_if_exists(app).await {
				Ok(Some(token)) if !token.is_empty() => {
					obs::record_token_source(TokenSource::Cached);

					return Ok(token);
				},
				Ok(_) => {},
				Err(e) => match self.config.lookup_errors {
					LookupErrorPolicy::Fallback => obs::cache_lookup_failed(&e),
					LookupErrorPolicy::Propagate => return Err(Error::TokenLookup(e)),
				},
			}
		}

		let token = self.tokens.fetch_token(url, app).await.map_err(Error::TokenFetch)?;

		if token.is_empty() {
			return Err(Error::TokenFetch(FetchError::EmptyToken));
		}

		obs::record_token_source(TokenSource::Fetched);

		Ok(token)
	}

	fn build_request(
		&self,
		app_url: &str,
		url: &Url,
		token: &TokenSecret,
		extra_headers: &[HeaderMap],
	) -> Result<Request<()>> {
		// `Uri` is stricter than `Url`; the normalized form names the same resource.
		let uri = Uri::try_from(app_url)
			.or_else(|_| Uri::try_from(url.as_str()))
			.map_err(|e| Error::RequestBuild(e.into()))?;
		let mut request = Request::builder()
			.method(Method::GET)
			.uri(uri)
			.header(&self.config.token_header, token.expose())
			.header(USER_AGENT, self.config.user_agent.as_str())
			.body(())
			.map_err(Error::RequestBuild)?;
		let headers = request.headers_mut();

		for extra in extra_headers {
			for (name, value) in extra {
				headers.append(name, HeaderValue::clone(value));
			}
		}

		Ok(request)
	}
}
#[cfg(feature = "reqwest")]
impl AccessClient<ReqwestHttpClient> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(tokens: Arc<dyn TokenService>) -> Self {
		Self::with_http_client(ReqwestHttpClient::default(), tokens)
	}
}
impl<C> Clone for AccessClient<C>
where
	C: ResourceHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			tokens: self.tokens.clone(),
			config: self.config.clone(),
		}
	}
}
impl<C> Debug for AccessClient<C>
where
	C: ResourceHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessClient").field("config", &self.config).finish_non_exhaustive()
	}
}

/// Fetches `app_url` using the default transport and the `~/.cloudflared` token cache.
///
/// Only cached tokens can be used this way; build an [`AccessClient`] with an
/// [`EdgeTokenService`] carrying a fetcher to obtain new ones.
#[cfg(feature = "reqwest")]
pub async fn get_with_access(app_url: &str, extra_headers: &[HeaderMap]) -> Result<Vec<u8>> {
	let tokens = EdgeTokenService::with_defaults()?;
	let client = ReqwestAccessClient::new(Arc::new(tokens));

	client.get_with_access(app_url, extra_headers).await
}
