//! Fresh token acquisition.
//!
//! Interactive login belongs to the gateway's own tooling. The built-in
//! [`ServiceTokenFetcher`] covers the non-interactive case: the gateway exchanges a
//! service token (client id + secret headers) for an access token set as the
//! `CF_Authorization` cookie.

// crates.io
use http::{
	HeaderMap, Method, Request,
	header::{SET_COOKIE, USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	config::DEFAULT_USER_AGENT,
	error::BoxError,
	token::{AppInfo, CacheError, TokenSecret},
	transport::{ResourceHttpClient, ResourceResponse},
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, transport::ReqwestHttpClient};

/// Request header carrying the service token client id.
pub const CLIENT_ID_HEADER: &str = "cf-access-client-id";
/// Request header carrying the service token secret.
pub const CLIENT_SECRET_HEADER: &str = "cf-access-client-secret";
/// Cookie the gateway issues the access token in.
pub const AUTHORIZATION_COOKIE: &str = "CF_Authorization";

/// Boxed future returned by [`TokenFetcher::fetch`].
pub type FetchFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenSecret, FetchError>> + 'a + Send>>;

/// Obtains a new access token for an application.
pub trait TokenFetcher
where
	Self: Send + Sync,
{
	/// Fetches a token that grants access to `url` behind `app`.
	fn fetch<'a>(&'a self, url: &'a Url, app: &'a AppInfo) -> FetchFuture<'a>;
}

/// Failures raised while fetching a token.
#[derive(Debug, ThisError)]
pub enum FetchError {
	/// The token service has no way to obtain new tokens.
	#[error("No token fetcher is configured; log in with the gateway's tooling first.")]
	NoFetcher,
	/// The fetch succeeded but produced an empty token.
	#[error("Token service returned an empty token.")]
	EmptyToken,
	/// Exchange request could not be built or sent.
	#[error("Failed to reach the application for a token exchange.")]
	Request {
		/// Transport or request-construction failure.
		#[source]
		source: BoxError,
	},
	/// Gateway answered without issuing an authorization cookie.
	#[error("Gateway did not issue an authorization cookie (status {status}).")]
	MissingAuthorization {
		/// HTTP status of the exchange response.
		status: u16,
	},
	/// Fetched token could not be stored.
	#[error("Failed to store the fetched token.")]
	Cache(#[from] CacheError),
	/// Fetcher-specific failure.
	#[error("Token fetch backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl FetchError {
	/// Wraps a request construction or transport failure.
	pub fn request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Request { source: Box::new(src) }
	}
}

/// Exchanges a service token for an access token through a non-redirecting transport.
#[derive(Debug)]
pub struct ServiceTokenFetcher<C>
where
	C: ResourceHttpClient,
{
	http_client: Arc<C>,
	client_id: String,
	client_secret: TokenSecret,
	user_agent: String,
	timeout: StdDuration,
}
impl<C> ServiceTokenFetcher<C>
where
	C: ResourceHttpClient,
{
	/// Exchange deadline used unless overridden.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(7);

	/// Creates a fetcher on top of `http_client`, which must not follow redirects.
	pub fn with_http_client(
		http_client: impl Into<Arc<C>>,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			user_agent: DEFAULT_USER_AGENT.into(),
			timeout: Self::DEFAULT_TIMEOUT,
		}
	}

	/// Overrides the `user-agent` sent with exchange requests.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Overrides the exchange deadline.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}
}
#[cfg(feature = "reqwest")]
impl ServiceTokenFetcher<ReqwestHttpClient> {
	/// Creates a fetcher backed by a non-redirecting reqwest client.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::without_redirects()?;

		Ok(Self::with_http_client(http_client, client_id, client_secret))
	}
}
impl<C> TokenFetcher for ServiceTokenFetcher<C>
where
	C: ResourceHttpClient,
{
	fn fetch<'a>(&'a self, url: &'a Url, _app: &'a AppInfo) -> FetchFuture<'a> {
		Box::pin(async move {
			let request = Request::builder()
				.method(Method::GET)
				.uri(url.as_str())
				.header(USER_AGENT, self.user_agent.as_str())
				.header(CLIENT_ID_HEADER, self.client_id.as_str())
				.header(CLIENT_SECRET_HEADER, self.client_secret.expose())
				.body(())
				.map_err(FetchError::request)?;
			let ResourceResponse { status, headers, body } = self
				.http_client
				.execute(request, self.timeout)
				.await
				.map_err(FetchError::request)?;

			drop(body);

			authorization_cookie(&headers)
				.map(TokenSecret::new)
				.ok_or(FetchError::MissingAuthorization { status: status.as_u16() })
		})
	}
}

fn authorization_cookie(headers: &HeaderMap) -> Option<&str> {
	headers
		.get_all(SET_COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.filter_map(|cookie| cookie.split(';').next())
		.filter_map(|pair| pair.trim().split_once('='))
		.find_map(|(name, value)| {
			(name == AUTHORIZATION_COOKIE && !value.is_empty()).then_some(value)
		})
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::HeaderValue;
	// self
	use super::*;

	#[test]
	fn authorization_cookie_is_picked_among_others() {
		let mut headers = HeaderMap::new();

		headers.append(SET_COOKIE, HeaderValue::from_static("__cf_bm=abc; Path=/; HttpOnly"));
		headers.append(
			SET_COOKIE,
			HeaderValue::from_static("CF_Authorization=jwt-value; Path=/; Secure; HttpOnly"),
		);

		assert_eq!(authorization_cookie(&headers), Some("jwt-value"));
	}

	#[test]
	fn empty_or_missing_cookie_yields_none() {
		let mut headers = HeaderMap::new();

		assert_eq!(authorization_cookie(&headers), None);

		headers.append(SET_COOKIE, HeaderValue::from_static("CF_Authorization=; Max-Age=0"));

		assert_eq!(authorization_cookie(&headers), None);
	}
}
