//! Application metadata discovery.
//!
//! The gateway answers an unauthenticated request either with a redirect to its login
//! worker (carrying the application audience as `kid`) or, at the edge, with the audience
//! in a response header. Both shapes also carry the application domain. The metadata
//! scopes every token lookup and fetch.

// crates.io
use http::{
	HeaderMap, Method, Request, StatusCode,
	header::{LOCATION, USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	config::DEFAULT_USER_AGENT,
	error::BoxError,
	transport::{ResourceHttpClient, ResourceResponse},
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, transport::ReqwestHttpClient};

/// Path served by the gateway's login worker.
pub const ACCESS_LOGIN_PATH: &str = "/cdn-cgi/access/login";
/// Response header carrying the application audience tag.
pub const ACCESS_AUD_HEADER: &str = "cf-access-aud";
/// Response header carrying the application domain.
pub const ACCESS_DOMAIN_HEADER: &str = "cf-access-domain";

/// Boxed future returned by [`AppInfoResolver::resolve`].
pub type ResolveFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AppInfo, AppInfoError>> + 'a + Send>>;

/// Resolves the protected application behind a URL.
pub trait AppInfoResolver
where
	Self: Send + Sync,
{
	/// Looks up the application that gates `url`.
	fn resolve<'a>(&'a self, url: &'a Url) -> ResolveFuture<'a>;
}

/// Metadata describing a protected application.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppInfo {
	/// Host serving the login worker (the team domain).
	pub auth_domain: String,
	/// Application audience tag.
	pub app_aud: String,
	/// Domain the application is configured for.
	pub app_domain: String,
}
impl AppInfo {
	/// Creates metadata from its parts.
	pub fn new(
		auth_domain: impl Into<String>,
		app_aud: impl Into<String>,
		app_domain: impl Into<String>,
	) -> Self {
		Self {
			auth_domain: auth_domain.into(),
			app_aud: app_aud.into(),
			app_domain: app_domain.into(),
		}
	}

	/// Extracts metadata from the gateway's answer to an unauthenticated request for `url`.
	pub fn from_gateway_response(
		url: &Url,
		status: StatusCode,
		headers: &HeaderMap,
	) -> Result<Self, AppInfoError> {
		let login = if status.is_redirection() { login_location(url, headers)? } else { None };
		let (auth_domain, app_aud) = match login {
			Some(location) => {
				let aud = location
					.query_pairs()
					.find_map(|(key, value)| (key == "kid").then(|| value.into_owned()))
					.filter(|aud| !aud.is_empty())
					.ok_or(AppInfoError::MissingAudience)?;

				(location.host_str().unwrap_or_default().to_owned(), aud)
			},
			None => match header_str(headers, ACCESS_AUD_HEADER) {
				Some(aud) => (url.host_str().unwrap_or_default().to_owned(), aud.to_owned()),
				None => return Err(AppInfoError::NotProtected { url: url.to_string() }),
			},
		};
		let app_domain = header_str(headers, ACCESS_DOMAIN_HEADER)
			.ok_or(AppInfoError::MissingDomain)?
			.to_owned();

		Ok(Self { auth_domain, app_aud, app_domain })
	}

	/// File-system safe key identifying this application's cached token.
	pub fn cache_key(&self) -> String {
		let sanitize = |value: &str| {
			value
				.chars()
				.map(|c| {
					if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' }
				})
				.collect::<String>()
		};

		format!("{}-{}-token", sanitize(&self.app_domain), sanitize(&self.app_aud))
	}
}

/// Failures raised while resolving application metadata.
#[derive(Debug, ThisError)]
pub enum AppInfoError {
	/// Discovery request could not be built or sent.
	#[error("Failed to reach the application.")]
	Request {
		/// Transport or request-construction failure.
		#[source]
		source: BoxError,
	},
	/// Redirect target could not be parsed.
	#[error("Gateway redirect location is invalid.")]
	InvalidLocation {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Response carries no sign of an access application.
	#[error("Failed to find an Access application at {url}.")]
	NotProtected {
		/// URL that was checked.
		url: String,
	},
	/// Login redirect does not carry an audience tag.
	#[error("Gateway returned an empty application audience.")]
	MissingAudience,
	/// Response does not name the application domain.
	#[error("Gateway returned an empty application domain.")]
	MissingDomain,
	/// Resolver-specific failure.
	#[error("App info backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl AppInfoError {
	/// Wraps a request construction or transport failure.
	pub fn request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Request { source: Box::new(src) }
	}
}

/// Resolves metadata by sending a `HEAD` request through a non-redirecting transport.
#[derive(Debug)]
pub struct GatewayAppInfoResolver<C>
where
	C: ResourceHttpClient,
{
	http_client: Arc<C>,
	user_agent: String,
	timeout: StdDuration,
}
impl<C> GatewayAppInfoResolver<C>
where
	C: ResourceHttpClient,
{
	/// Discovery deadline used unless overridden.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(7);

	/// Creates a resolver on top of `http_client`, which must not follow redirects.
	pub fn with_http_client(http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			user_agent: DEFAULT_USER_AGENT.into(),
			timeout: Self::DEFAULT_TIMEOUT,
		}
	}

	/// Overrides the `user-agent` sent with discovery requests.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Overrides the discovery deadline.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}
}
#[cfg(feature = "reqwest")]
impl GatewayAppInfoResolver<ReqwestHttpClient> {
	/// Creates a resolver backed by a non-redirecting reqwest client.
	pub fn new() -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(ReqwestHttpClient::without_redirects()?))
	}
}
impl<C> AppInfoResolver for GatewayAppInfoResolver<C>
where
	C: ResourceHttpClient,
{
	fn resolve<'a>(&'a self, url: &'a Url) -> ResolveFuture<'a> {
		Box::pin(async move {
			let request = Request::builder()
				.method(Method::HEAD)
				.uri(url.as_str())
				.header(USER_AGENT, self.user_agent.as_str())
				.body(())
				.map_err(AppInfoError::request)?;
			let ResourceResponse { status, headers, body } = self
				.http_client
				.execute(request, self.timeout)
				.await
				.map_err(AppInfoError::request)?;

			drop(body);

			AppInfo::from_gateway_response(url, status, &headers)
		})
	}
}

fn login_location(url: &Url, headers: &HeaderMap) -> Result<Option<Url>, AppInfoError> {
	let Some(raw) = header_str(headers, LOCATION.as_str()) else {
		return Ok(None);
	};
	let location = url.join(raw).map_err(|source| AppInfoError::InvalidLocation { source })?;

	Ok(location.path().contains(ACCESS_LOGIN_PATH).then_some(location))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty())
}
