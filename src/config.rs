//! Request configuration shared by every access call.

// crates.io
use http::HeaderName;
// self
use crate::_prelude::*;

/// Time limit applied to the request sent to the protected resource.
pub const DEFAULT_CLIENT_TIMEOUT: StdDuration = StdDuration::from_secs(5);
/// Header the gateway reads the access token from.
pub const ACCESS_TOKEN_HEADER: &str = "cf-access-token";
/// Identifying `user-agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("cf-access/", env!("CARGO_PKG_VERSION"));

/// How the requester obtains a token for each call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchMode {
	/// Reuse a cached token when one exists; fetch only when it is absent.
	#[default]
	CacheFirst,
	/// Skip the cache and fetch a token on every call.
	AlwaysFetch,
}

/// What to do when the cached-token lookup itself fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LookupErrorPolicy {
	/// Log the failure and fall through to a fresh fetch.
	#[default]
	Fallback,
	/// Abort the call with [`Error::TokenLookup`].
	Propagate,
}

/// Knobs for [`AccessClient`](crate::AccessClient).
#[derive(Clone, Debug)]
pub struct AccessConfig {
	/// Deadline for the request to the protected resource.
	pub timeout: StdDuration,
	/// Header carrying the access token.
	pub token_header: HeaderName,
	/// Value of the `user-agent` header.
	pub user_agent: String,
	/// Cache-versus-fetch behavior.
	pub fetch_mode: FetchMode,
	/// Handling of cache lookup failures in [`FetchMode::CacheFirst`].
	pub lookup_errors: LookupErrorPolicy,
}
impl AccessConfig {
	/// Overrides the request deadline.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the token header name.
	pub fn with_token_header(mut self, header: HeaderName) -> Self {
		self.token_header = header;

		self
	}

	/// Overrides the `user-agent` value.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Selects the token acquisition mode.
	pub fn with_fetch_mode(mut self, mode: FetchMode) -> Self {
		self.fetch_mode = mode;

		self
	}

	/// Selects how cache lookup failures are handled.
	pub fn with_lookup_errors(mut self, policy: LookupErrorPolicy) -> Self {
		self.lookup_errors = policy;

		self
	}
}
impl Default for AccessConfig {
	fn default() -> Self {
		Self {
			timeout: DEFAULT_CLIENT_TIMEOUT,
			token_header: HeaderName::from_static(ACCESS_TOKEN_HEADER),
			user_agent: DEFAULT_USER_AGENT.into(),
			fetch_mode: FetchMode::default(),
			lookup_errors: LookupErrorPolicy::default(),
		}
	}
}
