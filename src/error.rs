//! Crate-level error types; every failing step of an access request maps to one variant.

// self
use crate::{
	_prelude::*,
	token::{AppInfoError, CacheError, FetchError},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by [`AccessClient`](crate::AccessClient) and the free helpers.
///
/// Each variant names the step that failed; the underlying cause is available through
/// [`std::error::Error::source`].
#[derive(Debug, ThisError)]
pub enum Error {
	/// Target URL could not be parsed.
	#[error("Invalid URL format.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Application metadata could not be resolved.
	#[error("Failed to get app info.")]
	AppInfo(#[source] AppInfoError),
	/// Cached token lookup failed and the lookup policy propagates such failures.
	#[error("Failed to look up cached token.")]
	TokenLookup(#[source] CacheError),
	/// Fresh token could not be fetched.
	#[error("Failed to fetch token.")]
	TokenFetch(#[source] FetchError),
	/// Outgoing request could not be constructed.
	#[error("Failed to create request.")]
	RequestBuild(#[source] http::Error),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error("Request failed.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Response body could not be read to completion.
	#[error("Failed to read response body.")]
	BodyRead {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Local setup problem in the default wiring.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Wraps a transport-specific request failure.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}

	/// Wraps a transport-specific body read failure.
	pub fn body_read(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::BodyRead { source: Box::new(src) }
	}
}

/// Setup failures raised while wiring the default transport and token service.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// No home directory is known, so the default token cache has nowhere to live.
	#[error("Unable to locate the home directory for the token cache.")]
	CacheLocation,
	/// Token cache directory could not be opened.
	#[error("Token cache could not be opened.")]
	CacheOpen {
		/// Underlying cache failure.
		#[source]
		source: CacheError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
