//! Transport primitives for requests sent to gateway-protected resources.
//!
//! The module exposes [`ResourceHttpClient`] and [`ResponseBody`] so callers can plug in
//! their own HTTP stack, or a fake in tests, while the requester keeps ownership of the
//! request shape. Bodies are consumed by value through [`ResponseBody::read_all`], which
//! ties their release to a single owner on every exit path.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use http::{HeaderMap, Request, StatusCode};
#[cfg(feature = "reqwest")] use reqwest::{Response as ReqwestResponse, redirect::Policy};
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Boxed future returned by [`ResourceHttpClient::execute`].
pub type TransportFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;
/// Boxed future returned by [`ResponseBody::read_all`].
pub type BodyFuture<E> = Pin<Box<dyn Future<Output = Result<Vec<u8>, E>> + Send>>;

/// Abstraction over HTTP transports able to execute a prepared request.
///
/// Implementations must honor the supplied timeout and must not retry on their own.
/// Whether redirects are followed is a property of the implementation: the requester
/// expects the usual client behavior, while app discovery and service-token exchange
/// need a client that returns 3xx responses untouched.
pub trait ResourceHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;
	/// Response body handle produced by the transport.
	type Body: ResponseBody;

	/// Sends `request` and resolves once the status line and headers are available.
	fn execute(
		&self,
		request: Request<()>,
		timeout: StdDuration,
	) -> TransportFuture<'_, ResourceResponse<Self::Body>, Self::TransportError>;
}

/// Streaming response body that can be drained exactly once.
pub trait ResponseBody
where
	Self: 'static + Send + Sized,
{
	/// Error raised while reading the body.
	type ReadError: 'static + Send + Sync + StdError;

	/// Reads the remaining body into memory, consuming the handle whatever the outcome.
	fn read_all(self) -> BodyFuture<Self::ReadError>;
}

/// Status, headers, and the unread body of a response.
#[derive(Debug)]
pub struct ResourceResponse<B> {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Unread response body.
	pub body: B,
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that hands 3xx responses back instead of following them.
	///
	/// Gateway discovery and service-token exchange read the redirect itself.
	pub fn without_redirects() -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().redirect(Policy::none()).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ResourceHttpClient for ReqwestHttpClient {
	type Body = ReqwestBody;
	type TransportError = ReqwestError;

	fn execute(
		&self,
		request: Request<()>,
		timeout: StdDuration,
	) -> TransportFuture<'_, ResourceResponse<Self::Body>, Self::TransportError> {
		Box::pin(async move {
			let (parts, ()) = request.into_parts();
			let response = self
				.0
				.request(parts.method, parts.uri.to_string())
				.headers(parts.headers)
				.timeout(timeout)
				.send()
				.await?;
			let status = response.status();
			let headers = response.headers().to_owned();

			Ok(ResourceResponse { status, headers, body: ReqwestBody(response) })
		})
	}
}

/// Unread reqwest response body.
#[cfg(feature = "reqwest")]
#[derive(Debug)]
pub struct ReqwestBody(ReqwestResponse);
#[cfg(feature = "reqwest")]
impl ResponseBody for ReqwestBody {
	type ReadError = ReqwestError;

	fn read_all(self) -> BodyFuture<Self::ReadError> {
		Box::pin(async move { Ok(self.0.bytes().await?.to_vec()) })
	}
}
