//! Optional observability helpers for access requests.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `cf_access.request` with the `mode` (fetch mode) and
//!   `stage` (call site) fields, plus a `warn` event when a cache lookup failure is swallowed.
//! - Enable `metrics` to increment the `cf_access_request_total` counter for every
//!   attempt/success/failure labeled by `outcome`, and `cf_access_token_source_total` labeled
//!   by `source`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to the requester.
	Attempt,
	/// Body returned to the caller.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Where the attached token came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenSource {
	/// Reused from the token cache.
	Cached,
	/// Obtained through a fresh fetch.
	Fetched,
}
impl TokenSource {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenSource::Cached => "cached",
			TokenSource::Fetched => "fetched",
		}
	}
}
impl Display for TokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
