// self
use crate::{_prelude::*, config::FetchMode, token::CacheError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder used by the requester.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the fetch mode + stage.
	pub fn new(mode: FetchMode, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let mode = match mode {
				FetchMode::CacheFirst => "cache_first",
				FetchMode::AlwaysFetch => "always_fetch",
			};
			let span = tracing::info_span!("cf_access.request", mode, stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (mode, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Notes a cache lookup failure that is being treated as a cache miss.
pub fn cache_lookup_failed(err: &CacheError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %err, "cached token lookup failed, fetching a fresh token");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = err;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_passes_output_through() {
		let span = RequestSpan::new(FetchMode::CacheFirst, "instrument_passes_output_through");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn cache_lookup_failure_is_recorded_without_panicking() {
		cache_lookup_failed(&CacheError::Backend { message: "disk unavailable".into() });
	}
}
