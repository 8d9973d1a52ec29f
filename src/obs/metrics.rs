// self
use crate::obs::{RequestOutcome, TokenSource};

/// Records a request outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("cf_access_request_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records where an attached token came from (when enabled).
pub fn record_token_source(source: TokenSource) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("cf_access_token_source_total", "source" => source.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = source;
	}
}
