//! Minimal JWT claim decoding used to decide whether a cached token is still usable.
//!
//! Signatures are not verified here; the gateway verifies every token it receives. The
//! cache only needs the expiry to avoid sending tokens that are known to be stale.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Claims read from an access token payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
	/// Expiry as seconds since the Unix epoch.
	pub exp: i64,
	/// Subject, when the gateway includes one.
	#[serde(default)]
	pub sub: Option<String>,
}
impl TokenClaims {
	/// Decodes the payload segment of a compact JWT.
	pub fn decode(token: &str) -> Result<Self, ClaimsError> {
		let mut segments = token.split('.');
		let (Some(_header), Some(payload), Some(_signature), None) =
			(segments.next(), segments.next(), segments.next(), segments.next())
		else {
			return Err(ClaimsError::Malformed);
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
		let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(deserializer).map_err(ClaimsError::Parse)
	}

	/// Returns the expiry instant.
	pub fn expires_at(&self) -> Result<OffsetDateTime, ClaimsError> {
		OffsetDateTime::from_unix_timestamp(self.exp).map_err(|_| ClaimsError::ExpiryOutOfRange)
	}

	/// Returns `true` once `now` has reached the expiry.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> Result<bool, ClaimsError> {
		Ok(self.expires_at()? <= now)
	}
}

/// Failures raised while decoding token claims.
#[derive(Debug, ThisError)]
pub enum ClaimsError {
	/// Token is not a three-segment compact JWT.
	#[error("Token is not a compact JWT.")]
	Malformed,
	/// Payload segment is not valid base64url.
	#[error("Token payload is not valid base64url.")]
	Encoding(#[from] base64::DecodeError),
	/// Payload JSON could not be parsed into claims.
	#[error("Token payload has invalid claims.")]
	Parse(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// `exp` lies outside the representable range.
	#[error("Token expiry is out of range.")]
	ExpiryOutOfRange,
}

#[cfg(test)]
pub(crate) fn encode_test_token(exp: i64) -> String {
	let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
	let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"sub":"tester"}}"#));

	format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn decodes_expiry_from_payload() {
		let claims = TokenClaims::decode(&encode_test_token(1_900_000_000))
			.expect("Test token should decode.");

		assert_eq!(claims.exp, 1_900_000_000);
		assert_eq!(claims.sub.as_deref(), Some("tester"));
		assert_eq!(
			claims.expires_at().expect("Expiry should be in range.").unix_timestamp(),
			1_900_000_000
		);
	}

	#[test]
	fn expiry_boundary_counts_as_expired() {
		let claims = TokenClaims { exp: 1_000, sub: None };
		let at = |secs| {
			OffsetDateTime::from_unix_timestamp(secs).expect("Fixture timestamp should be valid.")
		};

		assert!(!claims.is_expired_at(at(999)).expect("Expiry should be in range."));
		assert!(claims.is_expired_at(at(1_000)).expect("Expiry should be in range."));
	}

	#[test]
	fn unrepresentable_expiry_is_rejected() {
		let claims = TokenClaims { exp: i64::MAX, sub: None };

		assert!(matches!(
			claims.is_expired_at(OffsetDateTime::now_utc()),
			Err(ClaimsError::ExpiryOutOfRange)
		));
	}

	#[test]
	fn rejects_non_jwt_tokens() {
		assert!(matches!(TokenClaims::decode("abc123"), Err(ClaimsError::Malformed)));
		assert!(matches!(TokenClaims::decode("a.b.c.d"), Err(ClaimsError::Malformed)));
		assert!(matches!(TokenClaims::decode("a.!!!.c"), Err(ClaimsError::Encoding(_))));
	}

	#[test]
	fn reports_claim_path_on_parse_failure() {
		let payload = URL_SAFE_NO_PAD.encode(r#"{"exp":"soon"}"#);
		let err = TokenClaims::decode(&format!("h.{payload}.s"))
			.expect_err("String expiry should not parse.");

		match err {
			ClaimsError::Parse(inner) => assert_eq!(inner.path().to_string(), "exp"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}
}
