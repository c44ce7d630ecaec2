//! Bearer access token wrapper that redacts the credential.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const BEARER_SCHEME: &str = "bearer";

/// Opaque bearer credential presented by a caller for a single verification.
///
/// The value is never persisted. `Debug` and `Display` are redacted; use
/// [`fingerprint`](BearerAccessToken::fingerprint) to correlate log lines instead.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerAccessToken(String);
impl BearerAccessToken {
	/// Wraps a raw token string (without the `Bearer ` scheme prefix).
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Extracts the token from an `Authorization` header value.
	///
	/// The scheme is matched case-insensitively. Returns `None` for other schemes, a missing
	/// separator, or an empty credential.
	pub fn from_authorization_header(header: &str) -> Option<Self> {
		let (scheme, credential) = header.trim().split_once(' ')?;

		if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
			return None;
		}

		let token = Self::new(credential.trim());

		token.is_well_formed().then_some(token)
	}

	/// Returns true when the value can travel as a bearer credential: non-empty, visible ASCII
	/// only (no whitespace or control characters).
	pub fn is_well_formed(&self) -> bool {
		!self.0.is_empty() && self.0.bytes().all(|byte| byte.is_ascii_graphic())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Short, non-reversible SHA-256 fingerprint suitable for log correlation.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0.as_bytes());

		digest.iter().take(6).map(|byte| format!("{byte:02x}")).collect()
	}
}
impl Debug for BearerAccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("BearerAccessToken").field(&"<redacted>").finish()
	}
}
impl Display for BearerAccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Redacted client secret read from provider settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);
impl ClientSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ClientSecret").field(&"<redacted>").finish()
	}
}
