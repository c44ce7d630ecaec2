//! Observability helpers for bearer-token authentication.
//!
//! Spans are always emitted through `tracing`: `bearer_auth.authenticate` wraps one
//! authentication attempt and `bearer_auth.provider` wraps each provider verification.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment `bearer_auth_total` (labeled by `outcome`) and
//!   `bearer_auth_provider_attempt_total` (labeled by `provider` + `outcome`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Final outcome of one authentication attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthOutcome {
	/// Bearer authentication is switched off.
	NotApplicable,
	/// No OIDC provider is configured.
	NoProvider,
	/// A provider verified the token and the identity is bound to a local account.
	Authenticated,
	/// Every provider rejected the token.
	Rejected,
	/// The token was verified but no local account is bound to the identity.
	NotProvisioned,
	/// No provider could give a verdict.
	Unavailable,
	/// The local user store failed during lookup.
	StoreUnavailable,
}
impl AuthOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthOutcome::NotApplicable => "not_applicable",
			AuthOutcome::NoProvider => "no_provider",
			AuthOutcome::Authenticated => "authenticated",
			AuthOutcome::Rejected => "rejected",
			AuthOutcome::NotProvisioned => "not_provisioned",
			AuthOutcome::Unavailable => "unavailable",
			AuthOutcome::StoreUnavailable => "store_unavailable",
		}
	}
}
impl Display for AuthOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome of a single provider verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttemptOutcome {
	/// The provider vouched for the token.
	Verified,
	/// The provider rejected the token.
	Rejected,
	/// The provider could not be reached or answered without a verdict.
	Unavailable,
}
impl AttemptOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AttemptOutcome::Verified => "verified",
			AttemptOutcome::Rejected => "rejected",
			AttemptOutcome::Unavailable => "unavailable",
		}
	}
}
impl Display for AttemptOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
