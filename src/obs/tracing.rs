// crates.io
use tracing::{Instrument, Span, instrument::Instrumented};
// self
use crate::{_prelude::*, auth::ProviderId};

/// A span builder used by the authentication paths.
#[derive(Clone, Debug)]
pub struct AuthSpan {
	span: Span,
}
impl AuthSpan {
	/// Span covering one call to the bearer mechanism.
	pub fn authenticate(fingerprint: &str) -> Self {
		Self { span: tracing::info_span!("bearer_auth.authenticate", token = fingerprint) }
	}

	/// Span covering one provider verification.
	pub fn provider(provider: &ProviderId) -> Self {
		Self { span: tracing::debug_span!("bearer_auth.provider", provider = %provider) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}
