// self
use crate::{
	auth::ProviderId,
	obs::{AttemptOutcome, AuthOutcome},
};

/// Records the final outcome of an authentication attempt (when `metrics` is enabled).
pub fn record_auth_outcome(outcome: AuthOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("bearer_auth_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records the outcome of one provider verification (when `metrics` is enabled).
pub fn record_provider_attempt(provider: &ProviderId, outcome: AttemptOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"bearer_auth_provider_attempt_total",
			"provider" => provider.to_string(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (provider, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_is_a_noop_without_a_recorder() {
		let provider = ProviderId::new("oidc").expect("Provider fixture should be valid.");

		record_auth_outcome(AuthOutcome::Rejected);
		record_provider_attempt(&provider, AttemptOutcome::Unavailable);
	}
}
