// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::AuthOutcome;

/// Thread-safe counters for authentication outcomes.
#[derive(Debug, Default)]
pub struct AuthMetrics {
	attempts: AtomicU64,
	authenticated: AtomicU64,
	rejected: AtomicU64,
	unavailable: AtomicU64,
	skipped: AtomicU64,
}
impl AuthMetrics {
	/// Returns the total number of authentication attempts, including skipped ones.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of attempts that resolved a local account.
	pub fn authenticated(&self) -> u64 {
		self.authenticated.load(Ordering::Relaxed)
	}

	/// Returns the number of attempts that ended unauthenticated (rejected or not provisioned).
	pub fn rejected(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	/// Returns the number of attempts that could not reach a verdict.
	pub fn unavailable(&self) -> u64 {
		self.unavailable.load(Ordering::Relaxed)
	}

	/// Returns the number of attempts short-circuited because the mechanism was inert.
	pub fn skipped(&self) -> u64 {
		self.skipped.load(Ordering::Relaxed)
	}

	pub(crate) fn record(&self, outcome: AuthOutcome) {
		self.attempts.fetch_add(1, Ordering::Relaxed);

		let counter = match outcome {
			AuthOutcome::Authenticated => &self.authenticated,
			AuthOutcome::Rejected | AuthOutcome::NotProvisioned => &self.rejected,
			AuthOutcome::Unavailable | AuthOutcome::StoreUnavailable => &self.unavailable,
			AuthOutcome::NotApplicable | AuthOutcome::NoProvider => &self.skipped,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}
}
