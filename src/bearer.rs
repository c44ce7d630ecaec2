//! Bearer Token Auth Mechanism: turns a raw access token into a local account.
//!
//! Each call walks a fixed state machine: feature gate, candidate enumeration, per-provider
//! verification in registry order, local resolution, and a best-effort last-use update. No
//! verdict is cached between calls.

mod metrics;

pub use metrics::AuthMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AuthenticatedUser, BearerAccessToken, ProviderId, UserRecordIdentifier},
	config::FeatureSwitch,
	error::TransportError,
	obs::{self, AuthOutcome, AuthSpan},
	provider::{ProtocolType, ProviderDirectory},
	store::{StoreError, UserResolver},
};

/// Why an otherwise well-formed request ended unauthenticated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnauthenticatedReason {
	/// Every configured provider rejected the token.
	TokenRejected,
	/// A provider verified the token but no local account is bound to the identity.
	NotProvisioned {
		/// Verified remote identity.
		identifier: UserRecordIdentifier,
	},
}
impl Display for UnauthenticatedReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::TokenRejected => f.write_str("the token was not accepted by any provider"),
			Self::NotProvisioned { .. } =>
				f.write_str("no local account is bound to the verified identity"),
		}
	}
}

/// Transport failure recorded for one provider during an attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderFailure {
	/// Provider that could not give a verdict.
	pub provider: ProviderId,
	/// Diagnostic message; never contains the token.
	pub message: String,
	/// Retry hint forwarded from the provider, if any.
	pub retry_after: Option<Duration>,
}
impl ProviderFailure {
	fn new(provider: ProviderId, error: &TransportError) -> Self {
		Self { provider, message: error.to_string(), retry_after: error.retry_after() }
	}
}

/// Terminal failure states of [`BearerTokenAuth::authenticate`].
#[derive(Debug, ThisError)]
pub enum AuthFailure {
	/// Bearer-token authentication is switched off; nothing was attempted.
	#[error("Bearer token authentication is not enabled.")]
	NotApplicable,
	/// No OIDC provider is configured.
	#[error("No OIDC provider is configured.")]
	NoProvider,
	/// The request is not authenticated.
	#[error("Bearer token is not authenticated: {reason}.")]
	Unauthenticated {
		/// Why the token did not yield an account.
		reason: UnauthenticatedReason,
	},
	/// No provider accepted the token and at least one could not be reached.
	#[error("Token verification is unavailable ({} provider(s) unreachable).", .failures.len())]
	VerificationUnavailable {
		/// Per-provider transport failures, in attempt order.
		failures: Vec<ProviderFailure>,
	},
	/// The local user store failed while resolving a verified identity.
	#[error("User store is unavailable.")]
	UserStoreUnavailable {
		/// Underlying store failure.
		#[source]
		source: StoreError,
	},
}
impl AuthFailure {
	/// Outcome label for this failure.
	pub fn outcome(&self) -> AuthOutcome {
		match self {
			Self::NotApplicable => AuthOutcome::NotApplicable,
			Self::NoProvider => AuthOutcome::NoProvider,
			Self::Unauthenticated { reason: UnauthenticatedReason::TokenRejected } =>
				AuthOutcome::Rejected,
			Self::Unauthenticated { reason: UnauthenticatedReason::NotProvisioned { .. } } =>
				AuthOutcome::NotProvisioned,
			Self::VerificationUnavailable { .. } => AuthOutcome::Unavailable,
			Self::UserStoreUnavailable { .. } => AuthOutcome::StoreUnavailable,
		}
	}

	/// Returns true when retrying the same token later could succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::VerificationUnavailable { .. } | Self::UserStoreUnavailable { .. })
	}

	/// Longest retry hint reported by any unreachable provider.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::VerificationUnavailable { failures } =>
				failures.iter().filter_map(|failure| failure.retry_after).max(),
			_ => None,
		}
	}
}

/// Authenticates API requests carrying an OIDC access token.
///
/// Holds no per-request state; clone the `Arc`s freely and share one instance across requests.
#[derive(Clone)]
pub struct BearerTokenAuth {
	providers: Arc<dyn ProviderDirectory>,
	users: Arc<dyn UserResolver>,
	features: Arc<FeatureSwitch>,
	metrics: Arc<AuthMetrics>,
}
impl BearerTokenAuth {
	/// Wires the mechanism to its collaborators.
	pub fn new(
		providers: Arc<dyn ProviderDirectory>,
		users: Arc<dyn UserResolver>,
		features: Arc<FeatureSwitch>,
	) -> Self {
		Self { providers, users, features, metrics: Default::default() }
	}

	/// In-process outcome counters.
	pub fn metrics(&self) -> &AuthMetrics {
		&self.metrics
	}

	/// Resolves `token` to the local account it authenticates.
	///
	/// Providers are tried in registry order and the first one to verify the token wins. A
	/// provider outage never stops the remaining providers from being tried, and never turns
	/// into a rejection of the token.
	pub async fn authenticate(
		&self,
		token: &BearerAccessToken,
	) -> Result<AuthenticatedUser, AuthFailure> {
		let result = if self.features.is_enabled() {
			let span = AuthSpan::authenticate(&token.fingerprint());

			span.instrument(self.run(token)).await
		} else {
			Err(AuthFailure::NotApplicable)
		};
		let outcome = match &result {
			Ok(_) => AuthOutcome::Authenticated,
			Err(failure) => failure.outcome(),
		};

		self.metrics.record(outcome);
		obs::record_auth_outcome(outcome);

		result
	}

	async fn run(&self, token: &BearerAccessToken) -> Result<AuthenticatedUser, AuthFailure> {
		let identifier = self.verify(token).await?;
		let user = self.resolve(identifier).await?;

		match self.users.update_last_api_use_time(user.clone()).await {
			Ok(updated) => Ok(updated),
			Err(err) => {
				tracing::warn!(user = %user.id, error = %err, "Failed to record API use.");

				Ok(user)
			},
		}
	}

	async fn verify(&self, token: &BearerAccessToken) -> Result<UserRecordIdentifier, AuthFailure> {
		let candidates = self.providers.providers_of_type(ProtocolType::Oidc);

		if candidates.is_empty() {
			tracing::debug!("Bearer token presented but no OIDC provider is configured.");

			return Err(AuthFailure::NoProvider);
		}
		if !token.is_well_formed() {
			tracing::debug!("Malformed bearer token rejected before contacting any provider.");

			return Err(AuthFailure::Unauthenticated { reason: UnauthenticatedReason::TokenRejected });
		}

		let mut failures = Vec::new();

		for provider in candidates {
			match provider.verify(token).await {
				Ok(Some(identifier)) => {
					tracing::debug!(provider = %provider.id(), "Token verified.");

					return Ok(identifier);
				},
				Ok(None) => {
					tracing::debug!(provider = %provider.id(), "Token rejected by provider.");
				},
				Err(err) => {
					tracing::warn!(
						provider = %provider.id(),
						error = %err,
						"Provider could not verify the token; trying the next one."
					);

					failures.push(ProviderFailure::new(provider.id().clone(), &err));
				},
			}
		}

		if failures.is_empty() {
			Err(AuthFailure::Unauthenticated { reason: UnauthenticatedReason::TokenRejected })
		} else {
			Err(AuthFailure::VerificationUnavailable { failures })
		}
	}

	async fn resolve(
		&self,
		identifier: UserRecordIdentifier,
	) -> Result<AuthenticatedUser, AuthFailure> {
		match self.users.lookup_user(&identifier).await {
			Ok(Some(user)) => Ok(user),
			Ok(None) => {
				tracing::warn!(
					identifier = %identifier,
					"Verified identity is not bound to a local account."
				);

				Err(AuthFailure::Unauthenticated {
					reason: UnauthenticatedReason::NotProvisioned { identifier },
				})
			},
			Err(source) => {
				tracing::error!(identifier = %identifier, error = %source, "User lookup failed.");

				Err(AuthFailure::UserStoreUnavailable { source })
			},
		}
	}
}
impl Debug for BearerTokenAuth {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BearerTokenAuth")
			.field("enabled", &self.features.is_enabled())
			.field("metrics", &self.metrics)
			.finish()
	}
}
