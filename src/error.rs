//! Crate-level error types shared across providers, transports, and configuration.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by construction, discovery, and reload APIs.
///
/// Per-request verification never surfaces this type to callers; it reports
/// [`AuthFailure`](crate::bearer::AuthFailure) instead.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure while talking to an identity provider.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Settings document could not be parsed.
	#[error("Settings are invalid at `{path}`.")]
	InvalidSettings {
		/// Path of the offending field inside the document.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// A single settings value could not be interpreted.
	#[error("Setting `{key}` is invalid: {reason}.")]
	InvalidSetting {
		/// Setting key.
		key: String,
		/// Human-readable reason.
		reason: String,
	},
	/// A provider entry is missing a required value.
	#[error("Provider `{provider}` is missing `{field}`.")]
	MissingSetting {
		/// Provider identifier string.
		provider: String,
		/// Missing field name.
		field: &'static str,
	},
	/// Two providers share the same identifier.
	#[error("Provider identifier `{0}` is registered more than once.")]
	DuplicateProvider(String),
	/// Provider metadata failed validation.
	#[error(transparent)]
	InvalidMetadata(#[from] crate::provider::ProviderMetadataError),
	/// URL could not be parsed or joined.
	#[error("URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Discovery document announced a different issuer than the configured one.
	#[error("Discovery issuer mismatch: expected `{expected}`, got `{actual}`.")]
	IssuerMismatch {
		/// Configured authorization-server URL.
		expected: String,
		/// Issuer announced by the discovery document.
		actual: String,
	},
	/// Discovery document could not be fetched or parsed.
	#[error("Discovery failed for `{issuer}`.")]
	Discovery {
		/// Issuer whose discovery document failed.
		issuer: String,
		/// Underlying transport failure.
		#[source]
		source: TransportError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	pub(crate) fn invalid_settings(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = err.path().to_string();

		Self::InvalidSettings { path, source: err.into_inner() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-kind failures talking to an identity provider.
///
/// These never mean "the token is bad"; they mean the provider could not give a verdict.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure (DNS, TCP, TLS).
	#[error("Network error occurred while calling `{endpoint}`.")]
	Network {
		/// Endpoint label (`discovery`, `userinfo`).
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling an identity provider.")]
	Io(#[from] std::io::Error),
	/// The request exceeded its bounded timeout.
	#[error("Request to `{endpoint}` timed out.")]
	Timeout {
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	Request(#[from] oauth2::http::Error),
	/// Provider answered with a status that carries no verdict about the token.
	#[error("Endpoint `{endpoint}` returned an unexpected response: {message}.")]
	UnexpectedResponse {
		/// Endpoint label.
		endpoint: &'static str,
		/// Provider- or crate-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Provider responded with a body that could not be parsed.
	#[error("Endpoint `{endpoint}` returned a malformed document at `{path}`.")]
	MalformedResponse {
		/// Endpoint label.
		endpoint: &'static str,
		/// Path of the offending field.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// Provider returned a claims document without a usable subject.
	#[error("Userinfo response carries no valid subject: {reason}.")]
	InvalidSubject {
		/// Human-readable reason.
		reason: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}

	pub(crate) fn malformed(
		endpoint: &'static str,
		err: serde_path_to_error::Error<serde_json::Error>,
	) -> Self {
		let path = err.path().to_string();

		Self::MalformedResponse { endpoint, path, source: err.into_inner() }
	}

	/// Returns the retry hint attached to the failure, if any.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::UnexpectedResponse { retry_after, .. } => *retry_after,
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn invalid_settings_keeps_the_failing_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Settings {
			timeout: u64,
		}

		let de = &mut serde_json::Deserializer::from_str("{\"timeout\":\"soon\"}");
		let err = serde_path_to_error::deserialize::<_, Settings>(de)
			.expect_err("A string timeout should fail to deserialize.");
		let config = ConfigError::invalid_settings(err);

		assert!(matches!(&config, ConfigError::InvalidSettings { path, .. } if path == "timeout"));
		assert!(config.to_string().contains("timeout"));
	}

	#[test]
	fn retry_hint_only_exists_on_unexpected_responses() {
		let err = TransportError::UnexpectedResponse {
			endpoint: "userinfo",
			message: "busy".into(),
			status: Some(503),
			retry_after: Some(Duration::seconds(30)),
		};

		assert_eq!(err.retry_after(), Some(Duration::seconds(30)));
		assert_eq!(TransportError::Timeout { endpoint: "userinfo" }.retry_after(), None);
	}

	#[test]
	fn crate_error_wraps_configuration_and_transport_failures() {
		let transport: Error = TransportError::Timeout { endpoint: "userinfo" }.into();
		let config: Error = ConfigError::http_client_build(std::io::Error::other("no tls")).into();

		assert!(matches!(transport, Error::Transport(TransportError::Timeout { .. })));
		assert!(matches!(config, Error::Config(_)));
		assert_eq!(transport.to_string(), TransportError::Timeout { endpoint: "userinfo" }.to_string());
	}
}
