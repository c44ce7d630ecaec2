//! Settings model for providers and feature flags, plus the reload lifecycle.
//!
//! Settings load from a JSON document ([`AuthSettings::from_json_str`]) or from
//! environment-style key/value pairs ([`AuthSettings::from_env_vars`]). Absent configuration is
//! an empty provider set, never an error.

// std
use std::{
	collections::HashSet,
	sync::atomic::{AtomicBool, Ordering},
	time::Duration as StdDuration,
};
// self
use crate::{
	_prelude::*,
	auth::{ClientSecret, ProviderId},
	error::ConfigError,
	http::{DEFAULT_REQUEST_TIMEOUT, ProviderHttpClient, TransportErrorMapper},
	oidc::OidcProvider,
	provider::{ProviderRegistry, SharedProvider},
};

/// Identifier used when a provider entry does not name itself.
pub const DEFAULT_PROVIDER_ID: &str = "oidc";

/// Environment key holding the OAuth client identifier.
pub const ENV_OIDC_CLIENT_ID: &str = "AUTH_OIDC_CLIENT_ID";
/// Environment key holding the OAuth client secret.
pub const ENV_OIDC_CLIENT_SECRET: &str = "AUTH_OIDC_CLIENT_SECRET";
/// Environment key holding the authorization-server (issuer) URL.
pub const ENV_OIDC_AUTH_SERVER_URL: &str = "AUTH_OIDC_AUTH_SERVER_URL";
/// Environment key overriding the provider identifier.
pub const ENV_OIDC_PROVIDER_ID: &str = "AUTH_OIDC_PROVIDER_ID";
/// Environment key holding the provider display title.
pub const ENV_OIDC_TITLE: &str = "AUTH_OIDC_TITLE";
/// Environment key toggling bearer-token API authentication.
pub const ENV_FEATURE_API_BEARER_AUTH: &str = "AUTH_FEATURE_API_BEARER_AUTH";
/// Environment key holding the remote-call timeout in milliseconds.
pub const ENV_HTTP_TIMEOUT_MS: &str = "AUTH_HTTP_TIMEOUT_MS";

/// Process-wide feature flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
	/// Enables bearer-token authentication on API requests.
	pub api_bearer_auth: bool,
}

/// Settings for one OIDC provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcProviderSettings {
	/// Unique provider identifier.
	#[serde(default = "default_provider_id")]
	pub id: ProviderId,
	/// Display title.
	#[serde(default)]
	pub title: Option<String>,
	/// OAuth client identifier registered with the provider.
	pub client_id: String,
	/// OAuth client secret.
	#[serde(default)]
	pub client_secret: Option<ClientSecret>,
	/// Authorization-server URL; also the expected discovery issuer.
	pub auth_server_url: Url,
	/// Permits plain-HTTP endpoints. Local testing only.
	#[serde(default)]
	pub allow_insecure_http: bool,
}
impl OidcProviderSettings {
	/// Creates settings for `auth_server_url` under the default provider identifier.
	pub fn new(client_id: impl Into<String>, auth_server_url: Url) -> Self {
		Self {
			id: default_provider_id(),
			title: None,
			client_id: client_id.into(),
			client_secret: None,
			auth_server_url,
			allow_insecure_http: false,
		}
	}

	/// Checks the entry for values discovery cannot work without.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingSetting {
				provider: self.id.to_string(),
				field: "client_id",
			});
		}
		if !self.allow_insecure_http && self.auth_server_url.scheme() != "https" {
			return Err(ConfigError::InvalidSetting {
				key: "auth_server_url".into(),
				reason: format!("`{}` must use https", self.auth_server_url),
			});
		}

		Ok(())
	}
}

/// Top-level authentication settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
	/// Feature flags.
	pub features: FeatureFlags,
	/// Configured OIDC providers, in candidate order.
	pub oidc: Vec<OidcProviderSettings>,
	/// Bound applied to every remote call, in milliseconds.
	pub request_timeout_ms: u64,
}
impl AuthSettings {
	/// Parses settings from a JSON document.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(de).map_err(ConfigError::invalid_settings)
	}

	/// Parses settings from JSON bytes.
	pub fn from_json_slice(raw: &[u8]) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_slice(raw);

		serde_path_to_error::deserialize(de).map_err(ConfigError::invalid_settings)
	}

	/// Builds settings from environment-style pairs; unknown keys are ignored.
	///
	/// A single provider is configured when any `AUTH_OIDC_*` connection key is present, in
	/// which case both the client id and the server URL are required.
	pub fn from_env_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let vars = vars
			.into_iter()
			.map(|(key, value)| (key.into(), value.into()))
			.filter(|(_, value): &(String, String)| !value.trim().is_empty())
			.collect::<HashMap<_, _>>();
		let mut settings = Self::default();

		if let Some(raw) = vars.get(ENV_FEATURE_API_BEARER_AUTH) {
			settings.features.api_bearer_auth = parse_flag(ENV_FEATURE_API_BEARER_AUTH, raw)?;
		}
		if let Some(raw) = vars.get(ENV_HTTP_TIMEOUT_MS) {
			settings.request_timeout_ms =
				raw.trim().parse().map_err(|_| ConfigError::InvalidSetting {
					key: ENV_HTTP_TIMEOUT_MS.into(),
					reason: format!("`{raw}` is not a number of milliseconds"),
				})?;
		}

		let configured = [ENV_OIDC_CLIENT_ID, ENV_OIDC_CLIENT_SECRET, ENV_OIDC_AUTH_SERVER_URL]
			.iter()
			.any(|key| vars.contains_key(*key));

		if !configured {
			return Ok(settings);
		}

		let id = match vars.get(ENV_OIDC_PROVIDER_ID) {
			Some(raw) => ProviderId::new(raw.trim()).map_err(|err| ConfigError::InvalidSetting {
				key: ENV_OIDC_PROVIDER_ID.into(),
				reason: err.to_string(),
			})?,
			None => default_provider_id(),
		};
		let client_id = vars.get(ENV_OIDC_CLIENT_ID).cloned().ok_or_else(|| {
			ConfigError::MissingSetting { provider: id.to_string(), field: "client_id" }
		})?;
		let raw_url = vars.get(ENV_OIDC_AUTH_SERVER_URL).ok_or_else(|| {
			ConfigError::MissingSetting { provider: id.to_string(), field: "auth_server_url" }
		})?;
		let auth_server_url =
			Url::parse(raw_url.trim()).map_err(|err| ConfigError::InvalidSetting {
				key: ENV_OIDC_AUTH_SERVER_URL.into(),
				reason: err.to_string(),
			})?;
		let mut provider = OidcProviderSettings::new(client_id, auth_server_url);

		provider.id = id;
		provider.title = vars.get(ENV_OIDC_TITLE).cloned();
		provider.client_secret = vars.get(ENV_OIDC_CLIENT_SECRET).cloned().map(ClientSecret::new);
		settings.oidc.push(provider);

		Ok(settings)
	}

	/// Builds settings from the current process environment.
	pub fn from_process_env() -> Result<Self, ConfigError> {
		Self::from_env_vars(std::env::vars())
	}

	/// Validates every provider entry and rejects duplicate identifiers.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let mut seen = HashSet::new();

		for provider in &self.oidc {
			provider.validate()?;

			if !seen.insert(&provider.id) {
				return Err(ConfigError::DuplicateProvider(provider.id.to_string()));
			}
		}
		if self.request_timeout_ms == 0 {
			return Err(ConfigError::InvalidSetting {
				key: "request_timeout_ms".into(),
				reason: "timeout must be positive".into(),
			});
		}

		Ok(())
	}

	/// Bound applied to every remote call.
	pub fn request_timeout(&self) -> StdDuration {
		StdDuration::from_millis(self.request_timeout_ms)
	}
}
impl Default for AuthSettings {
	fn default() -> Self {
		Self {
			features: FeatureFlags::default(),
			oidc: Vec::new(),
			request_timeout_ms: u64::try_from(DEFAULT_REQUEST_TIMEOUT.as_millis())
				.unwrap_or(u64::MAX),
		}
	}
}

/// Process-wide switch for bearer-token authentication, readable without locking.
#[derive(Debug, Default)]
pub struct FeatureSwitch(AtomicBool);
impl FeatureSwitch {
	/// Creates a switch in the given state.
	pub fn new(enabled: bool) -> Self {
		Self(AtomicBool::new(enabled))
	}

	/// Returns true when bearer-token authentication is enabled.
	pub fn is_enabled(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}

	/// Flips the switch.
	pub fn set(&self, enabled: bool) {
		self.0.store(enabled, Ordering::Release);
	}

	/// Applies the flag carried by `flags`.
	pub fn apply(&self, flags: &FeatureFlags) {
		self.set(flags.api_bearer_auth);
	}
}
impl From<FeatureFlags> for FeatureSwitch {
	fn from(flags: FeatureFlags) -> Self {
		Self::new(flags.api_bearer_auth)
	}
}

/// Discovers every configured OIDC provider, in configuration order.
///
/// Fails on the first provider whose settings or discovery are invalid; nothing is returned
/// partially.
pub async fn discover_providers<C, M>(
	settings: &AuthSettings,
	http_client: Arc<C>,
	mapper: Arc<M>,
) -> Result<Vec<SharedProvider>>
where
	C: ProviderHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	settings.validate()?;

	let timeout = settings.request_timeout();
	let mut providers = Vec::with_capacity(settings.oidc.len());

	for entry in &settings.oidc {
		let provider =
			OidcProvider::<C, M>::discover(entry, timeout, http_client.clone(), mapper.clone())
				.await?;

		providers.push(Arc::new(provider) as SharedProvider);
	}

	Ok(providers)
}

/// Applies `settings` to a running process: discovers every provider, swaps the registry, and
/// then updates the feature switch.
///
/// On any error neither the registry nor the switch changes.
pub async fn apply_settings<C, M>(
	settings: &AuthSettings,
	registry: &ProviderRegistry,
	features: &FeatureSwitch,
	http_client: Arc<C>,
	mapper: Arc<M>,
) -> Result<usize>
where
	C: ProviderHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	let providers = discover_providers(settings, http_client, mapper).await.inspect_err(|err| {
		tracing::error!(error = %err, "Provider configuration rejected; keeping the active set.");
	})?;
	let count = registry.reload(providers)?;

	features.apply(&settings.features);

	if count == 0 {
		tracing::debug!("No OIDC provider configured.");
	}

	Ok(count)
}

fn default_provider_id() -> ProviderId {
	ProviderId::from_static(DEFAULT_PROVIDER_ID)
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		other => Err(ConfigError::InvalidSetting {
			key: key.into(),
			reason: format!("`{other}` is not a boolean"),
		}),
	}
}
