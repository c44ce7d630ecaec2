//! OpenID Connect discovery (`/.well-known/openid-configuration`).

// crates.io
use oauth2::http::{Method, Request, header::ACCEPT};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	http::{AsyncHttpClient, HttpRequest, ProviderHttpClient, TransportErrorMapper},
	provider::ProviderMetadata,
};

const WELL_KNOWN_PATH: &str = ".well-known/openid-configuration";
const ENDPOINT: &str = "discovery";

/// Subset of the discovery document the crate relies on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
	/// Issuer identifier announced by the provider.
	pub issuer: Url,
	/// Authorization endpoint.
	#[serde(default)]
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint.
	pub token_endpoint: Url,
	/// Userinfo endpoint.
	#[serde(default)]
	pub userinfo_endpoint: Option<Url>,
	/// JWKS endpoint.
	#[serde(default)]
	pub jwks_uri: Option<Url>,
}
impl DiscoveryDocument {
	/// Validates the document against the configured issuer and converts it into metadata.
	pub fn into_metadata(
		self,
		expected_issuer: &Url,
		allow_insecure_http: bool,
	) -> Result<ProviderMetadata, ConfigError> {
		if !same_issuer(expected_issuer, &self.issuer) {
			return Err(ConfigError::IssuerMismatch {
				expected: expected_issuer.to_string(),
				actual: self.issuer.to_string(),
			});
		}

		let mut builder = ProviderMetadata::builder(self.issuer)
			.token_endpoint(self.token_endpoint)
			.allow_insecure_http(allow_insecure_http);

		if let Some(url) = self.authorization_endpoint {
			builder = builder.authorization_endpoint(url);
		}
		if let Some(url) = self.userinfo_endpoint {
			builder = builder.userinfo_endpoint(url);
		}
		if let Some(url) = self.jwks_uri {
			builder = builder.jwks_uri(url);
		}

		Ok(builder.build()?)
	}
}

/// Returns the discovery URL for `issuer`, keeping any path (e.g. `/realms/<name>`).
pub fn discovery_url(issuer: &Url) -> Result<Url, ConfigError> {
	let mut base = issuer.clone();

	if !base.path().ends_with('/') {
		let path = format!("{}/", base.path());

		base.set_path(&path);
	}

	base.join(WELL_KNOWN_PATH).map_err(|source| ConfigError::InvalidUrl { source })
}

/// Fetches and validates the discovery document of `issuer`.
pub async fn discover<C, M>(
	issuer: &Url,
	allow_insecure_http: bool,
	http_client: &C,
	mapper: &M,
	timeout: std::time::Duration,
) -> Result<ProviderMetadata>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let url = discovery_url(issuer)?;
	let document = fetch_document(&url, http_client, mapper, timeout).await.map_err(|source| {
		ConfigError::Discovery { issuer: issuer.to_string(), source }
	})?;
	let metadata = document.into_metadata(issuer, allow_insecure_http)?;

	tracing::debug!(
		issuer = %metadata.issuer,
		userinfo = %metadata.userinfo_endpoint,
		"Discovery document resolved."
	);

	Ok(metadata)
}

async fn fetch_document<C, M>(
	url: &Url,
	http_client: &C,
	mapper: &M,
	timeout: std::time::Duration,
) -> Result<DiscoveryDocument, TransportError>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let request: HttpRequest = Request::builder()
		.method(Method::GET)
		.uri(url.as_str())
		.header(ACCEPT, "application/json")
		.body(Vec::new())?;
	let handle = http_client.handle(timeout);
	let response =
		handle.call(request).await.map_err(|err| mapper.map_transport_error(ENDPOINT, err))?;
	let status = response.status();

	if !status.is_success() {
		return Err(TransportError::UnexpectedResponse {
			endpoint: ENDPOINT,
			message: format!("discovery returned HTTP {}", status.as_u16()),
			status: Some(status.as_u16()),
			retry_after: crate::http::parse_retry_after(response.headers()),
		});
	}

	let de = &mut serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(de).map_err(|err| TransportError::malformed(ENDPOINT, err))
}

fn same_issuer(expected: &Url, actual: &Url) -> bool {
	expected.as_str().trim_end_matches('/') == actual.as_str().trim_end_matches('/')
}
