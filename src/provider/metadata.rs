//! Discovery metadata for a single identity provider, plus its validating builder.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating provider metadata.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderMetadataError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Userinfo endpoint is mandatory for bearer-token verification.
	#[error("Missing userinfo endpoint.")]
	MissingUserInfoEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Issuer metadata resolved once, when the provider is constructed.
///
/// Used by diagnostics to check configuration; it is never re-fetched per request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
	/// Issuer identifier (authorization-server URL).
	pub issuer: Url,
	/// Authorization endpoint, when announced.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint.
	pub token_endpoint: Url,
	/// Userinfo endpoint queried to verify bearer tokens.
	pub userinfo_endpoint: Url,
	/// JWKS endpoint, when announced.
	pub jwks_uri: Option<Url>,
}
impl ProviderMetadata {
	/// Creates a new builder for the provided issuer.
	pub fn builder(issuer: Url) -> ProviderMetadataBuilder {
		ProviderMetadataBuilder::new(issuer)
	}

	fn validate(&self, allow_insecure_http: bool) -> Result<(), ProviderMetadataError> {
		if allow_insecure_http {
			return Ok(());
		}

		validate_endpoint("issuer", &self.issuer)?;
		validate_endpoint("token", &self.token_endpoint)?;
		validate_endpoint("userinfo", &self.userinfo_endpoint)?;

		if let Some(authorization) = self.authorization_endpoint.as_ref() {
			validate_endpoint("authorization", authorization)?;
		}
		if let Some(jwks) = self.jwks_uri.as_ref() {
			validate_endpoint("jwks", jwks)?;
		}

		Ok(())
	}
}

/// Builder for [`ProviderMetadata`] values.
#[derive(Debug)]
pub struct ProviderMetadataBuilder {
	/// Issuer identifier.
	pub issuer: Url,
	/// Optional authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint.
	pub token_endpoint: Option<Url>,
	/// Userinfo endpoint.
	pub userinfo_endpoint: Option<Url>,
	/// Optional JWKS endpoint.
	pub jwks_uri: Option<Url>,
	/// Accepts plain `http` endpoints; local testing only.
	pub allow_insecure_http: bool,
}
impl ProviderMetadataBuilder {
	/// Creates a new builder seeded with the provided issuer.
	pub fn new(issuer: Url) -> Self {
		Self {
			issuer,
			authorization_endpoint: None,
			token_endpoint: None,
			userinfo_endpoint: None,
			jwks_uri: None,
			allow_insecure_http: false,
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the userinfo endpoint.
	pub fn userinfo_endpoint(mut self, url: Url) -> Self {
		self.userinfo_endpoint = Some(url);

		self
	}

	/// Sets the JWKS endpoint.
	pub fn jwks_uri(mut self, url: Url) -> Self {
		self.jwks_uri = Some(url);

		self
	}

	/// Allows plain `http` endpoints.
	pub fn allow_insecure_http(mut self, allow: bool) -> Self {
		self.allow_insecure_http = allow;

		self
	}

	/// Consumes the builder and validates the resulting metadata.
	pub fn build(self) -> Result<ProviderMetadata, ProviderMetadataError> {
		let token_endpoint =
			self.token_endpoint.ok_or(ProviderMetadataError::MissingTokenEndpoint)?;
		let userinfo_endpoint =
			self.userinfo_endpoint.ok_or(ProviderMetadataError::MissingUserInfoEndpoint)?;
		let metadata = ProviderMetadata {
			issuer: self.issuer,
			authorization_endpoint: self.authorization_endpoint,
			token_endpoint,
			userinfo_endpoint,
			jwks_uri: self.jwks_uri,
		};

		metadata.validate(self.allow_insecure_http)?;

		Ok(metadata)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderMetadataError> {
	if url.scheme() != "https" {
		Err(ProviderMetadataError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}
