//! OpenID Connect provider client: verifies bearer tokens through the userinfo endpoint.
//!
//! Verification is delegated to the identity provider itself. The client never needs signing
//! keys, remote revocation is honored immediately, and no verdict is cached: each call costs
//! one userinfo round trip.

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::http::{
	HeaderValue, Method, Request, StatusCode,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
};
// self
use crate::{
	_prelude::*,
	auth::{BearerAccessToken, ClientSecret, ProviderId, Subject, UserRecordIdentifier},
	config::OidcProviderSettings,
	error::TransportError,
	http::{
		AsyncHttpClient, DEFAULT_REQUEST_TIMEOUT, HttpRequest, HttpResponse, ProviderHttpClient,
		TransportErrorMapper,
	},
	obs::{self, AttemptOutcome, AuthSpan},
	oidc::{UserInfo, discovery},
	provider::{
		AuthenticationProvider, DefaultProviderStrategy, ProtocolType, ProviderErrorContext,
		ProviderErrorKind, ProviderMetadata, ProviderStrategy, VerifyFuture,
	},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

const ENDPOINT: &str = "userinfo";

#[cfg(feature = "reqwest")]
/// OIDC provider specialized for the crate's default reqwest transport stack.
pub type ReqwestOidcProvider = OidcProvider<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// One configured OpenID Connect provider.
///
/// Discovery metadata is resolved once at construction and only used to locate the userinfo
/// endpoint; it is never re-fetched per request.
pub struct OidcProvider<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	id: ProviderId,
	title: Option<String>,
	client_id: String,
	client_secret: Option<ClientSecret>,
	metadata: ProviderMetadata,
	strategy: Arc<dyn ProviderStrategy>,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	timeout: StdDuration,
}
impl<C, M> OidcProvider<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a provider from already-resolved metadata.
	pub fn with_metadata(
		id: ProviderId,
		client_id: impl Into<String>,
		metadata: ProviderMetadata,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			id,
			title: None,
			client_id: client_id.into(),
			client_secret: None,
			metadata,
			strategy: Arc::new(DefaultProviderStrategy),
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}

	/// Resolves discovery metadata for `settings` and builds the provider.
	pub async fn discover(
		settings: &OidcProviderSettings,
		timeout: StdDuration,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		settings.validate()?;

		let http_client = http_client.into();
		let mapper = mapper.into();
		let metadata = discovery::discover(
			&settings.auth_server_url,
			settings.allow_insecure_http,
			http_client.as_ref(),
			mapper.as_ref(),
			timeout,
		)
		.await?;
		let mut provider = Self::with_metadata(
			settings.id.clone(),
			settings.client_id.clone(),
			metadata,
			http_client,
			mapper,
		)
		.with_timeout(timeout);

		provider.title = settings.title.clone();
		provider.client_secret = settings.client_secret.clone();

		tracing::info!(provider = %provider.id, issuer = %provider.metadata.issuer, "OIDC provider ready.");

		Ok(provider)
	}

	/// Sets the display title.
	pub fn with_title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());

		self
	}

	/// Sets or replaces the client secret kept for confidential-client operations.
	pub fn with_client_secret(mut self, secret: ClientSecret) -> Self {
		self.client_secret = Some(secret);

		self
	}

	/// Overrides the strategy used to classify userinfo failures.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Overrides the bound applied to every userinfo call.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Provider identifier.
	pub fn id(&self) -> &ProviderId {
		&self.id
	}

	/// Display title, when configured.
	pub fn title(&self) -> Option<&str> {
		self.title.as_deref()
	}

	/// OAuth client identifier registered with the provider.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Returns true when a client secret is configured.
	pub fn has_client_secret(&self) -> bool {
		self.client_secret.is_some()
	}

	/// Discovery metadata resolved at construction.
	pub fn metadata(&self) -> &ProviderMetadata {
		&self.metadata
	}

	/// Fetches the claims the provider releases for `token`.
	///
	/// Returns `Ok(None)` when the provider rejects the token, and a [`TransportError`] when no
	/// verdict could be obtained. A token that cannot be sent as a bearer credential is rejected
	/// without a request.
	pub async fn get_user_info(
		&self,
		token: &BearerAccessToken,
	) -> Result<Option<UserInfo>, TransportError> {
		if !token.is_well_formed() {
			tracing::debug!(provider = %self.id, "Malformed bearer token rejected locally.");

			return Ok(None);
		}

		let request = self.userinfo_request(token)?;
		let handle = self.http_client.handle(self.timeout);
		let response = handle
			.call(request)
			.await
			.map_err(|err| self.transport_mapper.map_transport_error(ENDPOINT, err))?;

		if response.status().is_success() {
			return parse_user_info(&response).map(Some);
		}

		let ctx = error_context(&response);

		match self.strategy.classify_userinfo_error(&ctx) {
			ProviderErrorKind::TokenRejected => {
				tracing::debug!(
					provider = %self.id,
					status = ctx.http_status,
					error = ctx.bearer_error.as_deref(),
					"Userinfo endpoint rejected the token."
				);

				Ok(None)
			},
			ProviderErrorKind::Unavailable => Err(TransportError::UnexpectedResponse {
				endpoint: ENDPOINT,
				message: ctx
					.error_description
					.or(ctx.bearer_error)
					.unwrap_or_else(|| format!("HTTP {}", response.status().as_u16())),
				status: ctx.http_status,
				retry_after: crate::http::parse_retry_after(response.headers()),
			}),
		}
	}

	/// Derives the remote account identifier for `token` from verified claims.
	pub async fn get_user_identifier(
		&self,
		token: &BearerAccessToken,
	) -> Result<Option<UserRecordIdentifier>, TransportError> {
		Ok(self.get_user_info(token).await?.map(|info| info.identifier(&self.id)))
	}

	fn userinfo_request(&self, token: &BearerAccessToken) -> Result<HttpRequest, TransportError> {
		let mut credential = HeaderValue::try_from(format!("Bearer {}", token.expose()))
			.map_err(oauth2::http::Error::from)?;

		credential.set_sensitive(true);

		let mut request = Request::builder()
			.method(Method::GET)
			.uri(self.metadata.userinfo_endpoint.as_str())
			.header(ACCEPT, "application/json")
			.header(AUTHORIZATION, credential)
			.body(Vec::new())?;

		self.strategy.augment_userinfo_request(&mut request);

		Ok(request)
	}
}
impl<C, M> AuthenticationProvider for OidcProvider<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn id(&self) -> &ProviderId {
		&self.id
	}

	fn protocol(&self) -> ProtocolType {
		ProtocolType::Oidc
	}

	fn verify<'a>(
		&'a self,
		token: &'a BearerAccessToken,
	) -> VerifyFuture<'a, Option<UserRecordIdentifier>> {
		let span = AuthSpan::provider(&self.id);

		Box::pin(span.instrument(async move {
			let result = self.get_user_identifier(token).await;
			let outcome = match &result {
				Ok(Some(_)) => AttemptOutcome::Verified,
				Ok(None) => AttemptOutcome::Rejected,
				Err(_) => AttemptOutcome::Unavailable,
			};

			obs::record_provider_attempt(&self.id, outcome);

			result
		}))
	}
}
impl<C, M> Debug for OidcProvider<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OidcProvider")
			.field("id", &self.id)
			.field("title", &self.title)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("metadata", &self.metadata)
			.field("timeout", &self.timeout)
			.finish()
	}
}

fn parse_user_info(response: &HttpResponse) -> Result<UserInfo, TransportError> {
	let signed = response
		.headers()
		.get(CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.is_some_and(|value| value.trim_start().to_ascii_lowercase().starts_with("application/jwt"));

	if signed {
		return Err(TransportError::UnexpectedResponse {
			endpoint: ENDPOINT,
			message: "signed userinfo responses are not supported".into(),
			status: Some(response.status().as_u16()),
			retry_after: None,
		});
	}

	let de = &mut serde_json::Deserializer::from_slice(response.body());
	let claims: serde_json::Map<String, serde_json::Value> = serde_path_to_error::deserialize(de)
		.map_err(|err| TransportError::malformed(ENDPOINT, err))?;

	match claims.get("sub") {
		Some(serde_json::Value::String(sub)) => {
			Subject::new(sub)
				.map_err(|err| TransportError::InvalidSubject { reason: err.to_string() })?;
		},
		Some(_) =>
			return Err(TransportError::InvalidSubject { reason: "`sub` is not a string".into() }),
		None =>
			return Err(TransportError::InvalidSubject { reason: "`sub` claim is missing".into() }),
	}

	serde_path_to_error::deserialize(serde_json::Value::Object(claims))
		.map_err(|err| TransportError::malformed(ENDPOINT, err))
}

#[derive(Deserialize)]
struct ErrorBody {
	error: Option<String>,
	error_description: Option<String>,
}

fn error_context(response: &HttpResponse) -> ProviderErrorContext {
	let status = response.status();
	let mut ctx = ProviderErrorContext::new().with_http_status(status.as_u16());

	if let Ok(body) = serde_json::from_slice::<ErrorBody>(response.body()) {
		if let Some(error) = body.error {
			ctx = ctx.with_bearer_error(error);
		}
		if let Some(description) = body.error_description {
			ctx = ctx.with_error_description(description);
		}
	} else if !response.body().is_empty() && status != StatusCode::UNAUTHORIZED {
		ctx = ctx.with_body_preview(String::from_utf8_lossy(response.body()));
	}
	if let Some(challenge) =
		response.headers().get(WWW_AUTHENTICATE).and_then(|value| value.to_str().ok())
	{
		ctx = ctx.with_challenge(challenge);
	}

	ctx
}
