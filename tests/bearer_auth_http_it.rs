// crates.io
use httpmock::prelude::*;
// self
use oidc_bearer_auth::{
	_preludet::*,
	auth::{AuthenticatedUser, BearerAccessToken, ProviderId, Subject, UserId, UserRecordIdentifier},
	bearer::{AuthFailure, BearerTokenAuth, UnauthenticatedReason},
	config::{self, AuthSettings, FeatureSwitch, OidcProviderSettings},
	http::ReqwestTransportErrorMapper,
	provider::{ProtocolType, ProviderRegistry},
	store::MemoryUserStore,
};

const USERINFO: &str = "/realms/test/protocol/openid-connect/userinfo";

struct Fixture {
	registry: Arc<ProviderRegistry>,
	features: Arc<FeatureSwitch>,
	users: MemoryUserStore,
	auth: BearerTokenAuth,
}
impl Fixture {
	fn new() -> Self {
		let registry = Arc::new(ProviderRegistry::default());
		let features = Arc::new(FeatureSwitch::default());
		let users = MemoryUserStore::default();
		let auth = BearerTokenAuth::new(registry.clone(), Arc::new(users.clone()), features.clone());

		Self { registry, features, users, auth }
	}

	async fn apply(&self, settings: &AuthSettings) -> Result<usize> {
		config::apply_settings(
			settings,
			&self.registry,
			&self.features,
			Arc::new(test_reqwest_http_client()),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.await
	}
}

fn settings_for(server: &MockServer, realm: &str) -> AuthSettings {
	let issuer = Url::parse(&server.url(format!("/realms/{realm}"))).expect("Issuer should parse.");
	let mut provider = OidcProviderSettings::new("test", issuer);

	provider.allow_insecure_http = true;

	let mut settings = AuthSettings::default();

	settings.features.api_bearer_auth = true;
	settings.oidc.push(provider);

	settings
}

async fn mock_discovery(server: &MockServer, realm: &str) {
	let issuer = server.url(format!("/realms/{realm}"));
	let body = format!(
		"{{\"issuer\":\"{issuer}\",\
		\"token_endpoint\":\"{issuer}/protocol/openid-connect/token\",\
		\"userinfo_endpoint\":\"{issuer}/protocol/openid-connect/userinfo\"}}"
	);

	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/realms/{realm}/.well-known/openid-configuration"));
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await;
}

fn identifier(subject: &str) -> UserRecordIdentifier {
	UserRecordIdentifier::new(
		ProviderId::new("oidc").expect("Provider fixture should be valid."),
		Subject::new(subject).expect("Subject fixture should be valid."),
	)
}

#[tokio::test]
async fn bound_keycloak_user_authenticates_end_to_end() {
	let server = MockServer::start_async().await;

	mock_discovery(&server, "test").await;

	let userinfo = server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO).header("authorization", "Bearer kc-access-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"kc-sub-1\",\"preferred_username\":\"kcuser\"}");
		})
		.await;
	let fixture = Fixture::new();

	assert_eq!(fixture.apply(&settings_for(&server, "test")).await.expect("Settings apply."), 1);
	assert!(fixture.features.is_enabled());

	let alice = AuthenticatedUser::new(UserId::new("alice").expect("User fixture should be valid."))
		.with_email("kcuser@example.com");

	fixture.users.insert_user(alice.clone());
	fixture.users.bind(identifier("kc-sub-1"), &alice.id).expect("Binding should succeed.");

	let user = fixture
		.auth
		.authenticate(&BearerAccessToken::new("kc-access-token"))
		.await
		.expect("Bound user should authenticate.");

	assert_eq!(user.id, alice.id);
	assert!(user.last_api_use.is_some());
	assert_eq!(fixture.users.user(&alice.id).and_then(|stored| stored.last_api_use), user.last_api_use);
	userinfo.assert_calls_async(1).await;
}

#[tokio::test]
async fn unknown_keycloak_user_is_not_provisioned() {
	let server = MockServer::start_async().await;

	mock_discovery(&server, "test").await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO);
			then.status(200).header("content-type", "application/json").body("{\"sub\":\"kc-sub-2\"}");
		})
		.await;

	let fixture = Fixture::new();

	fixture.apply(&settings_for(&server, "test")).await.expect("Settings apply.");

	let failure = fixture
		.auth
		.authenticate(&BearerAccessToken::new("kc-access-token"))
		.await
		.expect_err("Unbound identity must not authenticate.");

	assert!(matches!(
		failure,
		AuthFailure::Unauthenticated { reason: UnauthenticatedReason::NotProvisioned { .. } }
	));
	assert_eq!(fixture.users.user_count(), 0);
}

#[tokio::test]
async fn userinfo_rejection_is_unauthenticated() {
	let server = MockServer::start_async().await;

	mock_discovery(&server, "test").await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO);
			then.status(401).header("www-authenticate", "Bearer error=\"invalid_token\"");
		})
		.await;

	let fixture = Fixture::new();

	fixture.apply(&settings_for(&server, "test")).await.expect("Settings apply.");

	assert!(matches!(
		fixture.auth.authenticate(&BearerAccessToken::new("forged")).await,
		Err(AuthFailure::Unauthenticated { reason: UnauthenticatedReason::TokenRejected })
	));
}

#[tokio::test]
async fn disabled_flag_never_reaches_the_provider() {
	let server = MockServer::start_async().await;

	mock_discovery(&server, "test").await;

	let userinfo = server
		.mock_async(|when, then| {
			when.method(GET).path(USERINFO);
			then.status(200).body("{\"sub\":\"kc-sub-1\"}");
		})
		.await;
	let fixture = Fixture::new();
	let mut settings = settings_for(&server, "test");

	settings.features.api_bearer_auth = false;
	fixture.apply(&settings).await.expect("Settings apply.");

	assert!(matches!(
		fixture.auth.authenticate(&BearerAccessToken::new("kc-access-token")).await,
		Err(AuthFailure::NotApplicable)
	));
	userinfo.assert_calls_async(0).await;
}

#[tokio::test]
async fn failed_reload_keeps_the_active_configuration() {
	let server = MockServer::start_async().await;

	mock_discovery(&server, "test").await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/realms/broken/.well-known/openid-configuration");
			then.status(500);
		})
		.await;

	let fixture = Fixture::new();

	fixture.apply(&settings_for(&server, "test")).await.expect("Initial settings apply.");

	let mut broken = settings_for(&server, "broken");

	broken.features.api_bearer_auth = false;

	fixture.apply(&broken).await.expect_err("Broken discovery must abort the reload.");

	let summaries = fixture.registry.summaries();

	assert_eq!(summaries.len(), 1);
	assert_eq!(summaries[0].protocol, ProtocolType::Oidc);
	assert!(fixture.features.is_enabled());

	let empty = AuthSettings::default();

	assert_eq!(fixture.apply(&empty).await.expect("Empty settings apply."), 0);
	assert!(fixture.registry.summaries().is_empty());
	assert!(!fixture.features.is_enabled());
}
