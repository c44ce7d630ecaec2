// std
use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use time::OffsetDateTime;
// self
use oidc_bearer_auth::{
	auth::{AuthenticatedUser, BearerAccessToken, ProviderId, Subject, UserId, UserRecordIdentifier},
	bearer::{AuthFailure, BearerTokenAuth, UnauthenticatedReason},
	config::FeatureSwitch,
	error::TransportError,
	provider::{
		AuthenticationProvider, ProtocolType, ProviderDirectory, ProviderRegistry, SharedProvider,
		VerifyFuture,
	},
	store::{StoreError, UserFuture, UserResolver},
};

#[derive(Clone, Copy, Debug)]
enum Verdict {
	Accept(&'static str),
	Reject,
	Unreachable,
}

#[derive(Debug)]
struct FakeProvider {
	id: ProviderId,
	protocol: ProtocolType,
	verdict: Verdict,
	calls: AtomicUsize,
}
impl FakeProvider {
	fn oidc(id: &str, verdict: Verdict) -> Arc<Self> {
		Arc::new(Self {
			id: ProviderId::new(id).expect("Provider fixture should be valid."),
			protocol: ProtocolType::Oidc,
			verdict,
			calls: AtomicUsize::new(0),
		})
	}

	fn builtin(id: &str) -> Arc<Self> {
		Arc::new(Self {
			id: ProviderId::new(id).expect("Provider fixture should be valid."),
			protocol: ProtocolType::Builtin,
			verdict: Verdict::Accept("builtin-user"),
			calls: AtomicUsize::new(0),
		})
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl AuthenticationProvider for FakeProvider {
	fn id(&self) -> &ProviderId {
		&self.id
	}

	fn protocol(&self) -> ProtocolType {
		self.protocol
	}

	fn verify<'a>(
		&'a self,
		_token: &'a BearerAccessToken,
	) -> VerifyFuture<'a, Option<UserRecordIdentifier>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			match self.verdict {
				Verdict::Accept(subject) => Ok(Some(UserRecordIdentifier::new(
					self.id.clone(),
					Subject::new(subject).expect("Subject fixture should be valid."),
				))),
				Verdict::Reject => Ok(None),
				Verdict::Unreachable => Err(TransportError::Timeout { endpoint: "userinfo" }),
			}
		})
	}
}

#[derive(Debug, Default)]
struct CountingDirectory {
	inner: ProviderRegistry,
	lookups: AtomicUsize,
}
impl CountingDirectory {
	fn with(providers: Vec<Arc<FakeProvider>>) -> Arc<Self> {
		let providers = providers.into_iter().map(|provider| provider as SharedProvider);

		Arc::new(Self {
			inner: ProviderRegistry::new(providers).expect("Provider fixtures should be unique."),
			lookups: AtomicUsize::new(0),
		})
	}
}
impl ProviderDirectory for CountingDirectory {
	fn providers_of_type(&self, protocol: ProtocolType) -> Vec<SharedProvider> {
		self.lookups.fetch_add(1, Ordering::SeqCst);

		self.inner.providers_of_type(protocol)
	}

	fn provider_by_id(&self, id: &str) -> Option<SharedProvider> {
		self.lookups.fetch_add(1, Ordering::SeqCst);

		self.inner.provider_by_id(id)
	}
}

#[derive(Debug, Default)]
struct FakeUsers {
	bindings: Mutex<HashMap<UserRecordIdentifier, AuthenticatedUser>>,
	lookups: AtomicUsize,
	updates: AtomicUsize,
	fail_lookup: AtomicBool,
	fail_update: AtomicBool,
}
impl FakeUsers {
	fn bind(&self, provider: &str, subject: &str, user: &str) {
		let identifier = UserRecordIdentifier::new(
			ProviderId::new(provider).expect("Provider fixture should be valid."),
			Subject::new(subject).expect("Subject fixture should be valid."),
		);
		let account = AuthenticatedUser::new(UserId::new(user).expect("User fixture should be valid."));

		self.bindings.lock().insert(identifier, account);
	}

	fn lookups(&self) -> usize {
		self.lookups.load(Ordering::SeqCst)
	}

	fn updates(&self) -> usize {
		self.updates.load(Ordering::SeqCst)
	}
}
impl UserResolver for FakeUsers {
	fn lookup_user<'a>(
		&'a self,
		identifier: &'a UserRecordIdentifier,
	) -> UserFuture<'a, Option<AuthenticatedUser>> {
		self.lookups.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if self.fail_lookup.load(Ordering::SeqCst) {
				return Err(StoreError::Backend { message: "database unreachable".into() });
			}

			Ok(self.bindings.lock().get(identifier).cloned())
		})
	}

	fn update_last_api_use_time(&self, mut user: AuthenticatedUser) -> UserFuture<'_, AuthenticatedUser> {
		self.updates.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if self.fail_update.load(Ordering::SeqCst) {
				return Err(StoreError::Backend { message: "write timeout".into() });
			}

			user.touch_api_use(OffsetDateTime::now_utc());

			Ok(user)
		})
	}
}

fn mechanism(
	directory: Arc<CountingDirectory>,
	users: Arc<FakeUsers>,
	enabled: bool,
) -> BearerTokenAuth {
	BearerTokenAuth::new(directory, users, Arc::new(FeatureSwitch::new(enabled)))
}

fn token() -> BearerAccessToken {
	BearerAccessToken::new("eyJhbGciOiJSUzI1NiJ9.payload.signature")
}

#[tokio::test]
async fn disabled_feature_short_circuits_without_any_call() {
	let provider = FakeProvider::oidc("oidc", Verdict::Accept("sub-1"));
	let directory = CountingDirectory::with(vec![provider.clone()]);
	let users = Arc::new(FakeUsers::default());
	let auth = mechanism(directory.clone(), users.clone(), false);
	let failure = auth.authenticate(&token()).await.expect_err("Disabled mechanism must not authenticate.");

	assert!(matches!(failure, AuthFailure::NotApplicable));
	assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);
	assert_eq!(provider.calls(), 0);
	assert_eq!(users.lookups(), 0);
	assert_eq!(auth.metrics().skipped(), 1);
}

#[tokio::test]
async fn missing_oidc_providers_yield_no_provider() {
	let builtin = FakeProvider::builtin("builtin");
	let users = Arc::new(FakeUsers::default());
	let auth = mechanism(CountingDirectory::with(vec![builtin.clone()]), users.clone(), true);
	let failure = auth.authenticate(&token()).await.expect_err("No OIDC provider is configured.");

	assert!(matches!(failure, AuthFailure::NoProvider));
	assert_eq!(builtin.calls(), 0);
	assert_eq!(users.lookups(), 0);

	let empty = mechanism(CountingDirectory::with(Vec::new()), users, true);

	assert!(matches!(empty.authenticate(&token()).await, Err(AuthFailure::NoProvider)));
}

#[tokio::test]
async fn rejection_everywhere_is_unauthenticated_without_lookup() {
	let first = FakeProvider::oidc("first", Verdict::Reject);
	let second = FakeProvider::oidc("second", Verdict::Reject);
	let users = Arc::new(FakeUsers::default());
	let auth = mechanism(
		CountingDirectory::with(vec![first.clone(), second.clone()]),
		users.clone(),
		true,
	);
	let failure = auth.authenticate(&token()).await.expect_err("Rejected token must fail.");

	assert!(matches!(
		failure,
		AuthFailure::Unauthenticated { reason: UnauthenticatedReason::TokenRejected }
	));
	assert_eq!((first.calls(), second.calls()), (1, 1));
	assert_eq!(users.lookups(), 0);
	assert_eq!(auth.metrics().rejected(), 1);
}

#[tokio::test]
async fn first_accepting_provider_wins_and_records_api_use_once() {
	let accepting = FakeProvider::oidc("oidc", Verdict::Accept("sub-1"));
	let later = FakeProvider::oidc("later", Verdict::Accept("sub-9"));
	let users = Arc::new(FakeUsers::default());

	users.bind("oidc", "sub-1", "alice");

	let auth = mechanism(
		CountingDirectory::with(vec![accepting.clone(), later.clone()]),
		users.clone(),
		true,
	);
	let user = auth.authenticate(&token()).await.expect("Bound identity should authenticate.");

	assert_eq!(&*user.id, "alice");
	assert!(user.last_api_use.is_some());
	assert_eq!(later.calls(), 0);
	assert_eq!(users.updates(), 1);
	assert_eq!(auth.metrics().authenticated(), 1);
}

#[tokio::test]
async fn provider_outage_falls_through_to_the_next_candidate() {
	let down = FakeProvider::oidc("down", Verdict::Unreachable);
	let up = FakeProvider::oidc("up", Verdict::Accept("sub-2"));
	let users = Arc::new(FakeUsers::default());

	users.bind("up", "sub-2", "bob");

	let auth = mechanism(CountingDirectory::with(vec![down.clone(), up.clone()]), users.clone(), true);
	let user = auth.authenticate(&token()).await.expect("Second provider should authenticate.");

	assert_eq!(&*user.id, "bob");
	assert_eq!((down.calls(), up.calls()), (1, 1));
}

#[tokio::test]
async fn outages_everywhere_are_unavailable_in_attempt_order() {
	let users = Arc::new(FakeUsers::default());
	let auth = mechanism(
		CountingDirectory::with(vec![
			FakeProvider::oidc("first", Verdict::Unreachable),
			FakeProvider::oidc("second", Verdict::Unreachable),
		]),
		users.clone(),
		true,
	);
	let failure = auth.authenticate(&token()).await.expect_err("No verdict means no authentication.");
	let AuthFailure::VerificationUnavailable { failures } = &failure else {
		panic!("Expected VerificationUnavailable, got {failure:?}.");
	};
	let order = failures.iter().map(|failure| failure.provider.to_string()).collect::<Vec<_>>();

	assert_eq!(order, ["first", "second"]);
	assert!(failure.is_transient());
	assert_eq!(users.lookups(), 0);
	assert_eq!(auth.metrics().unavailable(), 1);
}

#[tokio::test]
async fn mixed_rejection_and_outage_is_unavailable() {
	let auth = mechanism(
		CountingDirectory::with(vec![
			FakeProvider::oidc("rejecting", Verdict::Reject),
			FakeProvider::oidc("down", Verdict::Unreachable),
		]),
		Arc::new(FakeUsers::default()),
		true,
	);
	let failure = auth.authenticate(&token()).await.expect_err("Mixed outcome must not authenticate.");

	assert!(
		matches!(&failure, AuthFailure::VerificationUnavailable { failures } if failures.len() == 1)
	);
}

#[tokio::test]
async fn verified_but_unbound_identity_is_not_provisioned() {
	let users = Arc::new(FakeUsers::default());
	let auth = mechanism(
		CountingDirectory::with(vec![FakeProvider::oidc("oidc", Verdict::Accept("stranger"))]),
		users.clone(),
		true,
	);
	let failure = auth.authenticate(&token()).await.expect_err("Unbound identity must fail.");

	match failure {
		AuthFailure::Unauthenticated { reason: UnauthenticatedReason::NotProvisioned { identifier } } => {
			assert_eq!(identifier.to_string(), "oidc:stranger");
		},
		other => panic!("Expected NotProvisioned, got {other:?}."),
	}

	assert_eq!(users.updates(), 0);
	assert!(users.bindings.lock().is_empty());
}

#[tokio::test]
async fn lookup_failure_fails_closed() {
	let users = Arc::new(FakeUsers::default());

	users.bind("oidc", "sub-1", "alice");
	users.fail_lookup.store(true, Ordering::SeqCst);

	let auth = mechanism(
		CountingDirectory::with(vec![FakeProvider::oidc("oidc", Verdict::Accept("sub-1"))]),
		users.clone(),
		true,
	);

	assert!(matches!(
		auth.authenticate(&token()).await,
		Err(AuthFailure::UserStoreUnavailable { .. })
	));
	assert_eq!(users.updates(), 0);
}

#[tokio::test]
async fn telemetry_failure_does_not_overturn_success() {
	let users = Arc::new(FakeUsers::default());

	users.bind("oidc", "sub-1", "alice");
	users.fail_update.store(true, Ordering::SeqCst);

	let auth = mechanism(
		CountingDirectory::with(vec![FakeProvider::oidc("oidc", Verdict::Accept("sub-1"))]),
		users.clone(),
		true,
	);
	let user = auth.authenticate(&token()).await.expect("Telemetry failure must be swallowed.");

	assert_eq!(&*user.id, "alice");
	assert_eq!(user.last_api_use, None);
	assert_eq!(users.updates(), 1);
}

#[tokio::test]
async fn repeated_requests_reach_the_same_verdict_without_caching() {
	let provider = FakeProvider::oidc("oidc", Verdict::Accept("sub-1"));
	let users = Arc::new(FakeUsers::default());

	users.bind("oidc", "sub-1", "alice");

	let auth = mechanism(CountingDirectory::with(vec![provider.clone()]), users.clone(), true);
	let first = auth.authenticate(&token()).await.expect("First call should authenticate.");
	let second = auth.authenticate(&token()).await.expect("Second call should authenticate.");

	assert_eq!(first.id, second.id);
	assert_eq!(provider.calls(), 2);
	assert_eq!(users.updates(), 2);
	assert_eq!(auth.metrics().attempts(), 2);
}

#[tokio::test]
async fn feature_switch_is_read_per_request() {
	let provider = FakeProvider::oidc("oidc", Verdict::Reject);
	let switch = Arc::new(FeatureSwitch::new(false));
	let auth = BearerTokenAuth::new(
		CountingDirectory::with(vec![provider.clone()]),
		Arc::new(FakeUsers::default()),
		switch.clone(),
	);

	assert!(matches!(auth.authenticate(&token()).await, Err(AuthFailure::NotApplicable)));

	switch.set(true);

	assert!(matches!(auth.authenticate(&token()).await, Err(AuthFailure::Unauthenticated { .. })));
	assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn malformed_token_is_rejected_without_contacting_providers() {
	let provider = FakeProvider::oidc("oidc", Verdict::Accept("sub-1"));
	let users = Arc::new(FakeUsers::default());
	let auth = mechanism(CountingDirectory::with(vec![provider.clone()]), users.clone(), true);
	let failure = auth
		.authenticate(&BearerAccessToken::new("abc\ndef"))
		.await
		.expect_err("A token with control characters must not authenticate.");

	assert!(matches!(
		failure,
		AuthFailure::Unauthenticated { reason: UnauthenticatedReason::TokenRejected }
	));
	assert!(!failure.is_transient());
	assert_eq!(provider.calls(), 0);
	assert_eq!(users.lookups(), 0);
}
