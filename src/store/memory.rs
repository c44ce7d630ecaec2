//! Thread-safe in-memory [`UserResolver`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{AuthenticatedUser, UserId, UserRecordIdentifier},
	store::{StoreError, UserFuture, UserResolver},
};

#[derive(Debug, Default)]
struct Accounts {
	users: HashMap<UserId, AuthenticatedUser>,
	bindings: HashMap<UserRecordIdentifier, UserId>,
}

type AccountMap = Arc<RwLock<Accounts>>;

/// Keeps accounts and remote-identity bindings in-process.
///
/// Accounts and bindings are only ever created through [`insert_user`](Self::insert_user) and
/// [`bind`](Self::bind); lookups never provision anything.
#[derive(Clone, Debug, Default)]
pub struct MemoryUserStore(AccountMap);
impl MemoryUserStore {
	/// Adds or replaces an account.
	pub fn insert_user(&self, user: AuthenticatedUser) {
		self.0.write().users.insert(user.id.clone(), user);
	}

	/// Binds a remote identity to an existing account.
	pub fn bind(&self, identifier: UserRecordIdentifier, user: &UserId) -> Result<(), StoreError> {
		let mut guard = self.0.write();

		if !guard.users.contains_key(user) {
			return Err(StoreError::UnknownUser { user: user.to_string() });
		}

		guard.bindings.insert(identifier, user.clone());

		Ok(())
	}

	/// Returns a copy of the account stored under `id`.
	pub fn user(&self, id: &UserId) -> Option<AuthenticatedUser> {
		self.0.read().users.get(id).cloned()
	}

	/// Number of stored accounts.
	pub fn user_count(&self) -> usize {
		self.0.read().users.len()
	}

	fn lookup_now(map: &AccountMap, identifier: &UserRecordIdentifier) -> Option<AuthenticatedUser> {
		let guard = map.read();

		guard.bindings.get(identifier).and_then(|id| guard.users.get(id)).cloned()
	}

	fn touch_now(
		map: &AccountMap,
		user: AuthenticatedUser,
		instant: OffsetDateTime,
	) -> Result<AuthenticatedUser, StoreError> {
		let mut guard = map.write();
		let stored = guard
			.users
			.get_mut(&user.id)
			.ok_or_else(|| StoreError::UnknownUser { user: user.id.to_string() })?;

		stored.touch_api_use(instant);

		Ok(stored.clone())
	}
}
impl UserResolver for MemoryUserStore {
	fn lookup_user<'a>(
		&'a self,
		identifier: &'a UserRecordIdentifier,
	) -> UserFuture<'a, Option<AuthenticatedUser>> {
		Box::pin(async move { Ok(Self::lookup_now(&self.0, identifier)) })
	}

	fn update_last_api_use_time(&self, user: AuthenticatedUser) -> UserFuture<'_, AuthenticatedUser> {
		Box::pin(async move { Self::touch_now(&self.0, user, OffsetDateTime::now_utc()) })
	}
}
