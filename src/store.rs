//! User resolution contract and the built-in in-memory implementation.

pub mod memory;

pub use memory::MemoryUserStore;

// self
use crate::{
	_prelude::*,
	auth::{AuthenticatedUser, UserRecordIdentifier},
};

/// Boxed future returned by [`UserResolver`] implementations.
pub type UserFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Maps verified remote identities to local accounts and records API activity.
///
/// Lookup is read-only: it never creates, links, or modifies an account. Implementations
/// provide their own consistency for concurrent updates.
pub trait UserResolver
where
	Self: Send + Sync,
{
	/// Finds the local account bound to `identifier`.
	///
	/// `Ok(None)` means no account is bound; `Err` means the store could not answer.
	fn lookup_user<'a>(
		&'a self,
		identifier: &'a UserRecordIdentifier,
	) -> UserFuture<'a, Option<AuthenticatedUser>>;

	/// Records "now" as the account's last API use and returns the refreshed account.
	fn update_last_api_use_time(&self, user: AuthenticatedUser) -> UserFuture<'_, AuthenticatedUser>;
}

/// Error type produced by [`UserResolver`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The account to update no longer exists.
	#[error("Account `{user}` does not exist.")]
	UnknownUser {
		/// Local account identifier.
		user: String,
	},
}

