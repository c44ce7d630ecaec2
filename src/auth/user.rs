//! Remote identity binding and local account models.

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, Subject, UserId},
};

/// Provider-scoped identifier of a remote account: the `(provider, subject)` pair.
///
/// Only a provider that has verified a token builds one of these, from the claims its
/// identity provider returned for that token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserRecordIdentifier {
	/// Provider that verified the remote identity.
	pub provider: ProviderId,
	/// Subject claim issued by that provider.
	pub subject: Subject,
}
impl UserRecordIdentifier {
	/// Creates an identifier for the provided pair.
	pub fn new(provider: ProviderId, subject: Subject) -> Self {
		Self { provider, subject }
	}
}
impl Display for UserRecordIdentifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}:{}", self.provider, self.subject)
	}
}

/// Local account bound to zero or more [`UserRecordIdentifier`]s.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
	/// Local account identifier.
	pub id: UserId,
	/// Display name shown for the account.
	pub display_name: Option<String>,
	/// Contact email stored for the account.
	pub email: Option<String>,
	/// Last time the account authenticated through an API credential.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub last_api_use: Option<OffsetDateTime>,
}
impl AuthenticatedUser {
	/// Creates an account with no profile data and no recorded API use.
	pub fn new(id: UserId) -> Self {
		Self { id, display_name: None, email: None, last_api_use: None }
	}

	/// Sets the display name.
	pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());

		self
	}

	/// Sets the contact email.
	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());

		self
	}

	/// Records an API use at `instant`.
	pub fn touch_api_use(&mut self, instant: OffsetDateTime) {
		self.last_api_use = Some(instant);
	}
}
