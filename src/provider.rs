//! Provider-facing metadata (data), strategies (behavior), and the registry that holds them.
//!
//! Every configured identity source implements [`AuthenticationProvider`]: a protocol type tag
//! plus a `verify(token)` capability. The [`ProviderRegistry`] stores a heterogeneous,
//! configuration-ordered set of them and hands out immutable snapshots, so callers filter by
//! [`ProtocolType`] instead of downcasting concrete types.

pub mod metadata;
pub mod registry;
pub mod strategy;

pub use metadata::*;
pub use registry::*;
pub use strategy::*;

// self
use crate::{
	_prelude::*,
	auth::{BearerAccessToken, ProviderId, UserRecordIdentifier},
	error::TransportError,
};

/// Boxed future returned by [`AuthenticationProvider::verify`].
pub type VerifyFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// Authentication protocol spoken by a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolType {
	/// OpenID Connect; bearer tokens are verified through the userinfo endpoint.
	Oidc,
	/// Plain OAuth 2.0 without an identity layer.
	OAuth2,
	/// Local username/password accounts.
	Builtin,
}
impl ProtocolType {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProtocolType::Oidc => "oidc",
			ProtocolType::OAuth2 => "oauth2",
			ProtocolType::Builtin => "builtin",
		}
	}
}
impl Display for ProtocolType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A configured identity source that can vouch for bearer tokens.
///
/// `verify` resolves to:
/// - `Ok(Some(identifier))` when the provider confirmed the token and derived the remote
///   identity from verified claims,
/// - `Ok(None)` when the provider explicitly rejected the token,
/// - `Err(_)` when no verdict could be obtained (network, timeout, malformed response).
///
/// Implementations must not cache verdicts across calls. Dropping the returned future cancels
/// the in-flight verification.
pub trait AuthenticationProvider
where
	Self: Debug + Send + Sync,
{
	/// Stable identifier, unique within a registry.
	fn id(&self) -> &ProviderId;

	/// Protocol type tag used for registry filtering.
	fn protocol(&self) -> ProtocolType;

	/// Verifies `token` and derives the remote account identifier.
	fn verify<'a>(
		&'a self,
		token: &'a BearerAccessToken,
	) -> VerifyFuture<'a, Option<UserRecordIdentifier>>;
}
