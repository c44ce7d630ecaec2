//! Userinfo claims returned by an OpenID provider.

// crates.io
use serde::Deserializer;
// self
use crate::{
	_prelude::*,
	auth::{ProviderId, Subject, UserRecordIdentifier},
};

/// Claims document returned by the userinfo endpoint for a valid access token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
	/// Subject identifier; the only claim that is guaranteed to be present.
	#[serde(rename = "sub")]
	pub subject: Subject,
	/// Shorthand name the user wishes to be referred to by.
	#[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
	pub preferred_username: Option<String>,
	/// Full display name.
	#[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Given (first) name.
	#[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
	pub given_name: Option<String>,
	/// Family (last) name.
	#[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
	pub family_name: Option<String>,
	/// Email address.
	#[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Whether the provider verified the email address.
	///
	/// Some providers release this as the string `"true"` or `"false"`; both forms are accepted.
	#[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
	pub email_verified: Option<bool>,
	/// Any other claims, passed through untouched.
	#[serde(flatten)]
	pub extra: BTreeMap<String, serde_json::Value>,
}
impl UserInfo {
	/// Derives the identifier of this remote account as seen by `provider`.
	pub fn identifier(&self, provider: &ProviderId) -> UserRecordIdentifier {
		UserRecordIdentifier::new(provider.clone(), self.subject.clone())
	}

	/// Maps the claims onto a profile record, falling back to the subject for the username.
	pub fn to_user_record(&self) -> RemoteUserRecord {
		RemoteUserRecord {
			username: self
				.preferred_username
				.clone()
				.unwrap_or_else(|| self.subject.to_string()),
			first_name: self.given_name.clone(),
			last_name: self.family_name.clone(),
			email: self.email.clone(),
		}
	}
}

// Profile claims never decide a verdict, so a mistyped value is dropped instead of failing the
// whole document.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
		Some(serde_json::Value::String(value)) => Some(value),
		_ => None,
	})
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
		Some(serde_json::Value::Bool(value)) => Some(value),
		Some(serde_json::Value::String(value)) if value.eq_ignore_ascii_case("true") => Some(true),
		Some(serde_json::Value::String(value)) if value.eq_ignore_ascii_case("false") =>
			Some(false),
		_ => None,
	})
}

/// Profile data extracted from userinfo claims.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUserRecord {
	/// Preferred username, or the subject when none was released.
	pub username: String,
	/// Given name.
	pub first_name: Option<String>,
	/// Family name.
	pub last_name: Option<String>,
	/// Email address.
	pub email: Option<String>,
}
