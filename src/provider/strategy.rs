//! Provider strategy hooks that classify userinfo failures.
//!
//! A failing userinfo call either means the provider rejected the token (a normal negative
//! verdict) or that it could not give a verdict at all. Strategies make that call from
//! protocol signals without tying providers to any particular HTTP client.

// self
use crate::{_prelude::*, http::HttpRequest};

/// Strategy hook that allows providers to decorate requests and classify errors.
///
/// Implementors are required to be `Send + Sync`, and the hooks use crate-owned data types so
/// downstream crates never depend on reqwest-specific structures. Override only what you
/// need; `augment_userinfo_request` has a default no-op implementation.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a non-success userinfo response into a verdict category.
	fn classify_userinfo_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Gives providers a chance to add headers before the userinfo request is dispatched.
	fn augment_userinfo_request(&self, _request: &mut HttpRequest) {}
}

/// Canonical categories for a failed userinfo call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// The provider rejected the token (invalid, expired, revoked, wrong audience).
	TokenRejected,
	/// The provider could not give a verdict; try the next candidate.
	Unavailable,
}

/// Context passed to provider strategies when classifying userinfo errors.
///
/// Only primitive data (status code, RFC 6750 challenge fields, body preview) is kept so
/// strategies stay decoupled from any HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// `error` from the `WWW-Authenticate` challenge or the JSON error body.
	pub bearer_error: Option<String>,
	/// `error_description` from the challenge or the JSON error body.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an empty context.
	pub fn new() -> Self {
		Self {
			http_status: None,
			bearer_error: None,
			error_description: None,
			body_preview: None,
		}
	}

	/// Adds an HTTP status code (e.g., 401, 403, 500).
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the bearer error code returned by the provider.
	pub fn with_bearer_error(mut self, error: impl Into<String>) -> Self {
		self.bearer_error = Some(error.into());

		self
	}

	/// Adds the `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview for providers that return non-JSON payloads.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	/// Fills `error`/`error_description` from an RFC 6750 `WWW-Authenticate` challenge.
	///
	/// Fields already set are kept.
	pub fn with_challenge(mut self, header: &str) -> Self {
		let challenge = parse_bearer_challenge(header);

		if self.bearer_error.is_none() {
			self.bearer_error = challenge.error;
		}
		if self.error_description.is_none() {
			self.error_description = challenge.error_description;
		}

		self
	}
}
impl Default for ProviderErrorContext {
	fn default() -> Self {
		Self::new()
	}
}

/// Default strategy that applies RFC 6750 guided heuristics.
///
/// It prioritizes structured bearer error codes, then falls back to body text hints, and
/// finally the HTTP status code. Network failures never reach a strategy; they surface as
/// transport errors before any response exists.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_userinfo_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if let Some(kind) = ctx.bearer_error.as_deref().and_then(match_exact_value) {
			return kind;
		}
		if let Some(kind) = classify_body(ctx.body_preview.as_deref()) {
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

#[derive(Debug, Default, PartialEq, Eq)]
struct BearerChallenge {
	error: Option<String>,
	error_description: Option<String>,
}

fn parse_bearer_challenge(header: &str) -> BearerChallenge {
	let mut challenge = BearerChallenge::default();
	let Some((scheme, params)) = header.trim().split_once(' ') else {
		return challenge;
	};

	if !scheme.eq_ignore_ascii_case("bearer") {
		return challenge;
	}

	let mut rest = params.trim();

	while !rest.is_empty() {
		let Some((key, tail)) = rest.split_once('=') else {
			break;
		};
		let key = key.trim().trim_start_matches(',').trim();
		let tail = tail.trim_start();
		let (value, remaining) = if let Some(quoted) = tail.strip_prefix('"') {
			match quoted.find('"') {
				Some(end) => (&quoted[..end], &quoted[end + 1..]),
				None => (quoted, ""),
			}
		} else {
			match tail.find(',') {
				Some(end) => (tail[..end].trim(), &tail[end..]),
				None => (tail.trim(), ""),
			}
		};

		if key.eq_ignore_ascii_case("error") {
			challenge.error = Some(value.to_owned());
		} else if key.eq_ignore_ascii_case("error_description") {
			challenge.error_description = Some(value.to_owned());
		}

		rest = remaining.trim_start().trim_start_matches(',').trim_start();
	}

	challenge
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ProviderErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= ProviderErrorContext::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}

fn match_exact_value(value: &str) -> Option<ProviderErrorKind> {
	if value.eq_ignore_ascii_case("invalid_token")
		|| value.eq_ignore_ascii_case("insufficient_scope")
		|| value.eq_ignore_ascii_case("invalid_request")
		|| value.eq_ignore_ascii_case("access_denied")
	{
		Some(ProviderErrorKind::TokenRejected)
	} else if value.eq_ignore_ascii_case("temporarily_unavailable")
		|| value.eq_ignore_ascii_case("server_error")
	{
		Some(ProviderErrorKind::Unavailable)
	} else {
		None
	}
}

fn classify_body(body: Option<&str>) -> Option<ProviderErrorKind> {
	let body = body?;
	let lowered = body.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_token") || text.contains("token expired") =>
			Some(ProviderErrorKind::TokenRejected),
		text if text.contains("temporarily_unavailable") => Some(ProviderErrorKind::Unavailable),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 401 | 403) => ProviderErrorKind::TokenRejected,
		_ => ProviderErrorKind::Unavailable,
	}
}
