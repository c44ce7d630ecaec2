//! Per-request OIDC bearer-token verification: resolve configured identity providers, verify the
//! caller's access token against their userinfo endpoints, and bind the verified identity to a
//! local account without ever provisioning one implicitly.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod bearer;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod oidc;
pub mod provider;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::ProviderId,
		http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
		oidc::OidcProvider,
		provider::{DefaultProviderStrategy, ProviderMetadata},
	};

	/// OIDC provider type alias used by reqwest-backed integration tests.
	pub type ReqwestTestProvider = OidcProvider<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs an [`OidcProvider`] from pre-resolved metadata, skipping discovery, backed by
	/// the reqwest transport used across integration tests.
	pub fn build_reqwest_test_provider(id: &str, metadata: ProviderMetadata) -> ReqwestTestProvider {
		let id = ProviderId::new(id).expect("Test provider identifier should be valid.");

		OidcProvider::with_metadata(
			id,
			"test-client",
			metadata,
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		)
		.with_strategy(Arc::new(DefaultProviderStrategy))
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
