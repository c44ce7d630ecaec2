//! OpenID Connect building blocks: discovery, userinfo claims, and the provider client.

pub mod claims;
pub mod client;
pub mod discovery;

pub use claims::*;
pub use client::*;
pub use discovery::{DiscoveryDocument, discovery_url};
