//! Process-scoped provider registry with atomic snapshot reloads.

// crates.io
use arc_swap::ArcSwap;
// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	error::ConfigError,
	provider::{AuthenticationProvider, ProtocolType},
};

/// Shared handle to a configured provider.
pub type SharedProvider = Arc<dyn AuthenticationProvider>;

/// Read-only lookup contract consumed by the bearer mechanism.
///
/// Both methods answer from one consistent configuration; a miss is a normal negative result.
pub trait ProviderDirectory
where
	Self: Send + Sync,
{
	/// Returns every provider of `protocol`, in configuration order.
	fn providers_of_type(&self, protocol: ProtocolType) -> Vec<SharedProvider>;

	/// Returns the provider registered under `id`, if any.
	fn provider_by_id(&self, id: &str) -> Option<SharedProvider>;
}

/// Immutable, configuration-ordered set of providers with unique identifiers.
#[derive(Debug, Default)]
pub struct ProviderSet {
	providers: Vec<SharedProvider>,
	index: HashMap<ProviderId, usize>,
}
impl ProviderSet {
	/// Builds a set, rejecting duplicate identifiers.
	pub fn new(providers: impl IntoIterator<Item = SharedProvider>) -> Result<Self, ConfigError> {
		let mut set = Self::default();

		for provider in providers {
			let id = provider.id().clone();

			if set.index.contains_key(&id) {
				return Err(ConfigError::DuplicateProvider(id.to_string()));
			}

			set.index.insert(id, set.providers.len());
			set.providers.push(provider);
		}

		Ok(set)
	}

	/// Number of providers in the set.
	pub fn len(&self) -> usize {
		self.providers.len()
	}

	/// Returns true when no provider is configured.
	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}

	/// Iterates providers in configuration order.
	pub fn iter(&self) -> impl Iterator<Item = &SharedProvider> {
		self.providers.iter()
	}

	/// Returns every provider of `protocol`, in configuration order.
	pub fn of_type(&self, protocol: ProtocolType) -> Vec<SharedProvider> {
		self.providers.iter().filter(|provider| provider.protocol() == protocol).cloned().collect()
	}

	/// Returns the provider registered under `id`.
	pub fn get(&self, id: &str) -> Option<SharedProvider> {
		self.index.get(id).map(|&idx| self.providers[idx].clone())
	}
}

/// Diagnostic summary of one registered provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
	/// Provider identifier.
	pub id: ProviderId,
	/// Protocol type tag.
	pub protocol: ProtocolType,
}

/// Registry of configured providers.
///
/// Readers take an immutable [`ProviderSet`] snapshot with a single atomic load and never
/// observe a partially applied reload; [`reload`](ProviderRegistry::reload) swaps the whole
/// set at once.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
	current: ArcSwap<ProviderSet>,
}
impl ProviderRegistry {
	/// Creates a registry seeded with `providers`.
	pub fn new(providers: impl IntoIterator<Item = SharedProvider>) -> Result<Self, ConfigError> {
		let set = ProviderSet::new(providers)?;

		Ok(Self { current: ArcSwap::from_pointee(set) })
	}

	/// Returns the current snapshot.
	pub fn snapshot(&self) -> Arc<ProviderSet> {
		self.current.load_full()
	}

	/// Replaces the whole provider set. On error the previous set stays active.
	pub fn reload(&self, providers: impl IntoIterator<Item = SharedProvider>) -> Result<usize> {
		let set = ProviderSet::new(providers)?;
		let count = set.len();

		self.current.store(Arc::new(set));

		tracing::info!(providers = count, "Provider registry reloaded.");

		Ok(count)
	}

	/// Lists registered providers for diagnostics.
	pub fn summaries(&self) -> Vec<ProviderSummary> {
		self.snapshot()
			.iter()
			.map(|provider| ProviderSummary {
				id: provider.id().clone(),
				protocol: provider.protocol(),
			})
			.collect()
	}
}
impl ProviderDirectory for ProviderRegistry {
	fn providers_of_type(&self, protocol: ProtocolType) -> Vec<SharedProvider> {
		self.snapshot().of_type(protocol)
	}

	fn provider_by_id(&self, id: &str) -> Option<SharedProvider> {
		self.snapshot().get(id)
	}
}
