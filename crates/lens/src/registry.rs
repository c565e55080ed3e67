//! Lens provider registry.
//!
//! Maps documents to the ordered list of providers that apply to them. The
//! position of a provider in that list is its rank for one aggregation run.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::disposable::Disposable;
use crate::error::RegistryError;
use crate::selector::DocumentSelector;
use crate::{Document, LensProvider};

/// Source of the providers applicable to a document.
pub trait ProviderRegistry: Send + Sync + 'static {
	/// Returns applicable providers, most preferred first.
	///
	/// Must be deterministic for an unchanged registry and document.
	fn ordered(&self, document: &Document) -> Result<Vec<Arc<dyn LensProvider>>, RegistryError>;
}

struct Entry {
	/// Registration sequence number; later registrations win score ties.
	seq: u64,
	selector: DocumentSelector,
	provider: Arc<dyn LensProvider>,
}

#[derive(Default)]
struct RegistryState {
	entries: Vec<Entry>,
	next_seq: u64,
}

/// Thread-safe registry ordering providers by selector score.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct LensRegistry {
	state: Arc<RwLock<RegistryState>>,
}

impl LensRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `provider` for documents matching `selector`.
	///
	/// Disposing the returned [`Registration`] removes the provider again.
	pub fn register(&self, selector: DocumentSelector, provider: Arc<dyn LensProvider>) -> Registration {
		let mut state = self.state.write();
		let seq = state.next_seq;
		state.next_seq += 1;
		tracing::debug!(provider = provider.name(), seq, "lens.registry.register");
		state.entries.push(Entry { seq, selector, provider });
		Registration {
			state: Arc::clone(&self.state),
			seq,
		}
	}

	/// Number of registered providers.
	pub fn len(&self) -> usize {
		self.state.read().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl ProviderRegistry for LensRegistry {
	fn ordered(&self, document: &Document) -> Result<Vec<Arc<dyn LensProvider>>, RegistryError> {
		let state = self.state.read();
		let mut scored: Vec<(u32, u64, &Arc<dyn LensProvider>)> = state
			.entries
			.iter()
			.filter_map(|entry| match entry.selector.score(document) {
				0 => None,
				score => Some((score, entry.seq, &entry.provider)),
			})
			.collect();
		scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
		Ok(scored.into_iter().map(|(_, _, provider)| Arc::clone(provider)).collect())
	}
}

/// Handle removing a provider from its [`LensRegistry`] when disposed.
#[must_use = "dropping a Registration keeps the provider registered; dispose it to unregister"]
pub struct Registration {
	state: Arc<RwLock<RegistryState>>,
	seq: u64,
}

impl Disposable for Registration {
	fn dispose(self: Box<Self>) {
		let mut state = self.state.write();
		state.entries.retain(|entry| entry.seq != self.seq);
		tracing::debug!(seq = self.seq, "lens.registry.unregister");
	}
}
