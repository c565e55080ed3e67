use std::fmt;
use std::sync::Arc;

use lsp_types::CodeLens;

use crate::disposable::DisposableStore;
use crate::provider::{LensBatch, LensProvider, anchor_of};

/// Position a lens is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Anchor {
	/// 0-based document line, the primary ordering key.
	pub line: u32,
	/// Column within the line, used only to break ties.
	pub column: u32,
}

/// One lens in a [`LensModel`], tied to the provider that produced it.
///
/// Items are only ever borrowed from their model, so none outlives the
/// resources the model releases on dispose:
///
/// ```compile_fail
/// fn keep(model: &xeno_lens::LensModel) -> Vec<xeno_lens::LensItem> {
/// 	model.lenses().to_vec()
/// }
/// ```
pub struct LensItem {
	lens: CodeLens,
	provider: Arc<dyn LensProvider>,
	rank: usize,
}

impl fmt::Debug for LensItem {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LensItem")
			.field("provider", &self.provider.name())
			.field("rank", &self.rank)
			.field("lens", &self.lens)
			.finish()
	}
}

impl LensItem {
	pub fn lens(&self) -> &CodeLens {
		&self.lens
	}

	pub fn anchor(&self) -> Anchor {
		anchor_of(&self.lens)
	}

	/// Provider that produced this lens; later actions dispatch back to it.
	pub fn provider(&self) -> &Arc<dyn LensProvider> {
		&self.provider
	}

	/// Position of the provider in the registry order for the run.
	pub fn rank(&self) -> usize {
		self.rank
	}

	pub fn is_resolved(&self) -> bool {
		self.lens.command.is_some()
	}

	/// Replaces the command and data with a resolved lens, keeping the position.
	pub(crate) fn apply_resolved(&mut self, resolved: CodeLens) {
		self.lens.command = resolved.command;
		self.lens.data = resolved.data;
	}

	fn sort_key(&self) -> (u32, usize, u32) {
		let anchor = self.anchor();
		(anchor.line, self.rank, anchor.column)
	}
}

/// Merged, ordered lenses of one aggregation run.
///
/// The model exclusively owns the resources of every batch it accepted.
/// Disposing it releases them once and empties the lens list, so no lens can
/// outlive its resources. Dropping an undisposed model disposes it.
#[derive(Debug, Default)]
pub struct LensModel {
	items: Vec<LensItem>,
	resources: DisposableStore,
}

impl LensModel {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Accepts one provider batch, taking ownership of its resources.
	pub(crate) fn add(&mut self, batch: LensBatch, provider: &Arc<dyn LensProvider>, rank: usize) {
		let (lenses, mut resources) = batch.into_parts();
		self.resources.extend_from(&mut resources);
		self.items.extend(lenses.into_iter().map(|lens| LensItem {
			lens,
			provider: Arc::clone(provider),
			rank,
		}));
	}

	/// Orders lenses by line, then provider rank, then column.
	///
	/// The sort is stable, so lenses of one provider at the same position keep
	/// the order the provider returned them in.
	pub(crate) fn finalize(&mut self) {
		self.items.sort_by_key(LensItem::sort_key);
	}

	/// Lenses in display order; empty once disposed.
	pub fn lenses(&self) -> &[LensItem] {
		&self.items
	}

	pub(crate) fn lenses_mut(&mut self) -> &mut [LensItem] {
		&mut self.items
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Number of provider resources still owned.
	pub fn resource_count(&self) -> usize {
		self.resources.len()
	}

	pub fn is_disposed(&self) -> bool {
		self.resources.is_disposed()
	}

	/// Drops every lens and releases all owned resources. Idempotent.
	pub fn dispose(&mut self) {
		if self.resources.is_disposed() {
			return;
		}
		self.items.clear();
		self.resources.dispose();
		tracing::trace!("lens.model.disposed");
	}
}
