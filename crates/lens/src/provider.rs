use async_trait::async_trait;
use lsp_types::CodeLens;
use tokio_util::sync::CancellationToken;

use crate::disposable::{Disposable, DisposableStore};
use crate::error::ProviderError;
use crate::{Anchor, Document};

/// An independently registered source of code lenses.
///
/// Implementations must be safe to call concurrently with other providers and
/// should watch `cancel` and return promptly once it fires. The engine never
/// preempts a provider call.
#[async_trait]
pub trait LensProvider: Send + Sync + 'static {
	/// Short name used in logs and fault reports.
	fn name(&self) -> &str;

	/// Computes lenses for `document`.
	///
	/// `Ok(None)` means the provider has nothing to say about this document.
	async fn provide(&self, document: &Document, cancel: &CancellationToken) -> Result<Option<LensBatch>, ProviderError>;

	/// Fills in the command of a lens this provider produced earlier.
	async fn resolve(&self, lens: CodeLens, _cancel: &CancellationToken) -> Result<CodeLens, ProviderError> {
		Ok(lens)
	}
}

/// The result of one `provide` call: lenses plus the resources they depend on.
#[derive(Debug, Default)]
pub struct LensBatch {
	lenses: Vec<CodeLens>,
	resources: DisposableStore,
}

impl LensBatch {
	pub fn new(lenses: Vec<CodeLens>) -> Self {
		Self {
			lenses,
			resources: DisposableStore::new(),
		}
	}

	/// Attaches a resource that must stay alive while the lenses are in use.
	pub fn with_resource(mut self, resource: impl Disposable) -> Self {
		self.resources.add(resource);
		self
	}

	pub fn lenses(&self) -> &[CodeLens] {
		&self.lenses
	}

	pub fn resource_count(&self) -> usize {
		self.resources.len()
	}

	/// Releases the batch's resources without handing them to a model.
	pub fn dispose(&mut self) {
		self.lenses.clear();
		self.resources.dispose();
	}

	pub(crate) fn into_parts(self) -> (Vec<CodeLens>, DisposableStore) {
		(self.lenses, self.resources)
	}
}

/// Start of a lens range, the position its ordering keys on.
pub(crate) fn anchor_of(lens: &CodeLens) -> Anchor {
	Anchor {
		line: lens.range.start.line,
		column: lens.range.start.character,
	}
}
