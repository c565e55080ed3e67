use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use xeno_worker::TaskClass;

use crate::engine::PendingResolve;
use crate::{Document, LensEngine, LensItem, LensModel};

/// How one [`LensSession::refresh`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The new model replaced the previous one.
	Installed { lenses: usize },
	/// A newer refresh started first; the result was disposed.
	Superseded,
	/// The refresh was cancelled; the result was disposed.
	Cancelled,
	/// The registry failed; the previous model is kept.
	Failed,
}

/// State shared between a session and its refresh tasks.
///
/// `generation` is bumped outside the model lock, so reading it never waits on
/// a caller inside [`LensSession::with_lenses`]. A refresh installs or edits
/// `current` only while holding its lock and seeing its own generation.
#[derive(Default)]
struct Shared {
	generation: AtomicU64,
	current: Mutex<Option<LensModel>>,
}

impl Shared {
	fn is_current(&self, generation: u64) -> bool {
		self.generation.load(Ordering::Acquire) == generation
	}

	fn advance(&self) -> u64 {
		self.generation.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Keeps the current lens model of one document view.
///
/// Each refresh cancels the one in flight and bumps a generation; a finished
/// run only installs its model while its generation is still current. The
/// superseded model, or a stale result, is disposed right away. Lenses still
/// lacking a command are resolved after install, in place, by a follow-up
/// task that stops when the generation moves on.
pub struct LensSession {
	engine: LensEngine,
	shared: Arc<Shared>,
	in_flight: Option<CancellationToken>,
}

impl LensSession {
	pub fn new(engine: LensEngine) -> Self {
		Self {
			engine,
			shared: Arc::new(Shared::default()),
			in_flight: None,
		}
	}

	/// Generation of the most recent refresh.
	pub fn generation(&self) -> u64 {
		self.shared.generation.load(Ordering::Acquire)
	}

	/// Cancels any in-flight refresh, including resolution of the installed model.
	pub fn cancel(&mut self) {
		if let Some(cancel) = self.in_flight.take() {
			cancel.cancel();
		}
	}

	/// Starts collecting lenses for `document`, superseding any refresh in flight.
	///
	/// The returned handle settles once the model is installed or discarded;
	/// it never waits on `resolve`.
	pub fn refresh(&mut self, document: Arc<Document>) -> JoinHandle<RefreshOutcome> {
		self.cancel();
		let generation = self.shared.advance();

		let cancel = CancellationToken::new();
		self.in_flight = Some(cancel.clone());

		let engine = self.engine.clone();
		let shared = Arc::clone(&self.shared);
		xeno_worker::spawn(TaskClass::Background, async move {
			let model = match engine.run(document, &cancel).await {
				Ok(model) => model,
				Err(err) => {
					tracing::warn!(generation, error = %err, "lens.session.refresh_failed");
					return RefreshOutcome::Failed;
				}
			};

			let settled = {
				let mut current = shared.current.lock();
				let fresh = shared.is_current(generation);
				if fresh && !cancel.is_cancelled() {
					let lenses = model.len();
					let unresolved = model.lenses().iter().any(|item| !item.is_resolved());
					Ok((current.replace(model), lenses, unresolved))
				} else {
					Err((model, fresh))
				}
			};

			match settled {
				Ok((previous, lenses, unresolved)) => {
					if let Some(mut previous) = previous {
						previous.dispose();
					}
					tracing::debug!(generation, lenses, "lens.session.installed");
					if unresolved && engine.config().resolve_limit > 0 {
						let _resolving = xeno_worker::spawn(TaskClass::Background, resolve_installed(engine, shared, generation, cancel));
					}
					RefreshOutcome::Installed { lenses }
				}
				Err((mut model, fresh)) => {
					let outcome = if fresh { RefreshOutcome::Cancelled } else { RefreshOutcome::Superseded };
					tracing::debug!(generation, ?outcome, "lens.session.discarded");
					model.dispose();
					outcome
				}
			}
		})
	}

	/// Runs `f` over the lenses of the installed model.
	///
	/// The model stays locked while `f` runs, so `f` must not call
	/// `with_lenses` again. [`Self::generation`] is safe to call from `f`.
	pub fn with_lenses<R>(&self, f: impl FnOnce(&[LensItem]) -> R) -> R {
		let current = self.shared.current.lock();
		f(current.as_ref().map(LensModel::lenses).unwrap_or_default())
	}

	/// Cancels any refresh and disposes the installed model.
	pub fn clear(&mut self) {
		self.cancel();
		self.shared.advance();
		let previous = self.shared.current.lock().take();
		if let Some(mut previous) = previous {
			previous.dispose();
		}
	}
}

impl Drop for LensSession {
	fn drop(&mut self) {
		self.cancel();
	}
}

/// Resolves the installed model of `generation` in place.
///
/// Providers are awaited without the model lock held; each resolved lens is
/// written back only while `generation` is still current.
async fn resolve_installed(engine: LensEngine, shared: Arc<Shared>, generation: u64, cancel: CancellationToken) {
	let pending = {
		let current = shared.current.lock();
		match current.as_ref() {
			Some(model) if shared.is_current(generation) => PendingResolve::collect(model, engine.config().resolve_limit),
			_ => return,
		}
	};

	let resolved = engine
		.resolve_each(pending, &cancel, |index, lens| {
			let mut current = shared.current.lock();
			if !shared.is_current(generation) {
				return;
			}
			if let Some(item) = current.as_mut().and_then(|model| model.lenses_mut().get_mut(index)) {
				item.apply_resolved(lens);
			}
		})
		.await;
	tracing::debug!(generation, resolved, "lens.session.resolved");
}
