//! Concurrent lens aggregation.
//!
//! [`LensEngine::run`] fans one document out to every applicable provider,
//! absorbs provider faults, and merges the settled batches into a single
//! [`LensModel`] ordered by `(line, rank, column)`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lsp_types::CodeLens;
use tokio_util::sync::CancellationToken;
use xeno_worker::{TaskPanic, WorkerJoinSet};

use crate::config::EngineConfig;
use crate::error::{ProviderError, Result};
use crate::registry::ProviderRegistry;
use crate::sink::{ErrorSink, FaultKind, FaultPhase, ProviderFault, TracingSink};
use crate::{Document, LensBatch, LensModel, LensProvider};

/// Outcome of one provider call as seen by the fan-in loop.
type CallOutcome<T> = std::result::Result<T, FaultKind>;

/// Stateless orchestrator querying providers for lenses.
///
/// Independent runs may overlap; the engine imposes no ordering between them.
/// Callers superseding an older result dispose it themselves, or use
/// [`crate::LensSession`].
#[derive(Clone)]
pub struct LensEngine {
	registry: Arc<dyn ProviderRegistry>,
	sink: Arc<dyn ErrorSink>,
	config: EngineConfig,
}

impl LensEngine {
	/// Creates an engine reporting faults through [`TracingSink`].
	pub fn new(registry: Arc<dyn ProviderRegistry>) -> Self {
		Self {
			registry,
			sink: Arc::new(TracingSink),
			config: EngineConfig::default(),
		}
	}

	pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
		self.sink = sink;
		self
	}

	pub fn with_config(mut self, config: EngineConfig) -> Self {
		self.config = config;
		self
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Collects lenses for `document` from every applicable provider.
	///
	/// Only a registry failure fails the run. Provider errors, panics and
	/// timeouts are reported to the sink and contribute nothing. When `cancel`
	/// fires, batches that already settled are kept and the remaining calls are
	/// left running; whatever they return later is disposed by a reaper task.
	pub async fn run(&self, document: Arc<Document>, cancel: &CancellationToken) -> Result<LensModel> {
		let providers = self.registry.ordered(&document)?;
		tracing::debug!(uri = %document.uri(), version = document.version(), providers = providers.len(), "lens.engine.run");

		let mut model = LensModel::new();
		if providers.is_empty() {
			return Ok(model);
		}

		let timeout = self.config.provider_timeout();
		let mut calls: WorkerJoinSet<usize, CallOutcome<Option<LensBatch>>> = WorkerJoinSet::new(self.config.task_class());
		for (rank, provider) in providers.iter().enumerate() {
			let provider = Arc::clone(provider);
			let document = Arc::clone(&document);
			let cancel = cancel.clone();
			calls.spawn(rank, async move { bounded(provider.provide(&document, &cancel), timeout).await });
		}

		let mut cancelled = false;
		while !calls.is_empty() {
			let settled = tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					cancelled = true;
					break;
				}
				next = calls.join_next() => next,
			};
			let Some((rank, outcome)) = settled else {
				break;
			};
			self.accept(&mut model, &providers[rank], rank, outcome);
		}

		if cancelled {
			// Batches that settled before cancellation was observed still count.
			while let Some((rank, outcome)) = calls.try_join_next() {
				self.accept(&mut model, &providers[rank], rank, outcome);
			}
			if !calls.is_empty() {
				tracing::debug!(pending = calls.len(), "lens.engine.cancelled");
				let sink = Arc::clone(&self.sink);
				let providers = providers.clone();
				let _reaper = calls.reap_detached(move |rank, outcome| match flatten(outcome) {
					Ok(Some(mut batch)) => {
						tracing::trace!(provider = providers[rank].name(), rank, "lens.engine.late_batch_disposed");
						batch.dispose();
					}
					Ok(None) => {}
					Err(kind) => report(sink.as_ref(), providers[rank].as_ref(), rank, FaultPhase::Provide, kind),
				});
			}
		}

		model.finalize();
		tracing::debug!(uri = %document.uri(), lenses = model.len(), resources = model.resource_count(), cancelled, "lens.engine.done");
		Ok(model)
	}

	/// Resolves up to `limit` lenses that have no command yet.
	///
	/// Each lens is dispatched back to the provider that produced it. Failed or
	/// still-empty resolutions leave the lens as it was. Returns the number of
	/// lenses that gained a command.
	pub async fn resolve(&self, model: &mut LensModel, limit: usize, cancel: &CancellationToken) -> usize {
		let pending = PendingResolve::collect(model, limit);
		self.resolve_each(pending, cancel, |index, lens| {
			if let Some(item) = model.lenses_mut().get_mut(index) {
				item.apply_resolved(lens);
			}
		})
		.await
	}

	/// Dispatches `pending` resolves and hands each lens that gained a command
	/// to `apply` as soon as it settles.
	///
	/// When `cancel` fires, resolves that already settled are still applied;
	/// the rest keep running detached and their results are dropped.
	pub(crate) async fn resolve_each(&self, pending: Vec<PendingResolve>, cancel: &CancellationToken, mut apply: impl FnMut(usize, CodeLens)) -> usize {
		let timeout = self.config.provider_timeout();
		let mut calls: WorkerJoinSet<usize, CallOutcome<CodeLens>> = WorkerJoinSet::new(self.config.task_class());
		for (key, job) in pending.iter().enumerate() {
			let provider = Arc::clone(&job.provider);
			let lens = job.lens.clone();
			let cancel = cancel.clone();
			calls.spawn(key, async move { bounded(provider.resolve(lens, &cancel), timeout).await });
		}

		let mut resolved = 0;
		let mut settle = |key: usize, outcome: std::result::Result<CallOutcome<CodeLens>, TaskPanic>| {
			let job = &pending[key];
			match flatten(outcome) {
				Ok(lens) if lens.command.is_some() => {
					apply(job.index, lens);
					resolved += 1;
				}
				Ok(_) => tracing::trace!(provider = job.provider.name(), index = job.index, "lens.engine.resolve_empty"),
				Err(kind) => report(self.sink.as_ref(), job.provider.as_ref(), job.rank, FaultPhase::Resolve, kind),
			}
		};

		let mut cancelled = false;
		while !calls.is_empty() {
			let settled = tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					cancelled = true;
					break;
				}
				next = calls.join_next() => next,
			};
			let Some((key, outcome)) = settled else {
				break;
			};
			settle(key, outcome);
		}

		if cancelled {
			while let Some((key, outcome)) = calls.try_join_next() {
				settle(key, outcome);
			}
		}
		if !calls.is_empty() {
			tracing::debug!(outstanding = calls.len(), "lens.engine.resolve_cancelled");
			let _reaper = calls.reap_detached(|_, _| {});
		}
		resolved
	}

	fn accept(&self, model: &mut LensModel, provider: &Arc<dyn LensProvider>, rank: usize, outcome: std::result::Result<CallOutcome<Option<LensBatch>>, TaskPanic>) {
		match flatten(outcome) {
			Ok(Some(batch)) => {
				tracing::trace!(provider = provider.name(), rank, lenses = batch.lenses().len(), "lens.engine.batch");
				model.add(batch, provider, rank);
			}
			Ok(None) => {}
			Err(kind) => report(self.sink.as_ref(), provider.as_ref(), rank, FaultPhase::Provide, kind),
		}
	}
}

/// One unresolved lens queued for `LensEngine::resolve_each`.
pub(crate) struct PendingResolve {
	/// Position of the lens in the model it was collected from.
	index: usize,
	lens: CodeLens,
	provider: Arc<dyn LensProvider>,
	rank: usize,
}

impl PendingResolve {
	/// Snapshots up to `limit` lenses of `model` that have no command yet.
	pub(crate) fn collect(model: &LensModel, limit: usize) -> Vec<Self> {
		model
			.lenses()
			.iter()
			.enumerate()
			.filter(|(_, item)| !item.is_resolved())
			.take(limit)
			.map(|(index, item)| Self {
				index,
				lens: item.lens().clone(),
				provider: Arc::clone(item.provider()),
				rank: item.rank(),
			})
			.collect()
	}
}

/// Applies the optional per-provider timeout to one provider future.
async fn bounded<T>(call: impl Future<Output = std::result::Result<T, ProviderError>>, timeout: Option<Duration>) -> CallOutcome<T> {
	let result = match timeout {
		Some(after) => tokio::time::timeout(after, call).await.map_err(|_| FaultKind::TimedOut(after))?,
		None => call.await,
	};
	result.map_err(FaultKind::Error)
}

fn flatten<T>(outcome: std::result::Result<CallOutcome<T>, TaskPanic>) -> CallOutcome<T> {
	outcome.unwrap_or_else(|panic| Err(FaultKind::Panicked(panic.message)))
}

/// Forwards a fault to the sink; providers stopping on cancellation are not faults.
fn report(sink: &dyn ErrorSink, provider: &dyn LensProvider, rank: usize, phase: FaultPhase, kind: FaultKind) {
	if matches!(kind, FaultKind::Error(ProviderError::Cancelled)) {
		tracing::trace!(provider = provider.name(), rank, phase = phase.as_str(), "lens.provider.cancelled");
		return;
	}
	sink.report(&ProviderFault {
		provider: provider.name().to_string(),
		rank,
		phase,
		kind,
	});
}
