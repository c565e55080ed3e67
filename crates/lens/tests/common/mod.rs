//! Shared providers, registries and sinks for lens engine tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;
use xeno_lens::disposable::from_fn;
use xeno_lens::lsp_types::{CodeLens, Command, Position, Range};
use xeno_lens::{
	Document, ErrorSink, FaultKind, FaultPhase, LensBatch, LensEngine, LensModel, LensProvider, ProviderError, ProviderFault, ProviderRegistry,
	RegistryError,
};

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn document() -> Arc<Document> {
	Arc::new(Document::new(
		Url::parse("file:///repo/src/lib.rs").unwrap(),
		"rust",
		1,
		"fn one() {}\nfn two() {}\nfn three() {}\nfn four() {}\n",
	))
}

/// Counts resources handed out and released by test providers.
#[derive(Debug, Default)]
pub struct Ledger {
	pub acquired: AtomicUsize,
	pub released: AtomicUsize,
}

impl Ledger {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn acquired(&self) -> usize {
		self.acquired.load(Ordering::SeqCst)
	}

	pub fn released(&self) -> usize {
		self.released.load(Ordering::SeqCst)
	}

	/// Waits until at least `count` resources have been released.
	pub async fn released_at_least(&self, count: usize) {
		tokio::time::timeout(Duration::from_secs(5), async {
			while self.released() < count {
				tokio::time::sleep(Duration::from_millis(1)).await;
			}
		})
		.await
		.expect("resources were not released in time");
	}
}

pub fn lens(line: u32, column: u32, title: &str) -> CodeLens {
	let pos = Position::new(line, column);
	CodeLens {
		range: Range::new(pos, pos),
		command: Some(Command::new(title.to_string(), "test.noop".to_string(), None)),
		data: None,
	}
}

/// A lens awaiting resolution; its title rides in `data`.
pub fn unresolved(line: u32, column: u32, title: &str) -> CodeLens {
	let pos = Position::new(line, column);
	CodeLens {
		range: Range::new(pos, pos),
		command: None,
		data: Some(serde_json::Value::from(title)),
	}
}

/// Titles of the model's lenses, in order.
pub fn titles(model: &LensModel) -> Vec<String> {
	model
		.lenses()
		.iter()
		.map(|item| match &item.lens().command {
			Some(command) => command.title.clone(),
			None => "<unresolved>".to_string(),
		})
		.collect()
}

/// Returns fixed lenses after an optional delay, with one tracked resource per batch.
pub struct StaticProvider {
	pub name: String,
	pub lenses: Vec<CodeLens>,
	pub delay: Duration,
	pub ledger: Arc<Ledger>,
	pub resolves: AtomicUsize,
}

impl StaticProvider {
	pub fn new(name: &str, lenses: Vec<CodeLens>, ledger: &Arc<Ledger>) -> Self {
		Self {
			name: name.to_string(),
			lenses,
			delay: Duration::ZERO,
			ledger: Arc::clone(ledger),
			resolves: AtomicUsize::new(0),
		}
	}

	pub fn delayed(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}

	pub fn arc(self) -> Arc<dyn LensProvider> {
		Arc::new(self)
	}
}

pub fn tracked_batch(lenses: Vec<CodeLens>, ledger: &Arc<Ledger>) -> LensBatch {
	ledger.acquired.fetch_add(1, Ordering::SeqCst);
	let ledger = Arc::clone(ledger);
	LensBatch::new(lenses).with_resource(from_fn(move || {
		ledger.released.fetch_add(1, Ordering::SeqCst);
	}))
}

#[async_trait]
impl LensProvider for StaticProvider {
	fn name(&self) -> &str {
		&self.name
	}

	async fn provide(&self, _: &Document, cancel: &CancellationToken) -> Result<Option<LensBatch>, ProviderError> {
		if !self.delay.is_zero() {
			tokio::select! {
				_ = cancel.cancelled() => return Err(ProviderError::Cancelled),
				_ = tokio::time::sleep(self.delay) => {}
			}
		}
		Ok(Some(tracked_batch(self.lenses.clone(), &self.ledger)))
	}

	async fn resolve(&self, mut lens: CodeLens, _: &CancellationToken) -> Result<CodeLens, ProviderError> {
		self.resolves.fetch_add(1, Ordering::SeqCst);
		let title = lens.data.take().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default();
		lens.command = Some(Command::new(format!("{}:{title}", self.name), "test.resolved".to_string(), None));
		Ok(lens)
	}
}

/// Always fails.
pub struct FailingProvider;

#[async_trait]
impl LensProvider for FailingProvider {
	fn name(&self) -> &str {
		"failing"
	}

	async fn provide(&self, _: &Document, _: &CancellationToken) -> Result<Option<LensBatch>, ProviderError> {
		Err(ProviderError::Failed("backend unreachable".into()))
	}
}

/// Provides unresolved lenses whose resolution always fails.
pub struct UnresolvableProvider;

#[async_trait]
impl LensProvider for UnresolvableProvider {
	fn name(&self) -> &str {
		"unresolvable"
	}

	async fn provide(&self, _: &Document, _: &CancellationToken) -> Result<Option<LensBatch>, ProviderError> {
		Ok(Some(LensBatch::new(vec![unresolved(0, 0, "refs")])))
	}

	async fn resolve(&self, _: CodeLens, _: &CancellationToken) -> Result<CodeLens, ProviderError> {
		Err(ProviderError::Other(anyhow::anyhow!("resolve exploded")))
	}
}

/// Panics inside `provide`.
pub struct PanickingProvider;

#[async_trait]
impl LensProvider for PanickingProvider {
	fn name(&self) -> &str {
		"panicking"
	}

	async fn provide(&self, _: &Document, _: &CancellationToken) -> Result<Option<LensBatch>, ProviderError> {
		panic!("provider bug");
	}
}

/// Ignores cancellation and only answers once its gate opens.
pub struct GatedProvider {
	pub gate: Arc<Notify>,
	pub lenses: Vec<CodeLens>,
	pub ledger: Arc<Ledger>,
}

#[async_trait]
impl LensProvider for GatedProvider {
	fn name(&self) -> &str {
		"gated"
	}

	async fn provide(&self, _: &Document, _: &CancellationToken) -> Result<Option<LensBatch>, ProviderError> {
		self.gate.notified().await;
		Ok(Some(tracked_batch(self.lenses.clone(), &self.ledger)))
	}
}

/// Returns nothing applicable.
pub struct SilentProvider;

#[async_trait]
impl LensProvider for SilentProvider {
	fn name(&self) -> &str {
		"silent"
	}

	async fn provide(&self, _: &Document, _: &CancellationToken) -> Result<Option<LensBatch>, ProviderError> {
		Ok(None)
	}
}

pub fn shared(provider: impl LensProvider) -> Arc<dyn LensProvider> {
	Arc::new(provider)
}

/// Registry returning a fixed provider list; list position is rank.
pub struct FixedRegistry(pub Vec<Arc<dyn LensProvider>>);

impl ProviderRegistry for FixedRegistry {
	fn ordered(&self, _: &Document) -> Result<Vec<Arc<dyn LensProvider>>, RegistryError> {
		Ok(self.0.clone())
	}
}

/// Registry that cannot be read.
pub struct BrokenRegistry;

impl ProviderRegistry for BrokenRegistry {
	fn ordered(&self, _: &Document) -> Result<Vec<Arc<dyn LensProvider>>, RegistryError> {
		Err(RegistryError::Unavailable("poisoned".into()))
	}
}

/// Sink recording every reported fault.
#[derive(Default)]
pub struct CollectingSink {
	pub faults: Mutex<Vec<(String, usize, FaultPhase, String)>>,
}

impl CollectingSink {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn providers(&self) -> Vec<String> {
		self.faults.lock().iter().map(|(name, ..)| name.clone()).collect()
	}
}

impl ErrorSink for CollectingSink {
	fn report(&self, fault: &ProviderFault) {
		let kind = match &fault.kind {
			FaultKind::Error(_) => "error",
			FaultKind::Panicked(_) => "panicked",
			FaultKind::TimedOut(_) => "timed_out",
		};
		self.faults.lock().push((fault.provider.clone(), fault.rank, fault.phase, kind.to_string()));
	}
}

pub fn engine(providers: Vec<Arc<dyn LensProvider>>, sink: &Arc<CollectingSink>) -> LensEngine {
	LensEngine::new(Arc::new(FixedRegistry(providers))).with_sink(Arc::clone(sink) as Arc<dyn ErrorSink>)
}
