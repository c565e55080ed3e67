//! Code lens aggregation across independently registered providers.
//!
//! A [`LensRegistry`] maps documents to the providers that apply to them, in
//! preference order. [`LensEngine::run`] queries all of them concurrently on
//! worker tasks, reports faulty providers through an [`ErrorSink`] instead of
//! failing, honors a shared [`CancellationToken`], and merges the settled
//! batches into one [`LensModel`] ordered by line, provider rank and column.
//!
//! Lenses may depend on provider-side resources. Each [`LensBatch`] carries
//! them as [`Disposable`]s; the model takes ownership of every accepted batch
//! and releases them exactly once when disposed. [`LensSession`] wraps the
//! engine for a single view, replacing and disposing stale models as the
//! document changes.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod config;
pub mod disposable;
mod document;
mod engine;
pub mod error;
mod model;
mod provider;
pub mod registry;
pub mod selector;
mod session;
pub mod sink;

pub use config::EngineConfig;
pub use disposable::{Disposable, DisposableStore};
pub use document::Document;
pub use engine::LensEngine;
pub use error::{ConfigError, EngineError, ProviderError, RegistryError, Result};
pub use lsp_types;
pub use model::{Anchor, LensItem, LensModel};
pub use provider::{LensBatch, LensProvider};
pub use registry::{LensRegistry, ProviderRegistry, Registration};
pub use selector::DocumentSelector;
pub use session::{LensSession, RefreshOutcome};
pub use sink::{ErrorSink, FaultKind, FaultPhase, ProviderFault, TracingSink};
pub use xeno_worker::TaskClass;
