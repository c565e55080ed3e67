//! Error types for lens aggregation.

use thiserror::Error;

/// Whole-run failures of [`crate::LensEngine::run`].
///
/// Individual provider failures never surface here; they are absorbed and
/// reported through the [`crate::ErrorSink`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
	/// The registry could not produce the provider list for the document.
	#[error("provider registry failed: {0}")]
	Registry(#[from] RegistryError),
}

/// Failures while looking up providers for a document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
	/// The registry's internal state could not be read.
	#[error("registry unavailable: {0}")]
	Unavailable(String),
	/// A selector glob failed to compile at registration time.
	#[error("invalid selector pattern {pattern:?}: {source}")]
	Pattern {
		/// The offending glob.
		pattern: String,
		/// Underlying glob error.
		source: globset::Error,
	},
}

/// Failures a provider may return from `provide` or `resolve`.
#[derive(Debug, Error)]
pub enum ProviderError {
	/// The provider observed cancellation and stopped early.
	#[error("cancelled")]
	Cancelled,
	/// The provider failed with a plain message.
	#[error("{0}")]
	Failed(String),
	/// Any other provider-side failure.
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

/// Errors loading [`crate::EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// TOML syntax or shape error.
	#[error("config parse error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// A convenient type alias for `Result` with `E` = [`EngineError`].
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
