//! Side channel for provider faults.

use std::fmt;
use std::time::Duration;

use crate::error::ProviderError;

/// What went wrong in one provider call.
#[derive(Debug)]
pub enum FaultKind {
	/// The provider returned an error.
	Error(ProviderError),
	/// The provider call panicked.
	Panicked(String),
	/// The provider did not settle within the configured timeout.
	TimedOut(Duration),
}

impl fmt::Display for FaultKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Error(err) => write!(f, "error: {err}"),
			Self::Panicked(msg) => write!(f, "panicked: {msg}"),
			Self::TimedOut(after) => write!(f, "timed out after {after:?}"),
		}
	}
}

/// Which phase of lens handling a fault happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPhase {
	Provide,
	Resolve,
}

impl FaultPhase {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Provide => "provide",
			Self::Resolve => "resolve",
		}
	}
}

/// A provider failure absorbed by the engine.
#[derive(Debug)]
pub struct ProviderFault {
	/// [`crate::LensProvider::name`] of the failing provider.
	pub provider: String,
	/// Rank of the provider in the run.
	pub rank: usize,
	pub phase: FaultPhase,
	pub kind: FaultKind,
}

/// Receives provider faults for host-level logging or telemetry.
///
/// Implementations must not panic; the engine calls them inline.
pub trait ErrorSink: Send + Sync + 'static {
	fn report(&self, fault: &ProviderFault);
}

/// Default sink logging faults through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
	fn report(&self, fault: &ProviderFault) {
		tracing::warn!(
			provider = %fault.provider,
			rank = fault.rank,
			phase = fault.phase.as_str(),
			fault = %fault.kind,
			"lens.provider.fault"
		);
	}
}
