//! Engine configuration.
//!
//! ```toml
//! # Abandon a provider call that has not settled after this long.
//! provider-timeout-ms = 2000
//! # Most lenses resolved by one `LensEngine::resolve` call.
//! resolve-limit = 50
//! # Worker class provider calls run under: "interactive" or "background".
//! task-class = "interactive"
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use xeno_worker::TaskClass;

use crate::error::ConfigError;

/// Returns the default number of lenses resolved per call.
fn default_resolve_limit() -> usize {
	50
}

/// Reads a [`TaskClass`] from its config name, rejecting unknown names.
fn task_class_by_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TaskClass, D::Error> {
	let name = String::deserialize(deserializer)?;
	TaskClass::from_name(&name).ok_or_else(|| serde::de::Error::custom(format!("unknown task class {name:?} (expected 'interactive' or 'background')")))
}

/// Tuning for [`crate::LensEngine`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EngineConfig {
	/// Per-provider timeout; unset means providers are awaited until they
	/// settle or the run is cancelled.
	#[serde(default)]
	pub provider_timeout_ms: Option<u64>,
	#[serde(default = "default_resolve_limit")]
	pub resolve_limit: usize,
	/// Worker class provider calls are spawned under.
	#[serde(default, deserialize_with = "task_class_by_name")]
	pub task_class: TaskClass,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			provider_timeout_ms: None,
			resolve_limit: default_resolve_limit(),
			task_class: TaskClass::default(),
		}
	}
}

impl EngineConfig {
	/// Parses a TOML config.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	pub fn provider_timeout(&self) -> Option<Duration> {
		self.provider_timeout_ms.map(Duration::from_millis)
	}

	pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
		self.provider_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
		self
	}

	pub fn with_task_class(mut self, class: TaskClass) -> Self {
		self.task_class = class;
		self
	}

	pub fn task_class(&self) -> TaskClass {
		self.task_class
	}
}
