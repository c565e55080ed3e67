/// Execution classes used for worker scheduling and trace fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Latency-sensitive work that directly feeds what the user is looking at.
	#[default]
	Interactive,
	/// Async work that may lag behind without visible harm.
	Background,
}

impl TaskClass {
	/// Stable name used in `worker_class` trace fields and config files.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
		}
	}

	/// Parses a class from its [`Self::as_str`] form.
	pub fn from_name(name: &str) -> Option<Self> {
		match name {
			"interactive" => Some(Self::Interactive),
			"background" => Some(Self::Background),
			_ => None,
		}
	}
}
