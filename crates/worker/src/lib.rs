//! Worker task primitives shared by xeno crates.
//!
//! Tasks are tagged with a [`TaskClass`] for trace output and spawned on the
//! ambient tokio runtime, falling back to a small shared runtime when called
//! from plain threads. [`WorkerJoinSet`] adds keyed completion and panic
//! capture on top of [`tokio::task::JoinSet`].

mod class;
mod join_set;
mod spawn;

pub use class::TaskClass;
pub use join_set::{Settled, TaskPanic, WorkerJoinSet};
pub use spawn::spawn;
