use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::{JoinHandle, JoinSet};

use crate::TaskClass;

/// A task in a [`WorkerJoinSet`] panicked before producing its output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task panicked: {message}")]
pub struct TaskPanic {
	/// Panic payload rendered as text, or a placeholder for non-string payloads.
	pub message: String,
}

impl TaskPanic {
	fn from_payload(payload: Box<dyn Any + Send>) -> Self {
		let message = if let Some(s) = payload.downcast_ref::<&str>() {
			(*s).to_string()
		} else if let Some(s) = payload.downcast_ref::<String>() {
			s.clone()
		} else {
			"<non-string panic payload>".to_string()
		};
		Self { message }
	}
}

/// One settled task: its key and either the output or the panic it raised.
pub type Settled<K, T> = (K, Result<T, TaskPanic>);

/// Keyed wrapper around a Tokio [`JoinSet`].
///
/// Every task carries a caller-chosen key that comes back with its completion,
/// including when the task panics. Spawning goes through the worker runtime
/// handle so tasks attach to the active runtime context.
#[derive(Debug)]
pub struct WorkerJoinSet<K, T> {
	class: TaskClass,
	inner: JoinSet<Settled<K, T>>,
}

impl<K, T> WorkerJoinSet<K, T>
where
	K: Send + 'static,
	T: Send + 'static,
{
	/// Creates an empty join set for the given task class.
	pub fn new(class: TaskClass) -> Self {
		Self { class, inner: JoinSet::new() }
	}

	/// Returns the number of tasks not yet joined.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Returns `true` if no tasks are outstanding.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Spawns a keyed future into the set.
	#[allow(clippy::disallowed_methods)]
	pub fn spawn<F>(&mut self, key: K, fut: F)
	where
		F: Future<Output = T> + Send + 'static,
	{
		tracing::trace!(worker_class = self.class.as_str(), pending = self.inner.len(), "worker.join_set.spawn");
		let handle = crate::spawn::current_handle();
		let _guard = handle.enter();
		self.inner.spawn(async move {
			let outcome = AssertUnwindSafe(fut).catch_unwind().await.map_err(TaskPanic::from_payload);
			(key, outcome)
		});
	}

	/// Waits for the next settled task.
	///
	/// Returns `None` once the set is empty.
	pub async fn join_next(&mut self) -> Option<Settled<K, T>> {
		loop {
			match self.inner.join_next().await? {
				Ok(settled) => return Some(settled),
				Err(err) => self.note_lost(&err),
			}
		}
	}

	/// Returns one already-settled task without waiting.
	pub fn try_join_next(&mut self) -> Option<Settled<K, T>> {
		loop {
			match self.inner.try_join_next()? {
				Ok(settled) => return Some(settled),
				Err(err) => self.note_lost(&err),
			}
		}
	}

	/// Hands every outstanding task to a background reaper.
	///
	/// Tasks keep running to completion instead of being aborted with the set;
	/// each late completion is passed to `on_settled`. The returned handle
	/// resolves to the number of tasks reaped.
	pub fn reap_detached<F>(self, mut on_settled: F) -> JoinHandle<usize>
	where
		F: FnMut(K, Result<T, TaskPanic>) + Send + 'static,
	{
		let pending = self.inner.len();
		tracing::trace!(worker_class = self.class.as_str(), pending, "worker.join_set.reap_detached");
		let mut set = self;
		crate::spawn(TaskClass::Background, async move {
			let mut reaped = 0usize;
			while let Some((key, outcome)) = set.join_next().await {
				reaped += 1;
				on_settled(key, outcome);
			}
			reaped
		})
	}

	fn note_lost(&self, err: &tokio::task::JoinError) {
		// Unwinds are caught inside the task, so only runtime shutdown lands here.
		tracing::warn!(worker_class = self.class.as_str(), error = %err, "worker.join_set.task_lost");
	}
}
