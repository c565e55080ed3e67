//! Explicit release of resources tied to lens results.
//!
//! Disposal has observable side effects (releasing handles held by providers),
//! so it is modeled as an owner object rather than left to memory reclamation
//! alone. A [`DisposableStore`] still disposes on drop so a forgotten store
//! cannot leak.

use std::fmt;

/// A resource that must be released exactly once.
pub trait Disposable: Send + 'static {
	/// Releases the resource.
	fn dispose(self: Box<Self>);
}

struct FnDisposable<F>(F);

impl<F> Disposable for FnDisposable<F>
where
	F: FnOnce() + Send + 'static,
{
	fn dispose(self: Box<Self>) {
		(self.0)()
	}
}

/// Wraps a closure as a [`Disposable`].
pub fn from_fn<F>(f: F) -> impl Disposable
where
	F: FnOnce() + Send + 'static,
{
	FnDisposable(f)
}

/// Ordered owner of disposables, released together.
#[derive(Default)]
pub struct DisposableStore {
	items: Vec<Box<dyn Disposable>>,
	disposed: bool,
}

impl fmt::Debug for DisposableStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DisposableStore").field("len", &self.items.len()).field("disposed", &self.disposed).finish()
	}
}

impl DisposableStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Takes ownership of `item`.
	///
	/// A store that is already disposed releases the item immediately.
	pub fn add(&mut self, item: impl Disposable) {
		self.push(Box::new(item));
	}

	fn push(&mut self, item: Box<dyn Disposable>) {
		if self.disposed {
			tracing::warn!("lens.disposable.add_after_dispose");
			item.dispose();
			return;
		}
		self.items.push(item);
	}

	/// Moves every resource of `other` into this store, leaving `other` empty.
	pub fn extend_from(&mut self, other: &mut DisposableStore) {
		for item in other.items.drain(..) {
			self.push(item);
		}
	}

	/// Number of resources currently owned.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed
	}

	/// Releases all owned resources in insertion order. Later calls are no-ops.
	pub fn dispose(&mut self) {
		if self.disposed {
			return;
		}
		self.disposed = true;
		for item in self.items.drain(..) {
			item.dispose();
		}
	}
}

impl Drop for DisposableStore {
	fn drop(&mut self) {
		self.dispose();
	}
}
