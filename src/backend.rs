//! URL storage behind the navigation engine.
//!
//! The engine drives navigation; a [`HistoryBackend`] only stores and
//! reports URLs. [`MemoryHistory`] is the in-process implementation used
//! for tests and headless hosts.

use parking_lot::Mutex;

use crate::path::clean_path;

/// Where committed URLs live.
///
/// Implementations must be cheap to call re-entrantly: the engine calls
/// them from inside transition completion.
pub trait HistoryBackend: Send + Sync {
	/// Moves `delta` entries through the stack, clamped to its ends.
	fn go(&self, delta: i64);

	/// Pushes `url` as a new entry.
	fn push(&self, url: &str);

	/// Replaces the current entry with `url`.
	fn replace(&self, url: &str);

	/// The URL of the current entry.
	fn current_location(&self) -> String;

	/// Re-synchronizes the stored URL with `url` after an aborted or
	/// redirected transition, replacing by default and pushing when
	/// `push` is set.
	fn ensure_url(&self, url: &str, push: bool) {
		if self.current_location() != url {
			if push {
				self.push(url);
			} else {
				self.replace(url);
			}
		}
	}
}

/// An in-memory history stack.
pub struct MemoryHistory {
	state: Mutex<MemoryState>,
}

struct MemoryState {
	stack: Vec<String>,
	index: usize,
}

impl MemoryHistory {
	/// A stack holding only `initial`.
	pub fn new(initial: impl Into<String>) -> Self {
		Self {
			state: Mutex::new(MemoryState {
				stack: vec![clean_path(&initial.into())],
				index: 0,
			}),
		}
	}

	/// Number of entries currently stored.
	pub fn len(&self) -> usize {
		self.state.lock().stack.len()
	}

	/// Whether nothing has been pushed yet: the stack still holds only
	/// its initial entry.
	pub fn is_pristine(&self) -> bool {
		self.len() <= 1
	}
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new("/")
	}
}

impl HistoryBackend for MemoryHistory {
	fn go(&self, delta: i64) {
		let mut state = self.state.lock();
		let target = state.index as i64 + delta;
		state.index = target.clamp(0, state.stack.len() as i64 - 1) as usize;
	}

	fn push(&self, url: &str) {
		let mut state = self.state.lock();
		let index = state.index;
		// forward entries are discarded, like a browser stack
		state.stack.truncate(index + 1);
		state.stack.push(clean_path(url));
		state.index += 1;
	}

	fn replace(&self, url: &str) {
		let mut state = self.state.lock();
		let index = state.index;
		state.stack[index] = clean_path(url);
	}

	fn current_location(&self) -> String {
		let state = self.state.lock();
		state.stack[state.index].clone()
	}
}
