//! Deferred-work scheduling.
//!
//! The engine never spawns threads or sleeps itself; everything it wants
//! to run later goes through a [`Scheduler`]. Hosts plug in their event
//! loop; tests use [`ManualScheduler`] and pump it explicitly, which
//! keeps timing-dependent behavior deterministic.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send>;

/// Runs tasks later, on the host's terms.
pub trait Scheduler: Send + Sync {
	/// Runs `task` as soon as the current call stack unwinds.
	fn defer(&self, task: Task);

	/// Runs `task` after roughly `delay`.
	fn delay(&self, delay: Duration, task: Task);
}

/// A scheduler that runs nothing until pumped.
///
/// `delay` collapses to `defer`: each [`ManualScheduler::pump`] call is
/// one timer tick.
#[derive(Default)]
pub struct ManualScheduler {
	queue: Mutex<VecDeque<Task>>,
}

impl ManualScheduler {
	/// An empty scheduler.
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs every task queued so far; tasks queued while pumping wait
	/// for the next pump. Returns how many tasks ran.
	pub fn pump(&self) -> usize {
		let batch: VecDeque<Task> = std::mem::take(&mut *self.queue.lock());
		let count = batch.len();
		for task in batch {
			task();
		}
		count
	}

	/// Whether no work is queued.
	pub fn is_idle(&self) -> bool {
		self.queue.lock().is_empty()
	}
}

impl Scheduler for ManualScheduler {
	fn defer(&self, task: Task) {
		self.queue.lock().push_back(task);
	}

	fn delay(&self, _delay: Duration, task: Task) {
		self.queue.lock().push_back(task);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	#[test]
	fn test_pump_runs_queued_tasks_in_order() {
		let scheduler = ManualScheduler::new();
		let log = Arc::new(Mutex::new(Vec::new()));

		for tag in ["a", "b"] {
			let log = log.clone();
			scheduler.defer(Box::new(move || log.lock().push(tag)));
		}

		assert!(!scheduler.is_idle());
		assert_eq!(scheduler.pump(), 2);
		assert_eq!(*log.lock(), vec!["a", "b"]);
		assert!(scheduler.is_idle());
	}

	#[test]
	fn test_tasks_queued_while_pumping_wait() {
		let scheduler = Arc::new(ManualScheduler::new());
		let count = Arc::new(AtomicUsize::new(0));

		let inner_scheduler = scheduler.clone();
		let inner_count = count.clone();
		scheduler.defer(Box::new(move || {
			let count = inner_count.clone();
			inner_scheduler.delay(
				Duration::from_millis(16),
				Box::new(move || {
					count.fetch_add(1, Ordering::SeqCst);
				}),
			);
		}));

		assert_eq!(scheduler.pump(), 1);
		assert_eq!(count.load(Ordering::SeqCst), 0);
		assert_eq!(scheduler.pump(), 1);
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}
}
