//! Navigation guards and the machinery that runs them.
//!
//! Guards are invoked callback-style: each receives a resolver whose
//! verdict (proceed, abort, error or redirect) drives the transition
//! forward. A resolver's continuation fires at most once; late or
//! duplicate verdicts are silently dropped. A guard may also return an
//! error directly, which counts as an error verdict.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{GuardResult, NavigationError};
use crate::location::RawLocation;
use crate::record::{InstanceRegistry, RecordId, RecordTree, ViewDefinition, ViewInstance};
use crate::route::Route;

/// A guard's verdict on an in-flight transition.
#[derive(Debug, Clone)]
pub enum Resolution {
	/// Continue to the next guard.
	Proceed,
	/// Cancel the transition silently.
	Abort,
	/// Cancel the transition with an error.
	Error(NavigationError),
	/// Cancel the transition and navigate to a new target instead.
	Redirect(RawLocation),
}

/// A one-shot resolution callback.
///
/// Cloning shares the shot: whichever clone resolves first wins, the
/// rest become no-ops.
#[derive(Clone)]
pub struct Continuation {
	slot: Arc<Mutex<Option<Box<dyn FnOnce(Resolution) + Send>>>>,
}

impl Continuation {
	/// Wraps `callback` so it runs at most once.
	pub fn new(callback: impl FnOnce(Resolution) + Send + 'static) -> Self {
		Self {
			slot: Arc::new(Mutex::new(Some(Box::new(callback)))),
		}
	}

	/// Fires the callback with `resolution`; a no-op once spent.
	pub fn resolve(&self, resolution: Resolution) {
		let callback = self.slot.lock().take();
		if let Some(callback) = callback {
			callback(resolution);
		}
	}

	/// Whether the callback already fired.
	pub fn is_spent(&self) -> bool {
		self.slot.lock().is_none()
	}
}

/// The resolver handed to a navigation guard.
///
/// Consuming methods make the single verdict explicit in the signature;
/// the underlying continuation is one-shot regardless.
pub struct NavigationResolver {
	continuation: Continuation,
}

impl NavigationResolver {
	/// A resolver firing `callback` with the guard's verdict.
	pub fn new(callback: impl FnOnce(Resolution) + Send + 'static) -> Self {
		Self::from_continuation(Continuation::new(callback))
	}

	/// A resolver sharing an existing continuation.
	pub fn from_continuation(continuation: Continuation) -> Self {
		Self { continuation }
	}

	/// Lets the transition continue.
	pub fn proceed(self) {
		self.continuation.resolve(Resolution::Proceed);
	}

	/// Cancels the transition silently.
	pub fn abort(self) {
		self.continuation.resolve(Resolution::Abort);
	}

	/// Cancels the transition with an error.
	pub fn error(self, error: NavigationError) {
		self.continuation.resolve(Resolution::Error(error));
	}

	/// Cancels the transition and navigates to `target` instead.
	pub fn redirect(self, target: impl Into<RawLocation>) {
		self.continuation.resolve(Resolution::Redirect(target.into()));
	}
}

/// A callback against a mounted view instance, queued by an enter guard
/// and flushed after the transition commits.
pub type InstanceCallback = Box<dyn FnOnce(&ViewInstance) + Send>;

/// One queued enter callback, addressed to a view slot.
pub struct QueuedEnterCallback {
	/// Record owning the slot.
	pub record: RecordId,
	/// Slot name.
	pub slot: String,
	/// The callback itself.
	pub callback: InstanceCallback,
}

/// Callbacks queued during the enter phase, flushed post-commit.
pub type PostEnterQueue = Arc<Mutex<Vec<QueuedEnterCallback>>>;

/// Resolver handed to component enter guards.
///
/// Identical to [`NavigationResolver`] plus [`EnterResolver::proceed_with`],
/// which queues a callback to run against the mounted instance once the
/// transition commits.
pub struct EnterResolver {
	inner: NavigationResolver,
	queue: PostEnterQueue,
	record: RecordId,
	slot: String,
}

impl EnterResolver {
	pub(crate) fn new(
		inner: NavigationResolver,
		queue: PostEnterQueue,
		record: RecordId,
		slot: String,
	) -> Self {
		Self {
			inner,
			queue,
			record,
			slot,
		}
	}

	/// Lets the transition continue.
	pub fn proceed(self) {
		self.inner.proceed();
	}

	/// Continues and queues `callback` to run against this slot's
	/// instance after the transition commits and the instance mounts.
	pub fn proceed_with(self, callback: impl FnOnce(&ViewInstance) + Send + 'static) {
		self.queue.lock().push(QueuedEnterCallback {
			record: self.record,
			slot: self.slot,
			callback: Box::new(callback),
		});
		self.inner.proceed();
	}

	/// Cancels the transition silently.
	pub fn abort(self) {
		self.inner.abort();
	}

	/// Cancels the transition with an error.
	pub fn error(self, error: NavigationError) {
		self.inner.error(error);
	}

	/// Cancels the transition and navigates to `target` instead.
	pub fn redirect(self, target: impl Into<RawLocation>) {
		self.inner.redirect(target);
	}
}

/// A global or per-record navigation guard.
pub type NavigationGuard =
	Arc<dyn Fn(&Route, &Route, NavigationResolver) -> GuardResult + Send + Sync>;

/// A component enter guard; runs before the component mounts.
pub type EnterGuard = Arc<dyn Fn(&Route, &Route, EnterResolver) -> GuardResult + Send + Sync>;

/// A component update or leave guard, bound to its mounted instance.
pub type InstanceGuard =
	Arc<dyn Fn(&ViewInstance, &Route, &Route, NavigationResolver) -> GuardResult + Send + Sync>;

/// A post-commit hook; observes, cannot veto.
pub type AfterHook = Arc<dyn Fn(&Route, &Route) + Send + Sync>;

/// The record-chain diff between two routes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct QueueDiff {
	/// Records present in both chains, up to the first divergence.
	pub updated: Vec<RecordId>,
	/// Records only the next chain has, from the divergence on.
	pub activated: Vec<RecordId>,
	/// Records only the current chain has, from the divergence on.
	pub deactivated: Vec<RecordId>,
}

/// Diffs two root-first record chains at their first divergence point.
pub fn resolve_queue(current: &[RecordId], next: &[RecordId]) -> QueueDiff {
	let max = current.len().max(next.len());
	let mut split = max;
	for i in 0..max {
		if current.get(i) != next.get(i) {
			split = i;
			break;
		}
	}

	QueueDiff {
		updated: next[..split.min(next.len())].to_vec(),
		activated: next[split.min(next.len())..].to_vec(),
		deactivated: current[split.min(current.len())..].to_vec(),
	}
}

/// One step of queue processing; calling it moves to the next entry.
pub type QueueStep = Box<dyn FnOnce() + Send>;

/// How the queue runner hands a guard to its caller.
pub type QueueInvoke = Arc<dyn Fn(NavigationGuard, QueueStep) + Send + Sync>;

/// Runs `queue` strictly sequentially: entry `i + 1` starts only when
/// entry `i`'s step fires. `None` entries are skipped without consuming
/// a step; `done` fires after the last entry.
pub fn run_guard_queue(queue: Arc<Vec<Option<NavigationGuard>>>, invoke: QueueInvoke, done: QueueStep) {
	run_from(queue, invoke, done, 0);
}

fn run_from(
	queue: Arc<Vec<Option<NavigationGuard>>>,
	invoke: QueueInvoke,
	done: QueueStep,
	start: usize,
) {
	let mut index = start;
	loop {
		match queue.get(index) {
			None => {
				done();
				return;
			}
			Some(Some(guard)) => {
				let guard = guard.clone();
				let next_queue = queue.clone();
				let next_invoke = invoke.clone();
				let step: QueueStep =
					Box::new(move || run_from(next_queue, next_invoke, done, index + 1));
				invoke(guard, step);
				return;
			}
			Some(None) => index += 1,
		}
	}
}

fn resolved_slots(
	tree: &RecordTree,
	records: &[RecordId],
) -> Vec<(RecordId, String, crate::record::ViewComponent)> {
	let mut slots = Vec::new();
	for &id in records {
		for (slot, definition) in tree.record(id).components() {
			if let ViewDefinition::Resolved(component) = definition {
				slots.push((id, slot, component));
			}
		}
	}
	slots
}

fn bind_instance_guard(
	guard: InstanceGuard,
	instance: Option<ViewInstance>,
) -> Option<NavigationGuard> {
	let instance = instance?;
	Some(Arc::new(move |to, from, resolver| {
		guard(&instance, to, from, resolver)
	}))
}

/// Leave guards of the deactivated records, leaf first, each bound to
/// its mounted instance. A declared guard whose slot is not mounted
/// yields a `None` entry so the queue skips it.
pub fn extract_leave_guards(
	tree: &RecordTree,
	registry: &InstanceRegistry,
	deactivated: &[RecordId],
) -> Vec<Option<NavigationGuard>> {
	let mut guards = Vec::new();
	for (id, slot, component) in resolved_slots(tree, deactivated) {
		if let Some(guard) = component.hooks.before_leave.clone() {
			guards.push(bind_instance_guard(guard, registry.get(id, &slot)));
		}
	}
	guards.reverse();
	guards
}

/// Update guards of the records kept across the transition, root first,
/// bound to their mounted instances.
pub fn extract_update_guards(
	tree: &RecordTree,
	registry: &InstanceRegistry,
	updated: &[RecordId],
) -> Vec<Option<NavigationGuard>> {
	let mut guards = Vec::new();
	for (id, slot, component) in resolved_slots(tree, updated) {
		if let Some(guard) = component.hooks.before_update.clone() {
			guards.push(bind_instance_guard(guard, registry.get(id, &slot)));
		}
	}
	guards
}

/// Enter guards of the newly activated records, root first.
///
/// Each is wrapped so its resolver can queue post-commit instance
/// callbacks into `queue`.
pub fn extract_enter_guards(
	tree: &RecordTree,
	activated: &[RecordId],
	queue: &PostEnterQueue,
) -> Vec<Option<NavigationGuard>> {
	let mut guards: Vec<Option<NavigationGuard>> = Vec::new();
	for (id, slot, component) in resolved_slots(tree, activated) {
		if let Some(guard) = component.hooks.before_enter.clone() {
			let queue = queue.clone();
			guards.push(Some(Arc::new(move |to: &Route, from: &Route, resolver| {
				let resolver = EnterResolver::new(resolver, queue.clone(), id, slot.clone());
				guard(to, from, resolver)
			})));
		}
	}
	guards
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::record::{Component, RecordBuilder, ViewComponent, ViewHooks};
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn test_continuation_fires_once() {
		let count = Arc::new(AtomicUsize::new(0));
		let seen = count.clone();
		let continuation = Continuation::new(move |_| {
			seen.fetch_add(1, Ordering::SeqCst);
		});

		continuation.resolve(Resolution::Proceed);
		continuation.resolve(Resolution::Abort);
		assert_eq!(count.load(Ordering::SeqCst), 1);
		assert!(continuation.is_spent());
	}

	#[test]
	fn test_resolve_queue_diff() {
		let (a, b, c, d) = (RecordId(0), RecordId(1), RecordId(2), RecordId(3));

		let diff = resolve_queue(&[a, b], &[a, c, d]);
		assert_eq!(diff.updated, vec![a]);
		assert_eq!(diff.activated, vec![c, d]);
		assert_eq!(diff.deactivated, vec![b]);

		let diff = resolve_queue(&[a, b], &[a, b]);
		assert_eq!(diff.updated, vec![a, b]);
		assert!(diff.activated.is_empty());
		assert!(diff.deactivated.is_empty());

		let diff = resolve_queue(&[], &[a]);
		assert!(diff.updated.is_empty());
		assert_eq!(diff.activated, vec![a]);
	}

	#[test]
	fn test_run_guard_queue_sequential_and_skips_none() {
		let order = Arc::new(Mutex::new(Vec::new()));

		let guard = |tag: &'static str, order: &Arc<Mutex<Vec<&'static str>>>| -> NavigationGuard {
			let order = order.clone();
			Arc::new(move |_to, _from, resolver| {
				order.lock().push(tag);
				resolver.proceed();
				Ok(())
			})
		};

		let queue: Arc<Vec<Option<NavigationGuard>>> = Arc::new(vec![
			Some(guard("a", &order)),
			None,
			Some(guard("b", &order)),
		]);

		let to = Route::default();
		let from = Route::default();
		let invoke: QueueInvoke = Arc::new(move |guard, step| {
			let resolver = NavigationResolver::new(move |resolution| {
				if matches!(resolution, Resolution::Proceed) {
					step();
				}
			});
			guard(&to, &from, resolver).unwrap();
		});

		let done_order = order.clone();
		run_guard_queue(
			queue,
			invoke,
			Box::new(move || done_order.lock().push("done")),
		);

		assert_eq!(*order.lock(), vec!["a", "b", "done"]);
	}

	#[test]
	fn test_enter_resolver_queues_callback() {
		let queue: PostEnterQueue = Arc::new(Mutex::new(Vec::new()));
		let fired = Arc::new(AtomicUsize::new(0));

		let resolver = NavigationResolver::new(|_| {});
		let enter = EnterResolver::new(resolver, queue.clone(), RecordId(0), "default".to_string());

		let seen = fired.clone();
		enter.proceed_with(move |_instance| {
			seen.fetch_add(1, Ordering::SeqCst);
		});

		let mut queued = queue.lock();
		assert_eq!(queued.len(), 1);
		assert_eq!(queued[0].slot, "default");

		let entry = queued.pop().unwrap();
		(entry.callback)(&ViewInstance::new(()));
		assert_eq!(fired.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_extract_leave_guards_leaf_first_and_unmounted_is_none() {
		let order = Arc::new(Mutex::new(Vec::new()));
		let leave = |tag: &'static str, order: &Arc<Mutex<Vec<&'static str>>>| -> InstanceGuard {
			let order = order.clone();
			Arc::new(move |_instance, _to, _from, resolver| {
				order.lock().push(tag);
				resolver.proceed();
				Ok(())
			})
		};

		let hooks = |guard: InstanceGuard| ViewHooks {
			before_leave: Some(guard),
			..ViewHooks::default()
		};

		let mut tree = RecordTree::new();
		let parent = tree.insert(RecordBuilder::new("/a").with_component(
			"default",
			ViewDefinition::Resolved(ViewComponent::with_hooks(
				Component::new(()),
				hooks(leave("parent", &order)),
			)),
		));
		let child = tree.insert(
			RecordBuilder::new("/a/b").with_parent(parent).with_component(
				"default",
				ViewDefinition::Resolved(ViewComponent::with_hooks(
					Component::new(()),
					hooks(leave("child", &order)),
				)),
			),
		);

		let registry = InstanceRegistry::new();
		registry.mount(parent, "default", ViewInstance::new(()));
		// child is declared but never mounted

		let guards = extract_leave_guards(&tree, &registry, &[parent, child]);
		assert_eq!(guards.len(), 2);
		assert!(guards[0].is_none());
		assert!(guards[1].is_some());

		let to = Route::default();
		let from = Route::default();
		for guard in guards.into_iter().flatten() {
			guard(&to, &from, NavigationResolver::new(|_| {})).unwrap();
		}
		assert_eq!(*order.lock(), vec!["parent"]);
	}
}
