//! Lazy view-component resolution.
//!
//! [`resolve_async_components`] bridges component loaders into the guard
//! pipeline: the transition proceeds only once every loader slot of the
//! newly activated records has delivered a component, and the first
//! rejection fails it. Resolved components are cached back into their
//! record, so a slot loads once per process.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::NavigationError;
use crate::guard::{NavigationGuard, NavigationResolver};
use crate::record::{ComponentLoader, RecordId, RecordTree, ViewComponent, ViewDefinition};

struct GateState {
	pending: Mutex<usize>,
	resolver: Mutex<Option<NavigationResolver>>,
}

/// Delivery handle passed to a component loader.
///
/// `resolve` and `reject` are jointly idempotent per sink: the first
/// call wins, later calls on this sink are no-ops. Clones share the
/// spent flag.
#[derive(Clone)]
pub struct ComponentSink {
	gate: Arc<GateState>,
	tree: Arc<RecordTree>,
	record: RecordId,
	slot: String,
	spent: Arc<AtomicBool>,
}

impl ComponentSink {
	/// Delivers the loaded component.
	///
	/// Caches it into the owning record, then lets the transition
	/// proceed once every sibling loader has also delivered.
	pub fn resolve(&self, component: ViewComponent) {
		if self.spent.swap(true, Ordering::SeqCst) {
			return;
		}

		self.tree
			.record(self.record)
			.set_resolved(&self.slot, component);

		let done = {
			let mut pending = self.gate.pending.lock();
			*pending -= 1;
			*pending == 0
		};
		if done {
			if let Some(resolver) = self.gate.resolver.lock().take() {
				resolver.proceed();
			}
		}
	}

	/// Fails the load; the transition errors out.
	pub fn reject(&self, reason: impl Into<String>) {
		if self.spent.swap(true, Ordering::SeqCst) {
			return;
		}

		let reason = reason.into();
		tracing::warn!(slot = %self.slot, "failed to resolve async component: {reason}");
		if let Some(resolver) = self.gate.resolver.lock().take() {
			resolver.error(NavigationError::ComponentLoad {
				slot: self.slot.clone(),
				reason,
			});
		}
	}
}

/// A guard that holds the transition until all loader slots of the
/// activated records have resolved.
///
/// Proceeds immediately when none of them has a loader.
pub fn resolve_async_components(tree: Arc<RecordTree>, activated: Vec<RecordId>) -> NavigationGuard {
	Arc::new(move |_to, _from, resolver| {
		let mut loaders: Vec<(RecordId, String, ComponentLoader)> = Vec::new();
		for &id in &activated {
			for (slot, definition) in tree.record(id).components() {
				if let ViewDefinition::Loader(loader) = definition {
					loaders.push((id, slot, loader));
				}
			}
		}

		if loaders.is_empty() {
			resolver.proceed();
			return Ok(());
		}

		// count is preset so a synchronous resolve cannot hit zero while
		// later loaders are still being invoked
		let gate = Arc::new(GateState {
			pending: Mutex::new(loaders.len()),
			resolver: Mutex::new(Some(resolver)),
		});

		for (record, slot, loader) in loaders {
			let sink = ComponentSink {
				gate: gate.clone(),
				tree: tree.clone(),
				record,
				slot,
				spent: Arc::new(AtomicBool::new(false)),
			};
			loader(sink);
		}

		Ok(())
	})
}
