//! The static route-record tree and its view-component registry.
//!
//! Records form an arena-owned tree addressed by stable [`RecordId`]s;
//! parent links are ids, never owning pointers. Each record maps named
//! view slots to a [`ViewDefinition`] that is either an already resolved
//! component or a lazy loader — decided at registration time, never by
//! probing. Mounted instances live in a separate [`InstanceRegistry`]
//! written by the host framework's mount/unmount lifecycle; the engine
//! only reads it.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::guard::{EnterGuard, InstanceGuard, NavigationGuard};
use crate::resolver::ComponentSink;

/// Stable identifier of a record inside its [`RecordTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub usize);

/// Metadata bag attached to records and routes.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// An opaque host-framework view component.
///
/// The engine never inspects components; hosts downcast on their side.
#[derive(Clone)]
pub struct Component(Arc<dyn Any + Send + Sync>);

impl Component {
	/// Wraps a host component value.
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self(Arc::new(value))
	}

	/// Downcasts back to the host type.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.downcast_ref()
	}
}

impl fmt::Debug for Component {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Component(..)")
	}
}

/// An opaque mounted view instance.
#[derive(Clone)]
pub struct ViewInstance(Arc<dyn Any + Send + Sync>);

impl ViewInstance {
	/// Wraps a host instance value.
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self(Arc::new(value))
	}

	/// Downcasts back to the host type.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.downcast_ref()
	}
}

impl fmt::Debug for ViewInstance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("ViewInstance(..)")
	}
}

/// Component-owned navigation hooks.
#[derive(Clone, Default)]
pub struct ViewHooks {
	/// Runs before the component is mounted; has no instance yet, but
	/// may queue a callback that fires against the mounted instance
	/// after commit.
	pub before_enter: Option<EnterGuard>,
	/// Runs when the route changes but the component stays mounted.
	pub before_update: Option<InstanceGuard>,
	/// Runs before the component is left; skipped when the slot is not
	/// mounted.
	pub before_leave: Option<InstanceGuard>,
}

/// A resolved view component together with its navigation hooks.
#[derive(Clone)]
pub struct ViewComponent {
	/// The component itself.
	pub component: Component,
	/// Hooks owned by the component.
	pub hooks: ViewHooks,
}

impl ViewComponent {
	/// A component without hooks.
	pub fn new(component: Component) -> Self {
		Self {
			component,
			hooks: ViewHooks::default(),
		}
	}

	/// A component with hooks.
	pub fn with_hooks(component: Component, hooks: ViewHooks) -> Self {
		Self { component, hooks }
	}
}

/// A lazy view-component loader.
///
/// Invoked with a [`ComponentSink`] whose `resolve`/`reject` are each
/// idempotent; the loader may call either synchronously or hand the sink
/// to a future.
pub type ComponentLoader = Arc<dyn Fn(ComponentSink) + Send + Sync>;

/// How a view slot obtains its component.
#[derive(Clone)]
pub enum ViewDefinition {
	/// The component is available now.
	Resolved(ViewComponent),
	/// The component loads lazily; navigation waits for it.
	Loader(ComponentLoader),
}

impl ViewDefinition {
	/// Shorthand for a resolved component without hooks.
	pub fn component(component: Component) -> Self {
		Self::Resolved(ViewComponent::new(component))
	}
}

impl fmt::Debug for ViewDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Resolved(_) => f.write_str("Resolved(..)"),
			Self::Loader(_) => f.write_str("Loader(..)"),
		}
	}
}

/// One node of the static route configuration tree.
pub struct RouteRecord {
	/// The record's id in its tree.
	pub id: RecordId,
	/// Path pattern, e.g. `/user/:id`.
	pub path: String,
	/// Optional route name.
	pub name: Option<String>,
	/// Parent record, if any.
	pub parent: Option<RecordId>,
	/// Static enter guard declared on the record itself.
	pub before_enter: Option<NavigationGuard>,
	/// Metadata bag.
	pub meta: Meta,
	// Written only to cache a loader's resolution.
	components: RwLock<IndexMap<String, ViewDefinition>>,
}

impl RouteRecord {
	/// Snapshot of the per-slot component definitions.
	pub fn components(&self) -> Vec<(String, ViewDefinition)> {
		self.components
			.read()
			.iter()
			.map(|(slot, def)| (slot.clone(), def.clone()))
			.collect()
	}

	/// The definition for one slot.
	pub fn component(&self, slot: &str) -> Option<ViewDefinition> {
		self.components.read().get(slot).cloned()
	}

	/// Caches a loader's resolution so the slot is resolved for reuse.
	pub fn set_resolved(&self, slot: &str, component: ViewComponent) {
		self.components
			.write()
			.insert(slot.to_string(), ViewDefinition::Resolved(component));
	}
}

impl fmt::Debug for RouteRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteRecord")
			.field("id", &self.id)
			.field("path", &self.path)
			.field("name", &self.name)
			.field("parent", &self.parent)
			.field("has_before_enter", &self.before_enter.is_some())
			.finish()
	}
}

/// Builder for a [`RouteRecord`]; the tree assigns the id on insert.
pub struct RecordBuilder {
	path: String,
	name: Option<String>,
	parent: Option<RecordId>,
	before_enter: Option<NavigationGuard>,
	meta: Meta,
	components: IndexMap<String, ViewDefinition>,
}

impl RecordBuilder {
	/// Starts a record for `path`.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			name: None,
			parent: None,
			before_enter: None,
			meta: Meta::new(),
			components: IndexMap::new(),
		}
	}

	/// Names the record.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Sets the parent record.
	pub fn with_parent(mut self, parent: RecordId) -> Self {
		self.parent = Some(parent);
		self
	}

	/// Declares a view slot.
	pub fn with_component(mut self, slot: impl Into<String>, definition: ViewDefinition) -> Self {
		self.components.insert(slot.into(), definition);
		self
	}

	/// Declares the record's static enter guard.
	pub fn with_before_enter(mut self, guard: NavigationGuard) -> Self {
		self.before_enter = Some(guard);
		self
	}

	/// Adds a metadata entry.
	pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.meta.insert(key.into(), value);
		self
	}
}

/// Arena owning the static route configuration tree.
#[derive(Debug, Default)]
pub struct RecordTree {
	records: Vec<RouteRecord>,
}

impl RecordTree {
	/// An empty tree.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts a record and returns its id.
	pub fn insert(&mut self, builder: RecordBuilder) -> RecordId {
		let id = RecordId(self.records.len());
		self.records.push(RouteRecord {
			id,
			path: builder.path,
			name: builder.name,
			parent: builder.parent,
			before_enter: builder.before_enter,
			meta: builder.meta,
			components: RwLock::new(builder.components),
		});
		id
	}

	/// Looks a record up by id.
	///
	/// # Panics
	///
	/// Panics if `id` was not issued by this tree.
	pub fn record(&self, id: RecordId) -> &RouteRecord {
		&self.records[id.0]
	}

	/// The root→leaf chain of records ending at `leaf`.
	pub fn chain(&self, leaf: RecordId) -> Vec<RecordId> {
		let mut chain = Vec::new();
		let mut cursor = Some(leaf);
		while let Some(id) = cursor {
			chain.push(id);
			cursor = self.record(id).parent;
		}
		chain.reverse();
		chain
	}

	/// Number of records in the tree.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Whether the tree has no records.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

/// Mounted view instances, keyed by `(record, slot)`.
///
/// Written by the host framework's mount/unmount lifecycle; the engine
/// only reads it when binding guards and flushing enter callbacks.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
	instances: RwLock<HashMap<(RecordId, String), ViewInstance>>,
}

impl InstanceRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a mounted instance for a slot.
	pub fn mount(&self, record: RecordId, slot: impl Into<String>, instance: ViewInstance) {
		self.instances
			.write()
			.insert((record, slot.into()), instance);
	}

	/// Removes the instance for a slot.
	pub fn unmount(&self, record: RecordId, slot: &str) {
		self.instances.write().remove(&(record, slot.to_string()));
	}

	/// The mounted instance for a slot, if any.
	pub fn get(&self, record: RecordId, slot: &str) -> Option<ViewInstance> {
		self.instances
			.read()
			.get(&(record, slot.to_string()))
			.cloned()
	}
}
