//! Shared fixtures for the navigation tests.

use parking_lot::Mutex;
use std::sync::Arc;

use wayfarer::{
	create_route, InstanceGuard, InstanceRegistry, Location, ManualScheduler, Matcher,
	MemoryHistory, NavigationGuard, Navigator, NavigatorOptions, RecordId, RecordTree, Route,
};

/// Chronological record of what fired during a transition.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
	Arc::new(Mutex::new(Vec::new()))
}

pub fn log(events: &EventLog, tag: impl Into<String>) {
	events.lock().push(tag.into());
}

pub fn taken(events: &EventLog) -> Vec<String> {
	std::mem::take(&mut *events.lock())
}

/// Exact-path matcher over a record tree; no params, no ranking.
pub struct PathMatcher {
	pub tree: Arc<RecordTree>,
}

impl Matcher for PathMatcher {
	fn match_location(&self, location: &Location, _current: &Route) -> Route {
		let path = location.path.as_deref().unwrap_or("/");
		let record = (0..self.tree.len())
			.map(RecordId)
			.find(|&id| self.tree.record(id).path == path);
		create_route(Some(&self.tree), record, location, None, None)
	}
}

pub struct TestBed {
	pub navigator: Navigator,
	pub tree: Arc<RecordTree>,
	pub registry: Arc<InstanceRegistry>,
	pub backend: Arc<MemoryHistory>,
	pub scheduler: Arc<ManualScheduler>,
}

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

pub fn bed(tree: RecordTree) -> TestBed {
	init_tracing();
	let tree = Arc::new(tree);
	let registry = Arc::new(InstanceRegistry::new());
	let backend = Arc::new(MemoryHistory::default());
	let scheduler = Arc::new(ManualScheduler::new());
	let navigator = Navigator::new(
		Arc::new(PathMatcher { tree: tree.clone() }),
		tree.clone(),
		registry.clone(),
		backend.clone(),
		scheduler.clone(),
		NavigatorOptions::default(),
	);
	TestBed {
		navigator,
		tree,
		registry,
		backend,
		scheduler,
	}
}

/// A navigation guard that logs `tag` and proceeds.
pub fn logging_guard(events: &EventLog, tag: &'static str) -> NavigationGuard {
	let events = events.clone();
	Arc::new(move |_to, _from, resolver| {
		log(&events, tag);
		resolver.proceed();
		Ok(())
	})
}

/// An instance-bound guard that logs `tag` and proceeds.
pub fn logging_instance_guard(events: &EventLog, tag: &'static str) -> InstanceGuard {
	let events = events.clone();
	Arc::new(move |_instance, _to, _from, resolver| {
		log(&events, tag);
		resolver.proceed();
		Ok(())
	})
}
