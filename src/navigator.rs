//! The navigation engine itself.
//!
//! A [`Navigator`] owns the current route and runs transitions through
//! the guard pipeline. Transitions are single-flight: starting a new one
//! invalidates the pending token of the previous one, and the superseded
//! transition aborts at its next step. All callback dispatch happens
//! with no internal lock held, so guards may navigate re-entrantly.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::HistoryBackend;
use crate::error::NavigationError;
use crate::guard::{
	extract_enter_guards, extract_leave_guards, extract_update_guards, resolve_queue,
	run_guard_queue, AfterHook, Continuation, NavigationGuard, NavigationResolver, PostEnterQueue,
	QueueInvoke, QueuedEnterCallback, Resolution,
};
use crate::location::{normalize_location, Location, NormalizeOptions, RawLocation};
use crate::matcher::Matcher;
use crate::query::{stringify_query, SharedQueryParser, SharedQueryStringifier};
use crate::record::{InstanceRegistry, RecordTree};
use crate::resolver::resolve_async_components;
use crate::route::{is_same_route, Route, START};
use crate::scheduler::Scheduler;

/// Observer of committed routes; the host re-renders from it.
pub type RouteListener = Arc<dyn Fn(&Arc<Route>) + Send + Sync>;

/// Observer of navigation errors registered via [`Navigator::on_error`].
pub type ErrorListener = Arc<dyn Fn(&NavigationError) + Send + Sync>;

/// Per-navigation success callback.
pub type CompleteCallback = Box<dyn FnOnce(&Arc<Route>) + Send>;

/// Per-navigation failure callback; `None` is a silent abort.
pub type AbortCallback = Box<dyn FnOnce(Option<NavigationError>) + Send>;

/// Tuning knobs for a [`Navigator`].
pub struct NavigatorOptions {
	/// Custom query parser used during location normalization.
	pub parse_query: Option<SharedQueryParser>,
	/// Custom query stringifier used for [`Navigator::href`].
	pub stringify_query: Option<SharedQueryStringifier>,
	/// How often to re-check for a not-yet-mounted instance when
	/// flushing enter-guard callbacks.
	pub poll_interval: Duration,
}

impl Default for NavigatorOptions {
	fn default() -> Self {
		Self {
			parse_query: None,
			stringify_query: None,
			poll_interval: Duration::from_millis(16),
		}
	}
}

/// A resolved-but-not-navigated target, as returned by
/// [`Navigator::resolve`].
#[derive(Debug)]
pub struct ResolvedTarget {
	/// The normalized location.
	pub location: Location,
	/// The route it would commit.
	pub route: Arc<Route>,
	/// The serialized URL for the target.
	pub href: String,
}

enum UrlWrite {
	/// Push a new storage entry on commit.
	Push,
	/// Replace the current storage entry on commit.
	Replace,
	/// The storage already moved; just re-sync to the canonical URL.
	Sync,
}

struct NavigatorInner {
	matcher: Arc<dyn Matcher>,
	tree: Arc<RecordTree>,
	registry: Arc<InstanceRegistry>,
	backend: Arc<dyn HistoryBackend>,
	scheduler: Arc<dyn Scheduler>,
	options: NavigatorOptions,
	current: Mutex<Arc<Route>>,
	// token of the in-flight transition; a new transition overwrites it
	// and the superseded one aborts at its next step
	pending: Mutex<Option<u64>>,
	next_token: AtomicU64,
	ready: AtomicBool,
	listener: Mutex<Option<RouteListener>>,
	before_hooks: RwLock<Vec<NavigationGuard>>,
	resolve_hooks: RwLock<Vec<NavigationGuard>>,
	after_hooks: RwLock<Vec<AfterHook>>,
	ready_cbs: Mutex<Vec<CompleteCallback>>,
	ready_error_cbs: Mutex<Vec<Box<dyn FnOnce(&NavigationError) + Send>>>,
	error_listeners: RwLock<Vec<ErrorListener>>,
}

/// The navigation engine; cheap to clone, clones share state.
#[derive(Clone)]
pub struct Navigator {
	inner: Arc<NavigatorInner>,
}

impl Navigator {
	/// Builds a navigator over the given collaborators; the current
	/// route starts at the pre-navigation sentinel.
	pub fn new(
		matcher: Arc<dyn Matcher>,
		tree: Arc<RecordTree>,
		registry: Arc<InstanceRegistry>,
		backend: Arc<dyn HistoryBackend>,
		scheduler: Arc<dyn Scheduler>,
		options: NavigatorOptions,
	) -> Self {
		Self {
			inner: Arc::new(NavigatorInner {
				matcher,
				tree,
				registry,
				backend,
				scheduler,
				options,
				current: Mutex::new(START.clone()),
				pending: Mutex::new(None),
				next_token: AtomicU64::new(0),
				ready: AtomicBool::new(false),
				listener: Mutex::new(None),
				before_hooks: RwLock::new(Vec::new()),
				resolve_hooks: RwLock::new(Vec::new()),
				after_hooks: RwLock::new(Vec::new()),
				ready_cbs: Mutex::new(Vec::new()),
				ready_error_cbs: Mutex::new(Vec::new()),
				error_listeners: RwLock::new(Vec::new()),
			}),
		}
	}

	/// The committed route.
	pub fn current(&self) -> Arc<Route> {
		self.inner.current.lock().clone()
	}

	/// Whether an initial navigation has settled.
	pub fn is_ready(&self) -> bool {
		self.inner.ready.load(Ordering::SeqCst)
	}

	/// Sets the route listener the host re-renders from.
	pub fn listen(&self, listener: impl Fn(&Arc<Route>) + Send + Sync + 'static) {
		let mut slot = self.inner.listener.lock();
		if slot.is_some() {
			tracing::warn!("route listener replaced; only one listener is supported");
		}
		*slot = Some(Arc::new(listener));
	}

	/// Registers a global guard that runs before every transition.
	pub fn before_each(
		&self,
		guard: impl Fn(&Route, &Route, NavigationResolver) -> crate::error::GuardResult
			+ Send
			+ Sync
			+ 'static,
	) {
		self.inner.before_hooks.write().push(Arc::new(guard));
	}

	/// Registers a global guard that runs after async components have
	/// resolved, right before the transition is confirmed.
	pub fn before_resolve(
		&self,
		guard: impl Fn(&Route, &Route, NavigationResolver) -> crate::error::GuardResult
			+ Send
			+ Sync
			+ 'static,
	) {
		self.inner.resolve_hooks.write().push(Arc::new(guard));
	}

	/// Registers a post-commit hook.
	pub fn after_each(&self, hook: impl Fn(&Route, &Route) + Send + Sync + 'static) {
		self.inner.after_hooks.write().push(Arc::new(hook));
	}

	/// Runs `callback` once the initial navigation settles successfully;
	/// runs it immediately when it already has.
	pub fn on_ready(&self, callback: impl FnOnce(&Arc<Route>) + Send + 'static) {
		if self.is_ready() {
			callback(&self.current());
		} else {
			self.inner.ready_cbs.lock().push(Box::new(callback));
		}
	}

	/// Runs `callback` if the initial navigation settles with an error.
	pub fn on_ready_error(&self, callback: impl FnOnce(&NavigationError) + Send + 'static) {
		if !self.is_ready() {
			self.inner.ready_error_cbs.lock().push(Box::new(callback));
		}
	}

	/// Registers an observer for navigation errors.
	pub fn on_error(&self, listener: impl Fn(&NavigationError) + Send + Sync + 'static) {
		self.inner.error_listeners.write().push(Arc::new(listener));
	}

	/// Resolves a target without navigating to it.
	pub fn resolve(&self, raw: impl Into<RawLocation>) -> ResolvedTarget {
		let current = self.current();
		let location = self.normalize(raw.into(), &current);
		let route = Arc::new(self.inner.matcher.match_location(&location, &current));
		let href = self.href(&location);
		ResolvedTarget {
			location,
			route,
			href,
		}
	}

	/// Serializes a normalized location back into a URL.
	pub fn href(&self, location: &Location) -> String {
		let query = match &self.inner.options.stringify_query {
			Some(stringify) => stringify(&location.query),
			None => stringify_query(&location.query),
		};
		format!(
			"{}{query}{}",
			location.path.as_deref().unwrap_or("/"),
			location.hash
		)
	}

	/// Navigates to the URL the backend currently reports. Call once at
	/// startup.
	pub fn start(&self) {
		let target = self.inner.backend.current_location();
		self.transition_to(RawLocation::Path(target), UrlWrite::Sync, None, None);
	}

	/// Navigates to `raw`, pushing a new storage entry on commit.
	pub fn push(&self, raw: impl Into<RawLocation>) {
		self.push_with(raw, None, None);
	}

	/// [`Navigator::push`] with per-navigation callbacks.
	pub fn push_with(
		&self,
		raw: impl Into<RawLocation>,
		on_complete: Option<CompleteCallback>,
		on_abort: Option<AbortCallback>,
	) {
		self.transition_to(raw.into(), UrlWrite::Push, on_complete, on_abort);
	}

	/// Navigates to `raw`, replacing the current storage entry on
	/// commit.
	pub fn replace(&self, raw: impl Into<RawLocation>) {
		self.replace_with(raw, None, None);
	}

	/// [`Navigator::replace`] with per-navigation callbacks.
	pub fn replace_with(
		&self,
		raw: impl Into<RawLocation>,
		on_complete: Option<CompleteCallback>,
		on_abort: Option<AbortCallback>,
	) {
		self.transition_to(raw.into(), UrlWrite::Replace, on_complete, on_abort);
	}

	/// Moves through the storage stack, then navigates to wherever it
	/// landed.
	pub fn go(&self, delta: i64) {
		self.inner.backend.go(delta);
		let target = self.inner.backend.current_location();
		self.transition_to(RawLocation::Path(target), UrlWrite::Sync, None, None);
	}

	/// One entry back.
	pub fn back(&self) {
		self.go(-1);
	}

	/// One entry forward.
	pub fn forward(&self) {
		self.go(1);
	}

	fn normalize(&self, raw: RawLocation, current: &Route) -> Location {
		let options = NormalizeOptions {
			tree: Some(&self.inner.tree),
			parse_query: self.inner.options.parse_query.as_deref(),
		};
		normalize_location(raw, Some(current), false, &options)
	}

	fn transition_to(
		&self,
		raw: RawLocation,
		write: UrlWrite,
		on_complete: Option<CompleteCallback>,
		on_abort: Option<AbortCallback>,
	) {
		let current = self.current();
		let location = self.normalize(raw, &current);
		let route = Arc::new(self.inner.matcher.match_location(&location, &current));

		let complete_nav = self.clone();
		let complete_route = route.clone();
		let abort_nav = self.clone();

		self.confirm_transition(
			route,
			Box::new(move || {
				let this = complete_nav;
				let route = complete_route;
				this.update_route(route.clone());
				match write {
					UrlWrite::Push => this.inner.backend.push(&route.full_path),
					UrlWrite::Replace => this.inner.backend.replace(&route.full_path),
					UrlWrite::Sync => {}
				}
				if let Some(callback) = on_complete {
					callback(&route);
				}
				this.ensure_current_url(false);

				if !this.inner.ready.swap(true, Ordering::SeqCst) {
					let callbacks = std::mem::take(&mut *this.inner.ready_cbs.lock());
					for callback in callbacks {
						callback(&route);
					}
				}
			}),
			Box::new(move |error| {
				let this = abort_nav;
				if let Some(callback) = on_abort {
					callback(error.clone());
				}
				if let Some(error) = error {
					if !this.inner.ready.swap(true, Ordering::SeqCst) {
						let callbacks = std::mem::take(&mut *this.inner.ready_error_cbs.lock());
						for callback in callbacks {
							callback(&error);
						}
					}
				}
			}),
		);
	}

	fn confirm_transition(
		&self,
		route: Arc<Route>,
		on_complete: Box<dyn FnOnce() + Send>,
		on_abort: AbortCallback,
	) {
		let current = self.current();

		// the final abort callback fires at most once, no matter how
		// many paths reach it
		let abort: Arc<dyn Fn(Option<NavigationError>) + Send + Sync> = {
			let slot = Arc::new(Mutex::new(Some(on_abort)));
			let this = self.clone();
			Arc::new(move |error: Option<NavigationError>| {
				let callback = slot.lock().take();
				if let Some(callback) = callback {
					if let Some(error) = &error {
						let listeners: Vec<ErrorListener> =
							this.inner.error_listeners.read().clone();
						if listeners.is_empty() {
							tracing::error!("uncaught navigation error: {error}");
						}
						for listener in listeners {
							listener(error);
						}
					}
					callback(error);
				}
			})
		};

		// navigating to where we already are is a silent no-op; the URL
		// re-syncs to the committed route, not the aborted target
		if is_same_route(&route, Some(&current)) && route.matched.len() == current.matched.len() {
			self.inner.backend.ensure_url(&current.full_path, false);
			abort(None);
			return;
		}

		let diff = resolve_queue(&current.matched, &route.matched);
		let tree = self.inner.tree.clone();

		let mut queue: Vec<Option<NavigationGuard>> = Vec::new();
		queue.extend(extract_leave_guards(
			&tree,
			&self.inner.registry,
			&diff.deactivated,
		));
		queue.extend(self.inner.before_hooks.read().iter().cloned().map(Some));
		queue.extend(extract_update_guards(
			&tree,
			&self.inner.registry,
			&diff.updated,
		));
		for &id in &diff.activated {
			if let Some(guard) = tree.record(id).before_enter.clone() {
				queue.push(Some(guard));
			}
		}
		queue.push(Some(resolve_async_components(
			tree.clone(),
			diff.activated.clone(),
		)));

		let token = self.inner.next_token.fetch_add(1, Ordering::SeqCst);
		*self.inner.pending.lock() = Some(token);

		let to = route.clone();
		let from = current.clone();
		let invoke: QueueInvoke = {
			let this = self.clone();
			let abort = abort.clone();
			Arc::new(move |guard, step| {
				if *this.inner.pending.lock() != Some(token) {
					abort(None);
					return;
				}

				let continuation = Continuation::new({
					let this = this.clone();
					let abort = abort.clone();
					move |resolution| match resolution {
						Resolution::Proceed => step(),
						Resolution::Abort => {
							this.ensure_current_url(true);
							abort(None);
						}
						Resolution::Error(error) => {
							this.ensure_current_url(true);
							abort(Some(error));
						}
						Resolution::Redirect(target) => {
							abort(None);
							if target.is_replace() {
								this.replace(target);
							} else {
								this.push(target);
							}
						}
					}
				});
				let resolver = NavigationResolver::from_continuation(continuation.clone());
				if let Err(error) = guard(&to, &from, resolver) {
					continuation.resolve(Resolution::Error(error));
				}
			})
		};

		let this = self.clone();
		let activated = diff.activated;
		let phase_two_invoke = invoke.clone();
		let phase_two_abort = abort.clone();
		run_guard_queue(
			Arc::new(queue),
			invoke,
			Box::new(move || {
				if *this.inner.pending.lock() != Some(token) {
					phase_two_abort(None);
					return;
				}

				// enter guards see the components the async gate loaded
				let post_enter: PostEnterQueue = Arc::new(Mutex::new(Vec::new()));
				let mut queue = extract_enter_guards(&this.inner.tree, &activated, &post_enter);
				queue.extend(this.inner.resolve_hooks.read().iter().cloned().map(Some));

				let done_nav = this.clone();
				let done_abort = phase_two_abort.clone();
				run_guard_queue(
					Arc::new(queue),
					phase_two_invoke,
					Box::new(move || {
						let this = done_nav;
						if *this.inner.pending.lock() != Some(token) {
							done_abort(None);
							return;
						}
						*this.inner.pending.lock() = None;
						on_complete();

						let flush_nav = this.clone();
						this.inner.scheduler.defer(Box::new(move || {
							flush_nav.flush_post_enter(post_enter, route);
						}));
					}),
				);
			}),
		);
	}

	fn update_route(&self, route: Arc<Route>) {
		let previous = {
			let mut current = self.inner.current.lock();
			std::mem::replace(&mut *current, route.clone())
		};

		let listener = self.inner.listener.lock().clone();
		if let Some(listener) = listener {
			listener(&route);
		}

		let hooks: Vec<AfterHook> = self.inner.after_hooks.read().clone();
		for hook in hooks {
			hook(&route, &previous);
		}
	}

	fn ensure_current_url(&self, push: bool) {
		let current = self.current();
		self.inner.backend.ensure_url(&current.full_path, push);
	}

	fn flush_post_enter(&self, queue: PostEnterQueue, route: Arc<Route>) {
		let entries: Vec<QueuedEnterCallback> = std::mem::take(&mut *queue.lock());
		for entry in entries {
			self.deliver_enter_callback(entry, route.clone());
		}
	}

	// Retries until the slot's instance mounts; gives up once a later
	// navigation replaces `route`.
	fn deliver_enter_callback(&self, entry: QueuedEnterCallback, route: Arc<Route>) {
		let superseded = {
			let current = self.inner.current.lock();
			!Arc::ptr_eq(&current, &route)
		};
		if superseded {
			return;
		}

		if let Some(instance) = self.inner.registry.get(entry.record, &entry.slot) {
			(entry.callback)(&instance);
		} else {
			let this = self.clone();
			self.inner.scheduler.delay(
				self.inner.options.poll_interval,
				Box::new(move || this.deliver_enter_callback(entry, route)),
			);
		}
	}
}
