//! Client-side routing engine for host UI frameworks.
//!
//! `wayfarer` turns navigation requests into committed routes: it
//! normalizes a raw target against the current route, asks a host
//! [`Matcher`] to resolve it, runs the guard pipeline (leave guards,
//! global guards, update guards, record guards, lazy component loading,
//! enter guards, resolve guards), and finally swaps the current route
//! and syncs the URL storage. Transitions are single-flight; a newer
//! navigation silently supersedes an older one at its next step.
//!
//! The engine is deliberately host-agnostic: view components and
//! mounted instances are opaque handles, URL storage sits behind
//! [`HistoryBackend`], and deferred work behind [`Scheduler`], so it
//! runs the same under a real event loop and in deterministic tests.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use wayfarer::{
//!     create_route, InstanceRegistry, Location, ManualScheduler, Matcher, MemoryHistory,
//!     Navigator, NavigatorOptions, RecordBuilder, RecordId, RecordTree, Route,
//! };
//!
//! struct PathMatcher(Arc<RecordTree>);
//!
//! impl Matcher for PathMatcher {
//!     fn match_location(&self, location: &Location, _current: &Route) -> Route {
//!         let path = location.path.as_deref().unwrap_or("/");
//!         let record = (0..self.0.len())
//!             .map(RecordId)
//!             .find(|&id| self.0.record(id).path == path);
//!         create_route(Some(&self.0), record, location, None, None)
//!     }
//! }
//!
//! let mut tree = RecordTree::new();
//! tree.insert(RecordBuilder::new("/"));
//! tree.insert(RecordBuilder::new("/about"));
//! let tree = Arc::new(tree);
//!
//! let navigator = Navigator::new(
//!     Arc::new(PathMatcher(tree.clone())),
//!     tree,
//!     Arc::new(InstanceRegistry::new()),
//!     Arc::new(MemoryHistory::default()),
//!     Arc::new(ManualScheduler::new()),
//!     NavigatorOptions::default(),
//! );
//!
//! navigator.start();
//! navigator.push("/about");
//! assert_eq!(navigator.current().path, "/about");
//! ```

pub mod backend;
pub mod error;
pub mod guard;
pub mod location;
pub mod matcher;
pub mod navigator;
pub mod params;
pub mod path;
pub mod query;
pub mod record;
pub mod resolver;
pub mod route;
pub mod scheduler;

pub use backend::{HistoryBackend, MemoryHistory};
pub use error::{GuardResult, NavigationError};
pub use guard::{
	AfterHook, Continuation, EnterGuard, EnterResolver, InstanceGuard, NavigationGuard,
	NavigationResolver, Resolution,
};
pub use location::{normalize_location, Location, NormalizeOptions, Params, RawLocation};
pub use matcher::Matcher;
pub use navigator::{
	AbortCallback, CompleteCallback, ErrorListener, Navigator, NavigatorOptions, ResolvedTarget,
	RouteListener,
};
pub use params::fill_params;
pub use path::{clean_path, parse_path, resolve_path, ParsedPath};
pub use query::{
	parse_query, stringify_query, Query, QueryParseError, QueryValue, SharedQueryParser,
	SharedQueryStringifier,
};
pub use record::{
	Component, ComponentLoader, InstanceRegistry, Meta, RecordBuilder, RecordId, RecordTree,
	RouteRecord, ViewComponent, ViewDefinition, ViewHooks, ViewInstance,
};
pub use resolver::{resolve_async_components, ComponentSink};
pub use route::{create_route, is_included_route, is_same_route, Route, START};
pub use scheduler::{ManualScheduler, Scheduler, Task};
