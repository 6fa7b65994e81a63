//! The immutable resolved-route snapshot.
//!
//! A [`Route`] is a value, never mutated after creation; the engine swaps
//! whole `Arc<Route>`s when navigation commits. The pre-navigation
//! sentinel [`START`] is a single shared allocation so identity checks
//! can use pointer equality.

use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::location::{Location, Params};
use crate::query::{stringify_query, Query, QueryStringifier};
use crate::record::{Meta, RecordId, RecordTree};

/// A fully resolved route: the canonical description of "where the app
/// is" (or is about to be).
#[derive(Debug, Clone, Default)]
pub struct Route {
	/// Name of the matched route, if it has one.
	pub name: Option<String>,
	/// Metadata of the matched leaf record.
	pub meta: Meta,
	/// Absolute path, without query string or hash.
	pub path: String,
	/// Hash fragment, `#`-prefixed or empty.
	pub hash: String,
	/// Parsed query mapping.
	pub query: Query,
	/// Extracted route parameters.
	pub params: Params,
	/// Path + serialized query + hash.
	pub full_path: String,
	/// Matched records, root first, leaf last.
	pub matched: Vec<RecordId>,
	/// Full path of the original target when this route was reached via
	/// a redirect.
	pub redirected_from: Option<String>,
}

/// The sentinel route the engine starts on before any navigation.
///
/// Compared by pointer identity, never structurally: a later navigation
/// to `/` builds a distinct allocation and is not the start route.
pub static START: Lazy<Arc<Route>> =
	Lazy::new(|| Arc::new(create_route(None, None, &Location::path("/"), None, None)));

fn full_path_of(location: &Location, stringify: Option<&QueryStringifier>) -> String {
	let path = location.path.as_deref().unwrap_or("/");
	let query = match stringify {
		Some(stringify) => stringify(&location.query),
		None => stringify_query(&location.query),
	};
	format!("{path}{query}{}", location.hash)
}

/// Builds a route snapshot from a matched record and a normalized
/// location.
///
/// With no record the route has an empty matched chain; it still carries
/// the location's path, query and hash so unmatched navigations remain
/// representable.
pub fn create_route(
	tree: Option<&RecordTree>,
	record: Option<RecordId>,
	location: &Location,
	redirected_from: Option<&Location>,
	stringify: Option<&QueryStringifier>,
) -> Route {
	let matched = match (tree, record) {
		(Some(tree), Some(record)) => tree.chain(record),
		_ => record.map(|id| vec![id]).unwrap_or_default(),
	};
	let meta = match (tree, record) {
		(Some(tree), Some(record)) => tree.record(record).meta.clone(),
		_ => Meta::new(),
	};
	// a path navigation to a named record still yields a named route
	let name = location.name.clone().or_else(|| match (tree, record) {
		(Some(tree), Some(record)) => tree.record(record).name.clone(),
		_ => None,
	});

	Route {
		name,
		meta,
		path: location.path.clone().unwrap_or_else(|| "/".to_string()),
		hash: location.hash.clone(),
		query: location.query.clone(),
		params: location.params.clone(),
		full_path: full_path_of(location, stringify),
		matched,
		redirected_from: redirected_from.map(|from| full_path_of(from, stringify)),
	}
}

fn strip_trailing_slash(path: &str) -> &str {
	path.strip_suffix('/').unwrap_or(path)
}

/// Whether two routes denote the same destination.
///
/// The start sentinel only equals itself, by identity. Otherwise routes
/// compare by path (modulo one trailing slash), hash and query, or — for
/// named targets without paths — by name, hash, query and params.
pub fn is_same_route(a: &Arc<Route>, b: Option<&Arc<Route>>) -> bool {
	let Some(b) = b else {
		return false;
	};
	// the sentinel only ever equals itself, on either side
	if Arc::ptr_eq(a, &START) || Arc::ptr_eq(b, &START) {
		return Arc::ptr_eq(a, b);
	}

	if !a.path.is_empty() && !b.path.is_empty() {
		strip_trailing_slash(&a.path) == strip_trailing_slash(&b.path)
			&& a.hash == b.hash
			&& a.query == b.query
	} else if a.name.is_some() && b.name.is_some() {
		a.name == b.name && a.hash == b.hash && a.query == b.query && a.params == b.params
	} else {
		false
	}
}

fn query_includes(current: &Query, target: &Query) -> bool {
	target.keys().all(|key| current.contains_key(key))
}

/// Whether `current` sits at or below `target`.
///
/// `target`'s path must prefix `current`'s (segment-safely, via trailing
/// slashes), its hash must be absent or equal, and its query keys must
/// all be present in `current`.
pub fn is_included_route(current: &Route, target: &Route) -> bool {
	let current_path = format!("{}/", strip_trailing_slash(&current.path));
	let target_path = format!("{}/", strip_trailing_slash(&target.path));

	current_path.starts_with(&target_path)
		&& (target.hash.is_empty() || current.hash == target.hash)
		&& query_includes(&current.query, &target.query)
}
