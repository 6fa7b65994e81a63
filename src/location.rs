//! Location normalization.
//!
//! A [`RawLocation`] is whatever the application hands the engine: a
//! bare path string or a structured [`Location`]. [`normalize_location`]
//! canonicalizes it into a [`Location`] with an absolute path, a parsed
//! query mapping and a `#`-prefixed hash, ready for the matcher.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::params::fill_params;
use crate::path::{parse_path, resolve_path};
use crate::query::{resolve_query, Query, QueryParser, QueryValue};
use crate::record::RecordTree;
use crate::route::Route;

/// Route parameters extracted from or interpolated into a path.
pub type Params = HashMap<String, String>;

/// A navigation target as requested by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawLocation {
	/// A bare path, possibly carrying a query string and hash.
	Path(String),
	/// A structured target.
	Location(Location),
}

impl From<&str> for RawLocation {
	fn from(path: &str) -> Self {
		Self::Path(path.to_string())
	}
}

impl From<String> for RawLocation {
	fn from(path: String) -> Self {
		Self::Path(path)
	}
}

impl From<Location> for RawLocation {
	fn from(location: Location) -> Self {
		Self::Location(location)
	}
}

impl RawLocation {
	/// Whether this target asks for replace-mode URL storage.
	pub fn is_replace(&self) -> bool {
		matches!(self, Self::Location(location) if location.replace)
	}
}

/// A canonical navigation target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
	/// Named-route target.
	pub name: Option<String>,
	/// Path target; absolute once normalized.
	pub path: Option<String>,
	/// Explicit query mapping, merged over any query string in `path`.
	pub query: Query,
	/// Hash fragment; `#`-prefixed once normalized, empty when absent.
	pub hash: String,
	/// Route parameters.
	pub params: Params,
	/// Resolve the path relative to the full current path instead of
	/// its parent.
	pub append: bool,
	/// Ask the URL storage to replace the current entry instead of
	/// pushing a new one.
	pub replace: bool,
	/// Set once this location has passed through the normalizer.
	pub normalized: bool,
}

impl Location {
	/// A location targeting `path`.
	pub fn path(path: impl Into<String>) -> Self {
		Self {
			path: Some(path.into()),
			..Self::default()
		}
	}

	/// A location targeting the route named `name`.
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			..Self::default()
		}
	}

	/// Adds a query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
		self.query.insert(key.into(), value.into());
		self
	}

	/// Adds a route parameter.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.insert(key.into(), value.into());
		self
	}

	/// Sets the hash fragment.
	pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
		self.hash = hash.into();
		self
	}

	/// Requests replace-mode URL storage.
	pub fn with_replace(mut self) -> Self {
		self.replace = true;
		self
	}

	/// Resolves relative to the full current path.
	pub fn appended(mut self) -> Self {
		self.append = true;
		self
	}
}

/// Collaborators the normalizer may consult.
#[derive(Default)]
pub struct NormalizeOptions<'a> {
	/// Record tree, for interpolating the last matched record's pattern
	/// during relative-by-params navigation.
	pub tree: Option<&'a RecordTree>,
	/// Custom query parser.
	pub parse_query: Option<&'a QueryParser>,
}

/// Canonicalizes a raw navigation target.
///
/// Idempotent: a location that already carries a name or the
/// `normalized` flag is returned unchanged.
pub fn normalize_location(
	raw: RawLocation,
	current: Option<&Route>,
	append: bool,
	options: &NormalizeOptions<'_>,
) -> Location {
	let next = match raw {
		RawLocation::Path(path) => Location::path(path),
		RawLocation::Location(location) => location,
	};
	if next.name.is_some() || next.normalized {
		return next;
	}

	// relative params: no path, but params and a current route to
	// resolve them against
	if next.path.is_none() && !next.params.is_empty() {
		if let Some(current) = current {
			let mut next = next;
			next.normalized = true;

			let mut params = current.params.clone();
			params.extend(next.params.clone());

			if let Some(name) = &current.name {
				next.name = Some(name.clone());
				next.params = params;
			} else if let (Some(tree), Some(&record)) = (options.tree, current.matched.last()) {
				let pattern = &tree.record(record).path;
				let context = format!("path {}", current.path);
				next.path = Some(fill_params(pattern, &params, &context));
			} else {
				tracing::warn!("relative params navigation requires a current route");
			}
			return next;
		}
		tracing::warn!("relative params navigation requires a current route");
	}

	let parsed = parse_path(next.path.as_deref().unwrap_or(""));
	let base_path = current.map(|route| route.path.as_str()).unwrap_or("/");
	let path = if parsed.path.is_empty() {
		base_path.to_string()
	} else {
		resolve_path(&parsed.path, base_path, append || next.append)
	};

	let query = resolve_query(Some(&parsed.query), &next.query, options.parse_query);

	let mut hash = if next.hash.is_empty() {
		parsed.hash
	} else {
		next.hash
	};
	if !hash.is_empty() && !hash.starts_with('#') {
		hash = format!("#{hash}");
	}

	Location {
		name: None,
		path: Some(path),
		query,
		hash,
		params: Params::new(),
		append: false,
		replace: next.replace,
		normalized: true,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::query::QueryValue;
	use crate::record::RecordBuilder;
	use crate::route::create_route;

	fn current_route(path: &str) -> Route {
		create_route(None, None, &Location::path(path), None, None)
	}

	#[test]
	fn test_normalize_is_idempotent() {
		let current = current_route("/a/b");
		let options = NormalizeOptions::default();
		let once = normalize_location(
			RawLocation::from("../c?x=1#frag"),
			Some(&current),
			false,
			&options,
		);
		let twice = normalize_location(
			RawLocation::Location(once.clone()),
			Some(&current),
			false,
			&options,
		);
		assert_eq!(once, twice);
	}

	#[test]
	fn test_normalize_splits_path_query_hash() {
		let normalized = normalize_location(
			RawLocation::from("/a?x=1#frag"),
			None,
			false,
			&NormalizeOptions::default(),
		);
		assert_eq!(normalized.path.as_deref(), Some("/a"));
		assert_eq!(normalized.query.get("x"), Some(&QueryValue::text("1")));
		assert_eq!(normalized.hash, "#frag");
		assert!(normalized.normalized);
	}

	#[test]
	fn test_normalize_resolves_relative_path() {
		let current = current_route("/a/b/c");
		let normalized = normalize_location(
			RawLocation::from("../d"),
			Some(&current),
			false,
			&NormalizeOptions::default(),
		);
		assert_eq!(normalized.path.as_deref(), Some("/a/d"));
	}

	#[test]
	fn test_normalize_named_location_passes_through() {
		let location = Location::named("user").with_param("id", "1");
		let normalized = normalize_location(
			RawLocation::Location(location.clone()),
			None,
			false,
			&NormalizeOptions::default(),
		);
		assert_eq!(normalized, location);
	}

	#[test]
	fn test_normalize_explicit_query_wins() {
		let location = Location::path("/a?x=1").with_query("x", "2");
		let normalized = normalize_location(
			RawLocation::Location(location),
			None,
			false,
			&NormalizeOptions::default(),
		);
		assert_eq!(normalized.query.get("x"), Some(&QueryValue::text("2")));
	}

	#[test]
	fn test_normalize_prefixes_hash() {
		let location = Location::path("/a").with_hash("frag");
		let normalized = normalize_location(
			RawLocation::Location(location),
			None,
			false,
			&NormalizeOptions::default(),
		);
		assert_eq!(normalized.hash, "#frag");
	}

	#[test]
	fn test_relative_params_inherits_name() {
		let mut current = current_route("/user/1");
		current.name = Some("user".to_string());
		current.params.insert("id".to_string(), "1".to_string());

		let target = Location {
			params: Params::from([("id".to_string(), "2".to_string())]),
			..Location::default()
		};
		let normalized = normalize_location(
			RawLocation::Location(target),
			Some(&current),
			false,
			&NormalizeOptions::default(),
		);
		assert_eq!(normalized.name.as_deref(), Some("user"));
		assert_eq!(normalized.params.get("id").map(String::as_str), Some("2"));
	}

	#[test]
	fn test_relative_params_interpolates_matched_pattern() {
		let mut tree = RecordTree::new();
		let record = tree.insert(RecordBuilder::new("/user/:id"));

		let mut current = current_route("/user/1");
		current.matched = vec![record];
		current.params.insert("id".to_string(), "1".to_string());

		let target = Location {
			params: Params::from([("id".to_string(), "2".to_string())]),
			..Location::default()
		};
		let options = NormalizeOptions {
			tree: Some(&tree),
			parse_query: None,
		};
		let normalized = normalize_location(
			RawLocation::Location(target),
			Some(&current),
			false,
			&options,
		);
		assert_eq!(normalized.path.as_deref(), Some("/user/2"));
	}

	#[test]
	fn test_empty_path_falls_back_to_current() {
		let current = current_route("/a/b");
		let normalized = normalize_location(
			RawLocation::from("?x=1"),
			Some(&current),
			false,
			&NormalizeOptions::default(),
		);
		// a bare query string keeps the current path
		assert_eq!(normalized.path.as_deref(), Some("/a/b"));
	}
}
