//! Query-string codec.
//!
//! Query mappings are insertion-ordered and distinguish three scalar
//! shapes: a key with a value, a bare key (`?flag`), and a key that must
//! be omitted from serialization entirely. Repeated keys accumulate
//! positionally into a list.
//!
//! Percent-encoding is stricter than the default form encoding: the
//! reserved marks `!'()*` are escaped as well, while literal commas are
//! left unescaped.

use indexmap::map::Entry;
use indexmap::IndexMap;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// An insertion-ordered query mapping.
pub type Query = IndexMap<String, QueryValue>;

/// A pluggable query-string parser.
pub type QueryParser = dyn Fn(&str) -> Result<Query, QueryParseError> + Send + Sync;

/// A pluggable query stringifier.
pub type QueryStringifier = dyn Fn(&Query) -> String + Send + Sync;

/// Shared handle to a pluggable parser.
pub type SharedQueryParser = Arc<QueryParser>;

/// Shared handle to a pluggable stringifier.
pub type SharedQueryStringifier = Arc<QueryStringifier>;

/// Error raised by [`parse_query`] on undecodable input.
///
/// Never escapes the codec boundary: [`resolve_query`] degrades to an
/// empty mapping and a diagnostic instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid percent-encoding in {component}: {source}")]
pub struct QueryParseError {
	/// Which part of the pair failed to decode.
	pub component: &'static str,
	#[source]
	source: std::str::Utf8Error,
}

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryValue {
	/// Key present without `=`; serializes as a bare key.
	Flag,
	/// Key omitted from serialization entirely.
	Skip,
	/// Ordinary `key=value` text.
	Text(String),
	/// Positionally accumulated values for a repeated key.
	List(Vec<QueryValue>),
}

impl QueryValue {
	/// Convenience constructor for a text value.
	pub fn text(value: impl Into<String>) -> Self {
		Self::Text(value.into())
	}
}

impl From<&str> for QueryValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for QueryValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

// Escape everything except unreserved characters and the comma.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'~')
	.remove(b',');

fn encode(value: &str) -> String {
	utf8_percent_encode(value, QUERY_ENCODE).to_string()
}

fn decode(value: &str, component: &'static str) -> Result<String, QueryParseError> {
	percent_decode_str(value)
		.decode_utf8()
		.map(|cow| cow.into_owned())
		.map_err(|source| QueryParseError { component, source })
}

/// Parses a raw query string into an ordered mapping.
///
/// Splits on `&`; each pair splits on the first `=` only, so embedded
/// `=` in values survives. A key without `=` yields [`QueryValue::Flag`];
/// repeated keys grow into a [`QueryValue::List`]. `+` decodes as a
/// space.
pub fn parse_query(query: &str) -> Result<Query, QueryParseError> {
	let mut res = Query::new();

	let query = query.trim();
	let query = query
		.strip_prefix(['?', '#', '&'])
		.unwrap_or(query);
	if query.is_empty() {
		return Ok(res);
	}

	for param in query.split('&') {
		let param = param.replace('+', " ");
		let mut parts = param.split('=');
		let key = decode(parts.next().unwrap_or(""), "key")?;
		let rest: Vec<&str> = parts.collect();
		let val = if rest.is_empty() {
			QueryValue::Flag
		} else {
			QueryValue::Text(decode(&rest.join("="), "value")?)
		};

		match res.entry(key) {
			Entry::Vacant(entry) => {
				entry.insert(val);
			}
			Entry::Occupied(mut entry) => {
				if let QueryValue::List(list) = entry.get_mut() {
					list.push(val);
				} else {
					let previous = std::mem::replace(entry.get_mut(), QueryValue::Flag);
					entry.insert(QueryValue::List(vec![previous, val]));
				}
			}
		}
	}

	Ok(res)
}

/// Parses `query` (with an optional custom parser) and merges `extra`
/// over it, the explicit mapping winning on key collision.
///
/// Malformed input degrades to an empty mapping plus a diagnostic; it
/// never propagates past this boundary.
pub fn resolve_query(query: Option<&str>, extra: &Query, parser: Option<&QueryParser>) -> Query {
	let raw = query.unwrap_or("");
	let parsed = match parser {
		Some(parse) => parse(raw),
		None => parse_query(raw),
	};
	let mut parsed = parsed.unwrap_or_else(|err| {
		tracing::warn!(query = raw, "malformed query string: {err}");
		Query::new()
	});
	for (key, value) in extra {
		parsed.insert(key.clone(), value.clone());
	}
	parsed
}

/// Serializes a query mapping, prefixing a non-empty result with `?`.
///
/// [`QueryValue::Flag`] serializes as a bare key, [`QueryValue::Skip`]
/// omits the key, and lists explode into repeated pairs in order.
pub fn stringify_query(query: &Query) -> String {
	let res = query
		.iter()
		.filter_map(|(key, value)| stringify_pair(key, value))
		.filter(|part| !part.is_empty())
		.collect::<Vec<_>>()
		.join("&");

	if res.is_empty() {
		String::new()
	} else {
		format!("?{res}")
	}
}

fn stringify_pair(key: &str, value: &QueryValue) -> Option<String> {
	match value {
		QueryValue::Skip => None,
		QueryValue::Flag => Some(encode(key)),
		QueryValue::Text(text) => Some(format!("{}={}", encode(key), encode(text))),
		QueryValue::List(values) => Some(
			values
				.iter()
				.filter_map(|value| match value {
					// nested lists cannot round-trip; treat like omitted keys
					QueryValue::Skip | QueryValue::List(_) => None,
					QueryValue::Flag => Some(encode(key)),
					QueryValue::Text(text) => {
						Some(format!("{}={}", encode(key), encode(text)))
					}
				})
				.collect::<Vec<_>>()
				.join("&"),
		),
	}
}
