//! Path algebra for navigation targets.
//!
//! Pure helpers shared by the location normalizer: resolving a relative
//! path against a base, splitting a raw path into path/query/hash, and
//! collapsing duplicate separators.

/// A raw path split into its path, query-string and hash components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPath {
	/// The path with query string and hash removed.
	pub path: String,
	/// The query string, without the leading `?`.
	pub query: String,
	/// The hash, including the leading `#`.
	pub hash: String,
}

/// Resolves `relative` against `base` using file-path segment algebra.
///
/// A leading `/` makes the target absolute; a leading `?` or `#` appends
/// it to the base verbatim. Otherwise `..` pops a base segment, `.` is a
/// no-op and anything else pushes. The trailing base segment is dropped
/// unless `append` is set, and dropped regardless when the base already
/// ends in a separator.
pub fn resolve_path(relative: &str, base: &str, append: bool) -> String {
	match relative.chars().next() {
		Some('/') => return relative.to_string(),
		Some('?') | Some('#') => return format!("{base}{relative}"),
		_ => {}
	}

	let mut stack: Vec<&str> = base.split('/').collect();

	// remove trailing segment if:
	// - not appending
	// - appending to trailing slash (last segment is empty)
	if !append || stack.last().is_some_and(|s| s.is_empty()) {
		stack.pop();
	}

	for segment in relative.split('/') {
		if segment == ".." {
			stack.pop();
		} else if segment != "." {
			stack.push(segment);
		}
	}

	// ensure leading slash
	if stack.first() != Some(&"") {
		stack.insert(0, "");
	}

	stack.join("/")
}

/// Splits a raw path on the first `#`, then the first `?` of the remainder.
pub fn parse_path(path: &str) -> ParsedPath {
	let (rest, hash) = match path.find('#') {
		Some(i) => (&path[..i], &path[i..]),
		None => (path, ""),
	};
	let (path, query) = match rest.find('?') {
		Some(i) => (&rest[..i], &rest[i + 1..]),
		None => (rest, ""),
	};

	ParsedPath {
		path: path.to_string(),
		query: query.to_string(),
		hash: hash.to_string(),
	}
}

/// Collapses double slashes into single ones.
pub fn clean_path(path: &str) -> String {
	path.replace("//", "/")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	// the trailing base segment drops first, then `..`/`.` apply
	#[case("..", "/a/b/c", false, "/a")]
	#[case("./d", "/a/b/c", false, "/a/b/d")]
	#[case("/x", "/a/b", false, "/x")]
	#[case("e", "/a/b/", true, "/a/b/e")]
	#[case("e", "/a/b", true, "/a/b/e")]
	#[case("e", "/a/b", false, "/a/e")]
	#[case("../../x", "/a/b/c", false, "/x")]
	#[case("?k=1", "/a/b", false, "/a/b?k=1")]
	#[case("#frag", "/a/b", false, "/a/b#frag")]
	fn test_resolve_path(
		#[case] relative: &str,
		#[case] base: &str,
		#[case] append: bool,
		#[case] expected: &str,
	) {
		assert_eq!(resolve_path(relative, base, append), expected);
	}

	#[test]
	fn test_parse_path_full() {
		let parsed = parse_path("/a/b?k=1&j=2#frag");
		assert_eq!(parsed.path, "/a/b");
		assert_eq!(parsed.query, "k=1&j=2");
		assert_eq!(parsed.hash, "#frag");
	}

	#[test]
	fn test_parse_path_hash_before_query() {
		// everything after the first `#` belongs to the hash
		let parsed = parse_path("/a#frag?not-a-query");
		assert_eq!(parsed.path, "/a");
		assert_eq!(parsed.query, "");
		assert_eq!(parsed.hash, "#frag?not-a-query");
	}

	#[test]
	fn test_parse_path_plain() {
		let parsed = parse_path("/a/b");
		assert_eq!(parsed.path, "/a/b");
		assert_eq!(parsed.query, "");
		assert_eq!(parsed.hash, "");
	}

	#[test]
	fn test_clean_path() {
		assert_eq!(clean_path("//a//b"), "/a/b");
		assert_eq!(clean_path("/a/b"), "/a/b");
	}
}
