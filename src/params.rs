//! Named-parameter interpolation for route path patterns.
//!
//! Patterns use `:name` segments (`/user/:id`), with `?` marking an
//! optional segment (`/user/:id?`). Compilation results are cached per
//! unique pattern string: patterns repeat heavily across navigations.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::location::Params;

// Pattern compilation cache, append-only.
static COMPILE_CACHE: Lazy<Mutex<HashMap<String, Arc<CompiledPattern>>>> =
	Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug)]
enum Token {
	Fixed(String),
	Param { name: String, optional: bool },
}

/// A path pattern broken into fixed and parameter segments.
#[derive(Debug)]
struct CompiledPattern {
	tokens: Vec<Token>,
	absolute: bool,
}

impl CompiledPattern {
	fn compile(pattern: &str) -> Self {
		let absolute = pattern.starts_with('/');
		let tokens = pattern
			.split('/')
			.filter(|segment| !segment.is_empty())
			.map(|segment| match segment.strip_prefix(':') {
				Some(param) => {
					let (name, optional) = match param.strip_suffix('?') {
						Some(name) => (name, true),
						None => (param, false),
					};
					Token::Param {
						name: name.to_string(),
						optional,
					}
				}
				None => Token::Fixed(segment.to_string()),
			})
			.collect();

		Self { tokens, absolute }
	}

	fn fill(&self, params: &Params) -> Result<String, String> {
		let mut segments = Vec::with_capacity(self.tokens.len());
		for token in &self.tokens {
			match token {
				Token::Fixed(segment) => segments.push(segment.as_str()),
				Token::Param { name, optional } => match params.get(name) {
					Some(value) => segments.push(value.as_str()),
					None if *optional => {}
					None => return Err(name.clone()),
				},
			}
		}

		let joined = segments.join("/");
		Ok(if self.absolute {
			format!("/{joined}")
		} else {
			joined
		})
	}
}

/// Interpolates `params` into `pattern`.
///
/// A missing required parameter is non-fatal: it emits a diagnostic
/// mentioning `context` and returns an empty string, which callers must
/// tolerate.
pub fn fill_params(pattern: &str, params: &Params, context: &str) -> String {
	let compiled = {
		let mut cache = COMPILE_CACHE.lock();
		cache
			.entry(pattern.to_string())
			.or_insert_with(|| Arc::new(CompiledPattern::compile(pattern)))
			.clone()
	};

	match compiled.fill(params) {
		Ok(path) => path,
		Err(name) => {
			tracing::warn!(pattern, "missing param for {context}: {name}");
			String::new()
		}
	}
}
