//! Error types for navigation.
//!
//! Aborted navigations are not errors: a duplicate navigation, a guard
//! vetoing with [`NavigationResolver::abort`](crate::guard::NavigationResolver::abort)
//! or a mid-pipeline redirect all deliver `None` to the abort handler.
//! `NavigationError` covers the failures that are reported to error
//! observers and keep the engine usable afterwards.

use thiserror::Error;

/// Error raised while confirming a navigation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
	/// A guard failed or resolved the transition with an error.
	#[error("navigation guard error: {0}")]
	Guard(String),

	/// An async view component failed to load.
	#[error("failed to resolve async component {slot}: {reason}")]
	ComponentLoad {
		/// The view slot whose loader failed.
		slot: String,
		/// Failure reason reported by the loader.
		reason: String,
	},
}

/// Result type returned by navigation guards.
///
/// Returning `Err` from a guard is equivalent to resolving it with an
/// error: the transition aborts and the error reaches every registered
/// error observer.
pub type GuardResult = Result<(), NavigationError>;
