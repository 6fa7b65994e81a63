//! The route-matching seam.
//!
//! Matching a normalized location to records is host-specific policy, so
//! the engine only defines the trait. Implementations build their
//! [`Route`] snapshots with [`create_route`](crate::route::create_route);
//! a location nothing matches still yields a route, just with an empty
//! matched chain.

use crate::location::Location;
use crate::route::Route;

/// Maps a normalized location to a resolved route.
pub trait Matcher: Send + Sync {
	/// Resolves `location` against the route table.
	///
	/// `current` is the route the app is on, for matchers that support
	/// relative targets. Must always return a route; unmatched locations
	/// return one with an empty matched chain.
	fn match_location(&self, location: &Location, current: &Route) -> Route;
}
