//! Route groups: a subtree of routes scoped behind one outer pattern.

use std::fmt;

use crate::destination::DestinationInfo;
use crate::pattern::Pattern;
use crate::route::{RouteMatch, RoutesToHandler};

type BoxedRoute<H> = Box<dyn RoutesToHandler<H>>;

/// A composite route holding an ordered list of child routes and groups.
///
/// Matching is a two-step test:
///
/// 1. The group's own pattern must match the URI. If it does not, the
///    children are never evaluated, so one prefix test can rule out a whole
///    subtree.
/// 2. Children are tried in the order they were added and the first one that
///    matches wins; later children are never tried.
///
/// A group whose pattern matches but none of whose children match reports no
/// match. Because of the first-match-wins rule, a specific route must be
/// added before a broader catch-all it overlaps with.
///
/// ```
/// use switchyard_core::{DestinationInfo, Pattern, RequestMethod, Route, RouteGroup, RoutesToHandler};
///
/// let group = RouteGroup::new(Pattern::named_regex("/users(/.*)?").unwrap())
///     .add_route(Route::new(Pattern::literal("/users/me"), "me"))
///     .add_route(Route::new(Pattern::named_regex(r"/users/(?P<id>\d+)").unwrap(), "by_id"));
///
/// let matched = group
///     .match_destination(&DestinationInfo::new(RequestMethod::Get, "/users/7"))
///     .unwrap();
/// assert_eq!(matched.handler, "by_id");
/// assert_eq!(matched.params.get("id"), Some("7"));
/// ```
pub struct RouteGroup<H> {
    pattern: Pattern,
    routes: Vec<BoxedRoute<H>>,
}

impl<H> RouteGroup<H> {
    /// Creates an empty group guarded by `pattern`.
    #[must_use]
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            routes: Vec::new(),
        }
    }

    /// Creates a group with an initial list of children.
    #[must_use]
    pub fn with_routes(pattern: Pattern, routes: Vec<BoxedRoute<H>>) -> Self {
        Self { pattern, routes }
    }

    /// Appends a child and returns the group for chaining.
    #[must_use]
    pub fn add_route(mut self, route: impl RoutesToHandler<H> + 'static) -> Self {
        self.routes.push(Box::new(route));
        self
    }

    #[must_use]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H: Send + Sync> RoutesToHandler<H> for RouteGroup<H> {
    fn match_destination(&self, destination: &DestinationInfo) -> Option<RouteMatch<H>> {
        if !self.pattern.matches(destination.uri()) {
            return None;
        }
        self.routes
            .iter()
            .find_map(|route| route.match_destination(destination))
    }

    fn match_destination_accepting(
        &self,
        destination: &DestinationInfo,
        accepts: &dyn Fn(&H) -> bool,
    ) -> Option<RouteMatch<H>> {
        if !self.pattern.matches(destination.uri()) {
            return None;
        }
        self.routes
            .iter()
            .find_map(|route| route.match_destination_accepting(destination, accepts))
    }

    fn handlers_for_uri(&self, uri: &str) -> Vec<H> {
        if !self.pattern.matches(uri) {
            return Vec::new();
        }
        self.routes
            .iter()
            .flat_map(|route| route.handlers_for_uri(uri))
            .collect()
    }
}

impl<H> fmt::Debug for RouteGroup<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGroup")
            .field("pattern", &self.pattern.source())
            .field("routes", &self.routes.len())
            .finish()
    }
}
