//! The top-level route table a dispatcher resolves against.

use std::fmt;

use crate::destination::DestinationInfo;
use crate::route::{RouteMatch, RoutesToHandler};

/// The ordered, top-level route table a dispatcher resolves against.
///
/// Declaration order is significant: [`resolve`](Self::resolve) returns the
/// first entry that matches. The table is immutable once handed to a
/// dispatcher and is shared between requests.
pub struct RouteTable<H> {
    routes: Vec<Box<dyn RoutesToHandler<H>>>,
}

impl<H> RouteTable<H> {
    #[must_use]
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Appends an entry and returns the table for chaining.
    #[must_use]
    pub fn route(mut self, route: impl RoutesToHandler<H> + 'static) -> Self {
        self.routes.push(Box::new(route));
        self
    }

    pub fn push(&mut self, route: impl RoutesToHandler<H> + 'static) {
        self.routes.push(Box::new(route));
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

impl<H: Send + Sync> RouteTable<H> {
    /// Resolves `destination` against the entries in declaration order.
    #[must_use]
    pub fn resolve(&self, destination: &DestinationInfo) -> Option<RouteMatch<H>> {
        self.routes
            .iter()
            .find_map(|route| route.match_destination(destination))
    }

    /// Resolves `destination` to the first entry whose handler `accepts`.
    ///
    /// Entries that match the URI but whose handler is rejected are skipped,
    /// so two routes may share a URI and differ only in the methods they
    /// serve.
    #[must_use]
    pub fn resolve_accepting(
        &self,
        destination: &DestinationInfo,
        accepts: &dyn Fn(&H) -> bool,
    ) -> Option<RouteMatch<H>> {
        self.routes
            .iter()
            .find_map(|route| route.match_destination_accepting(destination, accepts))
    }

    /// Every handler reachable for `uri` across all entries.
    #[must_use]
    pub fn handlers_for_uri(&self, uri: &str) -> Vec<H> {
        self.routes
            .iter()
            .flat_map(|route| route.handlers_for_uri(uri))
            .collect()
    }
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for RouteTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes.len())
            .finish()
    }
}
