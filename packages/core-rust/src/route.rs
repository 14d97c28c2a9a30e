//! Routes: one pattern bound to one handler.

use crate::destination::DestinationInfo;
use crate::params::UriParams;
use crate::pattern::Pattern;

/// Result of a successful match: the resolved handler and the parameters the
/// matching pattern captured.
///
/// Returned by value from every match call, so nothing about one request's
/// match is stored on the route itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<H> {
    pub handler: H,
    pub params: UriParams,
}

/// Capability of resolving a destination to a handler.
///
/// Implemented by [`Route`] and [`RouteGroup`](crate::RouteGroup); groups hold
/// their children as `Box<dyn RoutesToHandler<H>>` so they nest freely.
/// Implementations must be pure with respect to `self`.
pub trait RoutesToHandler<H>: Send + Sync {
    /// Resolves `destination` to a handler, or `None` when nothing matches.
    fn match_destination(&self, destination: &DestinationInfo) -> Option<RouteMatch<H>>;

    /// Like [`match_destination`](Self::match_destination), but skips any
    /// candidate whose handler `accepts` rejects, so a later route for the
    /// same URI still gets its turn.
    ///
    /// Composites must override this to apply `accepts` per child.
    fn match_destination_accepting(
        &self,
        destination: &DestinationInfo,
        accepts: &dyn Fn(&H) -> bool,
    ) -> Option<RouteMatch<H>> {
        self.match_destination(destination)
            .filter(|matched| accepts(&matched.handler))
    }

    /// Every handler whose route matches `uri`, in declaration order.
    ///
    /// Unlike [`match_destination`](Self::match_destination) this does not
    /// stop at the first match; it is used to discover which methods a URI
    /// supports.
    fn handlers_for_uri(&self, uri: &str) -> Vec<H>;

    /// Convenience wrapper around [`match_destination`](Self::match_destination).
    fn matches(&self, destination: &DestinationInfo) -> bool {
        self.match_destination(destination).is_some()
    }
}

/// Binds one [`Pattern`] to one handler reference.
///
/// A bare route tests only the URI; filtering by method is up to the
/// dispatcher that owns the route table.
#[derive(Debug, Clone)]
pub struct Route<H> {
    pattern: Pattern,
    handler: H,
}

impl<H> Route<H> {
    #[must_use]
    pub fn new(pattern: Pattern, handler: H) -> Self {
        Self { pattern, handler }
    }

    #[must_use]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<H: Clone + Send + Sync> RoutesToHandler<H> for Route<H> {
    fn match_destination(&self, destination: &DestinationInfo) -> Option<RouteMatch<H>> {
        let params = self.pattern.match_uri(destination.uri())?;
        Some(RouteMatch {
            handler: self.handler.clone(),
            params,
        })
    }

    fn handlers_for_uri(&self, uri: &str) -> Vec<H> {
        if self.pattern.matches(uri) {
            vec![self.handler.clone()]
        } else {
            Vec::new()
        }
    }
}
