//! Switchyard Core: URI patterns, routes, route groups, and request data.

pub mod context;
pub mod destination;
pub mod group;
pub mod params;
pub mod pattern;
pub mod route;
pub mod table;

pub use context::{Principal, RequestContext};
pub use destination::{DestinationInfo, RequestMethod, Side, UnknownMethod};
pub use group::RouteGroup;
pub use params::{RequestData, RequestValue, UriParams};
pub use pattern::{Pattern, PatternError, PatternKind};
pub use route::{Route, RouteMatch, RoutesToHandler};
pub use table::RouteTable;

