//! The ordered route table: registration order is match order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::handler::Handler;
use crate::pattern::PathPattern;

/// One registered route: method, compiled pattern and the fully composed
/// handler chain built at registration time.
pub struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn new(method: Method, pattern: PathPattern, handler: Arc<dyn Handler>) -> Self {
        Self { method, pattern, handler }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Routes in registration order. Lookup walks the list and the first match
/// wins, so more specific literal routes must be registered before the
/// placeholder routes that would swallow them.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. A later route overlapping an earlier one of the same
    /// method is legal and stays reachable only for paths the earlier one
    /// does not take; the overlap is logged to help diagnose shadowing.
    pub fn register(&mut self, route: Route) {
        for earlier in &self.routes {
            if earlier.method == route.method && earlier.pattern.overlaps(route.pattern()) {
                debug!(
                    "{} {} overlaps earlier {}, which wins on shared paths",
                    route.method, route.pattern, earlier.pattern
                );
            }
        }
        self.routes.push(route);
    }

    /// The first route of `method` whose pattern matches `path`, with its
    /// placeholder captures.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<(&Route, HashMap<String, String>)> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| route.pattern.matches(path).map(|captures| (route, captures)))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
