use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::context::ContextPool;
use crate::handler::{BoxedHandler, RequestHandler};
use crate::middleware::{Middleware, chain};
use crate::router::{PathRoutes, RouteEntry, Router, RouterBuildError, RouterConfig, RouterInner, normalize_path};

/// A handler bound to one method, plus the middlewares that wrap only this route.
pub struct RouteBuilder {
    method: Method,
    handler: BoxedHandler,
    handler_name: &'static str,
    middlewares: Vec<Middleware>,
}

impl RouteBuilder {
    fn new<H: RequestHandler + 'static>(method: Method, handler: H) -> Self {
        Self { method, handler: Arc::new(handler), handler_name: type_name::<H>(), middlewares: Vec::new() }
    }

    /// Adds a middleware; the first one added runs first.
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }
}

impl fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("method", &self.method)
            .field("handler", &self.handler_name)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

macro_rules! method_route {
    ($fn_name:ident, $method:ident) => {
        #[doc = concat!("Routes `", stringify!($method), "` requests to `handler`.")]
        pub fn $fn_name<H: RequestHandler + 'static>(handler: H) -> RouteBuilder {
            RouteBuilder::new(Method::$method, handler)
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
method_route!(connect, CONNECT);
method_route!(patch, PATCH);
method_route!(trace, TRACE);

/// Routes requests with an arbitrary method to `handler`.
pub fn method<H: RequestHandler + 'static>(method: Method, handler: H) -> RouteBuilder {
    RouteBuilder::new(method, handler)
}

/// A route waiting for [`RouterBuilder::build`], with the group middlewares collected so far,
/// outermost group first.
struct PendingRoute {
    path: String,
    route: RouteBuilder,
    group_layers: Vec<Middleware>,
}

/// Routes sharing a path prefix and a middleware list.
///
/// Group middlewares wrap every route of the group, including routes of nested groups, no
/// matter whether they were added before or after the routes.
pub struct GroupBuilder {
    prefix: String,
    middlewares: Vec<Middleware>,
    routes: Vec<PendingRoute>,
}

impl GroupBuilder {
    fn new(prefix: String) -> Self {
        Self { prefix, middlewares: Vec::new(), routes: Vec::new() }
    }

    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn route(mut self, path: impl Into<String>, route: RouteBuilder) -> Self {
        self.routes.push(PendingRoute { path: path.into(), route, group_layers: Vec::new() });
        self
    }

    /// Nests a group under this one; its prefix is appended to ours.
    pub fn group(mut self, prefix: impl Into<String>, f: impl FnOnce(GroupBuilder) -> GroupBuilder) -> Self {
        let child = f(GroupBuilder::new(prefix.into()));
        self.routes.extend(child.into_routes());
        self
    }

    fn into_routes(self) -> impl Iterator<Item = PendingRoute> {
        let Self { prefix, middlewares, routes } = self;
        routes.into_iter().map(move |mut pending| {
            pending.path = join_path(&prefix, &pending.path);
            let mut layers = middlewares.clone();
            layers.append(&mut pending.group_layers);
            pending.group_layers = layers;
            pending
        })
    }
}

impl fmt::Debug for GroupBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBuilder")
            .field("prefix", &self.prefix)
            .field("middlewares", &self.middlewares.len())
            .field("routes", &self.routes.len())
            .finish()
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    let prefix = if path.starts_with('/') { prefix.strip_suffix('/').unwrap_or(prefix) } else { prefix };
    format!("{prefix}{path}")
}

/// The pattern a route is stored under.
fn pattern_of(path: &str, config: &RouterConfig) -> String {
    let path = if path.starts_with('/') { path.to_owned() } else { format!("/{path}") };
    normalize_path(&path, config.no_trailing_slash).to_owned()
}

/// Collects routes, groups, global middlewares and policies, then composes every handler chain
/// once in [`build`](RouterBuilder::build).
pub struct RouterBuilder {
    routes: Vec<PendingRoute>,
    global: Vec<Middleware>,
    not_found: Option<BoxedHandler>,
    config: RouterConfig,
}

impl RouterBuilder {
    pub(crate) fn new() -> Self {
        Self { routes: Vec::new(), global: Vec::new(), not_found: None, config: RouterConfig::default() }
    }

    pub fn route(mut self, path: impl Into<String>, route: RouteBuilder) -> Self {
        self.routes.push(PendingRoute { path: path.into(), route, group_layers: Vec::new() });
        self
    }

    pub fn group(mut self, prefix: impl Into<String>, f: impl FnOnce(GroupBuilder) -> GroupBuilder) -> Self {
        let group = f(GroupBuilder::new(prefix.into()));
        self.routes.extend(group.into_routes());
        self
    }

    /// Adds a middleware that wraps every route, outside group and route middlewares.
    pub fn with_global_middleware(mut self, middleware: Middleware) -> Self {
        self.global.push(middleware);
        self
    }

    /// Serves requests no route matches. It is not wrapped by global middlewares.
    pub fn not_found<H: RequestHandler + 'static>(mut self, handler: H) -> Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn strict_home(mut self, strict_home: bool) -> Self {
        self.config.strict_home = strict_home;
        self
    }

    pub fn no_trailing_slash(mut self, no_trailing_slash: bool) -> Self {
        self.config.no_trailing_slash = no_trailing_slash;
        self
    }

    pub fn context_pool_capacity(mut self, capacity: usize) -> Self {
        self.config.context_pool_capacity = capacity;
        self
    }

    /// Builds the route table, wrapping each handler as global, then group (outer group
    /// first), then route middlewares.
    pub fn build(self) -> Result<Router, RouterBuildError> {
        let mut matcher = matchit::Router::new();
        let mut paths: Vec<PathRoutes> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        for PendingRoute { path, route, group_layers } in self.routes {
            let path = pattern_of(&path, &self.config);
            let slot = match slots.get(&path) {
                Some(&slot) => slot,
                None => {
                    let slot = paths.len();
                    matcher
                        .insert(path.clone(), slot)
                        .map_err(|source| RouterBuildError::InvalidRoute { path: path.clone(), source })?;
                    slots.insert(path.clone(), slot);
                    paths.push(PathRoutes { path: path.clone(), entries: Vec::new() });
                    slot
                }
            };

            let routes = &mut paths[slot];
            if routes.by_method(&route.method).is_some() {
                return Err(RouterBuildError::DuplicateRoute { method: route.method, path });
            }

            let middleware_count = self.global.len() + group_layers.len() + route.middlewares.len();
            let handler = chain(&route.middlewares, route.handler);
            let handler = chain(&group_layers, handler);
            let handler = chain(&self.global, handler);

            debug!(method = %route.method, path = %path, handler = route.handler_name, middleware_count, "route registered");
            routes.entries.push(RouteEntry {
                method: route.method,
                handler,
                handler_name: route.handler_name,
                middleware_count,
            });
        }

        let inner = RouterInner {
            matcher,
            paths,
            not_found: self.not_found,
            pool: ContextPool::new(self.config.context_pool_capacity),
            config: self.config,
        };
        Ok(Router::from_inner(Arc::new(inner)))
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.routes.len())
            .field("global", &self.global.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
