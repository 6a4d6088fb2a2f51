//! The route table, its builder, and request dispatch.
//!
//! Routes are registered through [`Router::builder`]; every handler is wrapped in its full
//! middleware chain once, when [`RouterBuilder::build`] runs. Dispatch only looks up the
//! precomposed chain and invokes it with a pooled [`Context`](crate::context::Context)
//! attached to the request.

mod builder;

pub use builder::{
    GroupBuilder, RouteBuilder, RouterBuilder, connect, delete, get, head, method, options, patch, post, put, trace,
};

use std::fmt;
use std::sync::Arc;

use http::{Method, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::body::ResponseBody;
use crate::context::ContextPool;
use crate::handler::{BoxedHandler, RequestHandler};
use crate::request::{PathParams, Request};
use crate::responder::Responder;

/// Router level policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// When false, `/` also serves every path no other route matches.
    pub strict_home: bool,
    /// Trim one trailing `/` from registered patterns and request paths, except the root.
    pub no_trailing_slash: bool,
    /// Upper bound of idle contexts kept for reuse.
    pub context_pool_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { strict_home: true, no_trailing_slash: true, context_pool_capacity: 1024 }
    }
}

#[derive(Debug, Error)]
pub enum RouterBuildError {
    #[error("invalid route pattern {path}: {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("duplicate route {method} {path}")]
    DuplicateRoute { method: Method, path: String },
}

/// One registered route, as reported by [`Router::routes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    pub handler_name: &'static str,
    pub middleware_count: usize,
}

pub(crate) struct RouteEntry {
    method: Method,
    handler: BoxedHandler,
    handler_name: &'static str,
    middleware_count: usize,
}

/// All routes registered under one path pattern, in registration order.
struct PathRoutes {
    path: String,
    entries: Vec<RouteEntry>,
}

impl PathRoutes {
    fn by_method(&self, method: &Method) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.method == method)
    }

    /// Like [`by_method`](Self::by_method), but `GET` routes also answer `HEAD`.
    fn serving(&self, method: &Method) -> Option<&RouteEntry> {
        match self.by_method(method) {
            None if method == Method::HEAD => self.by_method(&Method::GET),
            found => found,
        }
    }
}

pub(crate) struct RouterInner {
    matcher: matchit::Router<usize>,
    paths: Vec<PathRoutes>,
    not_found: Option<BoxedHandler>,
    config: RouterConfig,
    pool: ContextPool,
}

impl RouterInner {
    fn lookup(&self, method: &Method, path: &str) -> Option<(&RouteEntry, PathParams)> {
        let path = normalize_path(path, self.config.no_trailing_slash);
        if let Some(found) = self.find(path, |routes| routes.serving(method)) {
            return Some(found);
        }

        if !self.config.strict_home && path != "/" {
            return self.find("/", |routes| routes.serving(method));
        }
        None
    }

    fn find<'a>(
        &'a self,
        path: &str,
        select: impl FnOnce(&'a PathRoutes) -> Option<&'a RouteEntry>,
    ) -> Option<(&'a RouteEntry, PathParams)> {
        let matched = self.matcher.at(path).ok()?;
        let routes = self.paths.get(*matched.value)?;
        select(routes).map(|entry| (entry, PathParams::from(matched.params)))
    }

    async fn not_found(&self, req: Request) -> Response<ResponseBody> {
        debug!(method = %req.method(), path = req.uri().path(), "no route matched");
        match &self.not_found {
            Some(handler) => handler.invoke(req).await,
            None => page_not_found(),
        }
    }
}

fn page_not_found() -> Response<ResponseBody> {
    (StatusCode::NOT_FOUND, "404 page not found").response_to()
}

/// Trims a single trailing `/` from everything but the root.
pub(crate) fn normalize_path(path: &str, no_trailing_slash: bool) -> &str {
    if path.is_empty() {
        return "/";
    }
    if no_trailing_slash
        && path != "/"
        && let Some(trimmed) = path.strip_suffix('/')
    {
        return trimmed;
    }
    path
}

/// Cheap, clonable handle to an immutable route table.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub(crate) fn from_inner(inner: Arc<RouterInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    pub fn context_pool(&self) -> &ContextPool {
        &self.inner.pool
    }

    /// Serves one request.
    ///
    /// A pooled context is attached to the request for the whole call and returned to the
    /// pool when the call finishes, on every exit path.
    pub async fn dispatch(&self, mut req: Request) -> Response<ResponseBody> {
        let ctx = self.inner.pool.acquire();
        ctx.bind(&self.inner);
        ctx.attach_to(&mut req);

        let matched = self.inner.lookup(req.method(), req.uri().path());
        match matched {
            Some((entry, params)) => {
                trace!(method = %entry.method, path = req.uri().path(), handler = entry.handler_name, "route matched");
                req.extensions_mut().insert(params);
                entry.handler.invoke(req).await
            }
            None => self.inner.not_found(req).await,
        }
    }

    /// Hands `req` to the route registered for `target`, whatever its method.
    ///
    /// The route registered for the request's own method wins, then `GET`, then the first one
    /// registered. The target is matched as given, and the request keeps the context it was
    /// dispatched with.
    pub async fn forward(&self, target: &str, mut req: Request) -> Response<ResponseBody> {
        let method = req.method().clone();
        let found = self.inner.find(target, |routes| {
            routes.by_method(&method).or_else(|| routes.by_method(&Method::GET)).or_else(|| routes.entries.first())
        });

        match found {
            Some((entry, params)) => {
                trace!(forward_to = target, handler = entry.handler_name, "forward request");
                req.extensions_mut().insert(params);
                entry.handler.invoke(req).await
            }
            None => {
                warn!(forward_to = target, "no route to forward to");
                page_not_found()
            }
        }
    }

    /// Every registered route, grouped by pattern in registration order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.inner
            .paths
            .iter()
            .flat_map(|routes| {
                routes.entries.iter().map(|entry| RouteInfo {
                    method: entry.method.clone(),
                    path: routes.path.clone(),
                    handler_name: entry.handler_name,
                    middleware_count: entry.middleware_count,
                })
            })
            .collect()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes())
            .field("config", &self.inner.config)
            .field("pool", &self.inner.pool)
            .finish_non_exhaustive()
    }
}

/// A router is itself a handler, so it can be mounted behind another layer or server.
#[async_trait::async_trait]
impl RequestHandler for Router {
    async fn invoke(&self, req: Request) -> Response<ResponseBody> {
        self.dispatch(req).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use parking_lot::Mutex;

    use crate::body::{ReqBody, ResponseBody};
    use crate::handler::{RequestHandler, handler_fn};
    use crate::middleware::{Middleware, Next, middleware_fn};
    use crate::request::{PathParams, Request, RequestExt};
    use crate::responder::Responder;
    use crate::router::{Router, RouterBuildError, RouterConfig, get, post};

    async fn text(resp: http::Response<ResponseBody>) -> String {
        String::from_utf8(resp.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap()
    }

    fn request(method: Method, uri: &str) -> Request {
        http::Request::builder().method(method).uri(uri).body(ReqBody::empty()).unwrap()
    }

    async fn hello() -> &'static str {
        "hello"
    }

    async fn user(params: PathParams) -> String {
        format!("user {}", params.get("id").unwrap_or("?"))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn dispatch_by_method_and_path() {
        let router = Router::builder()
            .route("/", get(handler_fn(hello)))
            .route("/users/{id}", get(handler_fn(user)))
            .route("/users/{id}", post(handler_fn(|| async { StatusCode::CREATED })))
            .build()
            .unwrap();

        assert_eq!(text(router.dispatch(request(Method::GET, "/")).await).await, "hello");
        assert_eq!(text(router.dispatch(request(Method::GET, "/users/42")).await).await, "user 42");
        assert_eq!(text(router.dispatch(request(Method::GET, "/users/42/")).await).await, "user 42");
        assert_eq!(router.dispatch(request(Method::POST, "/users/1")).await.status(), StatusCode::CREATED);
        assert_eq!(router.dispatch(request(Method::HEAD, "/users/1")).await.status(), StatusCode::OK);

        let resp = router.dispatch(request(Method::DELETE, "/users/1")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(resp).await, "404 page not found");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn strict_home_only_serves_root() {
        let router = Router::builder().route("/", get(handler_fn(hello))).build().unwrap();
        assert_eq!(router.dispatch(request(Method::GET, "/missing")).await.status(), StatusCode::NOT_FOUND);

        let router = Router::builder()
            .config(RouterConfig { strict_home: false, ..RouterConfig::default() })
            .route("/", get(handler_fn(hello)))
            .build()
            .unwrap();
        assert_eq!(text(router.dispatch(request(Method::GET, "/missing")).await).await, "hello");
        assert_eq!(router.dispatch(request(Method::POST, "/missing")).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn trailing_slash_kept_when_disabled() {
        let router = Router::builder()
            .no_trailing_slash(false)
            .route("/docs/", get(handler_fn(hello)))
            .build()
            .unwrap();

        assert_eq!(router.dispatch(request(Method::GET, "/docs/")).await.status(), StatusCode::OK);
        assert_eq!(router.dispatch(request(Method::GET, "/docs")).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn custom_not_found() {
        let router = Router::builder()
            .route("/", get(handler_fn(hello)))
            .not_found(handler_fn(|req: Request| async move {
                (StatusCode::NOT_FOUND, format!("nothing at {}", req.uri().path()))
            }))
            .build()
            .unwrap();

        let resp = router.dispatch(request(Method::GET, "/nope")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(resp).await, "nothing at /nope");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn forward_ignores_method() {
        let router = Router::builder()
            .route("/login", get(handler_fn(|| async { "login page" })))
            .route("/items/{id}", post(handler_fn(user)))
            .route(
                "/legacy",
                get(handler_fn(|req: Request| async move {
                    match req.context().and_then(|ctx| ctx.router()) {
                        Some(router) => router.forward("/login", req).await,
                        None => (StatusCode::INTERNAL_SERVER_ERROR, "no router").response_to(),
                    }
                })),
            )
            .build()
            .unwrap();

        assert_eq!(text(router.dispatch(request(Method::GET, "/legacy")).await).await, "login page");
        assert_eq!(text(router.forward("/login", request(Method::DELETE, "/x")).await).await, "login page");
        assert_eq!(text(router.forward("/items/9", request(Method::GET, "/x")).await).await, "user 9");
        assert_eq!(router.forward("/none", request(Method::GET, "/x")).await.status(), StatusCode::NOT_FOUND);
    }

    fn tag(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Middleware {
        let log = Arc::clone(log);
        middleware_fn(move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(name);
                let resp = next.invoke(req).await;
                log.lock().push(name);
                resp
            }
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn global_group_route_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&log);
        let router = Router::builder()
            .group("/api", |api| {
                api.with_middleware(tag("parent", &log)).group("/v1", |v1| {
                    v1.with_middleware(tag("child", &log)).route(
                        "/ping",
                        get(handler_fn(move || {
                            let log = Arc::clone(&handler_log);
                            async move {
                                log.lock().push("handler");
                                "pong"
                            }
                        }))
                        .with_middleware(tag("route", &log)),
                    )
                })
            })
            .with_global_middleware(tag("global", &log))
            .build()
            .unwrap();

        assert_eq!(text(router.dispatch(request(Method::GET, "/api/v1/ping")).await).await, "pong");
        assert_eq!(
            *log.lock(),
            ["global", "parent", "child", "route", "handler", "route", "child", "parent", "global"]
        );
    }

    #[test]
    fn routes_are_listed() {
        let router = Router::builder()
            .route("/", get(handler_fn(hello)))
            .group("/users", |users| {
                users
                    .with_middleware(middleware_fn(|req: Request, next: Next| async move {
                        next.invoke(req).await
                    }))
                    .route("/{id}", get(handler_fn(user)))
            })
            .build()
            .unwrap();

        let routes = router.routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].path, "/");
        assert_eq!(routes[1].method, Method::GET);
        assert_eq!(routes[1].path, "/users/{id}");
        assert_eq!(routes[1].middleware_count, 1);
        assert!(routes[1].handler_name.contains("FnHandler"));
    }

    #[test]
    fn build_errors() {
        let err = Router::builder()
            .route("/a", get(handler_fn(hello)))
            .route("/a/", get(handler_fn(hello)))
            .build()
            .unwrap_err();
        assert!(matches!(err, RouterBuildError::DuplicateRoute { ref path, .. } if path == "/a"));

        let err = Router::builder()
            .route("/x/{id}", get(handler_fn(hello)))
            .route("/x/{name}", post(handler_fn(hello)))
            .build()
            .unwrap_err();
        assert!(matches!(err, RouterBuildError::InvalidRoute { .. }));
    }
}
