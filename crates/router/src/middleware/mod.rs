//! Middlewares: decorators that wrap a handler into another handler.
//!
//! A middleware receives the next handler once, when the router is built, and returns the
//! handler that will serve requests in its place. At request time it runs its own logic and
//! may or may not invoke `next`.
//!
//! ```
//! use micro_router::middleware::{Next, middleware_fn};
//! use micro_router::{Request, RequestHandler};
//!
//! let tag = middleware_fn(|req: Request, next: Next| async move {
//!     let mut resp = next.invoke(req).await;
//!     resp.headers_mut().insert("x-served-by", http::HeaderValue::from_static("micro-router"));
//!     resp
//! });
//! # drop(tag);
//! ```

mod logger;
mod recovery;

pub use logger::logger;
pub use recovery::recovery;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use http::Response;

use crate::body::ResponseBody;
use crate::decorator::Decorator;
use crate::handler::{BoxedHandler, RequestHandler};
use crate::request::Request;

/// The handler a middleware wraps.
pub type Next = BoxedHandler;

pub type Middleware = Arc<dyn Decorator<BoxedHandler, Out = BoxedHandler> + Send + Sync>;

/// Turns any decorator producing a handler into a [`Middleware`].
pub fn middleware<D>(decorator: D) -> Middleware
where
    D: Decorator<BoxedHandler> + Send + Sync + 'static,
    D::Out: RequestHandler + 'static,
{
    Arc::new(Boxing(decorator))
}

struct Boxing<D>(D);

impl<D> Decorator<BoxedHandler> for Boxing<D>
where
    D: Decorator<BoxedHandler>,
    D::Out: RequestHandler + 'static,
{
    type Out = BoxedHandler;

    fn decorate(&self, raw: BoxedHandler) -> BoxedHandler {
        Arc::new(self.0.decorate(raw))
    }
}

/// A middleware written as `async fn(Request, Next) -> Response`.
pub fn middleware_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<ResponseBody>> + Send,
{
    Arc::new(FnMiddleware { f: Arc::new(f) })
}

struct FnMiddleware<F> {
    f: Arc<F>,
}

impl<F, Fut> Decorator<BoxedHandler> for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<ResponseBody>> + Send,
{
    type Out = BoxedHandler;

    fn decorate(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(FnMiddlewareHandler { f: Arc::clone(&self.f), next })
    }
}

struct FnMiddlewareHandler<F> {
    f: Arc<F>,
    next: Next,
}

#[async_trait]
impl<F, Fut> RequestHandler for FnMiddlewareHandler<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<ResponseBody>> + Send,
{
    async fn invoke(&self, req: Request) -> Response<ResponseBody> {
        (self.f)(req, Arc::clone(&self.next)).await
    }
}

impl<F> fmt::Debug for FnMiddlewareHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddlewareHandler").finish_non_exhaustive()
    }
}

/// Wraps `handler` so that `layers[0]` runs first and `handler` runs last.
pub fn chain(layers: &[Middleware], handler: BoxedHandler) -> BoxedHandler {
    layers.iter().rev().fold(handler, |next, layer| layer.decorate(next))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;
    use parking_lot::Mutex;

    use crate::decorator::Decorator;
    use crate::handler::{BoxedHandler, RequestHandler, handler_fn};
    use crate::middleware::{Middleware, Next, chain, middleware, middleware_fn};
    use crate::request::Request;
    use crate::responder::Responder;

    type Trail = Arc<Mutex<Vec<String>>>;

    fn tracing_layer(name: &'static str, trail: &Trail) -> Middleware {
        let trail = Arc::clone(trail);
        middleware_fn(move |req: Request, next: Next| {
            let trail = Arc::clone(&trail);
            async move {
                trail.lock().push(format!("{name} before"));
                let resp = next.invoke(req).await;
                trail.lock().push(format!("{name} after"));
                resp
            }
        })
    }

    fn recording_handler(trail: &Trail) -> BoxedHandler {
        let trail = Arc::clone(trail);
        Arc::new(handler_fn(move || {
            let trail = Arc::clone(&trail);
            async move {
                trail.lock().push("handler".to_owned());
                "ok"
            }
        }))
    }

    #[tokio::test]
    async fn chain_runs_outermost_first() {
        let trail = Trail::default();
        let layers = vec![tracing_layer("A", &trail), tracing_layer("B", &trail), tracing_layer("C", &trail)];
        let handler = chain(&layers, recording_handler(&trail));

        let resp = handler.invoke(Request::default()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            *trail.lock(),
            ["A before", "B before", "C before", "handler", "C after", "B after", "A after"]
        );
    }

    #[tokio::test]
    async fn short_circuit_skips_the_rest() {
        let trail = Trail::default();
        let deny = middleware_fn(|_req: Request, _next: Next| async { StatusCode::FORBIDDEN.response_to() });
        let layers = vec![tracing_layer("A", &trail), deny, tracing_layer("B", &trail)];
        let handler = chain(&layers, recording_handler(&trail));

        let resp = handler.invoke(Request::default()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(*trail.lock(), ["A before", "A after"]);
    }

    struct Recorder(Trail);

    impl Decorator<BoxedHandler> for Recorder {
        type Out = BoxedHandler;

        fn decorate(&self, next: BoxedHandler) -> BoxedHandler {
            self.0.lock().push("decorated".to_owned());
            next
        }
    }

    #[tokio::test]
    async fn typed_decorators_become_middleware() {
        let trail = Trail::default();
        let handler = chain(&[middleware(Recorder(Arc::clone(&trail)))], recording_handler(&trail));
        assert_eq!(*trail.lock(), ["decorated"]);

        handler.invoke(Request::default()).await;
        assert_eq!(*trail.lock(), ["decorated", "handler"]);
    }
}
