use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use http::StatusCode;
use tracing::error;

use crate::handler::RequestHandler;
use crate::middleware::{Middleware, Next, middleware_fn};
use crate::request::Request;
use crate::responder::Responder;

/// Answers `500` when anything further down the chain panics.
///
/// Register it as the first global middleware so it encloses every other one. The pooled
/// context is still returned, since the router releases it when the dispatch future finishes.
pub fn recovery() -> Middleware {
    middleware_fn(|req: Request, next: Next| async move {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        match AssertUnwindSafe(next.invoke(req)).catch_unwind().await {
            Ok(resp) => resp,
            Err(panic) => {
                error!(%method, %path, panic = panic_message(panic.as_ref()), "handler panicked");
                (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error").response_to()
            }
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
