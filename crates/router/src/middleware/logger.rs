use std::time::Instant;

use tracing::info;

use crate::handler::RequestHandler;
use crate::middleware::{Middleware, Next, middleware_fn};
use crate::request::Request;

/// Logs method, path, status and latency of every request at `info` level.
pub fn logger() -> Middleware {
    middleware_fn(|req: Request, next: Next| async move {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let resp = next.invoke(req).await;

        info!(%method, %path, status = resp.status().as_u16(), latency = ?start.elapsed(), "request served");
        resp
    })
}
