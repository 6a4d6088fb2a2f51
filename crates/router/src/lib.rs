//! A micro HTTP router built on the `http` crate types.
//!
//! - [`Router`] matches method and path, wraps every handler in its global, group and route
//!   middlewares once at build time, and attaches a pooled [`Context`] to each request.
//! - [`decode`] fills `#[derive(Decode)]` records from form bodies and query strings, choosing
//!   each field's key from its `form`, `query` or `json` tag.
//! - Handlers are plain async functions whose arguments are [`extract`]ors, see [`handler_fn`].
//!
//! ```
//! use micro_router::decode::Decode;
//! use micro_router::extract::Query;
//! use micro_router::router::get;
//! use micro_router::{Router, handler_fn};
//!
//! #[derive(Decode, Default)]
//! struct Search {
//!     q: String,
//!     page: u32,
//! }
//!
//! async fn search(Query(search): Query<Search>) -> String {
//!     format!("{} page {}", search.q, search.page)
//! }
//!
//! let router = Router::builder().route("/search", get(handler_fn(search))).build().unwrap();
//! assert_eq!(router.routes().len(), 1);
//! ```

extern crate self as micro_router;

mod body;
mod fn_trait;
mod handler;
mod request;

pub mod context;
pub mod decode;
pub mod decorator;
pub mod extract;
pub mod middleware;
pub mod responder;
pub mod router;

pub use body::ReqBody;
pub use body::ResponseBody;
pub use context::{Context, ContextPool};
pub use fn_trait::FnTrait;
pub use handler::BoxedHandler;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use handler::handler_fn;
pub use request::PathParams;
pub use request::Request;
pub use request::RequestExt;
pub use responder::Responder;
pub use router::{Router, RouterBuilder, RouterConfig};
