use crate::body::ResponseBody;
use crate::extract::FromRequest;
use crate::fn_trait::FnTrait;
use crate::request::Request;
use crate::responder::Responder;
use async_trait::async_trait;
use http::Response;

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Something that turns a request into a response.
///
/// Handlers and middleware-wrapped handlers share this trait, so a middleware receives the
/// next handler as a [`BoxedHandler`] and decides whether and when to invoke it.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: Request) -> Response<ResponseBody>;
}

pub type BoxedHandler = Arc<dyn RequestHandler>;

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    async fn invoke(&self, req: Request) -> Response<ResponseBody> {
        (**self).invoke(req).await
    }
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    async fn invoke(&self, req: Request) -> Response<ResponseBody> {
        (**self).invoke(req).await
    }
}

/// a `FnTrait` holder which represents any async Fn
pub struct FnHandler<F, Args> {
    f: F,
    _phantom: PhantomData<fn(Args)>,
}

impl<F, Args> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

impl<F, Args> fmt::Debug for FnHandler<F, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("f", &type_name::<F>()).finish()
    }
}

/// Wraps an async function whose arguments are all [`FromRequest`] extractors.
///
/// The first extractor that fails short-circuits the call and its error becomes the response.
pub fn handler_fn<F, Args>(f: F) -> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    FnHandler::new(f)
}

#[async_trait]
impl<F, Args> RequestHandler for FnHandler<F, Args>
where
    F: FnTrait<Args>,
    F::Output: Responder,
    Args: FromRequest,
{
    async fn invoke(&self, mut req: Request) -> Response<ResponseBody> {
        match Args::from_request(&mut req).await {
            Ok(args) => self.f.call(args).await.response_to(),
            Err(err) => err.response_to(),
        }
    }
}
