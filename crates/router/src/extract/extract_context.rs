use crate::context::Context;
use crate::extract::FromRequest;
use crate::request::{Request, RequestExt};
use async_trait::async_trait;
use http::StatusCode;
use std::ops::Deref;
use std::sync::Arc;

/// The request locals of the pooled [`Context`], shared with the middlewares of the request.
#[derive(Debug, Clone)]
pub struct Locals(pub Arc<Context>);

impl Deref for Locals {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.0
    }
}

#[async_trait]
impl FromRequest for Locals {
    type Error = (StatusCode, &'static str);

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        req.context()
            .map(|ctx| Locals(Arc::clone(ctx)))
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "request was not dispatched by a router"))
    }
}
