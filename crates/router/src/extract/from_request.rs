use crate::request::Request;
use crate::responder::Responder;
use async_trait::async_trait;
use std::convert::Infallible;

#[async_trait]
pub trait FromRequest: Sized + Send {
    type Error: Responder + Send;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error>;
}

/// Never fails: `None` when `T` could not be extracted.
#[async_trait]
impl<T> FromRequest for Option<T>
where
    T: FromRequest,
{
    type Error = Infallible;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        Ok(T::from_request(req).await.ok())
    }
}

#[async_trait]
impl<T> FromRequest for Result<T, T::Error>
where
    T: FromRequest,
{
    type Error = Infallible;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        Ok(T::from_request(req).await)
    }
}

#[async_trait]
impl FromRequest for () {
    type Error = Infallible;

    async fn from_request(_req: &mut Request) -> Result<Self, Self::Error> {
        Ok(())
    }
}

/// Takes the whole request, leaving an empty one behind; use it as the last argument.
#[async_trait]
impl FromRequest for Request {
    type Error = Infallible;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        Ok(std::mem::take(req))
    }
}
