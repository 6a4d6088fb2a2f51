//! URL extraction: the decoded query string and the matched path parameters.

use crate::decode::{Decode, DecodeError, decode_query};
use crate::extract::{FromRequest, Query};
use crate::request::{PathParams, Request, RequestExt};
use async_trait::async_trait;
use std::convert::Infallible;

#[async_trait]
impl<T> FromRequest for Query<T>
where
    T: Decode + Default + Send,
{
    type Error = DecodeError;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        let mut value = T::default();
        decode_query(req, &mut value)?;
        Ok(Query(value))
    }
}

#[async_trait]
impl FromRequest for PathParams {
    type Error = Infallible;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        Ok(req.path_params().clone())
    }
}
