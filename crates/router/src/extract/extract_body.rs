use crate::decode::{
    ContentKind, Decode, DecodeError, MultipartForm, decode_body, multipart_boundary, parse_multipart_files,
};
use crate::extract::{Form, FromRequest, Json};
use crate::request::{Request, RequestExt};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[async_trait]
impl FromRequest for Bytes {
    type Error = DecodeError;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        req.body_mut().bytes().await.map_err(DecodeError::invalid_body)
    }
}

#[async_trait]
impl FromRequest for String {
    type Error = DecodeError;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        let bytes = Bytes::from_request(req).await?;
        String::from_utf8(bytes.into()).map_err(DecodeError::invalid_body)
    }
}

#[async_trait]
impl<T> FromRequest for Form<T>
where
    T: Decode + Serialize + DeserializeOwned + Default + Send,
{
    type Error = DecodeError;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        let mut value = T::default();
        decode_body(req, &mut value).await?;
        Ok(Form(value))
    }
}

#[async_trait]
impl<T> FromRequest for Json<T>
where
    T: DeserializeOwned + Send,
{
    type Error = DecodeError;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        match req.content_kind() {
            ContentKind::Json => {
                let bytes = Bytes::from_request(req).await?;
                serde_json::from_slice(&bytes).map(Json).map_err(DecodeError::invalid_body)
            }
            ContentKind::Other(content_type) => Err(DecodeError::InvalidContentType { content_type }),
            other => Err(DecodeError::InvalidContentType { content_type: format!("{other:?}") }),
        }
    }
}

/// The whole `multipart/form-data` body, uploaded files included.
#[async_trait]
impl FromRequest for MultipartForm {
    type Error = DecodeError;

    async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
        match req.content_kind() {
            ContentKind::Multipart => {
                let boundary = multipart_boundary(req.headers())?;
                parse_multipart_files(req.body_mut(), boundary).await
            }
            ContentKind::Other(content_type) => Err(DecodeError::InvalidContentType { content_type }),
            other => Err(DecodeError::InvalidContentType { content_type: format!("{other:?}") }),
        }
    }
}
