//! Converts handler results into HTTP responses.
//!
//! The [`Responder`] trait defines how a value becomes a `Response<ResponseBody>`. Handlers may
//! return any responder, and extractor errors are responders too, so a failed extraction is
//! answered without reaching the handler.

use crate::body::ResponseBody;
use crate::decode::{DecodeError, DecodeErrorKind};
use crate::extract::Json;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderValue, Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use tracing::{debug, error};

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn response_to(self) -> Response<ResponseBody>;
}

/// Implementation for Result allows handlers to return Result types directly.
/// The Ok and Err variants must both implement Responder.
impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn response_to(self) -> Response<ResponseBody> {
        match self {
            Ok(t) => t.response_to(),
            Err(e) => e.response_to(),
        }
    }
}

/// None case returns an empty response.
impl<T: Responder> Responder for Option<T> {
    fn response_to(self) -> Response<ResponseBody> {
        match self {
            Some(t) => t.response_to(),
            None => Response::new(ResponseBody::empty()),
        }
    }
}

impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn response_to(self) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to();
        *response.status_mut() = status;
        response
    }
}

/// `(body, status)` is spelled out per body type, a blanket impl would overlap with
/// `(StatusCode, T)` on `(StatusCode, StatusCode)`.
macro_rules! impl_responder_body_status {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Responder for ($ty, StatusCode) {
                fn response_to(self) -> Response<ResponseBody> {
                    let (responder, status) = self;
                    (status, responder).response_to()
                }
            }
        )+
    };
}

impl_responder_body_status!(&'static str, String, ());

impl<T: Responder> Responder for Box<T> {
    fn response_to(self) -> Response<ResponseBody> {
        (*self).response_to()
    }
}

impl Responder for () {
    fn response_to(self) -> Response<ResponseBody> {
        Response::new(ResponseBody::empty())
    }
}

impl Responder for StatusCode {
    fn response_to(self) -> Response<ResponseBody> {
        let mut response = Response::new(ResponseBody::empty());
        *response.status_mut() = self;
        response
    }
}

fn with_content_type(body: ResponseBody, content_type: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Static strings are answered as `text/plain`.
impl Responder for &'static str {
    fn response_to(self) -> Response<ResponseBody> {
        with_content_type(ResponseBody::from(self), "text/plain; charset=utf-8")
    }
}

impl Responder for String {
    fn response_to(self) -> Response<ResponseBody> {
        with_content_type(ResponseBody::from(self), "text/plain; charset=utf-8")
    }
}

impl Responder for Infallible {
    fn response_to(self) -> Response<ResponseBody> {
        match self {}
    }
}

/// An HTML document.
#[derive(Debug, Clone)]
pub struct Html<T>(pub T);

impl<T: Into<ResponseBody>> Responder for Html<T> {
    fn response_to(self) -> Response<ResponseBody> {
        with_content_type(self.0.into(), "text/html; charset=utf-8")
    }
}

impl<T: Serialize> Responder for Json<T> {
    fn response_to(self) -> Response<ResponseBody> {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => with_content_type(ResponseBody::from(bytes), "application/json"),
            Err(e) => {
                error!(error = %e, "serialize json response failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error").response_to()
            }
        }
    }
}

/// A redirect to `location`, `302 Found` unless built with [`Redirect::permanent`].
#[derive(Debug, Clone)]
pub struct Redirect {
    status: StatusCode,
    location: String,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self { status: StatusCode::FOUND, location: location.into() }
    }

    pub fn permanent(location: impl Into<String>) -> Self {
        Self { status: StatusCode::MOVED_PERMANENTLY, location: location.into() }
    }

    pub fn with_status(self, status: StatusCode) -> Self {
        Self { status, ..self }
    }
}

impl Responder for Redirect {
    fn response_to(self) -> Response<ResponseBody> {
        match HeaderValue::try_from(self.location) {
            Ok(location) => {
                let mut response = self.status.response_to();
                response.headers_mut().insert(LOCATION, location);
                response
            }
            Err(e) => {
                error!(error = %e, "invalid redirect location");
                (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error").response_to()
            }
        }
    }
}

/// Decode failures answer `415` for an unknown content type, `500` when the destination is
/// not a record, and `400` for everything the client sent wrong.
impl Responder for DecodeError {
    fn response_to(self) -> Response<ResponseBody> {
        let status = match self.kind() {
            DecodeErrorKind::InvalidContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DecodeErrorKind::InvalidStructPointer => StatusCode::INTERNAL_SERVER_ERROR,
            DecodeErrorKind::RequiredFieldMissing | DecodeErrorKind::UnsupportedType | DecodeErrorKind::ParseError => {
                StatusCode::BAD_REQUEST
            }
        };
        debug!(error = %self, status = status.as_u16(), "request decode failed");
        (status, self.to_string()).response_to()
    }
}
