use crate::body::ResponseBody;
use crate::extract::from_request::FromRequest;
use crate::request::Request;
use crate::responder::Responder;
use async_trait::async_trait;
use http::Response;

/// Extracts each element in order; the first failure is answered as its own response.
macro_rules! impl_from_request_for_tuple {
    ($($param:ident)*) => {
        #[async_trait]
        impl<$($param,)*> FromRequest for ($($param,)*)
        where
            $($param: FromRequest,)*
        {
            type Error = Response<ResponseBody>;

            async fn from_request(req: &mut Request) -> Result<Self, Self::Error> {
                Ok(($($param::from_request(req).await.map_err(Responder::response_to)?,)*))
            }
        }
    }
}

impl_from_request_for_tuple! { A }
impl_from_request_for_tuple! { A B }
impl_from_request_for_tuple! { A B C }
impl_from_request_for_tuple! { A B C D }
impl_from_request_for_tuple! { A B C D E }
impl_from_request_for_tuple! { A B C D E F }
impl_from_request_for_tuple! { A B C D E F G }
impl_from_request_for_tuple! { A B C D E F G H }
