//! Typed extraction of handler arguments from a request.
//!
//! Every argument of a function wrapped by [`handler_fn`](crate::handler_fn) implements
//! [`FromRequest`]. Extractors run left to right against the same request; the first one
//! that fails answers the request with its error.

mod extract_body;
mod extract_context;
mod extract_header;
mod extract_tuple;
mod extract_url;
mod from_request;

pub use extract_context::Locals;
pub use from_request::FromRequest;

/// Represented as form data
///
/// when `post` as `application/x-www-form-urlencoded` or `multipart/form-data`, the body is
/// decoded field by field using the `form` tag; `application/json` and `application/xml`
/// bodies are deserialized with serde over `T::default()`, so absent keys keep their defaults.
/// The struct must derive [`Decode`](crate::decode::Decode), [`serde::Serialize`] and
/// [`serde::Deserialize`], and implement [`Default`].
///
/// # Example
/// ```
/// # use serde::{Deserialize, Serialize};
/// # use micro_router::decode::Decode;
/// # use micro_router::extract::Form;
/// # #[allow(dead_code)]
/// #[derive(Decode, Serialize, Deserialize, Default, Debug)]
/// struct Params {
///     #[form = "name,required"]
///     name: String,
///     zip: String,
/// }
///
/// pub async fn handle(Form(params) : Form<Params>) -> String {
///     format!("received params: {:?}", params)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Form<T>(pub T);

/// Represented as json data
///
/// when `post` as a `application/json`, we can using this struct to inject data,
/// note: the struct must impl [`serde::Deserialize`] and [`Send`]. As a return value it
/// serializes `T` into an `application/json` response.
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use micro_router::extract::Json;
/// # #[allow(dead_code)]
/// #[derive(Deserialize, Debug)]
/// struct Params {
///     name: String,
///     zip: String,
/// }
///
/// pub async fn handle(Json(params) : Json<Params>) -> String {
///     format!("received params: {:?}", params)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

/// Represented as url query data
///
/// The query string is decoded with the `query` tag; empty values are kept.
///
/// # Example
/// ```
/// # use micro_router::decode::Decode;
/// # use micro_router::extract::Query;
/// # #[allow(dead_code)]
/// #[derive(Decode, Default, Debug)]
/// struct Search {
///     #[query = "q,required"]
///     term: String,
///     page: Option<u32>,
/// }
///
/// pub async fn handle(Query(search) : Query<Search>) -> String {
///     format!("searching {:?}", search)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Query<T>(pub T);
