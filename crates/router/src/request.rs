//! Request types and the accessors handlers use on them.

use std::any::Any;
use std::sync::Arc;

use matchit::Params;

use crate::body::ReqBody;
use crate::context::Context;
use crate::decode::ContentKind;

/// The request every handler and middleware receives.
pub type Request = http::Request<ReqBody>;

/// Named segments captured by the matched route, e.g. `id` in `/users/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

static EMPTY_PARAMS: PathParams = PathParams { params: Vec::new() };

impl PathParams {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.params.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl From<Params<'_, '_>> for PathParams {
    fn from(params: Params<'_, '_>) -> Self {
        Self { params: params.iter().map(|(key, value)| (key.to_owned(), value.to_owned())).collect() }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { params: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
    }
}

/// Convenience accessors over the router's request extensions.
pub trait RequestExt {
    /// The body format declared by the `Content-Type` header.
    fn content_kind(&self) -> ContentKind;

    /// Parameters captured by the matched route; empty outside a route.
    fn path_params(&self) -> &PathParams;

    fn path_param(&self, key: &str) -> Option<&str> {
        self.path_params().get(key)
    }

    /// The path parameter parsed as an integer; `None` when missing or not a number.
    fn param_int(&self, key: &str) -> Option<i64> {
        self.path_param(key).and_then(|value| value.parse().ok())
    }

    /// The first value of `key` in the query string, percent decoded.
    fn query_value(&self, key: &str) -> Option<String>;

    fn query_int(&self, key: &str) -> Option<i64> {
        self.query_value(key).and_then(|value| value.parse().ok())
    }

    /// The pooled context attached by the router.
    fn context(&self) -> Option<&Arc<Context>>;

    /// Stores a request local; returns false when the request has no context.
    fn set_local<V: Any + Send + Sync>(&self, key: &str, value: V) -> bool {
        self.context().map(|ctx| ctx.set(key, value)).is_some()
    }

    fn get_local<V: Any + Send + Sync>(&self, key: &str) -> Option<Arc<V>> {
        self.context().and_then(|ctx| ctx.get(key))
    }
}

impl<B> RequestExt for http::Request<B> {
    fn content_kind(&self) -> ContentKind {
        ContentKind::from_headers(self.headers())
    }

    fn path_params(&self) -> &PathParams {
        self.extensions().get::<PathParams>().unwrap_or(&EMPTY_PARAMS)
    }

    fn query_value(&self, key: &str) -> Option<String> {
        let query = self.uri().query()?;
        form_urlencoded_pairs(query).into_iter().find(|(name, _)| name == key).map(|(_, value)| value)
    }

    fn context(&self) -> Option<&Arc<Context>> {
        Context::of(self)
    }
}

fn form_urlencoded_pairs(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use http::header::CONTENT_TYPE;

    use crate::context::ContextPool;
    use crate::decode::ContentKind;
    use crate::request::{PathParams, RequestExt};

    #[test]
    fn path_params_lookup() {
        let mut req = http::Request::new(());
        assert!(req.path_params().is_empty());

        req.extensions_mut().insert(PathParams::from_iter([("id", "42"), ("slug", "hello")]));
        assert_eq!(req.path_param("slug"), Some("hello"));
        assert_eq!(req.param_int("id"), Some(42));
        assert_eq!(req.param_int("slug"), None);
        assert_eq!(req.path_params().len(), 2);
    }

    #[test]
    fn query_helpers() {
        let req = http::Request::builder().uri("/search?q=rust%20lang&page=3&page=4&bad=x").body(()).unwrap();

        assert_eq!(req.query_value("q").as_deref(), Some("rust lang"));
        assert_eq!(req.query_int("page"), Some(3));
        assert_eq!(req.query_int("bad"), None);
        assert_eq!(req.query_value("missing"), None);
    }

    #[test]
    fn locals_need_a_context() {
        let mut req = http::Request::builder().header(CONTENT_TYPE, "application/json").body(()).unwrap();
        assert_eq!(req.content_kind(), ContentKind::Json);
        assert!(!req.set_local("user", "jane"));

        let pool = ContextPool::new(1);
        let ctx = pool.acquire();
        ctx.attach_to(&mut req);
        assert!(req.set_local("user", "jane"));
        assert_eq!(req.get_local::<&str>("user").as_deref(), Some(&"jane"));
    }
}
