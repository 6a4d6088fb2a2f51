use std::future::Future;

/// An async function callable with its arguments packed in a tuple.
///
/// Implemented for every `Fn(A, B, ..) -> impl Future` with up to eight arguments whose future
/// is `Send`, so handlers written as plain `async fn` can be stored behind a
/// [`RequestHandler`](crate::handler::RequestHandler).
pub trait FnTrait<Args>: Send + Sync {
    type Output;

    fn call(&self, args: Args) -> impl Future<Output = Self::Output> + Send;
}

/// for example, the two parameter version expands to:
///```ignore
/// impl<Func, Fut, A, B> FnTrait<(A, B)> for Func
/// where
///     Func: Fn(A, B) -> Fut + Send + Sync,
///     Fut: Future + Send,
/// {
///     type Output = Fut::Output;
///
///     fn call(&self, (A, B): (A, B)) -> impl Future<Output = Self::Output> + Send {
///         (self)(A, B)
///     }
/// }
///```
macro_rules! impl_fn_trait_for_fn ({ $($param:ident)* } => {
    impl<Func, Fut, $($param,)*> FnTrait<($($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Fut + Send + Sync,
        Fut: Future + Send,
    {
        type Output = Fut::Output;

        #[inline]
        #[allow(non_snake_case, reason = "tuple fields are bound to their type parameter names")]
        fn call(&self, ($($param,)*): ($($param,)*)) -> impl Future<Output = Self::Output> + Send {
            (self)($($param,)*)
        }
    }
});

impl_fn_trait_for_fn! {}
impl_fn_trait_for_fn! { A }
impl_fn_trait_for_fn! { A B }
impl_fn_trait_for_fn! { A B C }
impl_fn_trait_for_fn! { A B C D }
impl_fn_trait_for_fn! { A B C D E }
impl_fn_trait_for_fn! { A B C D E F }
impl_fn_trait_for_fn! { A B C D E F G }
impl_fn_trait_for_fn! { A B C D E F G H }
