//! Decorators wrap one value into another, typically a handler into a handler.
//!
//! Middlewares are decorators from [`BoxedHandler`](crate::handler::BoxedHandler) to
//! `BoxedHandler`. A decorator producing any handler type becomes a middleware through
//! [`middleware`](crate::middleware::middleware).

pub trait Decorator<In> {
    type Out;

    fn decorate(&self, raw: In) -> Self::Out;
}
