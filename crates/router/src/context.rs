//! Per-request scratch state, recycled through a bounded pool.
//!
//! Every dispatched request borrows a [`Context`] from the router's [`ContextPool`]. The
//! context carries a handle back to the router and a string keyed map of request locals that
//! middlewares and handlers use to share data. When the request finishes the context is reset
//! and returned to the pool, keeping the map's allocation.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use crossbeam::queue::ArrayQueue;
use parking_lot::RwLock;
use tracing::trace;

use crate::router::{Router, RouterInner};

type Local = Arc<dyn Any + Send + Sync>;

pub struct Context {
    router: ArcSwapOption<RouterInner>,
    locals: RwLock<HashMap<String, Local>>,
}

impl Context {
    fn new() -> Self {
        Self { router: ArcSwapOption::empty(), locals: RwLock::new(HashMap::new()) }
    }

    /// The context attached to `req` by the router, if any.
    pub fn of<B>(req: &http::Request<B>) -> Option<&Arc<Context>> {
        req.extensions().get::<ContextSlot>().map(|slot| &slot.0)
    }

    /// The router dispatching the current request.
    pub fn router(&self) -> Option<Router> {
        self.router.load_full().map(Router::from_inner)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set<V: Any + Send + Sync>(&self, key: impl Into<String>, value: V) {
        self.locals.write().insert(key.into(), Arc::new(value));
    }

    /// The value under `key`, if it exists and has type `V`.
    pub fn get<V: Any + Send + Sync>(&self, key: &str) -> Option<Arc<V>> {
        let local = self.locals.read().get(key).map(Arc::clone)?;
        local.downcast::<V>().ok()
    }

    pub fn get_cloned<V: Any + Send + Sync + Clone>(&self, key: &str) -> Option<V> {
        self.get::<V>(key).map(|value| V::clone(&value))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.locals.read().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.locals.write().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.locals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.read().is_empty()
    }

    fn bind(&self, router: &Arc<RouterInner>) {
        self.router.store(Some(Arc::clone(router)));
    }

    fn reset(&self) {
        self.locals.write().clear();
        self.router.store(None);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locals = self.locals.read();
        f.debug_struct("Context")
            .field("bound", &self.router.load().is_some())
            .field("locals", &locals.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone)]
struct ContextSlot(Arc<Context>);

/// Bounded pool of reusable [`Context`] values.
pub struct ContextPool {
    slots: ArrayQueue<Arc<Context>>,
}

impl ContextPool {
    pub fn new(capacity: usize) -> Self {
        Self { slots: ArrayQueue::new(capacity.max(1)) }
    }

    /// Borrows a context, creating a fresh one when the pool is empty.
    pub fn acquire(&self) -> PooledContext<'_> {
        let ctx = self.slots.pop().unwrap_or_else(|| Arc::new(Context::new()));
        PooledContext { ctx: Some(ctx), pool: self }
    }

    /// Number of idle contexts ready for reuse.
    pub fn idle(&self) -> usize {
        self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    fn release(&self, ctx: Arc<Context>) {
        ctx.reset();
        if Arc::strong_count(&ctx) > 1 {
            trace!("context is still referenced, dropping it instead of pooling");
            return;
        }
        if self.slots.push(ctx).is_err() {
            trace!("context pool is full, dropping context");
        }
    }
}

impl fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPool").field("idle", &self.idle()).field("capacity", &self.capacity()).finish()
    }
}

/// A context on loan from a [`ContextPool`]; dropping it resets the context and returns it.
pub struct PooledContext<'pool> {
    ctx: Option<Arc<Context>>,
    pool: &'pool ContextPool,
}

impl PooledContext<'_> {
    /// Makes the context reachable from `req` through [`Context::of`].
    pub fn attach_to<B>(&self, req: &mut http::Request<B>) {
        req.extensions_mut().insert(ContextSlot(Arc::clone(self.shared())));
    }

    pub(crate) fn bind(&self, router: &Arc<RouterInner>) {
        self.shared().bind(router);
    }

    fn shared(&self) -> &Arc<Context> {
        match &self.ctx {
            Some(ctx) => ctx,
            None => unreachable!("pooled context accessed after release"),
        }
    }
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.shared()
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}

impl fmt::Debug for PooledContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledContext").field(&self.ctx).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::context::{Context, ContextPool};

    #[test]
    fn locals_are_typed() {
        let pool = ContextPool::new(4);
        let ctx = pool.acquire();

        ctx.set("user_id", 42_u64);
        ctx.set("name", String::from("jane"));

        assert_eq!(ctx.get::<u64>("user_id").as_deref(), Some(&42));
        assert_eq!(ctx.get_cloned::<String>("name").as_deref(), Some("jane"));
        assert!(ctx.get::<u32>("user_id").is_none());
        assert!(ctx.get::<u64>("missing").is_none());
        assert_eq!(ctx.len(), 2);
        assert!(ctx.remove("name"));
        assert!(!ctx.contains("name"));
    }

    #[test]
    fn released_context_is_reset_and_reused() {
        let pool = ContextPool::new(4);
        let first = {
            let ctx = pool.acquire();
            ctx.set("request_id", "r-1");
            Arc::as_ptr(ctx.shared())
        };
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire();
        assert_eq!(Arc::as_ptr(ctx.shared()), first);
        assert!(ctx.is_empty());
        assert!(ctx.router().is_none());
    }

    #[test]
    fn attached_context_is_found_on_request() {
        let pool = ContextPool::new(1);
        let ctx = pool.acquire();
        let mut req = http::Request::new(());
        ctx.attach_to(&mut req);

        Context::of(&req).unwrap().set("seen", true);
        assert_eq!(ctx.get_cloned::<bool>("seen"), Some(true));
    }

    #[test]
    fn shared_context_is_not_pooled() {
        let pool = ContextPool::new(1);
        let mut req = http::Request::new(());
        {
            let ctx = pool.acquire();
            ctx.attach_to(&mut req);
        }
        assert_eq!(pool.idle(), 0);

        drop(req);
        let ctx = pool.acquire();
        assert!(ctx.is_empty());
    }

    #[test]
    fn full_pool_drops_extra_contexts() {
        let pool = ContextPool::new(1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn concurrent_requests_never_share_a_context() {
        let pool = Arc::new(ContextPool::new(8));
        let handles: Vec<_> = (0..8_u64)
            .map(|n| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for i in 0..200_u64 {
                        let ctx = pool.acquire();
                        assert!(ctx.is_empty());
                        ctx.set("owner", n * 1000 + i);
                        std::thread::yield_now();
                        assert_eq!(ctx.get_cloned::<u64>("owner"), Some(n * 1000 + i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.idle() <= 8);
    }
}
