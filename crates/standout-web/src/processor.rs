//! Context processors.
//!
//! A context processor contributes values to every template rendered inside
//! its environment's scope. Processors run once per request in registration
//! order. Each one sees the context accumulated so far and returns a mapping
//! that is merged over it. The handler's own data is merged last.
//!
//! ```rust
//! use standout_web::{processor, Context};
//!
//! let user = processor::from_fn(|head, _ctx| async move {
//!     let mut ctx = Context::new();
//!     let name = head
//!         .headers()
//!         .get("x-user")
//!         .and_then(|v| v.to_str().ok())
//!         .unwrap_or("anonymous")
//!         .to_string();
//!     ctx.insert("user", name);
//!     Ok(ctx)
//! });
//! # let _ = user;
//! ```

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use standout_web_render::Context;

use crate::request::RequestHead;

/// Contributes template values for a request.
pub trait ContextProcessor: Send + Sync + 'static {
    /// Returns the values to merge over `context`.
    ///
    /// `context` is the accumulated output of the processors before this one.
    fn process<'a>(
        &'a self,
        request: &'a RequestHead,
        context: &'a Context,
    ) -> BoxFuture<'a, anyhow::Result<Context>>;
}

/// A processor backed by an async closure.
pub struct FnProcessor<F> {
    f: F,
}

/// Wraps an async closure as a [`ContextProcessor`].
///
/// The closure receives owned copies of the request head and the
/// accumulated context.
pub fn from_fn<F, Fut>(f: F) -> FnProcessor<F>
where
    F: Fn(RequestHead, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Context>> + Send + 'static,
{
    FnProcessor { f }
}

impl<F, Fut> ContextProcessor for FnProcessor<F>
where
    F: Fn(RequestHead, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Context>> + Send + 'static,
{
    fn process<'a>(
        &'a self,
        request: &'a RequestHead,
        context: &'a Context,
    ) -> BoxFuture<'a, anyhow::Result<Context>> {
        (self.f)(request.clone(), context.clone()).boxed()
    }
}

impl<F> fmt::Debug for FnProcessor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnProcessor")
    }
}

/// Contributes the same values to every request.
#[derive(Debug, Clone)]
pub struct ConstantProcessor {
    values: Context,
}

/// A processor that always returns `values`.
pub fn constant(values: Context) -> ConstantProcessor {
    ConstantProcessor { values }
}

impl ContextProcessor for ConstantProcessor {
    fn process<'a>(
        &'a self,
        _request: &'a RequestHead,
        _context: &'a Context,
    ) -> BoxFuture<'a, anyhow::Result<Context>> {
        let values = self.values.clone();
        async move { Ok(values) }.boxed()
    }
}

/// Name the request is exposed under in templates.
pub const REQUEST_KEY: &str = "request";

/// Puts the request head into the context as `request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestProcessor;

/// A processor that exposes the request to templates as `request`.
///
/// The render functions already do this for every template; the processor
/// makes the request visible to later processors too.
pub fn request_processor() -> RequestProcessor {
    RequestProcessor
}

impl ContextProcessor for RequestProcessor {
    fn process<'a>(
        &'a self,
        request: &'a RequestHead,
        _context: &'a Context,
    ) -> BoxFuture<'a, anyhow::Result<Context>> {
        let mut ctx = Context::new();
        ctx.insert(REQUEST_KEY, request.to_value());
        async move { Ok(ctx) }.boxed()
    }
}
