//! Handler types.
//!
//! A handler receives the request and returns what to render. It does not
//! pick a template or build the HTML; the [`template`](crate::template)
//! decorator does that with whatever the handler returns.
//!
//! # What a handler returns
//!
//! [`Rendered`] is either data for the template or a finished response:
//!
//! | Variant | Effect |
//! |---------|--------|
//! | [`Rendered::Context`] | merged with processor output and rendered |
//! | [`Rendered::Response`] | returned to the client untouched |
//!
//! Handlers usually return `Result<T, E>` where `T` converts into
//! [`Rendered`] (a [`Context`], a `serde_json::Value`, a [`Response`]) and `E`
//! converts into `anyhow::Error`; [`IntoHandlerResult`] does the wrapping.
//!
//! # Kinds of handler
//!
//! - async closures and functions, through [`handler_fn`]
//! - closures capturing shared state, the same way
//! - structs implementing [`Handler`] directly
//! - plain synchronous closures, through the deprecated [`sync_handler`]

use std::future::Future;
use std::marker::PhantomData;

use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use standout_web_render::minijinja::Value;
use standout_web_render::Context;

/// What a handler produced.
#[derive(Debug)]
pub enum Rendered {
    /// Data to render. Must be a mapping.
    Context(Value),
    /// A response to send as is.
    Response(Response),
}

impl Rendered {
    /// Wraps any serializable value as template data.
    pub fn data<T: Serialize + ?Sized>(data: &T) -> Self {
        Rendered::Context(Value::from_serialize(data))
    }

    pub fn is_context(&self) -> bool {
        matches!(self, Rendered::Context(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Rendered::Response(_))
    }
}

impl From<Context> for Rendered {
    fn from(context: Context) -> Self {
        Rendered::Context(context.to_value())
    }
}

impl From<Value> for Rendered {
    fn from(value: Value) -> Self {
        Rendered::Context(value)
    }
}

impl From<serde_json::Value> for Rendered {
    fn from(value: serde_json::Value) -> Self {
        Rendered::data(&value)
    }
}

impl From<Response> for Rendered {
    fn from(response: Response) -> Self {
        Rendered::Response(response)
    }
}

/// The result type for handlers.
pub type HandlerResult = Result<Rendered, anyhow::Error>;

/// Types a handler may return.
///
/// ```rust
/// use standout_web::{HandlerResult, IntoHandlerResult, Rendered};
/// use serde_json::json;
///
/// let ok: Result<serde_json::Value, std::io::Error> = Ok(json!({"name": "x"}));
/// assert!(matches!(ok.into_handler_result(), Ok(Rendered::Context(_))));
/// ```
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: Into<Rendered>,
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> HandlerResult {
        self.map(Into::into).map_err(Into::into)
    }
}

impl IntoHandlerResult for Rendered {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self)
    }
}

impl IntoHandlerResult for Context {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self.into())
    }
}

impl IntoHandlerResult for serde_json::Value {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self.into())
    }
}

impl IntoHandlerResult for Response {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self.into())
    }
}

/// A request handler whose output is rendered by a template.
///
/// Implement it directly for view structs:
///
/// ```rust
/// use axum::extract::Request;
/// use futures::future::BoxFuture;
/// use standout_web::{Context, Handler, HandlerResult, Rendered};
///
/// struct Greeting {
///     name: String,
/// }
///
/// impl Handler for Greeting {
///     fn call(&self, _request: Request) -> BoxFuture<'_, HandlerResult> {
///         Box::pin(async move {
///             let mut ctx = Context::new();
///             ctx.insert("name", self.name.clone());
///             Ok(Rendered::from(ctx))
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: Request) -> BoxFuture<'_, HandlerResult>;
}

/// An async closure as a [`Handler`].
pub struct HandlerFn<F, Fut, R> {
    f: F,
    _phantom: PhantomData<fn() -> (Fut, R)>,
}

/// Wraps an async function or closure taking the request.
pub fn handler_fn<F, Fut, R>(f: F) -> HandlerFn<F, Fut, R>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult + 'static,
{
    HandlerFn {
        f,
        _phantom: PhantomData,
    }
}

impl<F, Fut, R> Handler for HandlerFn<F, Fut, R>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'_, HandlerResult> {
        (self.f)(request)
            .map(IntoHandlerResult::into_handler_result)
            .boxed()
    }
}

/// A synchronous closure as a [`Handler`].
pub struct SyncHandler<F, R> {
    f: F,
    _phantom: PhantomData<fn() -> R>,
}

/// Wraps a synchronous closure.
///
/// The closure runs inline on the async worker, so it must not block.
#[deprecated(note = "Bare functions are deprecated, use an async handler with `handler_fn`")]
pub fn sync_handler<F, R>(f: F) -> SyncHandler<F, R>
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: IntoHandlerResult + 'static,
{
    tracing::warn!("Bare functions are deprecated, use async handlers instead");
    SyncHandler {
        f,
        _phantom: PhantomData,
    }
}

impl<F, R> Handler for SyncHandler<F, R>
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: IntoHandlerResult + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'_, HandlerResult> {
        let result = (self.f)(request).into_handler_result();
        futures::future::ready(result).boxed()
    }
}

impl<H: Handler + ?Sized> Handler for std::sync::Arc<H> {
    fn call(&self, request: Request) -> BoxFuture<'_, HandlerResult> {
        (**self).call(request)
    }
}
