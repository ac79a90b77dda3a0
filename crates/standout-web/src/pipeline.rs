//! Context resolution.
//!
//! Turns the scope chain of a request plus a handler's data into the single
//! context a template is rendered with:
//!
//! 1. start from an empty context,
//! 2. run the processors of every scope, outermost scope first and in
//!    registration order within a scope, one at a time,
//! 3. merge the handler's data last.
//!
//! Later contributions overwrite earlier ones key by key. Nothing passed in is
//! modified; every request gets its own context.
//!
//! When the legacy middleware has already run the processors for a request,
//! their output is stored as a [`PrecomputedContext`] and reused here, so a
//! processor never runs twice for the same request.

use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use standout_web_render::Context;

use crate::environment::RenderEnvironment;
use crate::error::Error;
use crate::request::RequestHead;

/// Processor output computed ahead of the handler.
#[derive(Debug, Clone)]
pub struct PrecomputedContext {
    covered: usize,
    context: Context,
}

impl PrecomputedContext {
    /// Number of scopes, counted from the outermost, whose processors ran.
    pub fn covered(&self) -> usize {
        self.covered
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

/// Builds the render context for `request` and the handler's data.
pub async fn resolve_context(
    request: &RequestHead,
    handler_context: &Context,
) -> Result<Context, Error> {
    let environments = request
        .scope_chain()
        .map(|chain| chain.environments().to_vec())
        .unwrap_or_default();

    let (accumulated, covered) = match request.extensions().get::<PrecomputedContext>() {
        Some(pre) => (pre.context.clone(), pre.covered.min(environments.len())),
        None => (Context::new(), 0),
    };

    let mut context = run_processors(request, &environments[covered..], accumulated).await?;
    context.extend(handler_context);
    Ok(context)
}

/// Runs the processors of `environments` in order, merging into `accumulated`.
pub(crate) async fn run_processors(
    request: &RequestHead,
    environments: &[Arc<RenderEnvironment>],
    mut accumulated: Context,
) -> Result<Context, Error> {
    for env in environments {
        for (index, processor) in env.processors().iter().enumerate() {
            tracing::debug!(
                app_key = %env.app_key(),
                processor = index,
                path = %request.path(),
                "running context processor"
            );
            let contributed = processor
                .process(request, &accumulated)
                .await
                .map_err(Error::Processor)?;
            accumulated.extend(&contributed);
        }
    }
    Ok(accumulated)
}

/// Runs the processors of every scope the request has entered so far and
/// stores the result on the request.
pub(crate) async fn precompute(request: &mut Request) -> Result<(), Error> {
    let head = RequestHead::from_request(request);
    let Some(chain) = head.scope_chain() else {
        return Ok(());
    };

    let (accumulated, covered) = match head.extensions().get::<PrecomputedContext>() {
        Some(pre) => (pre.context.clone(), pre.covered.min(chain.len())),
        None => (Context::new(), 0),
    };
    if covered == chain.len() {
        return Ok(());
    }

    let context = run_processors(&head, &chain.environments()[covered..], accumulated).await?;
    request.extensions_mut().insert(PrecomputedContext {
        covered: chain.len(),
        context,
    });
    Ok(())
}

/// Middleware that runs context processors before the handler.
///
/// Apply it with [`axum::middleware::from_fn`] *before* calling
/// [`setup`](crate::setup), so that it runs inside the scope:
///
/// ```rust,ignore
/// let app = setup(
///     Router::new()
///         .route("/", get(template("index.html", index)))
///         .layer(middleware::from_fn(context_processors_middleware)),
///     env,
/// );
/// ```
///
/// Handlers rendering with [`render_template`](crate::render_template) then
/// reuse the precomputed values instead of running the processors again.
pub async fn context_processors_middleware(mut request: Request, next: Next) -> Response {
    let diagnostics = RequestHead::from_request(&request)
        .scope_chain()
        .and_then(|chain| chain.environments().last().map(|env| env.diagnostics()))
        .unwrap_or(true);

    match precompute(&mut request).await {
        Ok(()) => next.run(request).await,
        Err(err) => err.to_response(diagnostics),
    }
}
