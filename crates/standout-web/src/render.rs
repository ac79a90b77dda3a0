//! Rendering templates into responses.
//!
//! [`render_template`] is the explicit entry point for handlers that build
//! their own response; the [`template`](crate::template) decorator calls the
//! same machinery. Both follow the same steps:
//!
//! 1. find the innermost environment installed under the app key, failing
//!    with [`Error::NotInitialized`] when there is none,
//! 2. check that the template exists,
//! 3. check that the data is a mapping,
//! 4. resolve the full context through the processors,
//! 5. render, exposing the request as `request` unless the context already
//!    has that key,
//! 6. wrap the text with the status and content type.

use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use standout_web_render::minijinja::Value;
use standout_web_render::{Context, DEFAULT_APP_KEY};

use crate::environment::RenderEnvironment;
use crate::error::Error;
use crate::pipeline::resolve_context;
use crate::processor::REQUEST_KEY;
use crate::request::RequestHead;

/// Content type used unless overridden.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Response options for one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub(crate) status: StatusCode,
    pub(crate) content_type: String,
    pub(crate) app_key: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            app_key: DEFAULT_APP_KEY.to_string(),
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn app_key(mut self, app_key: impl Into<String>) -> Self {
        self.app_key = app_key.into();
        self
    }
}

/// Renders `name` with `context` into a `200 text/html` response.
pub async fn render_template<T>(
    name: &str,
    request: &RequestHead,
    context: &T,
) -> Result<Response, Error>
where
    T: Serialize + ?Sized,
{
    render_template_with(name, request, context, &RenderOptions::default()).await
}

/// Renders `name` with `context` using explicit response options.
pub async fn render_template_with<T>(
    name: &str,
    request: &RequestHead,
    context: &T,
    options: &RenderOptions,
) -> Result<Response, Error>
where
    T: Serialize + ?Sized,
{
    let env = request.environment(&options.app_key)?;
    render_value(&env, name, request, Value::from_serialize(context), options).await
}

/// Renders `name` with `context` to text, without building a response.
pub async fn render_string<T>(
    name: &str,
    request: &RequestHead,
    context: &T,
    app_key: &str,
) -> Result<String, Error>
where
    T: Serialize + ?Sized,
{
    let env = request.environment(app_key)?;
    let context = prepare(&env, name, request, Value::from_serialize(context)).await?;
    Ok(env.renderer().render(name, &context).await?)
}

/// Validates and resolves handler data, then renders it.
pub(crate) async fn render_value(
    env: &RenderEnvironment,
    name: &str,
    request: &RequestHead,
    data: Value,
    options: &RenderOptions,
) -> Result<Response, Error> {
    let context = prepare(env, name, request, data).await?;
    invoke(env, name, context, options).await
}

async fn prepare(
    env: &RenderEnvironment,
    name: &str,
    request: &RequestHead,
    data: Value,
) -> Result<Context, Error> {
    env.renderer().registry().resolve(name)?;
    let handler_context = Context::from_value(data)?;
    let mut context = resolve_context(request, &handler_context).await?;
    if !context.contains_key(REQUEST_KEY) {
        context.insert(REQUEST_KEY, request.to_value());
    }
    Ok(context)
}

/// Renders an already resolved context and builds the response.
pub(crate) async fn invoke(
    env: &RenderEnvironment,
    name: &str,
    context: Context,
    options: &RenderOptions,
) -> Result<Response, Error> {
    let body = env.renderer().render(name, &context).await?;

    tracing::debug!(
        template = name,
        status = options.status.as_u16(),
        app_key = %env.app_key(),
        "rendered template"
    );

    let content_type = HeaderValue::from_str(&options.content_type).unwrap_or_else(|_| {
        tracing::warn!(
            content_type = %options.content_type,
            "invalid content type, using the default"
        );
        HeaderValue::from_static(DEFAULT_CONTENT_TYPE)
    });

    Ok((options.status, [(header::CONTENT_TYPE, content_type)], body).into_response())
}
