//! The `template` decorator.
//!
//! [`template`] binds a template name to a [`Handler`]. The result is an
//! axum handler, so it goes straight into a method router:
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/", get(template("index.html", handler_fn(index))))
//!     .route(
//!         "/new",
//!         post(template("created.html", handler_fn(create)).status(StatusCode::CREATED)),
//!     );
//! ```
//!
//! For each request the decorator runs the handler, then:
//!
//! - a [`Rendered::Response`] is returned unchanged,
//! - a [`Rendered::Context`] goes through context resolution and rendering,
//! - an error becomes an error response: an [`HttpError`](crate::HttpError)
//!   keeps its status, anything else is a 500.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::Error;
use crate::handler::{Handler, Rendered};
use crate::render::{render_value, RenderOptions};
use crate::request::RequestHead;

/// A handler bound to a template.
pub struct TemplateHandler<H> {
    name: Arc<str>,
    handler: Arc<H>,
    options: RenderOptions,
}

/// Binds `name` to `handler`.
pub fn template<H: Handler>(name: impl AsRef<str>, handler: H) -> TemplateHandler<H> {
    TemplateHandler {
        name: Arc::from(name.as_ref()),
        handler: Arc::new(handler),
        options: RenderOptions::default(),
    }
}

impl<H> Clone for TemplateHandler<H> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: self.handler.clone(),
            options: self.options.clone(),
        }
    }
}

impl<H> std::fmt::Debug for TemplateHandler<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateHandler")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<H: Handler> TemplateHandler<H> {
    /// Status of successful responses. Defaults to `200 OK`.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.options = self.options.status(status);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.options = self.options.content_type(content_type);
        self
    }

    /// Key of the environment to render with.
    pub fn app_key(mut self, app_key: impl Into<String>) -> Self {
        self.options = self.options.app_key(app_key);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the handler and turns its output into a response.
    pub async fn respond(&self, request: Request) -> Response {
        let head = RequestHead::from_request(&request);

        let result = match self.handler.call(request).await {
            Ok(Rendered::Response(response)) => return response,
            Ok(Rendered::Context(data)) => self.render(&head, data).await,
            Err(err) => Err(Error::Handler(err)),
        };

        match result {
            Ok(response) => response,
            Err(err) => {
                let diagnostics = head
                    .environment(&self.options.app_key)
                    .map(|env| env.diagnostics())
                    .unwrap_or(true);
                err.to_response(diagnostics)
            }
        }
    }

    async fn render(
        &self,
        head: &RequestHead,
        data: standout_web_render::minijinja::Value,
    ) -> Result<Response, Error> {
        let env = head.environment(&self.options.app_key)?;
        render_value(&env, &self.name, head, data, &self.options).await
    }
}

/// Marker type for the axum [`Handler`](axum::handler::Handler) impl.
#[doc(hidden)]
#[derive(Debug, Clone, Copy)]
pub struct TemplateMarker;

impl<H, S> axum::handler::Handler<TemplateMarker, S> for TemplateHandler<H>
where
    H: Handler,
    S: Send + Sync + 'static,
{
    type Future = BoxFuture<'static, Response>;

    fn call(self, request: Request, _state: S) -> Self::Future {
        async move { self.respond(request).await }.boxed()
    }
}
