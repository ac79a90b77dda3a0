//! # Standout Web - Server-Rendered HTML for axum
//!
//! `standout-web` lets request handlers return plain data and renders it with
//! a template into the HTTP response. Handlers stay free of presentation:
//! they return a mapping, and the framework merges in values from context
//! processors, renders the named template with HTML escaping and wraps the
//! result with the right status and content type.
//!
//! ## Core Concepts
//!
//! - [`RenderEnvironment`]: templates, helpers and context processors for one application
//! - [`setup`]: installs an environment as a scope over a router's routes
//! - [`template`]: binds a template to a [`Handler`], producing an axum handler
//! - [`ContextProcessor`]: contributes values to every template in a scope
//! - [`render_template`]: renders explicitly from inside a handler
//! - [`Rendered`]: what a handler returns (data or a finished response)
//!
//! ## Quick Start
//!
//! ```rust
//! use axum::{routing::get, Router};
//! use serde_json::json;
//! use standout_web::{handler_fn, setup, template, RenderEnvironment, RouteTable};
//!
//! let routes = RouteTable::new().route("index", "/");
//!
//! let env = RenderEnvironment::builder()
//!     .templates([(
//!         "index.html",
//!         r#"<h1>{{ title }}</h1><a href="{{ url('index') }}">home</a>"#,
//!     )])
//!     .routes(routes.clone())
//!     .build()
//!     .unwrap();
//!
//! let app: Router = setup(
//!     Router::new().route(
//!         routes.pattern("index").unwrap(),
//!         get(template(
//!             "index.html",
//!             handler_fn(|_req| async { Ok::<_, anyhow::Error>(json!({"title": "Hello"})) }),
//!         )),
//!     ),
//!     env,
//! );
//! # let _ = app;
//! ```
//!
//! ## Request Flow
//!
//! ```text
//! request -> scope layers (outer -> inner) -> handler
//!         -> Rendered::Response ----------------------------> response
//!         -> Rendered::Context -> context processors -> render -> response
//! ```
//!
//! ## Nested Applications
//!
//! Each router passed through [`setup`] becomes a scope. Nesting a router
//! that has its own environment inside another keeps both: processors of the
//! outer scope run first, then those of the inner one, then the handler's
//! data is merged. Templates are rendered with the innermost environment
//! installed under the requested app key.
//!
//! ## Errors
//!
//! Failures are reported as [`Error`]. Missing environments, missing
//! templates, non-mapping data and helper misuse are server faults and become
//! `500` responses with a diagnostic body. A handler can answer with another
//! status by returning an [`HttpError`].

mod decorator;
mod environment;
mod error;
mod handler;
mod pipeline;
pub mod processor;
mod render;
mod request;
mod scope;

pub use decorator::{template, TemplateHandler, TemplateMarker};
pub use environment::{RenderEnvironment, RenderEnvironmentBuilder};
pub use error::{Error, HttpError, Result};
#[allow(deprecated)]
pub use handler::sync_handler;
pub use handler::{
    handler_fn, Handler, HandlerFn, HandlerResult, IntoHandlerResult, Rendered, SyncHandler,
};
pub use pipeline::{context_processors_middleware, resolve_context, PrecomputedContext};
pub use processor::{request_processor, ContextProcessor};
pub use render::{
    render_string, render_template, render_template_with, RenderOptions, DEFAULT_CONTENT_TYPE,
};
pub use request::RequestHead;
pub use scope::{setup, ScopeChain};

pub use standout_web_render::{
    minijinja, Context, DirectoryLoader, HelperError, Loader, RenderError, RenderSettings,
    RouteTable, SetupError, TemplateLoader, UrlReverser, DEFAULT_APP_KEY,
};
