//! # Standout Web Render - Templates for Server-Rendered HTML
//!
//! `standout-web-render` is the engine-facing half of `standout-web`. It knows
//! how to find templates, which helpers templates can call, and how to turn a
//! [`Context`] into text. It knows nothing about HTTP; the `standout-web` crate
//! layers requests, context processors and responses on top.
//!
//! ## Core Concepts
//!
//! - [`Loader`]: where templates come from (sources, an engine, a directory, a custom object)
//! - [`Renderer`]: the compiled engine, built once and shared
//! - [`HelperSet`]: `url()`, `static()` and custom helpers
//! - [`RouteTable`]: named route patterns behind `url()`
//! - [`Context`]: the mapping a template is rendered with
//! - [`RenderSettings`]: YAML-friendly setup options
//!
//! ## Quick Start
//!
//! ```rust
//! use standout_web_render::{Context, HelperSet, Loader, Renderer, RouteTable};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let helpers = HelperSet::new()
//!     .routes(RouteTable::new().route("user", "/user/{name}"))
//!     .static_root_url("/static");
//!
//! let renderer = Renderer::new(
//!     Loader::sources([(
//!         "profile.html",
//!         r#"<a href="{{ url('user', name=name) }}">{{ name }}</a>"#,
//!     )]),
//!     &helpers,
//!     true,
//! )
//! .unwrap();
//!
//! let mut ctx = Context::new();
//! ctx.insert("name", "<bob>");
//!
//! let html = renderer.render("profile.html", &ctx).await.unwrap();
//! assert_eq!(html, r#"<a href="/user/%3Cbob%3E">&lt;bob&gt;</a>"#);
//! # });
//! ```
//!
//! ## Errors
//!
//! Render-time failures are [`RenderError`]s; their display text is the
//! diagnostic shown to developers. Setup failures (missing directories,
//! templates that do not compile) are [`SetupError`]s and surface before the
//! first request.

pub mod context;
pub mod error;
pub mod helpers;
pub mod settings;
pub mod template;

pub use context::Context;
pub use error::{RenderError, SetupError};
pub use helpers::{HelperError, HelperSet, RouteTable, UrlReverser};
pub use settings::{RenderSettings, DEFAULT_APP_KEY};
pub use template::{
    DirectoryLoader, Loader, Renderer, TemplateFile, TemplateLoader, TemplateOrigin,
    TemplateRegistry, DEFAULT_EXTENSIONS,
};

// Re-export the engine crate so callers can build values and functions
// without a separate dependency.
pub use minijinja;
