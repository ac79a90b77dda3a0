//! The per-application render environment.
//!
//! A [`RenderEnvironment`] holds everything one application scope needs to
//! render: the compiled templates, the helpers, the context processors and
//! a handful of flags. It is built once with [`RenderEnvironment::builder`],
//! shared behind an `Arc`, and never changes afterwards.
//!
//! ```rust
//! use standout_web::{processor, Context, RenderEnvironment, RouteTable};
//!
//! let mut site = Context::new();
//! site.insert("site_name", "Example");
//!
//! let env = RenderEnvironment::builder()
//!     .templates([("index.html", "<h1>{{ site_name }}</h1>{{ body }}")])
//!     .routes(RouteTable::new().route("index", "/"))
//!     .static_root_url("/static")
//!     .context_processor(processor::constant(site))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(env.app_key(), standout_web::DEFAULT_APP_KEY);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use standout_web_render::minijinja::Value;
use standout_web_render::{
    DirectoryLoader, HelperSet, Loader, RenderSettings, Renderer, SetupError, UrlReverser,
    DEFAULT_APP_KEY,
};

use crate::processor::ContextProcessor;

/// Templates, helpers and context processors for one application scope.
pub struct RenderEnvironment {
    renderer: Renderer,
    processors: Vec<Arc<dyn ContextProcessor>>,
    app_key: String,
    diagnostics: bool,
    default_helpers: bool,
    precompute: bool,
}

impl RenderEnvironment {
    pub fn builder() -> RenderEnvironmentBuilder {
        RenderEnvironmentBuilder::default()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Context processors in registration order.
    pub fn processors(&self) -> &[Arc<dyn ContextProcessor>] {
        &self.processors
    }

    /// Key this environment is looked up under.
    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// Whether 500 responses carry the failure reason.
    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    pub fn default_helpers(&self) -> bool {
        self.default_helpers
    }

    pub fn autoescape(&self) -> bool {
        self.renderer.autoescape()
    }

    /// Whether processors run in the scope layer, ahead of the handler.
    pub fn precomputes(&self) -> bool {
        self.precompute
    }
}

impl fmt::Debug for RenderEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderEnvironment")
            .field("app_key", &self.app_key)
            .field("templates", &self.renderer.registry().len())
            .field("processors", &self.processors.len())
            .field("diagnostics", &self.diagnostics)
            .field("default_helpers", &self.default_helpers)
            .field("precompute", &self.precompute)
            .finish()
    }
}

/// Builder for [`RenderEnvironment`].
pub struct RenderEnvironmentBuilder {
    loader: Option<Loader>,
    helpers: HelperSet,
    processors: Vec<Arc<dyn ContextProcessor>>,
    autoescape: bool,
    diagnostics: bool,
    app_key: String,
    precompute: bool,
}

impl Default for RenderEnvironmentBuilder {
    fn default() -> Self {
        Self {
            loader: None,
            helpers: HelperSet::new(),
            processors: Vec::new(),
            autoescape: true,
            diagnostics: true,
            app_key: DEFAULT_APP_KEY.to_string(),
            precompute: false,
        }
    }
}

impl RenderEnvironmentBuilder {
    /// Sets where templates come from.
    pub fn loader(mut self, loader: Loader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Uses a fixed set of name to source templates.
    pub fn templates<I, K, V>(self, sources: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.loader(Loader::sources(sources))
    }

    /// Loads templates from a directory, compiled once.
    pub fn template_dir(self, root: impl Into<PathBuf>) -> Self {
        self.loader(Loader::directory(DirectoryLoader::new(root)))
    }

    /// Adds a helper callable as `name(...)` and as `value|name`.
    pub fn function(mut self, name: impl Into<String>, helper: impl Into<Value>) -> Self {
        self.helpers = self.helpers.function(name, helper);
        self
    }

    /// Adds a plain global value.
    pub fn global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.helpers = self.helpers.global(name, value);
        self
    }

    /// Appends a context processor. Processors run in the order added.
    pub fn context_processor(mut self, processor: impl ContextProcessor) -> Self {
        self.processors.push(Arc::new(processor));
        self
    }

    /// Installs the `url` and `static` helpers. On by default.
    pub fn default_helpers(mut self, enabled: bool) -> Self {
        self.helpers = self.helpers.defaults(enabled);
        self
    }

    /// Route reverser behind `url()`.
    pub fn routes(mut self, routes: impl UrlReverser + 'static) -> Self {
        self.helpers = self.helpers.routes(routes);
        self
    }

    /// Base URL for `static()`.
    pub fn static_root_url(mut self, url: impl Into<String>) -> Self {
        self.helpers = self.helpers.static_root_url(url);
        self
    }

    /// HTML-escape interpolated values. On by default.
    pub fn autoescape(mut self, enabled: bool) -> Self {
        self.autoescape = enabled;
        self
    }

    /// Put failure reasons in 500 bodies. On by default.
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Key to install the environment under.
    pub fn app_key(mut self, key: impl Into<String>) -> Self {
        self.app_key = key.into();
        self
    }

    /// Run context processors in the scope layer, before the handler.
    pub fn legacy_middleware(mut self, enabled: bool) -> Self {
        self.precompute = enabled;
        self
    }

    /// Applies declarative settings.
    ///
    /// A `template_dir` in the settings replaces any loader set so far.
    pub fn settings(mut self, settings: &RenderSettings) -> Self {
        if let Some(dir) = &settings.template_dir {
            let loader = DirectoryLoader::new(dir)
                .auto_reload(settings.auto_reload)
                .extensions(&settings.extensions);
            self.loader = Some(Loader::directory(loader));
        }
        if let Some(url) = &settings.static_root_url {
            self.helpers = self.helpers.static_root_url(url.clone());
        }
        self.helpers = self.helpers.defaults(settings.default_helpers);
        self.autoescape = settings.autoescape;
        self.diagnostics = settings.diagnostics;
        self.app_key = settings.app_key.clone();
        self
    }

    /// Compiles the templates and freezes the environment.
    pub fn build(self) -> Result<RenderEnvironment, SetupError> {
        let loader = self.loader.ok_or(SetupError::MissingLoader)?;
        let renderer = Renderer::new(loader, &self.helpers, self.autoescape)?;

        tracing::debug!(
            app_key = %self.app_key,
            processors = self.processors.len(),
            "render environment built"
        );

        Ok(RenderEnvironment {
            renderer,
            processors: self.processors,
            app_key: self.app_key,
            diagnostics: self.diagnostics,
            default_helpers: self.helpers.has_defaults(),
            precompute: self.precompute,
        })
    }
}
