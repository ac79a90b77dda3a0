//! The compiled template engine behind a render environment.
//!
//! [`Renderer`] couples a minijinja [`Environment`] with the
//! [`TemplateRegistry`] built from a [`Loader`] and the installed
//! [`HelperSet`]. It is built once and only read afterwards, so it can be
//! shared between requests behind an `Arc`.
//!
//! # Escaping
//!
//! With `autoescape` on, every template escapes interpolated values as HTML.
//! A single site opts out with the `safe` filter:
//!
//! ```jinja
//! {{ text }}        {# &lt;script&gt; #}
//! {{ text|safe }}   {# <script> #}
//! ```
//!
//! The flag is applied when templates are compiled and cannot change
//! afterwards. Engines supplied through [`Loader::Engine`] keep their own
//! escaping configuration.
//!
//! # Blocking loads
//!
//! Template loaders read synchronously. Whenever a render may hit one, it runs
//! on the blocking pool instead of the async worker:
//!
//! - a directory loader with auto-reload renders every request from a fresh
//!   environment, so edits to a template or anything it includes show up on
//!   the next request
//! - a custom [`TemplateLoader`](super::TemplateLoader) is consulted lazily
//!   by the shared environment, which caches what it loaded

use std::path::PathBuf;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, Error, ErrorKind};

use crate::context::Context;
use crate::error::{RenderError, SetupError, TemplateReadError};
use crate::helpers::HelperSet;

use super::registry::{DirectoryLoader, Loader, TemplateOrigin, TemplateRegistry};

/// Everything needed to rebuild the environment for a reloading render.
#[derive(Debug, Clone)]
struct ReloadState {
    dir: DirectoryLoader,
    helpers: HelperSet,
    autoescape: bool,
}

impl ReloadState {
    fn environment(&self) -> Environment<'static> {
        let mut env = base_environment(self.autoescape);
        let dir = self.dir.clone();
        env.set_loader(move |name| {
            dir.read(name).map_err(|err| {
                let path = dir.path_for(name).unwrap_or_else(|| PathBuf::from(name));
                load_error(name, path, err)
            })
        });
        self.helpers.install(&mut env);
        env
    }
}

/// Where a render runs.
#[derive(Debug)]
enum RenderMode {
    /// Everything is compiled; render on the calling task.
    Inline,
    /// The shared environment may call a custom loader.
    Blocking,
    /// Rebuild the environment from disk for every render.
    Reload(ReloadState),
}

/// A ready-to-use template engine.
#[derive(Debug)]
pub struct Renderer {
    env: Arc<Environment<'static>>,
    registry: TemplateRegistry,
    mode: RenderMode,
    autoescape: bool,
}

impl Renderer {
    /// Builds the engine from a loader and a helper set.
    ///
    /// Source and non-reloading directory templates are compiled here, so a
    /// syntax error fails setup rather than the first request.
    pub fn new(loader: Loader, helpers: &HelperSet, autoescape: bool) -> Result<Self, SetupError> {
        let mut registry = TemplateRegistry::new();
        let mut mode = RenderMode::Inline;

        let mut env = match loader {
            Loader::Engine(env) => {
                registry.defer_unknown();
                env
            }
            Loader::Sources(sources) => {
                let mut env = base_environment(autoescape);
                for (name, source) in sources {
                    compile(&mut env, &name, source)?;
                    registry.insert(name, TemplateOrigin::Inline);
                }
                env
            }
            Loader::Directory(dir) => {
                let files = dir.scan()?;
                let mut env = base_environment(autoescape);
                if dir.is_auto_reload() {
                    for file in files {
                        registry.insert(file.name, TemplateOrigin::File(file.path));
                    }
                    registry.defer_unknown();
                    mode = RenderMode::Reload(ReloadState {
                        dir,
                        helpers: helpers.clone(),
                        autoescape,
                    });
                } else {
                    for file in files {
                        let source = std::fs::read_to_string(&file.path)?;
                        compile(&mut env, &file.name, source)?;
                        registry.insert(file.name, TemplateOrigin::File(file.path));
                    }
                }
                env
            }
            Loader::Custom(custom) => {
                let mut env = base_environment(autoescape);
                env.set_loader(move |name| {
                    custom
                        .load(name)
                        .map_err(|err| load_error(name, PathBuf::from(name), err))
                });
                registry.defer_unknown();
                mode = RenderMode::Blocking;
                env
            }
        };

        helpers.install(&mut env);

        tracing::debug!(
            templates = registry.len(),
            auto_reload = matches!(mode, RenderMode::Reload(_)),
            blocking = !matches!(mode, RenderMode::Inline),
            autoescape,
            "template renderer ready"
        );

        Ok(Self {
            env: Arc::new(env),
            registry,
            mode,
            autoescape,
        })
    }

    /// Renders the named template with `context`.
    pub async fn render(&self, name: &str, context: &Context) -> Result<String, RenderError> {
        self.registry.resolve(name)?;
        let ctx = context.to_value();

        let name = name.to_string();
        match &self.mode {
            RenderMode::Inline => render_in(&self.env, &name, ctx),
            RenderMode::Blocking => {
                let env = self.env.clone();
                blocking(move || render_in(&env, &name, ctx)).await
            }
            RenderMode::Reload(state) => {
                let state = state.clone();
                blocking(move || render_in(&state.environment(), &name, ctx)).await
            }
        }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Whether templates compiled by this renderer escape HTML.
    pub fn autoescape(&self) -> bool {
        self.autoescape
    }

    /// The underlying minijinja environment.
    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }
}

fn base_environment(autoescape: bool) -> Environment<'static> {
    let mut env = Environment::new();
    let mode = if autoescape {
        AutoEscape::Html
    } else {
        AutoEscape::None
    };
    env.set_auto_escape_callback(move |_name| mode.clone());
    env
}

fn compile(env: &mut Environment<'static>, name: &str, source: String) -> Result<(), SetupError> {
    env.add_template_owned(name.to_string(), source)
        .map_err(|source| SetupError::Compile {
            name: name.to_string(),
            source,
        })
}

fn load_error(name: &str, path: PathBuf, err: std::io::Error) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("failed to load template '{}'", name),
    )
    .with_source(TemplateReadError { path, source: err })
}

/// Runs a render on the blocking pool.
async fn blocking<F>(render: F) -> Result<String, RenderError>
where
    F: FnOnce() -> Result<String, RenderError> + Send + 'static,
{
    tokio::task::spawn_blocking(render).await.map_err(|err| {
        RenderError::Template(
            Error::new(ErrorKind::InvalidOperation, "template render task failed").with_source(err),
        )
    })?
}

fn render_in(
    env: &Environment<'static>,
    name: &str,
    ctx: minijinja::Value,
) -> Result<String, RenderError> {
    let template = env.get_template(name).map_err(|err| match err.kind() {
        ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(name.to_string()),
        _ => RenderError::from_engine(err),
    })?;
    template.render(ctx).map_err(RenderError::from_engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::RouteTable;
    use minijinja::Value;

    fn sources(pairs: &[(&str, &str)]) -> Loader {
        Loader::sources(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    fn ctx(pairs: &[(&str, &str)]) -> Context {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[tokio::test]
    async fn renders_source_templates() {
        let renderer = Renderer::new(
            sources(&[("tmpl.html", "<html><body><h1>{{ head }}</h1>{{ text }}</body></html>")]),
            &HelperSet::new(),
            true,
        )
        .unwrap();

        let out = renderer
            .render("tmpl.html", &ctx(&[("head", "HEAD"), ("text", "text")]))
            .await
            .unwrap();
        assert_eq!(out, "<html><body><h1>HEAD</h1>text</body></html>");
    }

    #[test]
    fn syntax_errors_fail_setup() {
        let err = Renderer::new(sources(&[("bad.html", "{% if %}")]), &HelperSet::new(), true)
            .unwrap_err();
        assert!(matches!(err, SetupError::Compile { ref name, .. } if name == "bad.html"));
    }

    #[tokio::test]
    async fn autoescape_escapes_and_safe_opts_out() {
        let renderer = Renderer::new(
            sources(&[
                ("escaped.html", "{{ text }}"),
                ("raw.html", "{{ text|safe }}"),
            ]),
            &HelperSet::new(),
            true,
        )
        .unwrap();
        let data = ctx(&[("text", "<script>alert('test')</script>")]);

        let escaped = renderer.render("escaped.html", &data).await.unwrap();
        assert!(escaped.contains("&lt;script&gt;"));
        assert!(!escaped.contains("<script>"));

        let raw = renderer.render("raw.html", &data).await.unwrap();
        assert_eq!(raw, "<script>alert('test')</script>");
    }

    #[tokio::test]
    async fn autoescape_off_leaves_markup() {
        let renderer =
            Renderer::new(sources(&[("t.html", "{{ text }}")]), &HelperSet::new(), false).unwrap();
        let out = renderer
            .render("t.html", &ctx(&[("text", "<b>")]))
            .await
            .unwrap();
        assert_eq!(out, "<b>");
    }

    #[tokio::test]
    async fn unknown_template_is_not_found() {
        let renderer = Renderer::new(sources(&[]), &HelperSet::new(), true).unwrap();
        let err = renderer.render("template", &Context::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Template 'template' not found");
    }

    #[tokio::test]
    async fn rendering_is_deterministic() {
        let renderer = Renderer::new(
            sources(&[("t.html", "{% for k, v in items|items %}{{ k }}={{ v }};{% endfor %}")]),
            &HelperSet::new(),
            true,
        )
        .unwrap();
        let mut data = Context::new();
        data.insert(
            "items",
            Value::from_serialize(serde_json::json!({"b": 2, "a": 1, "c": 3})),
        );

        let first = renderer.render("t.html", &data).await.unwrap();
        let second = renderer.render("t.html", &data).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn helpers_are_available() {
        let helpers = HelperSet::new()
            .routes(RouteTable::new().route("index", "/"))
            .static_root_url("/static");
        let renderer = Renderer::new(
            sources(&[("t.html", "{{ url('index') }} {{ static('a.css') }}")]),
            &helpers,
            true,
        )
        .unwrap();
        let out = renderer.render("t.html", &Context::new()).await.unwrap();
        assert_eq!(out, "/ /static/a.css");
    }

    #[tokio::test]
    async fn static_without_root_is_classified() {
        let renderer = Renderer::new(
            sources(&[("t.html", "{{ static('file.css') }}")]),
            &HelperSet::new(),
            true,
        )
        .unwrap();
        let err = renderer.render("t.html", &Context::new()).await.unwrap_err();
        assert!(matches!(err, RenderError::StaticRootMissing));
    }

    #[tokio::test]
    async fn engine_loader_uses_existing_templates() {
        let mut env = Environment::new();
        env.add_template("pre.html", "pre {{ x }}").unwrap();

        let renderer = Renderer::new(Loader::engine(env), &HelperSet::new(), true).unwrap();
        let out = renderer
            .render("pre.html", &ctx(&[("x", "compiled")]))
            .await
            .unwrap();
        assert_eq!(out, "pre compiled");

        let err = renderer.render("missing.html", &Context::new()).await.unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
    }

    #[tokio::test]
    async fn custom_loader_is_consulted_by_name() {
        let loader = |name: &str| -> std::io::Result<Option<String>> {
            Ok((name == "dyn.html").then(|| "dynamic {{ x }}".to_string()))
        };
        let renderer = Renderer::new(Loader::custom(loader), &HelperSet::new(), true).unwrap();

        let out = renderer
            .render("dyn.html", &ctx(&[("x", "1")]))
            .await
            .unwrap();
        assert_eq!(out, "dynamic 1");

        let err = renderer.render("other.html", &Context::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Template 'other.html' not found");
    }

    #[tokio::test]
    async fn custom_loader_runs_off_the_async_thread() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let loader = move |name: &str| -> std::io::Result<Option<String>> {
            recorder.lock().unwrap().push(std::thread::current().id());
            Ok((name == "dyn.html").then(|| "dynamic".to_string()))
        };
        let renderer = Renderer::new(Loader::custom(loader), &HelperSet::new(), true).unwrap();

        let out = renderer.render("dyn.html", &Context::new()).await.unwrap();
        assert_eq!(out, "dynamic");

        let async_thread = std::thread::current().id();
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|id| *id != async_thread));
    }

    #[tokio::test]
    async fn custom_loader_failures_keep_the_template_name() {
        let loader = |_: &str| -> std::io::Result<Option<String>> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"))
        };
        let renderer = Renderer::new(Loader::custom(loader), &HelperSet::new(), true).unwrap();

        let err = renderer.render("dyn.html", &Context::new()).await.unwrap_err();
        match err {
            RenderError::Io { path, source } => {
                assert_eq!(path, PathBuf::from("dyn.html"));
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_include_keeps_engine_message() {
        let renderer = Renderer::new(
            sources(&[("page.html", "before {% include 'partial.html' %}")]),
            &HelperSet::new(),
            true,
        )
        .unwrap();

        let err = renderer.render("page.html", &Context::new()).await.unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
        let text = err.to_string();
        assert!(text.contains("partial.html"), "{text}");
        assert_ne!(text, "Template 'page.html' not found");
    }

    #[tokio::test]
    async fn directory_loader_compiles_nested_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("partials")).unwrap();
        std::fs::write(dir.path().join("partials/name.html"), "[{{ name }}]").unwrap();
        std::fs::write(
            dir.path().join("page.html"),
            "hello {% include 'partials/name.html' %}",
        )
        .unwrap();

        let renderer = Renderer::new(
            Loader::directory(DirectoryLoader::new(dir.path())),
            &HelperSet::new(),
            true,
        )
        .unwrap();
        assert_eq!(
            renderer.registry().names().collect::<Vec<_>>(),
            vec!["page.html", "partials/name.html"]
        );

        let out = renderer
            .render("page.html", &ctx(&[("name", "web")]))
            .await
            .unwrap();
        assert_eq!(out, "hello [web]");
    }

    #[tokio::test]
    async fn directory_loader_without_reload_keeps_first_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "v1").unwrap();

        let renderer = Renderer::new(
            Loader::directory(DirectoryLoader::new(dir.path())),
            &HelperSet::new(),
            true,
        )
        .unwrap();
        std::fs::write(&path, "v2").unwrap();

        let out = renderer.render("page.html", &Context::new()).await.unwrap();
        assert_eq!(out, "v1");
    }

    #[tokio::test]
    async fn directory_loader_with_reload_picks_up_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "v1 {{ x }}").unwrap();

        let renderer = Renderer::new(
            Loader::directory(DirectoryLoader::new(dir.path()).auto_reload(true)),
            &HelperSet::new(),
            true,
        )
        .unwrap();
        let data = ctx(&[("x", "<")]);

        assert_eq!(renderer.render("page.html", &data).await.unwrap(), "v1 &lt;");
        std::fs::write(&path, "v2 {{ x }}").unwrap();
        assert_eq!(renderer.render("page.html", &data).await.unwrap(), "v2 &lt;");

        std::fs::write(dir.path().join("new.html"), "new").unwrap();
        assert_eq!(renderer.render("new.html", &data).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn directory_loader_with_reload_reports_unreadable_templates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "v1").unwrap();

        let renderer = Renderer::new(
            Loader::directory(DirectoryLoader::new(dir.path()).auto_reload(true)),
            &HelperSet::new(),
            true,
        )
        .unwrap();
        std::fs::write(&path, [0xff, 0xfe, 0xfd]).unwrap();

        let err = renderer.render("page.html", &Context::new()).await.unwrap_err();
        match err {
            RenderError::Io {
                path: failed,
                source,
            } => {
                assert_eq!(failed, path);
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
