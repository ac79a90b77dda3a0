//! Demo application for `standout-web`.
//!
//! Three pages share one environment built from a template directory:
//!
//! - `/` renders `index.html` with the application name
//! - `/valid` renders a page that passes HTML validation
//! - `/translation` renders `translation.html` in the visitor's locale
//!
//! Static files are served under `/static`, and `static_root_url` points
//! there so templates can use `static(...)`.

pub mod locale;

use std::path::PathBuf;

use axum::routing::get;
use axum::Router;
use serde_json::json;
use standout_web::{
    handler_fn, setup, template, RenderEnvironment, RenderSettings, RouteTable,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use locale::{Catalog, LocaleProcessor};

pub const STATIC_PREFIX: &str = "/static";

/// Everything the demo needs to build its router.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub name: String,
    pub settings: RenderSettings,
    pub static_dir: PathBuf,
    pub catalog: Catalog,
}

impl DemoConfig {
    /// Configuration using the files shipped with this crate.
    pub fn bundled() -> anyhow::Result<Self> {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let settings = RenderSettings {
            template_dir: Some(root.join("templates")),
            static_root_url: Some(STATIC_PREFIX.to_string()),
            ..RenderSettings::default()
        };
        Ok(Self {
            name: "Testing standout-web".to_string(),
            settings,
            static_dir: root.join("static"),
            catalog: Catalog::from_file(root.join("locales/messages.yaml"))?,
        })
    }
}

/// Named routes, shared by the router and the `url()` helper.
pub fn routes() -> RouteTable {
    RouteTable::new()
        .route("index", "/")
        .route("valid", "/valid")
        .route("translation", "/translation")
}

pub fn build_app(config: &DemoConfig) -> anyhow::Result<Router> {
    let routes = routes();

    let env = RenderEnvironment::builder()
        .settings(&config.settings)
        .routes(routes.clone())
        .context_processor(LocaleProcessor::new(config.catalog.clone()))
        .build()?;
    tracing::info!(templates = env.renderer().registry().len(), "render environment ready");

    let name = config.name.clone();
    let index = handler_fn(move |_req| {
        let title = name.clone();
        async move {
            Ok::<_, anyhow::Error>(json!({
                "title": title,
                "intro": "Success! you've setup a basic axum app with standout-web.",
            }))
        }
    });

    let valid = handler_fn(|_req| async {
        Ok::<_, anyhow::Error>(json!({
            "title": "Valid W3C page",
            "intro": "Validated on https://validator.w3.org",
        }))
    });

    let translation = handler_fn(|_req| async {
        Ok::<_, anyhow::Error>(json!({ "title": "First page" }))
    });

    let router = Router::new()
        .route(pattern(&routes, "index")?, get(template("index.html", index)))
        .route(pattern(&routes, "valid")?, get(template("valid.html", valid)))
        .route(
            pattern(&routes, "translation")?,
            get(template("translation.html", translation)),
        )
        .nest_service(STATIC_PREFIX, ServeDir::new(&config.static_dir));

    Ok(setup(router, env).layer(TraceLayer::new_for_http()))
}

fn pattern<'a>(routes: &'a RouteTable, name: &str) -> anyhow::Result<&'a str> {
    routes
        .pattern(name)
        .ok_or_else(|| anyhow::anyhow!("route '{}' is not defined", name))
}
