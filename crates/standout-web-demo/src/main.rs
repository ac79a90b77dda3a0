//! Demo server for standout-web.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use standout_web::RenderSettings;
use standout_web_demo::{build_app, Catalog, DemoConfig, STATIC_PREFIX};

#[derive(Parser, Debug)]
#[command(name = "standout-web-demo")]
#[command(about = "Serve the standout-web demo pages")]
struct Args {
    /// YAML render settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Template directory, overrides the settings file
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Directory served under /static
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Message catalog for the translation page
    #[arg(long)]
    locales: Option<PathBuf>,

    /// Re-read templates on every request
    #[arg(long)]
    reload: bool,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short = 'P', long, default_value = "8080")]
    port: u16,
}

impl Args {
    fn into_config(self) -> anyhow::Result<DemoConfig> {
        let mut config = DemoConfig::bundled()?;

        if let Some(path) = &self.settings {
            let bundled_dir = config.settings.template_dir.take();
            config.settings = RenderSettings::from_file(path)?;
            if config.settings.template_dir.is_none() {
                config.settings.template_dir = bundled_dir;
            }
            if config.settings.static_root_url.is_none() {
                config.settings.static_root_url = Some(STATIC_PREFIX.to_string());
            }
        }
        if let Some(dir) = self.templates {
            config.settings.template_dir = Some(dir);
        }
        if self.reload {
            config.settings.auto_reload = true;
        }
        if let Some(dir) = self.static_dir {
            config.static_dir = dir;
        }
        if let Some(path) = self.locales {
            config.catalog = Catalog::from_file(path)?;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "standout_web=debug,standout_web_demo=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let config = args.into_config()?;

    info!(
        templates = ?config.settings.template_dir,
        auto_reload = config.settings.auto_reload,
        "Starting demo"
    );

    let app = build_app(&config)?;

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Demo server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
