//! Installing render environments on routers.
//!
//! [`setup`] wraps a router's routes in a layer that records the environment
//! on every request it handles. Nesting routers nests the layers, so a
//! request that reaches a sub-application carries the environments of every
//! enclosing application, outermost first. That [`ScopeChain`] is what lets
//! context processors of a parent apply to pages rendered by a child.
//!
//! ```rust,ignore
//! let admin = setup(
//!     Router::new().route("/", get(template("admin.html", admin_index))),
//!     admin_env,
//! );
//!
//! let app = setup(
//!     Router::new()
//!         .route("/", get(template("index.html", index)))
//!         .nest("/admin", admin),
//!     site_env,
//! );
//! ```
//!
//! `Router::layer` only wraps routes that already exist, so call `setup` after
//! the routes and nested routers are added.

use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::Router;

use crate::environment::RenderEnvironment;
use crate::error;
use crate::pipeline;

/// The environments active for one request, outermost first.
#[derive(Debug, Clone, Default)]
pub struct ScopeChain {
    environments: Vec<Arc<RenderEnvironment>>,
}

impl ScopeChain {
    pub fn environments(&self) -> &[Arc<RenderEnvironment>] {
        &self.environments
    }

    /// The innermost environment installed under `app_key`.
    pub fn find(&self, app_key: &str) -> Option<&Arc<RenderEnvironment>> {
        self.environments
            .iter()
            .rev()
            .find(|env| env.app_key() == app_key)
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    /// Records `env` as the innermost scope of `request`.
    pub(crate) fn enter(request: &mut Request, env: Arc<RenderEnvironment>) {
        let mut chain = request
            .extensions()
            .get::<ScopeChain>()
            .cloned()
            .unwrap_or_default();
        chain.environments.push(env);
        request.extensions_mut().insert(chain);
    }
}

/// Installs `env` as a scope over every route currently in `router`.
///
/// Environments built with
/// [`legacy_middleware`](crate::RenderEnvironmentBuilder::legacy_middleware)
/// also run the context processors here, before the handler.
pub fn setup<S>(router: Router<S>, env: impl Into<Arc<RenderEnvironment>>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let env: Arc<RenderEnvironment> = env.into();
    tracing::debug!(app_key = %env.app_key(), "installing render environment");

    router.layer(middleware::from_fn(move |mut request: Request, next: Next| {
        let env = env.clone();
        async move {
            let precompute = env.precomputes();
            let diagnostics = env.diagnostics();
            ScopeChain::enter(&mut request, env);
            if precompute {
                if let Err(err) = pipeline::precompute(&mut request).await {
                    return error::redact(err.to_response(diagnostics), diagnostics);
                }
            }
            let response = next.run(request).await;
            error::redact(response, diagnostics)
        }
    }))
}
