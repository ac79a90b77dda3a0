//! Template helpers.
//!
//! A [`HelperSet`] is the collection of callables installed into the engine
//! at setup. Two helpers ship by default:
//!
//! - `url(endpoint, **params)` reverses a named route into a path, see [`url`].
//! - `static(path)` joins a path onto the configured static root URL.
//!
//! Both can be switched off with [`HelperSet::defaults`]. A template that
//! calls `url(...)` in that case fails at render time with
//! [`RenderError::HelperMissing`](crate::RenderError::HelperMissing).
//!
//! Custom helpers are added with [`HelperSet::function`]. They are registered
//! as template globals *and* as filters, so `add_2(5)` and `5|add_2` both work.
//! Custom helpers are installed after the defaults, so registering a custom
//! `url` replaces the built-in one.

mod static_files;
pub mod url;

use std::sync::Arc;

use minijinja::value::{Rest, Value};
use minijinja::{Environment, Error, ErrorKind, State};

pub use url::{RouteTable, UrlReverser};

/// Failure raised by a helper while a template is rendering.
///
/// Helpers attach this as the source of the engine error so the renderer can
/// report it precisely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HelperError {
    /// A `url()` parameter was neither a string nor an integer.
    #[error("argument value should be str or int, got {name} -> [{kind}] {value}")]
    Argument {
        name: String,
        kind: String,
        value: String,
    },

    /// `static()` was called without a configured root.
    #[error("static_root_url is not set; configure it to use the static() helper")]
    StaticRootMissing,

    /// `url()` named a route nobody registered.
    #[error("route '{0}' is not registered")]
    UnknownRoute(String),

    /// A route placeholder had no matching parameter.
    #[error("route '{route}' requires parameter '{param}'")]
    MissingParameter { route: String, param: String },

    /// A parameter matched no placeholder of the route.
    #[error("route '{route}' has no parameter '{param}'")]
    UnexpectedParameter { route: String, param: String },
}

impl HelperError {
    /// Wraps the error so it can be returned from a template function.
    pub(crate) fn into_engine(self) -> Error {
        Error::new(ErrorKind::InvalidOperation, self.to_string()).with_source(self)
    }
}

/// The helpers installed into a render environment.
#[derive(Clone)]
pub struct HelperSet {
    defaults: bool,
    routes: Option<Arc<dyn UrlReverser>>,
    static_root_url: Option<String>,
    functions: Vec<(String, Value)>,
    globals: Vec<(String, Value)>,
}

impl Default for HelperSet {
    fn default() -> Self {
        Self {
            defaults: true,
            routes: None,
            static_root_url: None,
            functions: Vec::new(),
            globals: Vec::new(),
        }
    }
}

impl std::fmt::Debug for HelperSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperSet")
            .field("defaults", &self.defaults)
            .field("routes", &self.routes.is_some())
            .field("static_root_url", &self.static_root_url)
            .field(
                "functions",
                &self.functions.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field(
                "globals",
                &self.globals.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl HelperSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the built-in `url` and `static` helpers.
    pub fn defaults(mut self, enabled: bool) -> Self {
        self.defaults = enabled;
        self
    }

    /// Sets the route reverser behind `url()`.
    pub fn routes(mut self, routes: impl UrlReverser + 'static) -> Self {
        self.routes = Some(Arc::new(routes));
        self
    }

    /// Sets the route reverser from an already shared handle.
    pub fn shared_routes(mut self, routes: Arc<dyn UrlReverser>) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Sets the base URL for `static()`.
    pub fn static_root_url(mut self, url: impl Into<String>) -> Self {
        self.static_root_url = Some(url.into());
        self
    }

    /// Adds a callable helper, available as a global and as a filter.
    pub fn function(mut self, name: impl Into<String>, helper: impl Into<Value>) -> Self {
        self.functions.push((name.into(), helper.into()));
        self
    }

    /// Adds a plain global value.
    pub fn global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.push((name.into(), value.into()));
        self
    }

    pub fn has_defaults(&self) -> bool {
        self.defaults
    }

    /// Installs every helper into `env`.
    ///
    /// Later registrations replace earlier ones with the same name.
    pub fn install(&self, env: &mut Environment<'static>) {
        if self.defaults {
            env.add_function("url", url::url_helper(self.routes.clone()));
            env.add_function(
                "static",
                static_files::static_helper(self.static_root_url.clone()),
            );
        }

        for (name, value) in &self.globals {
            env.add_global(name.clone(), value.clone());
        }

        for (name, helper) in &self.functions {
            env.add_global(name.clone(), helper.clone());
            let helper = helper.clone();
            env.add_filter(
                name.clone(),
                move |state: &State, value: Value, rest: Rest<Value>| -> Result<Value, Error> {
                    let mut args = Vec::with_capacity(rest.len() + 1);
                    args.push(value);
                    args.extend(rest.iter().cloned());
                    helper.call(state, &args)
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    fn env_with(helpers: &HelperSet) -> Environment<'static> {
        let mut env = Environment::new();
        helpers.install(&mut env);
        env
    }

    #[test]
    fn custom_function_is_global_and_filter() {
        let helpers = HelperSet::new().function("add_2", Value::from_function(|x: i64| x + 2));
        let env = env_with(&helpers);

        assert_eq!(env.render_str("${{ add_2(5) }}", context! {}).unwrap(), "$7");
        assert_eq!(env.render_str("{{ 5|add_2 }}", context! {}).unwrap(), "7");
    }

    #[test]
    fn custom_function_overrides_default_url() {
        let helpers =
            HelperSet::new().function("url", Value::from_function(|_name: String| "custom"));
        let env = env_with(&helpers);
        assert_eq!(
            env.render_str("{{ url('anything') }}", context! {}).unwrap(),
            "custom"
        );
    }

    #[test]
    fn disabled_defaults_leave_url_unknown() {
        let env = env_with(&HelperSet::new().defaults(false));
        let err = env.render_str("{{ url('index') }}", context! {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFunction);
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn globals_are_visible() {
        let env = env_with(&HelperSet::new().global("site", "Example"));
        assert_eq!(env.render_str("{{ site }}", context! {}).unwrap(), "Example");
    }

    #[test]
    fn helper_error_messages() {
        let err = HelperError::Argument {
            name: "arg".into(),
            kind: "bool".into(),
            value: "true".into(),
        };
        assert_eq!(
            err.to_string(),
            "argument value should be str or int, got arg -> [bool] true"
        );
        assert!(HelperError::StaticRootMissing
            .to_string()
            .contains("static_root_url"));
    }
}
