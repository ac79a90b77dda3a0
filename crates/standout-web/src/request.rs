//! A cheap, cloneable view of the incoming request.
//!
//! Handlers consume the request body, but rendering still needs the request
//! line, headers and the scope chain installed by [`setup`](crate::setup).
//! [`RequestHead`] captures those once, before the handler runs, and is what
//! context processors and the render functions receive.
//!
//! In templates the head is available as `request`:
//!
//! ```jinja
//! {{ request.method }} {{ request.path }}?{{ request.query_string }}
//! {{ request.headers['user-agent'] }}
//! ```

use std::fmt;
use std::sync::Arc;

use axum::extract::{MatchedPath, OriginalUri, Request};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, Method, Uri};
use standout_web_render::minijinja::value::{Enumerator, Object, Value};

use crate::environment::RenderEnvironment;
use crate::error::Error;
use crate::scope::ScopeChain;

struct Head {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
}

/// Snapshot of a request's method, URI, headers and extensions.
#[derive(Clone)]
pub struct RequestHead {
    inner: Arc<Head>,
}

impl RequestHead {
    /// Captures the head of a request without touching its body.
    pub fn from_request<B>(request: &axum::http::Request<B>) -> Self {
        Self::build(
            request.method(),
            request.uri(),
            request.headers(),
            request.extensions(),
        )
    }

    /// Captures the head from already split request parts.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::build(&parts.method, &parts.uri, &parts.headers, &parts.extensions)
    }

    fn build(method: &Method, uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> Self {
        // Nested routers strip their prefix from the URI; keep the one the client sent.
        let uri = extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| uri.clone());
        Self {
            inner: Arc::new(Head {
                method: method.clone(),
                uri,
                headers: headers.clone(),
                extensions: extensions.clone(),
            }),
        }
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// The URI as the client sent it.
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.inner.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    pub fn extensions(&self) -> &Extensions {
        &self.inner.extensions
    }

    /// The route pattern that matched, such as `/user/{name}`.
    pub fn matched_path(&self) -> Option<&str> {
        self.inner
            .extensions
            .get::<MatchedPath>()
            .map(|matched| matched.as_str())
    }

    /// The scope chain installed by `setup`, outermost scope first.
    pub fn scope_chain(&self) -> Option<&ScopeChain> {
        self.inner.extensions.get::<ScopeChain>()
    }

    /// The innermost environment installed under `app_key`.
    pub fn environment(&self, app_key: &str) -> Result<Arc<RenderEnvironment>, Error> {
        self.scope_chain()
            .and_then(|chain| chain.find(app_key))
            .cloned()
            .ok_or_else(|| Error::NotInitialized {
                app_key: app_key.to_string(),
            })
    }

    /// The head as a template value.
    pub fn to_value(&self) -> Value {
        Value::from_object(RequestObject(self.clone()))
    }
}

impl From<&Request> for RequestHead {
    fn from(request: &Request) -> Self {
        RequestHead::from_request(request)
    }
}

impl fmt::Debug for RequestHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHead")
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .field("headers", &self.inner.headers)
            .finish_non_exhaustive()
    }
}

const REQUEST_ATTRIBUTES: &[&str] = &[
    "method",
    "path",
    "query_string",
    "url",
    "headers",
    "matched_path",
];

#[derive(Debug)]
struct RequestObject(RequestHead);

impl Object for RequestObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let head = &self.0;
        let value = match key.as_str()? {
            "method" => Value::from(head.method().as_str()),
            "path" => Value::from(head.path()),
            "query_string" => Value::from(head.query().unwrap_or_default()),
            "url" => Value::from(head.uri().to_string()),
            "headers" => head
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect(),
            "matched_path" => head.matched_path().map(Value::from).unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(REQUEST_ATTRIBUTES)
    }
}
