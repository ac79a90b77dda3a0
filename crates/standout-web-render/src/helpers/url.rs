//! Route reversal for the `url()` helper.
//!
//! `url()` turns a route name and parameters into a path:
//!
//! ```jinja
//! {{ url('index') }}                          {# / #}
//! {{ url('user', name='John Doe') }}          {# /user/John%20Doe #}
//! {{ url('uid', uid=1) }}                     {# /uid/1 #}
//! {{ url('index', query_={'foo': 'bar'}) }}   {# /?foo=bar #}
//! ```
//!
//! Parameter values must be strings or integers and are percent-encoded. The
//! reserved `query_` parameter takes a mapping, serialised as the query
//! string.
//!
//! The reversal itself goes through the [`UrlReverser`] trait. [`RouteTable`]
//! is the implementation shipped with this crate. It stores named patterns in
//! the same `{param}` syntax the router uses, so one table can drive both.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::value::{Kwargs, Value, ValueKind};
use minijinja::Error;

use super::HelperError;

/// Name of the parameter that carries query arguments.
pub const QUERY_PARAM: &str = "query_";

/// Turns a route name plus parameters into a path.
pub trait UrlReverser: Send + Sync {
    fn reverse(&self, name: &str, params: &[(String, String)]) -> Result<String, HelperError>;
}

impl<T: UrlReverser + ?Sized> UrlReverser for Arc<T> {
    fn reverse(&self, name: &str, params: &[(String, String)]) -> Result<String, HelperError> {
        (**self).reverse(name, params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Param(String),
    /// `{*rest}`: may span several segments, slashes kept.
    Wildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RoutePattern {
    raw: String,
    pieces: Vec<Piece>,
}

impl RoutePattern {
    fn parse(raw: &str) -> Self {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut rest = raw;

        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            literal.push_str(&rest[..start]);
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            let inner = &rest[start + 1..start + len];
            match inner.strip_prefix('*') {
                Some(name) => pieces.push(Piece::Wildcard(name.to_string())),
                None => pieces.push(Piece::Param(inner.to_string())),
            }
            rest = &rest[start + len + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Self {
            raw: raw.to_string(),
            pieces,
        }
    }

    fn build(&self, route: &str, params: &[(String, String)]) -> Result<String, HelperError> {
        for (key, _) in params {
            let known = self.pieces.iter().any(|p| match p {
                Piece::Param(name) | Piece::Wildcard(name) => name == key,
                Piece::Literal(_) => false,
            });
            if !known {
                return Err(HelperError::UnexpectedParameter {
                    route: route.to_string(),
                    param: key.clone(),
                });
            }
        }

        let lookup = |name: &str| {
            params
                .iter()
                .rev()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .ok_or_else(|| HelperError::MissingParameter {
                    route: route.to_string(),
                    param: name.to_string(),
                })
        };

        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Param(name) => out.push_str(&encode_segment(lookup(name)?)),
                Piece::Wildcard(name) => {
                    let value = lookup(name)?;
                    let encoded: Vec<String> = value.split('/').map(encode_segment).collect();
                    out.push_str(&encoded.join("/"));
                }
            }
        }
        Ok(out)
    }
}

/// Named route patterns.
///
/// ```rust
/// use standout_web_render::RouteTable;
/// use standout_web_render::helpers::UrlReverser;
///
/// let admin = RouteTable::new().route("admin_user", "/users/{id}");
/// let routes = RouteTable::new()
///     .route("index", "/")
///     .nest("/admin", &admin);
///
/// let params = vec![("id".to_string(), "7".to_string())];
/// assert_eq!(routes.reverse("admin_user", &params).unwrap(), "/admin/users/7");
/// assert_eq!(routes.pattern("admin_user"), Some("/admin/users/{id}"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, RoutePattern>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named route. A second route with the same name replaces the first.
    pub fn route(mut self, name: impl Into<String>, pattern: &str) -> Self {
        self.add(name, pattern);
        self
    }

    pub fn add(&mut self, name: impl Into<String>, pattern: &str) {
        self.routes.insert(name.into(), RoutePattern::parse(pattern));
    }

    /// Copies every route of `child` under `prefix`.
    ///
    /// A child route at `/` maps to the prefix itself, matching how the router
    /// nests a sub-router.
    pub fn nest(mut self, prefix: &str, child: &RouteTable) -> Self {
        let prefix = prefix.trim_end_matches('/');
        for (name, pattern) in &child.routes {
            let joined = if pattern.raw == "/" || pattern.raw.is_empty() {
                if prefix.is_empty() {
                    "/".to_string()
                } else {
                    prefix.to_string()
                }
            } else {
                format!("{}{}", prefix, pattern.raw)
            };
            self.routes.insert(name.clone(), RoutePattern::parse(&joined));
        }
        self
    }

    /// The raw pattern of a route, for handing to the router.
    pub fn pattern(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(|p| p.raw.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(|s| s.as_str())
    }
}

impl UrlReverser for RouteTable {
    fn reverse(&self, name: &str, params: &[(String, String)]) -> Result<String, HelperError> {
        self.routes
            .get(name)
            .ok_or_else(|| HelperError::UnknownRoute(name.to_string()))?
            .build(name, params)
    }
}

/// Percent-encodes one path segment. Spaces become `%20`, not `+`.
fn encode_segment(value: &str) -> String {
    ::url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Renders a `url()` parameter value to text, or rejects it.
fn param_text(name: &str, value: &Value) -> Result<String, HelperError> {
    let accepted = match value.kind() {
        ValueKind::String => true,
        ValueKind::Number => value.as_i64().is_some() && is_integer_repr(&value.to_string()),
        _ => false,
    };
    if !accepted {
        return Err(HelperError::Argument {
            name: name.to_string(),
            kind: value.kind().to_string(),
            value: value.to_string(),
        });
    }
    Ok(match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    })
}

/// `as_i64` also converts integral floats such as `1.0`; only integer reprs count.
fn is_integer_repr(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn query_string(value: &Value) -> Result<String, HelperError> {
    let invalid = || HelperError::Argument {
        name: QUERY_PARAM.to_string(),
        kind: value.kind().to_string(),
        value: value.to_string(),
    };
    if value.kind() != ValueKind::Map {
        return Err(invalid());
    }

    let mut serializer = ::url::form_urlencoded::Serializer::new(String::new());
    let keys = value.try_iter().map_err(|_| invalid())?;
    for key in keys {
        let item = value.get_item(&key).map_err(|_| invalid())?;
        let key_text = key.as_str().map(str::to_string).unwrap_or_else(|| key.to_string());
        let item_text = item
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| item.to_string());
        serializer.append_pair(&key_text, &item_text);
    }
    Ok(serializer.finish())
}

/// Builds the template function behind `url()`.
pub(crate) fn url_helper(
    routes: Option<Arc<dyn UrlReverser>>,
) -> impl Fn(String, Kwargs) -> Result<Value, Error> + Send + Sync + 'static {
    move |endpoint: String, kwargs: Kwargs| {
        let mut params = Vec::new();
        let mut query = String::new();

        for key in kwargs.args() {
            let value: Value = kwargs.get(key)?;
            if key == QUERY_PARAM {
                query = query_string(&value).map_err(HelperError::into_engine)?;
            } else {
                let text = param_text(key, &value).map_err(HelperError::into_engine)?;
                params.push((key.to_string(), text));
            }
        }

        let path = match &routes {
            Some(routes) => routes.reverse(&endpoint, &params),
            None => Err(HelperError::UnknownRoute(endpoint.clone())),
        }
        .map_err(HelperError::into_engine)?;

        // Encoded above; escaping again would mangle the slashes.
        if query.is_empty() {
            Ok(Value::from_safe_string(path))
        } else {
            Ok(Value::from_safe_string(format!("{}?{}", path, query)))
        }
    }
}
