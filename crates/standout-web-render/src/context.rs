//! The template context mapping.
//!
//! Every render call receives a [`Context`]: an ordered, string-keyed map of
//! template values. Contexts are assembled by merging contributions (context
//! processors first, the handler's own data last) and are never shared between
//! requests.
//!
//! # Building a context
//!
//! ```rust
//! use standout_web_render::Context;
//!
//! let mut ctx = Context::new();
//! ctx.insert("user", "alice");
//! ctx.insert("count", 3);
//!
//! #[derive(serde::Serialize)]
//! struct Page { title: &'static str }
//!
//! let page = Context::from_serialize(&Page { title: "Home" }).unwrap();
//! let merged = ctx.merged(&page);
//! assert_eq!(merged.len(), 3);
//! ```
//!
//! Anything that does not serialize to a map is rejected with
//! [`RenderError::InvalidContextType`].

use std::collections::BTreeMap;

use minijinja::value::{Value, ValueKind};
use serde::Serialize;

use crate::error::RenderError;

/// An ordered mapping of names to template values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    entries: BTreeMap<String, Value>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from any serializable value.
    ///
    /// Fails with [`RenderError::InvalidContextType`] unless the value
    /// serializes to a map.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self, RenderError> {
        Self::from_value(Value::from_serialize(data))
    }

    /// Builds a context from a template value, which must be a map.
    pub fn from_value(value: Value) -> Result<Self, RenderError> {
        if value.kind() != ValueKind::Map {
            return Err(RenderError::InvalidContextType(value.kind().to_string()));
        }

        let keys = value
            .try_iter()
            .map_err(|_| RenderError::InvalidContextType(value.kind().to_string()))?;

        let mut entries = BTreeMap::new();
        for key in keys {
            let item = value.get_item(&key).map_err(RenderError::Template)?;
            let name = match key.as_str() {
                Some(s) => s.to_string(),
                None => key.to_string(),
            };
            entries.insert(name, item);
        }
        Ok(Self { entries })
    }

    /// Inserts a value, replacing any previous value under the same name.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Copies every entry of `other` into `self`; keys from `other` win.
    pub fn extend(&mut self, other: &Context) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Returns a new context with `other` layered over `self`.
    ///
    /// Neither input is modified.
    pub fn merged(&self, other: &Context) -> Context {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    /// Converts the context into a single map value for the engine.
    pub fn to_value(&self) -> Value {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Serialize for Context {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl TryFrom<Value> for Context {
    type Error = RenderError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Context::from_value(value)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Context::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}
