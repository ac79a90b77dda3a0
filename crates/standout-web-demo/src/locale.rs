//! Per-request locale selection.
//!
//! [`LocaleProcessor`] reads `Accept-Language`, picks the best locale the
//! [`Catalog`] knows about and contributes two template values:
//!
//! - `locale`: the selected locale tag, e.g. `fr_FR`
//! - `gettext(msgid)`: looks `msgid` up in that locale, falling back to the
//!   message id itself

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use axum::http::header::ACCEPT_LANGUAGE;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use standout_web::minijinja::Value;
use standout_web::{Context, ContextProcessor, RequestHead};

type Messages = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    default: String,
    #[serde(default)]
    locales: BTreeMap<String, Messages>,
}

/// Translated messages keyed by locale.
#[derive(Debug, Clone)]
pub struct Catalog {
    default: String,
    locales: BTreeMap<String, Arc<Messages>>,
}

impl Catalog {
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        let mut locales: BTreeMap<String, Arc<Messages>> = file
            .locales
            .into_iter()
            .map(|(tag, messages)| (tag, Arc::new(messages)))
            .collect();
        locales.entry(file.default.clone()).or_default();
        Ok(Self {
            default: file.default,
            locales,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&text)
    }

    pub fn default_locale(&self) -> &str {
        &self.default
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(String::as_str)
    }

    /// Picks the locale for an `Accept-Language` header value.
    ///
    /// Tags are tried by descending quality. A tag matches a locale exactly
    /// (ignoring case and `-`/`_`) or by its primary language.
    pub fn negotiate(&self, accept_language: &str) -> &str {
        for tag in preferred_tags(accept_language) {
            if let Some(locale) = self.lookup(&tag) {
                return locale;
            }
        }
        &self.default
    }

    pub fn translate(&self, locale: &str, msgid: &str) -> String {
        self.locales
            .get(locale)
            .and_then(|messages| messages.get(msgid))
            .cloned()
            .unwrap_or_else(|| msgid.to_string())
    }

    fn lookup(&self, tag: &str) -> Option<&str> {
        let wanted = normalize(tag);
        if let Some(key) = self.locales.keys().find(|key| normalize(key) == wanted) {
            return Some(key.as_str());
        }
        let primary = wanted.split('_').next()?;
        self.locales
            .keys()
            .find(|key| normalize(key).split('_').next() == Some(primary))
            .map(String::as_str)
    }

    fn messages(&self, locale: &str) -> Arc<Messages> {
        self.locales.get(locale).cloned().unwrap_or_default()
    }
}

fn normalize(tag: &str) -> String {
    tag.trim().replace('-', "_").to_ascii_lowercase()
}

/// Language tags of an `Accept-Language` value, best first.
fn preferred_tags(header: &str) -> Vec<String> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then(|| (tag.to_string(), quality))
        })
        .collect();
    // stable: equal qualities keep header order
    tags.sort_by(|a, b| b.1.total_cmp(&a.1));
    tags.into_iter().map(|(tag, _)| tag).collect()
}

/// Contributes `locale` and `gettext` to every template.
#[derive(Clone)]
pub struct LocaleProcessor {
    catalog: Arc<Catalog>,
}

impl LocaleProcessor {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

impl fmt::Debug for LocaleProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocaleProcessor")
            .field("default", &self.catalog.default)
            .finish_non_exhaustive()
    }
}

impl ContextProcessor for LocaleProcessor {
    fn process<'a>(
        &'a self,
        request: &'a RequestHead,
        _context: &'a Context,
    ) -> BoxFuture<'a, anyhow::Result<Context>> {
        let header = request
            .headers()
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let locale = self.catalog.negotiate(header).to_string();
        let messages = self.catalog.messages(&locale);

        let mut context = Context::new();
        context.insert("locale", locale);
        context.insert(
            "gettext",
            Value::from_function(move |msgid: String| {
                messages.get(&msgid).cloned().unwrap_or(msgid)
            }),
        );
        futures::future::ready(Ok(context)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_yaml(
            r#"
default: en_GB
locales:
  ca:
    Hello: Hola
  fr_FR:
    Hello: Bonjour
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_default_locale_is_always_known() {
        let catalog = catalog();
        assert_eq!(catalog.default_locale(), "en_GB");
        assert_eq!(
            catalog.locales().collect::<Vec<_>>(),
            vec!["ca", "en_GB", "fr_FR"]
        );
    }

    #[test]
    fn test_negotiate_exact_tag() {
        assert_eq!(catalog().negotiate("fr-fr"), "fr_FR");
    }

    #[test]
    fn test_negotiate_primary_language() {
        assert_eq!(catalog().negotiate("fr-CA"), "fr_FR");
        assert_eq!(catalog().negotiate("ca-ES"), "ca");
    }

    #[test]
    fn test_negotiate_by_quality() {
        assert_eq!(catalog().negotiate("de;q=0.9, ca;q=0.5, fr;q=0.8"), "fr_FR");
    }

    #[test]
    fn test_negotiate_falls_back_to_default() {
        assert_eq!(catalog().negotiate(""), "en_GB");
        assert_eq!(catalog().negotiate("de, *"), "en_GB");
        assert_eq!(catalog().negotiate("fr;q=0"), "en_GB");
    }

    #[test]
    fn test_translate_falls_back_to_msgid() {
        let catalog = catalog();
        assert_eq!(catalog.translate("ca", "Hello"), "Hola");
        assert_eq!(catalog.translate("ca", "Goodbye"), "Goodbye");
        assert_eq!(catalog.translate("en_GB", "Hello"), "Hello");
    }

    #[tokio::test]
    async fn test_processor_contributes_locale_and_gettext() {
        let request = axum::http::Request::builder()
            .uri("/")
            .header(ACCEPT_LANGUAGE, "ca")
            .body(())
            .unwrap();
        let head = RequestHead::from_request(&request);

        let processor = LocaleProcessor::new(catalog());
        let ctx = processor.process(&head, &Context::new()).await.unwrap();

        assert_eq!(ctx.get("locale").unwrap().as_str(), Some("ca"));
        let gettext = ctx.get("gettext").unwrap();
        let env = standout_web::minijinja::Environment::new();
        let state = env.empty_state();
        let out = gettext.call(&state, &[Value::from("Hello")]).unwrap();
        assert_eq!(out.as_str(), Some("Hola"));
    }
}
