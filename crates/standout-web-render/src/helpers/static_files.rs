//! The `static()` helper.

use minijinja::{Error, Value};

use super::HelperError;

/// Joins `path` onto `root` with exactly one slash between them.
pub(crate) fn static_url(root: &str, path: &str) -> String {
    format!(
        "{}/{}",
        root.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub(crate) fn static_helper(
    root: Option<String>,
) -> impl Fn(String) -> Result<Value, Error> + Send + Sync + 'static {
    move |path: String| match &root {
        Some(root) => Ok(Value::from_safe_string(static_url(root, &path))),
        None => Err(HelperError::StaticRootMissing.into_engine()),
    }
}
