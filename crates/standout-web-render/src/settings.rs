//! Declarative render settings.
//!
//! [`RenderSettings`] captures the setup-time options of a render environment
//! in a serde-friendly form so they can live in a YAML file next to the
//! templates:
//!
//! ```yaml
//! template_dir: templates
//! auto_reload: true
//! static_root_url: /static
//! diagnostics: false
//! ```
//!
//! Every field is optional; missing fields take the defaults documented on
//! [`RenderSettings::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::template::DEFAULT_EXTENSIONS;

/// Key an environment is installed under unless configured otherwise.
pub const DEFAULT_APP_KEY: &str = "standout_web_environment";

/// Setup-time options for a render environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Directory to load templates from.
    pub template_dir: Option<PathBuf>,
    /// Re-read template files on every render.
    pub auto_reload: bool,
    /// File extensions recognised as templates.
    pub extensions: Vec<String>,
    /// Base URL for the `static()` helper.
    pub static_root_url: Option<String>,
    /// Install the `url` and `static` helpers.
    pub default_helpers: bool,
    /// HTML-escape interpolated values.
    pub autoescape: bool,
    /// Include the failure reason in 500 response bodies.
    pub diagnostics: bool,
    /// Key the environment is installed under.
    pub app_key: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            template_dir: None,
            auto_reload: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            static_root_url: None,
            default_helpers: true,
            autoescape: true,
            diagnostics: true,
            app_key: DEFAULT_APP_KEY.to_string(),
        }
    }
}

impl RenderSettings {
    /// Parses settings from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, SetupError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses a YAML settings file.
    ///
    /// A relative `template_dir` is resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut settings = Self::from_yaml(&content)?;

        if let (Some(dir), Some(base)) = (settings.template_dir.as_ref(), path.parent()) {
            if dir.is_relative() {
                settings.template_dir = Some(base.join(dir));
            }
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = RenderSettings::from_yaml("").unwrap();
        assert_eq!(settings, RenderSettings::default());
        assert!(settings.autoescape);
        assert!(settings.default_helpers);
        assert_eq!(settings.app_key, DEFAULT_APP_KEY);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let settings = RenderSettings::from_yaml(
            r#"
static_root_url: /static
auto_reload: true
"#,
        )
        .unwrap();
        assert_eq!(settings.static_root_url.as_deref(), Some("/static"));
        assert!(settings.auto_reload);
        assert!(settings.autoescape);
        assert!(settings.extensions.iter().any(|e| e == ".html"));
    }

    #[test]
    fn invalid_yaml_is_a_settings_error() {
        let err = RenderSettings::from_yaml("autoescape: [not, a, bool]").unwrap_err();
        assert!(matches!(err, SetupError::Settings(_)));
    }

    #[test]
    fn from_file_resolves_relative_template_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.yaml");
        std::fs::write(&path, "template_dir: templates\n").unwrap();

        let settings = RenderSettings::from_file(&path).unwrap();
        assert_eq!(settings.template_dir, Some(dir.path().join("templates")));
    }
}
