//! Error types for template rendering.
//!
//! [`RenderError`] is returned by every render-time operation. It hides the
//! underlying minijinja error kinds behind the taxonomy the web layer reports:
//! missing templates, non-mapping contexts, helper misuse and everything else
//! the template engine can raise.
//!
//! [`SetupError`] covers failures while building a [`Renderer`](crate::Renderer):
//! unreadable template directories, templates that do not compile, or invalid
//! settings files.

use std::fmt;
use std::path::PathBuf;

use crate::helpers::HelperError;

/// Error type for template rendering operations.
#[derive(Debug)]
pub enum RenderError {
    /// No template with this name is registered.
    TemplateNotFound(String),

    /// The handler produced something other than a mapping.
    ///
    /// Carries the kind of value that was observed (`number`, `seq`, ...).
    InvalidContextType(String),

    /// A helper received an argument it cannot use (wrong type, unknown
    /// route, missing route parameter).
    HelperArgument(HelperError),

    /// A template referenced a helper that is not installed.
    HelperMissing(String),

    /// `static()` was called but no static root URL is configured.
    StaticRootMissing,

    /// Any other template syntax or evaluation error.
    Template(minijinja::Error),

    /// A file-backed template could not be read.
    Io {
        /// Path of the template file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl RenderError {
    /// Human-readable reason, identical to the display text.
    ///
    /// The web layer uses this as the diagnostic response body.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Classifies an engine error raised while loading or rendering a template.
    ///
    /// Helper failures and template read failures are recovered from the
    /// error's source chain so they keep their own variant; unknown functions
    /// become [`RenderError::HelperMissing`]. Everything else, including a
    /// missing `include`/`extends` target, stays a [`RenderError::Template`]
    /// carrying the engine's message.
    pub fn from_engine(err: minijinja::Error) -> Self {
        if let Some(helper) = find_source::<HelperError>(&err) {
            return match helper {
                HelperError::StaticRootMissing => RenderError::StaticRootMissing,
                other => RenderError::HelperArgument(other.clone()),
            };
        }
        if let Some(read) = find_source::<TemplateReadError>(&err) {
            return RenderError::Io {
                path: read.path.clone(),
                source: std::io::Error::new(read.source.kind(), read.source.to_string()),
            };
        }

        match err.kind() {
            minijinja::ErrorKind::UnknownFunction => RenderError::HelperMissing(err.to_string()),
            _ => RenderError::Template(err),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::TemplateNotFound(name) => write!(f, "Template '{}' not found", name),
            RenderError::InvalidContextType(kind) => {
                write!(f, "context should be mapping, not {}", kind)
            }
            RenderError::HelperArgument(err) => write!(f, "{}", err),
            RenderError::HelperMissing(msg) => write!(f, "{}", msg),
            RenderError::StaticRootMissing => write!(f, "{}", HelperError::StaticRootMissing),
            RenderError::Template(err) => write!(f, "template error: {}", err),
            RenderError::Io { path, source } => {
                write!(f, "failed to read template {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::HelperArgument(err) => Some(err),
            RenderError::Template(err) => Some(err),
            RenderError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A template loader failed to read `path`.
///
/// Attached as the source of the engine error raised by the loader, and
/// turned back into [`RenderError::Io`] by [`RenderError::from_engine`].
#[derive(Debug, thiserror::Error)]
#[error("failed to read template {}: {source}", .path.display())]
pub(crate) struct TemplateReadError {
    pub(crate) path: PathBuf,
    #[source]
    pub(crate) source: std::io::Error,
}

/// Walks the source chain of an engine error looking for a `T`.
fn find_source<T: std::error::Error + 'static>(err: &minijinja::Error) -> Option<&T> {
    let mut source = std::error::Error::source(err);
    while let Some(current) = source {
        if let Some(found) = current.downcast_ref::<T>() {
            return Some(found);
        }
        source = current.source();
    }
    None
}

/// Error type for building a renderer.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// A template directory does not exist.
    #[error("template directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// A template failed to compile.
    #[error("failed to compile template '{name}': {source}")]
    Compile {
        /// Template name
        name: String,
        /// Compilation error from the engine
        #[source]
        source: minijinja::Error,
    },

    /// Reading templates from disk failed.
    #[error("failed to load templates: {0}")]
    Io(#[from] std::io::Error),

    /// No loader was configured.
    #[error("no template loader configured")]
    MissingLoader,

    /// A settings document could not be parsed.
    #[error("invalid render settings: {0}")]
    Settings(#[from] serde_yaml::Error),
}
