//! Template loaders and the name index built from them.
//!
//! A [`Loader`] says where templates come from. It takes one of four forms:
//!
//! | Form | Constructor | Resolution |
//! |------|-------------|------------|
//! | Name to source map | [`Loader::sources`] | compiled at setup |
//! | Pre-populated engine | [`Loader::engine`] | whatever the engine knows |
//! | Directory | [`Loader::directory`] | compiled at setup, or re-read per render |
//! | Custom object | [`Loader::custom`] | loaded on first use, cached by the engine |
//!
//! The [`TemplateRegistry`] is the read-only index produced at setup. It answers
//! one question: does a name resolve, and to what? Lookups are exact. There are
//! no partial matches and no fallback search paths.
//!
//! # Directory templates
//!
//! Templates in a directory are addressed by their path relative to the root,
//! extension included, with `/` separators on every platform:
//!
//! ```text
//! templates/
//! ├── index.html        -> "index.html"
//! └── admin/
//!     └── list.html     -> "admin/list.html"
//! ```
//!
//! Only files with a recognised extension are picked up; see
//! [`DEFAULT_EXTENSIONS`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use minijinja::Environment;

use crate::error::{RenderError, SetupError};

/// File extensions recognised as templates when scanning a directory.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".html", ".htm", ".xml", ".jinja", ".j2", ".txt"];

/// Lookup-by-name template source.
///
/// Returning `Ok(None)` means "no such template"; the renderer reports it as
/// [`RenderError::TemplateNotFound`].
pub trait TemplateLoader: Send + Sync + 'static {
    fn load(&self, name: &str) -> std::io::Result<Option<String>>;
}

impl<F> TemplateLoader for F
where
    F: Fn(&str) -> std::io::Result<Option<String>> + Send + Sync + 'static,
{
    fn load(&self, name: &str) -> std::io::Result<Option<String>> {
        self(name)
    }
}

/// Loads templates from a directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
    auto_reload: bool,
    extensions: Vec<String>,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            auto_reload: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Re-read template files on every render instead of compiling once.
    pub fn auto_reload(mut self, enabled: bool) -> Self {
        self.auto_reload = enabled;
        self
    }

    /// Replaces the recognised extensions. A leading dot is optional.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref();
                if ext.starts_with('.') {
                    ext.to_string()
                } else {
                    format!(".{}", ext)
                }
            })
            .collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_auto_reload(&self) -> bool {
        self.auto_reload
    }

    /// Whether `name` ends in one of the recognised extensions.
    pub fn recognises(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    /// Maps a template name to a file under the root.
    ///
    /// Returns `None` for names that would escape the root or that do not
    /// carry a recognised extension.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        if !self.recognises(name) {
            return None;
        }
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Reads a single template by name, synchronously.
    pub fn read(&self, name: &str) -> std::io::Result<Option<String>> {
        let Some(path) = self.path_for(name) else {
            return Ok(None);
        };
        match std::fs::read_to_string(&path) {
            Ok(source) => Ok(Some(source)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Lists every template file below the root.
    pub fn scan(&self) -> Result<Vec<TemplateFile>, SetupError> {
        if !self.root.is_dir() {
            return Err(SetupError::DirectoryNotFound(self.root.clone()));
        }
        Ok(walk_template_dir(&self.root, &self.extensions)?)
    }
}

/// A template file discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Name used to look the template up (`admin/list.html`).
    pub name: String,
    /// Absolute or root-joined path of the file.
    pub path: PathBuf,
}

/// Recursively collects template files under `root`.
///
/// Results are sorted by name so setup is deterministic.
pub fn walk_template_dir(
    root: impl AsRef<Path>,
    extensions: &[String],
) -> Result<Vec<TemplateFile>, std::io::Error> {
    let root = root.as_ref();
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            files.push(TemplateFile {
                name,
                path: entry.path().to_path_buf(),
            });
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Where templates come from.
pub enum Loader {
    /// Template name to source text.
    Sources(BTreeMap<String, String>),
    /// An already populated engine.
    Engine(Environment<'static>),
    /// A directory tree.
    Directory(DirectoryLoader),
    /// A user supplied lookup object.
    Custom(Arc<dyn TemplateLoader>),
}

impl Loader {
    pub fn sources<I, K, V>(sources: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Loader::Sources(
            sources
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn engine(env: Environment<'static>) -> Self {
        Loader::Engine(env)
    }

    pub fn directory(loader: DirectoryLoader) -> Self {
        Loader::Directory(loader)
    }

    pub fn custom(loader: impl TemplateLoader) -> Self {
        Loader::Custom(Arc::new(loader))
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loader::Sources(sources) => f
                .debug_tuple("Sources")
                .field(&sources.keys().collect::<Vec<_>>())
                .finish(),
            Loader::Engine(_) => f.write_str("Engine(..)"),
            Loader::Directory(dir) => f.debug_tuple("Directory").field(dir).finish(),
            Loader::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// What a template name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    /// Compiled from source text at setup.
    Inline,
    /// Backed by a file on disk.
    File(PathBuf),
    /// Known only to the engine or a custom loader; resolved at render time.
    Deferred,
}

/// Read-only index of template names, built once at setup.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    entries: BTreeMap<String, TemplateOrigin>,
    deferred: bool,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, origin: TemplateOrigin) {
        self.entries.insert(name.into(), origin);
    }

    /// Unknown names are handed to the engine instead of failing here.
    pub(crate) fn defer_unknown(&mut self) {
        self.deferred = true;
    }

    /// Resolves a template name.
    pub fn resolve(&self, name: &str) -> Result<TemplateOrigin, RenderError> {
        match self.entries.get(name) {
            Some(origin) => Ok(origin.clone()),
            None if self.deferred => Ok(TemplateOrigin::Deferred),
            None => Err(RenderError::TemplateNotFound(name.to_string())),
        }
    }

    /// Names registered at setup, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    // =========================================================================
    // DirectoryLoader tests
    // =========================================================================

    #[test]
    fn test_directory_scan_finds_nested_templates() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "root");
        write(dir.path(), "admin/list.html", "list");
        write(dir.path(), "notes.md", "ignored");

        let files = DirectoryLoader::new(dir.path()).scan().unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["admin/list.html", "index.html"]);
    }

    #[test]
    fn test_directory_scan_missing_root() {
        let err = DirectoryLoader::new("/definitely/not/here").scan().unwrap_err();
        assert!(matches!(err, SetupError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_directory_custom_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "page.tal", "x");
        write(dir.path(), "page.html", "y");

        let files = DirectoryLoader::new(dir.path())
            .extensions(["tal"])
            .scan()
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "page.tal");
    }

    #[test]
    fn test_directory_path_for_rejects_escapes() {
        let loader = DirectoryLoader::new("/srv/templates");
        assert!(loader.path_for("../secret.html").is_none());
        assert!(loader.path_for("/etc/passwd.html").is_none());
        assert!(loader.path_for("page.exe").is_none());
        assert_eq!(
            loader.path_for("admin/list.html"),
            Some(PathBuf::from("/srv/templates/admin/list.html"))
        );
    }

    #[test]
    fn test_directory_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DirectoryLoader::new(dir.path());
        assert_eq!(loader.read("nope.html").unwrap(), None);
    }

    // =========================================================================
    // TemplateRegistry tests
    // =========================================================================

    #[test]
    fn test_registry_exact_lookup() {
        let mut registry = TemplateRegistry::new();
        registry.insert("tmpl.html", TemplateOrigin::Inline);

        assert_eq!(registry.resolve("tmpl.html").unwrap(), TemplateOrigin::Inline);
        let err = registry.resolve("tmpl").unwrap_err();
        assert_eq!(err.to_string(), "Template 'tmpl' not found");
    }

    #[test]
    fn test_registry_deferred_lookup() {
        let mut registry = TemplateRegistry::new();
        registry.defer_unknown();
        assert_eq!(registry.resolve("any").unwrap(), TemplateOrigin::Deferred);
    }

    #[test]
    fn test_loader_debug_hides_sources() {
        let loader = Loader::sources([("a.html", "secret")]);
        let debug = format!("{:?}", loader);
        assert!(debug.contains("a.html"));
        assert!(!debug.contains("secret"));
    }
}
