//! Template loading and rendering.
//!
//! - [`registry`]: the [`Loader`] forms and the name index built from them.
//! - [`engine`]: the [`Renderer`] that compiles and renders templates.

pub mod engine;
pub mod registry;

pub use engine::Renderer;
pub use registry::{
    walk_template_dir, DirectoryLoader, Loader, TemplateFile, TemplateLoader, TemplateOrigin,
    TemplateRegistry, DEFAULT_EXTENSIONS,
};
