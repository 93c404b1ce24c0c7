//! Template storage and the renderer capability
//!
//! A [`Renderer`] turns a template name plus data into text. Skeleton files
//! only ever talk to this trait; [`TemplateRegistry`] is the implementation
//! backed by the Mustache engine, seeded with the built-in templates and
//! optionally overridden from a directory of `*.mustache` files.

mod builtin;
mod registry;

pub use builtin::BUILTIN_TEMPLATES;
pub use registry::{TemplateDefinition, TemplateError, TemplateRegistry};

/// Data passed to a template
pub type TemplateData = toml::Table;

/// Capability to render a named template with data
pub trait Renderer {
    fn render(&self, template: &str, data: &TemplateData) -> Result<String, TemplateError>;
}
