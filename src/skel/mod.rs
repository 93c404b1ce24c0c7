//! Skeleton files: templates bound to data
//!
//! Every generated file starts as a [`TemplateBinding`]. The binding holds
//! the template name and data, gets kind-specific attributes under `self`
//! and is rendered through any [`Renderer`](crate::template::Renderer).
//! Rendered output has runs of blank lines collapsed by [`normalize`].

mod base;
mod files;

pub use base::{normalize, RenderedArtifact, SkelError, TemplateBinding, SELF_KEY};
pub use files::{
    escape_php_string, template_variables, LangFile, PhpFile, ReadmeFile, SkelKind,
    TemplateVariables, VariableKind, VariableSpec, VersionFile,
};
