//! Template registry for storing and retrieving compiled templates

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use super::builtin::BUILTIN_TEMPLATES;
use super::{Renderer, TemplateData};
use crate::error::TemplateSyntaxError;
use crate::mustache::{self, PartialResolver, RenderError, Template};

/// File extension of template files on disk
const TEMPLATE_EXTENSION: &str = "mustache";

/// Errors that can occur during template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template not found in registry
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// Duplicate template definition
    #[error("duplicate template definition: {name}")]
    Duplicate { name: String },

    /// Template source does not parse
    #[error("syntax errors in template {name}: {}", format_syntax_errors(.errors))]
    Syntax {
        name: String,
        source_text: String,
        errors: Vec<TemplateSyntaxError>,
    },

    /// Error reading template file
    #[error("error reading template file {path}: {message}")]
    FileReadError { path: PathBuf, message: String },

    /// Error while rendering a parsed template
    #[error("error rendering template {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: RenderError,
    },
}

fn format_syntax_errors(errors: &[TemplateSyntaxError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl TemplateError {
    /// Human-readable report; syntax errors get source context
    pub fn report(&self) -> String {
        match self {
            TemplateError::Syntax {
                name,
                source_text,
                errors,
            } => errors
                .iter()
                .map(|e| e.format(source_text, name))
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }
}

/// A stored, compiled template
#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    /// Template name, e.g. `file/version`
    pub name: String,
    /// Raw template source
    pub source: String,
    /// Path to source file (for templates loaded from disk)
    pub source_path: Option<PathBuf>,
    /// Parsed template
    pub template: Template,
}

impl TemplateDefinition {
    /// Compile a template from source
    pub fn compile(name: impl Into<String>, source: impl Into<String>) -> Result<Self, TemplateError> {
        let name = name.into();
        let source = source.into();
        let template = mustache::parse(&source).map_err(|errors| TemplateError::Syntax {
            name: name.clone(),
            source_text: source.clone(),
            errors,
        })?;

        Ok(Self {
            name,
            source,
            source_path: None,
            template,
        })
    }

    /// Check if this template was loaded from disk
    pub fn is_file_based(&self) -> bool {
        self.source_path.is_some()
    }
}

/// Registry of named templates; the production [`Renderer`]
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateDefinition>,
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in templates
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, source) in BUILTIN_TEMPLATES {
            let def = TemplateDefinition::compile(*name, *source)
                .expect("Built-in templates should be valid");
            registry.templates.insert(def.name.clone(), def);
        }
        registry
    }

    /// Register a template from source, rejecting duplicates
    pub fn register_source(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.register_definition(TemplateDefinition::compile(name, source)?)
    }

    /// Register a template definition directly
    pub fn register_definition(&mut self, def: TemplateDefinition) -> Result<(), TemplateError> {
        if self.templates.contains_key(&def.name) {
            return Err(TemplateError::Duplicate {
                name: def.name.clone(),
            });
        }
        self.templates.insert(def.name.clone(), def);
        Ok(())
    }

    /// Register a template, replacing any existing one with the same name
    pub fn override_source(
        &mut self,
        name: &str,
        source: &str,
    ) -> Result<Option<TemplateDefinition>, TemplateError> {
        let def = TemplateDefinition::compile(name, source)?;
        Ok(self.templates.insert(def.name.clone(), def))
    }

    /// Load every `*.mustache` file below `dir`.
    ///
    /// Templates are named by their path relative to `dir` without the
    /// extension, so `dir/file/version.mustache` becomes `file/version`.
    /// Loaded templates replace registered ones. Returns the number loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, TemplateError> {
        let mut files = Vec::new();
        collect_template_files(dir, &mut files)?;
        files.sort();

        for path in &files {
            let name = template_name(dir, path);
            let source = fs::read_to_string(path).map_err(|e| TemplateError::FileReadError {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let mut def = TemplateDefinition::compile(name, source)?;
            def.source_path = Some(path.clone());

            debug!("loaded template {} from {}", def.name, path.display());
            if let Some(previous) = self.templates.insert(def.name.clone(), def) {
                if !previous.is_file_based() {
                    warn!("built-in template {} overridden", previous.name);
                }
            }
        }
        Ok(files.len())
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&TemplateDefinition> {
        self.templates.get(name)
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// All template names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Partials referenced by some template but not registered, as
    /// (template, partial) pairs
    pub fn missing_partials(&self) -> Vec<(&str, &str)> {
        let mut missing = Vec::new();
        for name in self.names() {
            if let Some(def) = self.templates.get(name) {
                for partial in def.template.partials() {
                    if !self.contains(partial) {
                        missing.push((name, partial));
                    }
                }
            }
        }
        missing
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl PartialResolver for TemplateRegistry {
    fn resolve_partial(&self, name: &str) -> Option<&Template> {
        self.templates.get(name).map(|def| &def.template)
    }
}

impl Renderer for TemplateRegistry {
    fn render(&self, template: &str, data: &TemplateData) -> Result<String, TemplateError> {
        let def = self.get(template).ok_or_else(|| TemplateError::NotFound {
            name: template.to_string(),
        })?;
        debug!("rendering template {}", template);
        mustache::render(&def.template, data, self).map_err(|source| TemplateError::Render {
            name: template.to_string(),
            source,
        })
    }
}

fn collect_template_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), TemplateError> {
    let read_error = |e: std::io::Error| TemplateError::FileReadError {
        path: dir.to_path_buf(),
        message: e.to_string(),
    };

    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_dir() {
            collect_template_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION) {
            files.push(path);
        }
    }
    Ok(())
}

/// `dir/a/b.mustache` -> `a/b`, always with forward slashes
fn template_name(dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(dir).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
