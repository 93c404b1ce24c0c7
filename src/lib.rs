//! pluginskel - plugin skeleton generator
//!
//! This library turns a TOML recipe describing a Moodle plugin into the
//! files of a plugin skeleton: `version.php`, the language file, an optional
//! `README.md` and any extra files the recipe lists. Every file is a
//! [`TemplateBinding`] rendered with the built-in Mustache engine.
//!
//! # Example
//!
//! ```rust
//! use pluginskel::generate;
//!
//! let files = generate(r#"
//!     component = "local_hello"
//!     name = "Hello world"
//!     version = 2024010100
//! "#).unwrap();
//!
//! assert_eq!(files[0].path.to_str(), Some("version.php"));
//! assert!(files[0].content.as_str().contains("$plugin->component = 'local_hello';"));
//! ```

pub mod error;
pub mod manager;
pub mod mustache;
pub mod recipe;
pub mod skel;
pub mod template;

use std::path::{Path, PathBuf};

use log::warn;
use thiserror::Error;

pub use error::TemplateSyntaxError;
pub use manager::{write_files, GeneratedFile, Manager};
pub use recipe::{Recipe, RecipeError};
pub use skel::{
    normalize, template_variables, RenderedArtifact, SkelError, SkelKind, TemplateBinding,
};
pub use template::{Renderer, TemplateData, TemplateError, TemplateRegistry};

/// Errors that can occur while generating a skeleton
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("recipe error: {0}")]
    Recipe(#[from] RecipeError),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("skeleton error: {0}")]
    Skel(#[from] SkelError),

    #[error("file already exists: {path} (use --force to overwrite)")]
    FileExists { path: PathBuf },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    /// Human-readable report; template syntax errors get source context
    pub fn report(&self) -> String {
        match self {
            GenerateError::Template(err) | GenerateError::Skel(SkelError::Render(err)) => {
                err.report()
            }
            other => other.to_string(),
        }
    }
}

/// Configuration for skeleton generation
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Directory of `*.mustache` files overriding the built-in templates
    pub templates_dir: Option<PathBuf>,
}

impl GeneratorConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load templates from a directory on top of the built-in ones
    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = Some(dir.into());
        self
    }

    /// Build the template registry this configuration describes
    pub fn registry(&self) -> Result<TemplateRegistry, TemplateError> {
        let mut registry = TemplateRegistry::builtin();
        if let Some(dir) = &self.templates_dir {
            registry.load_dir(dir)?;
        }
        for (template, partial) in registry.missing_partials() {
            warn!("template {} uses unknown partial {}", template, partial);
        }
        Ok(registry)
    }
}

/// Generate skeleton files from recipe source with default configuration
pub fn generate(recipe_source: &str) -> Result<Vec<GeneratedFile>, GenerateError> {
    generate_with_config(recipe_source, &GeneratorConfig::default())
}

/// Generate skeleton files from recipe source with custom configuration
///
/// # Example
///
/// ```rust,no_run
/// use pluginskel::{generate_with_config, GeneratorConfig};
///
/// let config = GeneratorConfig::new().with_templates_dir("my-templates");
/// let files = generate_with_config(
///     "component = \"block_news\"\nname = \"News\"\nversion = 1",
///     &config,
/// ).unwrap();
/// ```
pub fn generate_with_config(
    recipe_source: &str,
    config: &GeneratorConfig,
) -> Result<Vec<GeneratedFile>, GenerateError> {
    let recipe = Recipe::from_str(recipe_source)?;
    generate_recipe(recipe, config)
}

/// Generate skeleton files from a recipe file
pub fn generate_file(
    recipe_path: &Path,
    config: &GeneratorConfig,
) -> Result<Vec<GeneratedFile>, GenerateError> {
    let recipe = Recipe::from_file(recipe_path)?;
    generate_recipe(recipe, config)
}

fn generate_recipe(
    recipe: Recipe,
    config: &GeneratorConfig,
) -> Result<Vec<GeneratedFile>, GenerateError> {
    let manager = Manager::new(recipe, config.registry()?);
    Ok(manager.generate()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = r#"
component = "block_news"
name = "News"
version = 2024010100
"#;

    #[test]
    fn test_generate_default_files() {
        let files = generate(RECIPE).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].path, PathBuf::from("lang/en/block_news.php"));
    }

    #[test]
    fn test_recipe_error_surfaces() {
        let err = generate("component = \"nope\"\nname = \"x\"\nversion = 1").unwrap_err();
        assert!(matches!(err, GenerateError::Recipe(_)));
    }

    #[test]
    fn test_missing_templates_dir() {
        let config = GeneratorConfig::new().with_templates_dir("/nonexistent/pluginskel");
        let err = generate_with_config(RECIPE, &config).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Template(TemplateError::FileReadError { .. })
        ));
    }

    #[test]
    fn test_report_for_broken_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("file")).unwrap();
        std::fs::write(dir.path().join("file/version.mustache"), "{{#open}}").unwrap();

        let config = GeneratorConfig::new().with_templates_dir(dir.path());
        let err = generate_with_config(RECIPE, &config).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Template(TemplateError::Syntax { .. })
        ));
        assert!(err.report().contains("file/version"));
    }
}
