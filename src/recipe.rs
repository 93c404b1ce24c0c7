//! Plugin recipes
//!
//! A recipe is a TOML document describing the plugin to generate. Known keys
//! are validated into [`Recipe`]; the whole document is also kept so any
//! extra key is available to templates.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::Deserialize;
use thiserror::Error;
use toml::{Table, Value};

/// Errors that can occur when loading or validating recipes
#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("Failed to read recipe file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse recipe TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid component name '{component}', expected type_name such as local_hello")]
    InvalidComponent { component: String },
    #[error("unknown plugin type '{plugin_type}' in component {component}")]
    UnknownPluginType {
        plugin_type: String,
        component: String,
    },
    #[error("invalid file path '{path}': must be relative and stay inside the plugin")]
    InvalidFilePath { path: String },
}

/// Plugin types and the directory they are installed into
const PLUGIN_TYPES: &[(&str, &str)] = &[
    ("antivirus", "lib/antivirus"),
    ("assignfeedback", "mod/assign/feedback"),
    ("assignsubmission", "mod/assign/submission"),
    ("atto", "lib/editor/atto/plugins"),
    ("auth", "auth"),
    ("availability", "availability/condition"),
    ("block", "blocks"),
    ("customfield", "customfield/field"),
    ("enrol", "enrol"),
    ("filter", "filter"),
    ("format", "course/format"),
    ("local", "local"),
    ("message", "message/output"),
    ("mod", "mod"),
    ("profilefield", "user/profile/field"),
    ("qbehaviour", "question/behaviour"),
    ("qtype", "question/type"),
    ("report", "report"),
    ("repository", "repository"),
    ("theme", "theme"),
    ("tiny", "lib/editor/tiny/plugins"),
    ("tool", "admin/tool"),
];

/// Install directory of a plugin type, relative to the Moodle root
pub fn plugin_type_dir(plugin_type: &str) -> Option<&'static str> {
    PLUGIN_TYPES
        .iter()
        .find(|(name, _)| *name == plugin_type)
        .map(|(_, dir)| *dir)
}

/// Release maturity of the plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Maturity {
    #[default]
    #[serde(rename = "alpha", alias = "MATURITY_ALPHA")]
    Alpha,
    #[serde(rename = "beta", alias = "MATURITY_BETA")]
    Beta,
    #[serde(rename = "rc", alias = "MATURITY_RC")]
    Rc,
    #[serde(rename = "stable", alias = "MATURITY_STABLE")]
    Stable,
}

impl Maturity {
    /// The PHP constant written to version.php
    pub fn constant(self) -> &'static str {
        match self {
            Maturity::Alpha => "MATURITY_ALPHA",
            Maturity::Beta => "MATURITY_BETA",
            Maturity::Rc => "MATURITY_RC",
            Maturity::Stable => "MATURITY_STABLE",
        }
    }
}

/// A language string defined by the recipe
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LangString {
    pub id: String,
    pub text: String,
}

/// Optional files to generate
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Features {
    #[serde(default)]
    pub readme: bool,
}

/// An extra file rendered from a template of its own
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtraFile {
    /// Path relative to the plugin root
    pub path: String,
    #[serde(default = "default_file_template")]
    pub template: String,
    /// Data merged over the recipe data for this file only
    #[serde(default)]
    pub data: Table,
}

fn default_file_template() -> String {
    "file/php".to_string()
}

fn default_release() -> String {
    "0.1.0".to_string()
}

/// TOML structure for deserializing recipes
#[derive(Deserialize)]
struct TomlRecipe {
    component: String,
    name: String,
    version: i64,
    #[serde(default = "default_release")]
    release: String,
    requires: Option<i64>,
    #[serde(default)]
    maturity: Maturity,
    copyright: Option<String>,
    description: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, i64>,
    #[serde(default)]
    lang_strings: Vec<LangString>,
    #[serde(default)]
    features: Features,
    #[serde(default)]
    files: Vec<ExtraFile>,
}

/// A validated plugin recipe
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub component: String,
    pub name: String,
    pub version: i64,
    pub release: String,
    pub requires: Option<i64>,
    pub maturity: Maturity,
    pub copyright: Option<String>,
    pub description: Option<String>,
    pub dependencies: BTreeMap<String, i64>,
    pub lang_strings: Vec<LangString>,
    pub features: Features,
    pub files: Vec<ExtraFile>,
    /// Offset of the `_` separating plugin type and name
    split: usize,
    raw: Table,
}

impl Recipe {
    /// Load recipe from TOML file
    pub fn from_file(path: &Path) -> Result<Self, RecipeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load recipe from TOML string
    pub fn from_str(content: &str) -> Result<Self, RecipeError> {
        let raw: Table = toml::from_str(content)?;
        let parsed: TomlRecipe = toml::from_str(content)?;

        let split = validate_component(&parsed.component)?;
        for dependency in parsed.dependencies.keys() {
            validate_component(dependency)?;
        }
        for file in &parsed.files {
            validate_file_path(&file.path)?;
        }

        Ok(Recipe {
            component: parsed.component,
            name: parsed.name,
            version: parsed.version,
            release: parsed.release,
            requires: parsed.requires,
            maturity: parsed.maturity,
            copyright: parsed.copyright,
            description: parsed.description,
            dependencies: parsed.dependencies,
            lang_strings: parsed.lang_strings,
            features: parsed.features,
            files: parsed.files,
            split,
            raw,
        })
    }

    /// Plugin type, e.g. `local` for `local_hello`
    pub fn plugin_type(&self) -> &str {
        &self.component[..self.split]
    }

    /// Plugin name, e.g. `hello` for `local_hello`
    pub fn plugin_name(&self) -> &str {
        &self.component[self.split + 1..]
    }

    /// Directory of the plugin relative to the Moodle root, e.g. `admin/tool/foo`
    pub fn install_path(&self) -> String {
        // Component validation guarantees a known type
        let dir = plugin_type_dir(self.plugin_type()).unwrap_or(self.plugin_type());
        format!("{}/{}", dir, self.plugin_name())
    }

    /// Data every template sees: the recipe document plus derived values
    pub fn template_data(&self) -> Table {
        let mut data = self.raw.clone();
        data.insert("component".to_string(), Value::String(self.component.clone()));
        data.insert("release".to_string(), Value::String(self.release.clone()));
        data.insert(
            "maturity".to_string(),
            Value::String(self.maturity.constant().to_string()),
        );
        data.insert(
            "plugin_type".to_string(),
            Value::String(self.plugin_type().to_string()),
        );
        data.insert(
            "plugin_name".to_string(),
            Value::String(self.plugin_name().to_string()),
        );
        data.insert("install_path".to_string(), Value::String(self.install_path()));
        data
    }
}

/// Check `type_name` naming and return the offset of the separator
fn validate_component(component: &str) -> Result<usize, RecipeError> {
    let invalid = || RecipeError::InvalidComponent {
        component: component.to_string(),
    };

    let (plugin_type, name) = component.split_once('_').ok_or_else(invalid)?;
    if plugin_type.is_empty() || !plugin_type.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(invalid());
    }
    if plugin_type_dir(plugin_type).is_none() {
        return Err(RecipeError::UnknownPluginType {
            plugin_type: plugin_type.to_string(),
            component: component.to_string(),
        });
    }

    let valid_name = name.starts_with(|c: char| c.is_ascii_lowercase())
        && !name.ends_with('_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    // Activity modules may not use underscores in their name
    if !valid_name || (plugin_type == "mod" && name.contains('_')) {
        return Err(invalid());
    }

    Ok(plugin_type.len())
}

fn validate_file_path(path: &str) -> Result<(), RecipeError> {
    let relative = Path::new(path);
    let inside = !path.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if inside {
        Ok(())
    } else {
        Err(RecipeError::InvalidFilePath {
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"
component = "local_hello"
name = "Hello world"
version = 2024010100
"#;

    #[test]
    fn test_minimal_recipe_defaults() {
        let recipe = Recipe::from_str(MINIMAL).expect("Should parse");
        assert_eq!(recipe.component, "local_hello");
        assert_eq!(recipe.release, "0.1.0");
        assert_eq!(recipe.maturity, Maturity::Alpha);
        assert_eq!(recipe.requires, None);
        assert!(recipe.dependencies.is_empty());
        assert!(!recipe.features.readme);
        assert_eq!(recipe.plugin_type(), "local");
        assert_eq!(recipe.plugin_name(), "hello");
        assert_eq!(recipe.install_path(), "local/hello");
    }

    #[test]
    fn test_full_recipe() {
        let toml_str = r#"
component = "tool_demo_thing"
name = "Demo"
version = 2024010100
release = "1.2"
requires = 2023100900
maturity = "MATURITY_STABLE"
copyright = "2024 Jane Doe <jane@example.com>"

[dependencies]
mod_forum = 2023100900

[[lang_strings]]
id = "greeting"
text = "Hi"

[features]
readme = true

[[files]]
path = "classes/helper.php"

[files.data]
description = "Helper functions"
"#;
        let recipe = Recipe::from_str(toml_str).expect("Should parse");
        assert_eq!(recipe.maturity, Maturity::Stable);
        assert_eq!(recipe.requires, Some(2023100900));
        assert_eq!(recipe.plugin_name(), "demo_thing");
        assert_eq!(recipe.install_path(), "admin/tool/demo_thing");
        assert_eq!(recipe.dependencies["mod_forum"], 2023100900);
        assert_eq!(recipe.lang_strings[0].id, "greeting");
        assert!(recipe.features.readme);
        assert_eq!(recipe.files[0].template, "file/php");
        assert_eq!(
            recipe.files[0].data["description"].as_str(),
            Some("Helper functions")
        );
    }

    #[test]
    fn test_template_data_derived_values() {
        let recipe = Recipe::from_str(&format!("{}\nmaturity = \"beta\"\ncustom = 7\n", MINIMAL))
            .expect("Should parse");
        let data = recipe.template_data();
        assert_eq!(data["maturity"].as_str(), Some("MATURITY_BETA"));
        assert_eq!(data["plugin_type"].as_str(), Some("local"));
        assert_eq!(data["plugin_name"].as_str(), Some("hello"));
        assert_eq!(data["install_path"].as_str(), Some("local/hello"));
        assert_eq!(data["release"].as_str(), Some("0.1.0"));
        assert_eq!(data["custom"].as_integer(), Some(7));
    }

    #[test]
    fn test_invalid_components() {
        for component in ["hello", "Local_hello", "local_", "local_Hello", "_hello", "local_9x"] {
            let source = format!("component = \"{}\"\nname = \"x\"\nversion = 1", component);
            let result = Recipe::from_str(&source);
            assert!(
                matches!(result, Err(RecipeError::InvalidComponent { .. })),
                "{} should be rejected",
                component
            );
        }
    }

    #[test]
    fn test_mod_name_without_underscores() {
        let result = Recipe::from_str("component = \"mod_my_quest\"\nname = \"x\"\nversion = 1");
        assert!(matches!(result, Err(RecipeError::InvalidComponent { .. })));
    }

    #[test]
    fn test_unknown_plugin_type() {
        let result = Recipe::from_str("component = \"widget_x\"\nname = \"x\"\nversion = 1");
        assert!(matches!(
            result,
            Err(RecipeError::UnknownPluginType { plugin_type, .. }) if plugin_type == "widget"
        ));
    }

    #[test]
    fn test_missing_required_key() {
        let result = Recipe::from_str("component = \"local_x\"\nname = \"x\"");
        assert!(matches!(result, Err(RecipeError::ParseError(_))));
    }

    #[test]
    fn test_file_paths_must_stay_inside() {
        for path in ["../escape.php", "/etc/passwd", "", "a/../../b.php"] {
            let source = format!(
                "{}\n[[files]]\npath = \"{}\"\n",
                MINIMAL, path
            );
            assert!(
                matches!(
                    Recipe::from_str(&source),
                    Err(RecipeError::InvalidFilePath { .. })
                ),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_dependency_keys_validated() {
        let source = format!("{}\n[dependencies]\n\"x' => 1, 'y\" = 1\n", MINIMAL);
        assert!(matches!(
            Recipe::from_str(&source),
            Err(RecipeError::InvalidComponent { component }) if component == "x' => 1, 'y"
        ));

        let source = format!("{}\n[dependencies]\nfoo_bar = 1\n", MINIMAL);
        assert!(matches!(
            Recipe::from_str(&source),
            Err(RecipeError::UnknownPluginType { .. })
        ));
    }

    #[test]
    fn test_invalid_toml_error() {
        let result = Recipe::from_str("this is not valid toml {{{{");
        assert!(result.is_err());
    }
}
