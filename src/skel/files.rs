//! Concrete kinds of skeleton files

use std::collections::BTreeMap;

use toml::{Table, Value};

use super::base::{SkelError, TemplateBinding};
use crate::manager::Manager;
use crate::recipe::Recipe;

/// Variables a template needs, by name
pub type TemplateVariables = BTreeMap<&'static str, VariableSpec>;

/// Shape of a template variable's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Text,
    Integer,
    List,
    Table,
}

/// Declaration of one template variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableSpec {
    pub kind: VariableKind,
    pub required: bool,
    pub description: &'static str,
}

impl VariableSpec {
    pub const fn required(kind: VariableKind, description: &'static str) -> Self {
        Self {
            kind,
            required: true,
            description,
        }
    }

    pub const fn optional(kind: VariableKind, description: &'static str) -> Self {
        Self {
            kind,
            required: false,
            description,
        }
    }
}

/// A kind of skeleton file: which template it uses, which variables that
/// template needs and how the binding's data is completed before rendering.
pub trait SkelKind {
    /// Short name used in listings and log targets
    const NAME: &'static str;

    /// Template used unless the recipe names another one
    const TEMPLATE: &'static str;

    /// Variables needed to render this kind, optionally for one plugin type
    fn template_variables(plugin_type: Option<&str>) -> TemplateVariables {
        TemplateBinding::template_variables(plugin_type)
    }

    /// Add kind-specific attributes to a binding whose data is already set
    fn prepare(_binding: &mut TemplateBinding) -> Result<(), SkelError> {
        Ok(())
    }

    /// A fresh binding pointing at this kind's template
    fn binding() -> TemplateBinding {
        let mut binding = TemplateBinding::new();
        binding.set_template(Self::TEMPLATE);
        binding
    }
}

fn common_variables() -> TemplateVariables {
    TemplateVariables::from([
        (
            "component",
            VariableSpec::required(VariableKind::Text, "Frankenstyle component name"),
        ),
        (
            "copyright",
            VariableSpec::optional(VariableKind::Text, "Copyright holder line"),
        ),
    ])
}

/// The binding's manager, cloned so the binding can be mutated afterwards
fn manager_of(binding: &TemplateBinding) -> Result<Manager, SkelError> {
    binding.manager().cloned().ok_or(SkelError::ManagerNotSet)
}

/// `version.php`
pub struct VersionFile;

impl VersionFile {
    pub const PATH: &'static str = "version.php";
}

impl SkelKind for VersionFile {
    const NAME: &'static str = "version";
    const TEMPLATE: &'static str = "file/version";

    fn template_variables(_plugin_type: Option<&str>) -> TemplateVariables {
        let mut vars = common_variables();
        vars.insert(
            "version",
            VariableSpec::required(VariableKind::Integer, "Plugin version, YYYYMMDDXX"),
        );
        vars.insert(
            "release",
            VariableSpec::optional(VariableKind::Text, "Human readable release name"),
        );
        vars.insert(
            "requires",
            VariableSpec::optional(VariableKind::Integer, "Required Moodle version"),
        );
        vars.insert(
            "maturity",
            VariableSpec::optional(VariableKind::Text, "alpha, beta, rc or stable"),
        );
        vars.insert(
            "dependencies",
            VariableSpec::optional(VariableKind::Table, "Component to required version"),
        );
        vars
    }

    fn prepare(binding: &mut TemplateBinding) -> Result<(), SkelError> {
        let manager = manager_of(binding)?;
        let recipe = manager.recipe();
        binding.set_attribute("release", escape_php_string(&recipe.release))?;

        let dependencies = &recipe.dependencies;
        if dependencies.is_empty() {
            return Ok(());
        }

        let list: Vec<Value> = dependencies
            .iter()
            .map(|(component, version)| {
                let mut entry = Table::new();
                entry.insert("component".to_string(), Value::String(component.clone()));
                entry.insert("version".to_string(), Value::Integer(*version));
                Value::Table(entry)
            })
            .collect();
        binding.set_flag("has_dependencies")?;
        binding.set_attribute("dependencies", list)
    }
}

/// `lang/en/<component>.php`
pub struct LangFile;

impl LangFile {
    /// Activity modules name their language file after the plugin, not the
    /// full component
    pub fn path(recipe: &Recipe) -> String {
        let stem = if recipe.plugin_type() == "mod" {
            recipe.plugin_name()
        } else {
            recipe.component.as_str()
        };
        format!("lang/en/{}.php", stem)
    }
}

impl SkelKind for LangFile {
    const NAME: &'static str = "lang";
    const TEMPLATE: &'static str = "file/lang";

    fn template_variables(plugin_type: Option<&str>) -> TemplateVariables {
        let mut vars = common_variables();
        vars.insert(
            "name",
            VariableSpec::required(VariableKind::Text, "Human readable plugin name"),
        );
        vars.insert(
            "lang_strings",
            VariableSpec::optional(VariableKind::List, "Extra strings as id/text pairs"),
        );
        if plugin_type == Some("mod") {
            vars.insert(
                "modulename",
                VariableSpec::optional(VariableKind::Text, "Activity name, defaults to name"),
            );
            vars.insert(
                "modulenameplural",
                VariableSpec::optional(VariableKind::Text, "Plural activity name"),
            );
        }
        vars
    }

    fn prepare(binding: &mut TemplateBinding) -> Result<(), SkelError> {
        let manager = manager_of(binding)?;
        let recipe = manager.recipe();

        let mut strings: BTreeMap<&str, &str> = BTreeMap::new();
        strings.insert("pluginname", &recipe.name);
        if recipe.plugin_type() == "mod" {
            strings.insert("modulename", &recipe.name);
            strings.insert("modulenameplural", &recipe.name);
        }
        for string in &recipe.lang_strings {
            strings.insert(&string.id, &string.text);
        }

        let list: Vec<Value> = strings
            .into_iter()
            .map(|(id, text)| {
                let mut entry = Table::new();
                entry.insert("id".to_string(), Value::String(id.to_string()));
                entry.insert("text".to_string(), Value::String(escape_php_string(text)));
                Value::Table(entry)
            })
            .collect();
        binding.set_attribute("lang_strings", list)
    }
}

/// Escape text for a single-quoted PHP string literal
pub fn escape_php_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// `README.md`
pub struct ReadmeFile;

impl ReadmeFile {
    pub const PATH: &'static str = "README.md";
}

impl SkelKind for ReadmeFile {
    const NAME: &'static str = "readme";
    const TEMPLATE: &'static str = "file/readme";

    fn template_variables(_plugin_type: Option<&str>) -> TemplateVariables {
        let mut vars = common_variables();
        vars.insert(
            "name",
            VariableSpec::required(VariableKind::Text, "Human readable plugin name"),
        );
        vars.insert(
            "description",
            VariableSpec::optional(VariableKind::Text, "Short description"),
        );
        vars
    }
}

/// Any extra PHP file listed in the recipe
pub struct PhpFile;

impl SkelKind for PhpFile {
    const NAME: &'static str = "php";
    const TEMPLATE: &'static str = "file/php";

    fn template_variables(_plugin_type: Option<&str>) -> TemplateVariables {
        let mut vars = common_variables();
        vars.insert(
            "description",
            VariableSpec::optional(VariableKind::Text, "File docblock summary"),
        );
        vars.insert(
            "body",
            VariableSpec::optional(VariableKind::Text, "Code placed after the header"),
        );
        vars
    }

    fn prepare(binding: &mut TemplateBinding) -> Result<(), SkelError> {
        let Some(description) = binding
            .data()
            .and_then(|data| data.get("description"))
            .and_then(Value::as_str)
            .map(docblock_text)
        else {
            return Ok(());
        };
        binding.set_attribute("description", description)
    }
}

/// Continue multi-line text inside a `/** */` docblock and keep it from
/// closing the comment early
fn docblock_text(text: &str) -> String {
    text.replace("*/", "* /")
        .lines()
        .enumerate()
        .map(|(i, line)| match (i, line.trim_end()) {
            (0, line) => line.to_string(),
            (_, "") => " *".to_string(),
            (_, line) => format!(" * {}", line),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Template variables of every file kind, keyed by kind name
pub fn template_variables(plugin_type: Option<&str>) -> BTreeMap<&'static str, TemplateVariables> {
    BTreeMap::from([
        (VersionFile::NAME, VersionFile::template_variables(plugin_type)),
        (LangFile::NAME, LangFile::template_variables(plugin_type)),
        (ReadmeFile::NAME, ReadmeFile::template_variables(plugin_type)),
        (PhpFile::NAME, PhpFile::template_variables(plugin_type)),
    ])
}
