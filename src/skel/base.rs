//! Template binding: a template name plus the data to render it with

use std::fmt;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use thiserror::Error;
use toml::Value;

use super::files::TemplateVariables;
use crate::manager::Manager;
use crate::template::{Renderer, TemplateData, TemplateError};

/// Key under which attributes set after construction are stored
pub const SELF_KEY: &str = "self";

/// Errors raised by skeleton files
#[derive(Debug, Error)]
pub enum SkelError {
    #[error("manager has been already set")]
    ManagerAlreadySet,

    #[error("manager not set")]
    ManagerNotSet,

    #[error("template not set")]
    TemplateNotSet,

    #[error("skeleton data not set")]
    DataNotSet,

    #[error("skeleton data key 'self' is not a table")]
    SelfNotTable,

    #[error(transparent)]
    Render(#[from] TemplateError),
}

/// Content produced by rendering a binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    content: String,
}

impl RenderedArtifact {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn into_string(self) -> String {
        self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl fmt::Display for RenderedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// A template name paired with the data needed to render it.
///
/// Bindings are filled through setters, rendered once and then discarded
/// after the content has been taken.
#[derive(Debug, Default)]
pub struct TemplateBinding {
    template: Option<String>,
    data: Option<TemplateData>,
    manager: Option<Manager>,
    log_target: Option<String>,
    content: Option<RenderedArtifact>,
}

impl TemplateBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the template, by name relative to the template root and without
    /// extension. The name is not checked until rendering.
    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = Some(template.into());
    }

    /// Replace the data to be rendered
    pub fn set_data(&mut self, data: TemplateData) {
        self.data = Some(data);
    }

    /// Set the manager generating this file. A binding belongs to one manager.
    pub fn set_manager(&mut self, manager: Manager) -> Result<(), SkelError> {
        if self.manager.is_some() {
            return Err(SkelError::ManagerAlreadySet);
        }
        self.manager = Some(manager);
        Ok(())
    }

    /// Log under the given target instead of this module's path
    pub fn set_log_target(&mut self, target: impl Into<String>) {
        self.log_target = Some(target.into());
    }

    /// Set `self.<attribute>` in the data to `value`.
    ///
    /// The data must be set and non-empty first.
    pub fn set_attribute(
        &mut self,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Result<(), SkelError> {
        let data = match self.data.as_mut() {
            Some(data) if !data.is_empty() => data,
            _ => return Err(SkelError::DataNotSet),
        };

        let attributes = data
            .entry(SELF_KEY)
            .or_insert_with(|| Value::Table(TemplateData::new()));
        match attributes {
            Value::Table(table) => {
                table.insert(attribute.to_string(), value.into());
                Ok(())
            }
            _ => Err(SkelError::SelfNotTable),
        }
    }

    /// Set `self.<attribute>` to true
    pub fn set_flag(&mut self, attribute: &str) -> Result<(), SkelError> {
        self.set_attribute(attribute, true)
    }

    /// Target used for this binding's log records
    pub fn log_target(&self) -> &str {
        self.log_target.as_deref().unwrap_or(module_path!())
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn data(&self) -> Option<&TemplateData> {
        self.data.as_ref()
    }

    pub fn manager(&self) -> Option<&Manager> {
        self.manager.as_ref()
    }

    /// Rendered content, once [`render`](Self::render) succeeded
    pub fn content(&self) -> Option<&RenderedArtifact> {
        self.content.as_ref()
    }

    pub fn into_content(self) -> Option<RenderedArtifact> {
        self.content
    }

    /// Render the template with the data and store the normalized result
    pub fn render(&mut self, renderer: &dyn Renderer) -> Result<&RenderedArtifact, SkelError> {
        let template = self.template.as_deref().ok_or(SkelError::TemplateNotSet)?;
        let target = self.log_target();
        debug!(target: target, "rendering {}", template);

        let empty = TemplateData::new();
        let rendered = renderer.render(template, self.data.as_ref().unwrap_or(&empty))?;
        let artifact = RenderedArtifact::new(normalize(&rendered));
        debug!(target: target, "rendered {} ({} bytes)", template, artifact.len());

        Ok(&*self.content.insert(artifact))
    }

    /// Variables a template of this kind needs. Plain bindings declare none;
    /// concrete kinds override this through [`SkelKind`](super::SkelKind).
    pub fn template_variables(_plugin_type: Option<&str>) -> TemplateVariables {
        TemplateVariables::new()
    }
}

/// Collapse runs of blank lines left behind by template sections.
///
/// A line start followed by optional horizontal whitespace and two or more
/// vertical whitespace characters becomes a single line break.
pub fn normalize(content: &str) -> String {
    static BLANK_RUNS: OnceLock<Regex> = OnceLock::new();
    let re = BLANK_RUNS.get_or_init(|| {
        Regex::new(r"(?m)^[\t\p{Zs}]*[\n\x0B\x0C\r\x{85}\x{2028}\x{2029}]{2,}")
            .expect("Blank line pattern should compile")
    });
    re.replace_all(content, "\n").into_owned()
}
