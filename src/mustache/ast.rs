//! AST types for parsed Mustache templates

use std::fmt;

/// A parsed template
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
}

impl Template {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Names of all partials referenced anywhere in the template
    pub fn partials(&self) -> Vec<&str> {
        fn collect<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
            for node in nodes {
                match node {
                    Node::Partial(name) => out.push(name),
                    Node::Section { children, .. } => collect(children, out),
                    _ => {}
                }
            }
        }

        let mut names = Vec::new();
        collect(&self.nodes, &mut names);
        names
    }
}

/// A node in a template body
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text copied to the output
    Text(String),
    /// `{{name}}` (escaped) or `{{{name}}}` / `{{& name}}`
    Variable { name: TagName, escape: bool },
    /// `{{#name}}...{{/name}}` or `{{^name}}...{{/name}}`
    Section {
        name: TagName,
        inverted: bool,
        children: Vec<Node>,
    },
    /// `{{> name}}`
    Partial(String),
}

/// A dotted tag name such as `self.has_dependencies`.
///
/// The implicit iterator `.` has no segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagName(Vec<String>);

impl TagName {
    pub fn new(raw: &str) -> Self {
        if raw == "." {
            Self(Vec::new())
        } else {
            Self(raw.split('.').map(str::to_string).collect())
        }
    }

    /// True for `.`, which refers to the current context item
    pub fn is_implicit(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_implicit() {
            f.write_str(".")
        } else {
            f.write_str(&self.0.join("."))
        }
    }
}
