//! Renders parsed templates against TOML data

use thiserror::Error;
use toml::{Table, Value};

use crate::mustache::ast::{Node, TagName, Template};

/// Partials may include other partials, but not without bound
pub const MAX_PARTIAL_DEPTH: usize = 32;

/// Errors that can occur while rendering a parsed template
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("partial not found: {name}")]
    MissingPartial { name: String },

    #[error("partial {name} nested deeper than {depth} levels")]
    PartialDepth { name: String, depth: usize },
}

/// Looks up compiled partials by name
pub trait PartialResolver {
    fn resolve_partial(&self, name: &str) -> Option<&Template>;
}

/// Resolver for templates that use no partials
pub struct NoPartials;

impl PartialResolver for NoPartials {
    fn resolve_partial(&self, _name: &str) -> Option<&Template> {
        None
    }
}

/// Render a template with the given data as root context
pub fn render(
    template: &Template,
    data: &Table,
    partials: &dyn PartialResolver,
) -> Result<String, RenderError> {
    let root = Value::Table(data.clone());
    let mut stack = vec![&root];
    let mut out = String::new();
    Renderer { partials }.render_nodes(&template.nodes, &mut stack, &mut out, 0)?;
    Ok(out)
}

struct Renderer<'r> {
    partials: &'r dyn PartialResolver,
}

impl Renderer<'_> {
    fn render_nodes<'a>(
        &self,
        nodes: &[Node],
        stack: &mut Vec<&'a Value>,
        out: &mut String,
        depth: usize,
    ) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Variable { name, escape } => {
                    if let Some(value) = lookup(stack, name) {
                        let text = display(value);
                        if *escape {
                            out.push_str(&html_escape::encode_quoted_attribute(&text));
                        } else {
                            out.push_str(&text);
                        }
                    }
                }
                Node::Section {
                    name,
                    inverted: true,
                    children,
                } => {
                    if !lookup(stack, name).is_some_and(is_truthy) {
                        self.render_nodes(children, stack, out, depth)?;
                    }
                }
                Node::Section { name, children, .. } => {
                    let Some(value) = lookup(stack, name) else {
                        continue;
                    };
                    if !is_truthy(value) {
                        continue;
                    }
                    match value {
                        Value::Array(items) => {
                            for item in items {
                                stack.push(item);
                                self.render_nodes(children, stack, out, depth)?;
                                stack.pop();
                            }
                        }
                        _ => {
                            stack.push(value);
                            self.render_nodes(children, stack, out, depth)?;
                            stack.pop();
                        }
                    }
                }
                Node::Partial(name) => {
                    if depth >= MAX_PARTIAL_DEPTH {
                        return Err(RenderError::PartialDepth {
                            name: name.clone(),
                            depth: MAX_PARTIAL_DEPTH,
                        });
                    }
                    let partial = self.partials.resolve_partial(name).ok_or_else(|| {
                        RenderError::MissingPartial { name: name.clone() }
                    })?;
                    self.render_nodes(&partial.nodes, stack, out, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

/// Resolve a tag name against the context stack, innermost frame first
fn lookup<'a>(stack: &[&'a Value], name: &TagName) -> Option<&'a Value> {
    if name.is_implicit() {
        return stack.last().copied();
    }

    let (first, rest) = name.segments().split_first()?;
    let mut value = stack.iter().rev().find_map(|frame| match frame {
        Value::Table(table) => table.get(first.as_str()),
        _ => None,
    })?;
    for segment in rest {
        value = value.as_table()?.get(segment.as_str())?;
    }
    Some(value)
}

/// Truthiness follows PHP: zero, "0", empty strings and empty collections are false
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Table(table) => !table.is_empty(),
        Value::Datetime(_) => true,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(true) => "1".to_string(),
        Value::Boolean(false) => String::new(),
        Value::Datetime(dt) => dt.to_string(),
        Value::Array(_) | Value::Table(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mustache::parse;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn data(source: &str) -> Table {
        toml::from_str(source).expect("Should be valid TOML")
    }

    fn render_str(template: &str, source: &str) -> String {
        let template = parse(template).expect("Should parse");
        render(&template, &data(source), &NoPartials).expect("Should render")
    }

    struct MapPartials(HashMap<String, Template>);

    impl PartialResolver for MapPartials {
        fn resolve_partial(&self, name: &str) -> Option<&Template> {
            self.0.get(name)
        }
    }

    #[test]
    fn test_variable_escaping() {
        let out = render_str(
            "{{text}} {{{text}}} {{& text}}",
            r#"text = "<a href='x'>&</a>""#,
        );
        assert_eq!(
            out,
            "&lt;a href=&#x27;x&#x27;&gt;&amp;&lt;/a&gt; <a href='x'>&</a> <a href='x'>&</a>"
        );
    }

    #[test]
    fn test_double_quotes_escaped() {
        assert_eq!(render_str("{{q}}", r#"q = 'say "hi"'"#), "say &quot;hi&quot;");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        assert_eq!(render_str("[{{nope}}]", ""), "[]");
    }

    #[test]
    fn test_scalar_display() {
        let out = render_str(
            "{{i}} {{f}} [{{t}}] [{{n}}]",
            "i = 2016121200\nf = 1.5\nt = true\nn = false",
        );
        assert_eq!(out, "2016121200 1.5 [1] []");
    }

    #[test]
    fn test_dotted_names() {
        let out = render_str("{{self.flag}}", "[self]\nflag = \"yes\"");
        assert_eq!(out, "yes");
    }

    #[test]
    fn test_section_iterates_array_of_tables() {
        let out = render_str(
            "{{#deps}}{{name}}={{version}};{{/deps}}",
            r#"deps = [{ name = "mod_forum", version = 1 }, { name = "block_html", version = 2 }]"#,
        );
        assert_eq!(out, "mod_forum=1;block_html=2;");
    }

    #[test]
    fn test_implicit_iterator() {
        assert_eq!(render_str("{{#xs}}<{{.}}>{{/xs}}", "xs = [1, 2, 3]"), "<1><2><3>");
    }

    #[test]
    fn test_outer_context_visible_in_section() {
        let out = render_str(
            "{{#items}}{{component}}:{{id}} {{/items}}",
            "component = \"local_x\"\nitems = [{ id = \"a\" }, { id = \"b\" }]",
        );
        assert_eq!(out, "local_x:a local_x:b ");
    }

    #[test]
    fn test_scalar_section_renders_once() {
        assert_eq!(
            render_str("{{#requires}}req {{requires}}{{/requires}}", "requires = 5"),
            "req 5"
        );
    }

    #[test]
    fn test_php_falsy_values() {
        let template = "{{#v}}yes{{/v}}{{^v}}no{{/v}}";
        assert_eq!(render_str(template, "v = 0"), "no");
        assert_eq!(render_str(template, r#"v = "0""#), "no");
        assert_eq!(render_str(template, r#"v = """#), "no");
        assert_eq!(render_str(template, "v = []"), "no");
        assert_eq!(render_str(template, "v = {}"), "no");
        assert_eq!(render_str(template, ""), "no");
        assert_eq!(render_str(template, r#"v = "x""#), "yes");
    }

    #[test]
    fn test_partial_uses_current_context() {
        let mut partials = HashMap::new();
        partials.insert(
            "greeting".to_string(),
            parse("Hello {{name}}").expect("Should parse"),
        );
        let template = parse("{{#people}}{{> greeting}};{{/people}}").expect("Should parse");
        let out = render(
            &template,
            &data(r#"people = [{ name = "Ann" }, { name = "Bob" }]"#),
            &MapPartials(partials),
        )
        .expect("Should render");
        assert_eq!(out, "Hello Ann;Hello Bob;");
    }

    #[test]
    fn test_missing_partial_is_error() {
        let template = parse("{{> nowhere}}").expect("Should parse");
        let err = render(&template, &Table::new(), &NoPartials).unwrap_err();
        assert_eq!(
            err,
            RenderError::MissingPartial {
                name: "nowhere".to_string()
            }
        );
    }

    #[test]
    fn test_recursive_partial_is_bounded() {
        let mut partials = HashMap::new();
        partials.insert("loop".to_string(), parse("x{{> loop}}").expect("Should parse"));
        let template = parse("{{> loop}}").expect("Should parse");
        let err = render(&template, &Table::new(), &MapPartials(partials)).unwrap_err();
        assert!(matches!(err, RenderError::PartialDepth { .. }));
    }

    #[test]
    fn test_standalone_lines_in_rendered_output() {
        let out = render_str(
            "<?php\n{{#items}}\n$string['{{id}}'] = 'x';\n{{/items}}\n",
            "items = [{ id = \"a\" }, { id = \"b\" }]",
        );
        insta::assert_snapshot!(out, @r###"
        <?php
        $string['a'] = 'x';
        $string['b'] = 'x';
        "###);
    }
}
