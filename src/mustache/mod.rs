//! Mustache template engine
//!
//! Templates are lexed with logos, parsed with chumsky into a small AST and
//! rendered against TOML data. Supported tags: variables (escaped and raw),
//! sections, inverted sections, partials and comments. Tags standing alone on
//! a line remove the whole line from the output.
//!
//! # Example
//!
//! ```text
//! {{#self.lang_strings}}
//! $string['{{id}}'] = '{{{text}}}';
//! {{/self.lang_strings}}
//! ```

pub mod ast;
mod grammar;
pub mod lexer;
pub mod render;

pub use ast::{Node, TagName, Template};
pub use grammar::parse;
pub use render::{render, NoPartials, PartialResolver, RenderError};
