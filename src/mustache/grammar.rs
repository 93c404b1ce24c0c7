//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::TemplateSyntaxError;
use crate::mustache::ast::*;
use crate::mustache::lexer::{tokenize, Token};

/// Parse template source into an AST
pub fn parse(input: &str) -> Result<Template, Vec<TemplateSyntaxError>> {
    let len = input.len();

    let token_iter = tokenize(input)?
        .into_iter()
        .map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    template_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn template_parser<'a, I>() -> impl Parser<'a, I, Template, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let node = recursive(|node| {
        let text = select! {
            Token::Text(s) => Node::Text(s),
        };

        let variable = select! {
            Token::Variable(name) => Node::Variable { name: TagName::new(&name), escape: true },
            Token::Unescaped(name) => Node::Variable { name: TagName::new(&name), escape: false },
        };

        let partial = select! {
            Token::Partial(name) => Node::Partial(name),
        };

        let open = select! {
            Token::SectionOpen(name) => (name, false),
            Token::InvertedOpen(name) => (name, true),
        };

        let close = select! {
            Token::SectionClose(name) => name,
        };

        // A section must be closed by a tag carrying the same name
        let section = open
            .then(node.clone().repeated().collect::<Vec<_>>())
            .then(close)
            .try_map(|(((name, inverted), children), closed), span: SimpleSpan| {
                if name != closed {
                    return Err(Rich::custom(
                        span,
                        format!("section '{}' closed by '{}'", name, closed),
                    ));
                }
                Ok(Node::Section {
                    name: TagName::new(&name),
                    inverted,
                    children,
                })
            });

        choice((text, variable, partial, section)).boxed()
    });

    node.repeated()
        .collect()
        .then_ignore(end())
        .map(Template::new)
}
