//! Lexer for Mustache templates using logos

use logos::Logos;

use crate::error::TemplateSyntaxError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Block tags
    #[regex(r"\{\{#[^}]*\}\}", |lex| tag_name(lex.slice(), 3, 2))]
    SectionOpen(String),
    #[regex(r"\{\{\^[^}]*\}\}", |lex| tag_name(lex.slice(), 3, 2))]
    InvertedOpen(String),
    #[regex(r"\{\{/[^}]*\}\}", |lex| tag_name(lex.slice(), 3, 2))]
    SectionClose(String),
    #[regex(r"\{\{>[^}]*\}\}", |lex| tag_name(lex.slice(), 3, 2))]
    Partial(String),
    #[regex(r"\{\{!([^}]|\}[^}])*\}\}")]
    Comment,

    // Interpolation (triple mustache and ampersand are the same thing)
    #[regex(r"\{\{\{[^}]*\}\}\}", |lex| tag_name(lex.slice(), 3, 3))]
    #[regex(r"\{\{&[^}]*\}\}", |lex| tag_name(lex.slice(), 3, 2))]
    Unescaped(String),
    #[regex(r"\{\{[^}#^/>!&{][^}]*\}\}", |lex| tag_name(lex.slice(), 2, 2))]
    Variable(String),

    // Literal text. A brace that does not open a tag is text as well.
    #[regex(r"[^{]+", |lex| lex.slice().to_string())]
    #[token("{", |_| "{".to_string())]
    Text(String),
}

impl Token {
    /// Tags that are removed together with their line when they stand alone on it
    fn is_standalone_candidate(&self) -> bool {
        matches!(
            self,
            Token::SectionOpen(_)
                | Token::InvertedOpen(_)
                | Token::SectionClose(_)
                | Token::Partial(_)
                | Token::Comment
        )
    }
}

/// Strip the delimiters and sigil from a tag and trim the name
fn tag_name(slice: &str, open: usize, close: usize) -> String {
    slice[open..slice.len() - close].trim().to_string()
}

/// Lex a template into raw tokens with their spans.
///
/// A tag that is opened but never closed is reported with the span the
/// lexer gave up on; lexing continues so every such tag is reported.
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, Vec<TemplateSyntaxError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for (tok, span) in Token::lexer(input).spanned() {
        match tok {
            Ok(tok) => tokens.push((tok, span)),
            Err(()) => errors.push(TemplateSyntaxError::unclosed_tag(span)),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// Lex a template into the token stream consumed by the parser.
///
/// Adjacent text runs are merged, standalone lines are stripped and
/// comments are dropped.
pub fn tokenize(input: &str) -> Result<Vec<(Token, Span)>, Vec<TemplateSyntaxError>> {
    let mut tokens: Vec<(Token, Span)> = Vec::new();
    for (tok, span) in lex(input)? {
        if let (Token::Text(next), Some((Token::Text(prev), prev_span))) = (&tok, tokens.last_mut())
        {
            prev.push_str(next);
            prev_span.end = span.end;
            continue;
        }
        tokens.push((tok, span));
    }

    strip_standalone(&mut tokens);

    tokens.retain(|(tok, _)| match tok {
        Token::Comment => false,
        Token::Text(text) => !text.is_empty(),
        _ => true,
    });
    Ok(tokens)
}

fn strip_standalone(tokens: &mut [(Token, Span)]) {
    // Decide on the untouched text first; trimming one tag's line must not
    // change the verdict for its neighbours.
    let standalone: Vec<usize> = (0..tokens.len())
        .filter(|&i| {
            tokens[i].0.is_standalone_candidate() && opens_line(tokens, i) && closes_line(tokens, i)
        })
        .collect();

    for i in standalone {
        if i > 0 {
            if let Token::Text(text) = &mut tokens[i - 1].0 {
                let kept = text.trim_end_matches([' ', '\t']).len();
                text.truncate(kept);
            }
        }
        if let Some((Token::Text(text), _)) = tokens.get_mut(i + 1) {
            let rest = text.trim_start_matches([' ', '\t']);
            let rest = rest
                .strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
                .unwrap_or(rest)
                .to_string();
            *text = rest;
        }
    }
}

fn opens_line(tokens: &[(Token, Span)], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    match &tokens[i - 1].0 {
        Token::Text(text) => {
            let head = text.trim_end_matches([' ', '\t']);
            head.ends_with('\n') || (head.is_empty() && i == 1)
        }
        _ => false,
    }
}

fn closes_line(tokens: &[(Token, Span)], i: usize) -> bool {
    match tokens.get(i + 1) {
        None => true,
        Some((Token::Text(text), _)) => {
            let rest = text.trim_start_matches([' ', '\t']);
            rest.starts_with('\n')
                || rest.starts_with("\r\n")
                || (rest.is_empty() && i + 2 == tokens.len())
        }
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input)
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_variable_tags() {
        assert_eq!(
            kinds("Hi {{ name }}, {{{raw}}} {{&amp}}"),
            vec![
                Token::Text("Hi ".to_string()),
                Token::Variable("name".to_string()),
                Token::Text(", ".to_string()),
                Token::Unescaped("raw".to_string()),
                Token::Text(" ".to_string()),
                Token::Unescaped("amp".to_string()),
            ]
        );
    }

    #[test]
    fn test_block_tags() {
        assert_eq!(
            kinds("{{#a}}{{^b}}{{/b}}{{/a}}{{> common/boilerplate}}"),
            vec![
                Token::SectionOpen("a".to_string()),
                Token::InvertedOpen("b".to_string()),
                Token::SectionClose("b".to_string()),
                Token::SectionClose("a".to_string()),
                Token::Partial("common/boilerplate".to_string()),
            ]
        );
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            kinds("a{{! ignore } me }}b"),
            vec![
                Token::Text("a".to_string()),
                Token::Comment,
                Token::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_lone_braces_are_text() {
        let tokens = tokenize("function f() { return 1; }").expect("Should lex");
        assert_eq!(
            tokens.into_iter().map(|(t, _)| t).collect::<Vec<_>>(),
            vec![Token::Text("function f() { return 1; }".to_string())]
        );
    }

    #[test]
    fn test_merged_text_span() {
        let tokens = tokenize("x { y").expect("Should lex");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].1, 0..5);
    }

    #[test]
    fn test_standalone_section_lines_removed() {
        let tokens: Vec<_> = tokenize("a\n  {{#s}}\nb\n{{/s}}\nc\n")
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Text("a\n".to_string()),
                Token::SectionOpen("s".to_string()),
                Token::Text("b\n".to_string()),
                Token::SectionClose("s".to_string()),
                Token::Text("c\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_standalone_comment_dropped_with_line() {
        let tokens: Vec<_> = tokenize("a\n{{! note }}\nb")
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![Token::Text("a\n".to_string()), Token::Text("b".to_string())]
        );
    }

    #[test]
    fn test_inline_section_not_standalone() {
        let tokens: Vec<_> = tokenize("a {{#s}}b{{/s}}\n")
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(tokens[0], Token::Text("a ".to_string()));
        assert_eq!(tokens[4], Token::Text("\n".to_string()));
    }

    #[test]
    fn test_variables_never_standalone() {
        let tokens: Vec<_> = tokenize("{{name}}\n")
            .expect("Should lex")
            .into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Variable("name".to_string()),
                Token::Text("\n".to_string())
            ]
        );
    }

    #[test]
    fn test_consecutive_standalone_tags() {
        let tokens: Vec<_> = tokenize("{{#a}}\n{{#b}}\nx\n{{/b}}\n{{/a}}\n")
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::SectionOpen("a".to_string()),
                Token::SectionOpen("b".to_string()),
                Token::Text("x\n".to_string()),
                Token::SectionClose("b".to_string()),
                Token::SectionClose("a".to_string()),
            ]
        );
    }

    /// Start of the first unclosed tag reported for `input`
    fn unclosed_at(input: &str) -> usize {
        let errors = lex(input).expect_err("Should report unclosed tag");
        errors[0].span().start
    }

    #[test]
    fn test_unclosed_section_tag() {
        assert_eq!(unclosed_at("a {{# b"), 2);
    }

    #[test]
    fn test_unclosed_variable_tag() {
        assert_eq!(unclosed_at("x {{ y"), 2);
    }

    #[test]
    fn test_triple_mustache_closed_by_two_braces() {
        assert_eq!(unclosed_at("p {{{q}} r"), 2);
    }

    #[test]
    fn test_unclosed_comment() {
        assert_eq!(unclosed_at("{{! never closed"), 0);
    }

    #[test]
    fn test_unclosed_tag_fails_tokenize() {
        let errors = tokenize("keep {{#this").unwrap_err();
        assert!(errors[0].to_string().contains("unclosed tag"));
    }
}
