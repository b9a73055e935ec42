//! Span classification for syntax highlighting.

use std::sync::Arc;

use crate::lexer::{SyntaxToken, TokenKind, Trivia, TriviaKind, lex};
use crate::source::SourceText;
use crate::span::TextSpan;
use crate::syntax_tree::SyntaxTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Keyword,
    Identifier,
    Number,
    String,
    Comment,
    Whitespace,
    /// Operators, punctuation and anything unrecognized.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedSpan {
    pub span: TextSpan,
    pub classification: Classification,
}

/// Classify every token and trivia piece overlapping `span`, in source
/// order. Results are clamped to `span`; zero-width tokens are skipped.
pub fn classify(tree: &SyntaxTree, span: TextSpan) -> Vec<ClassifiedSpan> {
    let mut result = Vec::new();
    for token in tree.root_node().tokens() {
        classify_token(token, span, &mut result);
    }
    result
}

fn classify_token(token: &SyntaxToken, span: TextSpan, result: &mut Vec<ClassifiedSpan>) {
    for trivia in &token.leading_trivia {
        add(result, trivia.span(), span, classify_trivia(trivia));
    }
    add(result, token.span(), span, classify_kind(token.kind));
    for trivia in &token.trailing_trivia {
        add(result, trivia.span(), span, classify_trivia(trivia));
    }
}

fn add(result: &mut Vec<ClassifiedSpan>, element: TextSpan, span: TextSpan, classification: Classification) {
    if !element.overlaps_with(span) {
        return;
    }
    let start = element.start.max(span.start);
    let end = element.end().min(span.end());
    result.push(ClassifiedSpan {
        span: TextSpan::from_bounds(start, end),
        classification,
    });
}

fn classify_kind(kind: TokenKind) -> Classification {
    match kind {
        kind if kind.is_keyword() => Classification::Keyword,
        TokenKind::Identifier => Classification::Identifier,
        TokenKind::Number => Classification::Number,
        TokenKind::String => Classification::String,
        _ => Classification::Text,
    }
}

fn classify_trivia(trivia: &Trivia) -> Classification {
    match trivia.kind {
        TriviaKind::Whitespace | TriviaKind::LineBreak => Classification::Whitespace,
        TriviaKind::SingleLineComment | TriviaKind::MultiLineComment => Classification::Comment,
        // Text the parser skipped is still classified as the token it was.
        TriviaKind::SkippedText => {
            let tokens = lex(&Arc::new(SourceText::new(trivia.text.clone()))).tokens;
            tokens
                .first()
                .map_or(Classification::Text, |token| classify_kind(token.kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(source: &str) -> Vec<(Classification, String)> {
        let tree = SyntaxTree::parse(source);
        classify(&tree, TextSpan::new(0, source.len()))
            .into_iter()
            .map(|classified| {
                let text = source[classified.span.start..classified.span.end()].to_string();
                (classified.classification, text)
            })
            .collect()
    }

    #[test]
    fn single_tokens_classify_as_one_span() {
        let cases = [
            ("42", Classification::Number),
            ("\"text\"", Classification::String),
            ("name", Classification::Identifier),
            ("while", Classification::Keyword),
            ("else", Classification::Keyword),
            ("// note", Classification::Comment),
            ("/* block */", Classification::Comment),
            ("   ", Classification::Whitespace),
            ("+", Classification::Text),
            (")", Classification::Text),
            ("$", Classification::Text),
        ];

        for (source, expected) in cases {
            let tree = SyntaxTree::parse(source);
            let spans = classify(&tree, TextSpan::new(0, source.len()));
            assert_eq!(
                spans,
                [ClassifiedSpan {
                    span: TextSpan::new(0, source.len()),
                    classification: expected
                }],
                "{source:?}"
            );
        }
    }

    #[test]
    fn classifies_tokens_and_trivia_in_order() {
        use Classification::*;
        assert_eq!(
            full("var x = 1 // one"),
            [
                (Keyword, "var".to_string()),
                (Whitespace, " ".to_string()),
                (Identifier, "x".to_string()),
                (Whitespace, " ".to_string()),
                (Text, "=".to_string()),
                (Whitespace, " ".to_string()),
                (Number, "1".to_string()),
                (Whitespace, " ".to_string()),
                (Comment, "// one".to_string()),
            ]
        );
    }

    #[test]
    fn clamps_to_the_requested_span() {
        let tree = SyntaxTree::parse("print(\"hello\")");
        let spans = classify(&tree, TextSpan::new(7, 3));
        assert_eq!(
            spans,
            [ClassifiedSpan {
                span: TextSpan::new(7, 3),
                classification: Classification::String
            }]
        );
    }
}
