//! Lexer for Quill source text.
//!
//! The lexer never fails: malformed input becomes `BadToken`s (or a
//! token with a diagnostic attached), and the stream always ends with a
//! single `Eof` token. Whitespace and comments are kept as trivia on the
//! neighbouring tokens.

use std::sync::Arc;

use crate::diagnostic::{Diagnostic, DiagnosticBag};
use crate::source::SourceText;
use crate::span::TextSpan;
use crate::value::Value;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Eof,
    BadToken,

    // Identifiers and literals
    Identifier,
    Number,
    String,

    // Operators
    Plus,                // +
    Minus,               // -
    Star,                // *
    Slash,               // /
    Percent,             // %
    Bang,                // !
    Tilde,               // ~
    Hat,                 // ^
    Ampersand,           // &
    AmpersandAmpersand,  // &&
    Pipe,                // |
    PipePipe,            // ||
    Equals,              // =
    EqualsEquals,        // ==
    BangEquals,          // !=
    Less,                // <
    LessEquals,          // <=
    Greater,             // >
    GreaterEquals,       // >=

    // Punctuation
    OpenParen,   // (
    CloseParen,  // )
    OpenBrace,   // {
    CloseBrace,  // }
    Comma,       // ,
    Colon,       // :
    Dot,         // .

    // Keywords
    Break,
    Continue,
    Do,
    Else,
    Enum,
    False,
    For,
    Function,
    If,
    Let,
    Return,
    Step,
    To,
    True,
    Var,
    While,
}

impl TokenKind {
    /// Exact keyword lookup.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        use TokenKind::*;
        let kind = match text {
            "break" => Break,
            "continue" => Continue,
            "do" => Do,
            "else" => Else,
            "enum" => Enum,
            "false" => False,
            "for" => For,
            "function" => Function,
            "if" => If,
            "let" => Let,
            "return" => Return,
            "step" => Step,
            "to" => To,
            "true" => True,
            "var" => Var,
            "while" => While,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Break | Continue | Do | Else | Enum | False | For | Function | If | Let | Return | Step | To | True
                | Var | While
        )
    }

    /// Source text of tokens whose spelling never varies.
    pub fn fixed_text(self) -> Option<&'static str> {
        use TokenKind::*;
        let text = match self {
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Bang => "!",
            Tilde => "~",
            Hat => "^",
            Ampersand => "&",
            AmpersandAmpersand => "&&",
            Pipe => "|",
            PipePipe => "||",
            Equals => "=",
            EqualsEquals => "==",
            BangEquals => "!=",
            Less => "<",
            LessEquals => "<=",
            Greater => ">",
            GreaterEquals => ">=",
            OpenParen => "(",
            CloseParen => ")",
            OpenBrace => "{",
            CloseBrace => "}",
            Comma => ",",
            Colon => ":",
            Dot => ".",
            Break => "break",
            Continue => "continue",
            Do => "do",
            Else => "else",
            Enum => "enum",
            False => "false",
            For => "for",
            Function => "function",
            If => "if",
            Let => "let",
            Return => "return",
            Step => "step",
            To => "to",
            True => "true",
            Var => "var",
            While => "while",
            Eof | BadToken | Identifier | Number | String => return None,
        };
        Some(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaKind {
    Whitespace,
    LineBreak,
    SingleLineComment,
    MultiLineComment,
    /// Text the parser could not use, e.g. bad characters.
    SkippedText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub position: usize,
    pub text: String,
}

impl Trivia {
    pub fn span(&self) -> TextSpan {
        TextSpan::new(self.position, self.text.len())
    }
}

/// A token with its text, literal value and surrounding trivia.
///
/// `span` covers the token text only; `full_span` includes trivia.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken {
    pub kind: TokenKind,
    pub position: usize,
    pub text: String,
    pub value: Option<Value>,
    pub leading_trivia: Vec<Trivia>,
    pub trailing_trivia: Vec<Trivia>,
    /// Fabricated by the parser during error recovery.
    pub is_missing: bool,
}

impl SyntaxToken {
    /// A zero-width placeholder inserted when the parser expected `kind`.
    pub fn missing(kind: TokenKind, position: usize) -> Self {
        SyntaxToken {
            kind,
            position,
            text: String::new(),
            value: None,
            leading_trivia: Vec::new(),
            trailing_trivia: Vec::new(),
            is_missing: true,
        }
    }

    pub fn span(&self) -> TextSpan {
        TextSpan::new(self.position, self.text.len())
    }

    pub fn full_span(&self) -> TextSpan {
        let start = self
            .leading_trivia
            .first()
            .map_or(self.position, |trivia| trivia.position);
        let end = self
            .trailing_trivia
            .last()
            .map_or(self.span().end(), |trivia| trivia.span().end());
        TextSpan::from_bounds(start, end)
    }
}

/// Result of lexing a source text.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<SyntaxToken>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lex a source text into tokens, ending with `Eof`.
pub fn lex(text: &Arc<SourceText>) -> LexResult {
    let mut lexer = Lexer {
        source: text.as_str(),
        chars: text.as_str().as_bytes(),
        index: 0,
        diagnostics: DiagnosticBag::new(text.clone()),
    };
    let tokens = lexer.run();
    log::trace!("lexed {} tokens from '{}'", tokens.len(), text.file_name());
    LexResult {
        tokens,
        diagnostics: lexer.diagnostics.into_vec(),
    }
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    index: usize,
    diagnostics: DiagnosticBag,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Vec<SyntaxToken> {
        let mut tokens = Vec::new();

        loop {
            let leading_trivia = self.read_trivia(true);
            let start = self.index;
            let (kind, value) = self.read_token();
            let text = self.source[start..self.index].to_string();
            let trailing_trivia = self.read_trivia(false);

            tokens.push(SyntaxToken {
                kind,
                position: start,
                text,
                value,
                leading_trivia,
                trailing_trivia,
                is_missing: false,
            });

            if kind == TokenKind::Eof {
                break;
            }
        }

        tokens
    }

    /// Trailing trivia stops after the first line break; whatever follows
    /// becomes leading trivia of the next token.
    fn read_trivia(&mut self, leading: bool) -> Vec<Trivia> {
        let mut trivia = Vec::new();

        while let Some(ch) = self.peek_char() {
            let start = self.index;
            let kind = match ch {
                b'/' if self.peek_next() == Some(b'/') => {
                    self.read_single_line_comment();
                    TriviaKind::SingleLineComment
                }
                b'/' if self.peek_next() == Some(b'*') => {
                    self.read_multi_line_comment();
                    TriviaKind::MultiLineComment
                }
                b'\n' | b'\r' => {
                    self.read_line_break();
                    TriviaKind::LineBreak
                }
                b' ' | b'\t' => {
                    while matches!(self.peek_char(), Some(b' ' | b'\t')) {
                        self.consume_char();
                    }
                    TriviaKind::Whitespace
                }
                _ => break,
            };

            trivia.push(Trivia {
                kind,
                position: start,
                text: self.source[start..self.index].to_string(),
            });

            if kind == TriviaKind::LineBreak && !leading {
                break;
            }
        }

        trivia
    }

    fn read_line_break(&mut self) {
        let first = self.peek_char();
        self.consume_char();
        match (first, self.peek_char()) {
            (Some(b'\r'), Some(b'\n')) | (Some(b'\n'), Some(b'\r')) => self.consume_char(),
            _ => {}
        }
    }

    fn read_single_line_comment(&mut self) {
        // skip "//"
        self.consume_char();
        self.consume_char();
        while let Some(ch) = self.peek_char() {
            if matches!(ch, b'\n' | b'\r') {
                break;
            }
            self.consume_char();
        }
    }

    fn read_multi_line_comment(&mut self) {
        let start = self.index;
        // skip "/*"
        self.consume_char();
        self.consume_char();
        loop {
            match self.peek_char() {
                None => {
                    self.diagnostics
                        .report_unterminated_comment(TextSpan::from_bounds(start, self.index));
                    return;
                }
                Some(b'*') if self.peek_next() == Some(b'/') => {
                    self.consume_char();
                    self.consume_char();
                    return;
                }
                Some(_) => self.consume_char(),
            }
        }
    }

    fn read_token(&mut self) -> (TokenKind, Option<Value>) {
        use TokenKind as T;

        let Some(ch) = self.peek_char() else {
            return (T::Eof, None);
        };

        let kind = match ch {
            b'+' => self.single(T::Plus),
            b'-' => self.single(T::Minus),
            b'*' => self.single(T::Star),
            b'/' => self.single(T::Slash),
            b'%' => self.single(T::Percent),
            b'~' => self.single(T::Tilde),
            b'^' => self.single(T::Hat),
            b'(' => self.single(T::OpenParen),
            b')' => self.single(T::CloseParen),
            b'{' => self.single(T::OpenBrace),
            b'}' => self.single(T::CloseBrace),
            b',' => self.single(T::Comma),
            b':' => self.single(T::Colon),
            b'.' => self.single(T::Dot),
            b'&' => self.single_or_double(b'&', T::Ampersand, T::AmpersandAmpersand),
            b'|' => self.single_or_double(b'|', T::Pipe, T::PipePipe),
            b'=' => self.single_or_double(b'=', T::Equals, T::EqualsEquals),
            b'!' => self.single_or_double(b'=', T::Bang, T::BangEquals),
            b'<' => self.single_or_double(b'=', T::Less, T::LessEquals),
            b'>' => self.single_or_double(b'=', T::Greater, T::GreaterEquals),
            b'"' => return self.lex_string(),
            b'0'..=b'9' => return self.lex_number(),
            _ if is_ident_start(ch) => self.lex_ident_or_keyword(),
            _ => self.bad_character(),
        };
        (kind, None)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.consume_char();
        kind
    }

    fn single_or_double(&mut self, second: u8, single: TokenKind, double: TokenKind) -> TokenKind {
        self.consume_char();
        if self.peek_char() == Some(second) {
            self.consume_char();
            double
        } else {
            single
        }
    }

    fn bad_character(&mut self) -> TokenKind {
        let start = self.index;
        let character = self.source[start..].chars().next().unwrap_or('\u{fffd}');
        self.index += character.len_utf8();
        self.diagnostics.report_bad_character(start, character);
        TokenKind::BadToken
    }

    fn lex_string(&mut self) -> (TokenKind, Option<Value>) {
        let start = self.index;
        // opening quote
        self.consume_char();

        let mut value = String::new();
        loop {
            match self.peek_char() {
                None | Some(b'\n' | b'\r') => {
                    self.diagnostics
                        .report_unterminated_string(TextSpan::from_bounds(start, self.index));
                    break;
                }
                Some(b'"') if self.peek_next() == Some(b'"') => {
                    value.push('"');
                    self.consume_char();
                    self.consume_char();
                }
                Some(b'"') => {
                    self.consume_char();
                    break;
                }
                Some(b'\\') => {
                    self.consume_char();
                    let escaped = match self.peek_char() {
                        Some(b'n') => '\n',
                        Some(b't') => '\t',
                        Some(b'r') => '\r',
                        Some(b'"') => '"',
                        Some(b'\\') => '\\',
                        _ => {
                            // Unknown escapes are kept verbatim.
                            value.push('\\');
                            continue;
                        }
                    };
                    value.push(escaped);
                    self.consume_char();
                }
                Some(_) => {
                    let ch = self.source[self.index..].chars().next().unwrap_or('\u{fffd}');
                    value.push(ch);
                    self.index += ch.len_utf8();
                }
            }
        }

        (TokenKind::String, Some(Value::String(value)))
    }

    fn lex_number(&mut self) -> (TokenKind, Option<Value>) {
        let start = self.index;
        while matches!(self.peek_char(), Some(b'0'..=b'9')) {
            self.consume_char();
        }

        // Overflowing literals carry no value; the binder reports them.
        let value = self.source[start..self.index].parse::<i32>().ok().map(Value::Int);
        (TokenKind::Number, value)
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let start = self.index;
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.index];
        TokenKind::keyword(text).unwrap_or(TokenKind::Identifier)
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;

    fn lex_str(source: &str) -> LexResult {
        lex(&Arc::new(SourceText::new(source)))
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex_str(source).tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn lexes_every_fixed_token_alone() {
        use TokenKind::*;
        let all = [
            Plus, Minus, Star, Slash, Percent, Bang, Tilde, Hat, Ampersand, AmpersandAmpersand, Pipe, PipePipe,
            Equals, EqualsEquals, BangEquals, Less, LessEquals, Greater, GreaterEquals, OpenParen, CloseParen,
            OpenBrace, CloseBrace, Comma, Colon, Dot, Break, Continue, Do, Else, Enum, False, For, Function, If,
            Let, Return, Step, To, True, Var, While,
        ];
        for kind in all {
            let text = kind.fixed_text().expect("fixed text");
            let result = lex_str(text);
            assert_eq!(result.tokens.len(), 2, "{text}");
            assert_eq!(result.tokens[0].kind, kind);
            assert_eq!(result.tokens[0].text, text);
            assert!(result.diagnostics.is_empty());
        }
    }

    #[test]
    fn uses_longest_match_for_operators() {
        use TokenKind::*;
        assert_eq!(kinds("a<=b"), [Identifier, LessEquals, Identifier, Eof]);
        assert_eq!(kinds("a < = b"), [Identifier, Less, Equals, Identifier, Eof]);
        assert_eq!(kinds("!!="), [Bang, BangEquals, Eof]);
        assert_eq!(kinds("&&&"), [AmpersandAmpersand, Ampersand, Eof]);
    }

    #[test]
    fn lexes_literals_with_values() {
        let result = lex_str(r#"42 "a\"b""c" true"#);
        assert_eq!(result.tokens[0].value, Some(Value::Int(42)));
        assert_eq!(result.tokens[1].kind, TokenKind::String);
        assert_eq!(result.tokens[1].value, Some(Value::String("a\"b\"c".into())));
        assert_eq!(result.tokens[2].kind, TokenKind::True);
    }

    #[test]
    fn overflowing_number_has_no_value() {
        let result = lex_str("99999999999");
        assert_eq!(result.tokens[0].kind, TokenKind::Number);
        assert_eq!(result.tokens[0].value, None);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn reports_bad_characters_as_tokens() {
        let result = lex_str("1 $ 2");
        let kinds: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, [TokenKind::Number, TokenKind::BadToken, TokenKind::Number, TokenKind::Eof]);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::BadCharacter);
        assert_eq!(result.diagnostics[0].span(), TextSpan::new(2, 1));
    }

    #[test]
    fn unterminated_literals_are_still_tokens() {
        let string = lex_str("\"abc");
        assert_eq!(string.tokens[0].kind, TokenKind::String);
        assert_eq!(string.diagnostics[0].code, DiagnosticCode::UnterminatedString);

        let comment = lex_str("1 /* never closed");
        assert_eq!(comment.tokens.len(), 2);
        assert_eq!(comment.diagnostics[0].code, DiagnosticCode::UnterminatedComment);
        assert_eq!(comment.tokens[0].trailing_trivia[1].kind, TriviaKind::MultiLineComment);
    }

    #[test]
    fn splits_trivia_at_first_line_break() {
        let result = lex_str("a // note\n\n  // next\n  b");
        let a = &result.tokens[0];
        let b = &result.tokens[1];

        let trailing: Vec<_> = a.trailing_trivia.iter().map(|t| t.kind).collect();
        assert_eq!(
            trailing,
            [TriviaKind::Whitespace, TriviaKind::SingleLineComment, TriviaKind::LineBreak]
        );

        let leading: Vec<_> = b.leading_trivia.iter().map(|t| t.kind).collect();
        assert_eq!(
            leading,
            [
                TriviaKind::LineBreak,
                TriviaKind::Whitespace,
                TriviaKind::SingleLineComment,
                TriviaKind::LineBreak,
                TriviaKind::Whitespace,
            ]
        );
        assert_eq!(a.full_span().end(), b.full_span().start);
    }

    #[test]
    fn full_spans_cover_the_whole_input() {
        let source = "  var x = 10 // ten\n\tx\n";
        let result = lex_str(source);
        let mut position = 0;
        for token in &result.tokens {
            let full = token.full_span();
            assert_eq!(full.start, position);
            position = full.end();
        }
        assert_eq!(position, source.len());
    }
}
