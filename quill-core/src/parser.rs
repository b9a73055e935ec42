//! Recursive-descent parser with precedence climbing for operators.
//!
//! The parser never fails. When the current token is not the one it
//! expects, it reports `UnexpectedToken` and fabricates a zero-width token
//! of the expected kind. Every member and statement loop makes sure at
//! least one token is consumed per iteration; a token nobody could use is
//! folded into the next token's leading trivia as skipped text.

use std::sync::Arc;

use crate::ast::*;
use crate::diagnostic::{Diagnostic, DiagnosticBag};
use crate::lexer::{self, SyntaxToken, TokenKind, Trivia, TriviaKind};
use crate::source::SourceText;

pub(crate) fn parse_compilation_unit(text: &Arc<SourceText>) -> (CompilationUnitSyntax, Vec<Diagnostic>) {
    let lexed = lexer::lex(text);
    let mut diagnostics = DiagnosticBag::new(text.clone());
    diagnostics.extend(lexed.diagnostics);

    let mut parser = Parser {
        text: text.clone(),
        tokens: fold_bad_tokens(lexed.tokens),
        position: 0,
        diagnostics,
    };
    let unit = parser.parse_compilation_unit();
    (unit, parser.diagnostics.into_vec())
}

/// Move every `BadToken` into the leading trivia of the next real token.
fn fold_bad_tokens(tokens: Vec<SyntaxToken>) -> Vec<SyntaxToken> {
    let mut folded = Vec::with_capacity(tokens.len());
    let mut pending: Vec<Trivia> = Vec::new();

    for mut token in tokens {
        if token.kind == TokenKind::BadToken {
            pending.extend(token.leading_trivia);
            pending.push(Trivia {
                kind: TriviaKind::SkippedText,
                position: token.position,
                text: token.text,
            });
            pending.extend(token.trailing_trivia);
            continue;
        }

        if !pending.is_empty() {
            pending.append(&mut token.leading_trivia);
            token.leading_trivia = std::mem::take(&mut pending);
        }
        folded.push(token);
    }

    folded
}

/// Binding power of binary operators; 0 means "not a binary operator".
#[rustfmt::skip]
pub fn binary_precedence(kind: TokenKind) -> u8 {
    use TokenKind::*;
    match kind {
        Star | Slash | Percent                                        => 5,
        Plus | Minus                                                  => 4,
        EqualsEquals | BangEquals | Less | LessEquals | Greater
            | GreaterEquals                                           => 3,
        Ampersand | AmpersandAmpersand                                => 2,
        Pipe | PipePipe | Hat                                         => 1,
        _                                                             => 0,
    }
}

/// Binding power of prefix operators; 0 means "not a unary operator".
pub fn unary_precedence(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::Plus | TokenKind::Minus | TokenKind::Bang | TokenKind::Tilde => 6,
        _ => 0,
    }
}

struct Parser {
    text: Arc<SourceText>,
    tokens: Vec<SyntaxToken>,
    position: usize,
    diagnostics: DiagnosticBag,
}

impl Parser {
    fn peek(&self, offset: usize) -> &SyntaxToken {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + offset).min(last)]
    }

    fn current(&self) -> &SyntaxToken {
        self.peek(0)
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn next_token(&mut self) -> SyntaxToken {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn match_token(&mut self, kind: TokenKind) -> SyntaxToken {
        if self.current_kind() == kind {
            return self.next_token();
        }

        let current = self.current();
        let (span, actual, position) = (current.span(), current.kind, current.position);
        self.diagnostics.report_unexpected_token(span, actual, kind);
        SyntaxToken::missing(kind, position)
    }

    /// Drop the current token, keeping its text as skipped trivia of the
    /// next one. `Eof` is never skipped.
    fn skip_token(&mut self) {
        if self.current_kind() == TokenKind::Eof {
            return;
        }

        let skipped = self.tokens[self.position].clone();
        let mut trivia = skipped.leading_trivia;
        trivia.push(Trivia {
            kind: TriviaKind::SkippedText,
            position: skipped.position,
            text: skipped.text,
        });
        trivia.extend(skipped.trailing_trivia);

        let next = &mut self.tokens[self.position + 1];
        trivia.append(&mut next.leading_trivia);
        next.leading_trivia = trivia;
        self.position += 1;
    }

    fn on_same_line(&self, a: &SyntaxToken, b: &SyntaxToken) -> bool {
        self.text.line_index(a.position) == self.text.line_index(b.position)
    }

    fn parse_compilation_unit(&mut self) -> CompilationUnitSyntax {
        let mut members = Vec::new();

        while self.current_kind() != TokenKind::Eof {
            let start = self.position;
            members.push(self.parse_member());
            if self.position == start {
                self.skip_token();
            }
        }

        let end_of_file = self.match_token(TokenKind::Eof);
        CompilationUnitSyntax { members, end_of_file }
    }

    fn parse_member(&mut self) -> MemberSyntax {
        match self.current_kind() {
            TokenKind::Function => MemberSyntax::Function(self.parse_function_declaration()),
            TokenKind::Enum => MemberSyntax::Enum(self.parse_enum_declaration()),
            _ => MemberSyntax::GlobalStatement(self.parse_statement()),
        }
    }

    fn parse_function_declaration(&mut self) -> FunctionDeclarationSyntax {
        let function_keyword = self.match_token(TokenKind::Function);
        let identifier = self.match_token(TokenKind::Identifier);
        let open_paren = self.match_token(TokenKind::OpenParen);
        let parameters = self.parse_separated(TokenKind::CloseParen, Parser::parse_parameter);
        let close_paren = self.match_token(TokenKind::CloseParen);
        let type_clause = self.parse_optional_type_clause();
        let body = self.parse_block_statement();

        FunctionDeclarationSyntax {
            function_keyword,
            identifier,
            open_paren,
            parameters,
            close_paren,
            type_clause,
            body,
        }
    }

    fn parse_parameter(&mut self) -> ParameterSyntax {
        let identifier = self.match_token(TokenKind::Identifier);
        let type_clause = self.parse_type_clause();
        ParameterSyntax { identifier, type_clause }
    }

    fn parse_enum_declaration(&mut self) -> EnumDeclarationSyntax {
        let enum_keyword = self.match_token(TokenKind::Enum);
        let identifier = self.match_token(TokenKind::Identifier);
        let open_brace = self.match_token(TokenKind::OpenBrace);
        let members = self.parse_separated(TokenKind::CloseBrace, |parser| {
            parser.match_token(TokenKind::Identifier)
        });
        let close_brace = self.match_token(TokenKind::CloseBrace);

        EnumDeclarationSyntax {
            enum_keyword,
            identifier,
            open_brace,
            members,
            close_brace,
        }
    }

    /// `item (',' item)*` up to (not including) `close`.
    fn parse_separated<T>(
        &mut self,
        close: TokenKind,
        mut parse_item: impl FnMut(&mut Parser) -> T,
    ) -> SeparatedList<T> {
        let mut list = SeparatedList::new();

        while self.current_kind() != close && self.current_kind() != TokenKind::Eof {
            list.items.push(parse_item(self));
            if self.current_kind() == TokenKind::Comma {
                list.separators.push(self.next_token());
            } else {
                break;
            }
        }

        list
    }

    fn parse_optional_type_clause(&mut self) -> Option<TypeClauseSyntax> {
        (self.current_kind() == TokenKind::Colon).then(|| self.parse_type_clause())
    }

    fn parse_type_clause(&mut self) -> TypeClauseSyntax {
        let colon = self.match_token(TokenKind::Colon);
        let identifier = self.match_token(TokenKind::Identifier);
        TypeClauseSyntax { colon, identifier }
    }

    fn parse_statement(&mut self) -> StatementSyntax {
        match self.current_kind() {
            TokenKind::OpenBrace => StatementSyntax::Block(self.parse_block_statement()),
            TokenKind::Var | TokenKind::Let => self.parse_variable_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Break => StatementSyntax::Break(self.next_token()),
            TokenKind::Continue => StatementSyntax::Continue(self.next_token()),
            TokenKind::Return => self.parse_return_statement(),
            _ => StatementSyntax::Expression(self.parse_expression()),
        }
    }

    fn parse_block_statement(&mut self) -> BlockStatementSyntax {
        let open_brace = self.match_token(TokenKind::OpenBrace);
        let mut statements = Vec::new();

        while !matches!(self.current_kind(), TokenKind::Eof | TokenKind::CloseBrace) {
            let start = self.position;
            statements.push(self.parse_statement());
            if self.position == start {
                self.skip_token();
            }
        }

        let close_brace = self.match_token(TokenKind::CloseBrace);
        BlockStatementSyntax {
            open_brace,
            statements,
            close_brace,
        }
    }

    fn parse_variable_declaration(&mut self) -> StatementSyntax {
        let keyword = self.next_token();
        let identifier = self.match_token(TokenKind::Identifier);
        let type_clause = self.parse_optional_type_clause();
        let equals = self.match_token(TokenKind::Equals);
        let initializer = self.parse_expression();

        StatementSyntax::VariableDeclaration(VariableDeclarationSyntax {
            keyword,
            identifier,
            type_clause,
            equals,
            initializer,
        })
    }

    fn parse_if_statement(&mut self) -> StatementSyntax {
        let if_keyword = self.match_token(TokenKind::If);
        let condition = self.parse_expression();
        let then_statement = Box::new(self.parse_statement());
        // the innermost `if` claims the `else`
        let else_clause = (self.current_kind() == TokenKind::Else).then(|| ElseClauseSyntax {
            else_keyword: self.next_token(),
            else_statement: Box::new(self.parse_statement()),
        });

        StatementSyntax::If(IfStatementSyntax {
            if_keyword,
            condition,
            then_statement,
            else_clause,
        })
    }

    fn parse_while_statement(&mut self) -> StatementSyntax {
        let while_keyword = self.match_token(TokenKind::While);
        let condition = self.parse_expression();
        let body = Box::new(self.parse_statement());
        StatementSyntax::While(WhileStatementSyntax {
            while_keyword,
            condition,
            body,
        })
    }

    fn parse_do_while_statement(&mut self) -> StatementSyntax {
        let do_keyword = self.match_token(TokenKind::Do);
        let body = Box::new(self.parse_statement());
        let while_keyword = self.match_token(TokenKind::While);
        let condition = self.parse_expression();
        StatementSyntax::DoWhile(DoWhileStatementSyntax {
            do_keyword,
            body,
            while_keyword,
            condition,
        })
    }

    fn parse_for_statement(&mut self) -> StatementSyntax {
        let for_keyword = self.match_token(TokenKind::For);
        let identifier = self.match_token(TokenKind::Identifier);
        let equals = self.match_token(TokenKind::Equals);
        let lower_bound = self.parse_expression();
        let to_keyword = self.match_token(TokenKind::To);
        let upper_bound = self.parse_expression();
        let step_clause = (self.current_kind() == TokenKind::Step).then(|| StepClauseSyntax {
            step_keyword: self.next_token(),
            expression: self.parse_expression(),
        });
        let body = Box::new(self.parse_statement());

        StatementSyntax::For(ForStatementSyntax {
            for_keyword,
            identifier,
            equals,
            lower_bound,
            to_keyword,
            upper_bound,
            step_clause,
            body,
        })
    }

    fn parse_return_statement(&mut self) -> StatementSyntax {
        let return_keyword = self.match_token(TokenKind::Return);
        let current = self.current();
        let has_expression = !matches!(current.kind, TokenKind::Eof | TokenKind::CloseBrace)
            && self.on_same_line(&return_keyword, current);
        let expression = has_expression.then(|| self.parse_expression());

        StatementSyntax::Return(ReturnStatementSyntax {
            return_keyword,
            expression,
        })
    }

    fn parse_expression(&mut self) -> ExpressionSyntax {
        self.parse_assignment_expression()
    }

    fn parse_assignment_expression(&mut self) -> ExpressionSyntax {
        if self.peek(0).kind == TokenKind::Identifier && self.peek(1).kind == TokenKind::Equals {
            let identifier = self.next_token();
            let equals = self.next_token();
            let expression = Box::new(self.parse_assignment_expression());
            return ExpressionSyntax::Assignment(AssignmentExpressionSyntax {
                identifier,
                equals,
                expression,
            });
        }

        self.parse_binary_expression(0)
    }

    fn parse_binary_expression(&mut self, parent_precedence: u8) -> ExpressionSyntax {
        let unary = unary_precedence(self.current_kind());
        let mut left = if unary != 0 && unary >= parent_precedence {
            let operator = self.next_token();
            let operand = Box::new(self.parse_binary_expression(unary));
            ExpressionSyntax::Unary(UnaryExpressionSyntax { operator, operand })
        } else {
            self.parse_primary_expression()
        };

        loop {
            let precedence = binary_precedence(self.current_kind());
            if precedence == 0 || precedence <= parent_precedence {
                break;
            }

            let operator = self.next_token();
            let right = Box::new(self.parse_binary_expression(precedence));
            left = ExpressionSyntax::Binary(BinaryExpressionSyntax {
                left: Box::new(left),
                operator,
                right,
            });
        }

        left
    }

    fn parse_primary_expression(&mut self) -> ExpressionSyntax {
        match self.current_kind() {
            TokenKind::OpenParen => {
                let open_paren = self.next_token();
                let expression = Box::new(self.parse_expression());
                let close_paren = self.match_token(TokenKind::CloseParen);
                ExpressionSyntax::Parenthesized(ParenthesizedExpressionSyntax {
                    open_paren,
                    expression,
                    close_paren,
                })
            }
            TokenKind::True | TokenKind::False | TokenKind::Number | TokenKind::String => {
                ExpressionSyntax::Literal(self.next_token())
            }
            TokenKind::Identifier if self.peek(1).kind == TokenKind::OpenParen => self.parse_call_expression(),
            TokenKind::Identifier if self.peek(1).kind == TokenKind::Dot => {
                let target = self.next_token();
                let dot = self.next_token();
                let member = self.match_token(TokenKind::Identifier);
                ExpressionSyntax::MemberAccess(MemberAccessExpressionSyntax { target, dot, member })
            }
            _ => ExpressionSyntax::Name(self.match_token(TokenKind::Identifier)),
        }
    }

    fn parse_call_expression(&mut self) -> ExpressionSyntax {
        let identifier = self.match_token(TokenKind::Identifier);
        let open_paren = self.match_token(TokenKind::OpenParen);
        let arguments = self.parse_separated(TokenKind::CloseParen, Parser::parse_expression);
        let close_paren = self.match_token(TokenKind::CloseParen);

        ExpressionSyntax::Call(CallExpressionSyntax {
            identifier,
            open_paren,
            arguments,
            close_paren,
        })
    }
}
