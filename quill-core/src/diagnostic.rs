//! Diagnostics reported by the lexer, parser and binder.
//!
//! Diagnostics are accumulated, never thrown. Each stage owns a
//! [`DiagnosticBag`] and the compilation merges and sorts them for display.

use std::fmt;
use std::sync::Arc;

use crate::lexer::TokenKind;
use crate::source::{SourceText, TextLocation};
use crate::span::TextSpan;
use crate::types::TypeSymbol;

/// Stable identifier of each kind of problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // lexical
    BadCharacter,
    UnterminatedString,
    UnterminatedComment,
    // syntactic
    UnexpectedToken,
    // semantic
    InvalidLiteralType,
    UndefinedUnaryOperator,
    UndefinedBinaryOperator,
    UndefinedName,
    UndefinedType,
    UndefinedEnumMember,
    NotAVariable,
    NotAFunction,
    NotAnEnum,
    SymbolAlreadyDeclared,
    CannotAssign,
    CannotConvert,
    CannotConvertImplicitly,
    WrongArgumentCount,
    ExpressionMustHaveValue,
    InvalidExpressionStatement,
    InvalidBreakOrContinue,
    InvalidReturnExpression,
    MissingReturnExpression,
    InvalidReturnWithValueInGlobalStatements,
    AllPathsMustReturn,
    MainMustHaveCorrectSignature,
    CannotMixMainAndGlobalStatements,
    OnlyOneFileCanHaveGlobalStatements,
}

impl DiagnosticCode {
    pub fn code(self) -> &'static str {
        use DiagnosticCode::*;
        match self {
            BadCharacter => "Q0001",
            UnterminatedString => "Q0002",
            UnterminatedComment => "Q0003",
            UnexpectedToken => "Q0100",
            InvalidLiteralType => "Q0200",
            UndefinedUnaryOperator => "Q0201",
            UndefinedBinaryOperator => "Q0202",
            UndefinedName => "Q0203",
            UndefinedType => "Q0204",
            UndefinedEnumMember => "Q0205",
            NotAVariable => "Q0206",
            NotAFunction => "Q0207",
            NotAnEnum => "Q0208",
            SymbolAlreadyDeclared => "Q0209",
            CannotAssign => "Q0210",
            CannotConvert => "Q0211",
            CannotConvertImplicitly => "Q0212",
            WrongArgumentCount => "Q0213",
            ExpressionMustHaveValue => "Q0214",
            InvalidExpressionStatement => "Q0215",
            InvalidBreakOrContinue => "Q0216",
            InvalidReturnExpression => "Q0217",
            MissingReturnExpression => "Q0218",
            InvalidReturnWithValueInGlobalStatements => "Q0219",
            AllPathsMustReturn => "Q0220",
            MainMustHaveCorrectSignature => "Q0221",
            CannotMixMainAndGlobalStatements => "Q0222",
            OnlyOneFileCanHaveGlobalStatements => "Q0223",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub location: TextLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, location: TextLocation, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            location,
            message: message.into(),
        }
    }

    pub fn span(&self) -> TextSpan {
        self.location.span
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = &self.location;
        write!(
            f,
            "{}({},{},{},{}): error {}: {}",
            location.file_name(),
            location.start_line() + 1,
            location.start_character() + 1,
            location.end_line() + 1,
            location.end_character() + 1,
            self.code.code(),
            self.message
        )
    }
}

/// Sort diagnostics for display by file name, then span start, then span length.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.location
            .file_name()
            .cmp(b.location.file_name())
            .then(a.span().start.cmp(&b.span().start))
            .then(a.span().length.cmp(&b.span().length))
    });
}

/// Accumulates diagnostics for one source text.
#[derive(Debug)]
pub struct DiagnosticBag {
    text: Arc<SourceText>,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new(text: Arc<SourceText>) -> Self {
        DiagnosticBag {
            text,
            diagnostics: Vec::new(),
        }
    }

    pub fn text(&self) -> &Arc<SourceText> {
        &self.text
    }

    /// Switch the source text used for subsequent reports.
    pub fn set_text(&mut self, text: Arc<SourceText>) {
        self.text = text;
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn report(&mut self, code: DiagnosticCode, span: TextSpan, message: String) {
        let location = TextLocation::new(self.text.clone(), span);
        self.diagnostics.push(Diagnostic::new(code, location, message));
    }

    pub fn report_bad_character(&mut self, position: usize, character: char) {
        let span = TextSpan::new(position, character.len_utf8());
        self.report(
            DiagnosticCode::BadCharacter,
            span,
            format!("Bad character input: '{character}'."),
        );
    }

    pub fn report_unterminated_string(&mut self, span: TextSpan) {
        self.report(
            DiagnosticCode::UnterminatedString,
            span,
            "Unterminated string literal.".to_string(),
        );
    }

    pub fn report_unterminated_comment(&mut self, span: TextSpan) {
        self.report(
            DiagnosticCode::UnterminatedComment,
            span,
            "Unterminated multi-line comment.".to_string(),
        );
    }

    pub fn report_unexpected_token(&mut self, span: TextSpan, actual: TokenKind, expected: TokenKind) {
        self.report(
            DiagnosticCode::UnexpectedToken,
            span,
            format!("Unexpected token <{actual:?}>, expected <{expected:?}>."),
        );
    }

    pub fn report_invalid_number(&mut self, span: TextSpan, text: &str) {
        self.report(
            DiagnosticCode::InvalidLiteralType,
            span,
            format!("The number {text} isn't a valid int."),
        );
    }

    pub fn report_undefined_unary_operator(&mut self, span: TextSpan, operator: &str, operand: &TypeSymbol) {
        self.report(
            DiagnosticCode::UndefinedUnaryOperator,
            span,
            format!("Unary operator '{operator}' is not defined for type '{operand}'."),
        );
    }

    pub fn report_undefined_binary_operator(
        &mut self,
        span: TextSpan,
        operator: &str,
        left: &TypeSymbol,
        right: &TypeSymbol,
    ) {
        self.report(
            DiagnosticCode::UndefinedBinaryOperator,
            span,
            format!("Binary operator '{operator}' is not defined for types '{left}' and '{right}'."),
        );
    }

    pub fn report_undefined_name(&mut self, span: TextSpan, name: &str) {
        self.report(
            DiagnosticCode::UndefinedName,
            span,
            format!("Name '{name}' does not exist."),
        );
    }

    pub fn report_undefined_type(&mut self, span: TextSpan, name: &str) {
        self.report(
            DiagnosticCode::UndefinedType,
            span,
            format!("Type '{name}' does not exist."),
        );
    }

    pub fn report_undefined_enum_member(&mut self, span: TextSpan, enum_name: &str, member: &str) {
        self.report(
            DiagnosticCode::UndefinedEnumMember,
            span,
            format!("Enum '{enum_name}' has no member '{member}'."),
        );
    }

    pub fn report_not_a_variable(&mut self, span: TextSpan, name: &str) {
        self.report(
            DiagnosticCode::NotAVariable,
            span,
            format!("'{name}' is not a variable."),
        );
    }

    pub fn report_not_a_function(&mut self, span: TextSpan, name: &str) {
        self.report(
            DiagnosticCode::NotAFunction,
            span,
            format!("'{name}' is not a function."),
        );
    }

    pub fn report_not_an_enum(&mut self, span: TextSpan, name: &str) {
        self.report(
            DiagnosticCode::NotAnEnum,
            span,
            format!("'{name}' is not an enum."),
        );
    }

    pub fn report_symbol_already_declared(&mut self, span: TextSpan, name: &str) {
        self.report(
            DiagnosticCode::SymbolAlreadyDeclared,
            span,
            format!("'{name}' is already declared."),
        );
    }

    pub fn report_cannot_assign(&mut self, span: TextSpan, name: &str) {
        self.report(
            DiagnosticCode::CannotAssign,
            span,
            format!("Variable '{name}' is read-only and cannot be assigned to."),
        );
    }

    pub fn report_cannot_convert(&mut self, span: TextSpan, from: &TypeSymbol, to: &TypeSymbol) {
        self.report(
            DiagnosticCode::CannotConvert,
            span,
            format!("Cannot convert type '{from}' to '{to}'."),
        );
    }

    pub fn report_cannot_convert_implicitly(&mut self, span: TextSpan, from: &TypeSymbol, to: &TypeSymbol) {
        self.report(
            DiagnosticCode::CannotConvertImplicitly,
            span,
            format!("Cannot convert type '{from}' to '{to}'. An explicit conversion exists (are you missing a cast?)"),
        );
    }

    pub fn report_wrong_argument_count(&mut self, span: TextSpan, name: &str, expected: usize, actual: usize) {
        self.report(
            DiagnosticCode::WrongArgumentCount,
            span,
            format!("Function '{name}' requires {expected} arguments but was given {actual}."),
        );
    }

    pub fn report_expression_must_have_value(&mut self, span: TextSpan) {
        self.report(
            DiagnosticCode::ExpressionMustHaveValue,
            span,
            "Expression must have a value.".to_string(),
        );
    }

    pub fn report_invalid_expression_statement(&mut self, span: TextSpan) {
        self.report(
            DiagnosticCode::InvalidExpressionStatement,
            span,
            "Only assignment and call expressions can be used as a statement.".to_string(),
        );
    }

    pub fn report_invalid_break_or_continue(&mut self, span: TextSpan, keyword: &str) {
        self.report(
            DiagnosticCode::InvalidBreakOrContinue,
            span,
            format!("The keyword '{keyword}' can only be used inside of loops."),
        );
    }

    pub fn report_invalid_return_expression(&mut self, span: TextSpan, function: &str) {
        self.report(
            DiagnosticCode::InvalidReturnExpression,
            span,
            format!("Since the function '{function}' does not return a value the 'return' keyword cannot be followed by an expression."),
        );
    }

    pub fn report_missing_return_expression(&mut self, span: TextSpan, ty: &TypeSymbol) {
        self.report(
            DiagnosticCode::MissingReturnExpression,
            span,
            format!("An expression of type '{ty}' is expected."),
        );
    }

    pub fn report_invalid_return_with_value_in_global_statements(&mut self, span: TextSpan) {
        self.report(
            DiagnosticCode::InvalidReturnWithValueInGlobalStatements,
            span,
            "The 'return' keyword cannot be followed by an expression in global statements.".to_string(),
        );
    }

    pub fn report_all_paths_must_return(&mut self, span: TextSpan) {
        self.report(
            DiagnosticCode::AllPathsMustReturn,
            span,
            "Not all code paths return a value.".to_string(),
        );
    }

    pub fn report_main_must_have_correct_signature(&mut self, span: TextSpan) {
        self.report(
            DiagnosticCode::MainMustHaveCorrectSignature,
            span,
            "main must not take arguments and not return anything.".to_string(),
        );
    }

    pub fn report_cannot_mix_main_and_global_statements(&mut self, span: TextSpan) {
        self.report(
            DiagnosticCode::CannotMixMainAndGlobalStatements,
            span,
            "Cannot declare main function when global statements are used.".to_string(),
        );
    }

    pub fn report_only_one_file_can_have_global_statements(&mut self, span: TextSpan) {
        self.report(
            DiagnosticCode::OnlyOneFileCanHaveGlobalStatements,
            span,
            "At most one file can have global statements.".to_string(),
        );
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_by_file_then_span() {
        let a = Arc::new(SourceText::with_file_name("0123456789", "a.ql"));
        let b = Arc::new(SourceText::with_file_name("0123456789", "b.ql"));

        let mut diagnostics = vec![
            Diagnostic::new(DiagnosticCode::UndefinedName, TextLocation::new(b.clone(), TextSpan::new(0, 1)), "b0"),
            Diagnostic::new(DiagnosticCode::UndefinedName, TextLocation::new(a.clone(), TextSpan::new(5, 2)), "a5-2"),
            Diagnostic::new(DiagnosticCode::UndefinedName, TextLocation::new(a.clone(), TextSpan::new(5, 1)), "a5-1"),
            Diagnostic::new(DiagnosticCode::UndefinedName, TextLocation::new(a, TextSpan::new(1, 4)), "a1"),
        ];
        sort_diagnostics(&mut diagnostics);

        let order: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(order, ["a1", "a5-1", "a5-2", "b0"]);
    }

    #[test]
    fn displays_one_based_position() {
        let text = Arc::new(SourceText::with_file_name("var x = y", "main.ql"));
        let mut bag = DiagnosticBag::new(text);
        bag.report_undefined_name(TextSpan::new(8, 1), "y");
        let rendered = bag.iter().next().map(ToString::to_string).unwrap_or_default();
        assert_eq!(rendered, "main.ql(1,9,1,10): error Q0203: Name 'y' does not exist.");
    }
}
