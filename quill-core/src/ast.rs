//! Syntax tree for Quill.
//!
//! The tree is built bottom-up by the parser and never mutated afterwards.
//! Every node exclusively owns its children, including the tokens it was
//! built from, so the full source text (trivia included) can be recovered
//! by walking the tree in order.
//!
//! [`SyntaxNode`] gives a uniform, borrowed view over all node types for
//! consumers that walk the tree without caring about its shape.

use std::fmt::{self, Write};

use crate::lexer::SyntaxToken;
use crate::span::TextSpan;

/// A list of nodes separated by tokens, e.g. call arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatedList<T> {
    pub items: Vec<T>,
    pub separators: Vec<SyntaxToken>,
}

impl<T> SeparatedList<T> {
    pub fn new() -> Self {
        SeparatedList {
            items: Vec::new(),
            separators: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Items and separators interleaved in source order.
    fn interleave<'a>(&'a self, to_node: impl Fn(&'a T) -> SyntaxNode<'a>) -> Vec<SyntaxNode<'a>> {
        let mut nodes = Vec::with_capacity(self.items.len() + self.separators.len());
        for (index, item) in self.items.iter().enumerate() {
            nodes.push(to_node(item));
            if let Some(separator) = self.separators.get(index) {
                nodes.push(SyntaxNode::Token(separator));
            }
        }
        nodes
    }
}

impl<T> Default for SeparatedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnitSyntax {
    pub members: Vec<MemberSyntax>,
    pub end_of_file: SyntaxToken,
}

impl CompilationUnitSyntax {
    pub fn function_at(&self, index: usize) -> Option<&FunctionDeclarationSyntax> {
        match self.members.get(index) {
            Some(MemberSyntax::Function(function)) => Some(function),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberSyntax {
    Function(FunctionDeclarationSyntax),
    Enum(EnumDeclarationSyntax),
    GlobalStatement(StatementSyntax),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDeclarationSyntax {
    pub function_keyword: SyntaxToken,
    pub identifier: SyntaxToken,
    pub open_paren: SyntaxToken,
    pub parameters: SeparatedList<ParameterSyntax>,
    pub close_paren: SyntaxToken,
    pub type_clause: Option<TypeClauseSyntax>,
    pub body: BlockStatementSyntax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSyntax {
    pub identifier: SyntaxToken,
    pub type_clause: TypeClauseSyntax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeClauseSyntax {
    pub colon: SyntaxToken,
    pub identifier: SyntaxToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDeclarationSyntax {
    pub enum_keyword: SyntaxToken,
    pub identifier: SyntaxToken,
    pub open_brace: SyntaxToken,
    pub members: SeparatedList<SyntaxToken>,
    pub close_brace: SyntaxToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementSyntax {
    Block(BlockStatementSyntax),
    VariableDeclaration(VariableDeclarationSyntax),
    If(IfStatementSyntax),
    While(WhileStatementSyntax),
    DoWhile(DoWhileStatementSyntax),
    For(ForStatementSyntax),
    Break(SyntaxToken),
    Continue(SyntaxToken),
    Return(ReturnStatementSyntax),
    Expression(ExpressionSyntax),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStatementSyntax {
    pub open_brace: SyntaxToken,
    pub statements: Vec<StatementSyntax>,
    pub close_brace: SyntaxToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDeclarationSyntax {
    /// `var` or `let`.
    pub keyword: SyntaxToken,
    pub identifier: SyntaxToken,
    pub type_clause: Option<TypeClauseSyntax>,
    pub equals: SyntaxToken,
    pub initializer: ExpressionSyntax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfStatementSyntax {
    pub if_keyword: SyntaxToken,
    pub condition: ExpressionSyntax,
    pub then_statement: Box<StatementSyntax>,
    pub else_clause: Option<ElseClauseSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElseClauseSyntax {
    pub else_keyword: SyntaxToken,
    pub else_statement: Box<StatementSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhileStatementSyntax {
    pub while_keyword: SyntaxToken,
    pub condition: ExpressionSyntax,
    pub body: Box<StatementSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoWhileStatementSyntax {
    pub do_keyword: SyntaxToken,
    pub body: Box<StatementSyntax>,
    pub while_keyword: SyntaxToken,
    pub condition: ExpressionSyntax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForStatementSyntax {
    pub for_keyword: SyntaxToken,
    pub identifier: SyntaxToken,
    pub equals: SyntaxToken,
    pub lower_bound: ExpressionSyntax,
    pub to_keyword: SyntaxToken,
    pub upper_bound: ExpressionSyntax,
    pub step_clause: Option<StepClauseSyntax>,
    pub body: Box<StatementSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepClauseSyntax {
    pub step_keyword: SyntaxToken,
    pub expression: ExpressionSyntax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnStatementSyntax {
    pub return_keyword: SyntaxToken,
    pub expression: Option<ExpressionSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionSyntax {
    /// Number, string, `true` or `false`.
    Literal(SyntaxToken),
    Name(SyntaxToken),
    Assignment(AssignmentExpressionSyntax),
    Unary(UnaryExpressionSyntax),
    Binary(BinaryExpressionSyntax),
    Parenthesized(ParenthesizedExpressionSyntax),
    Call(CallExpressionSyntax),
    MemberAccess(MemberAccessExpressionSyntax),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentExpressionSyntax {
    pub identifier: SyntaxToken,
    pub equals: SyntaxToken,
    pub expression: Box<ExpressionSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryExpressionSyntax {
    pub operator: SyntaxToken,
    pub operand: Box<ExpressionSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryExpressionSyntax {
    pub left: Box<ExpressionSyntax>,
    pub operator: SyntaxToken,
    pub right: Box<ExpressionSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParenthesizedExpressionSyntax {
    pub open_paren: SyntaxToken,
    pub expression: Box<ExpressionSyntax>,
    pub close_paren: SyntaxToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpressionSyntax {
    pub identifier: SyntaxToken,
    pub open_paren: SyntaxToken,
    pub arguments: SeparatedList<ExpressionSyntax>,
    pub close_paren: SyntaxToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccessExpressionSyntax {
    pub target: SyntaxToken,
    pub dot: SyntaxToken,
    pub member: SyntaxToken,
}

impl ExpressionSyntax {
    pub fn span(&self) -> TextSpan {
        SyntaxNode::Expression(self).span()
    }
}

impl StatementSyntax {
    pub fn span(&self) -> TextSpan {
        SyntaxNode::Statement(self).span()
    }

    /// The first token of the statement, used to anchor diagnostics.
    pub fn first_token(&self) -> Option<&SyntaxToken> {
        SyntaxNode::Statement(self).first_token()
    }
}

/// Borrowed view of any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum SyntaxNode<'a> {
    Token(&'a SyntaxToken),
    CompilationUnit(&'a CompilationUnitSyntax),
    Member(&'a MemberSyntax),
    Function(&'a FunctionDeclarationSyntax),
    Parameter(&'a ParameterSyntax),
    TypeClause(&'a TypeClauseSyntax),
    Enum(&'a EnumDeclarationSyntax),
    Statement(&'a StatementSyntax),
    Block(&'a BlockStatementSyntax),
    ElseClause(&'a ElseClauseSyntax),
    StepClause(&'a StepClauseSyntax),
    Expression(&'a ExpressionSyntax),
}

impl<'a> SyntaxNode<'a> {
    /// Direct children in source order, tokens included.
    pub fn children(&self) -> Vec<SyntaxNode<'a>> {
        use SyntaxNode as N;

        match *self {
            N::Token(_) => Vec::new(),
            N::CompilationUnit(unit) => {
                let mut children: Vec<_> = unit.members.iter().map(N::Member).collect();
                children.push(N::Token(&unit.end_of_file));
                children
            }
            N::Member(member) => match member {
                MemberSyntax::Function(function) => vec![N::Function(function)],
                MemberSyntax::Enum(declaration) => vec![N::Enum(declaration)],
                MemberSyntax::GlobalStatement(statement) => vec![N::Statement(statement)],
            },
            N::Function(function) => {
                let mut children = vec![
                    N::Token(&function.function_keyword),
                    N::Token(&function.identifier),
                    N::Token(&function.open_paren),
                ];
                children.extend(function.parameters.interleave(N::Parameter));
                children.push(N::Token(&function.close_paren));
                if let Some(clause) = &function.type_clause {
                    children.push(N::TypeClause(clause));
                }
                children.push(N::Block(&function.body));
                children
            }
            N::Parameter(parameter) => vec![N::Token(&parameter.identifier), N::TypeClause(&parameter.type_clause)],
            N::TypeClause(clause) => vec![N::Token(&clause.colon), N::Token(&clause.identifier)],
            N::Enum(declaration) => {
                let mut children = vec![
                    N::Token(&declaration.enum_keyword),
                    N::Token(&declaration.identifier),
                    N::Token(&declaration.open_brace),
                ];
                children.extend(declaration.members.interleave(N::Token));
                children.push(N::Token(&declaration.close_brace));
                children
            }
            N::Block(block) => {
                let mut children = vec![N::Token(&block.open_brace)];
                children.extend(block.statements.iter().map(N::Statement));
                children.push(N::Token(&block.close_brace));
                children
            }
            N::ElseClause(clause) => vec![N::Token(&clause.else_keyword), N::Statement(&clause.else_statement)],
            N::StepClause(clause) => vec![N::Token(&clause.step_keyword), N::Expression(&clause.expression)],
            N::Statement(statement) => statement_children(statement),
            N::Expression(expression) => expression_children(expression),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        use SyntaxNode as N;

        match self {
            N::Token(_) => "Token",
            N::CompilationUnit(_) => "CompilationUnit",
            N::Member(MemberSyntax::GlobalStatement(_)) => "GlobalStatement",
            N::Member(MemberSyntax::Function(_)) | N::Function(_) => "FunctionDeclaration",
            N::Member(MemberSyntax::Enum(_)) | N::Enum(_) => "EnumDeclaration",
            N::Parameter(_) => "Parameter",
            N::TypeClause(_) => "TypeClause",
            N::Block(_) => "BlockStatement",
            N::ElseClause(_) => "ElseClause",
            N::StepClause(_) => "StepClause",
            N::Statement(statement) => match statement {
                StatementSyntax::Block(_) => "BlockStatement",
                StatementSyntax::VariableDeclaration(_) => "VariableDeclaration",
                StatementSyntax::If(_) => "IfStatement",
                StatementSyntax::While(_) => "WhileStatement",
                StatementSyntax::DoWhile(_) => "DoWhileStatement",
                StatementSyntax::For(_) => "ForStatement",
                StatementSyntax::Break(_) => "BreakStatement",
                StatementSyntax::Continue(_) => "ContinueStatement",
                StatementSyntax::Return(_) => "ReturnStatement",
                StatementSyntax::Expression(_) => "ExpressionStatement",
            },
            N::Expression(expression) => match expression {
                ExpressionSyntax::Literal(_) => "LiteralExpression",
                ExpressionSyntax::Name(_) => "NameExpression",
                ExpressionSyntax::Assignment(_) => "AssignmentExpression",
                ExpressionSyntax::Unary(_) => "UnaryExpression",
                ExpressionSyntax::Binary(_) => "BinaryExpression",
                ExpressionSyntax::Parenthesized(_) => "ParenthesizedExpression",
                ExpressionSyntax::Call(_) => "CallExpression",
                ExpressionSyntax::MemberAccess(_) => "MemberAccessExpression",
            },
        }
    }

    pub fn first_token(&self) -> Option<&'a SyntaxToken> {
        match self {
            SyntaxNode::Token(token) => Some(token),
            _ => self.children().first().and_then(|child| child.first_token()),
        }
    }

    pub fn last_token(&self) -> Option<&'a SyntaxToken> {
        match self {
            SyntaxNode::Token(token) => Some(token),
            _ => self.children().last().and_then(|child| child.last_token()),
        }
    }

    /// Span of the node's tokens, excluding leading and trailing trivia.
    pub fn span(&self) -> TextSpan {
        match (self.first_token(), self.last_token()) {
            (Some(first), Some(last)) => TextSpan::from_bounds(first.span().start, last.span().end()),
            _ => TextSpan::default(),
        }
    }

    pub fn full_span(&self) -> TextSpan {
        match (self.first_token(), self.last_token()) {
            (Some(first), Some(last)) => TextSpan::from_bounds(first.full_span().start, last.full_span().end()),
            _ => TextSpan::default(),
        }
    }

    /// All tokens below this node, in source order.
    pub fn tokens(&self) -> Vec<&'a SyntaxToken> {
        let mut tokens = Vec::new();
        let mut pending = vec![*self];
        while let Some(node) = pending.pop() {
            match node {
                SyntaxNode::Token(token) => tokens.push(token),
                _ => pending.extend(node.children().into_iter().rev()),
            }
        }
        tokens
    }

    /// Indented outline of the subtree, one node per line.
    pub fn write_tree(&self, out: &mut impl Write) -> fmt::Result {
        self.write_tree_at(out, "", true, true)
    }

    fn write_tree_at(&self, out: &mut impl Write, indent: &str, is_last: bool, is_root: bool) -> fmt::Result {
        let marker = match (is_root, is_last) {
            (true, _) => "",
            (false, true) => "└── ",
            (false, false) => "├── ",
        };
        write!(out, "{indent}{marker}")?;
        match self {
            SyntaxNode::Token(token) => {
                write!(out, "{:?}", token.kind)?;
                if token.is_missing {
                    write!(out, " (missing)")?;
                } else if token.kind.fixed_text().is_none() && !token.text.is_empty() {
                    write!(out, " {}", token.text)?;
                }
                writeln!(out)?;
            }
            _ => writeln!(out, "{}", self.kind_name())?,
        }

        let child_indent = match (is_root, is_last) {
            (true, _) => indent.to_string(),
            (false, true) => format!("{indent}    "),
            (false, false) => format!("{indent}│   "),
        };
        let children = self.children();
        let count = children.len();
        for (index, child) in children.into_iter().enumerate() {
            child.write_tree_at(out, &child_indent, index + 1 == count, false)?;
        }
        Ok(())
    }
}

fn statement_children(statement: &StatementSyntax) -> Vec<SyntaxNode<'_>> {
    use SyntaxNode as N;

    match statement {
        StatementSyntax::Block(block) => N::Block(block).children(),
        StatementSyntax::VariableDeclaration(declaration) => {
            let mut children = vec![N::Token(&declaration.keyword), N::Token(&declaration.identifier)];
            if let Some(clause) = &declaration.type_clause {
                children.push(N::TypeClause(clause));
            }
            children.push(N::Token(&declaration.equals));
            children.push(N::Expression(&declaration.initializer));
            children
        }
        StatementSyntax::If(statement) => {
            let mut children = vec![
                N::Token(&statement.if_keyword),
                N::Expression(&statement.condition),
                N::Statement(&statement.then_statement),
            ];
            if let Some(clause) = &statement.else_clause {
                children.push(N::ElseClause(clause));
            }
            children
        }
        StatementSyntax::While(statement) => vec![
            N::Token(&statement.while_keyword),
            N::Expression(&statement.condition),
            N::Statement(&statement.body),
        ],
        StatementSyntax::DoWhile(statement) => vec![
            N::Token(&statement.do_keyword),
            N::Statement(&statement.body),
            N::Token(&statement.while_keyword),
            N::Expression(&statement.condition),
        ],
        StatementSyntax::For(statement) => {
            let mut children = vec![
                N::Token(&statement.for_keyword),
                N::Token(&statement.identifier),
                N::Token(&statement.equals),
                N::Expression(&statement.lower_bound),
                N::Token(&statement.to_keyword),
                N::Expression(&statement.upper_bound),
            ];
            if let Some(clause) = &statement.step_clause {
                children.push(N::StepClause(clause));
            }
            children.push(N::Statement(&statement.body));
            children
        }
        StatementSyntax::Break(keyword) | StatementSyntax::Continue(keyword) => vec![N::Token(keyword)],
        StatementSyntax::Return(statement) => {
            let mut children = vec![N::Token(&statement.return_keyword)];
            if let Some(expression) = &statement.expression {
                children.push(N::Expression(expression));
            }
            children
        }
        StatementSyntax::Expression(expression) => vec![N::Expression(expression)],
    }
}

fn expression_children(expression: &ExpressionSyntax) -> Vec<SyntaxNode<'_>> {
    use SyntaxNode as N;

    match expression {
        ExpressionSyntax::Literal(token) | ExpressionSyntax::Name(token) => vec![N::Token(token)],
        ExpressionSyntax::Assignment(assignment) => vec![
            N::Token(&assignment.identifier),
            N::Token(&assignment.equals),
            N::Expression(&assignment.expression),
        ],
        ExpressionSyntax::Unary(unary) => vec![N::Token(&unary.operator), N::Expression(&unary.operand)],
        ExpressionSyntax::Binary(binary) => vec![
            N::Expression(&binary.left),
            N::Token(&binary.operator),
            N::Expression(&binary.right),
        ],
        ExpressionSyntax::Parenthesized(parenthesized) => vec![
            N::Token(&parenthesized.open_paren),
            N::Expression(&parenthesized.expression),
            N::Token(&parenthesized.close_paren),
        ],
        ExpressionSyntax::Call(call) => {
            let mut children = vec![N::Token(&call.identifier), N::Token(&call.open_paren)];
            children.extend(call.arguments.interleave(N::Expression));
            children.push(N::Token(&call.close_paren));
            children
        }
        ExpressionSyntax::MemberAccess(access) => vec![
            N::Token(&access.target),
            N::Token(&access.dot),
            N::Token(&access.member),
        ],
    }
}

/// True when the node ends in a token the parser had to fabricate.
pub fn ends_with_missing_token(node: SyntaxNode<'_>) -> bool {
    node.last_token().is_some_and(|token| token.is_missing)
}
