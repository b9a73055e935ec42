//! Bound tree: the type-checked, symbol-resolved form of the syntax tree.
//!
//! `BoundExpression` always carries its resolved type. Statements mirror
//! the syntax shape until lowering, after which only blocks, declarations,
//! labels, gotos, returns and expression statements remain.

use std::fmt;
use std::sync::Arc;

use crate::operators::{BoundBinaryOperator, BoundUnaryOperator};
use crate::symbols::{FunctionSymbol, VariableSymbol};
use crate::types::TypeSymbol;
use crate::value::Value;

/// Jump target. Names are unique within one function body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundLabel(String);

impl BoundLabel {
    pub fn new(name: impl Into<String>) -> Self {
        BoundLabel(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoundLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpression {
    pub kind: BoundExpressionKind,
    pub ty: TypeSymbol,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpressionKind {
    /// Placeholder for an expression that failed to bind.
    Error,
    Literal(Value),
    Variable(Arc<VariableSymbol>),
    Assignment {
        variable: Arc<VariableSymbol>,
        expression: Box<BoundExpression>,
    },
    Unary {
        op: BoundUnaryOperator,
        operand: Box<BoundExpression>,
    },
    Binary {
        left: Box<BoundExpression>,
        op: BoundBinaryOperator,
        right: Box<BoundExpression>,
    },
    Call {
        function: Arc<FunctionSymbol>,
        arguments: Vec<BoundExpression>,
    },
    /// Explicit or identity conversion to `ty`.
    Conversion(Box<BoundExpression>),
}

impl BoundExpression {
    pub fn error() -> Self {
        BoundExpression {
            kind: BoundExpressionKind::Error,
            ty: TypeSymbol::Error,
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        let value = value.into();
        BoundExpression {
            ty: value.ty(),
            kind: BoundExpressionKind::Literal(value),
        }
    }

    pub fn variable(variable: Arc<VariableSymbol>) -> Self {
        BoundExpression {
            ty: variable.ty.clone(),
            kind: BoundExpressionKind::Variable(variable),
        }
    }

    pub fn assignment(variable: Arc<VariableSymbol>, expression: BoundExpression) -> Self {
        BoundExpression {
            ty: expression.ty.clone(),
            kind: BoundExpressionKind::Assignment {
                variable,
                expression: Box::new(expression),
            },
        }
    }

    pub fn unary(op: BoundUnaryOperator, operand: BoundExpression) -> Self {
        BoundExpression {
            ty: op.result_type.clone(),
            kind: BoundExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
        }
    }

    pub fn binary(left: BoundExpression, op: BoundBinaryOperator, right: BoundExpression) -> Self {
        BoundExpression {
            ty: op.result_type.clone(),
            kind: BoundExpressionKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        }
    }

    pub fn call(function: Arc<FunctionSymbol>, arguments: Vec<BoundExpression>) -> Self {
        BoundExpression {
            ty: function.return_type.clone(),
            kind: BoundExpressionKind::Call { function, arguments },
        }
    }

    pub fn conversion(ty: TypeSymbol, expression: BoundExpression) -> Self {
        BoundExpression {
            ty,
            kind: BoundExpressionKind::Conversion(Box::new(expression)),
        }
    }

    pub fn is_error(&self) -> bool {
        self.ty.is_error()
    }

    /// The literal value, if this expression is one.
    pub fn constant(&self) -> Option<&Value> {
        match &self.kind {
            BoundExpressionKind::Literal(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundBlockStatement {
    pub statements: Vec<BoundStatement>,
}

impl BoundBlockStatement {
    pub fn new(statements: Vec<BoundStatement>) -> Self {
        BoundBlockStatement { statements }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundVariableDeclaration {
    pub variable: Arc<VariableSymbol>,
    pub initializer: BoundExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundIfStatement {
    pub condition: BoundExpression,
    pub then_statement: Box<BoundStatement>,
    pub else_statement: Option<Box<BoundStatement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundWhileStatement {
    pub condition: BoundExpression,
    pub body: Box<BoundStatement>,
    pub break_label: BoundLabel,
    pub continue_label: BoundLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundDoWhileStatement {
    pub body: Box<BoundStatement>,
    pub condition: BoundExpression,
    pub break_label: BoundLabel,
    pub continue_label: BoundLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundForStatement {
    pub variable: Arc<VariableSymbol>,
    pub lower_bound: BoundExpression,
    pub upper_bound: BoundExpression,
    /// Literal `1` when the source has no `step` clause.
    pub step: BoundExpression,
    pub body: Box<BoundStatement>,
    pub break_label: BoundLabel,
    pub continue_label: BoundLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundConditionalGoto {
    pub label: BoundLabel,
    pub condition: BoundExpression,
    pub jump_if_true: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundStatement {
    Block(BoundBlockStatement),
    VariableDeclaration(BoundVariableDeclaration),
    If(BoundIfStatement),
    While(BoundWhileStatement),
    DoWhile(BoundDoWhileStatement),
    For(BoundForStatement),
    Label(BoundLabel),
    Goto(BoundLabel),
    ConditionalGoto(BoundConditionalGoto),
    Return(Option<BoundExpression>),
    Expression(BoundExpression),
}

impl BoundStatement {
    pub fn block(statements: Vec<BoundStatement>) -> Self {
        BoundStatement::Block(BoundBlockStatement::new(statements))
    }

    pub fn declare(variable: Arc<VariableSymbol>, initializer: BoundExpression) -> Self {
        BoundStatement::VariableDeclaration(BoundVariableDeclaration { variable, initializer })
    }

    pub fn goto_if(label: BoundLabel, condition: BoundExpression, jump_if_true: bool) -> Self {
        BoundStatement::ConditionalGoto(BoundConditionalGoto {
            label,
            condition,
            jump_if_true,
        })
    }

    /// Structured control flow that lowering must remove.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            BoundStatement::If(_) | BoundStatement::While(_) | BoundStatement::DoWhile(_) | BoundStatement::For(_)
        )
    }
}
