//! Operator resolution tables.
//!
//! Operators are resolved once, by the binder, from the operator token and
//! the operand types. The bound tree only ever carries the resolved
//! descriptor.

use crate::lexer::TokenKind;
use crate::types::TypeSymbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundUnaryOperatorKind {
    Identity,
    Negation,
    LogicalNegation,
    OnesComplement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundBinaryOperatorKind {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LogicalAnd,
    LogicalOr,
    Equals,
    NotEquals,
    Less,
    LessOrEquals,
    Greater,
    GreaterOrEquals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundUnaryOperator {
    pub token: TokenKind,
    pub kind: BoundUnaryOperatorKind,
    pub operand_type: TypeSymbol,
    pub result_type: TypeSymbol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundBinaryOperator {
    pub token: TokenKind,
    pub kind: BoundBinaryOperatorKind,
    pub left_type: TypeSymbol,
    pub right_type: TypeSymbol,
    pub result_type: TypeSymbol,
}

impl BoundUnaryOperator {
    pub fn symbol(&self) -> &'static str {
        self.token.fixed_text().unwrap_or("?")
    }
}

impl BoundBinaryOperator {
    pub fn symbol(&self) -> &'static str {
        self.token.fixed_text().unwrap_or("?")
    }
}

use BoundBinaryOperatorKind as B;
use BoundUnaryOperatorKind as U;
use TokenKind as T;
use TypeSymbol as Ty;

struct UnaryRow(TokenKind, BoundUnaryOperatorKind, TypeSymbol);

struct BinaryRow(TokenKind, BoundBinaryOperatorKind, TypeSymbol, TypeSymbol, TypeSymbol);

#[rustfmt::skip]
const UNARY_OPERATORS: &[UnaryRow] = &[
    UnaryRow(T::Bang,  U::LogicalNegation, Ty::Bool),
    UnaryRow(T::Plus,  U::Identity,        Ty::Int),
    UnaryRow(T::Minus, U::Negation,        Ty::Int),
    UnaryRow(T::Tilde, U::OnesComplement,  Ty::Int),
];

#[rustfmt::skip]
const BINARY_OPERATORS: &[BinaryRow] = &[
    BinaryRow(T::Plus,              B::Addition,        Ty::Int,    Ty::Int,    Ty::Int),
    BinaryRow(T::Minus,             B::Subtraction,     Ty::Int,    Ty::Int,    Ty::Int),
    BinaryRow(T::Star,              B::Multiplication,  Ty::Int,    Ty::Int,    Ty::Int),
    BinaryRow(T::Slash,             B::Division,        Ty::Int,    Ty::Int,    Ty::Int),
    BinaryRow(T::Percent,           B::Modulo,          Ty::Int,    Ty::Int,    Ty::Int),
    BinaryRow(T::Ampersand,         B::BitwiseAnd,      Ty::Int,    Ty::Int,    Ty::Int),
    BinaryRow(T::Pipe,              B::BitwiseOr,       Ty::Int,    Ty::Int,    Ty::Int),
    BinaryRow(T::Hat,               B::BitwiseXor,      Ty::Int,    Ty::Int,    Ty::Int),
    BinaryRow(T::EqualsEquals,      B::Equals,          Ty::Int,    Ty::Int,    Ty::Bool),
    BinaryRow(T::BangEquals,        B::NotEquals,       Ty::Int,    Ty::Int,    Ty::Bool),
    BinaryRow(T::Less,              B::Less,            Ty::Int,    Ty::Int,    Ty::Bool),
    BinaryRow(T::LessEquals,        B::LessOrEquals,    Ty::Int,    Ty::Int,    Ty::Bool),
    BinaryRow(T::Greater,           B::Greater,         Ty::Int,    Ty::Int,    Ty::Bool),
    BinaryRow(T::GreaterEquals,     B::GreaterOrEquals, Ty::Int,    Ty::Int,    Ty::Bool),

    BinaryRow(T::AmpersandAmpersand, B::LogicalAnd,     Ty::Bool,   Ty::Bool,   Ty::Bool),
    BinaryRow(T::PipePipe,          B::LogicalOr,       Ty::Bool,   Ty::Bool,   Ty::Bool),
    BinaryRow(T::Ampersand,         B::BitwiseAnd,      Ty::Bool,   Ty::Bool,   Ty::Bool),
    BinaryRow(T::Pipe,              B::BitwiseOr,       Ty::Bool,   Ty::Bool,   Ty::Bool),
    BinaryRow(T::Hat,               B::BitwiseXor,      Ty::Bool,   Ty::Bool,   Ty::Bool),
    BinaryRow(T::EqualsEquals,      B::Equals,          Ty::Bool,   Ty::Bool,   Ty::Bool),
    BinaryRow(T::BangEquals,        B::NotEquals,       Ty::Bool,   Ty::Bool,   Ty::Bool),

    BinaryRow(T::Plus,              B::Addition,        Ty::String, Ty::String, Ty::String),
    BinaryRow(T::EqualsEquals,      B::Equals,          Ty::String, Ty::String, Ty::Bool),
    BinaryRow(T::BangEquals,        B::NotEquals,       Ty::String, Ty::String, Ty::Bool),
];

pub fn bind_unary_operator(token: TokenKind, operand: &TypeSymbol) -> Option<BoundUnaryOperator> {
    UNARY_OPERATORS
        .iter()
        .find(|UnaryRow(t, _, ty)| *t == token && ty == operand)
        .map(|UnaryRow(t, kind, ty)| BoundUnaryOperator {
            token: *t,
            kind: *kind,
            operand_type: ty.clone(),
            result_type: ty.clone(),
        })
}

pub fn bind_binary_operator(token: TokenKind, left: &TypeSymbol, right: &TypeSymbol) -> Option<BoundBinaryOperator> {
    let row = BINARY_OPERATORS
        .iter()
        .find(|BinaryRow(t, _, l, r, _)| *t == token && l == left && r == right);
    if let Some(BinaryRow(t, kind, l, r, result)) = row {
        return Some(BoundBinaryOperator {
            token: *t,
            kind: *kind,
            left_type: l.clone(),
            right_type: r.clone(),
            result_type: result.clone(),
        });
    }

    // Values of the same enum compare by member.
    let kind = match token {
        TokenKind::EqualsEquals => BoundBinaryOperatorKind::Equals,
        TokenKind::BangEquals => BoundBinaryOperatorKind::NotEquals,
        _ => return None,
    };
    match (left, right) {
        (TypeSymbol::Enum(a), TypeSymbol::Enum(b)) if a == b => Some(BoundBinaryOperator {
            token,
            kind,
            left_type: left.clone(),
            right_type: right.clone(),
            result_type: TypeSymbol::Bool,
        }),
        _ => None,
    }
}
