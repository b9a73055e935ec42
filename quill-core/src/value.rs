//! Runtime values, shared by literal tokens, the bound tree and the evaluator.

use std::fmt;
use std::sync::Arc;

use crate::symbols::EnumSymbol;
use crate::types::TypeSymbol;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i32),
    Bool(bool),
    String(String),
    Enum { symbol: Arc<EnumSymbol>, index: usize },
    /// Result of calling a void function.
    Void,
}

impl Value {
    pub fn ty(&self) -> TypeSymbol {
        match self {
            Value::Int(_) => TypeSymbol::Int,
            Value::Bool(_) => TypeSymbol::Bool,
            Value::String(_) => TypeSymbol::String,
            Value::Enum { symbol, .. } => TypeSymbol::Enum(symbol.clone()),
            Value::Void => TypeSymbol::Void,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::String(value) => f.write_str(value),
            Value::Enum { symbol, index } => match symbol.members.get(*index) {
                Some(member) => f.write_str(member),
                None => write!(f, "{}#{index}", symbol.name),
            },
            Value::Void => Ok(()),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}
