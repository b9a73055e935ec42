//! Type system for the Quill language.
//!
//! The set of types is closed: a handful of primitives, the `error`
//! sentinel produced by failed binding, and one instance type per
//! declared enum. Type rules that need more than equality (conversions)
//! live here as well so the binder and evaluator agree on them.

use std::fmt;
use std::sync::Arc;

use crate::symbols::EnumSymbol;

/// Types of values and expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSymbol {
    /// Sentinel for expressions that failed to bind. Compatible with
    /// everything when deciding whether to report, never at run time.
    Error,
    Bool,
    Int,
    String,
    Void,
    /// Instance type of a user-declared enum.
    Enum(Arc<EnumSymbol>),
}

impl TypeSymbol {
    pub fn is_error(&self) -> bool {
        matches!(self, TypeSymbol::Error)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeSymbol::Void)
    }

    pub fn name(&self) -> &str {
        match self {
            TypeSymbol::Error => "?",
            TypeSymbol::Bool => "bool",
            TypeSymbol::Int => "int",
            TypeSymbol::String => "string",
            TypeSymbol::Void => "void",
            TypeSymbol::Enum(symbol) => &symbol.name,
        }
    }

    /// Primitive types that may be written in a type clause.
    pub fn lookup_primitive(name: &str) -> Option<TypeSymbol> {
        match name {
            "bool" => Some(TypeSymbol::Bool),
            "int" => Some(TypeSymbol::Int),
            "string" => Some(TypeSymbol::String),
            _ => None,
        }
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of classifying a conversion between two types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// No conversion exists.
    None,
    /// Source and target are the same type.
    Identity,
    /// Allowed only when written out, e.g. `string(42)`.
    Explicit,
}

impl Conversion {
    pub fn exists(self) -> bool {
        !matches!(self, Conversion::None)
    }

    pub fn is_identity(self) -> bool {
        matches!(self, Conversion::Identity)
    }

    pub fn is_implicit(self) -> bool {
        self.is_identity()
    }

    pub fn is_explicit(self) -> bool {
        matches!(self, Conversion::Explicit)
    }
}

/// Classify the conversion from `from` to `to`.
///
/// * T -> T                      : identity
/// * int, bool, enum -> string   : explicit
/// * string -> int, bool         : explicit
pub fn classify_conversion(from: &TypeSymbol, to: &TypeSymbol) -> Conversion {
    use TypeSymbol::*;

    if from == to {
        return Conversion::Identity;
    }

    match (from, to) {
        (Int | Bool | Enum(_), String) => Conversion::Explicit,
        (String, Int | Bool) => Conversion::Explicit,
        _ => Conversion::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_implicit() {
        assert!(classify_conversion(&TypeSymbol::Int, &TypeSymbol::Int).is_implicit());
        assert!(classify_conversion(&TypeSymbol::String, &TypeSymbol::String).is_identity());
    }

    #[test]
    fn string_conversions_are_explicit() {
        assert!(classify_conversion(&TypeSymbol::Int, &TypeSymbol::String).is_explicit());
        assert!(classify_conversion(&TypeSymbol::String, &TypeSymbol::Bool).is_explicit());
        let color = TypeSymbol::Enum(EnumSymbol::new("Color", vec!["Red".into()]));
        assert!(classify_conversion(&color, &TypeSymbol::String).is_explicit());
        assert!(!classify_conversion(&TypeSymbol::String, &color).exists());
    }

    #[test]
    fn unrelated_types_do_not_convert() {
        assert!(!classify_conversion(&TypeSymbol::Int, &TypeSymbol::Bool).exists());
        assert!(!classify_conversion(&TypeSymbol::Void, &TypeSymbol::Int).exists());
    }

    #[test]
    fn distinct_enums_are_distinct_types() {
        let a = TypeSymbol::Enum(EnumSymbol::new("Color", vec![]));
        let b = TypeSymbol::Enum(EnumSymbol::new("Color", vec![]));
        assert_ne!(a, b);
    }
}
