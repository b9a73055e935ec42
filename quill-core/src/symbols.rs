//! Symbols produced by binding: variables, functions, enums and types.
//!
//! Every symbol carries a process-unique [`SymbolId`]. Equality and hashing
//! go through that id, so two declarations with the same name in different
//! scopes (or different submissions) are distinct symbols.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::ast::FunctionDeclarationSyntax;
use crate::builtins::BuiltinKind;
use crate::syntax_tree::SyntaxTree;
use crate::types::TypeSymbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        SymbolId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
    Global,
    Local,
    Parameter,
}

#[derive(Debug)]
pub struct VariableSymbol {
    pub id: SymbolId,
    pub name: String,
    pub ty: TypeSymbol,
    pub is_read_only: bool,
    pub scope: VariableScope,
}

impl VariableSymbol {
    pub fn new(name: impl Into<String>, ty: TypeSymbol, is_read_only: bool, scope: VariableScope) -> Arc<Self> {
        Arc::new(VariableSymbol {
            id: SymbolId::fresh(),
            name: name.into(),
            ty,
            is_read_only,
            scope,
        })
    }

    pub fn local(name: impl Into<String>, ty: TypeSymbol, is_read_only: bool) -> Arc<Self> {
        Self::new(name, ty, is_read_only, VariableScope::Local)
    }

    pub fn parameter(name: impl Into<String>, ty: TypeSymbol) -> Arc<Self> {
        Self::new(name, ty, true, VariableScope::Parameter)
    }
}

/// Where a function's body comes from.
#[derive(Debug, Clone)]
pub enum FunctionOrigin {
    /// Host-provided; has no syntax.
    Builtin(BuiltinKind),
    /// Declared with `function` in a syntax tree.
    Declared(FunctionDeclaration),
    /// `main` or `$eval` synthesized from global statements.
    Synthesized,
}

/// Handle to a function declaration: the owning tree plus the member index.
#[derive(Clone)]
pub struct FunctionDeclaration {
    pub tree: Arc<SyntaxTree>,
    pub member_index: usize,
}

impl fmt::Debug for FunctionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDeclaration")
            .field("file", &self.tree.text().file_name())
            .field("member_index", &self.member_index)
            .finish()
    }
}

impl FunctionDeclaration {
    pub fn syntax(&self) -> Option<&FunctionDeclarationSyntax> {
        self.tree.root().function_at(self.member_index)
    }
}

#[derive(Debug)]
pub struct FunctionSymbol {
    pub id: SymbolId,
    pub name: String,
    pub parameters: Vec<Arc<VariableSymbol>>,
    pub return_type: TypeSymbol,
    pub origin: FunctionOrigin,
}

impl FunctionSymbol {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<Arc<VariableSymbol>>,
        return_type: TypeSymbol,
        origin: FunctionOrigin,
    ) -> Arc<Self> {
        Arc::new(FunctionSymbol {
            id: SymbolId::fresh(),
            name: name.into(),
            parameters,
            return_type,
            origin,
        })
    }

    pub fn declaration(&self) -> Option<&FunctionDeclaration> {
        match &self.origin {
            FunctionOrigin::Declared(declaration) => Some(declaration),
            _ => None,
        }
    }

    pub fn builtin(&self) -> Option<BuiltinKind> {
        match self.origin {
            FunctionOrigin::Builtin(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for FunctionSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}(", self.name)?;
        for (index, parameter) in self.parameters.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", parameter.name, parameter.ty)?;
        }
        f.write_str(")")?;
        if !self.return_type.is_void() {
            write!(f, ": {}", self.return_type)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct EnumSymbol {
    pub id: SymbolId,
    pub name: String,
    pub members: Vec<String>,
}

impl EnumSymbol {
    pub fn new(name: impl Into<String>, members: Vec<String>) -> Arc<Self> {
        Arc::new(EnumSymbol {
            id: SymbolId::fresh(),
            name: name.into(),
            members,
        })
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|member| member == name)
    }
}

macro_rules! identity_by_id {
    ($($symbol:ty),*) => {$(
        impl PartialEq for $symbol {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $symbol {}

        impl Hash for $symbol {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }
    )*};
}

identity_by_id!(VariableSymbol, FunctionSymbol, EnumSymbol);

/// Any symbol that can live in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Variable(Arc<VariableSymbol>),
    Function(Arc<FunctionSymbol>),
    Enum(Arc<EnumSymbol>),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable(variable) => &variable.name,
            Symbol::Function(function) => &function.name,
            Symbol::Enum(symbol) => &symbol.name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Variable(variable) if variable.scope == VariableScope::Parameter => "parameter",
            Symbol::Variable(_) => "variable",
            Symbol::Function(_) => "function",
            Symbol::Enum(_) => "enum",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Variable(variable) => {
                let keyword = if variable.is_read_only { "let" } else { "var" };
                write!(f, "{keyword} {}: {}", variable.name, variable.ty)
            }
            Symbol::Function(function) => write!(f, "{function}"),
            Symbol::Enum(symbol) => write!(f, "enum {} {{ {} }}", symbol.name, symbol.members.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_symbols_are_distinct() {
        let first = VariableSymbol::local("x", TypeSymbol::Int, false);
        let second = VariableSymbol::local("x", TypeSymbol::Int, false);
        assert_ne!(first, second);
        assert_eq!(first, first.clone());
    }

    #[test]
    fn displays_function_signature() {
        let function = FunctionSymbol::new(
            "add",
            vec![
                VariableSymbol::parameter("a", TypeSymbol::Int),
                VariableSymbol::parameter("b", TypeSymbol::Int),
            ],
            TypeSymbol::Int,
            FunctionOrigin::Synthesized,
        );
        assert_eq!(function.to_string(), "function add(a: int, b: int): int");

        let procedure = FunctionSymbol::new("main", Vec::new(), TypeSymbol::Void, FunctionOrigin::Synthesized);
        assert_eq!(procedure.to_string(), "function main()");
    }
}
