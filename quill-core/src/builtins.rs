//! Built-in functions visible at the Quill language level.
//!
//! This module only describes the builtins. It does **not** perform any
//! I/O itself; the evaluator maps each [`BuiltinKind`] to a call on its
//! `Host`, and code generators are free to map them to imports.

use std::sync::{Arc, OnceLock};

use crate::symbols::{FunctionOrigin, FunctionSymbol, VariableSymbol};
use crate::types::TypeSymbol;

/// Kind of builtin, used by the evaluator and backends to dispatch a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    /// Writes a line of text to the host's output.
    Print,

    /// Reads a line of text from the host's input.
    Input,

    /// Returns a random integer in `0..max`.
    Rnd,
}

/// Metadata about a single builtin function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDescriptor {
    /// Name at the language level (e.g. `print`).
    pub name: &'static str,

    /// Parameter names and types, in call order.
    pub parameters: &'static [(&'static str, TypeSymbol)],

    pub return_type: TypeSymbol,

    pub kind: BuiltinKind,
}

/// The complete list of builtins known to the core.
pub const BUILTINS: &[BuiltinDescriptor] = &[
    BuiltinDescriptor {
        name: "print",
        parameters: &[("text", TypeSymbol::String)],
        return_type: TypeSymbol::Void,
        kind: BuiltinKind::Print,
    },
    BuiltinDescriptor {
        name: "input",
        parameters: &[],
        return_type: TypeSymbol::String,
        kind: BuiltinKind::Input,
    },
    BuiltinDescriptor {
        name: "rnd",
        parameters: &[("max", TypeSymbol::Int)],
        return_type: TypeSymbol::Int,
        kind: BuiltinKind::Rnd,
    },
];

/// Look up a builtin by its language-level name.
///
/// The search is linear over `BUILTINS` because the table is small.
pub fn find_builtin(name: &str) -> Option<&'static BuiltinDescriptor> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

/// Function symbols for every builtin, created once per process so that
/// every compilation refers to the same symbols.
pub fn builtin_functions() -> &'static [Arc<FunctionSymbol>] {
    static FUNCTIONS: OnceLock<Vec<Arc<FunctionSymbol>>> = OnceLock::new();
    FUNCTIONS.get_or_init(|| BUILTINS.iter().map(BuiltinDescriptor::to_symbol).collect())
}

impl BuiltinDescriptor {
    fn to_symbol(&self) -> Arc<FunctionSymbol> {
        let parameters = self
            .parameters
            .iter()
            .map(|(name, ty)| VariableSymbol::parameter(*name, ty.clone()))
            .collect();
        FunctionSymbol::new(
            self.name,
            parameters,
            self.return_type.clone(),
            FunctionOrigin::Builtin(self.kind),
        )
    }
}
