//! Lexical scopes used while binding.
//!
//! Scopes form a stack: built-ins at the bottom, then one layer per
//! earlier submission (oldest first), the current global scope, and on
//! top the function and block scopes of whatever is being bound. Lookup
//! walks from the top, so nearer declarations shadow outer ones.

use std::collections::HashMap;

use crate::symbols::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Builtins,
    /// Globals of an earlier submission.
    Previous,
    Global,
    Function,
    Block,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    symbols: HashMap<String, Symbol>,
}

#[derive(Debug, Default)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
}

impl ScopeChain {
    pub fn new() -> Self {
        ScopeChain { scopes: Vec::new() }
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            symbols: HashMap::new(),
        });
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare in the innermost scope. A name already declared there is
    /// left untouched and its symbol is returned as the error.
    pub fn declare(&mut self, symbol: Symbol) -> Result<(), Symbol> {
        let Some(scope) = self.scopes.last_mut() else {
            return Err(symbol);
        };
        if let Some(existing) = scope.symbols.get(symbol.name()) {
            return Err(existing.clone());
        }
        scope.symbols.insert(symbol.name().to_string(), symbol);
        Ok(())
    }

    /// Declare in the innermost scope, replacing any same-named symbol.
    pub fn declare_or_replace(&mut self, symbol: Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.symbols.insert(symbol.name().to_string(), symbol);
        }
    }

    /// Resolve a name, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.symbols.get(name))
    }

    /// True when the innermost scope is the submission's global scope.
    /// Only declarations made there outlive the entry function's frame.
    pub fn is_global(&self) -> bool {
        self.scopes.last().is_some_and(|scope| scope.kind == ScopeKind::Global)
    }

    /// Symbols declared directly in the innermost scope.
    pub fn innermost(&self) -> impl Iterator<Item = &Symbol> {
        self.scopes.last().into_iter().flat_map(|scope| scope.symbols.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::VariableSymbol;
    use crate::types::TypeSymbol;

    fn variable(name: &str) -> Symbol {
        Symbol::Variable(VariableSymbol::local(name, TypeSymbol::Int, false))
    }

    #[test]
    fn inner_scopes_shadow_outer_ones() {
        let mut chain = ScopeChain::new();
        chain.push(ScopeKind::Global);
        let outer = variable("x");
        chain.declare(outer.clone()).expect("declare");

        chain.push(ScopeKind::Block);
        let inner = variable("x");
        chain.declare(inner.clone()).expect("shadowing is allowed");
        assert_eq!(chain.lookup("x"), Some(&inner));

        chain.pop();
        assert_eq!(chain.lookup("x"), Some(&outer));
        assert!(chain.lookup("y").is_none());
    }

    #[test]
    fn duplicates_in_one_scope_keep_the_first() {
        let mut chain = ScopeChain::new();
        chain.push(ScopeKind::Global);
        let first = variable("x");
        chain.declare(first.clone()).expect("declare");
        assert_eq!(chain.declare(variable("x")), Err(first.clone()));
        assert_eq!(chain.lookup("x"), Some(&first));
    }

    #[test]
    fn only_the_global_scope_itself_is_global() {
        let mut chain = ScopeChain::new();
        chain.push(ScopeKind::Global);
        assert!(chain.is_global());
        chain.push(ScopeKind::Block);
        assert!(!chain.is_global());
        chain.pop();
        chain.push(ScopeKind::Function);
        chain.push(ScopeKind::Block);
        assert!(!chain.is_global());
        assert_eq!(chain.depth(), 3);
    }
}
