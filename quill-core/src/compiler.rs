//! Compilation facade: one submission's syntax trees plus lazily bound
//! semantic state, chained to the submission before it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use once_cell::race::OnceBox;

use crate::binder::{BoundGlobalScope, BoundProgram, bind_global_scope, bind_program};
use crate::builtins::builtin_functions;
use crate::diagnostic::{Diagnostic, sort_diagnostics};
use crate::error::CoreError;
use crate::evaluator::{Evaluator, Globals, Host, RuntimeError};
use crate::printer::write_function;
use crate::symbols::{FunctionSymbol, Symbol};
use crate::syntax_tree::SyntaxTree;
use crate::value::Value;

/// Code-generation collaborator. Only handed programs without diagnostics.
pub trait ProgramEmitter {
    fn emit(&mut self, program: &BoundProgram) -> Result<(), CoreError>;
}

/// Emits the textual bound-tree dump of every function.
pub struct TreeEmitter<W: fmt::Write> {
    out: W,
}

impl<W: fmt::Write> TreeEmitter<W> {
    pub fn new(out: W) -> Self {
        TreeEmitter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: fmt::Write> ProgramEmitter for TreeEmitter<W> {
    fn emit(&mut self, program: &BoundProgram) -> Result<(), CoreError> {
        for (function, body) in program.functions() {
            write_function(&mut self.out, function, body).map_err(|error| CoreError::Emit(error.to_string()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    /// Sorted; when non-empty nothing was run.
    pub diagnostics: Vec<Diagnostic>,
    pub value: Option<Value>,
}

pub struct Compilation {
    is_script: bool,
    previous: Option<Arc<Compilation>>,
    syntax_trees: Vec<Arc<SyntaxTree>>,
    // Racing first readers may each bind; one compare-and-swap decides
    // which result is kept and the rest are dropped.
    global_scope: OnceBox<Arc<BoundGlobalScope>>,
    program: OnceBox<Arc<BoundProgram>>,
}

impl fmt::Debug for Compilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compilation")
            .field("is_script", &self.is_script)
            .field("syntax_trees", &self.syntax_trees.len())
            .field("bound", &self.global_scope.get().is_some())
            .finish_non_exhaustive()
    }
}

impl Compilation {
    /// A whole program: the entry point is `main`, declared or synthesized.
    pub fn new(syntax_trees: Vec<Arc<SyntaxTree>>) -> Self {
        Compilation {
            is_script: false,
            previous: None,
            syntax_trees,
            global_scope: OnceBox::new(),
            program: OnceBox::new(),
        }
    }

    /// One interactive submission, layered on `previous`.
    pub fn script(previous: Option<Arc<Compilation>>, syntax_tree: Arc<SyntaxTree>) -> Self {
        Compilation {
            is_script: true,
            previous,
            syntax_trees: vec![syntax_tree],
            global_scope: OnceBox::new(),
            program: OnceBox::new(),
        }
    }

    pub fn is_script(&self) -> bool {
        self.is_script
    }

    pub fn previous(&self) -> Option<&Arc<Compilation>> {
        self.previous.as_ref()
    }

    pub fn syntax_trees(&self) -> &[Arc<SyntaxTree>] {
        &self.syntax_trees
    }

    pub fn global_scope(&self) -> &Arc<BoundGlobalScope> {
        self.global_scope.get_or_init(|| {
            log::debug!("binding global scope of {} syntax tree(s)", self.syntax_trees.len());
            let previous = self.previous.as_ref().map(|previous| previous.global_scope().clone());
            Box::new(Arc::new(bind_global_scope(self.is_script, previous, &self.syntax_trees)))
        })
    }

    pub fn program(&self) -> &Arc<BoundProgram> {
        self.program.get_or_init(|| {
            let previous = self.previous.as_ref().map(|previous| previous.program().clone());
            Box::new(Arc::new(bind_program(previous, self.global_scope().clone())))
        })
    }

    /// Syntax and semantic diagnostics of this submission, sorted.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = self
            .syntax_trees
            .iter()
            .flat_map(|tree| tree.diagnostics().iter().cloned())
            .chain(self.program().diagnostics.iter().cloned())
            .collect();
        sort_diagnostics(&mut diagnostics);
        diagnostics
    }

    /// Every visible symbol, newest submission first, then built-ins. A
    /// name is listed once, for the declaration that shadows the others.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut seen = HashSet::new();
        let mut symbols = Vec::new();

        let mut current = Some(self);
        while let Some(compilation) = current {
            let global = compilation.global_scope();
            let declared = global
                .functions
                .iter()
                .map(|function| Symbol::Function(function.clone()))
                .chain(global.enums.iter().map(|symbol| Symbol::Enum(symbol.clone())))
                .chain(global.variables.iter().map(|variable| Symbol::Variable(variable.clone())));
            for symbol in declared {
                if seen.insert(symbol.name().to_string()) {
                    symbols.push(symbol);
                }
            }
            current = compilation.previous.as_deref();
        }

        for function in builtin_functions() {
            if seen.insert(function.name.clone()) {
                symbols.push(Symbol::Function(function.clone()));
            }
        }
        symbols
    }

    /// Run the submission unless it has diagnostics.
    pub fn evaluate(&self, globals: &mut Globals, host: &mut dyn Host) -> Result<EvaluationResult, RuntimeError> {
        let diagnostics = self.diagnostics();
        if !diagnostics.is_empty() {
            log::debug!("not evaluating: {} diagnostic(s)", diagnostics.len());
            return Ok(EvaluationResult {
                diagnostics,
                value: None,
            });
        }

        let value = Evaluator::new(self.program(), globals, host).evaluate()?;
        Ok(EvaluationResult {
            diagnostics,
            value,
        })
    }

    /// Dump `function`'s lowered body, or just its signature when it has
    /// none (built-ins).
    pub fn emit_tree(&self, function: &FunctionSymbol, out: &mut impl fmt::Write) -> fmt::Result {
        match self.program().function_body(function) {
            Some(body) => write_function(out, function, body),
            None => writeln!(out, "{function}"),
        }
    }

    /// Dump every function bound in this submission.
    pub fn emit_program_tree(&self, out: &mut impl fmt::Write) -> fmt::Result {
        for (function, body) in self.program().functions() {
            write_function(out, function, body)?;
        }
        Ok(())
    }

    /// Hand the bound program to `emitter`, refusing when there are
    /// diagnostics.
    pub fn emit(&self, emitter: &mut dyn ProgramEmitter) -> Result<(), CoreError> {
        let diagnostics = self.diagnostics();
        if !diagnostics.is_empty() {
            return Err(CoreError::Diagnostics(diagnostics));
        }
        emitter.emit(self.program())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::source::SourceText;
    use std::thread;

    #[derive(Default)]
    struct BufferHost {
        output: Vec<String>,
    }

    impl Host for BufferHost {
        fn print(&mut self, text: &str) {
            self.output.push(text.to_string());
        }

        fn input(&mut self) -> String {
            String::new()
        }

        fn random(&mut self, _max: i32) -> i32 {
            0
        }
    }

    fn submit(previous: Option<Arc<Compilation>>, text: &str) -> Arc<Compilation> {
        Arc::new(Compilation::script(previous, SyntaxTree::parse(text)))
    }

    #[test]
    fn submissions_share_globals() {
        let mut globals = Globals::new();
        let mut host = BufferHost::default();

        let first = submit(None, "var x = 10");
        let result = first.evaluate(&mut globals, &mut host).expect("evaluate");
        assert!(result.diagnostics.is_empty());

        let second = submit(Some(first), "x = x * 2\nprint(string(x))\nx");
        let result = second.evaluate(&mut globals, &mut host).expect("evaluate");
        assert_eq!(result.value, Some(Value::Int(20)));

        let third = submit(Some(second), "var x = \"shadow\"\nx");
        let result = third.evaluate(&mut globals, &mut host).expect("evaluate");
        assert_eq!(result.value, Some(Value::from("shadow")));
        assert_eq!(host.output, ["20"]);
    }

    #[test]
    fn block_locals_stay_out_of_globals() {
        let mut globals = Globals::new();
        let compilation = submit(
            None,
            "var total = 0\nvar last = 3\nfor i = 1 to last step last - 2 {\n    let doubled = i * 2\n    total = total + doubled\n}\ntotal",
        );
        let result = compilation
            .evaluate(&mut globals, &mut BufferHost::default())
            .expect("evaluate");
        assert_eq!(result.value, Some(Value::Int(12)));

        let mut names: Vec<&str> = globals.keys().map(|variable| variable.name.as_str()).collect();
        names.sort();
        assert_eq!(names, ["last", "total"]);
    }

    #[test]
    fn refuses_to_evaluate_with_diagnostics() {
        let mut globals = Globals::new();
        let mut host = BufferHost::default();
        let compilation = submit(None, "print(\"never\")\nvar y = 1 +");
        let result = compilation.evaluate(&mut globals, &mut host).expect("evaluate");
        assert_eq!(result.value, None);
        assert_eq!(
            result.diagnostics.iter().map(|d| d.code).collect::<Vec<_>>(),
            [DiagnosticCode::UnexpectedToken]
        );
        assert!(host.output.is_empty());
    }

    #[test]
    fn runtime_errors_propagate() {
        let compilation = Compilation::new(vec![SyntaxTree::parse("var z = 0\nprint(string(1 / z))")]);
        let result = compilation.evaluate(&mut Globals::new(), &mut BufferHost::default());
        assert_eq!(result, Err(RuntimeError::DivisionByZero));
    }

    #[test]
    fn diagnostics_are_sorted_across_files() {
        let b = SyntaxTree::parse_text(Arc::new(SourceText::with_file_name("var b = nope", "b.ql")));
        let a = SyntaxTree::parse_text(Arc::new(SourceText::with_file_name(
            "function f() { g() }\nfunction h() { 1 + true }",
            "a.ql",
        )));
        let compilation = Compilation::new(vec![b, a]);
        let diagnostics = compilation.diagnostics();
        let files: Vec<_> = diagnostics.iter().map(|d| d.location.file_name().to_string()).collect();
        assert_eq!(files, ["a.ql", "a.ql", "b.ql"]);
        assert!(diagnostics[0].span().start < diagnostics[1].span().start);
    }

    #[test]
    fn lists_visible_symbols_once() {
        let first = submit(None, "var x = 1\nfunction f() {}");
        let second = submit(Some(first), "var x = true\nenum E { A }");
        let listed: Vec<String> = second.symbols().iter().map(ToString::to_string).collect();
        assert_eq!(
            listed,
            [
                "enum E { A }",
                "var x: bool",
                "function f()",
                "function print(text: string)",
                "function input(): string",
                "function rnd(max: int): int",
            ]
        );
    }

    #[test]
    fn dumps_function_trees() {
        let compilation = Compilation::new(vec![SyntaxTree::parse("function twice(n: int): int { return n * 2 }")]);
        let twice = compilation.global_scope().functions[0].clone();
        let mut text = String::new();
        compilation.emit_tree(&twice, &mut text).expect("write");
        assert_eq!(text, "function twice(n: int): int\n{\n    return n * 2\n}\n");

        let mut text = String::new();
        compilation.emit_tree(&builtin_functions()[0], &mut text).expect("write");
        assert_eq!(text, "function print(text: string)\n");
    }

    #[test]
    fn emits_only_clean_programs() {
        let clean = Compilation::new(vec![SyntaxTree::parse("print(\"hi\")")]);
        let mut emitter = TreeEmitter::new(String::new());
        clean.emit(&mut emitter).expect("emit");
        assert_eq!(emitter.into_inner(), "function main()\n{\n    print(\"hi\")\n    return\n}\n");

        let broken = Compilation::new(vec![SyntaxTree::parse("print(1)")]);
        let error = broken.emit(&mut TreeEmitter::new(String::new())).unwrap_err();
        assert!(matches!(error, CoreError::Diagnostics(ref diagnostics) if diagnostics.len() == 1));
    }

    #[test]
    fn binds_once_under_concurrent_access() {
        let compilation = Compilation::new(vec![SyntaxTree::parse("var x = 1\nprint(string(x))")]);
        let programs: Vec<usize> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| Arc::as_ptr(compilation.program()) as usize))
                .collect();
            handles.into_iter().map(|handle| handle.join().expect("thread")).collect()
        });
        assert!(programs.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
