//! Core pipeline for the Quill language.
//!
//! The pipeline is roughly:
//!
//!   source text
//!     -> lexer      (tokens with trivia)
//!     -> parser     (syntax tree)
//!     -> binder     (bound tree + symbols + diagnostics)
//!     -> lowering   (flat goto/label form, control-flow checks)
//!     -> evaluator  (tree-walking interpreter)
//!
//! `Compilation` ties the stages together and chains interactive
//! submissions. Front ends (the CLI and REPL) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Source text, spans and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod source;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod ast;
pub mod parser;
pub mod syntax_tree;
pub mod classifier;

// ---------------------------------------------------------------------
// Semantic layers: types, symbols, scopes, binding
// ---------------------------------------------------------------------

pub mod types;
pub mod symbols;
pub mod value;
pub mod builtins;
pub mod scope;
pub mod operators;
pub mod bound_tree;
pub mod binder;

// ---------------------------------------------------------------------
// Lowering and flow analysis
// ---------------------------------------------------------------------

pub mod rewriter;
pub mod lowering;
pub mod control_flow;

// ---------------------------------------------------------------------
// Back-end: evaluation, dumps and compiler orchestration
// ---------------------------------------------------------------------

pub mod printer;
pub mod evaluator;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use classifier::{Classification, ClassifiedSpan, classify};
pub use compiler::{Compilation, EvaluationResult, ProgramEmitter, TreeEmitter};
pub use diagnostic::{Diagnostic, DiagnosticCode};
pub use error::CoreError;
pub use evaluator::{ConsoleHost, Globals, Host, RuntimeError};
pub use source::{SourceText, TextLocation};
pub use span::TextSpan;
pub use symbols::Symbol;
pub use syntax_tree::SyntaxTree;
pub use types::TypeSymbol;
pub use value::Value;
