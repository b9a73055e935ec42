//! A parsed source file: text, root node and the lexer/parser diagnostics.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::ast::{CompilationUnitSyntax, SyntaxNode};
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::lexer::{self, SyntaxToken, TokenKind};
use crate::parser;
use crate::source::SourceText;

#[derive(Debug)]
pub struct SyntaxTree {
    text: Arc<SourceText>,
    root: CompilationUnitSyntax,
    diagnostics: Vec<Diagnostic>,
}

impl SyntaxTree {
    /// Parse an in-memory source with no file name.
    pub fn parse(text: impl Into<String>) -> Arc<SyntaxTree> {
        Self::parse_text(Arc::new(SourceText::new(text)))
    }

    pub fn parse_text(text: Arc<SourceText>) -> Arc<SyntaxTree> {
        let (root, diagnostics) = parser::parse_compilation_unit(&text);
        Arc::new(SyntaxTree {
            text,
            root,
            diagnostics,
        })
    }

    /// Read and parse a file; the path becomes the diagnostics' file name.
    pub fn load(path: impl AsRef<Path>) -> Result<Arc<SyntaxTree>, CoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::SourceIo {
            path: path.to_path_buf(),
            source,
        })?;
        let text = SourceText::with_file_name(contents, path.display().to_string());
        Ok(Self::parse_text(Arc::new(text)))
    }

    /// Lex without parsing. The trailing `Eof` token is dropped.
    pub fn parse_tokens(text: impl Into<String>) -> (Vec<SyntaxToken>, Vec<Diagnostic>) {
        let text = Arc::new(SourceText::new(text));
        let mut result = lexer::lex(&text);
        if result.tokens.last().is_some_and(|token| token.kind == TokenKind::Eof) {
            result.tokens.pop();
        }
        (result.tokens, result.diagnostics)
    }

    pub fn text(&self) -> &Arc<SourceText> {
        &self.text
    }

    pub fn root(&self) -> &CompilationUnitSyntax {
        &self.root
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn root_node(&self) -> SyntaxNode<'_> {
        SyntaxNode::CompilationUnit(&self.root)
    }
}

impl fmt::Display for SyntaxTree {
    /// Indented outline of the whole tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root_node().write_tree(f)
    }
}
