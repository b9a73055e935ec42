use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::evaluator::RuntimeError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source {}: {source}", path.display())]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("compilation produced {} diagnostic(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("emit failed: {0}")]
    Emit(String),
}
