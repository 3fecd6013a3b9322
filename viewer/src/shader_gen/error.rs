use std::path::PathBuf;

use super::diagnostics::{Diagnostic, Severity};

/// Error type for field program composition and compilation
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The compiler rejected the program; diagnostics are in user coordinates
    #[error("field program failed to compile ({} error(s))", count_errors(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The program is valid but the selected backend cannot run it
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Translating a validated module to WGSL failed
    #[error("failed to translate {dialect} program to WGSL: {message}")]
    Translate { dialect: &'static str, message: String },
}

fn count_errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count()
}

impl CompileError {
    /// Diagnostics to show in the editor, including a synthetic one for
    /// errors that have no source position.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            CompileError::Diagnostics(diagnostics) => diagnostics.clone(),
            other => vec![Diagnostic::error(other.to_string(), None)],
        }
    }
}

/// Failure to look up an `#include`
#[derive(Debug, thiserror::Error)]
pub enum IncludeError {
    #[error("unsupported include \"{0}\" (expected lygia/..., lygia.xyz/... or github.com/...)")]
    Unsupported(String),
    #[error("include {0} is not cached")]
    NotFound(String),
    #[error("failed to read include {url} from {}", path.display())]
    Io {
        url: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
