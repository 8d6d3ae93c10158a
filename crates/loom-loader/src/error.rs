use std::path::PathBuf;

use loom_core::{CoreError, IntegrityError};
use miette::{Diagnostic, NamedSource, SourceSpan};

/// Alias for `Result<T, LoadError>`.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors raised while loading a world.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum LoadError {
    /// A file or directory could not be read.
    #[error("cannot read {path}")]
    #[diagnostic(code(loom::load::io))]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The directory holds no world documents.
    #[error("no world documents found in {0}")]
    #[diagnostic(
        code(loom::load::empty),
        help("world documents are `.toml` or `.json` files")
    )]
    NoDocuments(PathBuf),

    /// A document is not valid TOML/JSON or does not match the schema.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(Box<SyntaxError>),

    /// The merged world failed its referential-integrity pass.
    #[error("world failed its integrity check ({} problem(s))", problems.len())]
    #[diagnostic(
        code(loom::load::integrity),
        help("every reference must name a declared entity of the right kind")
    )]
    Integrity {
        /// One diagnostic per problem.
        #[related]
        problems: Vec<IntegrityDiagnostic>,
    },

    /// Any other core error.
    #[error(transparent)]
    #[diagnostic(code(loom::load::core))]
    Core(CoreError),
}

impl LoadError {
    /// The underlying integrity problems, if this is an integrity failure.
    pub fn integrity_problems(&self) -> Vec<&IntegrityError> {
        match self {
            Self::Integrity { problems } => problems.iter().map(|p| &p.0).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<CoreError> for LoadError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Integrity(errors) => Self::Integrity {
                problems: errors.into_iter().map(IntegrityDiagnostic).collect(),
            },
            other => Self::Core(other),
        }
    }
}

/// A parse or schema error pointing into the offending document.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{name}: {message}")]
#[diagnostic(code(loom::load::syntax))]
pub struct SyntaxError {
    /// Document name.
    pub name: String,
    /// Parser message.
    pub message: String,
    /// The document text.
    #[source_code]
    pub src: NamedSource<String>,
    /// Where the parser stopped.
    #[label("here")]
    pub span: Option<SourceSpan>,
}

/// One integrity problem, rendered as a related diagnostic.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{0}")]
#[diagnostic(code(loom::integrity), severity(Error))]
pub struct IntegrityDiagnostic(pub IntegrityError);
