//! Loading Storyloom worlds from authored documents.
//!
//! A world is one or more `.toml` / `.json` documents. Each document may
//! declare any subset of the top-level sections; documents in a directory
//! are merged in file-name order and the result is built into a validated
//! [`Catalog`]. This is the only place authoring-format concerns touch the
//! engine.

/// Load errors and their terminal diagnostics.
pub mod error;

use std::path::{Path, PathBuf};

use loom_core::definition::WorldDocument;
use loom_core::integrity::IntegrityError;
use loom_core::{Catalog, CoreError};
use miette::{NamedSource, SourceSpan};

pub use error::{IntegrityDiagnostic, LoadError, LoadResult, SyntaxError};

/// Document syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// TOML.
    Toml,
    /// JSON.
    Json,
}

impl Format {
    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse one document.
pub fn parse_document(name: &str, source: &str, format: Format) -> LoadResult<WorldDocument> {
    let result = match format {
        Format::Toml => toml::from_str::<WorldDocument>(source).map_err(|e| {
            let span = e.span().map(SourceSpan::from);
            (e.message().to_string(), span)
        }),
        Format::Json => serde_json::from_str::<WorldDocument>(source).map_err(|e| {
            let offset = offset_of(source, e.line(), e.column());
            (e.to_string(), Some(SourceSpan::from((offset, 0))))
        }),
    };
    result.map_err(|(message, span)| {
        LoadError::Syntax(Box::new(SyntaxError {
            name: name.to_string(),
            message,
            src: NamedSource::new(name, source.to_string()),
            span,
        }))
    })
}

/// Byte offset of a 1-based line/column position.
fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}

/// Build a catalog from already-parsed documents, merged in order.
pub fn load_documents(documents: Vec<WorldDocument>) -> LoadResult<Catalog> {
    let mut merged = WorldDocument::default();
    let mut duplicates = Vec::new();
    for doc in documents {
        duplicates.extend(merged.merge(doc));
    }
    match Catalog::from_document(merged) {
        Ok(catalog) if duplicates.is_empty() => Ok(catalog),
        Ok(_) => Err(integrity(duplicates, Vec::new())),
        Err(CoreError::Integrity(errors)) => Err(integrity(duplicates, errors)),
        Err(other) => Err(other.into()),
    }
}

fn integrity(duplicates: Vec<&'static str>, errors: Vec<IntegrityError>) -> LoadError {
    let mut all: Vec<IntegrityError> = duplicates
        .into_iter()
        .map(IntegrityError::DuplicateSection)
        .collect();
    all.extend(errors);
    CoreError::Integrity(all).into()
}

/// Load a world from a single document string.
pub fn load_str(source: &str, format: Format) -> LoadResult<Catalog> {
    let doc = parse_document("<input>", source, format)?;
    load_documents(vec![doc])
}

/// World documents in `dir`, sorted by file name.
pub fn discover(dir: &Path) -> LoadResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && Format::from_path(p).is_some())
        .collect();
    // Sort for deterministic merge order
    paths.sort();
    Ok(paths)
}

/// Load every document in a directory.
pub fn load_dir(dir: &Path) -> LoadResult<Catalog> {
    let paths = discover(dir)?;
    if paths.is_empty() {
        return Err(LoadError::NoDocuments(dir.to_path_buf()));
    }
    let mut documents = Vec::with_capacity(paths.len());
    for path in &paths {
        documents.push(read_document(path)?);
    }
    tracing::debug!(dir = %dir.display(), documents = paths.len(), "loading world");
    load_documents(documents)
}

/// Load a world from a directory or a single document file.
pub fn load_path(path: &Path) -> LoadResult<Catalog> {
    if path.is_dir() {
        load_dir(path)
    } else {
        load_documents(vec![read_document(path)?])
    }
}

fn read_document(path: &Path) -> LoadResult<WorldDocument> {
    let format = Format::from_path(path).ok_or_else(|| LoadError::NoDocuments(path.to_path_buf()))?;
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_document(&name, &source, format)
}
