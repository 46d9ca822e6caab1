//! Error types for rule loading, traversal and file rewriting

use std::io;
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot access '{}': No such file or directory", path.display())]
    MissingRoot { path: PathBuf },

    #[error("invalid rule set '{}': {reason}", path.display())]
    Rules { path: PathBuf, reason: String },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid include glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A replacement containing a mapped key would be rewritten again on the
    /// next run.
    #[error("replacement for \"{from}\" contains the mapped text \"{matched}\"")]
    SelfOverlap { from: String, matched: String },

    #[error("mapping has an empty \"from\"")]
    EmptyMapping,

    #[error("location rule has an empty path_contains predicate")]
    EmptyPredicate,

    #[error("refusing to rewrite {} file(s) with uncommitted changes (first: '{}')", paths.len(), first_path(paths))]
    DirtyFiles { paths: Vec<PathBuf> },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("error writing output: {0}")]
    Output(#[from] io::Error),
}

impl Error {
    /// The file this error is about, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Error::Read { path, .. }
            | Error::Write { path, .. }
            | Error::MissingRoot { path }
            | Error::Rules { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn first_path(paths: &[PathBuf]) -> String {
    paths
        .first()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
