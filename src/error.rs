use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a tree file into a [`crate::tree::Tree`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read tree file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tree file did not contain any trees")]
    NoTrees,

    #[error("unbalanced parentheses in newick string at byte {offset}")]
    Unbalanced { offset: usize },

    #[error("unterminated {0}")]
    Unterminated(&'static str),

    #[error("failed to parse newick tree: {0}")]
    Newick(String),

    #[error("invalid tree line: {0}")]
    TreeLine(String),

    #[error("invalid translate entry: {0}")]
    Translate(String),

    #[error("tip '{0}' is not declared in the TAXA block")]
    UndeclaredTaxon(String),

    #[error("tip name '{0}' appears more than once")]
    DuplicateTip(String),

    #[error("branch length {length} of {node} is not a finite non-negative number")]
    InvalidBranchLength { node: String, length: f64 },

    #[error("tree has no root")]
    NoRoot,
}

pub type ParseResult<T> = Result<T, ParseError>;
