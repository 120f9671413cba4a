//! Error type shared by every stage of a transfer run.

use phylotree::tree::{NewickParseError, TreeError};
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort a transfer run.
///
/// Bipartition lookup misses are not errors: they are counted by the
/// transfer engine and the run continues.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no tree found in {0:?}")]
    NoTrees(PathBuf),

    #[error("could not parse tree in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: NewickParseError,
    },

    #[error("malformed tree: {0}")]
    Tree(#[from] TreeError),

    #[error("target tree has an unnamed leaf (node {0})")]
    UnnamedLeaf(usize),

    #[error("target tree has duplicate leaf name '{0}'")]
    DuplicateTaxon(String),

    #[error("target tree has no leaves")]
    EmptyTarget,

    #[error("label slot {slot} out of range, target was built for {width} source tree(s)")]
    SlotOutOfRange { slot: usize, width: usize },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    /// Process exit status for this failure, grouped by pipeline stage.
    pub fn exit_code(&self) -> i32 {
        match self {
            TransferError::Read { .. }
            | TransferError::NoTrees(_)
            | TransferError::Parse { .. } => 2,
            TransferError::Write { .. } => 4,
            _ => 3,
        }
    }
}
