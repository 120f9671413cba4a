//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Transfers branch labels (support values) from any number of source trees
//! onto the matching branches of a target tree. Branches are matched by the
//! bipartition of leaves they induce, so source and target may differ in
//! topology and rooting.
//!
//! Modules:
//! - `bitset`: compact bitset representation for leaf sets.
//! - `taxa`: the shared taxon registry (canonical leaf order).
//! - `bipartition`: canonical split encoding + clade extraction.
//! - `index`: target bipartition index and per-branch label slots.
//! - `transfer`: the per-source-tree transfer pass.
//! - `render`: multi-value branch label serializer.
//! - `io`: reading NEXUS/Newick tree files, writing the result.
//! - `error`: the crate's error type.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod bipartition;
pub mod bitset;
pub mod error;
pub mod index;
pub mod io;
pub mod render;
pub mod taxa;
pub mod transfer;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use bipartition::Bipartition;
pub use bitset::Bitset;
pub use error::TransferError;
pub use index::{LabelSlot, TargetIndex, TargetTree};
pub use io::{ReadOptions, default_output_path, read_tree, write_labeled_tree};
pub use render::{RenderOptions, render};
pub use taxa::TaxonRegistry;
pub use transfer::{TransferStats, transfer, transfer_files};
