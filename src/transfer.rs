//! Moving branch labels from source trees onto the target tree.
//!
//! Each source tree owns one slot index. For every internal non-root branch
//! of the source tree the engine encodes its bipartition against the
//! *target's* taxon registry and looks it up in the target index:
//!
//! ```text
//! target:  (A,B,(C,D))        index: {A,B}|{C,D} → node (C,D)
//! source0: (C,D,(A,B)0.87)    {A,B}|{C,D} hit  → slot 0 = "0.87"
//! source1: (A,C,(B,D)0.95)    {A,C}|{B,D} miss → nothing written
//! ```

use phylotree::tree::Tree as PhyloTree;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::bipartition::{Bipartition, internal_clades};
use crate::error::TransferError;
use crate::index::{LabelSlot, TargetTree};
use crate::io::{ReadOptions, read_tree};
use crate::taxa::unquote;

/// Per-source-tree diagnostic counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferStats {
    /// Source branches whose bipartition exists in the target.
    pub matched: usize,
    /// Source branches absent from the target.
    pub unmatched: usize,
}

/// Transfers the labels of one source tree into slot `slot` of `target`.
///
/// A matched branch without a label leaves the slot untouched (placeholder).
/// When several source branches hit the same target branch, as the two
/// children of a bifurcating source root do, the last labelled one in
/// pre-order is kept; every hit is still counted as matched. Each target
/// slot is written at most once per pass.
///
/// # Errors
/// [`TransferError::SlotOutOfRange`] if `slot` is not below the target's
/// slot width, or a [`TransferError::Tree`] for a malformed source tree.
pub fn transfer(
    target: &mut TargetTree,
    source: &PhyloTree,
    slot: usize,
) -> Result<TransferStats, TransferError> {
    if slot >= target.width() {
        return Err(TransferError::SlotOutOfRange { slot, width: target.width() });
    }

    let scan = internal_clades(source, target.taxa())?;
    if scan.unresolved_leaves > 0 {
        warn!(
            slot,
            leaves = scan.unresolved_leaves,
            "source tree has leaves missing from the target, ignoring them"
        );
    }

    let num_taxa = target.taxa().len();
    let mut stats = TransferStats::default();
    let mut pending: HashMap<usize, LabelSlot> = HashMap::new();
    for clade in scan.clades {
        let split = Bipartition::encode(&clade.leaves, num_taxa);
        // Clades made only of unknown leaves, or holding every taxon
        if split.is_trivial(num_taxa) {
            debug!(slot, node = clade.node, "source branch splits off no target taxa");
            stats.unmatched += 1;
            continue;
        }
        let Some(node) = target.index().lookup(&split) else {
            stats.unmatched += 1;
            continue;
        };
        stats.matched += 1;

        let value = LabelSlot::from_label(source.get(&clade.node)?.name.as_deref().map(unquote));
        if value == LabelSlot::Placeholder {
            continue;
        }
        if pending.insert(node, value).is_some() {
            debug!(slot, node, "target branch hit again by this source tree, keeping the later label");
        }
    }

    for (node, value) in pending {
        target.set_slot(node, slot, value)?;
    }

    Ok(stats)
}

/// Reads the target and every source file, transferring labels in the order
/// the sources are given (source `i` fills slot `i`).
///
/// `on_source` is called after each source tree with its slot index, path and
/// counts. Each source tree is dropped once its pass is done.
pub fn transfer_files<P, Q, F>(
    target_path: P,
    source_paths: &[Q],
    options: &ReadOptions,
    mut on_source: F,
) -> Result<TargetTree, TransferError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: FnMut(usize, &Path, TransferStats),
{
    let t0 = Instant::now();
    let tree = read_tree(target_path.as_ref(), options)?;
    let mut target = TargetTree::new(tree, source_paths.len())?;
    info!(
        taxa = target.taxa().len(),
        branches = target.index().len(),
        "indexed target tree in {:.3}s",
        t0.elapsed().as_secs_f64()
    );

    for (slot, path) in source_paths.iter().enumerate() {
        let t1 = Instant::now();
        let source = read_tree(path.as_ref(), options)?;
        let stats = transfer(&mut target, &source, slot)?;
        info!(slot, "transferred labels in {:.3}s", t1.elapsed().as_secs_f64());
        on_source(slot, path.as_ref(), stats);
    }

    Ok(target)
}
