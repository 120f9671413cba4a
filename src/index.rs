//! Lookup from bipartitions to target-tree branches, and the per-branch
//! label slots that source trees fill in.

use phylotree::tree::Tree as PhyloTree;
use itertools::Itertools;
use std::collections::HashMap;
use tracing::debug;

use crate::bipartition::{Bipartition, internal_clades, preorder};
use crate::error::TransferError;
use crate::taxa::TaxonRegistry;

/// One source tree's contribution to one target branch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LabelSlot {
    /// No matching source branch, or the match carried no label.
    #[default]
    Placeholder,
    Value(String),
}

impl LabelSlot {
    /// Missing and blank labels become [`LabelSlot::Placeholder`].
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some(l) if !l.is_empty() => LabelSlot::Value(l.to_string()),
            _ => LabelSlot::Placeholder,
        }
    }
}

/// Labels of the taxa on the side of `split` away from the reference taxon.
fn far_side(split: &Bipartition, taxa: &TaxonRegistry) -> String {
    (0..taxa.len())
        .filter(|&id| !split.bits().get(id))
        .filter_map(|id| taxa.label(id))
        .join(",")
}

/// Canonical bipartition → target node id, over internal non-root nodes.
///
/// If two target branches induce the same bipartition (both children of a
/// bifurcating root, for instance) the later one in pre-order wins. The number
/// of such overwrites is kept in [`TargetIndex::collisions`].
#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
    splits: HashMap<Bipartition, usize>,
    collisions: usize,
}

impl TargetIndex {
    pub fn build(tree: &PhyloTree, taxa: &TaxonRegistry) -> Result<Self, TransferError> {
        let scan = internal_clades(tree, taxa)?;
        let mut index = TargetIndex {
            splits: HashMap::with_capacity(scan.clades.len()),
            collisions: 0,
        };
        for clade in scan.clades {
            let split = Bipartition::encode(&clade.leaves, taxa.len());
            if let Some(previous) = index.splits.insert(split.clone(), clade.node) {
                index.collisions += 1;
                debug!(
                    split = %split.to_bit_string(taxa.len()),
                    clade = %far_side(&split, taxa),
                    previous,
                    node = clade.node,
                    "duplicate bipartition in target tree, keeping later node"
                );
            }
        }
        Ok(index)
    }

    pub fn lookup(&self, split: &Bipartition) -> Option<usize> {
        self.splits.get(split).copied()
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    pub fn collisions(&self) -> usize {
        self.collisions
    }
}

/// The target tree together with its registry, index and label slots.
///
/// Every internal node, the root included, owns `width` slots (one per
/// source tree). The root's slots can never be matched and always render as
/// placeholders.
#[derive(Debug, Clone)]
pub struct TargetTree {
    tree: PhyloTree,
    root: usize,
    taxa: TaxonRegistry,
    index: TargetIndex,
    slots: HashMap<usize, Vec<LabelSlot>>,
    width: usize,
}

impl TargetTree {
    /// Builds the registry from `tree`'s leaves, indexes its branches and
    /// sizes every internal node's slots to `source_count`.
    pub fn new(tree: PhyloTree, source_count: usize) -> Result<Self, TransferError> {
        let root = tree.get_root()?;
        let taxa = TaxonRegistry::from_tree(&tree)?;
        let index = TargetIndex::build(&tree, &taxa)?;

        let mut slots = HashMap::new();
        for node_id in preorder(&tree, root)? {
            if !tree.get(&node_id)?.children.is_empty() {
                slots.insert(node_id, vec![LabelSlot::Placeholder; source_count]);
            }
        }

        debug!(
            taxa = taxa.len(),
            branches = index.len(),
            collisions = index.collisions(),
            "indexed target tree"
        );

        Ok(TargetTree { tree, root, taxa, index, slots, width: source_count })
    }

    pub fn tree(&self) -> &PhyloTree {
        &self.tree
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn taxa(&self) -> &TaxonRegistry {
        &self.taxa
    }

    pub fn index(&self) -> &TargetIndex {
        &self.index
    }

    /// Number of slots per internal node.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Slots of an internal node, `None` for leaves and unknown ids.
    pub fn slots(&self, node: usize) -> Option<&[LabelSlot]> {
        self.slots.get(&node).map(Vec::as_slice)
    }

    pub(crate) fn set_slot(
        &mut self,
        node: usize,
        slot: usize,
        value: LabelSlot,
    ) -> Result<(), TransferError> {
        let width = self.width;
        let cell = self
            .slots
            .get_mut(&node)
            .and_then(|s| s.get_mut(slot))
            .ok_or(TransferError::SlotOutOfRange { slot, width })?;
        *cell = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(newick: &str, sources: usize) -> TargetTree {
        TargetTree::new(PhyloTree::from_newick(newick).unwrap(), sources).unwrap()
    }

    #[test]
    fn test_label_slot_from_label() {
        assert_eq!(LabelSlot::from_label(None), LabelSlot::Placeholder);
        assert_eq!(LabelSlot::from_label(Some("  ")), LabelSlot::Placeholder);
        assert_eq!(
            LabelSlot::from_label(Some("0.87")),
            LabelSlot::Value("0.87".to_string())
        );
    }

    #[test]
    fn test_index_skips_root_and_leaves() {
        let t = target("(A:0.1,B:0.2,(C:0.3,D:0.4):0.5);", 2);
        assert_eq!(t.index().len(), 1);
        assert_eq!(t.index().collisions(), 0);

        let cd = Bipartition::from_taxa([2, 3], 4);
        let node = t.index().lookup(&cd).unwrap();
        assert_ne!(node, t.root());
        assert_eq!(t.slots(node), Some(&[LabelSlot::Placeholder, LabelSlot::Placeholder][..]));
        assert_eq!(t.slots(t.root()).map(<[LabelSlot]>::len), Some(2));
    }

    #[test]
    fn test_bifurcating_root_collision_keeps_later_node() {
        let t = target("((A,B),(C,D));", 1);
        assert_eq!(t.index().len(), 1);
        assert_eq!(t.index().collisions(), 1);

        let split = Bipartition::from_taxa([0, 1], 4);
        let node = t.index().lookup(&split).unwrap();
        // (C,D) comes after (A,B) in pre-order
        let children = &t.tree().get(&t.root()).unwrap().children;
        assert_eq!(node, children[1]);
    }

    #[test]
    fn test_far_side_names_the_non_reference_taxa() {
        let taxa = TaxonRegistry::from_labels(["A", "B", "C", "D", "E"]).unwrap();
        assert_eq!(far_side(&Bipartition::from_taxa([1, 3], 5), &taxa), "B,D");
        assert_eq!(far_side(&Bipartition::from_taxa([0, 1, 3], 5), &taxa), "C,E");
    }

    #[test]
    fn test_star_tree_index_is_empty() {
        let t = target("(A,B,C,D);", 3);
        assert!(t.index().is_empty());
        assert_eq!(t.slots(t.root()).map(<[LabelSlot]>::len), Some(3));
    }

    #[test]
    fn test_set_slot_bounds() {
        let mut t = target("(A,B,(C,D));", 1);
        let root = t.root();
        assert!(t.set_slot(root, 0, LabelSlot::Value("1".into())).is_ok());
        assert!(matches!(
            t.set_slot(root, 1, LabelSlot::Placeholder),
            Err(TransferError::SlotOutOfRange { slot: 1, width: 1 })
        ));
    }
}
