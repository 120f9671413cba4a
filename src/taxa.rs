//! The shared catalog of leaf identities.
//!
//! Every tree in a run resolves its leaf names against one [`TaxonRegistry`],
//! built from the target tree. A taxon's [`TaxonId`] doubles as its bit
//! position in every [`Bipartition`](crate::bipartition::Bipartition), so the
//! registry order *is* the canonical leaf order.

use phylotree::tree::Tree as PhyloTree;
use std::collections::HashMap;

use crate::bipartition::preorder;
use crate::error::TransferError;

/// Dense index of a taxon in the canonical leaf order.
pub type TaxonId = usize;

/// Immutable mapping between leaf labels and [`TaxonId`]s.
///
/// # Example
/// ```
/// # use transfer_branch_labels::taxa::TaxonRegistry;
/// let taxa = TaxonRegistry::from_labels(["A", "B", "C"]).unwrap();
/// assert_eq!(taxa.get("B"), Some(1));
/// assert_eq!(taxa.label(2), Some("C"));
/// assert_eq!(taxa.get("Z"), None);
/// ```
#[derive(Debug, Clone)]
pub struct TaxonRegistry {
    labels: Vec<String>,
    index: HashMap<String, TaxonId>,
}

impl TaxonRegistry {
    /// Builds a registry from labels in canonical order.
    ///
    /// # Errors
    /// [`TransferError::DuplicateTaxon`] if a label appears twice,
    /// [`TransferError::EmptyTarget`] if there are no labels at all.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, TransferError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = TaxonRegistry { labels: Vec::new(), index: HashMap::new() };
        for label in labels {
            let label = label.into();
            if registry.index.contains_key(&label) {
                return Err(TransferError::DuplicateTaxon(label));
            }
            registry.index.insert(label.clone(), registry.labels.len());
            registry.labels.push(label);
        }
        if registry.labels.is_empty() {
            return Err(TransferError::EmptyTarget);
        }
        Ok(registry)
    }

    /// Builds the registry from a tree's leaves, read left to right.
    ///
    /// # Errors
    /// Every leaf must carry a unique name.
    pub fn from_tree(tree: &PhyloTree) -> Result<Self, TransferError> {
        let root = tree.get_root()?;
        let mut labels = Vec::new();
        for node_id in preorder(tree, root)? {
            let node = tree.get(&node_id)?;
            if !node.children.is_empty() {
                continue;
            }
            match node.name.as_deref().map(unquote) {
                Some(name) if !name.is_empty() => labels.push(name.to_string()),
                _ => return Err(TransferError::UnnamedLeaf(node_id)),
            }
        }
        Self::from_labels(labels)
    }

    pub fn get(&self, label: &str) -> Option<TaxonId> {
        self.index.get(label).copied()
    }

    pub fn label(&self, id: TaxonId) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Strips the double quotes that survive from quoted Newick labels, along
/// with surrounding whitespace.
pub fn unquote(name: &str) -> &str {
    name.trim().trim_matches('"')
}
