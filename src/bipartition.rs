//! Canonical bipartition encoding and clade extraction.
//!
//! # What is a bipartition?
//! Each internal branch of a tree divides the leaves into two groups.
//! For example:
//! ```text
//!      root
//!     /    \
//!   {A,B}  {C,D}  ← this branch splits {A,B} | {C,D}
//! ```
//!
//! A clade and its complement describe the same split. Trees rooted in
//! different places see the same branch from opposite sides, so the encoding
//! must not care which side was "below" the branch.
//!
//! # Canonicalization
//! The first taxon of the canonical order is the *reference*. A taxon's bit is
//! 1 when its membership agrees with the reference's membership. The reference
//! bit is therefore always 1 and the encoding is simply the side of the split
//! that contains the reference:
//!
//! | Leaves A=0..D=3 | Raw clade | Has A? | Encoded  |
//! |-----------------|-----------|--------|----------|
//! | {A,B}           | 0b0011    | yes    | 0b0011   |
//! | {C,D}           | 0b1100    | no     | 0b0011   |
//!
//! Trivial clades (empty, or every taxon) encode to all ones. The target index
//! never contains that vector, so they can never match.

use phylotree::tree::{Tree as PhyloTree, TreeError};
use std::collections::HashMap;

use crate::bitset::Bitset;
use crate::error::TransferError;
use crate::taxa::{TaxonId, TaxonRegistry, unquote};

/// A split of the taxon set, canonicalized to the side holding taxon 0.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bipartition(Bitset);

impl Bipartition {
    /// Encodes the split induced by `clade` over `num_taxa` taxa.
    ///
    /// # Example
    /// ```
    /// # use transfer_branch_labels::bipartition::Bipartition;
    /// let ab = Bipartition::from_taxa([0, 1], 4);
    /// let cd = Bipartition::from_taxa([2, 3], 4);
    /// assert_eq!(ab, cd);
    /// ```
    pub fn encode(clade: &Bitset, num_taxa: usize) -> Self {
        let mut bits = clade.clone();
        if !bits.get(0) {
            bits.complement(num_taxa);
        }
        Bipartition(bits)
    }

    /// Encodes a clade given as taxon ids, in any order.
    pub fn from_taxa<I>(taxa: I, num_taxa: usize) -> Self
    where
        I: IntoIterator<Item = TaxonId>,
    {
        let mut clade = Bitset::zeros(Bitset::words_for(num_taxa));
        for id in taxa {
            clade.set(id);
        }
        Self::encode(&clade, num_taxa)
    }

    pub fn bits(&self) -> &Bitset {
        &self.0
    }

    /// True for the all-ones encoding of an empty or complete clade.
    pub fn is_trivial(&self, num_taxa: usize) -> bool {
        self.0.count_ones() == num_taxa
    }

    /// Bits in canonical order as `0`/`1` characters, for log output.
    pub fn to_bit_string(&self, num_taxa: usize) -> String {
        (0..num_taxa)
            .map(|i| if self.0.get(i) { '1' } else { '0' })
            .collect()
    }
}

/// The leaf set below one internal, non-root node.
#[derive(Debug, Clone)]
pub struct Clade {
    pub node: usize,
    pub leaves: Bitset,
}

/// Result of scanning a tree for its informative clades.
#[derive(Debug, Clone, Default)]
pub struct CladeScan {
    /// Internal non-root nodes in pre-order.
    pub clades: Vec<Clade>,
    /// Leaves whose name is missing from the registry (or absent).
    pub unresolved_leaves: usize,
}

/// Node ids of the subtree at `root`, parents before children, children
/// left to right.
pub fn preorder(tree: &PhyloTree, root: usize) -> Result<Vec<usize>, TreeError> {
    let mut order = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        order.push(id);
        stack.extend(tree.get(&id)?.children.iter().rev().copied());
    }
    Ok(order)
}

/// Computes the leaf set of every internal non-root node of `tree`, with bit
/// positions taken from `taxa`.
///
/// # Algorithm
/// 1. Walk the tree once in pre-order
/// 2. Visit that order backwards so children are done before their parent
/// 3. **Leaf**: single bit for its taxon (none if the name is unknown)
/// 4. **Internal**: OR together the children's bitsets
pub fn internal_clades(
    tree: &PhyloTree,
    taxa: &TaxonRegistry,
) -> Result<CladeScan, TransferError> {
    let root = tree.get_root()?;
    let order = preorder(tree, root)?;
    let words = Bitset::words_for(taxa.len());

    let mut unresolved_leaves = 0;
    let mut cache: HashMap<usize, Bitset> = HashMap::with_capacity(order.len());
    for &node_id in order.iter().rev() {
        let node = tree.get(&node_id)?;
        let mut bitset = Bitset::zeros(words);
        if node.children.is_empty() {
            match node.name.as_deref().and_then(|n| taxa.get(unquote(n))) {
                Some(taxon) => bitset.set(taxon),
                None => unresolved_leaves += 1,
            }
        } else {
            for child in &node.children {
                if let Some(child_bits) = cache.get(child) {
                    bitset.or_assign(child_bits);
                }
            }
        }
        cache.insert(node_id, bitset);
    }

    let mut clades = Vec::new();
    for &node_id in &order {
        if node_id == root || tree.get(&node_id)?.children.is_empty() {
            continue;
        }
        if let Some(leaves) = cache.remove(&node_id) {
            clades.push(Clade { node: node_id, leaves });
        }
    }

    Ok(CladeScan { clades, unresolved_leaves })
}
