//! Compact bitset representation for leaf sets.
//!
//! # Overview
//! Each bit position corresponds to a taxon's index in the
//! [`TaxonRegistry`](crate::taxa::TaxonRegistry), i.e. the canonical leaf order
//! of the target tree.
//!
//! # Example
//! For a target tree with leaves [A, B, C, D] mapped to indices [0, 1, 2, 3]:
//! - Clade {A, C} → bitset `0b0101` (bits 0 and 2 set)
//! - Clade {B, C, D} → bitset `0b1110` (bits 1, 2, 3 set)

/// A compact bitset for representing which taxa belong to a clade.
///
/// Internally stores bits in `Vec<u64>` words to support arbitrarily large trees.
/// Each u64 word holds 64 taxon indices. Bits beyond the taxon count are
/// always kept at 0 so that equal leaf sets hash equally.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Creates a new bitset with all bits set to 0.
    ///
    /// # Parameters
    /// - `words`: Number of u64 words needed. Calculate with [`Bitset::words_for`].
    ///
    /// # Example
    /// ```
    /// # use transfer_branch_labels::bitset::Bitset;
    /// // For a tree with 100 leaves, need 2 words (128 bits)
    /// let bs = Bitset::zeros(Bitset::words_for(100));
    /// assert_eq!(bs.0.len(), 2);
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Number of words needed to hold `bits` bits.
    #[inline]
    pub fn words_for(bits: usize) -> usize {
        bits.div_ceil(64)
    }

    /// Sets the bit at the given index to 1.
    ///
    /// # Example
    /// ```
    /// # use transfer_branch_labels::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(5);
    /// assert_eq!(bs.0[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        let word = idx >> 6;     // Equivalent to idx / 64
        let bit = idx & 63;      // Equivalent to idx % 64
        self.0[word] |= 1u64 << bit;
    }

    /// Returns whether the bit at `idx` is set. Out-of-range indices read as 0.
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        self.0
            .get(idx >> 6)
            .is_some_and(|w| w & (1u64 << (idx & 63)) != 0)
    }

    /// Performs bitwise OR with another bitset (union operation).
    ///
    /// # Example
    /// ```
    /// # use transfer_branch_labels::bitset::Bitset;
    /// let mut left = Bitset::zeros(1);
    /// left.set(0);
    ///
    /// let mut right = Bitset::zeros(1);
    /// right.set(1);
    ///
    /// left.or_assign(&right);  // {0} ∪ {1} = {0, 1}
    /// assert_eq!(left.0[0], 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Flips the first `num_bits` bits in place, leaving the padding bits at 0.
    ///
    /// # Example
    /// ```
    /// # use transfer_branch_labels::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(1);
    /// bs.complement(4);
    /// assert_eq!(bs.0[0], 0b1100);
    /// ```
    pub fn complement(&mut self, num_bits: usize) {
        for (i, word) in self.0.iter_mut().enumerate() {
            let lo = i * 64;
            if lo >= num_bits {
                *word = 0;
                continue;
            }
            let live = num_bits - lo;
            let mask = if live >= 64 { u64::MAX } else { (1u64 << live) - 1 };
            *word = !*word & mask;
        }
    }

    /// Counts the number of set bits (population count).
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_basic() {
        let mut bs = Bitset::zeros(1);
        bs.set(0);
        bs.set(2);
        assert_eq!(bs.0[0], 0b0101);
        assert!(bs.get(0));
        assert!(!bs.get(1));
        assert!(bs.get(2));
        assert!(!bs.get(640));
    }

    #[test]
    fn test_bitset_or() {
        let mut bs1 = Bitset::zeros(1);
        bs1.set(0);
        bs1.set(1);

        let mut bs2 = Bitset::zeros(1);
        bs2.set(2);
        bs2.set(3);

        bs1.or_assign(&bs2);
        assert_eq!(bs1.0[0], 0b1111);
    }

    #[test]
    fn test_complement_keeps_padding_clear() {
        // 5 taxa: {B, C} → {A, D, E}
        let mut bs = Bitset::zeros(1);
        bs.set(1);
        bs.set(2);
        bs.complement(5);
        assert_eq!(bs.0[0], 0b11001);
        assert_eq!(bs.count_ones(), 3);

        // Complementing twice is the identity
        bs.complement(5);
        assert_eq!(bs.0[0], 0b00110);
    }

    #[test]
    fn test_large_tree() {
        // More than 64 leaves (multiple words)
        let mut bs = Bitset::zeros(Bitset::words_for(70));
        bs.set(0);
        bs.set(63);
        bs.set(64);
        assert_eq!(bs.count_ones(), 3);

        bs.complement(70);
        assert_eq!(bs.count_ones(), 67);
        assert!(!bs.get(64));
        assert!(bs.get(69));
        assert!(!bs.get(70));
        assert_eq!(bs.0[1], 0b111110);
    }

    #[test]
    fn test_zero_width() {
        let mut bs = Bitset::zeros(Bitset::words_for(0));
        bs.complement(0);
        assert_eq!(bs.count_ones(), 0);
    }
}
