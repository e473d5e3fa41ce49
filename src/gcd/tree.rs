//! Product and remainder trees over arbitrary-precision integers
//!
//! A product tree is a complete binary tree with the input values as
//! leaves; each internal node is the product of its two children. The
//! matching remainder tree has the same shape: each node holds the
//! parent's remainder reduced modulo the square of the node's product,
//! so the leaves end up holding P mod N_i^2 where P is the product of
//! all leaves.
//!
//! Reducing modulo N^2 rather than N is what makes the final step
//! work: P mod N^2 divided exactly by N is (P/N) mod N, and its gcd
//! with N exposes any factor N shares with the rest of the corpus.
//!
//! Levels are stored as explicit arrays, leaves first; no recursion.

use num_bigint::BigUint;

/// A complete binary product tree, all levels retained
pub struct ProductTree {
    /// levels[0] = leaves, last level = [root]
    levels: Vec<Vec<BigUint>>,
}

impl ProductTree {
    /// Build the tree bottom-up. The leaf count must be a power of
    /// two; the ingest side pads with 1 entries to guarantee this, so
    /// any other length is a logic error.
    pub fn build(leaves: Vec<BigUint>) -> Self {
        assert!(
            !leaves.is_empty() && leaves.len().is_power_of_two(),
            "product tree leaf count {} is not a power of two",
            leaves.len()
        );

        let mut levels = vec![leaves];
        while levels.last().map(Vec::len) != Some(1) {
            let prev = levels.last().expect("levels are never empty");
            let next: Vec<BigUint> = prev
                .chunks_exact(2)
                .map(|pair| &pair[0] * &pair[1])
                .collect();
            levels.push(next);
        }

        Self { levels }
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// The leaf level
    pub fn leaves(&self) -> &[BigUint] {
        &self.levels[0]
    }

    /// The root: the product of all leaves
    pub fn root(&self) -> &BigUint {
        &self.levels.last().expect("levels are never empty")[0]
    }

    /// Evaluate the remainder tree top-down.
    ///
    /// With `head = None` the root remainder is the root product
    /// itself (trivially P mod anything we need below). A coordinator
    /// splicing partial trees passes the head remainder it computed
    /// from the upper tree; the result is then bit-for-bit what a
    /// monolithic tree would produce for these leaves.
    ///
    /// Returns the leaf-level remainders: P mod (leaf_i)^2.
    pub fn remainders(&self, head: Option<&BigUint>) -> Vec<BigUint> {
        let root_rem = match head {
            Some(h) => h.clone(),
            None => self.root().clone(),
        };

        let mut current = vec![root_rem];
        // Walk levels below the root, widest last
        for level in self.levels.iter().rev().skip(1) {
            let next: Vec<BigUint> = level
                .iter()
                .enumerate()
                .map(|(j, node)| &current[j / 2] % (node * node))
                .collect();
            current = next;
        }
        current
    }
}
