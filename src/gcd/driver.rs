//! Per-partition batch-GCD
//!
//! Given a partition's product tree and the head remainder supplied
//! by the coordinator, finish the remainder tree and compute one gcd
//! per leaf:
//!
//!   r_i = P mod N_i^2
//!   q_i = r_i / N_i          (exact integer division)
//!   g_i = gcd(q_i, N_i)
//!
//! g_i != 1 exactly when N_i shares a prime factor with at least one
//! other modulus in the global set. Pad leaves (N = 1) always yield
//! g = 1 and drop out downstream.
//!
//! The quotient form gcd(r/N, N) is used rather than gcd(r mod N, N).
//! The two agree whenever N is squarefree, which holds for every
//! well-formed RSA modulus; for a degenerate N = p^2 the quotient
//! form can miss the self-factor. Kept for bit-exact compatibility
//! with the reference behavior.

use crate::gcd::tree::ProductTree;
use num_bigint::BigUint;
use num_integer::Integer;

/// Compute the per-leaf gcds for one partition.
///
/// `head` is the remainder of the overall product modulo this
/// partition's squared root; `None` means the partition is the whole
/// corpus (monolithic run).
pub fn partition_gcds(tree: &ProductTree, head: Option<&BigUint>) -> Vec<BigUint> {
    let remainders = tree.remainders(head);

    tree.leaves()
        .iter()
        .zip(remainders)
        .map(|(n, r)| {
            let q = r / n;
            q.gcd(n)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    fn nums(values: &[u32]) -> Vec<BigUint> {
        values.iter().map(|&v| BigUint::from(v)).collect()
    }

    #[test]
    fn test_pairwise_coprime_yields_all_ones() {
        // 15 = 3*5, 77 = 7*11, 221 = 13*17
        let tree = ProductTree::build(nums(&[15, 77, 221, 1]));
        let gcds = partition_gcds(&tree, None);
        assert!(gcds.iter().all(BigUint::is_one));
    }

    #[test]
    fn test_shared_factors_detected() {
        // 15 = 3*5, 21 = 3*7, 77 = 7*11
        let tree = ProductTree::build(nums(&[15, 21, 77, 1]));
        let gcds = partition_gcds(&tree, None);
        assert_eq!(gcds, nums(&[3, 21, 7, 1]));
    }

    #[test]
    fn test_gcd_against_rest_of_set() {
        // Every g_i equals gcd(N_i, P / N_i) computed directly
        let leaves = nums(&[15, 21, 77, 143]);
        let tree = ProductTree::build(leaves.clone());
        let p = tree.root().clone();

        let gcds = partition_gcds(&tree, None);
        for (n, g) in leaves.iter().zip(&gcds) {
            let rest = &p / n;
            assert_eq!(g, &n.gcd(&rest));
        }
    }

    #[test]
    fn test_duplicate_modulus_reports_itself() {
        // Two identical moduli: each divides the product of the rest,
        // so the reported divisor is the modulus itself.
        let tree = ProductTree::build(nums(&[77, 77]));
        let gcds = partition_gcds(&tree, None);
        assert_eq!(gcds, nums(&[77, 77]));
    }
}
