//! Batch-GCD engine
//!
//! Bernstein's product/remainder-tree algorithm: for n moduli, find
//! every index i with gcd(N_i, prod_{j != i} N_j) != 1 in near-linear
//! time instead of the infeasible O(n^2) pairwise scan.
//!
//! The trees are built iteratively as explicit level arrays. The
//! coordinator shards the leaf set across worker threads and splices
//! the partial trees back together through a head tree, producing
//! output bit-for-bit identical to a monolithic run.

pub mod coordinator;
pub mod driver;
pub mod tree;

pub use coordinator::{AuditCoordinator, Match};
pub use driver::partition_gcds;
pub use tree::ProductTree;
