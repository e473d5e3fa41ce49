//! keysweep - SSH Public Key Corpus Auditor
//!
//! A tool for auditing large corpora of harvested SSH public keys for
//! RSA moduli that share prime factors. Two keys generated with the
//! same prime expose both private keys to anyone holding the public
//! corpus; at ~10^7 keys the naive pairwise GCD scan is infeasible,
//! so the audit uses Bernstein's batch-GCD (product/remainder trees)
//! sharded across worker threads.
//!
//! # Features
//!
//! - **Streaming ingest**: journals of user/key records are read one
//!   LF-delimited JSON record at a time, with transparent xz
//!   decompression, so memory stays bounded by the modulus table.
//!
//! - **Bloom-filter dedup**: distinct moduli are selected in
//!   first-seen order without holding a hash set of 10^7 keys.
//!
//! - **Sharded batch GCD**: one worker per CPU builds a partial
//!   product tree; a head tree splices the shards back together with
//!   output bit-for-bit identical to a monolithic run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Journal Directory                             │
//! │          keys-0001.json  keys-0002.json.xz  ...                  │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ discovery → records
//!                               ▼
//!          ┌───────────────────────────────────────────┐
//!          │   Key parser → Bloom dedup → modulus list  │   (extract)
//!          └─────────────────────┬─────────────────────┘
//!                                │ hex list, index = identity
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Audit Coordinator                          │
//! │   shard 0        shard 1        shard 2        shard 3           │
//! │  ┌─────────┐   ┌─────────┐   ┌─────────┐   ┌─────────┐          │
//! │  │Worker 0 │   │Worker 1 │   │Worker 2 │   │Worker 3 │          │
//! │  │ product │   │ product │   │ product │   │ product │          │
//! │  │  tree   │   │  tree   │   │  tree   │   │  tree   │          │
//! │  └────┬────┘   └────┬────┘   └────┬────┘   └────┬────┘          │
//! │       │ roots       │             │             │                │
//! │       └──────┬──────┴──────┬──────┴──────┬──────┘                │
//! │              ▼             │             │                       │
//! │        ┌───────────┐       │ head remainders                     │
//! │        │ head tree │───────┴─────────────┘                       │
//! │        └───────────┘                                             │
//! │  workers finish remainder trees, reply per-leaf gcds             │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ (index, divisor) pairs
//!                               ▼
//!                       stdout: `17,c35f…`
//! ```
//!
//! # Example
//!
//! ```bash
//! # Extract unique RSA moduli from harvested journals
//! keysweep extract ./journals moduli.txt
//!
//! # Audit for shared factors with 8 workers
//! keysweep audit moduli.txt -w 8 > matches.csv
//! ```

pub mod audit;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod gcd;
pub mod journal;
pub mod modulus;
pub mod progress;
pub mod sshkey;

pub use audit::{run_audit, AuditOutcome};
pub use config::{AuditConfig, Cli, Command, ExtractConfig};
pub use error::{Result, SweepError};
pub use extract::{run_extract, run_stats, ExtractStats};
pub use gcd::{AuditCoordinator, Match};
pub use modulus::Modulus;
pub use sshkey::{parse_public_key_line, KeyOutcome};
