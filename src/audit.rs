//! Audit orchestration: modulus list -> matches
//!
//! Loads the modulus table, pads it to a power of two, resolves the
//! worker count, and runs the shard coordinator. The table index is
//! the contract with downstream tooling: matches refer to positions
//! in the list as loaded, before padding.

use crate::config::AuditConfig;
use crate::error::Result;
use crate::gcd::{AuditCoordinator, Match};
use crate::modulus::{pad_to_power_of_two, read_modulus_list};
use std::time::{Duration, Instant};
use tracing::info;

/// Result of a completed audit run
#[derive(Debug)]
pub struct AuditOutcome {
    /// Matches in ascending global index order
    pub matches: Vec<Match>,

    /// Moduli loaded from the list (before padding)
    pub moduli_loaded: usize,

    /// Padded table length (power of two)
    pub padded_len: usize,

    /// Worker count used
    pub workers: usize,

    /// Wall time
    pub duration: Duration,
}

/// Run the batch-GCD audit described by `config`.
pub fn run_audit(config: &AuditConfig) -> Result<AuditOutcome> {
    let start = Instant::now();

    let mut moduli = read_modulus_list(&config.modulus_path)?;
    let moduli_loaded = moduli.len();
    let padded_len = pad_to_power_of_two(&mut moduli);
    let workers = config.resolve_workers(padded_len)?;

    info!(
        list = %config.modulus_path.display(),
        moduli = moduli_loaded,
        padded = padded_len,
        workers,
        "Loaded modulus table"
    );

    let matches = AuditCoordinator::new(workers).run(&moduli)?;

    Ok(AuditOutcome {
        matches,
        moduli_loaded,
        padded_len,
        workers,
        duration: start.elapsed(),
    })
}
