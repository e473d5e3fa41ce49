//! Extract pipeline: journals -> unique modulus list
//!
//! Single-threaded by design. Throughput is bounded by journal I/O
//! and base64 decoding; the parallel effort is saved for the GCD
//! phase, where it matters.
//!
//! The loop honors a shutdown flag at record boundaries so a Ctrl-C
//! stops the run cleanly; an interrupted extract writes no output.

use crate::config::ExtractConfig;
use crate::dedup::Deduplicator;
use crate::error::{Result, SweepError};
use crate::journal::{discover_chunks, JournalReader};
use crate::modulus::{write_hex_list, Modulus};
use crate::sshkey::{algorithm_of, parse_public_key_line, KeyOutcome};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Counters and timing from a completed extract run
#[derive(Debug, Default)]
pub struct ExtractStats {
    /// Journal chunks consumed
    pub chunks: u64,

    /// Records read
    pub records: u64,

    /// Key lines seen (all algorithms)
    pub keys_seen: u64,

    /// RSA keys parsed
    pub rsa_keys: u64,

    /// Keys skipped as non-RSA
    pub not_rsa: u64,

    /// Keys skipped as malformed
    pub malformed: u64,

    /// Distinct moduli written
    pub distinct_moduli: u64,

    /// Wall time
    pub duration: Duration,
}

/// Per-record progress snapshot for the reporter callback
#[derive(Debug, Clone, Copy)]
pub struct ExtractProgress {
    pub records: u64,
    pub keys_seen: u64,
    pub distinct_moduli: u64,
    pub elapsed: Duration,
}

/// Run the extract pipeline: discovery -> records -> key parse ->
/// dedup -> hex modulus list.
///
/// `shutdown` is polled between records; when it fires the partial
/// run is abandoned and `SweepError::Interrupted` is returned without
/// touching the output path.
pub fn run_extract<F>(
    config: &ExtractConfig,
    shutdown: Arc<AtomicBool>,
    mut progress: F,
) -> Result<ExtractStats>
where
    F: FnMut(ExtractProgress),
{
    let start = Instant::now();
    let chunks = discover_chunks(&config.keys_dir)?;
    info!(
        dir = %config.keys_dir.display(),
        chunks = chunks.len(),
        "Starting extract"
    );

    let mut stats = ExtractStats {
        chunks: chunks.len() as u64,
        ..Default::default()
    };
    let mut dedup = Deduplicator::new();
    let mut moduli: Vec<Modulus> = Vec::new();

    for record in JournalReader::new(chunks) {
        if shutdown.load(Ordering::SeqCst) {
            warn!(records = stats.records, "Extract interrupted");
            return Err(SweepError::Interrupted);
        }

        let record = record?;
        stats.records += 1;

        for line in &record.keys {
            stats.keys_seen += 1;
            match parse_public_key_line(line) {
                KeyOutcome::Rsa(key) => {
                    stats.rsa_keys += 1;
                    if dedup.check_and_insert(&key.modulus) {
                        moduli.push(key.modulus);
                    }
                }
                KeyOutcome::NotRsa => stats.not_rsa += 1,
                KeyOutcome::Malformed => stats.malformed += 1,
            }
        }

        if stats.records % 4096 == 0 {
            progress(ExtractProgress {
                records: stats.records,
                keys_seen: stats.keys_seen,
                distinct_moduli: moduli.len() as u64,
                elapsed: start.elapsed(),
            });
        }
    }

    stats.distinct_moduli = moduli.len() as u64;
    write_hex_list(&config.output_path, &moduli).map_err(SweepError::ModulusList)?;

    stats.duration = start.elapsed();
    info!(
        records = stats.records,
        rsa_keys = stats.rsa_keys,
        distinct = stats.distinct_moduli,
        malformed = stats.malformed,
        duration_secs = stats.duration.as_secs(),
        "Extract completed"
    );
    Ok(stats)
}

/// Corpus statistics from a `stats` run
#[derive(Debug, Default)]
pub struct CorpusStats {
    /// Journal chunks consumed
    pub chunks: u64,

    /// Records read
    pub records: u64,

    /// Key lines seen
    pub keys_seen: u64,

    /// Keys by algorithm token
    pub by_algorithm: BTreeMap<String, u64>,

    /// Parsed RSA moduli by bit length
    pub rsa_by_bits: BTreeMap<u64, u64>,

    /// Keys skipped as malformed
    pub malformed: u64,

    /// Wall time
    pub duration: Duration,
}

/// Scan a journal directory and tally corpus statistics.
pub fn run_stats(keys_dir: &std::path::Path) -> Result<CorpusStats> {
    let start = Instant::now();
    let chunks = discover_chunks(keys_dir)?;

    let mut stats = CorpusStats {
        chunks: chunks.len() as u64,
        ..Default::default()
    };

    for record in JournalReader::new(chunks) {
        let record = record?;
        stats.records += 1;

        for line in &record.keys {
            stats.keys_seen += 1;
            if let Some(algorithm) = algorithm_of(line) {
                *stats.by_algorithm.entry(algorithm.to_string()).or_default() += 1;
            }
            match parse_public_key_line(line) {
                KeyOutcome::Rsa(key) => {
                    *stats.rsa_by_bits.entry(key.modulus.bits()).or_default() += 1;
                }
                KeyOutcome::Malformed => stats.malformed += 1,
                KeyOutcome::NotRsa => {}
            }
        }
    }

    stats.duration = start.elapsed();
    Ok(stats)
}
