//! Configuration types for keysweep
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Validated runtime configurations for the extract and audit phases

use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// SSH public key corpus auditor
#[derive(Parser, Debug, Clone)]
#[command(
    name = "keysweep",
    version,
    about = "Audit harvested SSH public keys for RSA moduli with shared prime factors",
    long_about = "Extracts RSA moduli from journals of harvested OpenSSH public keys and runs\n\
                  a batch-GCD scan (Bernstein product/remainder trees) that finds every modulus\n\
                  sharing a non-trivial factor with another one in the corpus.",
    after_help = "EXAMPLES:\n    \
        keysweep extract ./journals moduli.txt\n    \
        keysweep audit moduli.txt > matches.csv\n    \
        keysweep audit moduli.txt -w 8 -q\n    \
        keysweep stats ./journals"
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose output (show per-chunk progress and warnings)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Subcommands
#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract unique RSA moduli from a directory of key journals
    Extract {
        /// Directory containing keys-NNNN.json[.xz] journal chunks
        #[arg(value_name = "KEYS_DIR")]
        keys_dir: PathBuf,

        /// Output path for the modulus list (hex form, one per line)
        #[arg(value_name = "OUT_LIST")]
        output: PathBuf,
    },

    /// Run the batch-GCD audit over a modulus list
    Audit {
        /// Modulus list (hex or packed binary form)
        #[arg(value_name = "MODULUS_LIST")]
        modulus_list: PathBuf,

        /// Number of GCD workers (power of two; defaults to CPU count
        /// rounded down to a power of two)
        #[arg(short = 'w', long, value_name = "NUM")]
        workers: Option<usize>,
    },

    /// Print corpus statistics for a directory of key journals
    Stats {
        /// Directory containing keys-NNNN.json[.xz] journal chunks
        #[arg(value_name = "KEYS_DIR")]
        keys_dir: PathBuf,
    },
}

/// Validated configuration for the extract phase
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Journal chunk directory
    pub keys_dir: PathBuf,

    /// Output modulus list path
    pub output_path: PathBuf,

    /// Show progress indicator
    pub show_progress: bool,
}

impl ExtractConfig {
    /// Create and validate configuration for `extract`
    pub fn new(keys_dir: PathBuf, output: PathBuf, quiet: bool) -> Result<Self, ConfigError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::InvalidOutputPath {
                    path: output.clone(),
                    reason: format!("Parent directory '{}' does not exist", parent.display()),
                });
            }
        }

        Ok(Self {
            keys_dir,
            output_path: output,
            show_progress: !quiet,
        })
    }
}

/// Validated configuration for the audit phase
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Modulus list path
    pub modulus_path: PathBuf,

    /// Explicit worker count, if given on the command line
    pub workers: Option<usize>,

    /// Show progress indicator
    pub show_progress: bool,
}

impl AuditConfig {
    /// Create and validate configuration for `audit`
    ///
    /// An explicit worker count must be a power of two. Divisibility
    /// against the modulus count is checked once the list is loaded.
    pub fn new(
        modulus_list: PathBuf,
        workers: Option<usize>,
        quiet: bool,
    ) -> Result<Self, ConfigError> {
        if let Some(w) = workers {
            if w == 0 || w > MAX_WORKERS || !w.is_power_of_two() {
                return Err(ConfigError::InvalidWorkerCount {
                    count: w,
                    max: MAX_WORKERS,
                });
            }
        }

        Ok(Self {
            modulus_path: modulus_list,
            workers,
            show_progress: !quiet,
        })
    }

    /// Resolve the worker count against the padded modulus count.
    ///
    /// Explicit counts are validated strictly: k must not exceed n.
    /// The default is the CPU count rounded down to a power of two,
    /// clamped to n. The padded n is itself a power of two, so any
    /// power-of-two k ≤ n divides it evenly.
    pub fn resolve_workers(&self, padded_len: usize) -> Result<usize, ConfigError> {
        debug_assert!(padded_len.is_power_of_two());

        match self.workers {
            Some(w) => {
                if w > padded_len || padded_len % w != 0 {
                    return Err(ConfigError::WorkerCountMismatch {
                        workers: w,
                        moduli: padded_len,
                    });
                }
                Ok(w)
            }
            None => Ok(default_workers().min(padded_len)),
        }
    }
}

/// Default GCD worker count: CPU count rounded down to a power of two
fn default_workers() -> usize {
    let cpus = num_cpus::get().max(1);
    // prev_power_of_two
    if cpus.is_power_of_two() {
        cpus
    } else {
        cpus.next_power_of_two() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_config_rejects_non_power_of_two() {
        assert!(AuditConfig::new(PathBuf::from("m.txt"), Some(3), false).is_err());
        assert!(AuditConfig::new(PathBuf::from("m.txt"), Some(0), false).is_err());
        assert!(AuditConfig::new(PathBuf::from("m.txt"), Some(4), false).is_ok());
    }

    #[test]
    fn test_resolve_workers_explicit() {
        let config = AuditConfig::new(PathBuf::from("m.txt"), Some(4), false).unwrap();
        assert_eq!(config.resolve_workers(8).unwrap(), 4);

        // k > n is rejected
        let config = AuditConfig::new(PathBuf::from("m.txt"), Some(16), false).unwrap();
        assert!(config.resolve_workers(8).is_err());
    }

    #[test]
    fn test_resolve_workers_default_clamped() {
        let config = AuditConfig::new(PathBuf::from("m.txt"), None, false).unwrap();
        let resolved = config.resolve_workers(2).unwrap();
        assert!(resolved <= 2);
        assert!(resolved.is_power_of_two());
    }

    #[test]
    fn test_extract_config_output_parent() {
        let err = ExtractConfig::new(
            PathBuf::from("keys"),
            PathBuf::from("/definitely/not/a/dir/out.txt"),
            true,
        );
        assert!(err.is_err());
    }
}
