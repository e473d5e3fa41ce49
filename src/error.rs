//! Error types for keysweep
//!
//! This module defines the error hierarchy covering:
//! - Journal discovery and record decoding errors
//! - Modulus list serialization errors
//! - Configuration and CLI errors
//! - Worker protocol errors during the audit
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - A bad key is noise and is skipped; a bad journal record means
//!   corruption and fails the run
//! - Preserve error chains for debugging

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the keysweep application
#[derive(Error, Debug)]
pub enum SweepError {
    /// Journal discovery / decoding errors
    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    /// Modulus list read/write errors
    #[error("Modulus list error: {0}")]
    ModulusList(#[from] ModulusListError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interrupted by signal
    #[error("Operation interrupted by signal")]
    Interrupted,
}

/// Journal discovery and record decoding errors
#[derive(Error, Debug)]
pub enum JournalError {
    /// Journal directory missing or not a directory
    #[error("Journal directory not found: '{path}'")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to list the journal directory
    #[error("Failed to read journal directory '{path}': {reason}")]
    ListFailed { path: PathBuf, reason: String },

    /// Failed to open a journal chunk
    #[error("Failed to open journal chunk '{path}': {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// Read or decompression failure mid-stream
    #[error("Failed to read journal chunk '{chunk}': {reason}")]
    ReadFailed { chunk: String, reason: String },

    /// A record line failed JSON decoding. The journal is corrupt;
    /// this fails the whole run.
    #[error("Corrupt record in '{chunk}' line {line}: {reason}")]
    BadRecord {
        chunk: String,
        line: u64,
        reason: String,
    },
}

/// Modulus list serialization errors
#[derive(Error, Debug)]
pub enum ModulusListError {
    /// Failed to open or read the list
    #[error("Failed to read modulus list '{path}': {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    /// Failed to write the list
    #[error("Failed to write modulus list '{path}': {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    /// A line in the hex form was not a valid hexadecimal integer
    #[error("Invalid hex modulus at line {line}")]
    BadHex { line: u64 },

    /// Packed binary form ended mid-entry
    #[error("Truncated packed modulus list (entry {index})")]
    Truncated { index: usize },

    /// The list contains no moduli
    #[error("Modulus list is empty")]
    Empty,
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Worker count must be a power of two
    #[error("Invalid worker count {count}: must be a power of two between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Worker count must divide the (padded) modulus count
    #[error("Worker count {workers} does not divide modulus count {moduli}")]
    WorkerCountMismatch { workers: usize, moduli: usize },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },
}

/// Worker protocol errors during the audit
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked")]
    Panicked { id: usize },

    /// Worker initialization failed
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Worker received a message it did not expect in the current phase
    #[error("Worker {id} protocol violation: expected {expected}")]
    Protocol { id: usize, expected: &'static str },

    /// A channel to a worker closed before the protocol completed
    #[error("Channel to worker {id} closed unexpectedly")]
    ChannelClosed { id: usize },
}

/// Result type alias for SweepError
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for JournalError
pub type JournalResult<T> = std::result::Result<T, JournalError>;

/// Result type alias for WorkerError
pub type WorkerResult<T> = std::result::Result<T, WorkerError>;
