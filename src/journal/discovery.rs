//! Journal chunk discovery
//!
//! Journal chunks live in a single directory and are named
//! `keys-NNNN.json` or `keys-NNNN.json.xz` with a zero-padded 4-digit
//! chunk id. Discovery lists the directory, keeps names matching that
//! shape, and returns them sorted ascending by id. Anything else in
//! the directory is ignored.

use crate::error::{JournalError, JournalResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;
use xz2::read::XzDecoder;

/// Chunk file name prefix
const CHUNK_PREFIX: &str = "keys-";

/// One discovered journal chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalChunk {
    /// Chunk id parsed from the file name
    pub id: u32,

    /// Full path to the chunk file
    pub path: PathBuf,

    /// Whether the chunk is xz-compressed
    pub compressed: bool,
}

impl JournalChunk {
    /// The file name, for diagnostics
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Open the chunk as a buffered byte stream, decompressing
    /// transparently when the chunk is `.xz`.
    pub fn open(&self) -> JournalResult<Box<dyn BufRead>> {
        let file = File::open(&self.path).map_err(|e| JournalError::OpenFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if self.compressed {
            Ok(Box::new(BufReader::new(XzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Parse a chunk id out of a file name of the form
/// `keys-NNNN.json[.xz]`. Returns `(id, compressed)` or None when the
/// name has a different shape.
fn parse_chunk_name(name: &str) -> Option<(u32, bool)> {
    let rest = name.strip_prefix(CHUNK_PREFIX)?;

    let (digits, compressed) = if let Some(d) = rest.strip_suffix(".json") {
        (d, false)
    } else if let Some(d) = rest.strip_suffix(".json.xz") {
        (d, true)
    } else {
        return None;
    };

    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse::<u32>().ok().map(|id| (id, compressed))
}

/// Enumerate journal chunks in a directory, sorted ascending by id.
pub fn discover_chunks(dir: &Path) -> JournalResult<Vec<JournalChunk>> {
    if !dir.is_dir() {
        return Err(JournalError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| JournalError::ListFailed {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut chunks = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| JournalError::ListFailed {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if let Some((id, compressed)) = parse_chunk_name(&name) {
            chunks.push(JournalChunk {
                id,
                path: entry.path(),
                compressed,
            });
        } else {
            debug!(name = %name, "Ignoring non-chunk file");
        }
    }

    chunks.sort_by_key(|c| c.id);

    debug!(dir = %dir.display(), chunks = chunks.len(), "Discovered journal chunks");
    Ok(chunks)
}
