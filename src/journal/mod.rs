//! Journal ingest: chunk discovery and record streaming
//!
//! Journals are append-only files of harvested user/key records, one
//! JSON object per LF-terminated line, optionally xz-compressed. The
//! harvester writes them; this module only reads.

pub mod discovery;
pub mod reader;

pub use discovery::{discover_chunks, JournalChunk};
pub use reader::{JournalReader, Record, RecordReader, User};
