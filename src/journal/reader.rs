//! Line-delimited JSON record streaming
//!
//! One record per LF-terminated line. Empty lines produce nothing
//! (journals may start with a leading LF). A partial trailing line
//! without a terminating LF is emitted at end-of-stream if non-empty.
//! A line that fails JSON decoding fails the whole run: the journal
//! is corrupt and its statistics can no longer be trusted.
//!
//! `JournalReader` concatenates the record streams of a sequence of
//! chunks, restarting the line reader across file boundaries.

use crate::error::{JournalError, JournalResult};
use crate::journal::discovery::JournalChunk;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::BufRead;
use tracing::debug;

/// A harvested user profile, as stored in the journal
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct User {
    /// Numeric user id, unique across all chunks
    pub id: u64,

    /// Login name
    pub login: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub company: Option<String>,

    #[serde(default)]
    pub bio: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default, rename = "websiteUrl")]
    pub website_url: Option<String>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// One journal record: a user and their published key lines
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Record {
    pub user: User,

    /// authorized_keys lines, full line including the algorithm prefix
    pub keys: Vec<String>,
}

/// Streams records out of one chunk's byte stream
pub struct RecordReader<R: BufRead> {
    inner: R,

    /// Chunk name for diagnostics
    chunk: String,

    /// Current line number (1-based, counting empty lines)
    line: u64,

    /// Reusable line buffer
    buf: Vec<u8>,
}

impl<R: BufRead> RecordReader<R> {
    /// Wrap a byte stream. `chunk` names the source in errors.
    pub fn new(inner: R, chunk: impl Into<String>) -> Self {
        Self {
            inner,
            chunk: chunk.into(),
            line: 0,
            buf: Vec::new(),
        }
    }

    fn decode(&self, bytes: &[u8]) -> JournalResult<Record> {
        serde_json::from_slice(bytes).map_err(|e| JournalError::BadRecord {
            chunk: self.chunk.clone(),
            line: self.line,
            reason: e.to_string(),
        })
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = JournalResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            self.line += 1;

            match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let line = match self.buf.last() {
                        Some(b'\n') => &self.buf[..self.buf.len() - 1],
                        _ => &self.buf[..],
                    };
                    if line.is_empty() {
                        continue;
                    }
                    return Some(self.decode(line));
                }
                Err(e) => {
                    return Some(Err(JournalError::ReadFailed {
                        chunk: self.chunk.clone(),
                        reason: e.to_string(),
                    }))
                }
            }
        }
    }
}

/// Concatenates record streams across a sorted list of journal chunks
pub struct JournalReader {
    chunks: std::vec::IntoIter<JournalChunk>,
    current: Option<RecordReader<Box<dyn BufRead>>>,
    failed: bool,
}

impl JournalReader {
    /// Create a reader over discovered chunks (consumed in order)
    pub fn new(chunks: Vec<JournalChunk>) -> Self {
        Self {
            chunks: chunks.into_iter(),
            current: None,
            failed: false,
        }
    }

    fn advance(&mut self) -> JournalResult<bool> {
        match self.chunks.next() {
            Some(chunk) => {
                debug!(chunk = %chunk.name(), "Opening journal chunk");
                let stream = chunk.open()?;
                self.current = Some(RecordReader::new(stream, chunk.name()));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Iterator for JournalReader {
    type Item = JournalResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some(reader) = self.current.as_mut() {
                match reader.next() {
                    Some(Ok(record)) => return Some(Ok(record)),
                    Some(Err(e)) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }

            match self.advance() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record_json(id: u64, login: &str, keys: &[&str]) -> String {
        let keys: Vec<String> = keys.iter().map(|k| format!("\"{}\"", k)).collect();
        format!(
            "{{\"user\":{{\"id\":{},\"login\":\"{}\",\"createdAt\":\"2019-03-01T10:00:00Z\",\"updatedAt\":\"2019-04-01T10:00:00Z\"}},\"keys\":[{}]}}",
            id,
            login,
            keys.join(",")
        )
    }

    fn read_all(input: &str) -> Vec<Record> {
        RecordReader::new(Cursor::new(input.as_bytes()), "test")
            .collect::<JournalResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_basic_records() {
        let input = format!(
            "{}\n{}\n",
            record_json(1, "alice", &["ssh-rsa AAAA"]),
            record_json(2, "bob", &[])
        );
        let records = read_all(&input);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user.login, "alice");
        assert_eq!(records[0].keys, vec!["ssh-rsa AAAA"]);
        assert_eq!(records[1].user.id, 2);
        assert!(records[1].keys.is_empty());
    }

    #[test]
    fn test_leading_lf_and_empty_lines() {
        let input = format!("\n{}\n\n{}\n", record_json(1, "a", &[]), record_json(2, "b", &[]));
        let records = read_all(&input);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_partial_trailing_line_emitted() {
        // No terminating LF on the last record
        let input = format!("{}\n{}", record_json(1, "a", &[]), record_json(2, "b", &[]));
        let records = read_all(&input);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].user.id, 2);
    }

    #[test]
    fn test_corrupt_record_is_fatal() {
        let input = format!("{}\n{{not json}}\n", record_json(1, "a", &[]));
        let results: Vec<_> = RecordReader::new(Cursor::new(input.as_bytes()), "keys-0001.json")
            .collect();
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert!(matches!(err, JournalError::BadRecord { line: 2, .. }));
    }

    #[test]
    fn test_missing_required_field_is_fatal() {
        // Record with no user.id
        let input = "{\"user\":{\"login\":\"x\",\"createdAt\":\"2019-03-01T10:00:00Z\",\"updatedAt\":\"2019-03-01T10:00:00Z\"},\"keys\":[]}\n";
        let results: Vec<_> =
            RecordReader::new(Cursor::new(input.as_bytes()), "test").collect();
        assert!(results[0].is_err());
    }

    #[test]
    fn test_optional_profile_fields() {
        let input = "{\"user\":{\"id\":7,\"login\":\"x\",\"name\":\"X\",\"websiteUrl\":\"https://x.dev\",\"createdAt\":\"2019-03-01T10:00:00Z\",\"updatedAt\":\"2019-03-01T10:00:00Z\"},\"keys\":[]}\n";
        let records = read_all(input);
        assert_eq!(records[0].user.name.as_deref(), Some("X"));
        assert_eq!(records[0].user.website_url.as_deref(), Some("https://x.dev"));
        assert_eq!(records[0].user.email, None);
    }
}
