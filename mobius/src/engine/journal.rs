//! Append-only journal of keyspace mutations.
//!
//! File layout:
//!
//! ```text
//! +----------+---------+------------------------------------------+
//! | MBJRNL01 | version | record | record | ...                    |
//! | 8 bytes  | u32 LE  | len u32 LE | crc32 u32 LE | bincode(op)  |
//! +----------+---------+------------------------------------------+
//! ```
//!
//! A record that is cut short or fails its checksum ends the journal; on a
//! writable open everything from that record on is truncated away. Appends
//! are written at the end of the last good record, so a failed append never
//! strands the records that follow it.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher as Crc32;
use tracing::{debug, warn};

use super::EngineResult;
use super::keyspace::JournalOp;
use crate::error::EngineError;

const JOURNAL_MAGIC: &[u8; 8] = b"MBJRNL01";
const JOURNAL_VERSION: u32 = 1;
const HEADER_LEN: usize = 12;
const RECORD_HEADER_LEN: usize = 8;

/// Name of the journal file inside an engine directory.
pub(crate) const JOURNAL_FILE: &str = "journal.log";

fn io_error(path: &Path, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Result of scanning a journal file.
#[derive(Debug, Default)]
pub(crate) struct Replay {
    pub(crate) ops: Vec<JournalOp>,
    /// Byte offset just past the last intact record.
    pub(crate) valid_len: usize,
    /// True if bytes after `valid_len` were discarded.
    pub(crate) torn: bool,
}

/// Reads every intact record from `path`.
///
/// A missing or empty file replays as nothing.
///
/// # Errors
///
/// Returns [`EngineError::Corrupted`] if the header is not a journal header.
pub(crate) fn replay(path: &Path) -> EngineResult<Replay> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Replay::default()),
        Err(e) => return Err(io_error(path, e)),
    };
    if bytes.is_empty() {
        return Ok(Replay::default());
    }
    if bytes.len() < HEADER_LEN || &bytes[..8] != JOURNAL_MAGIC {
        return Err(EngineError::Corrupted {
            what: "journal",
            reason: format!("bad header in {}", path.display()),
        });
    }
    let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if version != JOURNAL_VERSION {
        return Err(EngineError::Corrupted {
            what: "journal",
            reason: format!("unsupported version {version} in {}", path.display()),
        });
    }

    let mut replay = Replay {
        valid_len: HEADER_LEN,
        ..Replay::default()
    };
    let mut offset = HEADER_LEN;
    while offset < bytes.len() {
        match decode_record(&bytes[offset..]) {
            Some((op, consumed)) => {
                replay.ops.push(op);
                offset += consumed;
                replay.valid_len = offset;
            }
            None => {
                warn!(
                    path = %path.display(),
                    offset,
                    discarded = bytes.len() - offset,
                    "journal tail is torn or corrupt, discarding"
                );
                replay.torn = true;
                break;
            }
        }
    }

    debug!(path = %path.display(), records = replay.ops.len(), "journal replayed");
    Ok(replay)
}

/// Decodes one record, returning the op and the bytes it occupied.
fn decode_record(buf: &[u8]) -> Option<(JournalOp, usize)> {
    let header = buf.get(..RECORD_HEADER_LEN)?;
    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    let payload = buf.get(RECORD_HEADER_LEN..RECORD_HEADER_LEN + len)?;
    let mut hasher = Crc32::new();
    hasher.update(payload);
    if hasher.finalize() != expected_crc {
        return None;
    }

    let op = bincode::deserialize(payload).ok()?;
    Some((op, RECORD_HEADER_LEN + len))
}

fn encode_record(op: &JournalOp) -> EngineResult<Vec<u8>> {
    let payload = bincode::serialize(op)?;
    let len = u32::try_from(payload.len()).map_err(|_| EngineError::Corrupted {
        what: "journal",
        reason: format!("record of {} bytes exceeds the record size limit", payload.len()),
    })?;

    let mut hasher = Crc32::new();
    hasher.update(&payload);

    let mut record = Vec::with_capacity(RECORD_HEADER_LEN + payload.len());
    record.extend_from_slice(&len.to_le_bytes());
    record.extend_from_slice(&hasher.finalize().to_le_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

/// Writable handle on a journal file.
#[derive(Debug)]
pub(crate) struct Journal {
    path: PathBuf,
    file: File,
    sync: bool,
    /// Offset just past the last record known to be intact.
    len: u64,
}

impl Journal {
    /// Opens (or creates) the journal in `dir` and returns it with the ops
    /// it already holds. A torn tail is truncated.
    pub(crate) fn open(dir: &Path, sync: bool) -> EngineResult<(Self, Vec<JournalOp>)> {
        let path = dir.join(JOURNAL_FILE);
        let replay = replay(&path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;

        let on_disk = file.metadata().map_err(|e| io_error(&path, e))?.len();
        let len = if on_disk == 0 {
            write_header(&mut file).map_err(|e| io_error(&path, e))?;
            HEADER_LEN as u64
        } else {
            if replay.torn {
                file.set_len(replay.valid_len as u64)
                    .map_err(|e| io_error(&path, e))?;
                file.sync_data().map_err(|e| io_error(&path, e))?;
            }
            replay.valid_len as u64
        };

        Ok((
            Self {
                path,
                file,
                sync,
                len,
            },
            replay.ops,
        ))
    }

    /// Appends one op.
    ///
    /// On failure the file is cut back to its previous length so the next
    /// append lands right after the last intact record.
    pub(crate) fn append(&mut self, op: &JournalOp) -> EngineResult<()> {
        let record = encode_record(op)?;
        match self.write_at_end(&record) {
            Ok(()) => {
                self.len += record.len() as u64;
                Ok(())
            }
            Err(e) => {
                if let Err(truncate) = self.file.set_len(self.len) {
                    warn!(
                        path = %self.path.display(),
                        error = %truncate,
                        "failed to cut back a partial journal record"
                    );
                }
                Err(io_error(&self.path, e))
            }
        }
    }

    fn write_at_end(&mut self, record: &[u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(self.len))?;
        self.file.write_all(record)?;
        if self.sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Discards every record, keeping the header.
    pub(crate) fn reset(&mut self) -> EngineResult<()> {
        self.file
            .set_len(HEADER_LEN as u64)
            .map_err(|e| io_error(&self.path, e))?;
        self.len = HEADER_LEN as u64;
        self.file.sync_data().map_err(|e| io_error(&self.path, e))
    }

    /// Flushes everything written so far to disk.
    pub(crate) fn sync(&mut self) -> EngineResult<()> {
        self.file.flush().map_err(|e| io_error(&self.path, e))?;
        self.file.sync_data().map_err(|e| io_error(&self.path, e))
    }
}

fn write_header(file: &mut File) -> std::io::Result<()> {
    file.write_all(JOURNAL_MAGIC)?;
    file.write_all(&JOURNAL_VERSION.to_le_bytes())?;
    file.flush()?;
    file.sync_data()
}
