//! Journal-and-snapshot implementation of [`KvEngine`].

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use super::journal::Journal;
use super::keyspace::{JournalOp, Keyspace, KeyspaceImage};
use super::{EngineResult, KvEngine, ScoredMember, journal, snapshot};
use crate::error::EngineError;

/// A [`KvEngine`] holding every key in memory.
///
/// When backed by a directory, the engine keeps two files there:
///
/// - `snapshot.bin`: the keyspace as of the last [`KvEngine::compact`]
/// - `journal.log`: every mutation since that snapshot
///
/// Opening loads the snapshot and replays the journal. Each mutation is
/// appended to the journal before it is applied in memory, so the journal
/// order is the apply order.
#[derive(Debug)]
pub struct FileEngine {
    dir: Option<PathBuf>,
    read_only: bool,
    keyspace: RwLock<Keyspace>,
    /// `None` for in-memory and read-only engines. Held across journal
    /// append and apply so the two happen in the same order.
    journal: Mutex<Option<Journal>>,
    closed: AtomicBool,
}

impl FileEngine {
    /// Opens the engine stored in `dir`.
    ///
    /// A writable engine creates `dir` if needed and truncates a torn journal
    /// tail. A read-only engine requires `dir` to exist and never modifies
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DirectoryAccess`] if the directory cannot be
    /// created or read, and [`EngineError::Corrupted`] if the snapshot or the
    /// journal header is damaged.
    pub fn open<P: AsRef<Path>>(dir: P, read_only: bool, sync_writes: bool) -> EngineResult<Self> {
        let dir = dir.as_ref();
        let access_error = |source: std::io::Error| EngineError::DirectoryAccess {
            path: dir.display().to_string(),
            source,
        };

        if read_only {
            let meta = std::fs::metadata(dir).map_err(access_error)?;
            if !meta.is_dir() {
                return Err(access_error(std::io::Error::new(
                    std::io::ErrorKind::NotADirectory,
                    "not a directory",
                )));
            }
        } else {
            std::fs::create_dir_all(dir).map_err(access_error)?;
        }

        let mut keyspace = snapshot::load(dir)?
            .map(Keyspace::from_image)
            .unwrap_or_default();

        let (journal, ops) = if read_only {
            (None, journal::replay(&dir.join(journal::JOURNAL_FILE))?.ops)
        } else {
            let (journal, ops) = Journal::open(dir, sync_writes)?;
            (Some(journal), ops)
        };

        for op in &ops {
            keyspace.apply(op);
        }

        info!(
            path = %dir.display(),
            read_only,
            replayed = ops.len(),
            "engine opened"
        );

        Ok(Self {
            dir: Some(dir.to_path_buf()),
            read_only,
            keyspace: RwLock::new(keyspace),
            journal: Mutex::new(journal),
            closed: AtomicBool::new(false),
        })
    }

    /// Creates an engine that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            read_only: false,
            keyspace: RwLock::new(Keyspace::default()),
            journal: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the backing directory, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Returns true if mutations are rejected.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> EngineResult<()> {
        self.ensure_open()?;
        if self.read_only {
            return Err(EngineError::ReadOnly);
        }
        Ok(())
    }

    /// Journals `op`, then applies it.
    fn mutate(&self, op: &JournalOp) -> EngineResult<u64> {
        self.ensure_writable()?;
        let mut journal = self.journal.lock();
        if let Some(journal) = journal.as_mut() {
            journal.append(op)?;
        }
        Ok(self.keyspace.write().apply(op))
    }

    fn read<T>(&self, f: impl FnOnce(&Keyspace) -> T) -> EngineResult<T> {
        self.ensure_open()?;
        Ok(f(&self.keyspace.read()))
    }

    /// Installs `image` as the snapshot and empties the journal. The caller
    /// holds the journal lock.
    fn checkpoint(
        &self,
        journal: &mut Option<Journal>,
        image: &KeyspaceImage,
    ) -> EngineResult<()> {
        let (Some(dir), Some(journal)) = (self.dir.as_deref(), journal.as_mut()) else {
            return Ok(());
        };
        snapshot::install(dir, image)?;
        journal.reset()
    }
}

impl KvEngine for FileEngine {
    fn set_add(&self, key: &str, member: &[u8]) -> EngineResult<bool> {
        let op = JournalOp::SAdd {
            key: key.to_string(),
            member: member.to_vec(),
        };
        Ok(self.mutate(&op)? > 0)
    }

    fn set_remove(&self, key: &str, member: &[u8]) -> EngineResult<bool> {
        let op = JournalOp::SRem {
            key: key.to_string(),
            member: member.to_vec(),
        };
        Ok(self.mutate(&op)? > 0)
    }

    fn set_members(&self, key: &str) -> EngineResult<Vec<Vec<u8>>> {
        self.read(|ks| ks.set_members(key))
    }

    fn set_is_member(&self, key: &str, member: &[u8]) -> EngineResult<bool> {
        self.read(|ks| ks.set_is_member(key, member))
    }

    fn hash_get(&self, key: &str, field: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        self.read(|ks| ks.hash_get(key, field))
    }

    fn hash_set(&self, key: &str, field: &[u8], value: &[u8]) -> EngineResult<()> {
        let op = JournalOp::HSet {
            key: key.to_string(),
            field: field.to_vec(),
            value: value.to_vec(),
        };
        self.mutate(&op).map(|_| ())
    }

    fn hash_delete(&self, key: &str, field: &[u8]) -> EngineResult<bool> {
        let op = JournalOp::HDel {
            key: key.to_string(),
            field: field.to_vec(),
        };
        Ok(self.mutate(&op)? > 0)
    }

    fn hash_clear(&self, key: &str) -> EngineResult<u64> {
        self.mutate(&JournalOp::HClear {
            key: key.to_string(),
        })
    }

    fn zset_add(&self, key: &str, score: u64, member: &[u8]) -> EngineResult<bool> {
        let op = JournalOp::ZAdd {
            key: key.to_string(),
            score,
            member: member.to_vec(),
        };
        Ok(self.mutate(&op)? > 0)
    }

    fn zset_remove(&self, key: &str, member: &[u8]) -> EngineResult<bool> {
        let op = JournalOp::ZRem {
            key: key.to_string(),
            member: member.to_vec(),
        };
        Ok(self.mutate(&op)? > 0)
    }

    fn zset_range_by_score(
        &self,
        key: &str,
        min: u64,
        max: u64,
        limit: Option<usize>,
        reverse: bool,
    ) -> EngineResult<Vec<ScoredMember>> {
        self.read(|ks| ks.zset_range_by_score(key, min, max, limit, reverse))
    }

    fn zset_range_by_rank(
        &self,
        key: &str,
        count: usize,
        reverse: bool,
    ) -> EngineResult<Vec<ScoredMember>> {
        self.read(|ks| ks.zset_range_by_rank(key, count, reverse))
    }

    fn zset_remove_range_by_score(
        &self,
        key: &str,
        min: u64,
        max: u64,
    ) -> EngineResult<Vec<ScoredMember>> {
        self.ensure_writable()?;
        let op = JournalOp::ZRemRangeByScore {
            key: key.to_string(),
            min,
            max,
        };

        let mut journal = self.journal.lock();
        let doomed = self
            .keyspace
            .read()
            .zset_range_by_score(key, min, max, None, false);
        if doomed.is_empty() {
            return Ok(doomed);
        }
        if let Some(journal) = journal.as_mut() {
            journal.append(&op)?;
        }
        self.keyspace.write().apply(&op);
        Ok(doomed)
    }

    fn zset_count(&self, key: &str, min: u64, max: u64) -> EngineResult<u64> {
        self.read(|ks| ks.zset_count(key, min, max))
    }

    fn zset_clear(&self, key: &str) -> EngineResult<u64> {
        self.mutate(&JournalOp::ZClear {
            key: key.to_string(),
        })
    }

    fn compact(&self) -> EngineResult<()> {
        self.ensure_writable()?;
        let mut journal = self.journal.lock();
        let image = self.keyspace.read().to_image();
        self.checkpoint(&mut journal, &image)?;
        info!(path = ?self.dir, "engine compacted");
        Ok(())
    }

    fn dump(&self, sink: &mut dyn Write) -> EngineResult<()> {
        self.ensure_open()?;
        let image = self.keyspace.read().to_image();
        snapshot::write_image(sink, &image, "dump")?;
        debug!("engine dumped");
        Ok(())
    }

    fn load_dump(&self, source: &mut dyn Read) -> EngineResult<()> {
        self.ensure_writable()?;
        let image = snapshot::read_image(source, "dump")?;

        // on disk first: a failed install leaves memory and disk as they were
        let mut journal = self.journal.lock();
        self.checkpoint(&mut journal, &image)?;
        *self.keyspace.write() = Keyspace::from_image(image);
        info!(path = ?self.dir, "engine restored from dump");
        Ok(())
    }

    fn close(&self) -> EngineResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(journal) = self.journal.lock().as_mut() {
            journal.sync()?;
        }
        info!(path = ?self.dir, "engine closed");
        Ok(())
    }
}
