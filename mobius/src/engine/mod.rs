//! The embedded key-value engine underneath a [`crate::Dataset`].
//!
//! The dataset only needs three kinds of values, each addressed by a string
//! key:
//!
//! - **sets** of byte strings (name index, tag-value index)
//! - **hashes** mapping byte-string fields to byte-string values (point values)
//! - **sorted sets** of byte-string members ordered by a `u64` score (point
//!   timestamps)
//!
//! [`KvEngine`] is that contract. [`FileEngine`] implements it with an
//! in-memory keyspace made durable by a checksummed journal and snapshot.
//!
//! # Example
//!
//! ```rust
//! use mobius::engine::{FileEngine, KvEngine};
//!
//! # fn main() -> Result<(), mobius::EngineError> {
//! let engine = FileEngine::in_memory();
//!
//! engine.zset_add("series", 20, b"b")?;
//! engine.zset_add("series", 10, b"a")?;
//!
//! let members = engine.zset_range_by_score("series", 0, u64::MAX, None, false)?;
//! assert_eq!(members[0].member, b"a");
//! assert_eq!(engine.zset_count("series", 0, 15)?, 1);
//! # Ok(())
//! # }
//! ```

mod file;
mod journal;
mod keyspace;
mod snapshot;

pub use file::FileEngine;

use std::io::{Read, Write};

use crate::error::EngineError;

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// A sorted-set member and its score.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScoredMember {
    /// The score the set is ordered by.
    pub score: u64,
    /// The member bytes.
    pub member: Vec<u8>,
}

/// Storage primitive the dataset is built on.
///
/// Every method takes `&self`; implementations serialize mutations
/// internally. Each individual call is atomic, but nothing groups several
/// calls into a transaction.
///
/// All methods fail with [`EngineError::Closed`] after [`KvEngine::close`],
/// and mutations fail with [`EngineError::ReadOnly`] on a read-only engine.
pub trait KvEngine: Send + Sync + std::fmt::Debug {
    /// Adds `member` to the set at `key`. Returns true if it was not present.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the mutation cannot be persisted.
    fn set_add(&self, key: &str, member: &[u8]) -> EngineResult<bool>;

    /// Removes `member` from the set at `key`. Returns true if it was present.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the mutation cannot be persisted.
    fn set_remove(&self, key: &str, member: &[u8]) -> EngineResult<bool>;

    /// Returns every member of the set at `key`, in byte order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] after close.
    fn set_members(&self, key: &str) -> EngineResult<Vec<Vec<u8>>>;

    /// Returns true if `member` is in the set at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] after close.
    fn set_is_member(&self, key: &str, member: &[u8]) -> EngineResult<bool>;

    /// Returns the value of `field` in the hash at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] after close.
    fn hash_get(&self, key: &str, field: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Sets `field` in the hash at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the mutation cannot be persisted.
    fn hash_set(&self, key: &str, field: &[u8], value: &[u8]) -> EngineResult<()>;

    /// Deletes `field` from the hash at `key`. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the mutation cannot be persisted.
    fn hash_delete(&self, key: &str, field: &[u8]) -> EngineResult<bool>;

    /// Deletes the whole hash at `key`. Returns the number of fields removed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the mutation cannot be persisted.
    fn hash_clear(&self, key: &str) -> EngineResult<u64>;

    /// Adds `member` with `score`, moving it if already present. Returns true
    /// if the member is new.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the mutation cannot be persisted.
    fn zset_add(&self, key: &str, score: u64, member: &[u8]) -> EngineResult<bool>;

    /// Removes `member`. Returns true if it was present.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the mutation cannot be persisted.
    fn zset_remove(&self, key: &str, member: &[u8]) -> EngineResult<bool>;

    /// Returns members with `min <= score <= max`, ascending, or descending
    /// when `reverse` is set, stopping after `limit` members if given.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] after close.
    fn zset_range_by_score(
        &self,
        key: &str,
        min: u64,
        max: u64,
        limit: Option<usize>,
        reverse: bool,
    ) -> EngineResult<Vec<ScoredMember>>;

    /// Returns the `count` lowest-scored members, or the `count` highest when
    /// `reverse` is set. Order follows the direction of travel.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] after close.
    fn zset_range_by_rank(
        &self,
        key: &str,
        count: usize,
        reverse: bool,
    ) -> EngineResult<Vec<ScoredMember>>;

    /// Removes every member with `min <= score <= max` and returns them.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the mutation cannot be persisted.
    fn zset_remove_range_by_score(
        &self,
        key: &str,
        min: u64,
        max: u64,
    ) -> EngineResult<Vec<ScoredMember>>;

    /// Counts members with `min <= score <= max`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] after close.
    fn zset_count(&self, key: &str, min: u64, max: u64) -> EngineResult<u64>;

    /// Deletes the whole sorted set at `key`. Returns the number of members
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the mutation cannot be persisted.
    fn zset_clear(&self, key: &str) -> EngineResult<u64>;

    /// Folds accumulated history into a compact on-disk form.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the compacted state cannot be written.
    fn compact(&self) -> EngineResult<()>;

    /// Writes a self-contained copy of every key to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if encoding or writing fails.
    fn dump(&self, sink: &mut dyn Write) -> EngineResult<()>;

    /// Replaces every key with the contents of a [`KvEngine::dump`] stream.
    ///
    /// The stream is fully validated before anything is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Corrupted`] for an invalid stream, or any
    /// error from persisting the new state.
    fn load_dump(&self, source: &mut dyn Read) -> EngineResult<()>;

    /// Flushes and releases the engine. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if pending writes cannot be flushed.
    fn close(&self) -> EngineResult<()>;
}
