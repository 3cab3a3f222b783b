//! The dataset: tagged metrics persisted on top of a [`KvEngine`].
//!
//! # Key layout
//!
//! ```text
//! metrics:names                 set    unique names written and not removed
//! metrics:<unique>:range        zset   score = timestamp, member = BE timestamp bytes
//! metrics:<unique>:values       hash   field = BE timestamp bytes, value = BE f64 bits
//! tags:<tag>:<hex(value)>       set    unique names carrying tag=value
//! ```
//!
//! Array-valued tags are indexed once per element.
//!
//! # Example
//!
//! ```rust
//! use mobius::{Dataset, Metric};
//!
//! # fn main() -> mobius::Result<()> {
//! let dataset = Dataset::in_memory();
//!
//! let mut metric = Metric::new("cpu.usage:host=web1");
//! metric.push(1_000, 0.25);
//! metric.push(2_000, 0.5);
//! dataset.write(&metric)?;
//!
//! assert_eq!(dataset.get_names("cpu.*:host=web1")?, vec!["cpu.usage:host=web1"]);
//!
//! let metrics = dataset.range(None, None, &["cpu.**"])?;
//! assert_eq!(metrics[0].points().len(), 2);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::DatasetConfig;
use crate::engine::{EngineResult, FileEngine, KvEngine, ScoredMember};
use crate::error::{DatasetError, EngineError, MobiusError, Result, WriteStage};
use crate::metric::Metric;
use crate::pattern::NamePattern;
use crate::point::{Timestamp, now};
use crate::tag::TagValue;

/// Set of every unique name.
const NAMES_KEY: &str = "metrics:names";

/// Pattern used when a trim is given no patterns.
const MATCH_ALL: &str = "**";

fn range_key(name: &str) -> String {
    format!("metrics:{name}:range")
}

fn values_key(name: &str) -> String {
    format!("metrics:{name}:values")
}

fn tag_key(tag: &str, value: &TagValue) -> String {
    let rendered = value.to_string();
    let mut key = String::with_capacity(tag.len() + rendered.len() * 2 + 6);
    key.push_str("tags:");
    key.push_str(tag);
    key.push(':');
    for byte in rendered.bytes() {
        let _ = write!(key, "{byte:02x}");
    }
    key
}

fn write_error(stage: WriteStage, name: &str) -> impl FnOnce(EngineError) -> MobiusError + '_ {
    move |source| {
        DatasetError::Write {
            stage,
            name: name.to_string(),
            source,
        }
        .into()
    }
}

/// A store of tagged time series.
///
/// Every method takes `&self` and the dataset is `Send + Sync`, so a single
/// handle can be shared between threads behind an `Arc`. Individual engine
/// mutations are serialized; a [`Dataset::write`] as a whole is not atomic.
///
/// Dropping the dataset closes it.
#[derive(Debug)]
pub struct Dataset {
    engine: Box<dyn KvEngine>,
    config: DatasetConfig,
}

impl Dataset {
    /// Opens (or creates) a writable dataset in `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Engine`] if the directory cannot be created or
    /// the stored files are damaged.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(DatasetConfig::new(path.as_ref()))
    }

    /// Opens an existing dataset without permission to modify it.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Engine`] if the directory does not exist or the
    /// stored files are damaged.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(DatasetConfig::new(path.as_ref()).read_only(true))
    }

    /// Opens a dataset with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Config`] for an invalid configuration, or
    /// [`MobiusError::Engine`] if the engine cannot be opened.
    pub fn open_with(config: DatasetConfig) -> Result<Self> {
        config.validate()?;
        let engine = FileEngine::open(&config.path, config.read_only, config.sync_writes)?;
        info!(
            path = %config.path.display(),
            read_only = config.read_only,
            "dataset opened"
        );
        Ok(Self {
            engine: Box::new(engine),
            config,
        })
    }

    /// Creates a dataset that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            engine: Box::new(FileEngine::in_memory()),
            config: DatasetConfig::default(),
        }
    }

    /// Wraps an existing engine. The configuration's path is informational.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Config`] if the name syntax is invalid.
    pub fn with_engine(engine: Box<dyn KvEngine>, config: DatasetConfig) -> Result<Self> {
        config.syntax.validate()?;
        Ok(Self { engine, config })
    }

    /// Returns the dataset directory, or `None` for an in-memory dataset.
    pub fn path(&self) -> Option<&Path> {
        let path = self.config.path.as_path();
        (!path.as_os_str().is_empty()).then_some(path)
    }

    /// Returns the configuration the dataset was opened with.
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Returns the unique names matching `pattern`, sorted.
    ///
    /// The glob applies to the base name and must match all of it; a
    /// pattern equal to the base name always matches. An optional tag
    /// clause follows the delimiter: every `key=v1|v2` item must hold, and
    /// an item holds if the name carries any of its values.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Pattern`] for an invalid pattern.
    pub fn get_names(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = NamePattern::parse(pattern, &self.config.syntax)?;

        let mut names = Vec::new();
        'names: for member in self.engine.set_members(NAMES_KEY)? {
            let Ok(name) = String::from_utf8(member) else {
                warn!("skipping non UTF-8 entry in the name index");
                continue;
            };

            let (base, _) = self.config.syntax.parse(&name);
            if !pattern.glob().is_match(&base) {
                continue;
            }

            for filter in pattern.filters() {
                let mut found = false;
                for value in &filter.values {
                    if self.is_tag_value_in_name(&name, &filter.key, value)? {
                        found = true;
                        break;
                    }
                }
                if !found {
                    continue 'names;
                }
            }

            names.push(name);
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Returns true if `name` was written with `tag` set to `value` (or with
    /// an array containing it).
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Engine`] if the engine is closed.
    pub fn is_tag_value_in_name(&self, name: &str, tag: &str, value: &TagValue) -> Result<bool> {
        Ok(self
            .engine
            .set_is_member(&tag_key(tag, value), name.as_bytes())?)
    }

    fn expand(&self, patterns: &[&str]) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for pattern in patterns {
            names.extend(self.get_names(pattern)?);
        }
        Ok(names)
    }

    fn expand_or_all(&self, patterns: &[&str]) -> Result<BTreeSet<String>> {
        if patterns.is_empty() {
            self.expand(&[MATCH_ALL])
        } else {
            self.expand(patterns)
        }
    }

    /// Returns every series matching `patterns` with its points between
    /// `start` and `end` inclusive.
    ///
    /// A `None` start reads from the beginning of time and a `None` end
    /// reads up to now. Each matching series appears once, sorted by unique
    /// name, even if it has no points in the range.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Pattern`] for an invalid pattern, or
    /// [`MobiusError::Dataset`] if a stored value is malformed.
    pub fn range(
        &self,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
        patterns: &[&str],
    ) -> Result<Vec<Metric>> {
        let start = start.unwrap_or(0);
        let end = end.unwrap_or_else(now);
        self.read_series(start, end, None, false, patterns)
    }

    /// Returns each matching series with only its oldest point.
    ///
    /// Searches the same window as `range(None, None, ..)`: points dated
    /// after now are not considered.
    ///
    /// # Errors
    ///
    /// See [`Dataset::range`].
    pub fn oldest(&self, patterns: &[&str]) -> Result<Vec<Metric>> {
        self.read_series(0, now(), Some(1), false, patterns)
    }

    /// Returns each matching series with only its newest point that is not
    /// dated after now.
    ///
    /// # Errors
    ///
    /// See [`Dataset::range`].
    pub fn newest(&self, patterns: &[&str]) -> Result<Vec<Metric>> {
        self.read_series(0, now(), Some(1), true, patterns)
    }

    fn read_series(
        &self,
        min: Timestamp,
        max: Timestamp,
        limit: Option<usize>,
        reverse: bool,
        patterns: &[&str],
    ) -> Result<Vec<Metric>> {
        let mut metrics = Vec::new();
        for name in self.expand(patterns)? {
            let mut metric = Metric::parse(&name, &self.config.syntax);
            let values = values_key(&name);

            let mut members =
                self.engine
                    .zset_range_by_score(&range_key(&name), min, max, limit, reverse)?;
            if reverse {
                members.reverse();
            }

            for ScoredMember { score, member } in members {
                let Some(raw) = self.engine.hash_get(&values, &member)? else {
                    warn!(key = %values, timestamp = score, "value missing for indexed timestamp");
                    continue;
                };
                let bytes = <[u8; 8]>::try_from(raw.as_slice()).map_err(|_| {
                    DatasetError::InvalidValue {
                        name: name.clone(),
                        timestamp: score,
                        len: raw.len(),
                    }
                })?;
                metric.push(score, f64::from_bits(u64::from_be_bytes(bytes)));
            }

            metrics.push(metric);
        }
        Ok(metrics)
    }

    /// Persists a metric's points and indexes its name and tags.
    ///
    /// Stages run in order: name index, tag index, values, then (when the
    /// metric has a maximum size) a trim of that series to its newest
    /// `max_size` points. Writing a timestamp that already exists replaces
    /// its value. Zero values are skipped unless `store_zeroes` is set.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::UnrenderableName`] before any stage runs if
    /// the name or a tag would not survive re-parsing of the unique name.
    /// Otherwise returns [`DatasetError::Write`] naming the failed stage.
    /// Earlier stages are not rolled back.
    pub fn write(&self, metric: &Metric) -> Result<()> {
        let name = metric.unique_name_with(&self.config.syntax);
        if !self.config.syntax.round_trips(metric.name(), metric.tags()) {
            return Err(DatasetError::UnrenderableName { name }.into());
        }

        self.engine
            .set_add(NAMES_KEY, name.as_bytes())
            .map_err(write_error(WriteStage::NameIndex, &name))?;

        for (tag, value) in metric.tags() {
            for scalar in value.scalars() {
                self.engine
                    .set_add(&tag_key(tag, scalar), name.as_bytes())
                    .map_err(write_error(WriteStage::TagIndex, &name))?;
            }
        }

        let values = values_key(&name);
        let range = range_key(&name);
        let mut written = 0usize;
        for point in metric.points().iter() {
            if point.value == 0.0 && !self.config.store_zeroes {
                continue;
            }
            let member = point.timestamp.to_be_bytes();
            self.engine
                .hash_set(&values, &member, &point.value.to_bits().to_be_bytes())
                .map_err(write_error(WriteStage::Value, &name))?;
            self.engine
                .zset_add(&range, point.timestamp, &member)
                .map_err(write_error(WriteStage::Value, &name))?;
            written += 1;
        }

        if let Some(max_size) = metric.max_size() {
            self.trim_series_to_count(&name, max_size, false)
                .map_err(write_error(WriteStage::Trim, &name))?;
        }

        debug!(name = %name, points = written, "metric written");
        Ok(())
    }

    /// Deletes every series matching `patterns` along with its index
    /// entries. Returns the number of series whose points were deleted.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Pattern`] for an invalid pattern, or
    /// [`MobiusError::Engine`] if a deletion fails.
    pub fn remove(&self, patterns: &[&str]) -> Result<u64> {
        let mut removed = 0;
        for name in self.expand(patterns)? {
            self.engine.set_remove(NAMES_KEY, name.as_bytes())?;

            let (_, tags) = self.config.syntax.parse(&name);
            for (tag, value) in &tags {
                for scalar in value.scalars() {
                    self.engine.set_remove(&tag_key(tag, scalar), name.as_bytes())?;
                }
            }

            let cleared =
                self.engine.zset_clear(&range_key(&name))? + self.engine.hash_clear(&values_key(&name))?;
            if cleared > 0 {
                removed += 1;
            }
            debug!(name = %name, "series removed");
        }
        Ok(removed)
    }

    /// Deletes every point strictly older than `mark`. An empty pattern list
    /// applies to every series. Returns the number of points deleted.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Pattern`] for an invalid pattern, or
    /// [`MobiusError::Engine`] if a deletion fails.
    pub fn trim_before(&self, mark: Timestamp, patterns: &[&str]) -> Result<u64> {
        let Some(max) = mark.checked_sub(1) else {
            return Ok(0);
        };
        self.trim_range(0, max, patterns)
    }

    /// Deletes every point at or after `mark`. An empty pattern list applies
    /// to every series. Returns the number of points deleted.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Pattern`] for an invalid pattern, or
    /// [`MobiusError::Engine`] if a deletion fails.
    pub fn trim_after(&self, mark: Timestamp, patterns: &[&str]) -> Result<u64> {
        self.trim_range(mark, u64::MAX, patterns)
    }

    fn trim_range(&self, min: Timestamp, max: Timestamp, patterns: &[&str]) -> Result<u64> {
        let mut removed = 0;
        for name in self.expand_or_all(patterns)? {
            let values = values_key(&name);
            let doomed = self
                .engine
                .zset_remove_range_by_score(&range_key(&name), min, max)?;
            for entry in &doomed {
                self.engine.hash_delete(&values, &entry.member)?;
            }
            removed += doomed.len() as u64;
        }
        debug!(min, max, removed, "trimmed by time");
        Ok(removed)
    }

    /// Keeps only the newest `size` points of each matching series. A size
    /// of zero does nothing. Returns the number of points deleted.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Pattern`] for an invalid pattern, or
    /// [`MobiusError::Engine`] if a deletion fails.
    pub fn trim_oldest_to_count(&self, size: usize, patterns: &[&str]) -> Result<u64> {
        self.trim_to_count(size, false, patterns)
    }

    /// Keeps only the oldest `size` points of each matching series. A size
    /// of zero does nothing. Returns the number of points deleted.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Pattern`] for an invalid pattern, or
    /// [`MobiusError::Engine`] if a deletion fails.
    pub fn trim_newest_to_count(&self, size: usize, patterns: &[&str]) -> Result<u64> {
        self.trim_to_count(size, true, patterns)
    }

    fn trim_to_count(&self, size: usize, drop_newest: bool, patterns: &[&str]) -> Result<u64> {
        if size == 0 {
            return Ok(0);
        }
        let mut removed = 0;
        for name in self.expand_or_all(patterns)? {
            removed += self.trim_series_to_count(&name, size, drop_newest)?;
        }
        Ok(removed)
    }

    /// Trims one series down to `size` points, dropping from the old end or,
    /// with `drop_newest`, the new end.
    fn trim_series_to_count(&self, name: &str, size: usize, drop_newest: bool) -> EngineResult<u64> {
        let range = range_key(name);
        let count = self.engine.zset_count(&range, 0, u64::MAX)?;
        let Some(excess) = usize::try_from(count).ok().and_then(|c| c.checked_sub(size)) else {
            return Ok(0);
        };
        if excess == 0 {
            return Ok(0);
        }

        let values = values_key(name);
        let doomed = self.engine.zset_range_by_rank(&range, excess, drop_newest)?;
        for entry in &doomed {
            self.engine.zset_remove(&range, &entry.member)?;
            self.engine.hash_delete(&values, &entry.member)?;
        }
        debug!(name, size, removed = doomed.len(), "trimmed to count");
        Ok(doomed.len() as u64)
    }

    /// Counts the points stored for every series matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Pattern`] for an invalid pattern.
    pub fn num_points(&self, pattern: &str) -> Result<u64> {
        self.count_points(pattern, 0, u64::MAX)
    }

    /// Counts the points between `start` and `end` inclusive for every
    /// series matching `pattern`, with the same open bounds as
    /// [`Dataset::range`].
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Pattern`] for an invalid pattern.
    pub fn num_points_range(
        &self,
        pattern: &str,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<u64> {
        self.count_points(pattern, start.unwrap_or(0), end.unwrap_or_else(now))
    }

    fn count_points(&self, pattern: &str, min: Timestamp, max: Timestamp) -> Result<u64> {
        let mut total = 0;
        for name in self.get_names(pattern)? {
            total += self.engine.zset_count(&range_key(&name), min, max)?;
        }
        Ok(total)
    }

    /// Compacts the engine's on-disk state.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Engine`] if the dataset is read-only or the
    /// snapshot cannot be written.
    pub fn compact(&self) -> Result<()> {
        Ok(self.engine.compact()?)
    }

    /// Writes a full copy of the dataset to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Engine`] if the dump cannot be written.
    pub fn backup<W: Write>(&self, mut sink: W) -> Result<()> {
        self.engine.dump(&mut sink)?;
        info!(path = ?self.path(), "dataset backed up");
        Ok(())
    }

    /// Replaces the entire dataset with a backup.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Engine`] if the backup is damaged (the
    /// dataset is left unchanged) or cannot be persisted.
    pub fn restore<R: Read>(&self, mut source: R) -> Result<()> {
        self.engine.load_dump(&mut source)?;
        info!(path = ?self.path(), "dataset restored");
        Ok(())
    }

    /// Flushes and closes the dataset. Later calls are no-ops; every other
    /// operation fails afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`MobiusError::Engine`] if pending writes cannot be flushed.
    pub fn close(&self) -> Result<()> {
        Ok(self.engine.close()?)
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        if let Err(e) = self.engine.close() {
            warn!(error = %e, "failed to close dataset");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::NameSyntax;

    fn metric(raw: &str, points: &[(u64, f64)]) -> Metric {
        let mut m = Metric::new(raw);
        for &(ts, value) in points {
            m.push(ts, value);
        }
        m
    }

    #[test]
    fn test_tag_key_hex_encodes_rendered_value() {
        assert_eq!(tag_key("host", &TagValue::from("ab")), "tags:host:6162");
        assert_eq!(tag_key("core", &TagValue::Int(0)), "tags:core:30");
    }

    #[test]
    fn test_write_indexes_name_tags_and_values() {
        let ds = Dataset::in_memory();
        ds.write(&metric("cpu.usage:host=web1,zone=a|b", &[(10, 1.5), (20, 2.5)]))
            .unwrap();

        let name = "cpu.usage:host=web1,zone=a|b";
        assert!(ds.engine.set_is_member(NAMES_KEY, name.as_bytes()).unwrap());
        assert!(ds.is_tag_value_in_name(name, "host", &"web1".into()).unwrap());
        assert!(ds.is_tag_value_in_name(name, "zone", &"a".into()).unwrap());
        assert!(ds.is_tag_value_in_name(name, "zone", &"b".into()).unwrap());
        assert!(!ds.is_tag_value_in_name(name, "zone", &"c".into()).unwrap());

        let raw = ds
            .engine
            .hash_get(&values_key(name), &20u64.to_be_bytes())
            .unwrap()
            .unwrap();
        assert_eq!(raw, 2.5f64.to_bits().to_be_bytes().to_vec());
        assert_eq!(ds.num_points("cpu.usage").unwrap(), 2);
    }

    #[test]
    fn test_store_zeroes_disabled_skips_zero_values() {
        let engine = Box::new(FileEngine::in_memory());
        let ds = Dataset::with_engine(engine, DatasetConfig::default().store_zeroes(false)).unwrap();
        ds.write(&metric("hits", &[(1, 0.0), (2, 3.0), (3, 0.0)])).unwrap();
        assert_eq!(ds.num_points("hits").unwrap(), 1);
        // the name is indexed even if no point survives
        ds.write(&metric("idle", &[(1, 0.0)])).unwrap();
        assert_eq!(ds.get_names("idle").unwrap(), vec!["idle"]);
    }

    #[test]
    fn test_write_with_max_size_trims_oldest() {
        let ds = Dataset::in_memory();
        let m = metric("queue.depth", &[(1, 1.0), (2, 2.0), (3, 3.0)]);
        ds.write(&m).unwrap();

        let mut bounded = Metric::new("queue.depth").with_max_size(2);
        bounded.push(4, 4.0);
        ds.write(&bounded).unwrap();

        let series = ds.range(None, None, &["queue.depth"]).unwrap();
        assert_eq!(series[0].points().timestamps(), vec![3, 4]);
    }

    #[test]
    fn test_write_rejects_tags_that_do_not_parse_back() {
        let ds = Dataset::in_memory();
        for (key, value) in [("path", "/a,b"), ("alt", "a|b"), ("set", "{a}"), ("blank", "")] {
            let mut m = metric("http.hits", &[(1, 1.0)]);
            m.set_tag(key, value);
            assert!(
                matches!(
                    ds.write(&m),
                    Err(MobiusError::Dataset(DatasetError::UnrenderableName { .. }))
                ),
                "{key}={value}"
            );
        }
        let mut m = metric("http.hits", &[(1, 1.0)]);
        m.set_tag("host,port", "web1");
        assert!(ds.write(&m).is_err());

        // nothing was indexed, so nothing can be left behind by remove
        assert!(ds.get_names("**").unwrap().is_empty());
        assert!(ds.engine.set_members(&tag_key("path", &"/a,b".into())).unwrap().is_empty());

        let mut m = metric("http.hits", &[(1, 1.0)]);
        m.set_tag("path", "/a");
        m.set_tag("ratio", 1.0);
        ds.write(&m).unwrap();
        let name = "http.hits:path=/a,ratio=1";
        assert!(ds.is_tag_value_in_name(name, "ratio", &TagValue::Int(1)).unwrap());

        assert_eq!(ds.remove(&["http.hits"]).unwrap(), 1);
        assert!(!ds.is_tag_value_in_name(name, "path", &"/a".into()).unwrap());
        assert!(!ds.is_tag_value_in_name(name, "ratio", &TagValue::Int(1)).unwrap());
    }

    #[test]
    fn test_missing_value_is_skipped() {
        let ds = Dataset::in_memory();
        ds.write(&metric("lossy", &[(1, 1.0), (2, 2.0)])).unwrap();
        ds.engine
            .hash_delete(&values_key("lossy"), &1u64.to_be_bytes())
            .unwrap();

        let series = ds.range(None, None, &["lossy"]).unwrap();
        assert_eq!(series[0].points().timestamps(), vec![2]);
    }

    #[test]
    fn test_malformed_value_is_an_error() {
        let ds = Dataset::in_memory();
        ds.write(&metric("bad", &[(1, 1.0)])).unwrap();
        ds.engine
            .hash_set(&values_key("bad"), &1u64.to_be_bytes(), b"short")
            .unwrap();

        assert!(matches!(
            ds.range(None, None, &["bad"]),
            Err(MobiusError::Dataset(DatasetError::InvalidValue { len: 5, .. }))
        ));
    }

    #[test]
    fn test_write_stage_reported_on_failure() {
        let ds = Dataset::in_memory();
        ds.close().unwrap();
        let err = ds.write(&metric("cpu", &[(1, 1.0)])).unwrap_err();
        assert!(matches!(
            err,
            MobiusError::Dataset(DatasetError::Write {
                stage: WriteStage::NameIndex,
                source: EngineError::Closed,
                ..
            })
        ));
    }

    #[test]
    fn test_legacy_syntax_round_trip() {
        let engine = Box::new(FileEngine::in_memory());
        let config = DatasetConfig::default().syntax(NameSyntax::LEGACY);
        let ds = Dataset::with_engine(engine, config).unwrap();

        let mut m = Metric::parse("cpu.usage,host=web1,core=2", &NameSyntax::LEGACY);
        m.push(5, 1.0);
        ds.write(&m).unwrap();

        assert_eq!(ds.get_names("cpu.*,core=2").unwrap(), vec!["cpu.usage,core=2,host=web1"]);
        let series = ds.range(None, None, &["cpu.usage"]).unwrap();
        assert_eq!(series[0].name(), "cpu.usage");
        assert_eq!(series[0].tag("core"), Some(&TagValue::Int(2)));
    }

    #[test]
    fn test_path_is_none_in_memory() {
        assert!(Dataset::in_memory().path().is_none());
    }
}
