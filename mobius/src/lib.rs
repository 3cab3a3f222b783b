//! # mobius
//!
//! Embedded tagged time-series storage engine.
//!
//! mobius persists named, tagged numeric observations and answers range,
//! retention and aggregation queries against them. It is meant to be linked
//! into a service that records its own statistics or ingests metrics from
//! elsewhere.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Metrics are identified by a base name plus an unordered tag set,
//!   canonicalized into a deterministic unique name
//! - Name discovery by glob (`*`, `**`, `?`, `{a,b}`) and tag filters
//! - Four retention operations: trim before/after a time, trim to a count
//!   from either end
//! - Time bucketing, grouping merges and a library of statistical reducers
//! - Durable through a checksummed journal and snapshot; backup and restore
//!   as a single stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mobius::{Dataset, Metric, Reducer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open or create a dataset
//! let dataset = Dataset::open("./my_metrics")?;
//!
//! // Tags ride along in the name
//! let mut cpu = Metric::new("cpu.usage:host=web1,core=0");
//! cpu.push(1_640_000_000_000_000_000, 85.5);
//! cpu.push(1_640_000_001_000_000_000, 87.25);
//! dataset.write(&cpu)?;
//!
//! // Query every core of web1 and reduce
//! for metric in dataset.range(None, None, &["cpu.*:host=web1"])? {
//!     let summary = metric.summarize(&[Reducer::Mean, Reducer::Maximum]);
//!     println!("{metric}: mean={} max={}", summary[0], summary[1]);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Dataset`] — Top-level handle; opens a directory, writes and queries series
//! - [`Metric`] — Name, tags and points; owns unique-name rendering
//! - [`Reducer`] — Statistics over a slice of values, addressable by name
//! - [`Recorder`] — Counters and gauges written to a shared dataset
//!
//! ## Modules
//!
//! - [`dataset`] — Dataset lifecycle, writes, queries and trims
//! - [`metric`] — Metric identity and name syntax
//! - [`tag`] — Tag values and type inference
//! - [`point`] — Points and point sets
//! - [`pattern`] — Name globs and tag filters
//! - [`reducer`] — Reducer registry and statistics
//! - [`consolidate`] — Time bucketing
//! - [`merge`] — Grouping series by name or tag
//! - [`engine`] — The key-value engine underneath the dataset
//! - [`config`] — Dataset configuration
//! - [`recorder`] — Statistics emission
//! - [`error`] — Error types

pub mod config;
pub mod consolidate;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod merge;
pub mod metric;
pub mod pattern;
pub mod point;
pub mod recorder;
pub mod reducer;
pub mod tag;

// Re-export primary API types at crate root for convenience.
pub use config::DatasetConfig;
pub use consolidate::{consolidate_metric, make_time_buckets};
pub use dataset::Dataset;
pub use engine::{FileEngine, KvEngine};
pub use error::{
    ConfigError, DatasetError, EngineError, MobiusError, PatternError, Result, WriteStage,
};
pub use merge::{GroupBy, merge_metrics};
pub use metric::{Metric, NameSyntax};
pub use pattern::{Glob, NamePattern, TagFilter};
pub use point::{Point, PointSet, Timestamp};
pub use recorder::Recorder;
pub use reducer::{Reducer, UNDEFINED, reducer_name, summarize_metric};
pub use tag::TagValue;
