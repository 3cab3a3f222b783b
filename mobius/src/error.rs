//! Error types for the mobius time-series storage engine.

use thiserror::Error;

/// The main error type for all mobius operations.
///
/// Reducers never produce errors; an undefined statistic is reported as
/// [`crate::reducer::UNDEFINED`] instead. Metric name parsing never fails
/// either: a malformed tag clause is treated as "no tags".
#[derive(Error, Debug)]
pub enum MobiusError {
    /// Error raised by the embedded key-value engine.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// A name pattern or tag filter could not be compiled.
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// A dataset operation failed part-way through.
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Configuration is invalid or could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by a [`crate::engine::KvEngine`] implementation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine directory could not be created or accessed.
    #[error("failed to access engine directory '{path}': {source}")]
    DirectoryAccess {
        /// The path that could not be accessed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing an engine file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The file being read or written.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A snapshot, journal, or dump stream failed validation.
    #[error("corrupted {what}: {reason}")]
    Corrupted {
        /// Which artifact was corrupted (snapshot, journal, dump).
        what: &'static str,
        /// Description of the problem.
        reason: String,
    },

    /// Failed to encode or decode an engine record.
    #[error("failed to encode engine record: {0}")]
    Codec(#[from] bincode::Error),

    /// A mutation was attempted on an engine opened read-only.
    #[error("engine is read-only")]
    ReadOnly,

    /// The engine handle has been closed.
    #[error("engine is closed")]
    Closed,
}

/// Errors raised while compiling a name pattern or tag filter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The glob portion of the pattern is empty.
    #[error("pattern is empty")]
    Empty,

    /// A `{` has no matching `}` or vice versa.
    #[error("unbalanced braces in pattern '{pattern}'")]
    UnbalancedBraces {
        /// The offending pattern.
        pattern: String,
    },

    /// Brace groups cannot be nested.
    #[error("nested brace groups are not supported in pattern '{pattern}'")]
    NestedBraces {
        /// The offending pattern.
        pattern: String,
    },

    /// A tag filter item is not of the form `key=value[|value...]`.
    #[error("invalid tag filter '{item}': {reason}")]
    InvalidTagFilter {
        /// The filter item that failed to parse.
        item: String,
        /// Why the item is invalid.
        reason: String,
    },
}

/// Stage of a [`crate::Dataset::write`] that failed.
///
/// Stages run in order. A failure leaves the earlier stages applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// Inserting the unique name into the name set.
    NameIndex,
    /// Inserting the unique name into a tag-value set.
    TagIndex,
    /// Upserting a point into the value store.
    Value,
    /// Trimming the series to the metric's maximum size.
    Trim,
}

impl std::fmt::Display for WriteStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            Self::NameIndex => "name index",
            Self::TagIndex => "tag index",
            Self::Value => "value write",
            Self::Trim => "trim",
        };
        f.write_str(stage)
    }
}

/// Errors raised by [`crate::Dataset`] operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A write failed at the given stage.
    ///
    /// The dataset does not roll back earlier stages, so the name and tag
    /// indices may reference a series whose points were not stored.
    #[error("{stage} failed for '{name}': {source}")]
    Write {
        /// Which stage failed.
        stage: WriteStage,
        /// Unique name of the metric being written.
        name: String,
        /// The underlying engine error.
        #[source]
        source: EngineError,
    },

    /// A metric's name or tags would not survive rendering and re-parsing.
    ///
    /// Keys and values must not contain the delimiter, the separator, `=`,
    /// `|` or braces, and values must not be empty.
    #[error("metric '{name}' does not parse back to the same name and tags")]
    UnrenderableName {
        /// Unique name as rendered.
        name: String,
    },

    /// A stored value could not be decoded.
    #[error("invalid stored value for '{name}' at {timestamp}: expected 8 bytes, found {len}")]
    InvalidValue {
        /// Unique name of the series.
        name: String,
        /// Timestamp of the bad value.
        timestamp: u64,
        /// Number of bytes found.
        len: usize,
    },
}

/// Errors raised while validating or loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The name syntax uses a reserved character.
    #[error("invalid name syntax: {reason}")]
    InvalidSyntax {
        /// Description of the problem.
        reason: String,
    },

    /// The dataset path is empty.
    #[error("dataset path must not be empty")]
    EmptyPath,

    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// The config file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// The config file path.
        path: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for `Result<T, MobiusError>`.
pub type Result<T> = std::result::Result<T, MobiusError>;
