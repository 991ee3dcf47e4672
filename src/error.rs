//! Error types for data generation.
//!
//! Every failure surfaces as one of four kinds: configuration, cache,
//! generation or output. All of them are fatal to a run.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = DriftError> = std::result::Result<T, E>;

/// Top-level error for a generation run.
#[derive(Error, Debug)]
pub enum DriftError {
    /// Invalid column or plan configuration, detected before generation.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A day cache could not be created, written, read or found.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// A column's sampling logic hit an unsatisfiable precondition.
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// A day could not be consolidated or serialized.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

impl DriftError {
    pub fn config(msg: impl Into<String>) -> Self {
        DriftError::Configuration(msg.into())
    }

    /// The message without the error-kind prefix.
    pub fn detail(&self) -> &dyn std::fmt::Display {
        match self {
            DriftError::Configuration(msg) => msg,
            DriftError::Cache(e) => e,
            DriftError::Generation(e) => e,
            DriftError::Output(e) => e,
        }
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache not found for column '{column}' day {day}: {}", path.display())]
    Missing {
        column: String,
        day: usize,
        path: PathBuf,
    },

    #[error("Cache store failure at {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: duckdb::Error,
    },

    #[error("Cache IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cache pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No word source configured for string column '{0}'")]
    MissingWordSource(String),

    #[error("Failed to open word list {}: {source}", path.display())]
    WordList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Word list {} looks corrupt: no line boundary within {limit} bytes", path.display())]
    CorruptWordList { path: PathBuf, limit: usize },

    #[error("Column '{column}' failed: {reason}")]
    ColumnFailed { column: String, reason: String },

    #[error("Generation cancelled after an earlier column failure")]
    Cancelled,

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Unsupported output format: {0}. Supported: csv, json, jsonl")]
    UnsupportedFormat(String),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output for day {day}: {}", .source.detail())]
    Day {
        day: usize,
        #[source]
        source: Box<DriftError>,
    },
}
