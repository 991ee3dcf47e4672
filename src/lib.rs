// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod cache;
pub mod column;
pub mod config;
pub mod error;
pub mod generator;
pub mod output;
pub mod plan;
pub mod words;

pub use config::{ColumnConfig, DataType, Distribution, GeneratorConfig, Transition};
pub use error::{DriftError, Result};
pub use generator::{GenerationMetrics, GenerationReport, Generator};
pub use output::OutputFormat;
