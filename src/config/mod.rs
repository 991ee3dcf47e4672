//! Generator configuration.
//!
//! A [`GeneratorConfig`] is what users write (YAML or JSON) or get from the
//! built-in defaults. [`GeneratorConfig::validate`] resolves it into an
//! immutable [`GenerationPlan`] plus validated [`ColumnSpec`]s; nothing is
//! generated from an unvalidated config.

mod column;

pub use column::{
    ColumnConfig, ColumnSpec, DataType, Distribution, Transition, TransitionSet,
};

use crate::error::{DriftError, Result};
use crate::output::OutputFormat;
use ahash::AHashSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Word lists tried, in order, when none is configured.
pub const DEFAULT_WORD_LISTS: &[&str] = &[
    "/usr/share/dict/american-english",
    "/usr/share/dict/words",
];

/// Default number of values generated and cached per batch
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// What happens to day caches once their day has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheRetention {
    /// Leave cache files in place for inspection
    Keep,
    /// Remove each day's caches after its output file is written
    Delete,
}

/// Complete generator configuration as loaded from a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of days of data to generate
    pub num_days: usize,
    /// Approximate target rows per day
    pub approx_rows_per_day: u64,
    /// Directory receiving `<day>.<ext>` files
    pub output_dir: PathBuf,
    /// Output format: csv, json or jsonl
    pub output_format: String,
    /// Values generated and cached per batch
    pub cache_batch_size: usize,
    /// Parallel column workers (null = all CPUs)
    pub max_workers: Option<usize>,
    /// +/- fractional variation in rows per day
    pub row_variation: f64,
    /// A day becomes anomalous when a draw exceeds this probability
    pub random_day_reduction_probability: f64,
    /// Row-count multiplier applied to anomalous days
    pub random_day_reduction_factor: f64,
    /// Delete day caches once written
    pub cleanup_cache: bool,
    /// Directory holding day caches (null = platform cache dir)
    pub cache_dir: Option<PathBuf>,
    /// Newline-delimited word list backing string columns
    pub word_list: Option<PathBuf>,
    /// Distinct values available to category columns
    pub category_pool_size: usize,
    /// RNG seed (null = random)
    pub seed: Option<u64>,
    /// Column definitions
    pub columns: Vec<ColumnConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_days: 10,
            approx_rows_per_day: 500,
            output_dir: PathBuf::from("data"),
            output_format: "csv".to_string(),
            cache_batch_size: DEFAULT_BATCH_SIZE,
            max_workers: None,
            row_variation: 0.2,
            random_day_reduction_probability: 0.8,
            random_day_reduction_factor: 0.1,
            cleanup_cache: true,
            cache_dir: None,
            word_list: None,
            category_pool_size: 10,
            seed: None,
            columns: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// Defaults plus the built-in column set.
    pub fn with_default_columns() -> Self {
        Self {
            columns: default_columns(),
            ..Default::default()
        }
    }

    /// Load configuration from a YAML or JSON file, chosen by extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DriftError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let parsed = match ext.as_str() {
            "yaml" | "yml" => serde_yaml_ng::from_str(&content).map_err(|e| e.to_string()),
            "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            _ => {
                return Err(DriftError::config(format!(
                    "Unsupported config file format: {}",
                    path.display()
                )))
            }
        };

        parsed.map_err(|e| {
            DriftError::config(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Check every value and resolve defaults into a run plan.
    pub fn validate(&self) -> Result<(GenerationPlan, Vec<ColumnSpec>)> {
        if self.num_days == 0 {
            return Err(DriftError::config("num_days must be positive"));
        }
        if self.approx_rows_per_day == 0 {
            return Err(DriftError::config("approx_rows_per_day must be positive"));
        }
        if self.cache_batch_size == 0 {
            return Err(DriftError::config("cache_batch_size must be positive"));
        }
        if self.max_workers == Some(0) {
            return Err(DriftError::config("max_workers must be at least 1"));
        }
        if self.category_pool_size == 0 {
            return Err(DriftError::config("category_pool_size must be positive"));
        }
        if !(0.0..=1.0).contains(&self.row_variation) {
            return Err(DriftError::config("row_variation must be between 0 and 1"));
        }
        if !(0.0..=1.0).contains(&self.random_day_reduction_probability) {
            return Err(DriftError::config(
                "random_day_reduction_probability must be between 0 and 1",
            ));
        }
        if self.random_day_reduction_factor.is_nan() || self.random_day_reduction_factor < 0.0 {
            return Err(DriftError::config(
                "random_day_reduction_factor must not be negative",
            ));
        }
        if self.columns.is_empty() {
            return Err(DriftError::config("at least one column is required"));
        }

        let output_format: OutputFormat = self.output_format.parse()?;

        let mut seen = AHashSet::new();
        let mut columns = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DriftError::config(format!(
                    "duplicate column name: {}",
                    column.name
                )));
            }
            columns.push(column.to_spec()?);
        }
        for spec in &columns {
            let renamed = format!("new-{}", spec.name());
            if spec.transitions().contains(Transition::SchemaName) && seen.contains(renamed.as_str())
            {
                return Err(DriftError::config(format!(
                    "column {} collides with the renamed field of column {}",
                    renamed,
                    spec.name()
                )));
            }
        }

        let max_workers = self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });

        let cache_dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir()?,
        };

        let word_list = self.word_list.clone().or_else(|| {
            DEFAULT_WORD_LISTS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file())
        });

        let plan = GenerationPlan {
            num_days: self.num_days,
            approx_rows_per_day: self.approx_rows_per_day,
            row_variation: self.row_variation,
            reduction_probability: self.random_day_reduction_probability,
            reduction_factor: self.random_day_reduction_factor,
            batch_size: self.cache_batch_size,
            output_format,
            cache_retention: if self.cleanup_cache {
                CacheRetention::Delete
            } else {
                CacheRetention::Keep
            },
            output_dir: self.output_dir.clone(),
            cache_dir,
            max_workers,
            word_list,
            category_pool_size: self.category_pool_size,
            seed: self.seed.unwrap_or_else(rand::random),
        };

        Ok((plan, columns))
    }
}

/// Platform cache directory for day caches
pub fn default_cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .ok_or_else(|| DriftError::config("Could not determine cache directory"))?;
    Ok(base.join("drift-gen"))
}

/// Immutable parameters of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub num_days: usize,
    pub approx_rows_per_day: u64,
    pub row_variation: f64,
    pub reduction_probability: f64,
    pub reduction_factor: f64,
    pub batch_size: usize,
    pub output_format: OutputFormat,
    pub cache_retention: CacheRetention,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub max_workers: usize,
    pub word_list: Option<PathBuf>,
    pub category_pool_size: usize,
    pub seed: u64,
}

/// The built-in column set.
pub fn default_columns() -> Vec<ColumnConfig> {
    use DataType::*;
    use Distribution::*;
    use Transition::*;

    vec![
        ColumnConfig::new("id", Integer)
            .with_transitions(0.0, &[])
            .with_distribution(Increment),
        ColumnConfig::new("uniform1", Integer)
            .with_transitions(0.0, &[])
            .with_distribution(Uniform),
        ColumnConfig::new("zeroes1", Integer)
            .with_transitions(0.6, &[ZerosHigh])
            .with_distribution(Uniform),
        ColumnConfig::new("nulls1", Integer)
            .with_transitions(0.4, &[NullsHigh])
            .with_distribution(Uniform),
        ColumnConfig::new("normal1", Float)
            .with_transitions(0.2, &[SchemaName])
            .with_distribution(Normal),
        ColumnConfig::new("uniform2", Float)
            .with_transitions(0.3, &[ValuesScale])
            .with_distribution(Uniform),
        ColumnConfig::new("normal2", Integer)
            .with_transitions(0.7, &[ValuesScale, ValuesSomeStrings])
            .with_distribution(Normal),
        ColumnConfig::new("normal3", Integer)
            .with_transitions(0.7, &[ValuesScale])
            .with_distribution(Normal),
        ColumnConfig::new("uniform3", Float)
            .with_transitions(0.9, &[ValuesAllStrings])
            .with_distribution(Uniform),
        ColumnConfig::new("catStr1", StringCategory).with_transitions(0.5, &[StringShortToLong]),
        ColumnConfig::new("catStrSteady2", StringCategory).with_transitions(0.0, &[]),
        ColumnConfig::new("descStr1", StringLong).with_transitions(0.5, &[StringLongToShort]),
    ]
}

/// Example configuration printed by `example-config`.
pub const EXAMPLE_CONFIG: &str = r#"# drift-gen configuration
num_days: 10
approx_rows_per_day: 1000
output_dir: "data"
output_format: "csv"        # csv, json, jsonl
max_workers: null           # null = all CPUs
row_variation: 0.2
random_day_reduction_probability: 0.8
random_day_reduction_factor: 0.1
cleanup_cache: true
seed: 42

columns:
  - name: "id"
    data_type: integer
    transition_fraction: 0.0
    distributions: [increment]

  - name: "measurements"
    data_type: float
    transition_fraction: 0.3
    transitions: [values_scale, schema_name]
    distributions: [normal]

  - name: "category"
    data_type: string_category
    transition_fraction: 0.5
    transitions: [string_short_to_long]
"#;
