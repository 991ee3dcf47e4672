//! Run metrics, the generation profile and post-run validation.

use crate::config::GeneratorConfig;
use crate::error::{OutputError, Result};
use crate::output::OutputFormat;
use crate::plan::RowCountMap;
use schemars::JsonSchema;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROFILE_FILE_NAME: &str = "generation_profile.json";

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
pub struct GenerationMetrics {
    /// Rows written across all day files
    pub total_rows_generated: u64,
    pub total_columns: usize,
    pub generation_time_seconds: f64,
    /// Day caches created
    pub cache_operations: u64,
    pub files_written: usize,
    pub errors_encountered: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Contents of `generation_profile.json`.
#[derive(Debug, Serialize)]
pub struct GenerationProfile<'a> {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub config: &'a GeneratorConfig,
    pub metrics: &'a GenerationMetrics,
    pub rows_per_day: Option<&'a RowCountMap>,
    pub seed: u64,
    pub generation_timestamp: String,
}

impl GenerationProfile<'_> {
    /// Write the profile into `output_dir`, returning its path.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let io_err = |source| OutputError::Io {
            path: output_dir.to_path_buf(),
            source,
        };
        fs::create_dir_all(output_dir).map_err(io_err)?;

        let path = output_dir.join(PROFILE_FILE_NAME);
        let json = serde_json::to_string_pretty(self).map_err(OutputError::from)?;
        fs::write(&path, json).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Check a finished run's output directory against its metrics.
///
/// Returns human-readable issues; an empty list means the output looks
/// complete.
pub fn validate_output(
    output_dir: &Path,
    format: OutputFormat,
    num_days: usize,
    metrics: &GenerationMetrics,
) -> Vec<String> {
    let mut issues = Vec::new();

    if !output_dir.is_dir() {
        issues.push(format!(
            "Output directory does not exist: {}",
            output_dir.display()
        ));
        return issues;
    }

    for day in 0..num_days {
        let name = format!("{}.{}", day, format.file_extension());
        match fs::metadata(output_dir.join(&name)) {
            Err(_) => issues.push(format!("Missing expected file: {}", name)),
            Ok(meta) if meta.len() == 0 => issues.push(format!("Empty file: {}", name)),
            Ok(_) => {}
        }
    }

    if metrics.total_rows_generated == 0 {
        issues.push("No rows were generated".to_string());
    }
    if metrics.files_written != num_days {
        issues.push(format!(
            "Expected {} files, but wrote {}",
            num_days, metrics.files_written
        ));
    }

    issues
}
