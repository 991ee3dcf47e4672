//! Day consolidation and output files.
//!
//! Once every column has cached every day, the consolidator walks each
//! day's caches position by position, assembles rows under the effective
//! field names for that day, and streams them into `<day>.<ext>`.

mod writer;

pub use writer::{RowWriter, WRITER_BUFFER_SIZE};

use crate::cache::{CacheStore, CellValue, DayCacheReader};
use crate::config::ColumnSpec;
use crate::error::{DriftError, OutputError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use tracing::debug;

const SECONDS_PER_DAY: u64 = 86_400;

/// Serialization format of day files, selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    #[serde(rename = "jsonl")]
    JsonLines,
}

impl OutputFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::JsonLines => "jsonl",
        }
    }

    /// Consolidate `day` from the caches into `<output_dir>/<day>.<ext>`.
    pub fn write_day(
        &self,
        consolidator: &DayConsolidator<'_>,
        day: usize,
        rows: u64,
        output_dir: &Path,
    ) -> Result<DayOutput> {
        consolidator.write_day(*self, day, rows, output_dir)
    }
}

impl FromStr for OutputFormat {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(OutputFormat::JsonLines),
            _ => Err(OutputError::UnsupportedFormat(s.to_string()).into()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_extension())
    }
}

/// Result of writing one day file.
#[derive(Debug, Clone)]
pub struct DayOutput {
    pub day: usize,
    pub path: PathBuf,
    pub rows_written: u64,
}

/// Reads day caches back as rows.
pub struct DayConsolidator<'a> {
    cache: &'a CacheStore,
    columns: &'a [ColumnSpec],
    total_days: usize,
    batch_size: usize,
}

impl<'a> DayConsolidator<'a> {
    pub fn new(
        cache: &'a CacheStore,
        columns: &'a [ColumnSpec],
        total_days: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            cache,
            columns,
            total_days,
            batch_size: batch_size.max(1),
        }
    }

    /// Field names used for `day`, in column order.
    pub fn field_names(&self, day: usize) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.field_name(day, self.total_days))
            .collect()
    }

    /// Write one day file. Errors are wrapped with the day they belong to.
    pub fn write_day(
        &self,
        format: OutputFormat,
        day: usize,
        rows: u64,
        output_dir: &Path,
    ) -> Result<DayOutput> {
        self.write_day_inner(format, day, rows, output_dir)
            .map_err(|e| {
                OutputError::Day {
                    day,
                    source: Box::new(e),
                }
                .into()
            })
    }

    fn write_day_inner(
        &self,
        format: OutputFormat,
        day: usize,
        rows: u64,
        output_dir: &Path,
    ) -> Result<DayOutput> {
        fs::create_dir_all(output_dir).map_err(|source| OutputError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        // Caches are located by configured name, not by effective name
        let readers = self
            .columns
            .iter()
            .map(|c| self.cache.reader(c.name(), day))
            .collect::<std::result::Result<Vec<DayCacheReader>, _>>()?;

        let path = output_dir.join(format!("{}.{}", day, format.file_extension()));
        let mut writer = RowWriter::create(&path, format, self.field_names(day))?;

        let mut start = 1u64;
        while start <= rows {
            let count = (rows - start + 1).min(self.batch_size as u64) as usize;
            let mut columns = Vec::with_capacity(readers.len());
            for reader in &readers {
                columns.push(reader.read_range(start, count)?);
            }

            let mut row = Vec::with_capacity(columns.len());
            for i in 0..count {
                row.clear();
                row.extend(
                    columns
                        .iter_mut()
                        .map(|col| col[i].take().unwrap_or(CellValue::Null)),
                );
                if row.iter().all(CellValue::is_null) {
                    continue;
                }
                writer.write_row(&row)?;
            }

            start += count as u64;
        }

        let rows_written = writer.finish()?;
        backdate(&path, day, self.total_days)?;

        debug!(
            "Wrote {} of {} rows for day {} to {}",
            rows_written,
            rows,
            day,
            path.display()
        );

        Ok(DayOutput {
            day,
            path,
            rows_written,
        })
    }
}

/// Back-date a day file's access and modification times so day `d` of `n`
/// appears `n - d - 1` days old.
pub fn backdate(path: &Path, day: usize, total_days: usize) -> Result<(), OutputError> {
    let days_back = total_days.saturating_sub(day + 1) as u64;
    let time = SystemTime::now()
        .checked_sub(Duration::from_secs(days_back * SECONDS_PER_DAY))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::options().write(true).open(path).map_err(io_err)?;
    file.set_times(FileTimes::new().set_accessed(time).set_modified(time))
        .map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataType, Distribution, Transition, TransitionSet};
    use tempfile::TempDir;

    fn spec(name: &str, transitions: &[Transition]) -> ColumnSpec {
        ColumnSpec::new(
            name,
            DataType::Integer,
            0.5,
            transitions.iter().copied().collect::<TransitionSet>(),
            Distribution::Uniform,
        )
        .unwrap()
    }

    fn fill(cache: &CacheStore, column: &str, day: usize, values: Vec<CellValue>) {
        let mut writer = cache.open(column, day).unwrap();
        writer.append(&values).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "jsonl".parse::<OutputFormat>().unwrap(),
            OutputFormat::JsonLines
        );
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(DriftError::Output(OutputError::UnsupportedFormat(f))) if f == "xml"
        ));
        assert_eq!(OutputFormat::JsonLines.file_extension(), "jsonl");
    }

    #[test]
    fn test_all_null_rows_dropped() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::with_dir(dir.path().join("cache")).unwrap();
        let columns = vec![spec("a", &[]), spec("b", &[])];
        fill(
            &cache,
            "a",
            0,
            vec![CellValue::Int(1), CellValue::Null, CellValue::Null],
        );
        fill(
            &cache,
            "b",
            0,
            vec![CellValue::Null, CellValue::Null, CellValue::Int(3)],
        );

        let consolidator = DayConsolidator::new(&cache, &columns, 1, 2);
        let out = OutputFormat::Csv
            .write_day(&consolidator, 0, 3, &dir.path().join("out"))
            .unwrap();

        assert_eq!(out.rows_written, 2);
        assert_eq!(
            fs::read_to_string(&out.path).unwrap(),
            "a,b\n1,\n,3\n"
        );
    }

    #[test]
    fn test_schema_name_per_column() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::with_dir(dir.path().join("cache")).unwrap();
        let columns = vec![spec("kept", &[]), spec("renamed", &[Transition::SchemaName])];
        for day in 0..2 {
            fill(&cache, "kept", day, vec![CellValue::Int(7)]);
            fill(&cache, "renamed", day, vec![CellValue::Int(8)]);
        }

        let consolidator = DayConsolidator::new(&cache, &columns, 2, 10);
        assert_eq!(consolidator.field_names(0), vec!["kept", "renamed"]);
        assert_eq!(consolidator.field_names(1), vec!["kept", "new-renamed"]);

        let out = consolidator
            .write_day(OutputFormat::JsonLines, 1, 1, dir.path())
            .unwrap();
        assert_eq!(
            fs::read_to_string(out.path).unwrap(),
            "{\"kept\":7,\"new-renamed\":8}\n"
        );
    }

    #[test]
    fn test_short_cache_reads_as_null() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::with_dir(dir.path().join("cache")).unwrap();
        let columns = vec![spec("a", &[]), spec("b", &[])];
        fill(&cache, "a", 0, vec![CellValue::Int(1), CellValue::Int(2)]);
        fill(&cache, "b", 0, vec![CellValue::Int(1)]);

        let consolidator = DayConsolidator::new(&cache, &columns, 1, 10);
        let out = consolidator
            .write_day(OutputFormat::Csv, 0, 2, dir.path())
            .unwrap();
        assert_eq!(fs::read_to_string(out.path).unwrap(), "a,b\n1,1\n2,\n");
    }

    #[test]
    fn test_missing_cache_is_output_error() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::with_dir(dir.path().join("cache")).unwrap();
        let columns = vec![spec("a", &[])];

        let consolidator = DayConsolidator::new(&cache, &columns, 1, 10);
        let err = consolidator
            .write_day(OutputFormat::Csv, 0, 1, dir.path())
            .unwrap_err();
        assert!(matches!(err, DriftError::Output(OutputError::Day { day: 0, .. })));
        assert!(!dir.path().join("0.csv").exists());
    }

    #[test]
    fn test_backdated_timestamps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0.csv");
        fs::write(&path, "x\n").unwrap();
        backdate(&path, 0, 3).unwrap();

        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        let age = SystemTime::now().duration_since(modified).unwrap();
        let two_days = Duration::from_secs(2 * SECONDS_PER_DAY);
        assert!(age >= two_days && age < two_days + Duration::from_secs(60));
    }
}
