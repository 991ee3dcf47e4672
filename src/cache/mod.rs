//! Day caches backed by embedded DuckDB databases.
//!
//! Each (column, day) pair gets its own database file named
//! `.<column>-<day>.cache` inside the cache directory, holding one ordered
//! table:
//!
//! ```text
//! data(pos BIGINT, int_val BIGINT, float_val DOUBLE, text_val VARCHAR)
//! ```
//!
//! Exactly one of the typed columns is set per row; all three null means
//! [`CellValue::Null`]. Positions are 1-based and dense.
//!
//! Lifecycle: [`CacheStore::open`] (drops any stale store for the key) ->
//! [`DayCacheWriter::append`] -> [`DayCacheWriter::close`] -> read with
//! [`CacheStore::reader`] -> [`CacheStore::delete`].

mod value;

pub use value::CellValue;

use crate::error::CacheError;
use duckdb::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CREATE_TABLE: &str =
    "CREATE TABLE data (pos BIGINT, int_val BIGINT, float_val DOUBLE, text_val VARCHAR)";

/// Locates, creates and removes day caches under one directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_dir: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `cache_dir`, creating the directory.
    pub fn with_dir(cache_dir: PathBuf) -> Result<Self, CacheError> {
        fs::create_dir_all(&cache_dir).map_err(|source| CacheError::Io {
            path: cache_dir.clone(),
            source,
        })?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the cache for a column/day pair
    pub fn cache_path(&self, column: &str, day: usize) -> PathBuf {
        self.cache_dir.join(format!(".{}-{}.cache", column, day))
    }

    /// Start a fresh cache for `column`/`day`, replacing any stale one.
    pub fn open(&self, column: &str, day: usize) -> Result<DayCacheWriter, CacheError> {
        self.delete(column, day)?;

        let path = self.cache_path(column, day);
        let conn = Connection::open(&path).map_err(|source| CacheError::Store {
            path: path.clone(),
            source,
        })?;
        conn.execute(CREATE_TABLE, [])
            .map_err(|source| CacheError::Store {
                path: path.clone(),
                source,
            })?;

        Ok(DayCacheWriter {
            conn,
            path,
            next_pos: 1,
        })
    }

    /// Open a closed cache for reading.
    pub fn reader(&self, column: &str, day: usize) -> Result<DayCacheReader, CacheError> {
        let path = self.cache_path(column, day);
        if !path.exists() {
            return Err(CacheError::Missing {
                column: column.to_string(),
                day,
                path,
            });
        }

        let conn = Connection::open(&path).map_err(|source| CacheError::Store {
            path: path.clone(),
            source,
        })?;
        let len: i64 = conn
            .query_row("SELECT COUNT(*) FROM data", [], |row| row.get(0))
            .map_err(|source| CacheError::Store {
                path: path.clone(),
                source,
            })?;

        Ok(DayCacheReader {
            conn,
            path,
            len: len.max(0) as u64,
        })
    }

    /// Remove the cache for `column`/`day` if present.
    pub fn delete(&self, column: &str, day: usize) -> Result<(), CacheError> {
        let path = self.cache_path(column, day);
        remove_store_file(&path)
    }

    /// Remove every cache belonging to `column`. Returns the number removed.
    pub fn purge_column(&self, column: &str) -> Result<usize, CacheError> {
        let pattern = format!(".{}-*.cache", glob::Pattern::escape(column));
        let prefix = format!(".{}-", column);
        // ".a-*.cache" also matches column "a-b"; keep only numeric day suffixes
        self.purge_matching(&pattern, |name| {
            name.strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(".cache"))
                .is_some_and(|day| day.parse::<usize>().is_ok())
        })
    }

    /// Remove every cache in the directory. Returns the number removed.
    pub fn purge_all(&self) -> Result<usize, CacheError> {
        self.purge_matching(".*.cache", |_| true)
    }

    fn purge_matching<F>(&self, file_pattern: &str, keep: F) -> Result<usize, CacheError>
    where
        F: Fn(&str) -> bool,
    {
        let dir = glob::Pattern::escape(&self.cache_dir.to_string_lossy());
        let pattern = format!("{}/{}", dir, file_pattern);
        let options = glob::MatchOptions {
            require_literal_leading_dot: false,
            ..Default::default()
        };

        let mut removed = 0;
        for entry in glob::glob_with(&pattern, options)? {
            match entry {
                Ok(path) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    if !keep(&name) {
                        continue;
                    }
                    remove_store_file(&path)?;
                    debug!("Removed cache file: {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Skipping unreadable cache entry: {}", e),
            }
        }
        Ok(removed)
    }
}

fn remove_store_file(path: &Path) -> Result<(), CacheError> {
    if path.exists() {
        fs::remove_file(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }

    // DuckDB may leave a write-ahead log next to the database
    let mut wal = path.as_os_str().to_owned();
    wal.push(".wal");
    let wal = PathBuf::from(wal);
    if wal.exists() {
        fs::remove_file(&wal).map_err(|source| CacheError::Io { path: wal, source })?;
    }
    Ok(())
}

/// Exclusive append handle for one day cache.
pub struct DayCacheWriter {
    conn: Connection,
    path: PathBuf,
    next_pos: i64,
}

impl DayCacheWriter {
    /// Append values in order after those already written.
    pub fn append(&mut self, values: &[CellValue]) -> Result<(), CacheError> {
        let mut appender = self
            .conn
            .appender("data")
            .map_err(|source| CacheError::Store {
                path: self.path.clone(),
                source,
            })?;

        for value in values {
            let (int_val, float_val, text_val): (Option<i64>, Option<f64>, Option<&str>) =
                match value {
                    CellValue::Null => (None, None, None),
                    CellValue::Int(n) => (Some(*n), None, None),
                    CellValue::Float(f) => (None, Some(*f), None),
                    CellValue::Text(s) => (None, None, Some(s.as_str())),
                };
            appender
                .append_row(params![self.next_pos, int_val, float_val, text_val])
                .map_err(|source| CacheError::Store {
                    path: self.path.clone(),
                    source,
                })?;
            self.next_pos += 1;
        }

        appender.flush().map_err(|source| CacheError::Store {
            path: self.path.clone(),
            source,
        })
    }

    /// Number of values appended so far.
    pub fn len(&self) -> u64 {
        (self.next_pos - 1) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finalize the cache on disk; it is read-only from here on.
    pub fn close(self) -> Result<u64, CacheError> {
        let len = self.len();
        let path = self.path;
        self.conn
            .execute_batch("CHECKPOINT")
            .map_err(|source| CacheError::Store {
                path: path.clone(),
                source,
            })?;
        self.conn
            .close()
            .map_err(|(_, source)| CacheError::Store { path, source })?;
        Ok(len)
    }
}

/// Positional read access to a closed day cache.
pub struct DayCacheReader {
    conn: Connection,
    path: PathBuf,
    len: u64,
}

impl DayCacheReader {
    /// Number of stored values.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value at 1-based `position`, or `None` past the stored range.
    pub fn read(&self, position: u64) -> Result<Option<CellValue>, CacheError> {
        if position == 0 || position > self.len {
            return Ok(None);
        }
        Ok(self.read_range(position, 1)?.pop().flatten())
    }

    /// Values at positions `start..start + count`; positions past the stored
    /// range come back as `None`.
    pub fn read_range(
        &self,
        start: u64,
        count: usize,
    ) -> Result<Vec<Option<CellValue>>, CacheError> {
        let mut out: Vec<Option<CellValue>> = vec![None; count];
        if count == 0 {
            return Ok(out);
        }
        let end = start + count as u64 - 1;

        let store_err = |source| CacheError::Store {
            path: self.path.clone(),
            source,
        };

        let mut stmt = self
            .conn
            .prepare(
                "SELECT pos, int_val, float_val, text_val FROM data \
                 WHERE pos BETWEEN ? AND ? ORDER BY pos",
            )
            .map_err(store_err)?;
        let mut rows = stmt
            .query(params![start as i64, end as i64])
            .map_err(store_err)?;

        while let Some(row) = rows.next().map_err(store_err)? {
            let pos: i64 = row.get(0).map_err(store_err)?;
            let int_val: Option<i64> = row.get(1).map_err(store_err)?;
            let float_val: Option<f64> = row.get(2).map_err(store_err)?;
            let text_val: Option<String> = row.get(3).map_err(store_err)?;

            let value = match (int_val, float_val, text_val) {
                (Some(n), _, _) => CellValue::Int(n),
                (_, Some(f), _) => CellValue::Float(f),
                (_, _, Some(s)) => CellValue::Text(s),
                _ => CellValue::Null,
            };

            let slot = (pos as u64).wrapping_sub(start) as usize;
            if let Some(entry) = out.get_mut(slot) {
                *entry = Some(value);
            }
        }

        Ok(out)
    }
}
