//! Run orchestration.
//!
//! A run has three phases:
//!
//! 1. plan row counts for every day from the run seed
//! 2. generate every column for every day into day caches, one task per
//!    column on a worker pool
//! 3. consolidate each day into its output file, purging caches as it goes
//!
//! Phase 3 starts only once every column task has succeeded, so a failed
//! run never leaves day files behind.

mod profile;

pub use profile::{
    validate_output, GenerationMetrics, GenerationProfile, RunStatus, PROFILE_FILE_NAME,
};

use crate::cache::CacheStore;
use crate::column::{column_seed, ColumnGenerator};
use crate::config::{CacheRetention, ColumnSpec, GenerationPlan, GeneratorConfig};
use crate::error::{DriftError, GenerationError, Result};
use crate::output::{DayConsolidator, DayOutput};
use crate::plan::{RowCountMap, RowCountPlanner};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Progress notifications emitted during a run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// One column finished caching one day
    DayCached { column: String, day: usize },
    /// One day file was written
    DayWritten { day: usize, rows: u64 },
}

type ProgressFn = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// How a single column task ended.
#[derive(Debug)]
pub enum ColumnOutcome {
    Completed {
        column: String,
        values: u64,
        days: usize,
    },
    Failed {
        column: String,
        error: DriftError,
    },
    /// Stopped before starting a day because another column failed
    Cancelled {
        column: String,
        days_completed: usize,
    },
}

/// Everything a successful run produced.
#[derive(Debug)]
pub struct GenerationReport {
    pub metrics: GenerationMetrics,
    pub rows_per_day: RowCountMap,
    pub outputs: Vec<DayOutput>,
    pub profile_path: PathBuf,
}

pub struct Generator {
    config: GeneratorConfig,
    plan: GenerationPlan,
    columns: Vec<ColumnSpec>,
    progress: Option<ProgressFn>,
}

impl Generator {
    /// Validate `config` and prepare a run. Nothing touches the filesystem yet.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let (plan, columns) = config.validate()?;
        Ok(Self {
            config,
            plan,
            columns,
            progress: None,
        })
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn plan(&self) -> &GenerationPlan {
        &self.plan
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// The per-day row counts this run will produce.
    pub fn row_counts(&self) -> RowCountMap {
        let mut rng = StdRng::seed_from_u64(self.plan.seed);
        RowCountPlanner::from_plan(&self.plan).plan(self.plan.num_days, &mut rng)
    }

    /// Execute the run and write `generation_profile.json`.
    ///
    /// On failure the profile is still written, best-effort, with a failed
    /// status; the original error is returned either way.
    pub fn run(&self) -> Result<GenerationReport> {
        let started = Instant::now();
        let mut metrics = GenerationMetrics {
            total_columns: self.columns.len(),
            ..Default::default()
        };
        let rows_per_day = self.row_counts();

        info!(
            "Generating {} days x {} columns (seed {}, {} workers)",
            self.plan.num_days,
            self.columns.len(),
            self.plan.seed,
            self.plan.max_workers
        );
        debug!("Rows per day: {:?}", rows_per_day);

        let result = self.execute(&rows_per_day, &mut metrics);
        metrics.generation_time_seconds = started.elapsed().as_secs_f64();

        match result {
            Ok(outputs) => {
                let profile_path = self
                    .profile(RunStatus::Completed, None, &metrics, Some(&rows_per_day))
                    .write(&self.plan.output_dir)?;
                info!(
                    "Generated {} rows in {} files in {:.2}s",
                    metrics.total_rows_generated,
                    metrics.files_written,
                    metrics.generation_time_seconds
                );
                Ok(GenerationReport {
                    metrics,
                    rows_per_day,
                    outputs,
                    profile_path,
                })
            }
            Err(e) => {
                metrics.errors_encountered = metrics.errors_encountered.max(1);
                error!("Generation failed: {}", e);
                let profile = self.profile(
                    RunStatus::Failed,
                    Some(e.to_string()),
                    &metrics,
                    Some(&rows_per_day),
                );
                if let Err(write_err) = profile.write(&self.plan.output_dir) {
                    warn!("Could not write failure profile: {}", write_err);
                }
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        rows_per_day: &RowCountMap,
        metrics: &mut GenerationMetrics,
    ) -> Result<Vec<DayOutput>> {
        let cache = CacheStore::with_dir(self.plan.cache_dir.clone())?;

        let result = self
            .generate_columns(&cache, rows_per_day, metrics)
            .and_then(|()| self.write_days(&cache, rows_per_day, metrics));

        // Remaining caches go on success and on failure alike
        if self.plan.cache_retention == CacheRetention::Delete {
            self.purge_caches(&cache);
        }
        result
    }

    /// Consolidate every day into its output file, in day order.
    fn write_days(
        &self,
        cache: &CacheStore,
        rows_per_day: &RowCountMap,
        metrics: &mut GenerationMetrics,
    ) -> Result<Vec<DayOutput>> {
        let consolidator = DayConsolidator::new(
            cache,
            &self.columns,
            self.plan.num_days,
            self.plan.batch_size,
        );

        let mut outputs = Vec::with_capacity(self.plan.num_days);
        for (day, rows) in rows_per_day.iter() {
            let output = match self.plan.output_format.write_day(
                &consolidator,
                day,
                rows,
                &self.plan.output_dir,
            ) {
                Ok(output) => output,
                Err(e) => {
                    metrics.errors_encountered += 1;
                    return Err(e);
                }
            };

            metrics.files_written += 1;
            metrics.total_rows_generated += output.rows_written;
            self.notify(ProgressEvent::DayWritten {
                day,
                rows: output.rows_written,
            });

            if self.plan.cache_retention == CacheRetention::Delete {
                for column in &self.columns {
                    if let Err(e) = cache.delete(column.name(), day) {
                        warn!("Failed to remove cache for {} day {}: {}", column.name(), day, e);
                    }
                }
            }
            outputs.push(output);
        }

        Ok(outputs)
    }

    /// Run every column task to completion or cancellation.
    fn generate_columns(
        &self,
        cache: &CacheStore,
        rows_per_day: &RowCountMap,
        metrics: &mut GenerationMetrics,
    ) -> Result<()> {
        let cancelled = AtomicBool::new(false);
        let task = |(index, spec): (usize, &ColumnSpec)| {
            self.generate_column(index, spec, cache, rows_per_day, &cancelled)
        };

        let outcomes: Vec<ColumnOutcome> = if self.plan.max_workers <= 1 {
            self.columns.iter().enumerate().map(task).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.plan.max_workers)
                .build()
                .map_err(|e| GenerationError::WorkerPool(e.to_string()))?;
            pool.install(|| self.columns.par_iter().enumerate().map(task).collect())
        };

        let mut first_error = None;
        let mut cancelled_columns = 0;
        for outcome in outcomes {
            match outcome {
                ColumnOutcome::Completed { column, values, days } => {
                    debug!("Column {} cached {} values over {} days", column, values, days);
                    metrics.cache_operations += days as u64;
                }
                ColumnOutcome::Failed { column, error } => {
                    error!("Column {} failed: {}", column, error);
                    metrics.errors_encountered += 1;
                    first_error.get_or_insert(error);
                }
                ColumnOutcome::Cancelled {
                    column,
                    days_completed,
                } => {
                    debug!("Column {} cancelled after {} days", column, days_completed);
                    metrics.cache_operations += days_completed as u64;
                    cancelled_columns += 1;
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None if cancelled_columns > 0 => Err(GenerationError::Cancelled.into()),
            None => Ok(()),
        }
    }

    /// Generate all days of one column in order.
    fn generate_column(
        &self,
        index: usize,
        spec: &ColumnSpec,
        cache: &CacheStore,
        rows_per_day: &RowCountMap,
        cancelled: &AtomicBool,
    ) -> ColumnOutcome {
        let column = spec.name().to_string();
        let fail = |error: DriftError| {
            cancelled.store(true, Ordering::SeqCst);
            ColumnOutcome::Failed {
                column: column.clone(),
                error,
            }
        };

        let seed = column_seed(self.plan.seed, index);
        let mut generator = match ColumnGenerator::for_plan(spec.clone(), &self.plan, seed) {
            Ok(generator) => generator,
            Err(e) => return fail(e),
        };

        let mut values = 0;
        let mut days = 0;
        for (day, rows) in rows_per_day.iter() {
            if cancelled.load(Ordering::SeqCst) {
                return ColumnOutcome::Cancelled {
                    column: column.clone(),
                    days_completed: days,
                };
            }
            match generator.generate(
                cache,
                day,
                rows,
                self.plan.num_days,
                self.plan.batch_size,
            ) {
                Ok(n) => {
                    values += n;
                    days += 1;
                    self.notify(ProgressEvent::DayCached {
                        column: column.clone(),
                        day,
                    });
                }
                Err(e) => return fail(e),
            }
        }

        ColumnOutcome::Completed {
            column,
            values,
            days,
        }
    }

    fn purge_caches(&self, cache: &CacheStore) {
        for column in &self.columns {
            match cache.purge_column(column.name()) {
                Ok(0) => {}
                Ok(n) => debug!("Purged {} caches for column {}", n, column.name()),
                Err(e) => warn!("Failed to purge caches for {}: {}", column.name(), e),
            }
        }
    }

    fn notify(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress(event);
        }
    }

    fn profile<'a>(
        &'a self,
        status: RunStatus,
        error: Option<String>,
        metrics: &'a GenerationMetrics,
        rows_per_day: Option<&'a RowCountMap>,
    ) -> GenerationProfile<'a> {
        GenerationProfile {
            status,
            error,
            config: &self.config,
            metrics,
            rows_per_day,
            seed: self.plan.seed,
            generation_timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
