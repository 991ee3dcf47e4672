//! Per-column value generation.
//!
//! A [`ColumnGenerator`] owns everything one column needs: its spec, its
//! RNG and, for string columns, a word source. Columns share nothing, so a
//! generator can run on its own worker.

mod transform;

pub use transform::{INTEGER_COERCION_FACTOR, SCALE_FACTOR};

use crate::cache::{CacheStore, CellValue};
use crate::config::{ColumnSpec, DataType, Distribution, GenerationPlan, Transition};
use crate::error::{GenerationError, Result};
use crate::words::WordSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution as _;
use rand_distr::Normal;
use tracing::debug;

/// Words in a descriptive (long string) value
pub const LONG_PHRASE_WORDS: usize = 20;

/// Words in a category value after it grows long
pub const SHORT_TO_LONG_WORDS: usize = 5;

/// Standard deviation of the normal distribution
pub const NORMAL_STD_DEV: f64 = 100.0;

/// Derive a column's RNG seed from the run seed.
pub fn column_seed(run_seed: u64, column_index: usize) -> u64 {
    run_seed.wrapping_add((column_index as u64 + 1).wrapping_mul(0x9E3779B97F4A7C15))
}

pub struct ColumnGenerator {
    spec: ColumnSpec,
    words: Option<WordSource>,
    rng: StdRng,
}

impl ColumnGenerator {
    pub fn new(spec: ColumnSpec, words: Option<WordSource>, seed: u64) -> Self {
        Self {
            spec,
            words,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Build a generator for `spec`, opening the plan's word list for
    /// string columns when one is configured.
    pub fn for_plan(spec: ColumnSpec, plan: &GenerationPlan, seed: u64) -> Result<Self> {
        let mut generator = Self::new(spec, None, seed);
        if generator.spec.data_type().is_string() {
            if let Some(path) = &plan.word_list {
                let words = WordSource::open(path, plan.category_pool_size, &mut generator.rng)?;
                generator.words = Some(words);
            }
        }
        Ok(generator)
    }

    pub fn spec(&self) -> &ColumnSpec {
        &self.spec
    }

    /// Generate exactly `num_values` values for `day` into a fresh day cache.
    ///
    /// Values are produced and appended `batch_size` at a time so memory
    /// stays bounded by the batch, not the day.
    pub fn generate(
        &mut self,
        cache: &CacheStore,
        day: usize,
        num_values: u64,
        total_days: usize,
        batch_size: usize,
    ) -> Result<u64> {
        if self.spec.data_type().is_string() && self.words.is_none() {
            return Err(GenerationError::MissingWordSource(self.spec.name().to_string()).into());
        }

        debug!(
            "Generating {} values for column {}, day {}",
            num_values,
            self.spec.name(),
            day
        );

        let mut writer = cache.open(self.spec.name(), day)?;
        let mut generated = 0u64;

        while generated < num_values {
            let count = (num_values - generated).min(batch_size as u64) as usize;
            let mut batch = self.sample_batch(day, generated, count, total_days)?;
            transform::apply(&self.spec, &mut batch, day, total_days, &mut self.rng);
            writer.append(&batch)?;
            generated += count as u64;
        }

        let written = writer.close()?;
        debug!(
            "Generated {} values for column {}, day {}",
            written,
            self.spec.name(),
            day
        );
        Ok(written)
    }

    /// Raw values for positions `start..start + count` of the day, before
    /// transforms.
    fn sample_batch(
        &mut self,
        day: usize,
        start: u64,
        count: usize,
        total_days: usize,
    ) -> Result<Vec<CellValue>, GenerationError> {
        if self.spec.data_type().is_string() {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(CellValue::Text(self.sample_word(day, total_days)?));
            }
            return Ok(values);
        }

        let values = match self.spec.distribution() {
            Distribution::Increment => (0..count)
                .map(|i| CellValue::Float((start + i as u64) as f64))
                .collect(),
            Distribution::Uniform => (0..count)
                .map(|_| CellValue::Float(self.rng.random::<f64>()))
                .collect(),
            Distribution::Normal => {
                let normal = Normal::new(0.0, NORMAL_STD_DEV).map_err(|e| {
                    GenerationError::ColumnFailed {
                        column: self.spec.name().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                (0..count)
                    .map(|_| CellValue::Float(normal.sample(&mut self.rng)))
                    .collect()
            }
        };
        Ok(values)
    }

    fn sample_word(&mut self, day: usize, total_days: usize) -> Result<String, GenerationError> {
        let words = self
            .words
            .as_mut()
            .ok_or_else(|| GenerationError::MissingWordSource(self.spec.name().to_string()))?;
        let active = |t| self.spec.is_active(t, day, total_days);

        match self.spec.data_type() {
            DataType::StringLong if !active(Transition::StringLongToShort) => {
                words.random_words(&mut self.rng, LONG_PHRASE_WORDS)
            }
            DataType::StringCategory if active(Transition::StringShortToLong) => {
                words.random_words(&mut self.rng, SHORT_TO_LONG_WORDS)
            }
            _ => Ok(words.random_category_word(&mut self.rng)),
        }
    }
}
