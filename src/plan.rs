//! Per-day row count planning.
//!
//! The plan is computed once per run and shared read-only by every column
//! and by the consolidator. Because each column generates exactly the
//! planned count for a day, rows line up by position across caches.

use crate::config::GenerationPlan;
use rand::Rng;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Frozen mapping of day index to target row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCountMap {
    counts: Vec<u64>,
}

impl RowCountMap {
    /// Build from explicit counts, clamping each to at least one row.
    pub fn from_counts(counts: Vec<u64>) -> Self {
        Self {
            counts: counts.into_iter().map(|c| c.max(1)).collect(),
        }
    }

    /// Row count for `day`, or `None` outside the planned range.
    pub fn get(&self, day: usize) -> Option<u64> {
        self.counts.get(day).copied()
    }

    pub fn num_days(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.counts.iter().copied().enumerate()
    }
}

/// Serialized as `{"0": n, "1": m, ...}` in the generation profile.
impl Serialize for RowCountMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<usize, u64> = self.iter().collect();
        map.serialize(serializer)
    }
}

/// Decides how many rows each day gets.
#[derive(Debug, Clone)]
pub struct RowCountPlanner {
    base_rows: u64,
    variation: f64,
    reduction_probability: f64,
    reduction_factor: f64,
}

impl RowCountPlanner {
    pub fn new(
        base_rows: u64,
        variation: f64,
        reduction_probability: f64,
        reduction_factor: f64,
    ) -> Self {
        Self {
            base_rows,
            variation,
            reduction_probability,
            reduction_factor,
        }
    }

    pub fn from_plan(plan: &GenerationPlan) -> Self {
        Self::new(
            plan.approx_rows_per_day,
            plan.row_variation,
            plan.reduction_probability,
            plan.reduction_factor,
        )
    }

    /// Row count for a single day.
    ///
    /// Applies bounded +/- variation, then turns the day anomalous (reduced
    /// by `reduction_factor`) when a second draw exceeds the reduction
    /// probability. Never returns less than one.
    pub fn plan_day<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let factor = 1.0 + (rng.random::<f64>() - 0.5) * 2.0 * self.variation;
        let mut rows = (self.base_rows as f64 * factor).round();

        if rng.random::<f64>() > self.reduction_probability {
            rows = (rows * self.reduction_factor).round();
        }

        rows.max(1.0) as u64
    }

    /// Plan every day in `[0, num_days)`.
    pub fn plan<R: Rng + ?Sized>(&self, num_days: usize, rng: &mut R) -> RowCountMap {
        let counts = (0..num_days).map(|_| self.plan_day(rng)).collect();
        RowCountMap::from_counts(counts)
    }
}
