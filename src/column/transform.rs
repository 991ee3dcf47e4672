//! Post-sampling transforms.
//!
//! Applied to every batch in a fixed order, later steps seeing the output
//! of earlier ones:
//!
//! 1. value scaling
//! 2. high zeros
//! 3. high nulls
//! 4. integer coercion (integer columns only, not transition-gated)
//! 5. partial or full stringification

use crate::cache::CellValue;
use crate::config::{ColumnSpec, DataType, Transition};
use rand::Rng;

/// Multiplier for [`Transition::ValuesScale`]
pub const SCALE_FACTOR: f64 = 40.0;

/// Multiplier applied when coercing integer column values
pub const INTEGER_COERCION_FACTOR: f64 = 100.0;

/// Run all transforms active for `day` over one batch.
pub fn apply<R: Rng + ?Sized>(
    spec: &ColumnSpec,
    values: &mut [CellValue],
    day: usize,
    total_days: usize,
    rng: &mut R,
) {
    let active = |t| spec.is_active(t, day, total_days);

    if active(Transition::ValuesScale) {
        scale(values);
    }

    // The gate is drawn once per batch, the replacement once per value
    if active(Transition::ZerosHigh) && rng.random::<f64>() >= 0.5 {
        replace_half(values, CellValue::Int(0), rng);
    }
    if active(Transition::NullsHigh) && rng.random::<f64>() >= 0.5 {
        replace_half(values, CellValue::Null, rng);
    }

    if spec.data_type() == DataType::Integer {
        coerce_integers(values);
    }

    if active(Transition::ValuesSomeStrings) {
        for value in values.iter_mut() {
            if rng.random_bool(0.5) {
                *value = CellValue::Text(format!("sometimes-{}", value));
            }
        }
    } else if active(Transition::ValuesAllStrings) {
        for value in values.iter_mut() {
            *value = CellValue::Text(format!("all-{}", value));
        }
    }
}

fn scale(values: &mut [CellValue]) {
    for value in values.iter_mut() {
        match value {
            CellValue::Float(f) => *f *= SCALE_FACTOR,
            CellValue::Int(n) => *n = n.saturating_mul(SCALE_FACTOR as i64),
            _ => {}
        }
    }
}

fn replace_half<R: Rng + ?Sized>(values: &mut [CellValue], replacement: CellValue, rng: &mut R) {
    for value in values.iter_mut() {
        if rng.random::<f64>() > 0.5 {
            *value = replacement.clone();
        }
    }
}

fn coerce_integers(values: &mut [CellValue]) {
    for value in values.iter_mut() {
        match value {
            CellValue::Float(f) => {
                *value = CellValue::Int((*f * INTEGER_COERCION_FACTOR).trunc() as i64);
            }
            CellValue::Int(n) if *n != 0 => {
                *n = n.saturating_mul(INTEGER_COERCION_FACTOR as i64);
            }
            _ => {}
        }
    }
}
