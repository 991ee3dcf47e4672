//! Typed cell values flowing from generators through caches to writers.

use serde::{Serialize, Serializer};
use std::fmt;

/// A single generated value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Int(_) | CellValue::Float(_))
    }

    /// Numeric value as a float, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(n) => Some(*n as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Textual form used by row-based formats: null is empty, floats always
/// carry a decimal point (`3.0`, not `3`).
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Int(n) => write!(f, "{}", n),
            CellValue::Float(v) => write!(f, "{:?}", v),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Int(n) => serializer.serialize_i64(*n),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Int(42).to_string(), "42");
        assert_eq!(CellValue::Float(3.0).to_string(), "3.0");
        assert_eq!(CellValue::Float(0.25).to_string(), "0.25");
        assert_eq!(CellValue::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_json_typing() {
        let values = vec![
            CellValue::Null,
            CellValue::Int(7),
            CellValue::Float(1.5),
            CellValue::from("x"),
        ];
        assert_eq!(
            serde_json::to_string(&values).unwrap(),
            r#"[null,7,1.5,"x"]"#
        );
    }
}
