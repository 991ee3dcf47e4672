//! Column definitions: data types, transitions and distributions.

use crate::error::{DriftError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declared value type of a column. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum DataType {
    Integer,
    Float,
    /// Multi-word descriptive text
    StringLong,
    /// Short categorical text drawn from a small pool
    StringCategory,
}

impl DataType {
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::StringLong | DataType::StringCategory)
    }
}

impl std::str::FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "integer" | "int" => Ok(DataType::Integer),
            "float" => Ok(DataType::Float),
            "string_long" => Ok(DataType::StringLong),
            "string_category" => Ok(DataType::StringCategory),
            _ => Err(format!(
                "Unknown data type: {}. Valid options: integer, float, string_long, string_category",
                s
            )),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Integer => write!(f, "integer"),
            DataType::Float => write!(f, "float"),
            DataType::StringLong => write!(f, "string_long"),
            DataType::StringCategory => write!(f, "string_category"),
        }
    }
}

/// A kind of drift that switches on once a column crosses its transition day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Multiply numeric values by 40
    ValuesScale,
    /// Every value becomes `all-<value>`
    ValuesAllStrings,
    /// Roughly half the values become `sometimes-<value>`
    ValuesSomeStrings,
    /// Field name gains a `new-` prefix
    SchemaName,
    /// Long phrases collapse to single category words
    StringLongToShort,
    /// Category words grow into 5-word phrases
    StringShortToLong,
    /// Roughly half the values become null (per batch coin flip)
    NullsHigh,
    /// Roughly half the values become zero (per batch coin flip)
    ZerosHigh,
}

impl Transition {
    pub const ALL: [Transition; 8] = [
        Transition::ValuesScale,
        Transition::ValuesAllStrings,
        Transition::ValuesSomeStrings,
        Transition::SchemaName,
        Transition::StringLongToShort,
        Transition::StringShortToLong,
        Transition::NullsHigh,
        Transition::ZerosHigh,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of independent transition kinds enabled on a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionSet(u16);

impl TransitionSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, transition: Transition) {
        self.0 |= transition.bit();
    }

    pub fn contains(&self, transition: Transition) -> bool {
        self.0 & transition.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Transition> + '_ {
        Transition::ALL.into_iter().filter(|t| self.contains(*t))
    }
}

impl FromIterator<Transition> for TransitionSet {
    fn from_iter<I: IntoIterator<Item = Transition>>(iter: I) -> Self {
        let mut set = TransitionSet::empty();
        for t in iter {
            set.insert(t);
        }
        set
    }
}

/// Numeric sampling method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// 0, 1, 2, ... n-1
    Increment,
    /// U[0, 1)
    Uniform,
    /// Gaussian with mean 0 and standard deviation 100
    Normal,
}

impl Distribution {
    /// Pick the sampling method from a set of flags.
    ///
    /// Priority is INCREMENT > UNIFORM > NORMAL; no flag means UNIFORM.
    pub fn resolve(flags: &[Distribution]) -> Distribution {
        [
            Distribution::Increment,
            Distribution::Uniform,
            Distribution::Normal,
        ]
        .into_iter()
        .find(|d| flags.contains(d))
        .unwrap_or(Distribution::Uniform)
    }
}

/// Column entry as it appears in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnConfig {
    pub name: String,
    pub data_type: DataType,
    /// Fraction of the day range before which no transition applies
    #[serde(default = "default_transition_fraction")]
    pub transition_fraction: f64,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub distributions: Vec<Distribution>,
}

fn default_transition_fraction() -> f64 {
    0.5
}

impl ColumnConfig {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            transition_fraction: default_transition_fraction(),
            transitions: Vec::new(),
            distributions: Vec::new(),
        }
    }

    pub fn with_transitions(mut self, fraction: f64, transitions: &[Transition]) -> Self {
        self.transition_fraction = fraction;
        self.transitions = transitions.to_vec();
        self
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distributions = vec![distribution];
        self
    }

    /// Validate into a [`ColumnSpec`].
    pub fn to_spec(&self) -> Result<ColumnSpec> {
        ColumnSpec::new(
            &self.name,
            self.data_type,
            self.transition_fraction,
            self.transitions.iter().copied().collect(),
            Distribution::resolve(&self.distributions),
        )
    }
}

/// Validated identity and behavior of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    name: String,
    data_type: DataType,
    transition_fraction: f64,
    transitions: TransitionSet,
    distribution: Distribution,
}

impl ColumnSpec {
    pub fn new(
        name: &str,
        data_type: DataType,
        transition_fraction: f64,
        transitions: TransitionSet,
        distribution: Distribution,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(DriftError::config("column name must not be empty"));
        }
        // Names become part of cache file names
        if name.contains(['/', '\\']) {
            return Err(DriftError::config(format!(
                "column name '{}' must not contain path separators",
                name
            )));
        }
        if !(0.0..=1.0).contains(&transition_fraction) {
            return Err(DriftError::config(format!(
                "transition_fraction for column '{}' must be between 0 and 1, got {}",
                name, transition_fraction
            )));
        }
        Ok(Self {
            name: name.to_string(),
            data_type,
            transition_fraction,
            transitions,
            distribution,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    pub fn transitions(&self) -> TransitionSet {
        self.transitions
    }

    /// First day index on which this column's transitions apply.
    pub fn transition_day(&self, total_days: usize) -> usize {
        (total_days as f64 * self.transition_fraction).floor() as usize
    }

    /// Whether `transition` is enabled and in effect on `day`.
    pub fn is_active(&self, transition: Transition, day: usize, total_days: usize) -> bool {
        self.transitions.contains(transition) && day >= self.transition_day(total_days)
    }

    /// Field name shown in output for `day`.
    pub fn field_name(&self, day: usize, total_days: usize) -> String {
        if self.is_active(Transition::SchemaName, day, total_days) {
            format!("new-{}", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(fraction: f64, transitions: &[Transition]) -> ColumnSpec {
        ColumnSpec::new(
            "col",
            DataType::Float,
            fraction,
            transitions.iter().copied().collect(),
            Distribution::Uniform,
        )
        .unwrap()
    }

    #[test]
    fn test_fraction_validation() {
        assert!(ColumnSpec::new(
            "c",
            DataType::Integer,
            1.5,
            TransitionSet::empty(),
            Distribution::Uniform
        )
        .is_err());
        assert!(ColumnSpec::new(
            "c",
            DataType::Integer,
            -0.1,
            TransitionSet::empty(),
            Distribution::Uniform
        )
        .is_err());
        assert!(ColumnSpec::new(
            "c",
            DataType::Integer,
            1.0,
            TransitionSet::empty(),
            Distribution::Uniform
        )
        .is_ok());
    }

    #[test]
    fn test_name_validation() {
        for name in ["", "  ", "a/b", "a\\b"] {
            assert!(ColumnSpec::new(
                name,
                DataType::Float,
                0.5,
                TransitionSet::empty(),
                Distribution::Uniform
            )
            .is_err());
        }
    }

    #[test]
    fn test_distribution_priority() {
        assert_eq!(Distribution::resolve(&[]), Distribution::Uniform);
        assert_eq!(
            Distribution::resolve(&[Distribution::Normal, Distribution::Increment]),
            Distribution::Increment
        );
        assert_eq!(
            Distribution::resolve(&[Distribution::Normal, Distribution::Uniform]),
            Distribution::Uniform
        );
        assert_eq!(
            Distribution::resolve(&[Distribution::Normal]),
            Distribution::Normal
        );
    }

    #[test]
    fn test_transition_is_monotonic_in_day() {
        let col = spec(0.3, &[Transition::ValuesScale]);
        let total_days = 10;
        let mut seen_active = false;
        for day in 0..total_days {
            let active = col.is_active(Transition::ValuesScale, day, total_days);
            if seen_active {
                assert!(active, "transition switched off again on day {}", day);
            }
            seen_active |= active;
        }
        assert!(!col.is_active(Transition::ValuesScale, 2, total_days));
        assert!(col.is_active(Transition::ValuesScale, 3, total_days));
    }

    #[test]
    fn test_unset_transition_never_active() {
        let col = spec(0.0, &[Transition::NullsHigh]);
        assert!(col.is_active(Transition::NullsHigh, 0, 5));
        assert!(!col.is_active(Transition::ZerosHigh, 4, 5));
    }

    #[test]
    fn test_schema_name_switches_at_half() {
        let col = spec(0.5, &[Transition::SchemaName]);
        let names: Vec<String> = (0..4).map(|d| col.field_name(d, 4)).collect();
        assert_eq!(names, vec!["col", "col", "new-col", "new-col"]);
    }

    #[test]
    fn test_transition_set() {
        let set: TransitionSet = [Transition::ZerosHigh, Transition::SchemaName]
            .into_iter()
            .collect();
        assert!(set.contains(Transition::ZerosHigh));
        assert!(!set.contains(Transition::NullsHigh));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Transition::SchemaName, Transition::ZerosHigh]
        );
    }

    #[test]
    fn test_data_type_parsing() {
        assert_eq!("INTEGER".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!(
            "string_category".parse::<DataType>().unwrap(),
            DataType::StringCategory
        );
        assert!("decimal".parse::<DataType>().is_err());
    }
}
