//! Scalar values and semantic column types.

use arrow::datatypes::{DataType, TimeUnit};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The declared semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Text,
    Integer,
    Real,
    Timestamp,
}

impl SemanticType {
    /// The Arrow type a batch column of this semantic type is normalised to.
    pub fn arrow_type(&self) -> DataType {
        match self {
            SemanticType::Text => DataType::Utf8,
            SemanticType::Integer => DataType::Int64,
            SemanticType::Real => DataType::Float64,
            SemanticType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }

    /// Returns true for integer and real columns.
    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Real)
    }

    /// Returns true if values of the two types can be ordered against each other.
    pub fn is_comparable_with(&self, other: SemanticType) -> bool {
        (self.is_numeric() && other.is_numeric()) || *self == other
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::Text => "text",
            SemanticType::Integer => "integer",
            SemanticType::Real => "real",
            SemanticType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// A single non-null cell value.
///
/// Nulls are modelled as `Option<Value>` at the call sites that can see them.
/// `Value` is totally ordered and hashable so it can be stored in value sets;
/// reals are compared with [`f64::total_cmp`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// The semantic type this value naturally belongs to.
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Value::Integer(_) => SemanticType::Integer,
            Value::Real(_) => SemanticType::Real,
            Value::Text(_) => SemanticType::Text,
            Value::Timestamp(_) => SemanticType::Timestamp,
        }
    }

    /// Converts this value to `target` when that can be done without loss.
    ///
    /// Integers widen to reals, integral reals narrow to integers, and text parses
    /// to a timestamp when it is RFC 3339 or `YYYY-MM-DD HH:MM:SS[.f]`.
    pub fn coerce_to(&self, target: SemanticType) -> Option<Value> {
        match (self, target) {
            (v, t) if v.semantic_type() == t => Some(v.clone()),
            (Value::Integer(i), SemanticType::Real) => Some(Value::Real(*i as f64)),
            (Value::Real(r), SemanticType::Integer) => {
                if r.fract() == 0.0 && *r >= i64::MIN as f64 && *r < i64::MAX as f64 {
                    Some(Value::Integer(*r as i64))
                } else {
                    None
                }
            }
            (Value::Text(s), SemanticType::Timestamp) => parse_timestamp(s).map(Value::Timestamp),
            _ => None,
        }
    }

    /// Orders two values the way a comparison predicate sees them.
    ///
    /// Integers and reals compare numerically; text and timestamps compare within
    /// their own type. Returns `None` for incomparable pairs and for NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Real(b)) => cmp_i64_f64(*a, *b),
            (Value::Real(a), Value::Integer(b)) => cmp_i64_f64(*b, *a).map(Ordering::reverse),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Integer(_) => 0,
            Value::Real(_) => 1,
            Value::Text(_) => 2,
            Value::Timestamp(_) => 3,
        }
    }
}

/// Compares an integer with a real without rounding the integer through `f64`.
///
/// Returns `None` when `real` is NaN.
pub(crate) fn cmp_i64_f64(int: i64, real: f64) -> Option<Ordering> {
    // 2^63, the first real above every i64
    const I64_END: f64 = 9_223_372_036_854_775_808.0;
    if real.is_nan() {
        return None;
    }
    if real >= I64_END {
        return Some(Ordering::Less);
    }
    if real < -I64_END {
        return Some(Ordering::Greater);
    }
    let whole = real.trunc();
    let ordering = int.cmp(&(whole as i64));
    if ordering != Ordering::Equal {
        return Some(ordering);
    }
    Some(0.0_f64.total_cmp(&(real - whole)))
}

/// `-0.0` and `0.0` are the same member of a set.
fn canonical_real(r: f64) -> f64 {
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Converts Arrow microseconds since the epoch, clamping outside chrono's range.
pub(crate) fn micros_to_datetime(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or(if micros < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Real(a), Value::Real(b)) => canonical_real(*a).total_cmp(&canonical_real(*b)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Integer(i) => i.hash(state),
            Value::Real(r) => canonical_real(*r).to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Timestamp(ts) => ts.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::{BTreeSet, HashSet};

    #[test]
    fn test_text_equality_is_case_sensitive() {
        assert_ne!(Value::from("usd"), Value::from("USD"));
        assert_eq!(Value::from("USD"), Value::from("USD"));
    }

    #[test]
    fn test_integer_and_real_are_distinct_set_members() {
        let set: BTreeSet<Value> = [Value::Integer(1), Value::Real(1.0)].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(
            Value::Integer(3).coerce_to(SemanticType::Real),
            Some(Value::Real(3.0))
        );
        assert_eq!(
            Value::Real(3.0).coerce_to(SemanticType::Integer),
            Some(Value::Integer(3))
        );
        assert_eq!(Value::Real(3.5).coerce_to(SemanticType::Integer), None);
        assert_eq!(Value::from("3").coerce_to(SemanticType::Integer), None);
    }

    #[test]
    fn test_coerce_text_to_timestamp() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            Value::from("2024-01-02T03:04:05Z").coerce_to(SemanticType::Timestamp),
            Some(Value::Timestamp(expected))
        );
        assert_eq!(
            Value::from("2024-01-02 03:04:05").coerce_to(SemanticType::Timestamp),
            Some(Value::Timestamp(expected))
        );
        assert_eq!(
            Value::from("yesterday").coerce_to(SemanticType::Timestamp),
            None
        );
    }

    #[test]
    fn test_compare_mixed_numeric() {
        assert_eq!(
            Value::Integer(2).compare(&Value::Real(1.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Real(f64::NAN).compare(&Value::Real(1.0)), None);
        assert_eq!(Value::from("a").compare(&Value::Integer(1)), None);
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert_eq!(Value::Real(-0.0), Value::Real(0.0));
        let set: HashSet<Value> = [Value::Real(0.0)].into_iter().collect();
        assert!(set.contains(&Value::Real(-0.0)));
    }

    #[test]
    fn test_compare_integer_with_real_is_exact() {
        let limit = 9_007_199_254_740_992_i64; // 2^53
        assert_eq!(cmp_i64_f64(limit + 1, limit as f64), Some(Ordering::Greater));
        assert_eq!(cmp_i64_f64(limit, limit as f64), Some(Ordering::Equal));
        assert_eq!(cmp_i64_f64(-3, -3.5), Some(Ordering::Greater));
        assert_eq!(cmp_i64_f64(3, 3.5), Some(Ordering::Less));
        assert_eq!(cmp_i64_f64(i64::MAX, 9.3e18), Some(Ordering::Less));
        assert_eq!(cmp_i64_f64(i64::MIN, -9.3e18), Some(Ordering::Greater));
        assert_eq!(cmp_i64_f64(0, f64::NAN), None);
        assert_eq!(
            Value::Real(limit as f64).compare(&Value::Integer(limit + 1)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_comparable_types() {
        assert!(SemanticType::Integer.is_comparable_with(SemanticType::Real));
        assert!(SemanticType::Timestamp.is_comparable_with(SemanticType::Timestamp));
        assert!(!SemanticType::Text.is_comparable_with(SemanticType::Integer));
    }

    #[test]
    fn test_untagged_serialization() {
        let json = serde_json::to_string(&vec![
            Value::Integer(1),
            Value::Real(0.5),
            Value::from("AB12"),
        ])
        .unwrap();
        assert_eq!(json, r#"[1,0.5,"AB12"]"#);

        let parsed: Vec<Value> = serde_json::from_str(r#"[0, 1, "USD"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![Value::Integer(0), Value::Integer(1), Value::from("USD")]
        );
    }

    #[test]
    fn test_micros_to_datetime_clamps() {
        assert_eq!(micros_to_datetime(0), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(micros_to_datetime(i64::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
