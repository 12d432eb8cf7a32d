//! Ordered keys for property values.
//!
//! Ordering is Bool < Number < String. Integers and floats share one numeric
//! domain so `41` and `41.0` collide. Null, arrays and objects are not indexed.

use serde_json::Value;
use std::cmp::Ordering;
use std::ops::{Bound, RangeBounds};

#[derive(Debug, Clone, Copy)]
pub struct NumKey(f64);

impl NumKey {
    pub fn new(v: f64) -> Self {
        // fold -0.0 into 0.0 so equal values hash/compare equal
        Self(if v == 0.0 { 0.0 } else { v })
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl PartialEq for NumKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NumKey {}

impl PartialOrd for NumKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for NumKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

/// Index key derived from a JSON property value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKey {
    Bool(bool),
    Number(NumKey),
    String(String),
}

impl ValueKey {
    /// Create a key from a JSON value; `None` for values that are not indexed.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ValueKey::Bool(*b)),
            Value::Number(n) => n.as_f64().filter(|f| !f.is_nan()).map(|f| ValueKey::Number(NumKey::new(f))),
            Value::String(s) => Some(ValueKey::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ValueKey::Bool(b) => Value::Bool(*b),
            ValueKey::Number(n) => {
                let f = n.get();
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Value::from(f as i64)
                } else {
                    Value::from(f)
                }
            }
            ValueKey::String(s) => Value::String(s.clone()),
        }
    }
}

/// Inclusive key range. An open bound stays inside the type of the other
/// bound, so `[.., 10]` never picks up booleans. Bounds of different types
/// match nothing.
#[derive(Debug, Clone)]
pub struct KeyRange {
    lo: Bound<ValueKey>,
    hi: Bound<ValueKey>,
}

impl KeyRange {
    /// Build from optional JSON bounds; `None` when the range is empty.
    pub fn new(min: Option<&Value>, max: Option<&Value>) -> Option<Self> {
        let min = match min {
            Some(v) => Some(ValueKey::from_json(v)?),
            None => None,
        };
        let max = match max {
            Some(v) => Some(ValueKey::from_json(v)?),
            None => None,
        };

        let (lo, hi) = match (min, max) {
            (None, None) => (Bound::Unbounded, Bound::Unbounded),
            (Some(a), None) => (Bound::Included(a.clone()), a.type_ceiling()),
            (None, Some(b)) => (b.type_floor(), Bound::Included(b)),
            (Some(a), Some(b)) => {
                if std::mem::discriminant(&a) != std::mem::discriminant(&b) || a > b {
                    return None;
                }
                (Bound::Included(a), Bound::Included(b))
            }
        };
        Some(Self { lo, hi })
    }

    pub fn contains_key(&self, key: &ValueKey) -> bool {
        RangeBounds::contains(self, key)
    }
}

impl RangeBounds<ValueKey> for KeyRange {
    fn start_bound(&self) -> Bound<&ValueKey> {
        self.lo.as_ref()
    }

    fn end_bound(&self) -> Bound<&ValueKey> {
        self.hi.as_ref()
    }
}

impl ValueKey {
    fn type_floor(&self) -> Bound<ValueKey> {
        match self {
            ValueKey::Bool(_) => Bound::Included(ValueKey::Bool(false)),
            ValueKey::Number(_) => Bound::Included(ValueKey::Number(NumKey::new(f64::NEG_INFINITY))),
            ValueKey::String(_) => Bound::Included(ValueKey::String(String::new())),
        }
    }

    fn type_ceiling(&self) -> Bound<ValueKey> {
        match self {
            ValueKey::Bool(_) => Bound::Included(ValueKey::Bool(true)),
            ValueKey::Number(_) => Bound::Included(ValueKey::Number(NumKey::new(f64::INFINITY))),
            ValueKey::String(_) => Bound::Unbounded,
        }
    }
}
