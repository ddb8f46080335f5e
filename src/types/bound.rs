//! The plain value tree produced by a successful bind. It holds no
//! descriptors and no reference to the parameter set it came from.
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use super::{Scalar, ScalarType};
use crate::error::Error;
use crate::pset::{split_key, KeySegment, ParameterSet, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Scalar(Scalar),
    Sequence(Vec<BoundValue>),
    Table(BoundTable),
}

/// Bound members in declaration order. Absent optional members are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BoundTable {
    entries: IndexMap<String, BoundValue>,
}

/// Conversion out of the plain value tree.
pub trait FromBound: Sized {
    fn from_bound(value: &BoundValue) -> Option<Self>;
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl BoundValue {
    /// Inline configuration-text rendering.
    pub fn to_literal(&self) -> String {
        match self {
            BoundValue::Scalar(s) => s.to_literal(),
            BoundValue::Sequence(xs) => {
                let parts: Vec<String> = xs.iter().map(BoundValue::to_literal).collect();
                format!("[{}]", parts.join(", "))
            }
            BoundValue::Table(t) if t.is_empty() => "{}".into(),
            BoundValue::Table(t) => {
                let parts: Vec<String> = t
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.to_literal()))
                    .collect();
                format!("{{ {} }}", parts.join(" "))
            }
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            BoundValue::Scalar(s) => Value::atom(s.to_literal()),
            BoundValue::Sequence(xs) => Value::sequence(xs.iter().map(BoundValue::to_value).collect()),
            BoundValue::Table(t) => Value::table(t.to_parameter_set()),
        }
    }

    fn descend(&self, segment: &KeySegment<'_>) -> Option<&BoundValue> {
        match (segment, self) {
            (KeySegment::Name(name), BoundValue::Table(t)) => t.entries.get(*name),
            (KeySegment::Index(i), BoundValue::Sequence(xs)) => xs.get(*i),
            _ => None,
        }
    }
}

impl BoundTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Dotted lookup, e.g. `inner.values[1]`.
    pub fn get(&self, key: &str) -> Option<&BoundValue> {
        let segments = split_key(key)?;
        let (first, rest) = segments.split_first()?;
        let KeySegment::Name(first) = first else { return None };
        let mut current = self.entries.get(*first)?;
        for segment in rest {
            current = current.descend(segment)?;
        }
        Some(current)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn value<T: FromBound>(&self, key: &str) -> Result<T, Error> {
        let value = self
            .get(key)
            .ok_or_else(|| Error::KeyNotFound { key: key.to_string() })?;
        T::from_bound(value).ok_or_else(|| Error::WrongType {
            key: key.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
    }

    /// Presence accessor: `Ok(true)` and `out` filled when the key was bound,
    /// `Ok(false)` with `out` untouched when it was absent.
    pub fn value_if_present<T: FromBound>(&self, key: &str, out: &mut T) -> Result<bool, Error> {
        if !self.contains(key) {
            return Ok(false);
        }
        *out = self.value(key)?;
        Ok(true)
    }

    /// Typed extraction into a client struct through serde.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let json = self.to_json();
        crate::path_de::from_value_with_path(json).map_err(Error::Extract)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Re-expresses the bound values as an (origin-free) parameter set, so
    /// they can be printed and read back.
    pub fn to_parameter_set(&self) -> ParameterSet {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect()
    }

    pub(crate) fn insert(&mut self, key: String, value: BoundValue) {
        self.entries.insert(key, value);
    }
}

impl Serialize for BoundValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BoundValue::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            BoundValue::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
            BoundValue::Scalar(Scalar::UInt(u)) => serializer.serialize_u64(*u),
            BoundValue::Scalar(Scalar::Float(f)) => serializer.serialize_f64(*f),
            BoundValue::Scalar(Scalar::String(s)) => serializer.serialize_str(s),
            BoundValue::Sequence(xs) => xs.serialize(serializer),
            BoundValue::Table(t) => t.serialize(serializer),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSIONS
// ————————————————————————————————————————————————————————————————————————————

macro_rules! scalar_conversions {
    ($($t:ty),*) => {$(
        impl From<$t> for BoundValue {
            fn from(value: $t) -> Self {
                BoundValue::Scalar(value.into_scalar())
            }
        }
        impl FromBound for $t {
            fn from_bound(value: &BoundValue) -> Option<Self> {
                match value {
                    BoundValue::Scalar(s) => <$t as ScalarType>::from_scalar(s),
                    _ => None,
                }
            }
        }
    )*};
}

scalar_conversions!(bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String);

impl From<&str> for BoundValue {
    fn from(value: &str) -> Self {
        BoundValue::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<Scalar> for BoundValue {
    fn from(value: Scalar) -> Self {
        BoundValue::Scalar(value)
    }
}

impl From<BoundTable> for BoundValue {
    fn from(value: BoundTable) -> Self {
        BoundValue::Table(value)
    }
}

impl<T: Into<BoundValue>> From<Vec<T>> for BoundValue {
    fn from(values: Vec<T>) -> Self {
        BoundValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<BoundValue>, const N: usize> From<[T; N]> for BoundValue {
    fn from(values: [T; N]) -> Self {
        BoundValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl FromBound for BoundValue {
    fn from_bound(value: &BoundValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromBound for BoundTable {
    fn from_bound(value: &BoundValue) -> Option<Self> {
        match value {
            BoundValue::Table(t) => Some(t.clone()),
            _ => None,
        }
    }
}

impl<T: FromBound> FromBound for Vec<T> {
    fn from_bound(value: &BoundValue) -> Option<Self> {
        match value {
            BoundValue::Sequence(xs) => xs.iter().map(T::from_bound).collect(),
            _ => None,
        }
    }
}

macro_rules! tuple_conversions {
    ($len:literal => $($name:ident : $idx:tt),+) => {
        impl<$($name: Into<BoundValue>),+> From<($($name,)+)> for BoundValue {
            fn from(value: ($($name,)+)) -> Self {
                BoundValue::Sequence(vec![$(value.$idx.into()),+])
            }
        }
        impl<$($name: FromBound),+> FromBound for ($($name,)+) {
            fn from_bound(value: &BoundValue) -> Option<Self> {
                match value {
                    BoundValue::Sequence(xs) if xs.len() == $len => {
                        Some(($($name::from_bound(&xs[$idx])?,)+))
                    }
                    _ => None,
                }
            }
        }
    };
}

tuple_conversions!(1 => A: 0);
tuple_conversions!(2 => A: 0, B: 1);
tuple_conversions!(3 => A: 0, B: 1, C: 2);
tuple_conversions!(4 => A: 0, B: 1, C: 2, D: 3);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BoundTable {
        let mut inner = BoundTable::default();
        inner.insert("values".into(), vec![1u32, 2, 3].into());
        let mut table = BoundTable::default();
        table.insert("name".into(), "David".into());
        table.insert("age".into(), ("David", 9u32).into());
        table.insert("inner".into(), inner.into());
        table
    }

    #[test]
    fn typed_reads() {
        let table = sample();
        assert_eq!(table.value::<String>("name").unwrap(), "David");
        assert_eq!(table.value::<(String, u32)>("age").unwrap(), ("David".to_string(), 9));
        assert_eq!(table.value::<Vec<u64>>("inner.values").unwrap(), vec![1, 2, 3]);
        assert_eq!(table.value::<u8>("inner.values[2]").unwrap(), 3);
        assert!(matches!(table.value::<bool>("name"), Err(Error::WrongType { .. })));
        assert!(matches!(table.value::<bool>("nope"), Err(Error::KeyNotFound { .. })));
    }

    #[test]
    fn presence_accessor_leaves_out_param_alone_when_absent() {
        let table = sample();
        let mut out = 42u32;
        assert!(!table.value_if_present("missing", &mut out).unwrap());
        assert_eq!(out, 42);
        assert!(table.value_if_present("inner.values[0]", &mut out).unwrap());
        assert_eq!(out, 1);
    }

    #[test]
    fn json_view_and_literals() {
        let table = sample();
        assert_eq!(
            table.to_json(),
            serde_json::json!({"name": "David", "age": ["David", 9], "inner": {"values": [1, 2, 3]}})
        );
        assert_eq!(
            BoundValue::Table(table).to_literal(),
            "{ name: \"David\" age: [\"David\", 9] inner: { values: [1, 2, 3] } }"
        );
    }
}
