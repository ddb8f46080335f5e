//! The parameter set: an immutable, insertion-ordered, hierarchical
//! key/value tree produced by a reader and consumed by everything else.
//!
//! Atoms keep their literal source text; nothing is interpreted until a
//! descriptor (or [`ParameterSet::get`]) asks for a concrete scalar type.
pub mod json;
pub mod print;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Error;
use crate::types::ScalarType;

pub use print::PrintMode;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Where a value was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub source: Arc<str>,
    pub line: u32,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// Literal text, exactly as written.
    Atom(String),
    Sequence(Vec<Value>),
    Table(ParameterSet),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub origin: Option<Origin>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: IndexMap<String, Value>,
}

/// One step of a dotted key such as `a.b[2].c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeySegment<'a> {
    Name(&'a str),
    Index(usize),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Value {
    pub fn atom(literal: impl Into<String>) -> Self {
        Self { kind: ValueKind::Atom(literal.into()), origin: None }
    }
    pub fn sequence(elements: Vec<Value>) -> Self {
        Self { kind: ValueKind::Sequence(elements), origin: None }
    }
    pub fn table(pset: ParameterSet) -> Self {
        Self { kind: ValueKind::Table(pset), origin: None }
    }
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn as_atom(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Atom(text) => Some(text),
            _ => None,
        }
    }
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::Sequence(xs) => Some(xs),
            _ => None,
        }
    }
    pub fn as_table(&self) -> Option<&ParameterSet> {
        match &self.kind {
            ValueKind::Table(pset) => Some(pset),
            _ => None,
        }
    }

    /// Human name of the value's shape, used in fault messages.
    pub fn shape(&self) -> &'static str {
        match self.kind {
            ValueKind::Atom(_) => "an atom",
            ValueKind::Sequence(_) => "a sequence",
            ValueKind::Table(_) => "a table",
        }
    }

    fn descend(&self, segment: &KeySegment<'_>) -> Option<&Value> {
        match (segment, &self.kind) {
            (KeySegment::Name(name), ValueKind::Table(pset)) => pset.entries.get(*name),
            (KeySegment::Index(i), ValueKind::Sequence(xs)) => xs.get(*i),
            _ => None,
        }
    }
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Direct member of this table, no path interpretation.
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Looks up a dotted key with optional indices, e.g. `a.b[2].c`.
    pub fn value_at(&self, key: &str) -> Option<&Value> {
        let segments = split_key(key)?;
        let (first, rest) = segments.split_first()?;
        let KeySegment::Name(first) = first else { return None };
        let mut current = self.entries.get(*first)?;
        for segment in rest {
            current = current.descend(segment)?;
        }
        Some(current)
    }

    pub fn has(&self, key: &str) -> bool {
        self.value_at(key).is_some()
    }

    /// Decodes the atom at `key` as `T`.
    pub fn get<T: ScalarType>(&self, key: &str) -> Result<T, Error> {
        let value = self
            .value_at(key)
            .ok_or_else(|| Error::KeyNotFound { key: key.to_string() })?;
        let wrong_type = || Error::WrongType {
            key: key.to_string(),
            expected: T::TYPE_NAME.to_string(),
        };
        let literal = value.as_atom().ok_or_else(wrong_type)?;
        T::decode(literal).map_err(|_| wrong_type())
    }

    pub fn to_indented_string(&self, level: usize, mode: PrintMode) -> String {
        print::render(self, level, mode)
    }

    /// Assembly is reserved to readers inside the crate. A repeated key keeps
    /// its first position and takes the new value.
    pub(crate) fn insert(&mut self, key: String, value: Value) {
        self.entries.insert(key, value);
    }

    pub(crate) fn get_value_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries.get_mut(name)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut pset = ParameterSet::new();
        for (key, value) in iter {
            pset.insert(key.into(), value);
        }
        pset
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_indented_string(0, PrintMode::Raw))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Splits `a.b[2].c` into segments; `None` for malformed keys.
pub(crate) fn split_key(key: &str) -> Option<Vec<KeySegment<'_>>> {
    let mut out = Vec::new();
    for part in key.split('.') {
        let (name, mut indices) = match part.find('[') {
            Some(at) => (&part[..at], &part[at..]),
            None => (part, ""),
        };
        if name.is_empty() {
            // a bare index is only legal right after a name, e.g. `a[0][1]`
            return None;
        }
        out.push(KeySegment::Name(name));
        while !indices.is_empty() {
            let close = indices.find(']')?;
            if !indices.starts_with('[') {
                return None;
            }
            let index = indices[1..close].parse::<usize>().ok()?;
            out.push(KeySegment::Index(index));
            indices = &indices[close + 1..];
        }
    }
    Some(out)
}
