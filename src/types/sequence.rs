//! Ordered collections: homogeneous [`Sequence`] and fixed-arity [`Tuple`].
use std::fmt;

use super::key::index_key;
use super::reference::{Entry, ReferenceWriter};
use super::walker::{conform_default, Meta, ValidateContext, Walk};
use super::{Atom, BoundValue, Comment, Descriptor, Name, Optional, ScalarType};
use crate::error::{Error, FaultKind, LengthBound, SchemaDeclarationError};
use crate::pset::Value;

/// A list of values sharing one element descriptor.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub(crate) meta: Meta,
    element: Box<Descriptor>,
    bound: LengthBound,
    default: Option<BoundValue>,
}

/// A fixed-arity list whose positions each have their own descriptor.
#[derive(Debug, Clone)]
pub struct Tuple {
    pub(crate) meta: Meta,
    elements: Vec<Descriptor>,
    default: Option<BoundValue>,
}

// ————————————————————————————————————————————————————————————————————————————
// SEQUENCE
// ————————————————————————————————————————————————————————————————————————————

impl Sequence {
    /// Unbounded sequence of `element`.
    pub fn new(name: Name, element: impl Into<Descriptor>) -> Self {
        let mut element = element.into();
        element.rename(Name::sequence_element(0));
        Self {
            meta: Meta::new(name),
            element: Box::new(element),
            bound: LengthBound::Unbounded,
            default: None,
        }
    }

    /// Shorthand for a sequence of atoms.
    pub fn of<T: ScalarType>(name: Name) -> Self {
        Self::new(name, Atom::<T>::element())
    }

    pub fn fixed(mut self, len: usize) -> Self {
        self.bound = LengthBound::Exactly(len);
        self
    }

    pub fn bounded(mut self, min: usize, max: usize) -> Self {
        self.bound = LengthBound::Between { min, max };
        self
    }

    /// Whole-sequence default used verbatim when the key is absent.
    pub fn with_default(mut self, default: impl Into<BoundValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<Comment>) -> Self {
        self.meta.comment = comment.into();
        self
    }

    pub fn optional(self) -> Optional {
        Optional::new(self)
    }

    pub fn bound(&self) -> LengthBound {
        self.bound
    }

    pub fn element(&self) -> &Descriptor {
        &self.element
    }
}

impl Walk for Sequence {
    fn meta(&self) -> &Meta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn declare(&mut self, parent: &str) -> Result<(), SchemaDeclarationError> {
        self.meta.qualify(parent)?;
        self.element.declare(&self.meta.key)?;
        check_element(&self.element)?;
        if let LengthBound::Between { min, max } = self.bound {
            if min > max {
                return Err(SchemaDeclarationError::InvalidBounds { key: self.meta.key.clone(), min, max });
            }
        }
        if let Some(default) = self.default.take() {
            self.default = Some(conform_default(&*self, &default)?);
        }
        Ok(())
    }

    fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn validate_present(&self, key: &str, value: &Value, cx: &mut ValidateContext<'_>) {
        let Some(elements) = value.as_sequence() else {
            cx.fault(key, FaultKind::NotASequence { found: value.shape().to_string() });
            return;
        };
        if !self.bound.admits(elements.len()) {
            cx.fault(key, FaultKind::LengthOutOfBounds { expected: self.bound, found: elements.len() });
        }
        for (i, element) in elements.iter().enumerate() {
            self.element.validate(&index_key(key, i), Some(element), cx);
        }
    }

    fn bind_present(&self, key: &str, value: &Value) -> Result<BoundValue, Error> {
        let elements = value.as_sequence().ok_or_else(|| not_a_sequence(key))?;
        elements
            .iter()
            .enumerate()
            .map(|(i, element)| self.element.bind_required(&index_key(key, i), element))
            .collect::<Result<Vec<_>, _>>()
            .map(BoundValue::Sequence)
    }

    fn bind_absent(&self, key: &str) -> Result<Option<BoundValue>, Error> {
        self.default.clone().map(Some).ok_or_else(|| no_default(key))
    }

    fn describe(&self, out: &mut ReferenceWriter<'_>, entry: Entry<'_>) -> fmt::Result {
        out.comment(&self.meta.comment)?;
        let length = match self.bound {
            LengthBound::Unbounded => None,
            bound => Some(format!("length {bound}")),
        };
        if let Some(default) = &self.default {
            let note = match length {
                Some(length) => format!("default, {length}"),
                None => "default".to_string(),
            };
            return out.line(&entry, &default.to_literal(), Some(&note));
        }
        out.line(&entry, "[", length.as_deref())?;
        out.indented(|out| {
            self.element.describe(out, Entry::element())?;
            out.separate();
            out.line(&Entry::element(), "...", None)
        })?;
        out.close("]")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TUPLE
// ————————————————————————————————————————————————————————————————————————————

impl Tuple {
    /// An empty tuple; add positions with [`Tuple::element`].
    pub fn new(name: Name) -> Self {
        Self { meta: Meta::new(name), elements: Vec::new(), default: None }
    }

    pub fn element(mut self, element: impl Into<Descriptor>) -> Self {
        let mut element = element.into();
        element.rename(Name::sequence_element(self.elements.len()));
        self.elements.push(element);
        self
    }

    pub fn with_default(mut self, default: impl Into<BoundValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<Comment>) -> Self {
        self.meta.comment = comment.into();
        self
    }

    pub fn optional(self) -> Optional {
        Optional::new(self)
    }

    pub fn arity(&self) -> usize {
        self.elements.len()
    }

    pub fn elements(&self) -> &[Descriptor] {
        &self.elements
    }
}

impl Walk for Tuple {
    fn meta(&self) -> &Meta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn declare(&mut self, parent: &str) -> Result<(), SchemaDeclarationError> {
        self.meta.qualify(parent)?;
        if self.elements.is_empty() {
            return Err(SchemaDeclarationError::EmptyTuple { key: self.meta.key.clone() });
        }
        for element in &mut self.elements {
            element.declare(&self.meta.key)?;
            check_element(element)?;
        }
        if let Some(default) = self.default.take() {
            self.default = Some(conform_default(&*self, &default)?);
        }
        Ok(())
    }

    fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn validate_present(&self, key: &str, value: &Value, cx: &mut ValidateContext<'_>) {
        let Some(values) = value.as_sequence() else {
            cx.fault(key, FaultKind::NotASequence { found: value.shape().to_string() });
            return;
        };
        if values.len() != self.elements.len() {
            cx.fault(key, FaultKind::ArityMismatch { expected: self.elements.len(), found: values.len() });
        }
        for (i, (element, value)) in self.elements.iter().zip(values).enumerate() {
            element.validate(&index_key(key, i), Some(value), cx);
        }
    }

    fn bind_present(&self, key: &str, value: &Value) -> Result<BoundValue, Error> {
        let values = value.as_sequence().ok_or_else(|| not_a_sequence(key))?;
        if values.len() != self.elements.len() {
            return Err(Error::InconsistentBind { key: key.to_string(), reason: "arity changed".into() });
        }
        self.elements
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (element, value))| element.bind_required(&index_key(key, i), value))
            .collect::<Result<Vec<_>, _>>()
            .map(BoundValue::Sequence)
    }

    fn bind_absent(&self, key: &str) -> Result<Option<BoundValue>, Error> {
        self.default.clone().map(Some).ok_or_else(|| no_default(key))
    }

    fn describe(&self, out: &mut ReferenceWriter<'_>, entry: Entry<'_>) -> fmt::Result {
        out.comment(&self.meta.comment)?;
        if let Some(default) = &self.default {
            return out.line(&entry, &default.to_literal(), Some("default"));
        }
        out.line(&entry, "[", None)?;
        out.indented(|out| {
            for (i, element) in self.elements.iter().enumerate() {
                element.describe(out, Entry::element())?;
                if i + 1 < self.elements.len() {
                    out.separate();
                }
            }
            Ok(())
        })?;
        out.close("]")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Elements are positional: they can be neither optional nor defaulted.
fn check_element(element: &Descriptor) -> Result<(), SchemaDeclarationError> {
    let key = element.key().to_string();
    if element.is_optional() {
        return Err(SchemaDeclarationError::OptionalElement { key });
    }
    if element.has_default() {
        return Err(SchemaDeclarationError::DefaultedElement { key });
    }
    Ok(())
}

fn not_a_sequence(key: &str) -> Error {
    Error::InconsistentBind { key: key.to_string(), reason: "value is not a sequence".into() }
}

fn no_default(key: &str) -> Error {
    Error::InconsistentBind { key: key.to_string(), reason: "no value and no default".into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Composite;

    fn declared(d: impl Into<Descriptor>) -> Result<Descriptor, SchemaDeclarationError> {
        let mut d = d.into();
        d.declare("")?;
        Ok(d)
    }

    fn faults(d: &Descriptor, value: &Value) -> Vec<&'static str> {
        let mut cx = ValidateContext::new(&[]);
        d.validate(d.key(), Some(value), &mut cx);
        cx.faults.iter().map(|f| f.kind.label()).collect()
    }

    fn atoms(xs: &[&str]) -> Value {
        Value::sequence(xs.iter().map(|x| Value::atom(*x)).collect())
    }

    #[test]
    fn sequence_length_and_element_faults_are_both_reported() {
        let d = declared(Sequence::of::<u32>(Name::new("xs")).bounded(1, 2)).unwrap();
        assert!(faults(&d, &atoms(&["1", "2"])).is_empty());
        assert_eq!(faults(&d, &atoms(&[])), ["LengthOutOfBounds"]);
        assert_eq!(faults(&d, &atoms(&["1", "x", "-3"])), ["LengthOutOfBounds", "TypeMismatch", "TypeMismatch"]);
        assert_eq!(faults(&d, &Value::atom("1")), ["NotASequence"]);
    }

    #[test]
    fn element_faults_are_namespaced_by_position() {
        let d = declared(Sequence::of::<i32>(Name::new("xs"))).unwrap();
        let mut cx = ValidateContext::new(&[]);
        d.validate("xs", Some(&atoms(&["1", "two"])), &mut cx);
        assert_eq!(cx.faults.len(), 1);
        assert_eq!(cx.faults[0].key, "xs[1]");
    }

    #[test]
    fn sequence_default_is_used_verbatim_when_absent() {
        let d = declared(
            Sequence::of::<String>(Name::new("composers"))
                .fixed(2)
                .with_default(["Mahler", "Elgar"]),
        )
        .unwrap();
        assert_eq!(
            d.bind("composers", None).unwrap(),
            Some(BoundValue::from(vec!["Mahler", "Elgar"]))
        );
        assert_eq!(faults(&d, &atoms(&["Beethoven"])), ["LengthOutOfBounds"]);
    }

    #[test]
    fn nested_sequences_and_table_elements() {
        let row = Composite::build(Name::new("row"), |t| {
            t.add(Atom::<i32>::new(Name::new("a")))?;
            Ok(())
        })
        .unwrap();
        let d = declared(Sequence::new(Name::new("rows"), row)).unwrap();
        let good: crate::pset::ParameterSet = [("a", Value::atom("1"))].into_iter().collect();
        let bad: crate::pset::ParameterSet = [("b", Value::atom("1"))].into_iter().collect();
        let mut cx = ValidateContext::new(&[]);
        d.validate("rows", Some(&Value::sequence(vec![Value::table(good), Value::table(bad)])), &mut cx);
        let got: Vec<_> = cx.faults.iter().map(|f| (f.key.as_str(), f.kind.label())).collect();
        assert_eq!(got, [("rows[1].a", "MissingRequiredKey"), ("rows[1].b", "UnknownKey")]);

        let matrix = declared(Sequence::new(Name::new("m"), Sequence::of::<f64>(Name::new("row")).fixed(2))).unwrap();
        let value = Value::sequence(vec![atoms(&["1", "2"]), atoms(&["3"])]);
        assert_eq!(faults(&matrix, &value), ["LengthOutOfBounds"]);
    }

    #[test]
    fn tuple_arity_and_positions() {
        let d = declared(
            Tuple::new(Name::new("ages"))
                .element(Atom::<String>::element())
                .element(Atom::<u32>::element())
                .with_default(("David", 9)),
        )
        .unwrap();
        assert_eq!(d.bind("ages", None).unwrap(), Some(BoundValue::from(("David", 9u32))));
        assert_eq!(faults(&d, &atoms(&["Jenny"])), ["ArityMismatch"]);
        assert_eq!(faults(&d, &atoms(&["Jenny", "old"])), ["TypeMismatch"]);
        assert!(faults(&d, &atoms(&["Jenny", "30"])).is_empty());
        assert_eq!(faults(&d, &Value::table(Default::default())), ["NotASequence"]);
    }

    #[test]
    fn declaration_checks() {
        let optional_element = Sequence::new(Name::new("xs"), Atom::<i32>::element().optional());
        assert!(matches!(declared(optional_element), Err(SchemaDeclarationError::OptionalElement { .. })));

        let defaulted_element = Tuple::new(Name::new("t")).element(Atom::with_default(Name::new("x"), 1i32));
        assert!(matches!(declared(defaulted_element), Err(SchemaDeclarationError::DefaultedElement { .. })));

        assert!(matches!(declared(Tuple::new(Name::new("t"))), Err(SchemaDeclarationError::EmptyTuple { .. })));

        let inverted = Sequence::of::<i32>(Name::new("xs")).bounded(3, 1);
        assert!(matches!(declared(inverted), Err(SchemaDeclarationError::InvalidBounds { min: 3, max: 1, .. })));

        let bad_default = Sequence::of::<u32>(Name::new("xs")).fixed(2).with_default(vec![-1i32, 2]);
        assert!(matches!(declared(bad_default), Err(SchemaDeclarationError::InvalidDefault { .. })));
    }
}
