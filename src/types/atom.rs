//! Leaf descriptor: one scalar value.
use std::fmt;

use super::reference::{Entry, ReferenceWriter};
use super::walker::{Meta, ValidateContext, Walk};
use super::{Comment, Name, Optional, Scalar, ScalarType};
use crate::error::{Error, FaultKind, SchemaDeclarationError};
use crate::pset::Value;
use crate::types::BoundValue;

/// Typed front for declaring an atom of scalar type `T`.
#[derive(Debug, Clone)]
pub struct Atom<T> {
    name: Name,
    comment: Comment,
    default: Option<T>,
}

/// Type-erased atom stored in the descriptor tree.
#[derive(Debug, Clone)]
pub struct AtomNode {
    pub(crate) meta: Meta,
    type_name: &'static str,
    decode: fn(&str) -> Result<Scalar, String>,
    default: Option<Scalar>,
}

impl<T: ScalarType> Atom<T> {
    /// A required atom.
    pub fn new(name: Name) -> Self {
        Self { name, comment: Comment::default(), default: None }
    }

    pub fn with_default(name: Name, default: T) -> Self {
        Self { default: Some(default), ..Self::new(name) }
    }

    /// An unnamed atom for use as a sequence or tuple element.
    pub fn element() -> Self {
        Self::new(Name::sequence_element(0))
    }

    pub fn comment(mut self, comment: impl Into<Comment>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn optional(self) -> Optional {
        Optional::new(self)
    }

    pub(crate) fn into_node(self) -> AtomNode {
        let mut meta = Meta::new(self.name);
        meta.comment = self.comment;
        AtomNode {
            meta,
            type_name: T::TYPE_NAME,
            decode: |literal| T::decode(literal).map(T::into_scalar),
            default: self.default.map(T::into_scalar),
        }
    }
}

impl AtomNode {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
    pub fn default_value(&self) -> Option<&Scalar> {
        self.default.as_ref()
    }

    fn decode_value(&self, value: &Value) -> Result<Scalar, FaultKind> {
        let literal = value.as_atom().ok_or_else(|| FaultKind::TypeMismatch {
            expected: self.type_name.to_string(),
            found: value.shape().to_string(),
        })?;
        (self.decode)(literal).map_err(|reason| FaultKind::TypeMismatch {
            expected: self.type_name.to_string(),
            found: format!("'{literal}' ({reason})"),
        })
    }
}

impl Walk for AtomNode {
    fn meta(&self) -> &Meta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn declare(&mut self, parent: &str) -> Result<(), SchemaDeclarationError> {
        self.meta.qualify(parent)
    }

    fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn validate_present(&self, key: &str, value: &Value, cx: &mut ValidateContext<'_>) {
        if let Err(kind) = self.decode_value(value) {
            cx.fault(key, kind);
        }
    }

    fn bind_present(&self, key: &str, value: &Value) -> Result<BoundValue, Error> {
        self.decode_value(value)
            .map(BoundValue::Scalar)
            .map_err(|kind| Error::InconsistentBind { key: key.to_string(), reason: kind.label().into() })
    }

    fn bind_absent(&self, key: &str) -> Result<Option<BoundValue>, Error> {
        match &self.default {
            Some(default) => Ok(Some(BoundValue::Scalar(default.clone()))),
            None => Err(Error::InconsistentBind {
                key: key.to_string(),
                reason: "required atom has no value".into(),
            }),
        }
    }

    fn describe(&self, out: &mut ReferenceWriter<'_>, entry: Entry<'_>) -> fmt::Result {
        out.comment(&self.meta.comment)?;
        match &self.default {
            Some(default) => out.line(&entry, &default.to_literal(), Some("default")),
            None => out.line(&entry, &format!("<{}>", self.type_name), None),
        }
    }
}
