use std::fmt;

use super::reference::{Entry, ReferenceWriter};
use super::walker::{Meta, ValidateContext, Walk};
use super::{BoundValue, Descriptor};
use crate::error::{Error, SchemaDeclarationError};
use crate::pset::Value;

/// Presence-aware wrapper: absence is a state, not a fault.
///
/// The wrapped descriptor may not carry a default and may not itself be
/// optional; both are rejected when the wrapper is declared.
#[derive(Debug, Clone)]
pub struct Optional {
    inner: Box<Descriptor>,
}

impl Optional {
    pub fn new(inner: impl Into<Descriptor>) -> Self {
        Self { inner: Box::new(inner.into()) }
    }

    pub fn inner(&self) -> &Descriptor {
        &self.inner
    }
}

impl Walk for Optional {
    fn meta(&self) -> &Meta {
        self.inner.node().meta()
    }
    fn meta_mut(&mut self) -> &mut Meta {
        self.inner.node_mut().meta_mut()
    }

    fn declare(&mut self, parent: &str) -> Result<(), SchemaDeclarationError> {
        self.inner.declare(parent)?;
        let key = self.inner.key().to_string();
        if self.inner.is_optional() {
            return Err(SchemaDeclarationError::NestedOptional { key });
        }
        if self.inner.has_default() {
            return Err(SchemaDeclarationError::OptionalWithDefault { key });
        }
        Ok(())
    }

    fn has_default(&self) -> bool {
        false
    }

    fn satisfied_without_input(&self) -> bool {
        true
    }

    fn validate_present(&self, key: &str, value: &Value, cx: &mut ValidateContext<'_>) {
        self.inner.node().validate_present(key, value, cx);
    }

    fn bind_present(&self, key: &str, value: &Value) -> Result<BoundValue, Error> {
        self.inner.bind_required(key, value)
    }

    fn bind_absent(&self, _key: &str) -> Result<Option<BoundValue>, Error> {
        Ok(None)
    }

    fn describe(&self, out: &mut ReferenceWriter<'_>, entry: Entry<'_>) -> fmt::Result {
        self.inner.describe(out, Entry { optional: true, ..entry })
    }
}
