//! Lock-step traversal of a descriptor tree and a parameter set.
//!
//! Every descriptor exposes the same capability set through [`Walk`]; the
//! walker only ever dispatches over [`Descriptor`] values. Binding a table is
//! two passes:
//!
//! 1. validate: visit every node, collect every fault, mutate nothing;
//! 2. set: only after zero faults, decode values into a [`BoundTable`].
use std::fmt;

use tracing::{debug, trace};

use super::key::join_key;
use super::reference::{Entry, ReferenceWriter};
use super::{Atom, AtomNode, BoundTable, BoundValue, Comment, Composite, Name, Optional, Sequence, Tuple};
use crate::error::{Error, FaultKind, SchemaDeclarationError, ValidationError, ValidationFault};
use crate::pset::{ParameterSet, Value};
use crate::types::ScalarType;

/// Name, documentation and declaration-time key of one descriptor.
#[derive(Debug, Clone)]
pub struct Meta {
    pub(crate) name: Name,
    pub(crate) comment: Comment,
    pub(crate) key: String,
}

impl Meta {
    pub(crate) fn new(name: Name) -> Self {
        let key = name.as_str().to_string();
        Self { name, comment: Comment::default(), key }
    }

    /// Assigns the qualified key under `parent` and checks the name.
    pub(crate) fn qualify(&mut self, parent: &str) -> Result<(), SchemaDeclarationError> {
        self.key = join_key(parent, self.name.as_str());
        if !self.name.is_valid() {
            return Err(SchemaDeclarationError::InvalidName { name: self.name.to_string() });
        }
        Ok(())
    }
}

/// One node of a schema.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Atom(AtomNode),
    Sequence(Sequence),
    Tuple(Tuple),
    Table(Composite),
    Optional(Optional),
}

pub(crate) struct ValidateContext<'a> {
    pub(crate) faults: Vec<ValidationFault>,
    ignore: &'a [&'a str],
}

/// Uniform capabilities of every descriptor.
pub(crate) trait Walk {
    fn meta(&self) -> &Meta;
    fn meta_mut(&mut self) -> &mut Meta;

    /// Declaration-time finalization: qualify keys under `parent`, check
    /// structure, canonicalize defaults.
    fn declare(&mut self, parent: &str) -> Result<(), SchemaDeclarationError>;

    /// Whether a declared default value exists.
    fn has_default(&self) -> bool;

    /// Whether absence from the input is acceptable.
    fn satisfied_without_input(&self) -> bool {
        self.has_default()
    }

    fn validate_present(&self, key: &str, value: &Value, cx: &mut ValidateContext<'_>);

    fn bind_present(&self, key: &str, value: &Value) -> Result<BoundValue, Error>;

    /// `Ok(None)` means the node stays absent in the bound tree.
    fn bind_absent(&self, key: &str) -> Result<Option<BoundValue>, Error>;

    fn describe(&self, out: &mut ReferenceWriter<'_>, entry: Entry<'_>) -> fmt::Result;
}

// ————————————————————————————————————————————————————————————————————————————
// DISPATCH
// ————————————————————————————————————————————————————————————————————————————

impl Descriptor {
    pub(crate) fn node(&self) -> &dyn Walk {
        match self {
            Descriptor::Atom(x) => x,
            Descriptor::Sequence(x) => x,
            Descriptor::Tuple(x) => x,
            Descriptor::Table(x) => x,
            Descriptor::Optional(x) => x,
        }
    }

    pub(crate) fn node_mut(&mut self) -> &mut dyn Walk {
        match self {
            Descriptor::Atom(x) => x,
            Descriptor::Sequence(x) => x,
            Descriptor::Tuple(x) => x,
            Descriptor::Table(x) => x,
            Descriptor::Optional(x) => x,
        }
    }

    pub fn name(&self) -> &Name {
        &self.node().meta().name
    }
    pub fn comment(&self) -> &Comment {
        &self.node().meta().comment
    }
    /// Key computed at declaration time. Members of a [`Fragment`] keep keys
    /// relative to the fragment; fault keys always come from the including
    /// table during the walk.
    ///
    /// [`Fragment`]: super::Fragment
    pub fn key(&self) -> &str {
        &self.node().meta().key
    }
    pub fn is_optional(&self) -> bool {
        matches!(self, Descriptor::Optional(_))
    }
    pub fn has_default(&self) -> bool {
        self.node().has_default()
    }

    pub(crate) fn rename(&mut self, name: Name) {
        let meta = self.node_mut().meta_mut();
        meta.key = name.as_str().to_string();
        meta.name = name;
    }

    pub(crate) fn declare(&mut self, parent: &str) -> Result<(), SchemaDeclarationError> {
        self.node_mut().declare(parent)
    }

    pub(crate) fn validate(&self, key: &str, value: Option<&Value>, cx: &mut ValidateContext<'_>) {
        trace!(key, present = value.is_some(), "validate");
        match value {
            Some(value) => self.node().validate_present(key, value, cx),
            None if self.node().satisfied_without_input() => {}
            None => cx.fault(key, FaultKind::MissingRequiredKey),
        }
    }

    pub(crate) fn bind(&self, key: &str, value: Option<&Value>) -> Result<Option<BoundValue>, Error> {
        match value {
            Some(value) => self.node().bind_present(key, value).map(Some),
            None => self.node().bind_absent(key),
        }
    }

    /// Like [`Descriptor::bind`] for nodes that can never be absent.
    pub(crate) fn bind_required(&self, key: &str, value: &Value) -> Result<BoundValue, Error> {
        self.node().bind_present(key, value)
    }

    pub(crate) fn describe(&self, out: &mut ReferenceWriter<'_>, entry: Entry<'_>) -> fmt::Result {
        self.node().describe(out, entry)
    }

}

/// Checks `default` against `node` with the input validator and returns its
/// canonical bound form.
pub(crate) fn conform_default(node: &dyn Walk, default: &BoundValue) -> Result<BoundValue, SchemaDeclarationError> {
    let key = node.meta().key.clone();
    let value = default.to_value();
    let mut cx = ValidateContext::new(&[]);
    node.validate_present(&key, &value, &mut cx);
    if !cx.faults.is_empty() {
        let reason = cx
            .faults
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SchemaDeclarationError::InvalidDefault { key, reason });
    }
    node.bind_present(&key, &value)
        .map_err(|e| SchemaDeclarationError::InvalidDefault { key, reason: e.to_string() })
}

impl<T: ScalarType> From<Atom<T>> for Descriptor {
    fn from(atom: Atom<T>) -> Self {
        Descriptor::Atom(atom.into_node())
    }
}
impl From<AtomNode> for Descriptor {
    fn from(node: AtomNode) -> Self {
        Descriptor::Atom(node)
    }
}
impl From<Sequence> for Descriptor {
    fn from(node: Sequence) -> Self {
        Descriptor::Sequence(node)
    }
}
impl From<Tuple> for Descriptor {
    fn from(node: Tuple) -> Self {
        Descriptor::Tuple(node)
    }
}
impl From<Composite> for Descriptor {
    fn from(node: Composite) -> Self {
        Descriptor::Table(node)
    }
}
impl From<Optional> for Descriptor {
    fn from(node: Optional) -> Self {
        Descriptor::Optional(node)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONTEXT
// ————————————————————————————————————————————————————————————————————————————

impl<'a> ValidateContext<'a> {
    pub(crate) fn new(ignore: &'a [&'a str]) -> Self {
        Self { faults: Vec::new(), ignore }
    }

    pub(crate) fn fault(&mut self, key: &str, kind: FaultKind) {
        trace!(key, kind = kind.label(), "fault");
        self.faults.push(ValidationFault { key: key.to_string(), kind });
    }

    /// An ignored key also covers everything nested below it.
    pub(crate) fn is_ignored(&self, key: &str) -> bool {
        self.ignore.iter().any(|ignored| {
            key == *ignored
                || key
                    .strip_prefix(ignored)
                    .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ROOT DRIVER
// ————————————————————————————————————————————————————————————————————————————

/// Validate pass over the whole tree.
pub(crate) fn validate_root(
    table: &Composite,
    pset: &ParameterSet,
    keys_to_ignore: &[&str],
) -> Result<(), ValidationError> {
    let mut cx = ValidateContext::new(keys_to_ignore);
    table.validate_members("", pset, &mut cx);
    debug!(table = %table.meta.name, faults = cx.faults.len(), "validate pass finished");
    if cx.faults.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { table: table.meta.name.to_string(), faults: cx.faults })
    }
}

/// Validate, then set. Nothing is produced unless validation is clean.
pub(crate) fn bind_root(
    table: &Composite,
    pset: &ParameterSet,
    keys_to_ignore: &[&str],
) -> Result<BoundTable, Error> {
    validate_root(table, pset, keys_to_ignore)?;
    let bound = table.bind_members("", pset)?;
    debug!(table = %table.meta.name, members = bound.len(), "set pass finished");
    Ok(bound)
}
