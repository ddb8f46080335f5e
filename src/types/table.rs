//! Composite descriptors: nested tables, reusable fragments, and the typed
//! [`Table`] root that drives validation and binding.
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::key::{join_key, KeyStack};
use super::reference::{Entry, ReferenceWriter};
use super::walker::{bind_root, validate_root, Meta, ValidateContext, Walk};
use super::{BoundTable, BoundValue, Comment, Descriptor, Name, Optional};
use crate::error::{Error, FaultKind, SchemaDeclarationError, ValidationError};
use crate::pset::print::INDENT;
use crate::pset::{ParameterSet, Value};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A named, fixed set of member descriptors.
#[derive(Debug, Clone)]
pub struct Composite {
    pub(crate) meta: Meta,
    members: Vec<Member>,
}

#[derive(Debug, Clone)]
enum Member {
    Parameter(Descriptor),
    /// Spliced in place: its members live at the including level.
    Fragment(Arc<Fragment>),
}

/// Reusable group of members, shared by every table that includes it.
///
/// Keys recorded inside a fragment are relative to the fragment; fault keys
/// are always computed from the including table at walk time.
#[derive(Debug)]
pub struct Fragment {
    members: Vec<Member>,
}

/// Collects the members of one table level during declaration.
pub struct TableBuilder<'a> {
    keys: &'a mut KeyStack,
    members: Vec<Member>,
}

/// Implemented by client structs that declare their own schema.
///
/// The struct is filled from the bound values through serde, so its field
/// names must match the declared member names. Optional members map to
/// `Option<_>` fields.
pub trait Schema: DeserializeOwned {
    fn declare(table: &mut TableBuilder<'_>) -> Result<(), SchemaDeclarationError>;
}

/// Typed root: a schema plus, after a successful bind, its values and the
/// parameter set they were bound from.
#[derive(Debug)]
pub struct Table<T> {
    schema: Composite,
    pset: Option<ParameterSet>,
    bound: Option<BoundTable>,
    value: Option<T>,
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

impl<'a> TableBuilder<'a> {
    fn new(keys: &'a mut KeyStack) -> Self {
        Self { keys, members: Vec::new() }
    }

    /// Key prefix members added here will be qualified with.
    pub fn key_prefix(&self) -> &str {
        self.keys.current()
    }

    pub fn add(&mut self, descriptor: impl Into<Descriptor>) -> Result<&mut Self, SchemaDeclarationError> {
        let mut descriptor = descriptor.into();
        if descriptor.name().is_sequence_element() {
            return Err(SchemaDeclarationError::InvalidName { name: descriptor.name().to_string() });
        }
        descriptor.declare(self.keys.current())?;
        self.ensure_unique(descriptor.name())?;
        self.members.push(Member::Parameter(descriptor));
        Ok(self)
    }

    /// Declares a nested table in place.
    pub fn table<F>(&mut self, name: Name, declare: F) -> Result<&mut Self, SchemaDeclarationError>
    where
        F: FnOnce(&mut TableBuilder<'_>) -> Result<(), SchemaDeclarationError>,
    {
        if name.is_sequence_element() {
            return Err(SchemaDeclarationError::InvalidName { name: name.to_string() });
        }
        let mut meta = Meta::new(name);
        meta.qualify(self.keys.current())?;
        self.ensure_unique(&meta.name)?;
        let members = {
            let mut guard = self.keys.enter(&meta.name);
            let mut nested = TableBuilder::new(&mut guard);
            declare(&mut nested)?;
            nested.members
        };
        self.members.push(Member::Parameter(Descriptor::Table(Composite { meta, members })));
        Ok(self)
    }

    /// Splices `fragment`'s members into this level.
    pub fn include(&mut self, fragment: &Arc<Fragment>) -> Result<&mut Self, SchemaDeclarationError> {
        for descriptor in flatten(&fragment.members) {
            self.ensure_unique(descriptor.name())?;
        }
        self.members.push(Member::Fragment(Arc::clone(fragment)));
        Ok(self)
    }

    fn ensure_unique(&self, name: &Name) -> Result<(), SchemaDeclarationError> {
        if flatten(&self.members).any(|d| d.name() == name) {
            return Err(SchemaDeclarationError::DuplicateName { key: self.keys.qualify(name) });
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// COMPOSITE
// ————————————————————————————————————————————————————————————————————————————

impl Composite {
    /// Builds a table from a declaration closure with a fresh key stack.
    pub fn build<F>(name: Name, declare: F) -> Result<Self, SchemaDeclarationError>
    where
        F: FnOnce(&mut TableBuilder<'_>) -> Result<(), SchemaDeclarationError>,
    {
        let mut meta = Meta::new(name);
        meta.qualify("")?;
        let mut keys = KeyStack::new();
        let mut builder = TableBuilder::new(&mut keys);
        declare(&mut builder)?;
        let members = builder.members;
        Ok(Self { meta, members })
    }

    pub fn name(&self) -> &Name {
        &self.meta.name
    }

    pub fn comment(mut self, comment: impl Into<Comment>) -> Self {
        self.meta.comment = comment.into();
        self
    }

    pub fn optional(self) -> Optional {
        Optional::new(self)
    }

    /// Own and fragment members, in declaration order.
    pub fn parameters(&self) -> impl Iterator<Item = &Descriptor> {
        flatten(&self.members)
    }

    /// Validate pass only; reports every fault.
    pub fn validate(&self, pset: &ParameterSet, keys_to_ignore: &[&str]) -> Result<(), ValidationError> {
        validate_root(self, pset, keys_to_ignore)
    }

    /// Validate, then bind into a plain value tree.
    pub fn bind(&self, pset: &ParameterSet, keys_to_ignore: &[&str]) -> Result<BoundTable, Error> {
        bind_root(self, pset, keys_to_ignore)
    }

    /// Documentation rendering of the schema, `indent` levels deep.
    pub fn print_reference(&self, out: &mut impl fmt::Write, indent: usize) -> fmt::Result {
        let base = INDENT.repeat(indent);
        let mut buf = String::new();
        let mut writer = ReferenceWriter::new(&mut buf, &base);
        self.describe(&mut writer, Entry::named(self.meta.name.as_str()))?;
        out.write_str(&buf)
    }

    pub fn reference(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.print_reference(&mut out, 0);
        out
    }

    pub(crate) fn validate_members(&self, prefix: &str, pset: &ParameterSet, cx: &mut ValidateContext<'_>) {
        for descriptor in self.parameters() {
            let name = descriptor.name().as_str();
            descriptor.validate(&join_key(prefix, name), pset.get_value(name), cx);
        }
        for name in pset.keys() {
            if self.parameters().any(|d| d.name().as_str() == name) {
                continue;
            }
            let key = join_key(prefix, name);
            if !cx.is_ignored(&key) {
                cx.fault(&key, FaultKind::UnknownKey);
            }
        }
    }

    pub(crate) fn bind_members(&self, prefix: &str, pset: &ParameterSet) -> Result<BoundTable, Error> {
        let mut bound = BoundTable::default();
        for descriptor in self.parameters() {
            let name = descriptor.name().as_str();
            if let Some(value) = descriptor.bind(&join_key(prefix, name), pset.get_value(name))? {
                bound.insert(name.to_string(), value);
            }
        }
        Ok(bound)
    }
}

impl Walk for Composite {
    fn meta(&self) -> &Meta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn declare(&mut self, parent: &str) -> Result<(), SchemaDeclarationError> {
        self.meta.qualify(parent)?;
        for member in &mut self.members {
            if let Member::Parameter(descriptor) = member {
                descriptor.declare(&self.meta.key)?;
            }
        }
        Ok(())
    }

    fn has_default(&self) -> bool {
        false
    }

    /// A table may be omitted when every member can be.
    fn satisfied_without_input(&self) -> bool {
        self.parameters().all(|d| d.node().satisfied_without_input())
    }

    fn validate_present(&self, key: &str, value: &Value, cx: &mut ValidateContext<'_>) {
        match value.as_table() {
            Some(pset) => self.validate_members(key, pset, cx),
            None => cx.fault(key, FaultKind::TypeMismatch { expected: "a table".into(), found: value.shape().into() }),
        }
    }

    fn bind_present(&self, key: &str, value: &Value) -> Result<BoundValue, Error> {
        let pset = value.as_table().ok_or_else(|| Error::InconsistentBind {
            key: key.to_string(),
            reason: "value is not a table".into(),
        })?;
        self.bind_members(key, pset).map(BoundValue::Table)
    }

    fn bind_absent(&self, key: &str) -> Result<Option<BoundValue>, Error> {
        self.bind_members(key, &ParameterSet::new()).map(|t| Some(BoundValue::Table(t)))
    }

    fn describe(&self, out: &mut ReferenceWriter<'_>, entry: Entry<'_>) -> fmt::Result {
        out.comment(&self.meta.comment)?;
        if self.parameters().next().is_none() {
            return out.line(&entry, "{}", None);
        }
        out.line(&entry, "{", None)?;
        out.indented(|out| {
            for descriptor in self.parameters() {
                descriptor.describe(out, Entry::named(descriptor.name().as_str()))?;
            }
            Ok(())
        })?;
        out.close("}")
    }
}

impl Fragment {
    pub fn build<F>(declare: F) -> Result<Arc<Self>, SchemaDeclarationError>
    where
        F: FnOnce(&mut TableBuilder<'_>) -> Result<(), SchemaDeclarationError>,
    {
        let mut keys = KeyStack::new();
        let mut builder = TableBuilder::new(&mut keys);
        declare(&mut builder)?;
        Ok(Arc::new(Self { members: builder.members }))
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Descriptor> {
        flatten(&self.members)
    }
}

fn flatten(members: &[Member]) -> Box<dyn Iterator<Item = &Descriptor> + '_> {
    Box::new(members.iter().flat_map(|member| -> Box<dyn Iterator<Item = &Descriptor> + '_> {
        match member {
            Member::Parameter(descriptor) => Box::new(std::iter::once(descriptor)),
            Member::Fragment(fragment) => flatten(&fragment.members),
        }
    }))
}

// ————————————————————————————————————————————————————————————————————————————
// TYPED ROOT
// ————————————————————————————————————————————————————————————————————————————

impl<T: Schema> Table<T> {
    /// Declares the schema of `T`; no values yet.
    pub fn new(name: Name) -> Result<Self, SchemaDeclarationError> {
        let schema = Composite::build(name, T::declare)?;
        Ok(Self { schema, pset: None, bound: None, value: None })
    }

    pub fn with_comment(mut self, comment: impl Into<Comment>) -> Self {
        self.schema.meta.comment = comment.into();
        self
    }

    /// Declares, validates and binds in one step.
    pub fn from_parameter_set(name: Name, pset: &ParameterSet, keys_to_ignore: &[&str]) -> Result<Self, Error> {
        let mut table = Self::new(name)?;
        table.validate_parameter_set(pset, keys_to_ignore)?;
        Ok(table)
    }

    /// Binds `pset`. On failure the previous values, if any, are kept.
    pub fn validate_parameter_set(&mut self, pset: &ParameterSet, keys_to_ignore: &[&str]) -> Result<(), Error> {
        let bound = self.schema.bind(pset, keys_to_ignore)?;
        let value = bound.deserialize::<T>()?;
        debug!(table = %self.schema.meta.name, "bound");
        self.pset = Some(pset.clone());
        self.bound = Some(bound);
        self.value = Some(value);
        Ok(())
    }

    /// The bound client value, once a bind has succeeded.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn bound(&self) -> Option<&BoundTable> {
        self.bound.as_ref()
    }

    /// The parameter set of the last successful bind, origins included.
    /// Defaults filled in during the bind are in [`Table::bound`], not here.
    pub fn parameter_set(&self) -> Option<&ParameterSet> {
        self.pset.as_ref()
    }

    pub fn schema(&self) -> &Composite {
        &self.schema
    }

    pub fn print_reference(&self, out: &mut impl fmt::Write, indent: usize) -> fmt::Result {
        self.schema.print_reference(out, indent)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::pset::PrintMode;
    use crate::types::{Atom, Sequence, Tuple};

    fn pset(entries: &[(&str, Value)]) -> ParameterSet {
        entries.iter().cloned().collect()
    }

    fn fault_list(err: &ValidationError) -> Vec<(&str, &'static str)> {
        err.faults.iter().map(|f| (f.key.as_str(), f.kind.label())).collect()
    }

    fn ab() -> Composite {
        Composite::build(Name::new("config"), |t| {
            t.add(Atom::<i32>::new(Name::new("a")))?
                .add(Atom::<i32>::new(Name::new("b")))?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn unknown_keys_respect_the_ignore_list() {
        let input = pset(&[("a", Value::atom("1")), ("b", Value::atom("2")), ("c", Value::atom("3"))]);
        let err = ab().validate(&input, &[]).unwrap_err();
        assert_eq!(fault_list(&err), [("c", "UnknownKey")]);
        assert!(ab().validate(&input, &["c"]).is_ok());
    }

    #[test]
    fn nested_faults_carry_the_parent_path() {
        let schema = Composite::build(Name::new("config"), |t| {
            t.table(Name::new("inner"), |t| {
                t.add(Atom::<u8>::new(Name::new("x")))?;
                t.add(Sequence::of::<f64>(Name::new("ys")))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        let inner = pset(&[("x", Value::atom("256")), ("z", Value::atom("1"))]);
        let err = schema.validate(&pset(&[("inner", Value::table(inner))]), &[]).unwrap_err();
        assert_eq!(
            fault_list(&err),
            [("inner.x", "TypeMismatch"), ("inner.ys", "MissingRequiredKey"), ("inner.z", "UnknownKey")]
        );
        let err = schema.validate(&pset(&[("inner", Value::atom("1"))]), &[]).unwrap_err();
        assert_eq!(fault_list(&err), [("inner", "TypeMismatch")]);
    }

    #[test]
    fn all_defaulted_tables_may_be_omitted() {
        let schema = Composite::build(Name::new("config"), |t| {
            t.table(Name::new("opts"), |t| {
                t.add(Atom::with_default(Name::new("level"), 3u32))?;
                t.add(Atom::<String>::new(Name::new("tag")).optional())?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        let bound = schema.bind(&ParameterSet::new(), &[]).unwrap();
        assert_eq!(bound.value::<u32>("opts.level").unwrap(), 3);
        assert!(!bound.contains("opts.tag"));
    }

    #[test]
    fn fragments_splice_without_a_key_segment() {
        let common = Fragment::build(|t| {
            t.add(Atom::with_default(Name::new("verbosity"), 0u8))?;
            t.add(Atom::<String>::new(Name::new("label")))?;
            Ok(())
        })
        .unwrap();
        let make = |name: &str| {
            Composite::build(Name::new(name), |t| {
                t.add(Atom::<i64>::new(Name::new("id")))?;
                t.include(&common)?;
                Ok(())
            })
            .unwrap()
        };
        let (left, right) = (make("left"), make("right"));
        assert_eq!(Arc::strong_count(&common), 3);

        let names: Vec<_> = left.parameters().map(|d| d.name().as_str()).collect();
        assert_eq!(names, ["id", "verbosity", "label"]);

        let bound = right.bind(&pset(&[("id", Value::atom("7")), ("label", Value::atom("\"r\""))]), &[]).unwrap();
        assert_eq!(bound.value::<u8>("verbosity").unwrap(), 0);
        assert_eq!(bound.value::<String>("label").unwrap(), "r");

        let err = left.validate(&pset(&[("id", Value::atom("x"))]), &[]).unwrap_err();
        assert_eq!(fault_list(&err), [("id", "TypeMismatch"), ("label", "MissingRequiredKey")]);
    }

    #[test]
    fn duplicate_names_are_rejected_across_fragments() {
        let fragment = Fragment::build(|t| {
            t.add(Atom::<i32>::new(Name::new("a")))?;
            Ok(())
        })
        .unwrap();
        let err = Composite::build(Name::new("config"), |t| {
            t.add(Atom::<i32>::new(Name::new("a")))?;
            t.include(&fragment)?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err, SchemaDeclarationError::DuplicateName { key: "a".into() });

        let err = Composite::build(Name::new("config"), |t| {
            t.table(Name::new("inner"), |t| {
                t.add(Atom::<i32>::new(Name::new("b")))?;
                t.add(Sequence::of::<i32>(Name::new("b")))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err, SchemaDeclarationError::DuplicateName { key: "inner.b".into() });
    }

    #[test]
    fn element_markers_are_not_member_names() {
        let err = Composite::build(Name::new("config"), |t| {
            t.add(Atom::<i32>::element())?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, SchemaDeclarationError::InvalidName { .. }));

        for name in [Name::new("[oops"), Name::sequence_element(0)] {
            let err = Composite::build(Name::new("config"), |t| {
                t.table(name, |t| {
                    t.add(Atom::<i32>::new(Name::new("a")))?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap_err();
            assert!(matches!(err, SchemaDeclarationError::InvalidName { .. }), "{err:?}");
        }
        let err = Composite::build(Name::new("config"), |t| {
            t.add(Atom::<i32>::new(Name::new("[oops")))?;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err, SchemaDeclarationError::InvalidName { name: "[oops".into() });
    }

    #[test]
    fn root_names_are_checked() {
        let err = Composite::build(Name::new("not valid"), |_| Ok(())).unwrap_err();
        assert_eq!(err, SchemaDeclarationError::InvalidName { name: "not valid".into() });
        assert!(Table::<Job>::new(Name::new("")).is_err());
        assert_eq!(Composite::build(Name::new("job"), |_| Ok(())).unwrap().meta.key, "job");
    }

    #[test]
    fn fragment_member_keys_stay_relative() {
        let common = Fragment::build(|t| {
            t.add(Atom::with_default(Name::new("verbosity"), 0u8))?;
            t.add(Atom::<String>::new(Name::new("label")))?;
            Ok(())
        })
        .unwrap();
        let schema = Composite::build(Name::new("config"), |t| {
            t.table(Name::new("inner"), |t| {
                t.add(Atom::<i64>::new(Name::new("id")))?;
                t.include(&common)?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        let Some(Descriptor::Table(inner)) = schema.parameters().next() else { panic!("expected a nested table") };
        let keys: Vec<_> = inner.parameters().map(Descriptor::key).collect();
        assert_eq!(keys, ["inner.id", "verbosity", "label"]);

        let input = pset(&[("inner", Value::table(pset(&[("id", Value::atom("1"))])))]);
        let err = schema.validate(&input, &[]).unwrap_err();
        assert_eq!(fault_list(&err), [("inner.label", "MissingRequiredKey")]);
    }

    #[test]
    fn reference_rendering() {
        let schema = Composite::build(Name::new("config"), |t| {
            t.add(Atom::<String>::new(Name::new("name")).comment("Who runs this."))?;
            t.add(Sequence::of::<String>(Name::new("composers")).fixed(2).with_default(["Mahler", "Elgar"]))?;
            t.add(
                Tuple::new(Name::new("ages"))
                    .element(Atom::<String>::element())
                    .element(Atom::<u32>::element()),
            )?;
            t.add(Atom::<i32>::new(Name::new("x")).optional())?;
            t.add(Sequence::of::<f64>(Name::new("weights")).bounded(1, 3))?;
            t.table(Name::new("inner"), |_| Ok(()))?;
            Ok(())
        })
        .unwrap()
        .comment("Example job.");
        let expected = "\
## Example job.
config: {
   ## Who runs this.
   name: <string>
   composers: [\"Mahler\", \"Elgar\"]  # default, length exactly 2
   ages: [
      <string>,
      <u32>
   ]
   x: <i32>  # optional
   weights: [  # length between 1 and 3
      <f64>,
      ...
   ]
   inner: {}
}
";
        assert_eq!(schema.reference(), expected);

        let mut indented = String::new();
        ab().print_reference(&mut indented, 1).unwrap();
        assert_eq!(indented, "   config: {\n      a: <i32>\n      b: <i32>\n   }\n");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Job {
        name: String,
        threads: u16,
        x: Option<i32>,
    }

    impl Schema for Job {
        fn declare(t: &mut TableBuilder<'_>) -> Result<(), SchemaDeclarationError> {
            t.add(Atom::<String>::new(Name::new("name")))?;
            t.add(Atom::with_default(Name::new("threads"), 4u16))?;
            t.add(Atom::<i32>::new(Name::new("x")).optional())?;
            Ok(())
        }
    }

    #[test]
    fn typed_root_binds_all_or_nothing() {
        let good = pset(&[("name", Value::atom("\"reco\"")), ("x", Value::atom("5"))]);
        let table = Table::<Job>::from_parameter_set(Name::new("job"), &good, &[]).unwrap();
        assert_eq!(table.get(), Some(&Job { name: "reco".into(), threads: 4, x: Some(5) }));

        let mut x = 0;
        assert!(table.bound().unwrap().value_if_present("x", &mut x).unwrap());
        assert_eq!(x, 5);

        let mut table = Table::<Job>::new(Name::new("job")).unwrap();
        assert!(table.get().is_none());
        let bad = pset(&[("threads", Value::atom("-1")), ("x", Value::atom("5"))]);
        let err = table.validate_parameter_set(&bad, &[]).unwrap_err();
        let Error::Validation(err) = err else { panic!("expected a validation error") };
        assert_eq!(fault_list(&err), [("name", "MissingRequiredKey"), ("threads", "TypeMismatch")]);
        assert!(table.get().is_none());
        assert!(table.bound().is_none());

        table.validate_parameter_set(&pset(&[("name", Value::atom("n"))]), &[]).unwrap();
        let mut x = 17;
        assert!(!table.bound().unwrap().value_if_present("x", &mut x).unwrap());
        assert_eq!(x, 17);
        assert_eq!(table.get().unwrap().x, None);
    }

    #[test]
    fn typed_root_keeps_the_input_with_its_origins() {
        let input = crate::parse::parse_document("name: reco\nx: 5\n", "job.fcl").unwrap();
        let mut table = Table::<Job>::from_parameter_set(Name::new("job"), &input, &[]).unwrap();
        let kept = table.parameter_set().unwrap();
        assert_eq!(kept, &input);
        let text = kept.to_indented_string(0, PrintMode::Annotated);
        assert_eq!(text, "name: reco  # job.fcl:1\nx: 5  # job.fcl:2\n");

        let bad = crate::parse::parse_document("x: 5\n", "other.fcl").unwrap();
        assert!(table.validate_parameter_set(&bad, &[]).is_err());
        assert_eq!(table.parameter_set(), Some(&input));
        assert!(Table::<Job>::new(Name::new("job")).unwrap().parameter_set().is_none());
    }
}
