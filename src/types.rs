//! Schema descriptors and the validate/bind machinery.
//!
//! A schema is a tree of [`Descriptor`]s: atoms, sequences, tuples, nested
//! tables and optional wrappers. It is declared once, checked structurally at
//! declaration time, and then bound against any number of parameter sets.
pub mod atom;
pub mod bound;
pub mod key;
pub mod name;
pub mod optional;
pub(crate) mod reference;
pub mod scalar;
pub mod sequence;
pub mod table;
pub mod walker;

pub use atom::{Atom, AtomNode};
pub use bound::{BoundTable, BoundValue, FromBound};
pub use key::{KeyGuard, KeyStack};
pub use name::{Comment, Name};
pub use optional::Optional;
pub use scalar::{Scalar, ScalarType};
pub use sequence::{Sequence, Tuple};
pub use table::{Composite, Fragment, Schema, Table, TableBuilder};
pub use walker::{Descriptor, Meta};
