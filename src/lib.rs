//! Hierarchical configuration: parameter sets, declared schemas, and a
//! two-pass validate/bind engine that reports every fault at once.
//!
//! ```
//! use fhicl::{Atom, Composite, Name, ParameterSet, Sequence};
//!
//! let schema = Composite::build(Name::new("job"), |t| {
//!     t.add(Atom::<String>::new(Name::new("label")))?;
//!     t.add(Sequence::of::<String>(Name::new("composers")).fixed(2).with_default(["Mahler", "Elgar"]))?;
//!     Ok(())
//! })?;
//! let pset = ParameterSet::parse_str("label: main\n", "job.fcl")?;
//! let bound = schema.bind(&pset, &[])?;
//! assert_eq!(bound.value::<Vec<String>>("composers")?, ["Mahler", "Elgar"]);
//! # Ok::<(), fhicl::Error>(())
//! ```
pub mod cli;
pub mod error;
pub mod parse;
pub mod path_de;
pub mod pset;
pub mod types;

pub use error::{Error, FaultKind, LengthBound, ParseError, Result, SchemaDeclarationError, ValidationError, ValidationFault};
pub use parse::parse_document;
pub use pset::{Origin, ParameterSet, PrintMode, Value, ValueKind};
pub use types::{
    Atom, BoundTable, BoundValue, Comment, Composite, Descriptor, Fragment, FromBound, Name, Optional, Scalar,
    ScalarType, Schema, Sequence, Table, TableBuilder, Tuple,
};
