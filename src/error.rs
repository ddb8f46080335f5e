//! Error taxonomy: declaration mistakes, aggregated validation faults,
//! parse failures, and the umbrella [`Error`].
use std::fmt;

use thiserror::Error;

// ————————————————————————————————————————————————————————————————————————————
// DECLARATION
// ————————————————————————————————————————————————————————————————————————————

/// A structurally illegal schema. These are programmer mistakes in schema
/// authorship, never caused by input data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaDeclarationError {
    #[error("'{name}' is not a valid parameter name")]
    InvalidName { name: String },

    #[error("parameter '{key}' is declared more than once")]
    DuplicateName { key: String },

    #[error("parameter '{key}': an optional parameter cannot wrap another optional parameter")]
    NestedOptional { key: String },

    #[error("parameter '{key}': an optional parameter cannot carry a default value")]
    OptionalWithDefault { key: String },

    #[error("parameter '{key}': sequence and tuple elements cannot be optional")]
    OptionalElement { key: String },

    #[error("parameter '{key}': sequence and tuple elements cannot carry their own default")]
    DefaultedElement { key: String },

    #[error("parameter '{key}': a tuple needs at least one element")]
    EmptyTuple { key: String },

    #[error("parameter '{key}': minimum length {min} exceeds maximum length {max}")]
    InvalidBounds { key: String, min: usize, max: usize },

    #[error("parameter '{key}': default value does not fit the declaration ({reason})")]
    InvalidDefault { key: String, reason: String },
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION
// ————————————————————————————————————————————————————————————————————————————

/// Permitted sequence lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthBound {
    Unbounded,
    Exactly(usize),
    Between { min: usize, max: usize },
}

impl LengthBound {
    pub fn admits(&self, len: usize) -> bool {
        match *self {
            LengthBound::Unbounded => true,
            LengthBound::Exactly(n) => len == n,
            LengthBound::Between { min, max } => min <= len && len <= max,
        }
    }
}

impl fmt::Display for LengthBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthBound::Unbounded => write!(f, "any length"),
            LengthBound::Exactly(n) => write!(f, "exactly {n}"),
            LengthBound::Between { min, max } => write!(f, "between {min} and {max}"),
        }
    }
}

/// What went wrong at one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    MissingRequiredKey,
    TypeMismatch { expected: String, found: String },
    NotASequence { found: String },
    LengthOutOfBounds { expected: LengthBound, found: usize },
    ArityMismatch { expected: usize, found: usize },
    UnknownKey,
}

impl FaultKind {
    /// Short stable label, handy for tests and machine consumers.
    pub fn label(&self) -> &'static str {
        match self {
            FaultKind::MissingRequiredKey => "MissingRequiredKey",
            FaultKind::TypeMismatch { .. } => "TypeMismatch",
            FaultKind::NotASequence { .. } => "NotASequence",
            FaultKind::LengthOutOfBounds { .. } => "LengthOutOfBounds",
            FaultKind::ArityMismatch { .. } => "ArityMismatch",
            FaultKind::UnknownKey => "UnknownKey",
        }
    }
}

/// One mismatch between a descriptor and the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFault {
    pub key: String,
    pub kind: FaultKind,
}

impl fmt::Display for ValidationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = &self.key;
        match &self.kind {
            FaultKind::MissingRequiredKey => write!(f, "{key}: missing required parameter"),
            FaultKind::TypeMismatch { expected, found } => {
                write!(f, "{key}: expected {expected}, found {found}")
            }
            FaultKind::NotASequence { found } => {
                write!(f, "{key}: expected a sequence, found {found}")
            }
            FaultKind::LengthOutOfBounds { expected, found } => write!(
                f,
                "{key}: sequence has {found} element(s), expected {expected}"
            ),
            FaultKind::ArityMismatch { expected, found } => write!(
                f,
                "{key}: tuple has {found} element(s), expected {expected}"
            ),
            FaultKind::UnknownKey => write!(f, "{key}: unrecognized parameter"),
        }
    }
}

/// Every fault found while validating one parameter set against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub table: String,
    pub faults: Vec<ValidationFault>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "validation of '{}' failed with {} fault(s):",
            self.table,
            self.faults.len()
        )?;
        for fault in &self.faults {
            writeln!(f, "  - {fault}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// ————————————————————————————————————————————————————————————————————————————
// PARSING
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source_name}:{line}:{column}: {message}")]
pub struct ParseError {
    pub source_name: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

// ————————————————————————————————————————————————————————————————————————————
// UMBRELLA
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Declaration(#[from] SchemaDeclarationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no parameter at '{key}'")]
    KeyNotFound { key: String },

    #[error("parameter '{key}' cannot be read as {expected}")]
    WrongType { key: String, expected: String },

    /// The set pass disagreed with a successful validate pass.
    #[error("binding '{key}' failed after successful validation: {reason}")]
    InconsistentBind { key: String, reason: String },

    #[error("bound values do not fit the requested type: {0}")]
    Extract(String),

    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
