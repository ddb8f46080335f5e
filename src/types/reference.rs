//! Self-documentation: renders a schema without any parameter set.
use std::fmt::{self, Write};

use super::Comment;
use crate::pset::print::INDENT;

/// How a descriptor is introduced on its first line.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry<'a> {
    /// `None` for sequence and tuple elements.
    pub(crate) label: Option<&'a str>,
    pub(crate) optional: bool,
}

impl<'a> Entry<'a> {
    pub(crate) fn named(label: &'a str) -> Self {
        Self { label: Some(label), optional: false }
    }
    pub(crate) fn element() -> Self {
        Self { label: None, optional: false }
    }
}

pub(crate) struct ReferenceWriter<'a> {
    buf: &'a mut String,
    base: &'a str,
    level: usize,
}

impl<'a> ReferenceWriter<'a> {
    pub(crate) fn new(buf: &'a mut String, base: &'a str) -> Self {
        Self { buf, base, level: 0 }
    }

    fn pad(&mut self) {
        self.buf.push_str(self.base);
        for _ in 0..self.level {
            self.buf.push_str(INDENT);
        }
    }

    /// `## text` lines, one per comment line.
    pub(crate) fn comment(&mut self, comment: &Comment) -> fmt::Result {
        if comment.is_empty() {
            return Ok(());
        }
        for line in comment.as_str().lines() {
            self.pad();
            writeln!(self.buf, "## {}", line.trim_end())?;
        }
        Ok(())
    }

    /// `label: body  # notes`
    pub(crate) fn line(&mut self, entry: &Entry<'_>, body: &str, note: Option<&str>) -> fmt::Result {
        self.pad();
        if let Some(label) = entry.label {
            write!(self.buf, "{label}: ")?;
        }
        self.buf.push_str(body);
        let mut notes = Vec::new();
        if entry.optional {
            notes.push("optional");
        }
        notes.extend(note);
        if !notes.is_empty() {
            write!(self.buf, "  # {}", notes.join(", "))?;
        }
        self.buf.push('\n');
        Ok(())
    }

    /// Closing bracket of a block opened with [`ReferenceWriter::line`].
    pub(crate) fn close(&mut self, bracket: &str) -> fmt::Result {
        self.pad();
        writeln!(self.buf, "{bracket}")
    }

    pub(crate) fn indented<F>(&mut self, body: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        self.level += 1;
        let result = body(self);
        self.level -= 1;
        result
    }

    /// Puts a separator at the end of the last written line.
    pub(crate) fn separate(&mut self) {
        if self.buf.ends_with('\n') {
            self.buf.pop();
            self.buf.push_str(",\n");
        }
    }
}
