use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));
static ELEMENT_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d+\]$").expect("element marker pattern"));

/// The key a descriptor binds to, or a positional marker (`[i]`) for
/// sequence and tuple elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub(crate) fn sequence_element(index: usize) -> Self {
        Self(format!("[{index}]"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_sequence_element(&self) -> bool {
        ELEMENT_MARKER.is_match(&self.0)
    }

    pub fn is_valid(&self) -> bool {
        self.is_sequence_element() || IDENTIFIER.is_match(&self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-form documentation attached to a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment(String);

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for Comment {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Comment {
    fn from(text: String) -> Self {
        Self(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_and_markers() {
        assert!(Name::new("composers").is_valid());
        assert!(Name::new("_x9").is_valid());
        assert!(Name::sequence_element(3).is_valid());
        assert!(Name::sequence_element(3).is_sequence_element());
        assert!(!Name::new("9lives").is_valid());
        assert!(!Name::new("a.b").is_valid());
        assert!(!Name::new("").is_valid());
        assert!(!Name::new("[oops").is_valid());
        assert!(!Name::new("[x]").is_valid());
        assert!(!Name::new("[1]a").is_valid());
        assert!(!Name::new("[oops").is_sequence_element());
    }
}
