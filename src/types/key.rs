//! Key-path bookkeeping used while a schema is being declared.
use std::ops::{Deref, DerefMut};

use super::Name;

/// LIFO stack of the composites currently under construction. Each frame
/// holds the fully qualified key of an open composite.
#[derive(Debug, Default)]
pub struct KeyStack {
    frames: Vec<String>,
}

/// Pops its frame when dropped.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    stack: &'a mut KeyStack,
}

impl KeyStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the innermost open composite; empty at the root.
    pub fn current(&self) -> &str {
        self.frames.last().map_or("", String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn qualify(&self, name: &Name) -> String {
        join_key(self.current(), name.as_str())
    }

    pub fn enter(&mut self, name: &Name) -> KeyGuard<'_> {
        let key = self.qualify(name);
        self.frames.push(key);
        KeyGuard { stack: self }
    }
}

impl Deref for KeyGuard<'_> {
    type Target = KeyStack;
    fn deref(&self) -> &KeyStack {
        self.stack
    }
}

impl DerefMut for KeyGuard<'_> {
    fn deref_mut(&mut self) -> &mut KeyStack {
        self.stack
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.stack.frames.pop();
    }
}

/// `parent.name`, or `parent[i]` for element markers.
pub(crate) fn join_key(parent: &str, name: &str) -> String {
    if name.starts_with('[') || parent.is_empty() {
        format!("{parent}{name}")
    } else {
        format!("{parent}.{name}")
    }
}

pub(crate) fn index_key(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_pop_in_lifo_order() {
        let mut stack = KeyStack::new();
        assert_eq!(stack.qualify(&Name::new("a")), "a");
        {
            let mut outer = stack.enter(&Name::new("outer"));
            assert_eq!(outer.current(), "outer");
            {
                let inner = outer.enter(&Name::new("inner"));
                assert_eq!(inner.qualify(&Name::new("x")), "outer.inner.x");
                assert_eq!(inner.depth(), 2);
            }
            assert_eq!(outer.qualify(&Name::sequence_element(1)), "outer[1]");
        }
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.current(), "");
    }
}
