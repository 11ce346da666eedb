//! String interning for names that flow from the surface AST into the IR and emitter.
//!
//! Locals, attribute names, method names and class names are interned into a single
//! table and referenced everywhere else by `StringId`. This avoids re-hashing or
//! re-cloning the same identifier text once per builder pass and once per emitter pass.
//!
//! Index 0 is reserved for the empty name, used as a placeholder before a
//! compiler-generated temporary receives its numbered suffix (see
//! [`crate::emit::names::TempNamer`]).

use ahash::AHashMap;

/// Index into the string interner's storage.
///
/// `u32` rather than `usize` to keep IR nodes small; a single compilation unit will never
/// approach 2^32 distinct identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
pub struct StringId(u32);

/// The `StringId` for the empty string - always index 0 in the interner.
pub const EMPTY_STRING_ID: StringId = StringId(0);

/// Interns identifier text for one compilation unit.
///
/// Built incrementally during AST normalization and IR construction, then handed to the
/// emitter read-only alongside the rest of the module IR.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: AHashMap<Box<str>, StringId>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        let mut interner = Self::default();
        let empty = interner.intern("");
        debug_assert_eq!(empty, EMPTY_STRING_ID);
        interner
    }

    /// Interns `text`, returning its existing id if already known.
    pub fn intern(&mut self, text: &str) -> StringId {
        if let Some(&id) = self.lookup.get(text) {
            return id;
        }
        let id = StringId(u32::try_from(self.strings.len()).expect("interner overflow"));
        self.strings.push(text.into());
        self.lookup.insert(text.into(), id);
        id
    }

    /// Resolves an id back to its text. Panics on an id from a different interner.
    #[must_use]
    pub fn resolve(&self, id: StringId) -> &str {
        &self.strings[id.0 as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_index_zero() {
        let interner = Interner::new();
        assert_eq!(interner.resolve(EMPTY_STRING_ID), "");
    }

    #[test]
    fn repeated_interning_returns_same_id() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "foo");
    }

    #[test]
    fn distinct_strings_get_distinct_ids() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
    }
}
