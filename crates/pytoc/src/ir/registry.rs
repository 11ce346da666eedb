//! The known-class registry: append-only within one compilation unit (spec §3, invariant 5).
//!
//! Grounded on the teacher's preference for name-string maps over object identity (spec §9,
//! "Name-string maps instead of object identity") to avoid cyclic references between a
//! class descriptor, its methods, and parameters typed with it.

use indexmap::IndexMap;

use crate::errors::CompileError;
use crate::intern::StringId;
use crate::ir::descriptor::ClassDescriptor;

/// Registry of record types declared so far in the current compilation unit.
///
/// Classes must be declared before any function that types a parameter with that class
/// (invariant 5); the registry enforces this by construction - it is only ever appended to
/// in source order, and lookups for not-yet-seen names fail with
/// [`CompileError::ClassUsedBeforeDeclaration`].
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: IndexMap<StringId, ClassDescriptor>,
}

impl ClassRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new class. Panics (an internal-invariant bug, not a source error) if the
    /// name is already registered - the builder must not visit the same class twice.
    pub fn register(&mut self, class: ClassDescriptor) {
        let previous = self.classes.insert(class.name, class);
        debug_assert!(previous.is_none(), "class registered twice in one compilation unit");
    }

    #[must_use]
    pub fn is_known(&self, name: StringId) -> bool {
        self.classes.contains_key(&name)
    }

    #[must_use]
    pub fn get(&self, name: StringId) -> Option<&ClassDescriptor> {
        self.classes.get(&name)
    }

    /// Fills in a registered class's method list once its method bodies have been built.
    /// Fields are fixed at [`Self::register`] time; only `methods` is ever backfilled.
    pub fn set_methods(&mut self, name: StringId, methods: Vec<StringId>) {
        let class = self.classes.get_mut(&name).expect("class registered before its methods are built");
        class.methods = methods;
    }

    /// Same as [`Self::get`] but produces the spec's designated compile error when the name
    /// is unknown, with the caller's span attached.
    pub fn require(&self, name: StringId, name_text: &str, span: ruff_text_size::TextRange) -> Result<&ClassDescriptor, CompileError> {
        self.get(name).ok_or_else(|| CompileError::ClassUsedBeforeDeclaration {
            name: name_text.to_owned(),
            span,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::intern::Interner;
    use crate::ir::descriptor::Field;

    #[test]
    fn unregistered_class_is_not_known() {
        let mut interner = Interner::new();
        let name = interner.intern("Point");
        let registry = ClassRegistry::new();
        assert!(!registry.is_known(name));
    }

    #[test]
    fn registered_class_is_known_and_fields_resolve_in_order() {
        let mut interner = Interner::new();
        let name = interner.intern("Point");
        let x = interner.intern("x");
        let y = interner.intern("y");
        let mut registry = ClassRegistry::new();
        registry.register(ClassDescriptor {
            name,
            fields: vec![
                Field { name: x, category: Category::Int },
                Field { name: y, category: Category::Int },
            ],
            methods: vec![],
        });
        assert!(registry.is_known(name));
        let desc = registry.get(name).unwrap();
        assert_eq!(desc.field(x), Some((Category::Int, 0)));
        assert_eq!(desc.field(y), Some((Category::Int, 1)));
    }
}
