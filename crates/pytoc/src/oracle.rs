//! The Type Oracle: a read-only view over one function's IR plus the module's class
//! registry, answering the handful of questions the Code Emitter needs without re-deriving
//! them from the AST (spec §4.1, "Type Oracle").
//!
//! Grounded on the teacher's `namespace::Namespaces` lookup API - a thin accessor layer in
//! front of data the builder already computed, never a second type-inference pass.

use crate::category::{coerce_primitive, Category, Coercion};
use crate::intern::StringId;
use crate::ir::descriptor::{ClassDescriptor, FunctionDescriptor};
use crate::ir::registry::ClassRegistry;

/// Answers category and class-membership questions about one function, backed by the
/// descriptor the IR Builder already produced. Never mutates, never infers past what the
/// builder recorded (spec §9, "no flow-sensitive narrowing").
pub struct TypeOracle<'a> {
    function: &'a FunctionDescriptor,
    registry: &'a ClassRegistry,
}

impl<'a> TypeOracle<'a> {
    #[must_use]
    pub fn new(function: &'a FunctionDescriptor, registry: &'a ClassRegistry) -> Self {
        Self { function, registry }
    }

    /// The declared category of a local (parameter or assigned name) in this function.
    #[must_use]
    pub fn category_of(&self, name: StringId) -> Option<Category> {
        self.function.locals.get(&name).copied()
    }

    #[must_use]
    pub fn is_known_class(&self, name: StringId) -> bool {
        self.registry.is_known(name)
    }

    #[must_use]
    pub fn class_descriptor(&self, name: StringId) -> Option<&ClassDescriptor> {
        self.registry.get(name)
    }

    /// Whether `param` is annotated with a registered class, per the builder's
    /// `class_typed_params` map (spec §4.1, "Parameter class tracking").
    #[must_use]
    pub fn is_class_typed_param(&self, param: StringId) -> bool {
        self.function.class_typed_params.contains_key(&param)
    }

    #[must_use]
    pub fn class_descriptor_for_param(&self, param: StringId) -> Option<&ClassDescriptor> {
        let class_name = self.function.class_typed_params.get(&param)?;
        self.registry.get(*class_name)
    }

    /// Looks up a field's category and declaration-order ordinal on a known class.
    #[must_use]
    pub fn field(&self, class_name: StringId, field_name: StringId) -> Option<(Category, usize)> {
        self.registry.get(class_name)?.field(field_name)
    }

    /// The coercion needed to move a value of category `from` into a slot of category `to`,
    /// per the spec's fixed coercion matrix (spec §4.2 / `category.rs`).
    #[must_use]
    pub fn coerce(&self, from: Category, to: Category) -> Coercion {
        coerce_primitive(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;
    use crate::ir::descriptor::Field;
    use indexmap::IndexMap;

    fn empty_function(name: StringId, locals: IndexMap<StringId, Category>, class_typed_params: IndexMap<StringId, StringId>) -> FunctionDescriptor {
        FunctionDescriptor {
            name,
            params: vec![],
            return_category: Category::Obj,
            locals,
            class_typed_params,
            body: vec![],
            temp_count: 0,
            needs_checked_div: false,
            owning_class: None,
        }
    }

    #[test]
    fn category_of_reads_builder_recorded_locals() {
        let mut interner = Interner::new();
        let n = interner.intern("n");
        let f = interner.intern("f");
        let mut locals = IndexMap::new();
        locals.insert(n, Category::Int);
        let func = empty_function(f, locals, IndexMap::new());
        let registry = ClassRegistry::new();
        let oracle = TypeOracle::new(&func, &registry);
        assert_eq!(oracle.category_of(n), Some(Category::Int));
    }

    #[test]
    fn class_typed_param_resolves_through_registry() {
        let mut interner = Interner::new();
        let point = interner.intern("Point");
        let p = interner.intern("p");
        let x = interner.intern("x");
        let f = interner.intern("translate");
        let mut registry = ClassRegistry::new();
        registry.register(ClassDescriptor {
            name: point,
            fields: vec![Field { name: x, category: Category::Int }],
            methods: vec![],
        });
        let mut class_typed_params = IndexMap::new();
        class_typed_params.insert(p, point);
        let func = empty_function(f, IndexMap::new(), class_typed_params);
        let oracle = TypeOracle::new(&func, &registry);
        assert!(oracle.is_class_typed_param(p));
        assert_eq!(oracle.field(point, x), Some((Category::Int, 0)));
    }

    #[test]
    fn coerce_delegates_to_category_matrix() {
        let func = empty_function(StringId::default(), IndexMap::new(), IndexMap::new());
        let registry = ClassRegistry::new();
        let oracle = TypeOracle::new(&func, &registry);
        assert_eq!(oracle.coerce(Category::Int, Category::Obj), Coercion::RuntimeCall("new_int"));
    }
}
