//! Function and class descriptors - the units the emitter walks to produce C output.
//!
//! Grounded on the teacher's `function::Function` (immutable once built, owns its body and
//! a namespace-size-style bookkeeping field) and `types::class` (name, mangled name, fields
//! in declaration order, methods).

use indexmap::IndexMap;

use crate::category::Category;
use crate::intern::StringId;
use crate::ir::stmt::StmtNode;

/// A single declared parameter.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Param {
    pub name: StringId,
    pub category: Category,
    /// Set when the annotation names a registered class rather than a scalar/`object`
    /// builtin - the class-typed-parameter map in [`FunctionDescriptor`] is keyed the same
    /// way so the two stay in lockstep.
    pub class_name: Option<StringId>,
    pub has_default: bool,
}

/// Everything the emitter needs to lower one `def` to a C function (spec §3, "Function
/// descriptor"). Created when the builder visits the `def`, finalized when its body
/// closes, and immutable thereafter (spec §3, "Lifecycles").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FunctionDescriptor {
    pub name: StringId,
    pub params: Vec<Param>,
    pub return_category: Category,
    /// Declared C-type (as a `Category`) for every local introduced in this function,
    /// keyed by name and populated at first-assignment time. `IndexMap` rather than a hash
    /// map so re-emitting the same IR twice produces byte-identical C (spec §8,
    /// round-trip/idempotence) without depending on hash-iteration order.
    pub locals: IndexMap<StringId, Category>,
    /// Parameters whose annotation names a class registered in this compilation unit,
    /// mapped to that class's name (spec §4.1, "Parameter class tracking"). Attribute reads
    /// on these parameters are emitted as direct struct field access rather than going
    /// through the generic attribute-load path.
    pub class_typed_params: IndexMap<StringId, StringId>,
    pub body: Vec<StmtNode>,
    /// Number of temporaries used; reset to zero between functions, recorded here so the
    /// emitter can reserve them upfront instead of allocating during emission.
    pub temp_count: u32,
    /// Set when the body performs floor-division/modulus inside any try-block, so the
    /// emitter knows to emit the checked-arithmetic helper once at file scope.
    pub needs_checked_div: bool,
    /// The method's owning class, for methods; `None` for module-level functions.
    pub owning_class: Option<StringId>,
}

impl FunctionDescriptor {
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.owning_class.is_some()
    }
}

/// A field of a user-defined record type, in declaration order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Field {
    pub name: StringId,
    pub category: Category,
}

/// A user-defined record type (spec §3, "Class descriptor"). Created on class entry,
/// appended to with each method encountered, and finalized at class close.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClassDescriptor {
    pub name: StringId,
    pub fields: Vec<Field>,
    pub methods: Vec<StringId>,
}

impl ClassDescriptor {
    /// Looks up a field's declared category and declaration-order ordinal (spec §4.3,
    /// `field(class, name)`). The ordinal is the index into `fields`, not a byte offset -
    /// C struct layout is left to the C compiler after emission.
    #[must_use]
    pub fn field(&self, name: StringId) -> Option<(Category, usize)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .map(|(ordinal, f)| (f.category, ordinal))
    }
}
