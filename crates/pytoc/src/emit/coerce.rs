//! Boundary coercion rendering (spec §4.2, "Coercion insertion").
//!
//! Thin wrapper over [`crate::category::coerce_primitive`]/[`crate::category::Coercion`]:
//! every crossing of a named-variable assignment, return, call-argument, or subscript
//! boundary goes through [`coerce_into`] rather than re-deriving the matrix ad hoc.

use crate::category::{coerce_primitive, Category};

/// Renders `fragment` (already category `from`) coerced into a slot declared `to`. A no-op
/// (`Coercion::Identity`) returns `fragment` unchanged so identity coercions never clutter
/// the emitted C with redundant parentheses.
#[must_use]
pub fn coerce_into(fragment: &str, from: Category, to: Category) -> String {
    coerce_primitive(from, to).apply(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_leaves_fragment_untouched() {
        assert_eq!(coerce_into("x", Category::Int, Category::Int), "x");
    }

    #[test]
    fn scalar_to_obj_wraps_in_constructor() {
        assert_eq!(coerce_into("r", Category::Int, Category::Obj), "new_int(r)");
    }

    #[test]
    fn obj_to_scalar_wraps_in_accessor() {
        assert_eq!(coerce_into("n", Category::Obj, Category::Int), "get_int(n)");
    }
}
