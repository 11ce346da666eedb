//! The coarse type used everywhere in this compiler to decide boxing and coercion.
//!
//! Every IR value carries exactly one `Category`. There is no finer-grained type lattice:
//! the compiler does not need to distinguish `list[int]` from `list[str]` to decide how to
//! box a value, only whether it is a machine scalar or a boxed handle.

use std::fmt;

/// The coarse, closed set of value categories the middle end reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize, serde::Deserialize)]
pub enum Category {
    Int,
    Float,
    Bool,
    /// A boxed object handle - the host runtime's universal tagged pointer.
    Obj,
    /// The literal `None`. Distinct from `Obj` so the builder can special-case default
    /// returns and comparisons, but it coerces into `Obj` like any other boxed value.
    None,
}

impl Category {
    /// Whether this category is an unboxed machine scalar (participates in direct C
    /// arithmetic rather than `binary_op`).
    #[must_use]
    pub fn is_scalar(self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Bool)
    }

    #[must_use]
    pub fn is_boxed(self) -> bool {
        matches!(self, Self::Obj | Self::None)
    }

    /// The C type spelling used for a named local, parameter, or return slot of this
    /// category. `None` as a standalone declared category never occurs (it only appears on
    /// literal expression nodes), so it maps to `mp_obj_t` defensively rather than panicking.
    #[must_use]
    pub fn c_type(self) -> &'static str {
        match self {
            Self::Int => "mp_int_t",
            Self::Float => "mp_float_t",
            Self::Bool => "bool",
            Self::Obj | Self::None => "mp_obj_t",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.c_type())
    }
}

/// The runtime coercion primitive needed to move a value of category `from` into a slot
/// declared as category `to`. `None` coerces as `Obj` on both sides since it only ever
/// appears as a source category.
#[must_use]
pub fn coerce_primitive(from: Category, to: Category) -> Coercion {
    use Category::{Bool, Float, Int, None as NoneCat, Obj};
    let from = if from == NoneCat { Obj } else { from };
    let to = if to == NoneCat { Obj } else { to };
    match (from, to) {
        (Int, Int) | (Bool, Bool) | (Float, Float) | (Obj, Obj) => Coercion::Identity,
        (Float, Int) => Coercion::CCast("int"),
        (Bool, Int) => Coercion::Identity,
        (Obj, Int) => Coercion::RuntimeCall("get_int"),
        (Int, Float) | (Bool, Float) => Coercion::CCast("float"),
        (Obj, Float) => Coercion::RuntimeCall("get_float"),
        (Int, Bool) => Coercion::DoubleNegate,
        (Float, Bool) => Coercion::NotEqualZero,
        (Obj, Bool) => Coercion::RuntimeCall("is_true"),
        (Int, Obj) => Coercion::RuntimeCall("new_int"),
        (Float, Obj) => Coercion::RuntimeCall("new_float"),
        (Bool, Obj) => Coercion::RuntimeCall("new_bool"),
    }
}

/// A single entry of the coercion matrix, named rather than stored as a raw string so the
/// emitter can pattern-match on the shape instead of re-parsing generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// No conversion needed; emit the expression fragment unchanged.
    Identity,
    /// Wrap the fragment in a C cast, e.g. `(int)e`.
    CCast(&'static str),
    /// Call a host-runtime primitive, e.g. `get_int(e)`.
    RuntimeCall(&'static str),
    /// `!!e` - double logical negation to normalize an int to 0/1.
    DoubleNegate,
    /// `e!=0.0` - float truthiness test.
    NotEqualZero,
}

impl Coercion {
    /// Renders the coercion applied to an already-emitted C fragment.
    #[must_use]
    pub fn apply(self, fragment: &str) -> String {
        match self {
            Self::Identity => fragment.to_owned(),
            Self::CCast(ty) => format!("({ty}){fragment}"),
            Self::RuntimeCall(func) => format!("{func}({fragment})"),
            Self::DoubleNegate => format!("!!{fragment}"),
            Self::NotEqualZero => format!("{fragment}!=0.0"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_pairs_need_no_conversion() {
        for cat in [Category::Int, Category::Float, Category::Bool, Category::Obj] {
            assert_eq!(coerce_primitive(cat, cat), Coercion::Identity);
        }
    }

    #[test]
    fn obj_to_scalar_uses_get_accessors() {
        assert_eq!(coerce_primitive(Category::Obj, Category::Int), Coercion::RuntimeCall("get_int"));
        assert_eq!(coerce_primitive(Category::Obj, Category::Float), Coercion::RuntimeCall("get_float"));
        assert_eq!(coerce_primitive(Category::Obj, Category::Bool), Coercion::RuntimeCall("is_true"));
    }

    #[test]
    fn scalar_to_obj_uses_new_constructors() {
        assert_eq!(coerce_primitive(Category::Int, Category::Obj), Coercion::RuntimeCall("new_int"));
        assert_eq!(coerce_primitive(Category::Float, Category::Obj), Coercion::RuntimeCall("new_float"));
        assert_eq!(coerce_primitive(Category::Bool, Category::Obj), Coercion::RuntimeCall("new_bool"));
    }

    #[test]
    fn none_source_coerces_as_obj() {
        assert_eq!(coerce_primitive(Category::None, Category::Obj), Coercion::Identity);
        assert_eq!(coerce_primitive(Category::None, Category::Int), Coercion::RuntimeCall("get_int"));
    }

    #[test]
    fn apply_renders_expected_c_text() {
        assert_eq!(Coercion::RuntimeCall("new_int").apply("r"), "new_int(r)");
        assert_eq!(Coercion::CCast("int").apply("x"), "(int)x");
        assert_eq!(Coercion::DoubleNegate.apply("n"), "!!n");
    }
}
