//! Expression IR: a closed variant set, grounded on the teacher's `expressions::Expr`.
//!
//! Every node carries (or can cheaply compute, via the [`crate::oracle::TypeOracle`]) its
//! [`Category`]. Nodes are built by [`super::builder::IrBuilder`] and consumed only by
//! [`crate::emit::emitter::CodeEmitter`] - no other stage inspects them.

use ruff_text_size::TextRange;

use crate::category::Category;
use crate::intern::StringId;

/// A binary operator, preserving the surface spelling (`//` distinct from `/`) so the
/// emitter - not the builder - decides the lowering strategy (spec §4.1, "Floor division
/// vs. true division").
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    Invert,
}

/// The built-in conversion constructors the builder recognizes specially (spec §4.1,
/// "Method calls and built-ins"). Any other call of a name is a plain [`Expr::Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize)]
pub enum BuiltinCtor {
    Int,
    Float,
    Str,
    Bool,
    List,
}

impl BuiltinCtor {
    /// The category a call to this constructor always produces.
    #[must_use]
    pub fn result_category(self) -> Category {
        match self {
            Self::Int => Category::Int,
            Self::Float => Category::Float,
            Self::Bool => Category::Bool,
            Self::Str | Self::List => Category::Obj,
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "str" => Some(Self::Str),
            "bool" => Some(Self::Bool),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

/// A literal constant. Strings/bytes are interned; everything else is stored inline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(StringId),
    None,
}

impl Literal {
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Int(_) => Category::Int,
            Self::Float(_) => Category::Float,
            Self::Bool(_) => Category::Bool,
            Self::Str(_) => Category::Obj,
            Self::None => Category::None,
        }
    }
}

/// An expression node with its source span and pre-computed category.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExprNode {
    pub kind: Expr,
    pub category: Category,
    pub span: TextRange,
}

/// The closed variant set of expression kinds (spec §3, "IR entities").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Literal(Literal),
    /// A plain variable reference; its category is looked up from the declaring scope by
    /// the builder at construction time, never recomputed later (invariant 1).
    Name(StringId),
    BinOp {
        op: BinOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    Compare {
        op: CmpOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<ExprNode>,
    },
    /// `self.field` inside a method body.
    SelfAttr { field: StringId, field_category: Category },
    /// `p.field` where `p` is a class-typed parameter (spec §4.1, "Parameter class
    /// tracking"). Carries the class name so the emitter can mangle the cast target without
    /// consulting the oracle again.
    ParamAttr {
        param: StringId,
        class_name: StringId,
        field: StringId,
        field_category: Category,
    },
    /// Any other attribute read - lowered through the generic attribute-load primitive.
    GenericAttr { receiver: Box<ExprNode>, attr: StringId },
    Subscript {
        receiver: Box<ExprNode>,
        index: Box<ExprNode>,
    },
    /// A call to a named function declared in this compilation unit.
    Call { function: StringId, args: Vec<ExprNode> },
    /// `receiver.method(args)`, dispatched uniformly through `load_attr` + `call_n_kw`.
    MethodCall {
        receiver: Box<ExprNode>,
        method: StringId,
        args: Vec<ExprNode>,
    },
    BuiltinCall { ctor: BuiltinCtor, arg: Box<ExprNode> },
    /// A reference to a compiler-generated temporary already materialized in the enclosing
    /// statement's prelude.
    Temp(u32),
}

impl ExprNode {
    #[must_use]
    pub fn new(kind: Expr, category: Category, span: TextRange) -> Self {
        Self { kind, category, span }
    }
}
