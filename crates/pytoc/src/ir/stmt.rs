//! Statement IR: a closed variant set, grounded on the teacher's `bytecode::compiler`
//! statement match arms and its generic `Try<Node>` shape.

use ruff_text_size::TextRange;

use crate::category::Category;
use crate::intern::StringId;
use crate::ir::expr::{BinOp, ExprNode};

/// A statement node with its source span.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StmtNode {
    pub kind: Stmt,
    pub span: TextRange,
}

impl StmtNode {
    #[must_use]
    pub fn new(kind: Stmt, span: TextRange) -> Self {
        Self { kind, span }
    }
}

/// One `except` clause.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExceptHandler {
    /// `None` for a bare `except:`.
    pub exc_type: Option<StringId>,
    /// The bound name in `except E as name:`, if present.
    pub bound_name: Option<StringId>,
    pub body: Vec<StmtNode>,
}

/// A structured try/except/else/finally block - never flattened into a control-flow graph
/// at IR level (spec §4.1, "Try/except/raise").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TryBlock {
    pub body: Vec<StmtNode>,
    pub handlers: Vec<ExceptHandler>,
    pub or_else: Vec<StmtNode>,
    pub finally_body: Vec<StmtNode>,
}

/// The closed variant set of statement kinds (spec §3, "IR entities").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Stmt {
    /// `target = value`. `is_declaration` is set the first time the builder sees `target`
    /// in the enclosing function scope (invariant 1); `declared_category` is the type fixed
    /// at that introduction and never changes across later assignments to the same name.
    Assign {
        target: StringId,
        declared_category: Category,
        is_declaration: bool,
        value: ExprNode,
    },
    AugAssign {
        target: StringId,
        declared_category: Category,
        op: BinOp,
        value: ExprNode,
    },
    Return(Option<ExprNode>),
    If {
        test: ExprNode,
        body: Vec<StmtNode>,
        or_else: Vec<StmtNode>,
    },
    /// `for target in iterable: body` - bounded in the sense that the runtime's iterator
    /// protocol terminates it, as opposed to `While`.
    For {
        target: StringId,
        target_category: Category,
        iterable: ExprNode,
        body: Vec<StmtNode>,
    },
    While {
        test: ExprNode,
        body: Vec<StmtNode>,
    },
    Break,
    Continue,
    Try(TryBlock),
    Raise {
        exc_type: Option<StringId>,
        message: Option<ExprNode>,
    },
    Expr(ExprNode),
}
