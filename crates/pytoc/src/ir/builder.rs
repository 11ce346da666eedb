//! The IR Builder: turns a `ruff_python_ast` module into this compiler's own IR.
//!
//! Grounded on the teacher's `parse.rs` (ruff AST -> internal `Node`/`Expr` lowering) and
//! `function.rs`/`types/class.rs` (the descriptors being built up). Everything downstream of
//! [`IrBuilder::build_module`] deals only in this crate's IR types, never in
//! `ruff_python_ast` nodes (spec §10.1).

use indexmap::IndexMap;
use ruff_python_ast::{self as ast, Expr as AstExpr, Number, Stmt as AstStmt};
use ruff_text_size::{Ranged, TextRange};
use tracing::instrument;

use crate::category::Category;
use crate::errors::{CompileError, CompileResult};
use crate::intern::{Interner, StringId};
use crate::ir::descriptor::{ClassDescriptor, Field, FunctionDescriptor, Param};
use crate::ir::expr::{BinOp, BuiltinCtor, CmpOp, Expr, ExprNode, Literal, UnaryOp};
use crate::ir::registry::ClassRegistry;
use crate::ir::stmt::{ExceptHandler, Stmt, StmtNode, TryBlock};
use crate::ir::Module;

/// Per-function bookkeeping the builder threads through statement/expression construction.
///
/// Not part of the IR itself - [`FunctionDescriptor`] is the frozen result once the body is
/// fully built (spec §3, "Lifecycles": "immutable thereafter").
#[derive(Default)]
struct FunctionScope {
    locals: IndexMap<StringId, Category>,
    class_typed_params: IndexMap<StringId, StringId>,
    temp_count: u32,
    needs_checked_div: bool,
    try_depth: u32,
    /// Set when this function is a method and its first parameter is literally named
    /// `self` - the class it is a method of (spec §4.1, "Attribute reads", case 1).
    self_class: Option<StringId>,
}

/// Builds module IR from a surface AST (spec §4.1).
pub struct IrBuilder<'a> {
    interner: &'a mut Interner,
    registry: ClassRegistry,
}

impl<'a> IrBuilder<'a> {
    #[must_use]
    pub fn new(interner: &'a mut Interner) -> Self {
        Self {
            interner,
            registry: ClassRegistry::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Lowers a parsed module into IR. Classes and functions are visited in source order;
    /// the known-class registry's append-only discipline (invariant 5) naturally rejects a
    /// function that types a parameter with a class declared later in the same file.
    #[instrument(skip_all)]
    pub fn build_module(&mut self, module: &ast::ModModule) -> CompileResult<Module> {
        let mut functions = Vec::new();
        let mut classes = Vec::new();
        for stmt in &module.body {
            match stmt {
                AstStmt::FunctionDef(def) => {
                    functions.push(self.build_function(def, None)?);
                }
                AstStmt::ClassDef(def) => {
                    let (class, methods) = self.build_class(def)?;
                    classes.push(class);
                    functions.extend(methods);
                }
                other => {
                    return Err(CompileError::Internal {
                        message: format!("unsupported top-level statement: {other:?}"),
                    });
                }
            }
        }
        Ok(Module { functions, classes })
    }

    #[instrument(skip(self, def))]
    fn build_class(&mut self, def: &ast::StmtClassDef) -> CompileResult<(ClassDescriptor, Vec<FunctionDescriptor>)> {
        let class_name = self.interner.intern(def.name.as_str());
        tracing::debug!(name = def.name.as_str(), "registering class");

        let mut fields = Vec::new();
        let mut method_defs = Vec::new();
        for stmt in &def.body {
            match stmt {
                AstStmt::AnnAssign(ann) => {
                    let AstExpr::Name(target) = ann.target.as_ref() else {
                        return Err(CompileError::Internal {
                            message: "class field target must be a plain name".to_owned(),
                        });
                    };
                    let field_name = self.interner.intern(target.id.as_str());
                    let (category, _) = self.category_from_annotation(&ann.annotation)?;
                    fields.push(Field { name: field_name, category });
                }
                AstStmt::FunctionDef(method) => method_defs.push(method),
                other => {
                    return Err(CompileError::Internal {
                        message: format!("unsupported class-body statement: {other:?}"),
                    });
                }
            }
        }

        // Register the (fields-only) class before lowering method bodies, so a method
        // referencing its own class as a parameter annotation (or a sibling class declared
        // earlier) resolves correctly.
        self.registry.register(ClassDescriptor {
            name: class_name,
            fields,
            methods: Vec::new(),
        });

        let mut method_names = Vec::new();
        let mut methods = Vec::new();
        for method in method_defs {
            let built = self.build_function(method, Some(class_name))?;
            method_names.push(built.name);
            methods.push(built);
        }
        self.registry.set_methods(class_name, method_names);

        let class = self.registry.get(class_name).expect("just registered").clone();
        Ok((class, methods))
    }

    /// Builds one function descriptor. `owning_class` is `Some` for methods.
    #[instrument(skip(self, def))]
    fn build_function(&mut self, def: &ast::StmtFunctionDef, owning_class: Option<StringId>) -> CompileResult<FunctionDescriptor> {
        let name = self.interner.intern(def.name.as_str());
        let mut scope = FunctionScope::default();

        // Every generated function is exposed through a fixed-arity wrapper (spec §4.1,
        // "Supported parameter forms"); variadic parameter kinds have no corresponding
        // calling convention and are rejected here rather than silently dropped.
        if let Some(vararg) = &def.parameters.vararg {
            return Err(CompileError::UnsupportedParameterForm {
                name: def.name.to_string(),
                detail: "`*args` has no fixed-arity C signature",
                span: vararg.range(),
            });
        }
        if let Some(kwarg) = &def.parameters.kwarg {
            return Err(CompileError::UnsupportedParameterForm {
                name: def.name.to_string(),
                detail: "`**kwargs` has no fixed-arity C signature",
                span: kwarg.range(),
            });
        }
        if let Some(kwonly) = def.parameters.kwonlyargs.first() {
            return Err(CompileError::UnsupportedParameterForm {
                name: def.name.to_string(),
                detail: "keyword-only parameters are not dispatched positionally",
                span: kwonly.parameter.range(),
            });
        }

        let mut params = Vec::new();
        let positional = def.parameters.posonlyargs.iter().chain(def.parameters.args.iter());
        for (index, param) in positional.enumerate() {
            let param_name = self.interner.intern(param.parameter.name.as_str());
            let is_self = owning_class.is_some() && index == 0 && param.parameter.name.as_str() == "self";
            let (category, class_name) = if is_self {
                (Category::Obj, None)
            } else if let Some(annotation) = &param.parameter.annotation {
                self.category_from_annotation(annotation)?
            } else {
                (Category::Obj, None)
            };
            if is_self {
                scope.self_class = owning_class;
            }
            if let Some(class_name) = class_name {
                scope.class_typed_params.insert(param_name, class_name);
            }
            scope.locals.insert(param_name, category);
            params.push(Param {
                name: param_name,
                category,
                class_name,
                has_default: param.default.is_some(),
            });
        }

        let return_category = match &def.returns {
            Some(annotation) => self.category_from_annotation(annotation)?.0,
            None => Category::Obj,
        };

        let body = self.build_block(&mut scope, &def.body)?;

        Ok(FunctionDescriptor {
            name,
            params,
            return_category,
            locals: scope.locals,
            class_typed_params: scope.class_typed_params,
            body,
            temp_count: scope.temp_count,
            needs_checked_div: scope.needs_checked_div,
            owning_class,
        })
    }

    /// Resolves an annotation expression to a `Category` plus, when the annotation names a
    /// registered class, that class's interned name (spec §4.1, "Parameter class tracking").
    fn category_from_annotation(&mut self, annotation: &AstExpr) -> CompileResult<(Category, Option<StringId>)> {
        let AstExpr::Name(name) = annotation else {
            return Err(CompileError::UnknownType {
                name: format!("{annotation:?}"),
                span: annotation.range(),
            });
        };
        match name.id.as_str() {
            "int" => Ok((Category::Int, None)),
            "float" => Ok((Category::Float, None)),
            "bool" => Ok((Category::Bool, None)),
            "str" | "object" | "list" | "dict" | "set" | "tuple" => Ok((Category::Obj, None)),
            other => {
                let interned = self.interner.intern(other);
                if self.registry.is_known(interned) {
                    Ok((Category::Obj, Some(interned)))
                } else {
                    Err(CompileError::UnknownType {
                        name: other.to_owned(),
                        span: name.range(),
                    })
                }
            }
        }
    }

    fn build_block(&mut self, scope: &mut FunctionScope, stmts: &[AstStmt]) -> CompileResult<Vec<StmtNode>> {
        stmts.iter().map(|stmt| self.build_stmt(scope, stmt)).collect()
    }

    fn build_stmt(&mut self, scope: &mut FunctionScope, stmt: &AstStmt) -> CompileResult<StmtNode> {
        let span = stmt.range();
        let kind = match stmt {
            AstStmt::Assign(assign) => self.build_assign(scope, assign)?,
            AstStmt::AnnAssign(ann) => self.build_ann_assign(scope, ann)?,
            AstStmt::AugAssign(aug) => self.build_aug_assign(scope, aug)?,
            AstStmt::Return(ret) => Stmt::Return(ret.value.as_deref().map(|v| self.build_expr(scope, v)).transpose()?),
            AstStmt::If(if_stmt) => self.build_if(scope, if_stmt)?,
            AstStmt::For(for_stmt) => self.build_for(scope, for_stmt)?,
            AstStmt::While(while_stmt) => Stmt::While {
                test: self.build_expr(scope, &while_stmt.test)?,
                body: self.build_block(scope, &while_stmt.body)?,
            },
            AstStmt::Break(_) => Stmt::Break,
            AstStmt::Continue(_) => Stmt::Continue,
            AstStmt::Try(try_stmt) => self.build_try(scope, try_stmt)?,
            AstStmt::Raise(raise_stmt) => self.build_raise(scope, raise_stmt)?,
            AstStmt::Expr(expr_stmt) => Stmt::Expr(self.build_expr(scope, &expr_stmt.value)?),
            other => {
                return Err(CompileError::Internal {
                    message: format!("unsupported statement: {other:?}"),
                });
            }
        };
        Ok(StmtNode::new(kind, span))
    }

    /// Implements the declared-vs-rebinding rule (spec §4.1, "Declared-vs-rebinding
    /// assignment"): a name's C-type is fixed the first time it is assigned in the current
    /// function scope and never recomputed afterward.
    fn build_assign(&mut self, scope: &mut FunctionScope, assign: &ast::StmtAssign) -> CompileResult<Stmt> {
        let [target] = assign.targets.as_slice() else {
            return Err(CompileError::Internal {
                message: "multi-target assignment is not part of the supported subset".to_owned(),
            });
        };
        let AstExpr::Name(name) = target else {
            return Err(CompileError::Internal {
                message: "assignment target must be a plain name".to_owned(),
            });
        };
        let target_id = self.interner.intern(name.id.as_str());
        let value = self.build_expr(scope, &assign.value)?;
        let is_declaration = !scope.locals.contains_key(&target_id);
        let declared_category = if is_declaration {
            let category = value.category;
            scope.locals.insert(target_id, category);
            category
        } else {
            scope.locals[&target_id]
        };
        Ok(Stmt::Assign {
            target: target_id,
            declared_category,
            is_declaration,
            value,
        })
    }

    /// `x: T = value` (or `x: T` with no value, inside a class body only). Unlike a plain
    /// `Assign`, the annotation takes priority over the value's own category when declaring
    /// the local (spec §4.1, priority (a)).
    fn build_ann_assign(&mut self, scope: &mut FunctionScope, ann: &ast::StmtAnnAssign) -> CompileResult<Stmt> {
        let AstExpr::Name(name) = ann.target.as_ref() else {
            return Err(CompileError::Internal {
                message: "annotated assignment target must be a plain name".to_owned(),
            });
        };
        let target_id = self.interner.intern(name.id.as_str());
        let (declared_category, _) = self.category_from_annotation(&ann.annotation)?;
        scope.locals.insert(target_id, declared_category);
        let Some(value_expr) = &ann.value else {
            return Err(CompileError::Internal {
                message: "bare annotation with no value is only valid in a class body".to_owned(),
            });
        };
        let value = self.build_expr(scope, value_expr)?;
        Ok(Stmt::Assign {
            target: target_id,
            declared_category,
            is_declaration: true,
            value,
        })
    }

    fn build_aug_assign(&mut self, scope: &mut FunctionScope, aug: &ast::StmtAugAssign) -> CompileResult<Stmt> {
        let AstExpr::Name(name) = aug.target.as_ref() else {
            return Err(CompileError::Internal {
                message: "augmented-assignment target must be a plain name".to_owned(),
            });
        };
        let target_id = self.interner.intern(name.id.as_str());
        let declared_category = *scope.locals.get(&target_id).ok_or_else(|| CompileError::UnknownName {
            name: name.id.to_string(),
            span: name.range(),
        })?;
        let op = convert_binop(&aug.op)?;
        if matches!(op, BinOp::FloorDiv | BinOp::Mod) && scope.try_depth > 0 {
            scope.needs_checked_div = true;
        }
        let value = self.build_expr(scope, &aug.value)?;
        Ok(Stmt::AugAssign {
            target: target_id,
            declared_category,
            op,
            value,
        })
    }

    fn build_if(&mut self, scope: &mut FunctionScope, if_stmt: &ast::StmtIf) -> CompileResult<Stmt> {
        let test = self.build_expr(scope, &if_stmt.test)?;
        let body = self.build_block(scope, &if_stmt.body)?;
        let or_else = self.build_elif_chain(scope, &if_stmt.elif_else_clauses)?;
        Ok(Stmt::If { test, body, or_else })
    }

    /// Desugars a chain of `elif`/`else` clauses into nested `If` statements, the way the
    /// teacher's parser does (it is simpler for the emitter to walk one `If` node with an
    /// `or_else` block than a flat clause list).
    fn build_elif_chain(&mut self, scope: &mut FunctionScope, clauses: &[ast::ElifElseClause]) -> CompileResult<Vec<StmtNode>> {
        let mut tail: Vec<StmtNode> = Vec::new();
        for clause in clauses.iter().rev() {
            let span = clause.range();
            tail = match &clause.test {
                Some(test) => {
                    let test = self.build_expr(scope, test)?;
                    let body = self.build_block(scope, &clause.body)?;
                    vec![StmtNode::new(
                        Stmt::If {
                            test,
                            body,
                            or_else: tail,
                        },
                        span,
                    )]
                }
                None => self.build_block(scope, &clause.body)?,
            };
        }
        Ok(tail)
    }

    fn build_for(&mut self, scope: &mut FunctionScope, for_stmt: &ast::StmtFor) -> CompileResult<Stmt> {
        let AstExpr::Name(name) = for_stmt.target.as_ref() else {
            return Err(CompileError::Internal {
                message: "for-loop target must be a plain name".to_owned(),
            });
        };
        let target_id = self.interner.intern(name.id.as_str());
        let iterable = self.build_expr(scope, &for_stmt.iter)?;
        // Loop variables are always boxed: the element category of an arbitrary iterable is
        // not known without a richer type system than this compiler carries (spec §1,
        // Non-goals: no general type inference beyond annotations/literals).
        let target_category = Category::Obj;
        scope.locals.insert(target_id, target_category);
        let body = self.build_block(scope, &for_stmt.body)?;
        Ok(Stmt::For {
            target: target_id,
            target_category,
            iterable,
            body,
        })
    }

    fn build_try(&mut self, scope: &mut FunctionScope, try_stmt: &ast::StmtTry) -> CompileResult<Stmt> {
        scope.try_depth += 1;
        let body = self.build_block(scope, &try_stmt.body);
        let body = body.and_then(|body| {
            let handlers = try_stmt
                .handlers
                .iter()
                .map(|h| self.build_except_handler(scope, h))
                .collect::<CompileResult<Vec<_>>>()?;
            let or_else = self.build_block(scope, &try_stmt.orelse)?;
            Ok((body, handlers, or_else))
        });
        scope.try_depth -= 1;
        let (body, handlers, or_else) = body?;
        let finally_body = self.build_block(scope, &try_stmt.finalbody)?;
        Ok(Stmt::Try(TryBlock {
            body,
            handlers,
            or_else,
            finally_body,
        }))
    }

    fn build_except_handler(&mut self, scope: &mut FunctionScope, handler: &ast::ExceptHandler) -> CompileResult<ExceptHandler> {
        let ast::ExceptHandler::ExceptHandler(handler) = handler;
        let exc_type = handler
            .type_
            .as_deref()
            .map(|expr| self.exception_type_name(expr))
            .transpose()?;
        let bound_name = handler.name.as_ref().map(|n| self.interner.intern(n.as_str()));
        let body = self.build_block(scope, &handler.body)?;
        Ok(ExceptHandler {
            exc_type,
            bound_name,
            body,
        })
    }

    fn exception_type_name(&mut self, expr: &AstExpr) -> CompileResult<StringId> {
        let AstExpr::Name(name) = expr else {
            return Err(CompileError::Internal {
                message: "except clause must name a single exception type".to_owned(),
            });
        };
        Ok(self.interner.intern(name.id.as_str()))
    }

    fn build_raise(&mut self, scope: &mut FunctionScope, raise_stmt: &ast::StmtRaise) -> CompileResult<Stmt> {
        let Some(exc) = &raise_stmt.exc else {
            return Ok(Stmt::Raise { exc_type: None, message: None });
        };
        match exc.as_ref() {
            AstExpr::Name(name) => Ok(Stmt::Raise {
                exc_type: Some(self.interner.intern(name.id.as_str())),
                message: None,
            }),
            AstExpr::Call(call) => {
                let AstExpr::Name(name) = call.func.as_ref() else {
                    return Err(CompileError::Internal {
                        message: "raise target must be a plain exception name".to_owned(),
                    });
                };
                let exc_type = self.interner.intern(name.id.as_str());
                let message = call
                    .arguments
                    .args
                    .first()
                    .map(|arg| self.build_expr(scope, arg))
                    .transpose()?;
                Ok(Stmt::Raise {
                    exc_type: Some(exc_type),
                    message,
                })
            }
            other => Err(CompileError::Internal {
                message: format!("unsupported raise target: {other:?}"),
            }),
        }
    }

    fn build_expr(&mut self, scope: &mut FunctionScope, expr: &AstExpr) -> CompileResult<ExprNode> {
        let span = expr.range();
        match expr {
            AstExpr::NumberLiteral(n) => Ok(self.build_number_literal(n)),
            AstExpr::BooleanLiteral(b) => Ok(ExprNode::new(Expr::Literal(Literal::Bool(b.value)), Category::Bool, span)),
            AstExpr::NoneLiteral(_) => Ok(ExprNode::new(Expr::Literal(Literal::None), Category::None, span)),
            AstExpr::StringLiteral(s) => {
                let id = self.interner.intern(&s.value.to_string());
                Ok(ExprNode::new(Expr::Literal(Literal::Str(id)), Category::Obj, span))
            }
            AstExpr::Name(name) => self.build_name(scope, name, span),
            AstExpr::BinOp(bin) => self.build_binop(scope, bin, span),
            AstExpr::UnaryOp(un) => self.build_unaryop(scope, un, span),
            AstExpr::Compare(cmp) => self.build_compare(scope, cmp, span),
            AstExpr::Attribute(attr) => self.build_attribute(scope, attr, span),
            AstExpr::Subscript(sub) => self.build_subscript(scope, sub, span),
            AstExpr::Call(call) => self.build_call(scope, call, span),
            other => Err(CompileError::Internal {
                message: format!("unsupported expression: {other:?}"),
            }),
        }
    }

    fn build_number_literal(&mut self, n: &ast::ExprNumberLiteral) -> ExprNode {
        let span = n.range();
        match &n.value {
            Number::Int(i) => {
                let value = i.as_i64().unwrap_or(i64::MAX);
                ExprNode::new(Expr::Literal(Literal::Int(value)), Category::Int, span)
            }
            Number::Float(f) => ExprNode::new(Expr::Literal(Literal::Float(*f)), Category::Float, span),
            Number::Complex { .. } => ExprNode::new(Expr::Literal(Literal::Float(0.0)), Category::Float, span),
        }
    }

    fn build_name(&mut self, scope: &mut FunctionScope, name: &ast::ExprName, span: TextRange) -> CompileResult<ExprNode> {
        let id = self.interner.intern(name.id.as_str());
        let category = *scope.locals.get(&id).ok_or_else(|| CompileError::UnknownName {
            name: name.id.to_string(),
            span,
        })?;
        Ok(ExprNode::new(Expr::Name(id), category, span))
    }

    fn build_binop(&mut self, scope: &mut FunctionScope, bin: &ast::ExprBinOp, span: TextRange) -> CompileResult<ExprNode> {
        let op = convert_binop(&bin.op)?;
        if matches!(op, BinOp::FloorDiv | BinOp::Mod) && scope.try_depth > 0 {
            scope.needs_checked_div = true;
        }
        let lhs = self.build_expr(scope, &bin.left)?;
        let rhs = self.build_expr(scope, &bin.right)?;
        // True division always yields a float, even for two ints - `result_category_for_binop`
        // only sees categories, not the operator, so it can't express this on its own.
        let category = if op == BinOp::Div && lhs.category.is_scalar() && rhs.category.is_scalar() {
            Category::Float
        } else {
            result_category_for_binop(lhs.category, rhs.category)
        };
        Ok(ExprNode::new(
            Expr::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            category,
            span,
        ))
    }

    fn build_unaryop(&mut self, scope: &mut FunctionScope, un: &ast::ExprUnaryOp, span: TextRange) -> CompileResult<ExprNode> {
        // Unary plus is always a no-op on the categories this compiler supports; skip
        // wrapping it in a node at all rather than inventing an identity `UnaryOp` variant.
        if matches!(un.op, ast::UnaryOp::UAdd) {
            return self.build_expr(scope, &un.operand);
        }
        let op = match un.op {
            ast::UnaryOp::USub => UnaryOp::Neg,
            ast::UnaryOp::Not => UnaryOp::Not,
            ast::UnaryOp::Invert => UnaryOp::Invert,
            ast::UnaryOp::UAdd => unreachable!("handled above"),
        };
        let operand = self.build_expr(scope, &un.operand)?;
        let category = if matches!(un.op, ast::UnaryOp::Not) { Category::Bool } else { operand.category };
        Ok(ExprNode::new(
            Expr::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            category,
            span,
        ))
    }

    fn build_compare(&mut self, scope: &mut FunctionScope, cmp: &ast::ExprCompare, span: TextRange) -> CompileResult<ExprNode> {
        let [op] = cmp.ops.as_ref() else {
            return Err(CompileError::Internal {
                message: "chained comparisons are not part of the supported subset".to_owned(),
            });
        };
        let [rhs] = cmp.comparators.as_ref() else {
            return Err(CompileError::Internal {
                message: "chained comparisons are not part of the supported subset".to_owned(),
            });
        };
        let op = convert_cmpop(op)?;
        let lhs = self.build_expr(scope, &cmp.left)?;
        let rhs = self.build_expr(scope, rhs)?;
        Ok(ExprNode::new(
            Expr::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Category::Bool,
            span,
        ))
    }

    /// Implements the three disjoint attribute-read cases from spec §4.1.
    fn build_attribute(&mut self, scope: &mut FunctionScope, attr: &ast::ExprAttribute, span: TextRange) -> CompileResult<ExprNode> {
        let attr_id = self.interner.intern(attr.attr.as_str());
        if let AstExpr::Name(receiver) = attr.value.as_ref() {
            let receiver_id = self.interner.intern(receiver.id.as_str());
            if receiver.id.as_str() == "self" {
                if let Some(class_name) = scope.self_class {
                    let class = self.registry.get(class_name).expect("self_class always registered");
                    if let Some((field_category, _)) = class.field(attr_id) {
                        return Ok(ExprNode::new(
                            Expr::SelfAttr {
                                field: attr_id,
                                field_category,
                            },
                            field_category,
                            span,
                        ));
                    }
                }
            } else if let Some(&class_name) = scope.class_typed_params.get(&receiver_id) {
                let class = self.registry.get(class_name).expect("class-typed param always registered");
                let (field_category, _) = class.field(attr_id).ok_or_else(|| CompileError::UnknownName {
                    name: attr.attr.to_string(),
                    span,
                })?;
                return Ok(ExprNode::new(
                    Expr::ParamAttr {
                        param: receiver_id,
                        class_name,
                        field: attr_id,
                        field_category,
                    },
                    field_category,
                    span,
                ));
            }
        }
        // Generic attribute-load (method-dispatch) path: the receiver may be boxed object
        // only, so a scalar receiver is a compile error (spec §7, "method call on a receiver
        // whose category is known scalar").
        let receiver = self.build_expr(scope, &attr.value)?;
        if receiver.category.is_scalar() {
            return Err(CompileError::MethodCallOnScalar {
                name: attr.attr.to_string(),
                category: receiver.category,
                span,
            });
        }
        Ok(ExprNode::new(
            Expr::GenericAttr {
                receiver: Box::new(receiver),
                attr: attr_id,
            },
            Category::Obj,
            span,
        ))
    }

    fn build_subscript(&mut self, scope: &mut FunctionScope, sub: &ast::ExprSubscript, span: TextRange) -> CompileResult<ExprNode> {
        let receiver = self.build_expr(scope, &sub.value)?;
        let index = self.build_expr(scope, &sub.slice)?;
        Ok(ExprNode::new(
            Expr::Subscript {
                receiver: Box::new(receiver),
                index: Box::new(index),
            },
            Category::Obj,
            span,
        ))
    }

    /// A call lowers to one of three shapes: a built-in conversion constructor
    /// (`Expr::BuiltinCall`), a method call (`receiver.method(args)`, `Expr::MethodCall`), or
    /// a plain named-function call (`Expr::Call`) - spec §4.1, "Method calls and built-ins".
    fn build_call(&mut self, scope: &mut FunctionScope, call: &ast::ExprCall, span: TextRange) -> CompileResult<ExprNode> {
        match call.func.as_ref() {
            AstExpr::Name(name) if BuiltinCtor::from_name(name.id.as_str()).is_some() => {
                let ctor = BuiltinCtor::from_name(name.id.as_str()).expect("checked above");
                let [arg] = call.arguments.args.as_ref() else {
                    return Err(CompileError::Internal {
                        message: format!("builtin `{}` takes exactly one argument", name.id),
                    });
                };
                let arg = self.build_expr(scope, arg)?;
                Ok(ExprNode::new(
                    Expr::BuiltinCall { ctor, arg: Box::new(arg) },
                    ctor.result_category(),
                    span,
                ))
            }
            AstExpr::Name(name) => {
                let function = self.interner.intern(name.id.as_str());
                let args = call
                    .arguments
                    .args
                    .iter()
                    .map(|arg| self.build_expr(scope, arg))
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(ExprNode::new(Expr::Call { function, args }, Category::Obj, span))
            }
            AstExpr::Attribute(attr) => {
                let receiver = self.build_expr(scope, &attr.value)?;
                if receiver.category.is_scalar() {
                    return Err(CompileError::MethodCallOnScalar {
                        name: attr.attr.to_string(),
                        category: receiver.category,
                        span,
                    });
                }
                let method = self.interner.intern(attr.attr.as_str());
                let args = call
                    .arguments
                    .args
                    .iter()
                    .map(|arg| self.build_expr(scope, arg))
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(ExprNode::new(
                    Expr::MethodCall {
                        receiver: Box::new(receiver),
                        method,
                        args,
                    },
                    Category::Obj,
                    span,
                ))
            }
            other => Err(CompileError::Internal {
                message: format!("unsupported call target: {other:?}"),
            }),
        }
    }
}

fn convert_binop(op: &ast::Operator) -> CompileResult<BinOp> {
    use ast::Operator;
    Ok(match op {
        Operator::Add => BinOp::Add,
        Operator::Sub => BinOp::Sub,
        Operator::Mult => BinOp::Mul,
        Operator::Div => BinOp::Div,
        Operator::FloorDiv => BinOp::FloorDiv,
        Operator::Mod => BinOp::Mod,
        Operator::Pow => BinOp::Pow,
        Operator::LShift => BinOp::LShift,
        Operator::RShift => BinOp::RShift,
        Operator::BitOr => BinOp::BitOr,
        Operator::BitXor => BinOp::BitXor,
        Operator::BitAnd => BinOp::BitAnd,
        Operator::MatMult => {
            return Err(CompileError::Internal {
                message: "matrix multiplication is not part of the supported subset".to_owned(),
            });
        }
    })
}

fn convert_cmpop(op: &ast::CmpOp) -> CompileResult<CmpOp> {
    use ast::CmpOp as AstCmpOp;
    Ok(match op {
        AstCmpOp::Eq => CmpOp::Eq,
        AstCmpOp::NotEq => CmpOp::NotEq,
        AstCmpOp::Lt => CmpOp::Lt,
        AstCmpOp::LtE => CmpOp::LtE,
        AstCmpOp::Gt => CmpOp::Gt,
        AstCmpOp::GtE => CmpOp::GtE,
        AstCmpOp::Is => CmpOp::Is,
        AstCmpOp::IsNot => CmpOp::IsNot,
        AstCmpOp::In => CmpOp::In,
        AstCmpOp::NotIn => CmpOp::NotIn,
    })
}

/// Arithmetic on two unboxed scalars of the same category stays that category; any boxed
/// operand, or a mismatched scalar pair, produces a boxed result (spec §4.2, "Binary
/// operators": mixed/fully-boxed operands go through the generic `binary_op` primitive,
/// which always returns a handle).
fn result_category_for_binop(lhs: Category, rhs: Category) -> Category {
    match (lhs, rhs) {
        (Category::Int, Category::Int) => Category::Int,
        (Category::Float, Category::Float)
        | (Category::Int, Category::Float)
        | (Category::Float, Category::Int) => Category::Float,
        (Category::Bool, Category::Bool) => Category::Int,
        _ => Category::Obj,
    }
}
