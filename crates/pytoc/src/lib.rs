//! pytoc: ahead-of-time compiles a statically-typed Python subset to C targeting the
//! MicroPython embedded runtime ABI.
//!
//! Four stages, grounded on the teacher's own pipeline split: AST Normalizer (surface AST
//! ingestion, [`ruff_python_parser`]), IR Builder ([`ir::builder`]), Type Oracle
//! ([`oracle`]), and Code Emitter ([`emit`]).

pub mod category;
pub mod emit;
pub mod errors;
pub mod intern;
pub mod ir;
pub mod options;
pub mod oracle;

use errors::CompileResult;
use options::CompileOptions;

/// Runs the full pipeline over one module's source text: parse, build IR, emit C.
#[tracing::instrument(skip_all)]
pub fn compile_module(source: &str, options: &CompileOptions) -> CompileResult<String> {
    let parsed = ruff_python_parser::parse_module(source).map_err(|err| errors::CompileError::Internal {
        message: format!("parse error: {err}"),
    })?;

    let ast = parsed.into_syntax();
    let mut interner = intern::Interner::new();
    let mut builder = ir::builder::IrBuilder::new(&mut interner);
    let module = builder.build_module(&ast)?;

    let emitter = emit::CodeEmitter::new(&interner, builder.registry(), options);
    emitter.emit_module(&module)
}
