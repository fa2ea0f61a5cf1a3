#![allow(
    clippy::cast_possible_truncation, // intentional: arena indices and frame offsets fit in u32/i32
    clippy::cast_possible_wrap, // intentional: frame depth is converted to a negative i32 offset
    clippy::missing_errors_doc // every fallible entry point returns crate::Error, documented there
)]

//! A small compiler backend: AST -> linear IR -> x86-64 assembly.
//!
//! Pipeline for one function:
//! 1. [`ir::build_ir`] walks the AST, resolving names through a
//!    [`scope::ScopeTable`] and allocating frame slots for declarations.
//! 2. [`ir::Function::layout`] gives every IR temporary its own home slot.
//! 3. [`codegen::lower_function`] emits assembly, caching temporaries in the six
//!    argument registers and spilling to home slots when they run out.

pub mod abi;
pub mod asm;
pub mod ast;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod options;
pub mod scope;

/// Test harness module for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use asm::AsmFunction;
pub use ast::{Node, TranslationUnit};
pub use error::{Error, Result};
pub use ir::build_ir;
pub use options::{CompileOptions, Scoping};
pub use scope::ScopeTable;

/// Compile `unit` to assembly text with default options.
pub fn compile(unit: &TranslationUnit) -> Result<String> {
    compile_with_options(unit, &CompileOptions::default())
}

/// Compile `unit` to assembly text, with scoping and annotation taken from
/// `options`.
pub fn compile_with_options(unit: &TranslationUnit, options: &CompileOptions) -> Result<String> {
    Ok(lower(unit, options)?.to_string())
}

/// Run the whole pipeline, returning the structured listing.
pub fn lower(unit: &TranslationUnit, options: &CompileOptions) -> Result<AsmFunction> {
    let mut function = build_ir(unit, options)?;
    function.layout()?;
    codegen::lower_function(&function, options)
}
