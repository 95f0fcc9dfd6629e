//! The hand-off seam to the rest of the compiler.
//!
//! Each finalized item crosses this boundary exactly once: a function at
//! `finish_function` (before its local allocation region is released), a
//! variable at `finish_decl` once its initializer and any array-bound
//! deduction have settled. A backend that needs anything past that point
//! must copy it out while the view is live.

use crate::ast::Ast;
use crate::semantic::decls::{DeclArena, DeclRef};
use crate::semantic::type_registry::TypeRegistry;

/// Borrowed view of the resolution state passed along with a hand-off.
pub struct UnitView<'a> {
    pub ast: &'a Ast,
    pub decls: &'a DeclArena,
    pub types: &'a TypeRegistry,
}

/// Consumer of finalized declarations; the code-generation side of the
/// front end implements this.
pub trait Backend {
    /// A completed function definition: resolved type, formal parameter
    /// chain with offsets, body block.
    fn emit_function(&mut self, unit: UnitView<'_>, func: DeclRef);

    /// A finalized variable declaration with resolved, laid-out type.
    fn emit_variable(&mut self, unit: UnitView<'_>, var: DeclRef);
}

/// Backend that discards everything. Useful when only the symbol-table
/// effects of resolution are of interest.
#[derive(Debug, Default)]
pub struct NullBackend;

impl Backend for NullBackend {
    fn emit_function(&mut self, _unit: UnitView<'_>, _func: DeclRef) {}

    fn emit_variable(&mut self, _unit: UnitView<'_>, _var: DeclRef) {}
}
