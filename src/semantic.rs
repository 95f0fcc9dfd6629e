//! Declaration processing for a C front end.
//!
//! This is where parsed declarator syntax becomes semantics: declarator
//! trees plus decl-specifier chains are resolved into typed declaration
//! records, nested binding contours and the struct/union/enum tag
//! namespace are maintained, and function definitions are driven through
//! their lifecycle.

pub mod const_eval;
pub mod declarator;
pub mod decls;
pub mod function;
pub mod output;
pub mod records;
pub mod resolver;
pub mod scope;
pub mod type_registry;
pub mod types;

pub use const_eval::eval_const_expr;
pub use declarator::{DeclContext, Resolved};
pub use decls::{Decl, DeclArena, DeclFlags, DeclHome, DeclKind, DeclRef, FuncData, ParmName};
pub use function::{FunctionPhase, FunctionState};
pub use output::{Backend, NullBackend, UnitView};
pub use resolver::Resolver;
pub use scope::{BindingLevel, ScopeStack};
pub use type_registry::TypeRegistry;
pub use types::{
    ArrayDomain, FloatRank, FunctionParams, IntRank, TagEntry, TagKind, Type, TypeKind, TypeLayout, TypeQualifiers,
    TypeRef,
};
