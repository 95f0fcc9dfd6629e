//! Parser-facing declaration syntax.
//!
//! The grammar hands the resolver a declarator tree (pointer / array /
//! function layers wrapped around a name, or around nothing for abstract
//! declarators) together with a chain of declaration specifiers. Both are
//! purely syntactic; all meaning is assigned during resolution.

use thin_vec::ThinVec;

use crate::ast::{NameId, NodeRef, SourceSpan};
use crate::semantic::{TypeQualifiers, TypeRef};

/// Storage-class and type-modifier keywords as they appear in a
/// declaration-specifier chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKeyword {
    Auto,
    Static,
    Extern,
    Register,
    Typedef,
    Long,
    Short,
    Signed,
    Unsigned,
    Const,
    Volatile,
}

/// One entry of a declaration-specifier chain.
#[derive(Debug, Clone)]
pub enum ParsedDeclSpec {
    Keyword(SpecKeyword),
    /// A type name: either a builtin (`int`, `char`, `double`, ...) or a
    /// user typedef. Resolved against the ordinary namespace.
    TypeName(NameId),
    /// A struct/union/enum type already constructed by the tag builders.
    TagType(TypeRef),
}

/// A declarator: wrapper layers around a terminal name (or an empty slot
/// for abstract declarators). The outermost syntactic construct is the
/// outermost tree node, so `*(*x[3])()` is
/// Pointer(Function(Pointer(Array(Name(x))))).
#[derive(Debug, Clone)]
pub enum ParsedDeclarator {
    Name(NameId),
    Abstract,
    Pointer {
        /// Qualifiers written inside this `*` (e.g. `* const`).
        qualifiers: TypeQualifiers,
        inner: Box<ParsedDeclarator>,
    },
    Array {
        /// Bound expression, or None for an open `[]`.
        bound: Option<NodeRef>,
        inner: Box<ParsedDeclarator>,
    },
    Function {
        params: ThinVec<ParsedParam>,
        inner: Box<ParsedDeclarator>,
    },
}

impl ParsedDeclarator {
    pub fn name(name: NameId) -> Self {
        ParsedDeclarator::Name(name)
    }

    pub fn pointer(inner: ParsedDeclarator) -> Self {
        ParsedDeclarator::Pointer {
            qualifiers: TypeQualifiers::empty(),
            inner: Box::new(inner),
        }
    }

    pub fn pointer_qualified(qualifiers: TypeQualifiers, inner: ParsedDeclarator) -> Self {
        ParsedDeclarator::Pointer {
            qualifiers,
            inner: Box::new(inner),
        }
    }

    pub fn array(bound: Option<NodeRef>, inner: ParsedDeclarator) -> Self {
        ParsedDeclarator::Array {
            bound,
            inner: Box::new(inner),
        }
    }

    pub fn function(params: ThinVec<ParsedParam>, inner: ParsedDeclarator) -> Self {
        ParsedDeclarator::Function {
            params,
            inner: Box::new(inner),
        }
    }

    /// The declared name, if any.
    pub fn declared_name(&self) -> Option<NameId> {
        match self {
            ParsedDeclarator::Name(name) => Some(*name),
            ParsedDeclarator::Abstract => None,
            ParsedDeclarator::Pointer { inner, .. }
            | ParsedDeclarator::Array { inner, .. }
            | ParsedDeclarator::Function { inner, .. } => inner.declared_name(),
        }
    }
}

/// One element of a function declarator's parameter list.
#[derive(Debug, Clone)]
pub enum ParsedParam {
    /// Old-style bare identifier: name only, no type yet.
    Name(NameId),
    /// Prototype-style parameter with its own specifiers and declarator.
    Typed {
        specs: ThinVec<ParsedDeclSpec>,
        declarator: ParsedDeclarator,
        span: SourceSpan,
    },
    /// Terminating `void`: no further arguments are permitted.
    VoidMarker,
}
