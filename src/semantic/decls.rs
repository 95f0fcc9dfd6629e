//! Declaration records.
//!
//! Declarations live in a flattened arena addressed by `DeclRef`. A
//! compatible redeclaration is merged *into* the existing slot, so every
//! `DeclRef` already handed out keeps observing the canonical record.
//! The arena supports watermark/truncate for the per-function bulk
//! release; references into the released region must not outlive the
//! function's processing.

use bitflags::bitflags;

use crate::ast::{NameId, NodeRef, SourceSpan};
use crate::semantic::TypeRef;
use std::num::NonZeroU32;

/// Opaque reference to a declaration in the arena (index + 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef(NonZeroU32);

impl DeclRef {
    #[inline]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(DeclRef)
    }

    #[inline]
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

bitflags! {
    /// Storage and qualifier flags of a declaration.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct DeclFlags: u16 {
        /// Has static storage (at file scope this means "is allocated
        /// here", and is cleared again for functions until defined).
        const STATIC = 1 << 0;
        /// Declared `extern`, or a function not yet defined in this unit.
        const EXTERNAL = 1 << 1;
        /// Visible outside the compilation unit.
        const PUBLIC = 1 << 2;
        /// `register` storage class; advisory only.
        const REGISTER = 1 << 3;
        /// Resolved `const`.
        const READONLY = 1 << 4;
        /// Resolved `volatile`.
        const VOLATILE = 1 << 5;
        /// Carries a real definition (function body seen, or the
        /// declaration is being initialized).
        const DEFINED = 1 << 6;
        /// Bit-field with an explicit width.
        const PACKED = 1 << 7;
        /// Field must start at a word boundary (set by a preceding
        /// zero-width bit-field).
        const WORD_ALIGNED = 1 << 8;
    }
}

/// What a declaration is nested in: a braced block, or the struct/union
/// type a field belongs to. Also doubles as the "already bound" marker
/// when matching parameter names to declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclHome {
    Block(NodeRef),
    Record(TypeRef),
}

/// Per-kind payload of a declaration.
#[derive(Debug, Clone)]
pub enum DeclKind {
    Var,
    Parm {
        /// Type an unprototyped call site converts the argument to:
        /// `double` for `float`, `int` for anything narrower.
        arg_type: TypeRef,
    },
    /// The anonymous `<value>` declaration holding a function's return
    /// value.
    Result,
    Func(FuncData),
    Typedef,
    Field {
        /// Unresolved bit-field width expression, if one was written.
        width: Option<NodeRef>,
        /// Resolved width in bits for packed fields.
        bit_size: Option<u32>,
    },
    EnumConst {
        value: i64,
    },
    Label,
}

/// Function-specific links.
#[derive(Debug, Clone, Default)]
pub struct FuncData {
    /// Formal parameter declarations in source order; installed by the
    /// function lifecycle once names and declarations are matched.
    pub parms: Vec<DeclRef>,
    /// The (declared-type-or-none, name) list captured from the function
    /// declarator, awaiting `store_parm_decls`.
    pub parm_names: Vec<ParmName>,
    /// The `<value>` result declaration while the body is open.
    pub result: Option<DeclRef>,
    /// The body block while the body is open.
    pub body: Option<NodeRef>,
}

/// One entry of the parameter-name list left behind by a function
/// declarator.
#[derive(Debug, Clone, Copy)]
pub struct ParmName {
    pub ty: Option<TypeRef>,
    pub name: Option<NameId>,
}

/// One declaration record.
#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    /// None for abstract parameter declarations.
    pub name: Option<NameId>,
    pub ty: TypeRef,
    pub flags: DeclFlags,
    pub span: SourceSpan,
    pub init: Option<NodeRef>,
    pub home: Option<DeclHome>,
    /// Storage position in bits within the enclosing record or parameter
    /// area, once laid out.
    pub offset_bits: Option<u32>,
}

impl Decl {
    pub fn is_function(&self) -> bool {
        matches!(self.kind, DeclKind::Func(_))
    }

    /// Whether this declaration carries a definition, for redeclaration
    /// checking.
    pub fn has_definition(&self) -> bool {
        self.init.is_some() || self.flags.contains(DeclFlags::DEFINED)
    }
}

/// Watermark into the declaration arena.
#[derive(Debug, Clone, Copy)]
pub struct DeclMark(usize);

/// Flattened declaration storage.
#[derive(Default)]
pub struct DeclArena {
    decls: Vec<Decl>,
}

impl DeclArena {
    pub fn new() -> Self {
        DeclArena::default()
    }

    pub fn alloc(&mut self, decl: Decl) -> DeclRef {
        let index = self.decls.len() as u32 + 1;
        self.decls.push(decl);
        DeclRef::new(index).expect("ICE: declaration arena overflow")
    }

    pub fn get(&self, r: DeclRef) -> &Decl {
        &self.decls[r.index()]
    }

    pub fn get_mut(&mut self, r: DeclRef) -> &mut Decl {
        &mut self.decls[r.index()]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Record the current high-water mark.
    pub fn mark(&self) -> DeclMark {
        DeclMark(self.decls.len())
    }

    /// Drop every declaration allocated after `mark`.
    pub fn release_to(&mut self, mark: DeclMark) {
        self.decls.truncate(mark.0);
    }
}
