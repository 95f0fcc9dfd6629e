//! Type system representation.
//!
//! Semantic types are stored in the [`TypeRegistry`](super::TypeRegistry)
//! arena and addressed by `TypeRef`. A const/volatile qualified type is a
//! distinct node sharing an unqualified main variant with its siblings;
//! structural processing always reduces to the main variant first.

use std::fmt::Display;
use std::num::NonZeroU32;

use bitflags::bitflags;

use crate::ast::{NameId, NodeRef};
use crate::semantic::DeclRef;

/// Opaque reference to a type in the registry (index + 1).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRef(NonZeroU32);

impl TypeRef {
    #[inline]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(TypeRef)
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

impl Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeRef({})", self.get())
    }
}

bitflags! {
    /// Type qualifiers.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TypeQualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
    }
}

impl Display for TypeQualifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        if self.contains(TypeQualifiers::CONST) {
            write!(f, "const")?;
            first = false;
        }
        if self.contains(TypeQualifiers::VOLATILE) {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "volatile")?;
        }
        Ok(())
    }
}

/// Which tag namespace entry a struct/union/enum type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Struct,
    Union,
    Enum,
}

impl Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagKind::Struct => write!(f, "struct"),
            TagKind::Union => write!(f, "union"),
            TagKind::Enum => write!(f, "enum"),
        }
    }
}

/// One entry of a scope's tag list: name (None for anonymous tags, which
/// are only reachable through the type node itself) and the tag type.
pub type TagEntry = (Option<NameId>, TypeRef);

/// Width rank of an integer type. Ordering follows the promotion rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntRank {
    Char,
    Short,
    Int,
    Long,
}

/// Width rank of a floating type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatRank {
    Float,
    Double,
    LongDouble,
}

/// Domain of an array type: the maximum valid index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayDomain {
    /// Bound was a compile-time constant; `max_index` is bound - 1.
    Fixed { max_index: i64 },
    /// Bound was not constant; the node is the deferred `bound - 1`
    /// expression.
    Computed(NodeRef),
}

/// Parameter-type information of a function type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionParams {
    /// No parameter types were specified (old-style declaration).
    Unspecified,
    /// Parameter types are known. `variadic` is set when the list was not
    /// closed off, so additional arguments remain permitted.
    Known { types: Vec<TypeRef>, variadic: bool },
}

/// Size and alignment in bytes. Absent while a type is incomplete or an
/// array bound is still unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLayout {
    pub size: u32,
    pub align: u32,
}

/// One type node.
#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    /// Printed name: the tag for struct/union/enum, or the first typedef
    /// declared for the type.
    pub name: Option<NameId>,
    /// Qualifiers of this variant; empty on main variants.
    pub qualifiers: TypeQualifiers,
    /// The unqualified variant all siblings share; self for main variants.
    /// Record/enum membership and layout are always read through it.
    pub main_variant: TypeRef,
    pub layout: Option<TypeLayout>,
}

/// The kind of type.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Void,
    Integer {
        signed: bool,
        rank: IntRank,
    },
    Real {
        rank: FloatRank,
    },
    Pointer {
        pointee: TypeRef,
    },
    Array {
        element: TypeRef,
        /// None while the array is open (`[]`), pending an initializer.
        domain: Option<ArrayDomain>,
    },
    Function {
        return_type: TypeRef,
        params: FunctionParams,
    },
    Record {
        is_union: bool,
        /// Field declarations in declaration order.
        members: Vec<DeclRef>,
        complete: bool,
    },
    Enum {
        /// (name, value) pairs installed by the enum builder.
        values: Vec<(NameId, i64)>,
        /// Largest enumerator value seen; the representable range.
        max_value: i64,
        complete: bool,
    },
    /// Substituted for erroneous constructs so one mistake does not
    /// cascade into a storm of follow-on diagnostics.
    Error,
}

impl TypeKind {
    /// Tag-namespace kind of this type, if it has one.
    pub fn tag_kind(&self) -> Option<TagKind> {
        match self {
            TypeKind::Record { is_union: false, .. } => Some(TagKind::Struct),
            TypeKind::Record { is_union: true, .. } => Some(TagKind::Union),
            TypeKind::Enum { .. } => Some(TagKind::Enum),
            _ => None,
        }
    }
}

impl Type {
    /// Create an unqualified type node. Only the registry allocates these;
    /// `main_variant` is patched to the node's own ref on allocation.
    pub(crate) fn new(kind: TypeKind) -> Self {
        Type {
            kind,
            name: None,
            qualifiers: TypeQualifiers::empty(),
            // Placeholder until alloc patches it.
            main_variant: TypeRef::new(u32::MAX).unwrap(),
            layout: None,
        }
    }

    /// Whether the type can be used for an object. Scalar and derived
    /// types always can; records and enums only once defined.
    pub fn is_complete(&self) -> bool {
        match &self.kind {
            TypeKind::Record { complete, .. } | TypeKind::Enum { complete, .. } => *complete,
            _ => true,
        }
    }
}
