//! Type registry: arena and canonicalization layer for semantic types,
//! plus the layout engine.
//!
//! Invariants:
//! - All `TypeRef`s come from this registry.
//! - Types are never removed; they persist for the whole compilation.
//! - Pointer, function and qualified-variant types are canonicalized;
//!   array types are not, because an open array is completed in place
//!   when its initializer settles the bound.
//! - Layout of records and enums is stored on the main variant only.

use hashbrown::HashMap;
use log::debug;

use crate::ast::NameId;
use crate::semantic::decls::{DeclArena, DeclFlags, DeclKind, DeclRef};
use crate::semantic::types::{
    ArrayDomain, FloatRank, FunctionParams, IntRank, Type, TypeKind, TypeLayout, TypeQualifiers, TypeRef,
};

const BYTE_BITS: u32 = 8;
const WORD_BYTES: u32 = 4;
pub const WORD_BITS: u32 = WORD_BYTES * BYTE_BITS;

/// Central arena and factory for semantic types.
pub struct TypeRegistry {
    types: Vec<Type>,

    // --- Canonicalization caches ---
    pointer_cache: HashMap<TypeRef, TypeRef>,
    function_cache: HashMap<FnSigKey, TypeRef>,
    variant_cache: HashMap<(TypeRef, TypeQualifiers), TypeRef>,

    // --- Predefined types ---
    pub type_void: TypeRef,
    pub type_char: TypeRef,
    pub type_char_unsigned: TypeRef,
    pub type_short: TypeRef,
    pub type_short_unsigned: TypeRef,
    pub type_int: TypeRef,
    pub type_int_unsigned: TypeRef,
    pub type_long: TypeRef,
    pub type_long_unsigned: TypeRef,
    pub type_float: TypeRef,
    pub type_double: TypeRef,
    pub type_long_double: TypeRef,
    pub type_error: TypeRef,
    /// `void *`
    pub type_ptr_void: TypeRef,
    /// `char *`
    pub type_string: TypeRef,
    /// `int ()` -- used for implicit declarations of functions.
    pub type_default_function: TypeRef,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut reg = TypeRegistry {
            types: Vec::new(),
            pointer_cache: HashMap::new(),
            function_cache: HashMap::new(),
            variant_cache: HashMap::new(),
            type_void: TypeRef::new(1).unwrap(),
            type_char: TypeRef::new(1).unwrap(),
            type_char_unsigned: TypeRef::new(1).unwrap(),
            type_short: TypeRef::new(1).unwrap(),
            type_short_unsigned: TypeRef::new(1).unwrap(),
            type_int: TypeRef::new(1).unwrap(),
            type_int_unsigned: TypeRef::new(1).unwrap(),
            type_long: TypeRef::new(1).unwrap(),
            type_long_unsigned: TypeRef::new(1).unwrap(),
            type_float: TypeRef::new(1).unwrap(),
            type_double: TypeRef::new(1).unwrap(),
            type_long_double: TypeRef::new(1).unwrap(),
            type_error: TypeRef::new(1).unwrap(),
            type_ptr_void: TypeRef::new(1).unwrap(),
            type_string: TypeRef::new(1).unwrap(),
            type_default_function: TypeRef::new(1).unwrap(),
        };

        reg.type_error = reg.alloc(Type::new(TypeKind::Error));
        reg.type_void = reg.alloc(Type::new(TypeKind::Void));
        reg.type_char = reg.alloc_integer(true, IntRank::Char);
        reg.type_char_unsigned = reg.alloc_integer(false, IntRank::Char);
        reg.type_short = reg.alloc_integer(true, IntRank::Short);
        reg.type_short_unsigned = reg.alloc_integer(false, IntRank::Short);
        reg.type_int = reg.alloc_integer(true, IntRank::Int);
        reg.type_int_unsigned = reg.alloc_integer(false, IntRank::Int);
        reg.type_long = reg.alloc_integer(true, IntRank::Long);
        reg.type_long_unsigned = reg.alloc_integer(false, IntRank::Long);
        reg.type_float = reg.alloc(Type::new(TypeKind::Real { rank: FloatRank::Float }));
        reg.type_double = reg.alloc(Type::new(TypeKind::Real { rank: FloatRank::Double }));
        reg.type_long_double = reg.alloc(Type::new(TypeKind::Real {
            rank: FloatRank::LongDouble,
        }));

        for t in [
            reg.type_void,
            reg.type_char,
            reg.type_char_unsigned,
            reg.type_short,
            reg.type_short_unsigned,
            reg.type_int,
            reg.type_int_unsigned,
            reg.type_long,
            reg.type_long_unsigned,
            reg.type_float,
            reg.type_double,
            reg.type_long_double,
        ] {
            reg.layout_type(t);
        }

        reg.type_ptr_void = reg.pointer_to(reg.type_void);
        reg.type_string = reg.pointer_to(reg.type_char);
        reg.type_default_function = reg.function_type(reg.type_int, FunctionParams::Unspecified);

        reg
    }

    fn alloc_integer(&mut self, signed: bool, rank: IntRank) -> TypeRef {
        self.alloc(Type::new(TypeKind::Integer { signed, rank }))
    }

    /// Allocate a new type node and return its ref. The node becomes its
    /// own main variant.
    fn alloc(&mut self, mut ty: Type) -> TypeRef {
        let r = TypeRef::new(self.types.len() as u32 + 1).expect("ICE: type arena overflow");
        ty.main_variant = r;
        self.types.push(ty);
        r
    }

    #[inline]
    pub fn get(&self, r: TypeRef) -> &Type {
        &self.types[r.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, r: TypeRef) -> &mut Type {
        &mut self.types[r.index()]
    }

    #[inline]
    pub fn main_variant(&self, r: TypeRef) -> TypeRef {
        self.types[r.index()].main_variant
    }

    /// Record the identifier a type prints as, if it has none yet.
    pub fn name_type(&mut self, r: TypeRef, name: NameId) {
        let ty = self.get_mut(r);
        if ty.name.is_none() {
            ty.name = Some(name);
        }
    }

    // ============================================================
    // Canonical type constructors
    // ============================================================

    pub fn pointer_to(&mut self, pointee: TypeRef) -> TypeRef {
        if let Some(&p) = self.pointer_cache.get(&pointee) {
            return p;
        }
        let p = self.alloc(Type::new(TypeKind::Pointer { pointee }));
        self.layout_type(p);
        self.pointer_cache.insert(pointee, p);
        p
    }

    /// Array types are deliberately not canonicalized: an open array is
    /// completed in place later, which must not affect unrelated arrays.
    pub fn array_of(&mut self, element: TypeRef, domain: Option<ArrayDomain>) -> TypeRef {
        self.alloc(Type::new(TypeKind::Array { element, domain }))
    }

    pub fn function_type(&mut self, return_type: TypeRef, params: FunctionParams) -> TypeRef {
        let key = FnSigKey {
            return_type,
            params: params.clone(),
        };
        if let Some(&f) = self.function_cache.get(&key) {
            return f;
        }
        let f = self.alloc(Type::new(TypeKind::Function { return_type, params }));
        self.layout_type(f);
        self.function_cache.insert(key, f);
        f
    }

    /// Look up or create the variant of `base` with exactly the given
    /// qualifiers. Qualifiers are never flags on a shared node; each
    /// combination is its own node sharing the main variant.
    pub fn build_type_variant(&mut self, base: TypeRef, constp: bool, volatilep: bool) -> TypeRef {
        let mut quals = TypeQualifiers::empty();
        quals.set(TypeQualifiers::CONST, constp);
        quals.set(TypeQualifiers::VOLATILE, volatilep);

        let main = self.main_variant(base);
        if quals.is_empty() {
            return main;
        }
        if let Some(&v) = self.variant_cache.get(&(main, quals)) {
            return v;
        }

        let template = self.get(main);
        let variant = Type {
            kind: template.kind.clone(),
            name: template.name,
            qualifiers: quals,
            main_variant: main,
            layout: template.layout,
        };
        let r = TypeRef::new(self.types.len() as u32 + 1).expect("ICE: type arena overflow");
        self.types.push(variant);
        self.variant_cache.insert((main, quals), r);
        debug!("TypeRegistry: created {} variant of {}", quals, main);
        r
    }

    // ============================================================
    // Record / enum handling
    // ============================================================

    /// Allocate an incomplete struct or union type (a forward reference).
    pub fn incomplete_record(&mut self, is_union: bool) -> TypeRef {
        self.alloc(Type::new(TypeKind::Record {
            is_union,
            members: Vec::new(),
            complete: false,
        }))
    }

    /// Allocate an incomplete enum type (a forward reference).
    pub fn incomplete_enum(&mut self) -> TypeRef {
        self.alloc(Type::new(TypeKind::Enum {
            values: Vec::new(),
            max_value: 0,
            complete: false,
        }))
    }

    // ============================================================
    // Structural compatibility
    // ============================================================

    /// Structural type compatibility, used by the redeclaration rule.
    /// Works on main variants; the error type is compatible with
    /// everything so one bad declaration does not cascade.
    pub fn compatible(&self, a: TypeRef, b: TypeRef) -> bool {
        let a = self.main_variant(a);
        let b = self.main_variant(b);
        if a == b {
            return true;
        }
        match (&self.get(a).kind, &self.get(b).kind) {
            (TypeKind::Error, _) | (_, TypeKind::Error) => true,
            (
                TypeKind::Integer {
                    signed: s1,
                    rank: r1,
                },
                TypeKind::Integer {
                    signed: s2,
                    rank: r2,
                },
            ) => s1 == s2 && r1 == r2,
            (TypeKind::Real { rank: r1 }, TypeKind::Real { rank: r2 }) => r1 == r2,
            (TypeKind::Pointer { pointee: p1 }, TypeKind::Pointer { pointee: p2 }) => self.compatible(*p1, *p2),
            (
                TypeKind::Array {
                    element: e1,
                    domain: d1,
                },
                TypeKind::Array {
                    element: e2,
                    domain: d2,
                },
            ) => {
                if !self.compatible(*e1, *e2) {
                    return false;
                }
                match (d1, d2) {
                    (None, _) | (_, None) => true,
                    (Some(x), Some(y)) => x == y,
                }
            }
            (
                TypeKind::Function {
                    return_type: r1,
                    params: p1,
                },
                TypeKind::Function {
                    return_type: r2,
                    params: p2,
                },
            ) => {
                if !self.compatible(*r1, *r2) {
                    return false;
                }
                match (p1, p2) {
                    (FunctionParams::Unspecified, _) | (_, FunctionParams::Unspecified) => true,
                    (
                        FunctionParams::Known {
                            types: t1,
                            variadic: v1,
                        },
                        FunctionParams::Known {
                            types: t2,
                            variadic: v2,
                        },
                    ) => {
                        v1 == v2
                            && t1.len() == t2.len()
                            && t1.iter().zip(t2.iter()).all(|(x, y)| self.compatible(*x, *y))
                    }
                }
            }
            // Records and enums are compatible only by identity, which
            // the main-variant check above already covered.
            _ => false,
        }
    }

    // ============================================================
    // Layout engine
    // ============================================================

    /// Fill in size and alignment for a type. Idempotent; callable again
    /// as a type's shape is completed incrementally. Incomplete records
    /// and enums, and arrays whose bound is still unknown, are left
    /// without layout.
    pub fn layout_type(&mut self, r: TypeRef) {
        if self.get(r).layout.is_some() {
            return;
        }
        let layout = match self.get(self.main_variant(r)).kind.clone() {
            TypeKind::Void => Some(TypeLayout { size: 0, align: 1 }),
            TypeKind::Integer { rank, .. } => Some(match rank {
                IntRank::Char => TypeLayout { size: 1, align: 1 },
                IntRank::Short => TypeLayout { size: 2, align: 2 },
                IntRank::Int => TypeLayout { size: 4, align: 4 },
                IntRank::Long => TypeLayout { size: 8, align: 8 },
            }),
            TypeKind::Real { rank } => Some(match rank {
                FloatRank::Float => TypeLayout { size: 4, align: 4 },
                FloatRank::Double => TypeLayout { size: 8, align: 8 },
                FloatRank::LongDouble => TypeLayout { size: 16, align: 16 },
            }),
            TypeKind::Pointer { .. } => Some(TypeLayout { size: 8, align: 8 }),
            TypeKind::Function { .. } => Some(TypeLayout { size: 0, align: 1 }),
            TypeKind::Array { element, domain } => {
                self.layout_type(element);
                match (domain, self.get(element).layout) {
                    (Some(ArrayDomain::Fixed { max_index }), Some(elem)) => {
                        let count = (max_index + 1).max(0) as u32;
                        Some(TypeLayout {
                            size: elem.size * count,
                            align: elem.align,
                        })
                    }
                    // Unknown bound or unlaid element: deferred.
                    _ => None,
                }
            }
            TypeKind::Record { .. } | TypeKind::Enum { .. } => {
                // Computed by the dedicated entry points below once the
                // type is defined; nothing to do for forward references.
                let main = self.main_variant(r);
                self.get(main).layout
            }
            TypeKind::Error => Some(TypeLayout { size: 0, align: 1 }),
        };
        if let Some(layout) = layout {
            self.get_mut(r).layout = Some(layout);
            // Keep the main variant in sync when laying out a variant.
            let main = self.main_variant(r);
            if self.get(main).layout.is_none() {
                self.get_mut(main).layout = Some(layout);
            }
        }
    }

    /// Lay out a record type from its member declarations, assigning each
    /// field its storage position. Bit-fields with explicit widths pack
    /// into the current word; a word-aligned field starts a fresh word.
    /// The final size is rounded up to a multiple of the alignment.
    pub fn layout_record(&mut self, r: TypeRef, decls: &mut DeclArena) {
        let main = self.main_variant(r);
        let (is_union, members) = match &self.get(main).kind {
            TypeKind::Record { is_union, members, .. } => (*is_union, members.clone()),
            _ => panic!("ICE: layout_record on non-record"),
        };

        let mut offset_bits: u32 = 0;
        let mut max_bits: u32 = 0;
        let mut align_bits: u32 = BYTE_BITS;

        for field in members {
            let field_ty = decls.get(field).ty;
            self.layout_type(field_ty);
            let field_layout = self.get(field_ty).layout.unwrap_or(TypeLayout { size: 0, align: 1 });
            let field_align_bits = field_layout.align * BYTE_BITS;
            align_bits = align_bits.max(field_align_bits);

            if is_union {
                decls.get_mut(field).offset_bits = Some(0);
                max_bits = max_bits.max(field_layout.size * BYTE_BITS);
                continue;
            }

            let d = decls.get(field);
            let word_aligned = d.flags.contains(DeclFlags::WORD_ALIGNED);
            let bit_size = match &d.kind {
                DeclKind::Field { bit_size, .. } => *bit_size,
                _ => None,
            };

            if word_aligned {
                offset_bits = offset_bits.next_multiple_of(WORD_BITS);
            }
            match bit_size {
                Some(width) => {
                    // Packed field: no further alignment, consume exactly
                    // the requested bits.
                    decls.get_mut(field).offset_bits = Some(offset_bits);
                    offset_bits += width;
                }
                None => {
                    offset_bits = offset_bits.next_multiple_of(field_align_bits.max(1));
                    decls.get_mut(field).offset_bits = Some(offset_bits);
                    offset_bits += field_layout.size * BYTE_BITS;
                }
            }
        }

        let raw_bits = if is_union { max_bits } else { offset_bits };
        let size_bits = raw_bits.next_multiple_of(align_bits.max(BYTE_BITS));
        let layout = TypeLayout {
            size: size_bits / BYTE_BITS,
            align: align_bits / BYTE_BITS,
        };
        self.get_mut(main).layout = Some(layout);
        debug!("TypeRegistry: laid out record {} ({} bytes)", main, layout.size);
    }

    /// Lay out an enum type: sized like `int`.
    pub fn layout_enum(&mut self, r: TypeRef) {
        let main = self.main_variant(r);
        self.get_mut(main).layout = Some(TypeLayout { size: 4, align: 4 });
    }

    /// Assign storage layout for a declaration: forces the declared
    /// type's layout. Offsets are assigned by `layout_record` and the
    /// parameter layout pass.
    pub fn layout_decl(&mut self, decls: &DeclArena, d: DeclRef) {
        let ty = decls.get(d).ty;
        self.layout_type(ty);
    }

    /// Size in bytes, if laid out. Reads through the main variant.
    pub fn size_of(&self, r: TypeRef) -> Option<u32> {
        self.get(self.main_variant(r))
            .layout
            .or(self.get(r).layout)
            .map(|l| l.size)
    }

    /// The standard integer type with the given signedness and rank.
    pub fn integer_type(&self, signed: bool, rank: IntRank) -> TypeRef {
        match (signed, rank) {
            (true, IntRank::Char) => self.type_char,
            (false, IntRank::Char) => self.type_char_unsigned,
            (true, IntRank::Short) => self.type_short,
            (false, IntRank::Short) => self.type_short_unsigned,
            (true, IntRank::Int) => self.type_int,
            (false, IntRank::Int) => self.type_int_unsigned,
            (true, IntRank::Long) => self.type_long,
            (false, IntRank::Long) => self.type_long_unsigned,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FnSigKey {
    return_type: TypeRef,
    params: FunctionParams,
}
