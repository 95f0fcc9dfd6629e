//! Struct, union and enum construction.
//!
//! A named tag may be forward-referenced long before it is defined; the
//! definition then fills in the same type node, so every pointer taken
//! at the forward reference sees the completed type afterward.

use log::debug;

use crate::ast::{NameId, NodeRef, ParsedDeclSpec, ParsedDeclarator, SourceSpan};
use crate::diagnostic::SemanticError;
use crate::semantic::const_eval::eval_const_expr;
use crate::semantic::declarator::DeclContext;
use crate::semantic::decls::{DeclFlags, DeclHome, DeclKind, DeclRef};
use crate::semantic::resolver::Resolver;
use crate::semantic::types::{TagKind, TypeKind, TypeRef};

impl Resolver {
    /// Process one component of a structure: the declarator resolves in
    /// field context and a bit-field width, if any, is attached for
    /// `build_struct` to validate. The field declarations are chained by
    /// the caller and handed to `build_struct` together.
    pub fn resolve_field(
        &mut self,
        declarator: &ParsedDeclarator,
        declspecs: &[ParsedDeclSpec],
        width: Option<NodeRef>,
        span: SourceSpan,
    ) -> DeclRef {
        let d = self
            .resolve_declarator(declspecs, declarator, DeclContext::Field, span)
            .as_decl()
            .expect("ICE: field declaration did not yield a declaration");
        if let DeclKind::Field { width: slot, .. } = &mut self.decls.get_mut(d).kind {
            *slot = width;
        }
        d
    }

    /// Create a struct or union type from a field list, or a
    /// cross-reference to one defined elsewhere (`struct foo` with no
    /// member list).
    ///
    /// With `cross_reference_only`, the existing type for `name` is
    /// returned, or a forward-reference node is created and recorded as
    /// the definition until a real one appears. Otherwise a prior
    /// forward reference for `name` in this contour is completed in
    /// place, so earlier pointers to it become valid.
    pub fn build_struct(
        &mut self,
        kind: TagKind,
        name: Option<NameId>,
        fields: Vec<DeclRef>,
        cross_reference_only: bool,
        span: SourceSpan,
    ) -> TypeRef {
        let is_union = match kind {
            TagKind::Struct => false,
            TagKind::Union => true,
            TagKind::Enum => panic!("ICE: build_struct on an enum"),
        };

        if cross_reference_only {
            if let Some(name) = name
                && let Some(existing) = self.lookup_tag(kind, name, false, span)
            {
                return existing;
            }
            let t = self.types.incomplete_record(is_union);
            self.declare_tag(name, t, span);
            return t;
        }

        // Reuse a previous forward reference in this contour, else make a
        // fresh node and record the tag.
        let t = name.and_then(|n| self.lookup_tag(kind, n, true, span));
        let t = match t {
            Some(t) => t,
            None => {
                let t = self.types.incomplete_record(is_union);
                self.declare_tag(name, t, span);
                t
            }
        };

        // Process field widths. A width that is not a compile-time
        // integer constant is dropped. Width 0 exists only to force the
        // next field to a word boundary; the zero-width field itself is
        // then spliced out of the list.
        let mut members: Vec<DeclRef> = Vec::with_capacity(fields.len());
        let mut realign_next = false;
        for field in fields {
            let width_expr = match &self.decls.get(field).kind {
                DeclKind::Field { width, .. } => *width,
                _ => None,
            };

            let mut width_value = None;
            if let Some(expr) = width_expr {
                match eval_const_expr(self, expr) {
                    Some(v) => width_value = Some(v),
                    None => {
                        let field_name = self
                            .decls
                            .get(field)
                            .name
                            .unwrap_or_else(|| NameId::from("<anonymous>"));
                        self.diag.report(SemanticError::FieldWidthNotConstant {
                            name: field_name,
                            span: self.decls.get(field).span,
                        });
                        if let DeclKind::Field { width, .. } = &mut self.decls.get_mut(field).kind {
                            *width = None;
                        }
                    }
                }
            }

            if width_value == Some(0) {
                realign_next = true;
                continue;
            }

            let d = self.decls.get_mut(field);
            d.home = Some(DeclHome::Record(t));
            if realign_next {
                d.flags.insert(DeclFlags::WORD_ALIGNED);
                realign_next = false;
            }
            if let Some(v) = width_value {
                d.flags.insert(DeclFlags::PACKED);
                if let DeclKind::Field { width, bit_size } = &mut d.kind {
                    *width = None;
                    *bit_size = Some(v.unsigned_abs() as u32);
                }
            }
            members.push(field);
        }

        let main = self.types.main_variant(t);
        match &mut self.types.get_mut(main).kind {
            TypeKind::Record {
                members: slot,
                complete,
                ..
            } => {
                *slot = members;
                *complete = true;
            }
            _ => panic!("ICE: completing a non-record tag"),
        }
        self.types.layout_record(main, &mut self.decls);
        debug!("Resolver: defined {} {:?}", kind, name);
        t
    }

    /// Begin the definition of an enumeration type. Returns the type, as
    /// yet incomplete, and records it so `build_enumerator` can declare
    /// the individual values as they are read.
    pub fn start_enum(&mut self, name: Option<NameId>, span: SourceSpan) -> TypeRef {
        let t = name.and_then(|n| self.lookup_tag(TagKind::Enum, n, true, span));
        let t = match t {
            Some(t) => t,
            None => {
                let t = self.types.incomplete_enum();
                self.declare_tag(name, t, span);
                t
            }
        };

        let main = self.types.main_variant(t);
        if self.types.get(main).is_complete() {
            // A named enum declared already. Replace its definition; the
            // old enumerators remain declared.
            self.diag.report(SemanticError::EnumRedeclaration {
                name: name.unwrap_or_else(|| NameId::from("<anonymous>")),
                span,
            });
            if let TypeKind::Enum { values, complete, .. } = &mut self.types.get_mut(main).kind {
                values.clear();
                *complete = false;
            }
        }

        self.current_enum = Some(t);
        self.enum_next_value = 0;
        t
    }

    /// Return the enumeration type tagged `name`, or create and record a
    /// forward reference to one.
    pub fn xref_enum(&mut self, name: NameId, span: SourceSpan) -> TypeRef {
        if let Some(t) = self.lookup_tag(TagKind::Enum, name, false, span) {
            return t;
        }
        let t = self.types.incomplete_enum();
        self.declare_tag(Some(name), t, span);
        t
    }

    /// Declare one value of the enumeration currently being built.
    /// Sequential default values are assigned here. Returns the
    /// (name, value) pair for `finish_enum`.
    pub fn build_enumerator(&mut self, name: NameId, value: Option<NodeRef>, span: SourceSpan) -> (NameId, i64) {
        let enum_type = self.current_enum.expect("ICE: enumerator outside an enum definition");

        let value = match value {
            Some(expr) => match eval_const_expr(self, expr) {
                Some(v) => v,
                None => {
                    self.diag.report(SemanticError::EnumeratorNotConstant { name, span });
                    self.enum_next_value
                }
            },
            None => self.enum_next_value,
        };
        self.enum_next_value = value + 1;

        let d = self.build_decl(DeclKind::EnumConst { value }, Some(name), enum_type, false, false, span);
        self.declare(d);

        (name, value)
    }

    /// Install the values of an enumeration type and finish it off,
    /// recomputing the representable range from the maximum value seen.
    pub fn finish_enum(&mut self, enum_type: TypeRef, values: Vec<(NameId, i64)>) -> TypeRef {
        let max_value = values.iter().map(|&(_, v)| v).max().unwrap_or(0).max(0);

        let main = self.types.main_variant(enum_type);
        match &mut self.types.get_mut(main).kind {
            TypeKind::Enum {
                values: slot,
                max_value: max_slot,
                complete,
            } => {
                *slot = values;
                *max_slot = max_value;
                *complete = true;
            }
            _ => panic!("ICE: finishing a non-enum tag"),
        }
        self.types.layout_enum(main);

        self.current_enum = None;
        enum_type
    }
}
