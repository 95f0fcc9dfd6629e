//! Declarator resolution.
//!
//! Given a chain of declaration specifiers and a declarator tree, work
//! out the name and type of the object declared. The declarator is
//! descended from its outermost syntactic layer inward, folding each
//! layer into the accumulating type, so `int *(*x[3])()` comes out as
//! "array[3] of pointer to function returning pointer to int" and not
//! its syntactic mirror.

use bitflags::bitflags;
use log::debug;

use crate::ast::{
    BinaryOp, NameId, NodeKind, NodeRef, ParsedDeclSpec, ParsedDeclarator, ParsedParam, SourceSpan, SpecKeyword,
};
use crate::diagnostic::{SemanticError, SemanticWarning};
use crate::semantic::const_eval::eval_const_expr;
use crate::semantic::decls::{DeclFlags, DeclKind, DeclRef, FuncData, ParmName};
use crate::semantic::output::{Backend, UnitView};
use crate::semantic::resolver::Resolver;
use crate::semantic::types::{ArrayDomain, FunctionParams, IntRank, TypeKind, TypeRef};

bitflags! {
    /// Storage-class, modifier and qualifier keywords seen in one
    /// declaration-specifier chain.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    struct SpecBits: u16 {
        const LONG = 1 << 0;
        const SHORT = 1 << 1;
        const SIGNED = 1 << 2;
        const UNSIGNED = 1 << 3;
        const CONST = 1 << 4;
        const VOLATILE = 1 << 5;
        const AUTO = 1 << 6;
        const STATIC = 1 << 7;
        const EXTERN = 1 << 8;
        const REGISTER = 1 << 9;
        const TYPEDEF = 1 << 10;
    }
}

fn keyword_bit(k: SpecKeyword) -> SpecBits {
    match k {
        SpecKeyword::Long => SpecBits::LONG,
        SpecKeyword::Short => SpecBits::SHORT,
        SpecKeyword::Signed => SpecBits::SIGNED,
        SpecKeyword::Unsigned => SpecBits::UNSIGNED,
        SpecKeyword::Const => SpecBits::CONST,
        SpecKeyword::Volatile => SpecBits::VOLATILE,
        SpecKeyword::Auto => SpecBits::AUTO,
        SpecKeyword::Static => SpecBits::STATIC,
        SpecKeyword::Extern => SpecBits::EXTERN,
        SpecKeyword::Register => SpecBits::REGISTER,
        SpecKeyword::Typedef => SpecBits::TYPEDEF,
    }
}

const STORAGE_CLASSES: SpecBits = SpecBits::AUTO
    .union(SpecBits::STATIC)
    .union(SpecBits::EXTERN)
    .union(SpecBits::REGISTER)
    .union(SpecBits::TYPEDEF);

const TYPE_MODIFIERS: SpecBits = SpecBits::LONG
    .union(SpecBits::SHORT)
    .union(SpecBits::SIGNED)
    .union(SpecBits::UNSIGNED);

/// Syntactic context a declarator appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclContext {
    /// Ordinary declaration.
    Normal,
    /// Parameter declaration, in a prototype or before a function body.
    Parm,
    /// Declaration inside a struct or union.
    Field,
    /// Typename, as in a cast or sizeof.
    Typename,
}

/// Result of resolving a declarator: a declaration record, or, in
/// typename context, just the type.
#[derive(Debug, Clone, Copy)]
pub enum Resolved {
    Decl(DeclRef),
    Type(TypeRef),
}

impl Resolved {
    pub fn as_decl(self) -> Option<DeclRef> {
        match self {
            Resolved::Decl(d) => Some(d),
            Resolved::Type(_) => None,
        }
    }

    pub fn as_type(self) -> Option<TypeRef> {
        match self {
            Resolved::Type(t) => Some(t),
            Resolved::Decl(_) => None,
        }
    }
}

impl Resolver {
    /// Determine the name and type of the object declared by
    /// `declspecs` + `declarator` in the given context, and create the
    /// declaration record (except in typename context, which yields the
    /// bare type). The record is *not* registered; callers decide.
    pub fn resolve_declarator(
        &mut self,
        declspecs: &[ParsedDeclSpec],
        declarator: &ParsedDeclarator,
        context: DeclContext,
        span: SourceSpan,
    ) -> Resolved {
        // Anything declared one level down from the top level must be a
        // parameter of a function, because a body is at least two levels
        // down.
        let context = if context == DeclContext::Normal && self.scopes.at_parameter_level() {
            DeclContext::Parm
        } else {
            context
        };

        let (bits, mut ty, explicit_int) = self.scan_decl_specs(declspecs, span);

        // `long double` is a special combination.
        let mut bits = bits;
        if bits.contains(SpecBits::LONG) && ty == self.types.type_double {
            bits.remove(SpecBits::LONG);
            ty = self.types.type_long_double;
        }

        // Check all other uses of type modifiers.
        if bits.intersects(TYPE_MODIFIERS) {
            if !explicit_int {
                self.diag.report(SemanticError::InvalidTypeModifier { span });
            } else if bits.contains(SpecBits::LONG) && bits.contains(SpecBits::SHORT) {
                self.diag.report(SemanticError::LongAndShort { span });
            } else if bits.contains(SpecBits::SIGNED) && bits.contains(SpecBits::UNSIGNED) {
                self.diag.report(SemanticError::SignedAndUnsigned { span });
            } else if bits.contains(SpecBits::UNSIGNED) {
                ty = if bits.contains(SpecBits::LONG) {
                    self.types.type_long_unsigned
                } else if bits.contains(SpecBits::SHORT) {
                    self.types.type_short_unsigned
                } else if ty == self.types.type_char {
                    self.types.type_char_unsigned
                } else {
                    self.types.type_int_unsigned
                };
            } else if bits.contains(SpecBits::LONG) {
                ty = self.types.type_long;
            } else if bits.contains(SpecBits::SHORT) {
                ty = self.types.type_short;
            }
        }

        // Constancy and volatility come from explicit keywords or via a
        // typedef; structural processing uses the main variant, with the
        // qualifiers re-applied where they bind.
        let base_quals = self.types.get(ty).qualifiers;
        let mut constp = bits.contains(SpecBits::CONST) || base_quals.contains(crate::semantic::TypeQualifiers::CONST);
        let mut volatilep =
            bits.contains(SpecBits::VOLATILE) || base_quals.contains(crate::semantic::TypeQualifiers::VOLATILE);
        let mut ty = self.types.main_variant(ty);

        self.check_storage_classes(&mut bits, context, span);

        // Descend through the declarator, creating more complex types,
        // until we reach the declared identifier (or the empty slot of an
        // abstract declarator).
        let mut layer: &ParsedDeclarator = declarator;
        loop {
            match layer {
                ParsedDeclarator::Name(_) | ParsedDeclarator::Abstract => break,

                ParsedDeclarator::Array { bound, inner } => {
                    // The element type must be valid and complete.
                    ty = self.resolve_tags(ty, span);
                    if constp || volatilep {
                        ty = self.types.build_type_variant(ty, constp, volatilep);
                    }
                    constp = false;
                    volatilep = false;

                    if self.types.main_variant(ty) == self.types.type_void {
                        self.diag.report(SemanticError::ArrayOfVoid { span });
                        ty = self.types.type_int;
                    }
                    if self.is_function_type(ty) {
                        self.diag.report(SemanticError::ArrayOfFunctions { span });
                        ty = self.types.type_int;
                    }

                    // A constant bound yields the maximum index directly;
                    // a non-constant bound becomes a deferred `bound - 1`
                    // expression; no bound leaves the array open for
                    // finish_decl to settle from an initializer.
                    let domain = match bound {
                        Some(b) => match eval_const_expr(self, *b) {
                            Some(v) => Some(ArrayDomain::Fixed { max_index: v - 1 }),
                            None => {
                                let one = self.ast.push_node(NodeKind::LiteralInt(1), span);
                                let sub = self.ast.push_node(NodeKind::Binary(BinaryOp::Sub, *b, one), span);
                                Some(ArrayDomain::Computed(sub))
                            }
                        },
                        None => None,
                    };
                    ty = self.types.array_of(ty, domain);
                    layer = &**inner;
                }

                ParsedDeclarator::Function { params, inner } => {
                    // The return type must be valid and complete.
                    ty = self.resolve_tags(ty, span);
                    constp = false;
                    volatilep = false;

                    if self.is_function_type(ty) {
                        self.diag.report(SemanticError::FunctionReturningFunction { span });
                        ty = self.types.type_int;
                    }
                    if self.is_array_type(ty) {
                        self.diag.report(SemanticError::FunctionReturningArray { span });
                        ty = self.types.type_int;
                    }

                    let parms = self.resolve_parameter_list(params, span);
                    ty = self.types.function_type(ty, parms);
                    layer = &**inner;
                }

                ParsedDeclarator::Pointer { qualifiers, inner } => {
                    // Pending qualifiers bind to the pointee; qualifiers
                    // written inside this `*` become the new pending set.
                    if constp || volatilep {
                        ty = self.types.build_type_variant(ty, constp, volatilep);
                    }
                    ty = self.types.pointer_to(ty);
                    constp = qualifiers.contains(crate::semantic::TypeQualifiers::CONST);
                    volatilep = qualifiers.contains(crate::semantic::TypeQualifiers::VOLATILE);
                    layer = &**inner;
                }
            }
            self.types.layout_type(ty);
        }

        let name = layer.declared_name();

        // A typedef wraps the type; registration is up to the caller. A
        // forward-referenced tag may be typedef'd freely.
        if bits.contains(SpecBits::TYPEDEF) {
            if constp || volatilep {
                ty = self.types.build_type_variant(ty, constp, volatilep);
            }
            let d = self.build_decl(DeclKind::Typedef, name, ty, false, false, span);
            return Resolved::Decl(d);
        }

        // Any other direct use requires the tag to be defined (behind a
        // pointer it never reaches here; the pointer layer absorbed it).
        ty = self.resolve_tags(ty, span);

        if context == DeclContext::Typename {
            if constp || volatilep {
                ty = self.types.build_type_variant(ty, constp, volatilep);
            }
            return Resolved::Type(ty);
        }

        // `void' at top level is allowed only in typedefs or typenames.
        if self.types.main_variant(ty) == self.types.type_void {
            self.diag.report(SemanticError::DeclaredVoid {
                name: name.unwrap_or_else(|| NameId::from("<anonymous>")),
                span,
            });
            ty = self.types.type_int;
        }

        let decl = match context {
            DeclContext::Parm => {
                // A parameter declared as an array of T is really a
                // pointer to T; one declared as a function is a pointer
                // to a function.
                match self.types.get(self.types.main_variant(ty)).kind.clone() {
                    TypeKind::Array { element, .. } => ty = self.types.pointer_to(element),
                    TypeKind::Function { .. } => ty = self.types.pointer_to(ty),
                    _ => {}
                }
                let arg_type = self.promoted_arg_type(ty);
                self.build_decl(DeclKind::Parm { arg_type }, name, ty, false, false, span)
            }

            DeclContext::Field => {
                if self.is_function_type(ty) {
                    self.diag.report(SemanticError::FieldDeclaredFunction {
                        name: name.unwrap_or_else(|| NameId::from("<anonymous>")),
                        span,
                    });
                    ty = self.types.pointer_to(ty);
                }
                self.build_decl(
                    DeclKind::Field {
                        width: None,
                        bit_size: None,
                    },
                    name,
                    ty,
                    false,
                    false,
                    span,
                )
            }

            DeclContext::Normal => {
                if self.is_function_type(ty) {
                    // Stash the just-parsed parameter-name list so the
                    // function lifecycle can bind it to declarations.
                    let parm_names = std::mem::take(&mut self.last_parm_names);
                    self.build_decl(
                        DeclKind::Func(FuncData {
                            parm_names,
                            ..FuncData::default()
                        }),
                        name,
                        ty,
                        bits.contains(SpecBits::STATIC),
                        bits.contains(SpecBits::EXTERN),
                        span,
                    )
                } else {
                    self.build_decl(
                        DeclKind::Var,
                        name,
                        ty,
                        bits.contains(SpecBits::STATIC),
                        bits.contains(SpecBits::EXTERN),
                        span,
                    )
                }
            }

            DeclContext::Typename => unreachable!(),
        };

        // Register preference is advisory; constancy and volatility
        // propagate to the declaration's flags.
        let flags = &mut self.decls.get_mut(decl).flags;
        flags.set(DeclFlags::REGISTER, bits.contains(SpecBits::REGISTER));
        flags.set(DeclFlags::READONLY, constp);
        flags.set(DeclFlags::VOLATILE, volatilep);

        Resolved::Decl(decl)
    }

    /// Decode a typename, such as `int **`, into a type.
    pub fn resolve_type_name(&mut self, declspecs: &[ParsedDeclSpec], declarator: &ParsedDeclarator, span: SourceSpan) -> TypeRef {
        match self.resolve_declarator(declspecs, declarator, DeclContext::Typename, span) {
            Resolved::Type(t) => t,
            Resolved::Decl(d) => self.decls.get(d).ty,
        }
    }

    /// Scan the declaration specifiers: accumulate keyword bits, find the
    /// base type, and note whether it came from the `int`/`char` keywords
    /// themselves (which is what licenses the size/sign modifiers).
    fn scan_decl_specs(&mut self, declspecs: &[ParsedDeclSpec], span: SourceSpan) -> (SpecBits, TypeRef, bool) {
        let mut bits = SpecBits::empty();
        let mut longlong = false;
        let mut explicit_int = false;
        let mut base: Option<TypeRef> = None;

        for spec in declspecs {
            match spec {
                ParsedDeclSpec::Keyword(k) => {
                    let bit = keyword_bit(*k);
                    if *k == SpecKeyword::Long && bits.contains(SpecBits::LONG) {
                        longlong = true;
                    }
                    bits.insert(bit);
                }
                ParsedDeclSpec::TypeName(id) => {
                    if *id == self.name_int || *id == self.name_char {
                        explicit_int = true;
                    }
                    if base.is_some() {
                        self.diag.report(SemanticError::TwoDataTypes { span });
                        continue;
                    }
                    match self.lookup_name(*id) {
                        Some(d) if matches!(self.decls.get(d).kind, DeclKind::Typedef) => {
                            base = Some(self.decls.get(d).ty);
                        }
                        _ => {
                            self.diag.report(SemanticError::NotATypeName { name: *id, span });
                        }
                    }
                }
                ParsedDeclSpec::TagType(t) => {
                    if base.is_some() {
                        self.diag.report(SemanticError::TwoDataTypes { span });
                        continue;
                    }
                    base = Some(*t);
                }
            }
        }

        // No type at all defaults to `int`, and counts as explicit
        // because it did not come from a user typedef.
        let ty = match base {
            Some(t) => t,
            None => {
                explicit_int = true;
                self.types.type_int
            }
        };

        if longlong {
            // Parsed, but this generation does not materialize a wider
            // type; it collapses back to plain `long`.
            debug!("repeated `long' collapses to plain `long'");
        }

        (bits, ty, explicit_int)
    }

    /// At most one storage class; zero defaults to `auto`. Warn about
    /// classes invalid for the context or for file scope.
    fn check_storage_classes(&mut self, bits: &mut SpecBits, context: DeclContext, span: SourceSpan) {
        let nclasses = (*bits & STORAGE_CLASSES).bits().count_ones();
        if nclasses == 0 {
            bits.insert(SpecBits::AUTO);
        }

        if nclasses > 1 {
            self.diag.report(SemanticError::MultipleStorageClasses { span });
        } else if context != DeclContext::Normal && nclasses > 0 {
            if context == DeclContext::Parm && bits.contains(SpecBits::REGISTER) {
                // Tolerated.
            } else if context == DeclContext::Field {
                self.diag.report(SemanticError::StorageClassInField { span });
            } else if context == DeclContext::Parm {
                self.diag.report(SemanticError::StorageClassInParameter { span });
            } else {
                self.diag.report(SemanticError::StorageClassInTypename { span });
            }
        } else if self.scopes.at_global_scope() && nclasses > 0 {
            if bits.contains(SpecBits::AUTO) {
                self.diag.report(SemanticError::AutoAtFileScope { span });
            }
            if bits.contains(SpecBits::REGISTER) {
                self.diag.report(SemanticError::RegisterAtFileScope { span });
            }
        }
    }

    /// Decode the list of parameters of a function declarator.
    ///
    /// Elements are bare names, typed parameters, or a terminating void
    /// marker. If everything is typed the type list is produced; mixing
    /// typed and untyped entries is an error that discards the type list.
    /// Either way the (declared-type-or-none, name) list is left for the
    /// function lifecycle to match against a body's own declarations.
    pub fn resolve_parameter_list(&mut self, params: &[ParsedParam], span: SourceSpan) -> FunctionParams {
        let mut names: Vec<ParmName> = Vec::new();
        let mut types: Vec<TypeRef> = Vec::new();
        let mut any_typed = false;
        let mut any_untyped = false;
        let mut erring = false;
        let mut closed = false;

        for param in params {
            match param {
                ParsedParam::VoidMarker => {
                    closed = true;
                    break;
                }
                ParsedParam::Name(n) => {
                    if any_typed && !erring {
                        self.diag.report(SemanticError::MixedParameterList { span });
                        erring = true;
                    }
                    any_untyped = true;
                    names.push(ParmName {
                        ty: None,
                        name: Some(*n),
                    });
                }
                ParsedParam::Typed {
                    specs,
                    declarator,
                    span: param_span,
                } => {
                    if any_untyped && !erring {
                        self.diag.report(SemanticError::MixedParameterList { span });
                        erring = true;
                    }
                    any_typed = true;
                    let resolved = self.resolve_declarator(specs, declarator, DeclContext::Parm, *param_span);
                    let ty = match resolved {
                        Resolved::Decl(d) => self.decls.get(d).ty,
                        Resolved::Type(t) => t,
                    };
                    names.push(ParmName {
                        ty: Some(ty),
                        name: declarator.declared_name(),
                    });
                    types.push(ty);
                }
            }
        }

        let only_void_terminator = types.is_empty() && names.is_empty() && closed;
        self.last_parm_names = names;

        if erring || (types.is_empty() && !only_void_terminator) {
            return FunctionParams::Unspecified;
        }
        FunctionParams::Known {
            types,
            variadic: !closed,
        }
    }

    /// Decode an ordinary declaration or data definition, as soon as the
    /// specifiers and declarator are parsed and before any initializer.
    /// Function definitions do not come here; external and forward
    /// declarations of functions do.
    pub fn start_decl(
        &mut self,
        declarator: &ParsedDeclarator,
        declspecs: &[ParsedDeclSpec],
        initialized: bool,
        span: SourceSpan,
    ) -> DeclRef {
        let d = self
            .resolve_declarator(declspecs, declarator, DeclContext::Normal, span)
            .as_decl()
            .expect("ICE: ordinary declaration did not yield a declaration");
        if initialized {
            let flags = &mut self.decls.get_mut(d).flags;
            flags.remove(DeclFlags::EXTERNAL);
            // Counts as a definition from here on, so a second
            // initialized declaration of the name is rejected.
            flags.insert(DeclFlags::DEFINED);
        }
        self.declare(d)
    }

    /// Finish a declaration: install its initializer, and settle the
    /// domain of an open array from the initializer if necessary. The
    /// finalized variable is handed to the code generator exactly once.
    pub fn finish_decl(&mut self, decl: DeclRef, init: Option<NodeRef>, span: SourceSpan, backend: &mut dyn Backend) {
        if let Some(init) = init {
            let d = self.decls.get_mut(decl);
            d.init = Some(init);
            d.flags.insert(DeclFlags::DEFINED);
        }

        let ty = self.decls.get(decl).ty;
        let main = self.types.main_variant(ty);
        if let TypeKind::Array { element, domain: None } = self.types.get(main).kind.clone() {
            // The maximum index, one less than the length.
            let mut max_index: Option<i64> = None;
            if let Some(init) = init {
                match self.ast.get_kind(init) {
                    NodeKind::LiteralString { length } => max_index = Some(*length as i64 - 1),
                    NodeKind::InitList(items) => max_index = Some(items.len() as i64 - 1),
                    _ => {}
                }
            }

            if max_index.is_none() {
                if !self.options.pedantic {
                    self.decls.get_mut(decl).flags.insert(DeclFlags::EXTERNAL);
                } else if !self.decls.get(decl).flags.contains(DeclFlags::EXTERNAL) {
                    self.diag.report(SemanticError::ArraySizeMissing { span });
                    max_index = Some(0);
                }
            }

            if let Some(max_index) = max_index {
                if self.options.pedantic && max_index < 0 {
                    self.diag.report_warning(SemanticWarning::ZeroSizeArray { span });
                }
                self.types.get_mut(main).kind = TypeKind::Array {
                    element,
                    domain: Some(ArrayDomain::Fixed { max_index }),
                };
                self.types.layout_type(main);
                self.types.layout_decl(&self.decls, decl);
            }
        }

        if matches!(self.decls.get(decl).kind, DeclKind::Var) {
            backend.emit_variable(
                UnitView {
                    ast: &self.ast,
                    decls: &self.decls,
                    types: &self.types,
                },
                decl,
            );
        }
    }

    /// Type an unprototyped call site converts an argument of `ty` to.
    pub(crate) fn promoted_arg_type(&self, ty: TypeRef) -> TypeRef {
        let main = self.types.main_variant(ty);
        if main == self.types.type_float {
            return self.types.type_double;
        }
        if let TypeKind::Integer { rank, .. } = self.types.get(main).kind
            && rank < IntRank::Int
        {
            return self.types.type_int;
        }
        ty
    }

    pub(crate) fn is_function_type(&self, ty: TypeRef) -> bool {
        matches!(
            self.types.get(self.types.main_variant(ty)).kind,
            TypeKind::Function { .. }
        )
    }

    pub(crate) fn is_array_type(&self, ty: TypeRef) -> bool {
        matches!(self.types.get(self.types.main_variant(ty)).kind, TypeKind::Array { .. })
    }
}
