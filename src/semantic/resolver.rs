//! The resolution context.
//!
//! `Resolver` bundles the scope stack, the declaration and node arenas,
//! the type registry, the diagnostic engine and the per-function state
//! into one explicit value threaded through every operation. It owns
//! declaration registration (install or merge into the existing slot),
//! the tag namespace, and the predefined global environment.

use log::debug;
use thin_vec::ThinVec;

use crate::ast::{Ast, NameId, NodeKind, NodeRef, ParsedDeclSpec, SourceSpan};
use crate::diagnostic::{DiagnosticEngine, SemanticError, SemanticWarning};
use crate::lang_options::LangOptions;
use crate::semantic::decls::{Decl, DeclArena, DeclFlags, DeclHome, DeclKind, DeclRef, FuncData, ParmName};
use crate::semantic::function::FunctionState;
use crate::semantic::scope::ScopeStack;
use crate::semantic::type_registry::TypeRegistry;
use crate::semantic::types::{TagEntry, TagKind, TypeKind, TypeRef};

/// The declaration-processing context for one compilation.
pub struct Resolver {
    pub options: LangOptions,
    pub diag: DiagnosticEngine,
    pub types: TypeRegistry,
    pub decls: DeclArena,
    pub ast: Ast,
    pub(crate) scopes: ScopeStack,
    pub(crate) function: FunctionState,

    /// Enumeration type currently being built, if any.
    pub(crate) current_enum: Option<TypeRef>,
    /// Default value for the next enumerator of that type.
    pub(crate) enum_next_value: i64,
    /// Parameter-name list left behind by the most recent function
    /// declarator; claimed when the declarator turns out to start a
    /// function definition.
    pub(crate) last_parm_names: Vec<ParmName>,

    // Pre-interned identifiers consulted during specifier scanning.
    pub(crate) name_int: NameId,
    pub(crate) name_char: NameId,
    pub(crate) name_value: NameId,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(LangOptions::default())
    }
}

impl Resolver {
    /// Create the resolver: the global binding level, the predefined
    /// scalar types under their usual names, and the error marker.
    pub fn new(options: LangOptions) -> Self {
        let mut r = Resolver {
            options,
            diag: DiagnosticEngine::new(),
            types: TypeRegistry::new(),
            decls: DeclArena::new(),
            ast: Ast::new(),
            scopes: ScopeStack::new(),
            function: FunctionState::new(),
            current_enum: None,
            enum_next_value: 0,
            last_parm_names: Vec::new(),
            name_int: NameId::from("int"),
            name_char: NameId::from("char"),
            name_value: NameId::from("<value>"),
        };

        let builtins = [
            ("int", r.types.type_int),
            ("char", r.types.type_char),
            ("float", r.types.type_float),
            ("double", r.types.type_double),
            ("void", r.types.type_void),
            ("short int", r.types.type_short),
            ("long int", r.types.type_long),
            ("long double", r.types.type_long_double),
            ("unsigned int", r.types.type_int_unsigned),
            ("short unsigned int", r.types.type_short_unsigned),
            ("long unsigned int", r.types.type_long_unsigned),
            ("unsigned char", r.types.type_char_unsigned),
        ];
        for (name, ty) in builtins {
            let d = r.build_decl(DeclKind::Typedef, Some(NameId::from(name)), ty, false, false, SourceSpan::builtin());
            r.declare(d);
        }

        r
    }

    // ============================================================
    // Scope stack
    // ============================================================

    /// Enter a new binding contour.
    pub fn enter_scope(&mut self) {
        // Entering the top contour of a function: label and goto state
        // must have been cleared at the end of the previous function.
        if self.scopes.at_global_scope() && !self.function.labels_and_gotos_empty() {
            panic!("ICE: label or goto state leaked across a function boundary");
        }
        self.scopes.push_level();
    }

    /// Exit the innermost binding contour: clear the local meanings of
    /// its names, restore shadowed outer bindings, and, when this is a
    /// function's top contour, resolve pending gotos against the named
    /// labels before clearing the label bindings.
    pub fn exit_scope(&mut self) {
        let names: Vec<DeclRef> = self.scopes.current().names.clone();
        for d in names {
            if let Some(name) = self.decls.get(d).name {
                self.scopes.clear_local_value(name);
            }
        }

        let shadowed: Vec<(NameId, DeclRef)> = std::mem::take(&mut self.scopes.current_mut().shadowed);
        for (name, prev) in shadowed {
            self.scopes.set_local_value(name, prev);
        }

        if self.scopes.depth() == 2 {
            self.resolve_pending_gotos();
        }

        self.scopes.pop_level();
    }

    /// Declarations of the current contour, in declaration order.
    pub fn current_declarations(&self) -> Vec<DeclRef> {
        let mut names = self.scopes.current().names.clone();
        names.reverse();
        names
    }

    /// Tags of the current contour.
    pub fn current_tags(&self) -> Vec<TagEntry> {
        self.scopes.current().tags.clone()
    }

    /// Overwrite the current contour's declaration list wholesale. Used
    /// after parameter declarations are reconciled with the name list.
    pub fn replace_declarations(&mut self, decls: Vec<DeclRef>) {
        let level = self.scopes.current_mut();
        level.names = decls;
        level.names.reverse();
    }

    pub fn at_global_scope(&self) -> bool {
        self.scopes.at_global_scope()
    }

    // ============================================================
    // Symbol registration
    // ============================================================

    /// Record a declaration as belonging to the current contour.
    ///
    /// Returns either the declaration itself or, if the name was already
    /// declared in this contour, the old declaration merged with what the
    /// new one says; the old ref stays canonical for everyone holding it.
    pub fn declare(&mut self, decl: DeclRef) -> DeclRef {
        if let Some(name) = self.decls.get(decl).name {
            if let Some(old) = self.lookup_name_in_current_scope(name) {
                return self.merge_decls(decl, old);
            }

            // A typedef gives its name to a type that has none yet.
            if matches!(self.decls.get(decl).kind, DeclKind::Typedef) {
                let main = self.types.main_variant(self.decls.get(decl).ty);
                self.types.name_type(main, name);
            }

            if self.scopes.at_global_scope() {
                self.scopes.set_global_value(name, decl);
            } else {
                // An inherited local meaning is shadowed, not lost:
                // remember it for restoration when this contour ends.
                if let Some(prev) = self.scopes.local_value(name) {
                    self.scopes.current_mut().shadowed.push((name, prev));
                }
                self.scopes.set_local_value(name, decl);
            }
            debug!("Resolver: declared `{}` in level {}", name, self.scopes.depth());
        }

        self.scopes.current_mut().names.push(decl);
        decl
    }

    /// A new declaration has the same name as an old one in the same
    /// contour. Install the latest semantics into the old slot and keep
    /// the old declaration as the canonical one.
    fn merge_decls(&mut self, new: DeclRef, old: DeclRef) -> DeclRef {
        let is_global = self.scopes.at_global_scope();
        if !self.redeclaration_allowed(new, old, is_global) {
            let d = self.decls.get(new);
            self.diag.report(SemanticError::Redeclaration {
                name: d.name.expect("merge without a name"),
                span: d.span,
            });
        }

        let new_decl = self.decls.get(new).clone();
        let was_defined = self.decls.get(old).flags.contains(DeclFlags::DEFINED);
        let old_decl = self.decls.get_mut(old);
        // Parameter/result links and other per-kind payload carry over
        // only between declarations of the same kind.
        if std::mem::discriminant(&old_decl.kind) == std::mem::discriminant(&new_decl.kind) {
            old_decl.kind = new_decl.kind;
        }
        old_decl.ty = new_decl.ty;
        old_decl.span = new_decl.span;
        old_decl.flags = new_decl.flags;
        if was_defined {
            old_decl.flags.insert(DeclFlags::DEFINED);
        }
        if new_decl.init.is_some() {
            old_decl.init = new_decl.init;
        }
        old
    }

    /// Whether declaring `new` is legal when `old` (same name, same
    /// contour) has already been seen.
    fn redeclaration_allowed(&self, new: DeclRef, old: DeclRef, is_global: bool) -> bool {
        let n = self.decls.get(new);
        let o = self.decls.get(old);

        if !self.types.compatible(n.ty, o.ty) {
            return false;
        }

        if is_global {
            // Reject two definitions.
            if n.has_definition() && o.has_definition() {
                return false;
            }
            // Reject two allocating declarations with differing linkage;
            // at file scope linkage is recorded in PUBLIC (absent means
            // declared `static`).
            if !n.flags.contains(DeclFlags::EXTERNAL)
                && !o.flags.contains(DeclFlags::EXTERNAL)
                && n.flags.contains(DeclFlags::PUBLIC) != o.flags.contains(DeclFlags::PUBLIC)
            {
                return false;
            }
            true
        } else if matches!(
            self.types.get(self.types.main_variant(n.ty)).kind,
            TypeKind::Function { .. }
        ) {
            // Function declarations inside blocks are just references and
            // do not determine linkage.
            true
        } else {
            // Inside a block, only two external references may coexist.
            n.flags.contains(DeclFlags::EXTERNAL) && o.flags.contains(DeclFlags::EXTERNAL)
        }
    }

    /// The current meaning of `name` in the ordinary namespace.
    pub fn lookup_name(&self, name: NameId) -> Option<DeclRef> {
        if !self.scopes.at_global_scope()
            && let Some(d) = self.scopes.local_value(name)
        {
            return Some(d);
        }
        self.scopes.global_value(name)
    }

    /// Like `lookup_name`, but only the current contour.
    pub fn lookup_name_in_current_scope(&self, name: NameId) -> Option<DeclRef> {
        if self.scopes.at_global_scope() {
            return self.scopes.global_value(name);
        }
        self.scopes.local_value(name)?;
        self.scopes
            .current()
            .names
            .iter()
            .copied()
            .find(|&d| self.decls.get(d).name == Some(name))
    }

    // ============================================================
    // Tag namespace
    // ============================================================

    /// Register a struct/union/enum tag in the current contour. The
    /// definition may really be just a forward reference.
    pub fn declare_tag(&mut self, name: Option<NameId>, ty: TypeRef, span: SourceSpan) {
        if let Some(name) = name {
            let already = self
                .scopes
                .current()
                .tags
                .iter()
                .any(|&(tag_name, _)| tag_name == Some(name));
            if already {
                self.diag.report(SemanticError::TagRedeclaration { name, span });
                return;
            }
            // Record the identifier as the type's name if it has none.
            self.types.name_type(ty, name);
        }
        self.scopes.current_mut().tags.push((name, ty));
    }

    /// Find the struct/union/enum definition for `name`, searching from
    /// the current contour outward (or only the current one). If a tag of
    /// the wrong kind is found it is reported but still returned, so the
    /// caller can keep going.
    pub fn lookup_tag(&mut self, kind: TagKind, name: NameId, this_level_only: bool, span: SourceSpan) -> Option<TypeRef> {
        let mut found = None;
        for level in self.scopes.walk_out(this_level_only) {
            if let Some(&(_, ty)) = level.tags.iter().find(|&&(tag_name, _)| tag_name == Some(name)) {
                found = Some(ty);
                break;
            }
        }
        let ty = found?;
        if self.types.get(ty).kind.tag_kind() != Some(kind) {
            self.diag.report(SemanticError::WrongTagKind { name, span });
        }
        Some(ty)
    }

    /// Handle a declaration that names no variables. If its specifiers
    /// reference an aggregate/enum inherited from an enclosing contour, a
    /// forward reference shadows that tag for this contour so a later
    /// local definition does not clobber the outer type. A genuinely new
    /// aggregate or enum needs nothing; anything else is an empty
    /// declaration.
    pub fn shadow_tag(&mut self, declspecs: &[ParsedDeclSpec], span: SourceSpan) {
        for spec in declspecs {
            if let ParsedDeclSpec::TagType(ty) = spec {
                let ty = *ty;
                let Some(kind) = self.types.get(ty).kind.tag_kind() else {
                    continue;
                };
                if !self.types.get(ty).is_complete() {
                    // Freshly created forward reference or a type being
                    // defined right here; the builder already tagged it.
                    return;
                }
                let name = self.types.get(ty).name;
                if let Some(name) = name {
                    if self.lookup_tag(kind, name, true, span).is_none() {
                        let fresh = match kind {
                            TagKind::Struct => self.types.incomplete_record(false),
                            TagKind::Union => self.types.incomplete_record(true),
                            TagKind::Enum => self.types.incomplete_enum(),
                        };
                        self.declare_tag(Some(name), fresh, span);
                    }
                    return;
                }
                if kind == TagKind::Enum {
                    return;
                }
            }
        }
        if self.options.pedantic {
            self.diag.report_warning(SemanticWarning::EmptyDeclaration { span });
        }
    }

    /// Validate a struct, union or enum type: it must not be just a
    /// forward reference when used for an object. Returns the error type
    /// in that case so the caller can proceed.
    pub fn resolve_tags(&mut self, ty: TypeRef, span: SourceSpan) -> TypeRef {
        let main = self.types.main_variant(ty);
        let t = self.types.get(main);
        match t.kind.tag_kind() {
            Some(kind) if !t.is_complete() => {
                let name = t.name.unwrap_or_else(|| NameId::from("<anonymous>"));
                self.diag.report(SemanticError::UndefinedTag { kind, name, span });
                self.types.type_error
            }
            _ => ty,
        }
    }

    // ============================================================
    // Declaration construction
    // ============================================================

    /// Create a declaration record. The name's meaning is *not* entered
    /// into the scope; callers go through [`declare`](Self::declare).
    pub fn build_decl(
        &mut self,
        kind: DeclKind,
        name: Option<NameId>,
        ty: TypeRef,
        staticp: bool,
        externp: bool,
        span: SourceSpan,
    ) -> DeclRef {
        let is_function = matches!(kind, DeclKind::Func(_));

        let mut flags = DeclFlags::empty();
        flags.set(DeclFlags::STATIC, staticp);
        flags.set(DeclFlags::EXTERNAL, externp);

        if self.scopes.at_global_scope() {
            if !flags.contains(DeclFlags::STATIC) {
                flags.insert(DeclFlags::PUBLIC);
            }
            // At file scope everything but a function is allocated here.
            flags.set(DeclFlags::STATIC, !is_function);
        }
        if flags.contains(DeclFlags::EXTERNAL) {
            flags.remove(DeclFlags::STATIC);
        }
        if is_function {
            // All functions are external until defined in this unit.
            flags.insert(DeclFlags::EXTERNAL);
        }

        let layout_now = matches!(kind, DeclKind::Var | DeclKind::Parm { .. } | DeclKind::Result);
        let d = self.decls.alloc(Decl {
            kind,
            name,
            ty,
            flags,
            span,
            init: None,
            home: None,
            offset_bits: None,
        });
        if layout_now {
            self.types.layout_decl(&self.decls, d);
        }
        d
    }

    /// Declare a function implicitly at a call site: `int ()`, external.
    pub fn declare_implicit_function(&mut self, name: NameId, span: SourceSpan) -> DeclRef {
        let ty = self.types.type_default_function;
        let d = self.build_decl(DeclKind::Func(FuncData::default()), Some(name), ty, false, true, span);
        self.declare(d)
    }

    /// Make a definition for a builtin function with the given type.
    pub fn declare_builtin_function(&mut self, name: &str, ty: TypeRef) -> DeclRef {
        let d = self.build_decl(
            DeclKind::Func(FuncData::default()),
            Some(NameId::from(name)),
            ty,
            false,
            true,
            SourceSpan::builtin(),
        );
        self.declare(d)
    }

    // ============================================================
    // Blocks
    // ============================================================

    /// Create the node for a braced grouping at its open brace. Contents
    /// are installed by [`finish_block`](Self::finish_block).
    pub fn open_block(&mut self, span: SourceSpan) -> NodeRef {
        self.ast.push_node(
            NodeKind::Block {
                decls: Vec::new(),
                tags: Vec::new(),
                stmts: ThinVec::new(),
            },
            span,
        )
    }

    /// Install the declarations, tags and statements of a braced grouping
    /// at its close brace, and record in each declaration which block it
    /// belongs to.
    pub fn finish_block(&mut self, block: NodeRef, decls: Vec<DeclRef>, tags: Vec<TagEntry>, stmts: ThinVec<NodeRef>) {
        for &d in &decls {
            self.decls.get_mut(d).home = Some(DeclHome::Block(block));
        }
        self.ast.replace_node(block, NodeKind::Block { decls, tags, stmts });
    }
}
