//! Function definition lifecycle.
//!
//! A definition moves through three phases: the declarator is accepted
//! (`start_function`), the formal parameter names are matched with their
//! declarations (`store_parm_decls`), and the body is closed out
//! (`finish_function`). Label names are scoped to the whole function
//! body, so goto targets are collected during the body and resolved in
//! one pass when the function's top contour is popped.

use log::debug;
use thin_vec::ThinVec;

use crate::ast::{AstMark, GotoTarget, NameId, NodeKind, NodeRef, ParsedDeclSpec, ParsedDeclarator, SourceSpan};
use crate::diagnostic::SemanticError;
use crate::semantic::declarator::DeclContext;
use crate::semantic::decls::{DeclFlags, DeclHome, DeclKind, DeclMark, DeclRef, ParmName};
use crate::semantic::output::{Backend, UnitView};
use crate::semantic::resolver::Resolver;
use crate::semantic::types::TypeKind;

/// Phase of the function definition in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionPhase {
    Idle,
    DeclaratorAccepted,
    ParametersBound,
}

/// State valid only between "function declarator accepted" and "function
/// body closed". Must be empty again at function exit.
pub struct FunctionState {
    pub(crate) phase: FunctionPhase,
    pub(crate) current: Option<DeclRef>,
    pub(crate) block: Option<NodeRef>,
    /// Label statements with names seen in the body, so their names'
    /// bindings can be cleared when the body ends.
    pub(crate) named_labels: Vec<NodeRef>,
    /// All goto statements of the body, resolved once all labels are in.
    pub(crate) gotos: Vec<NodeRef>,
    /// Whether a `return value;` has been seen in the body.
    pub(crate) returns_value: bool,
    pub(crate) ast_mark: Option<AstMark>,
    pub(crate) decl_mark: Option<DeclMark>,
}

impl FunctionState {
    pub fn new() -> Self {
        FunctionState {
            phase: FunctionPhase::Idle,
            current: None,
            block: None,
            named_labels: Vec::new(),
            gotos: Vec::new(),
            returns_value: false,
            ast_mark: None,
            decl_mark: None,
        }
    }

    pub fn labels_and_gotos_empty(&self) -> bool {
        self.named_labels.is_empty() && self.gotos.is_empty()
    }
}

impl Default for FunctionState {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Begin a function definition from its declspecs and declarator.
    ///
    /// Registers the function (marked as a real definition, not a
    /// tentative one), opens the body's contour and the function-local
    /// allocation region, and creates the result declaration. Returns
    /// false without changing state if the declarator does not declare a
    /// function; the caller reports that as a syntax-level error.
    pub fn start_function(&mut self, declspecs: &[ParsedDeclSpec], declarator: &ParsedDeclarator, span: SourceSpan) -> bool {
        // Assume no value is returned until a `return value;` is seen.
        self.function.returns_value = false;

        let resolved = self.resolve_declarator(declspecs, declarator, DeclContext::Normal, span);
        let Some(decl) = resolved.as_decl() else {
            return false;
        };
        if !self.decls.get(decl).is_function() {
            return false;
        }

        // Mark the declaration as a definition up front, so registering
        // it already enforces the one-definition rule.
        self.decls.get_mut(decl).flags.insert(DeclFlags::DEFINED);
        let pushed = self.declare(decl);

        // On an erroneous redeclaration of something not a function,
        // keep the declaration nobody else can see so the body can still
        // be read.
        let fndecl = if self.decls.get(pushed).is_function() { pushed } else { decl };
        self.function.current = Some(fndecl);
        debug!("Resolver: starting function `{:?}`", self.decls.get(fndecl).name);

        self.enter_scope();

        // Nodes and declarations from here to finish_function belong to
        // this function only.
        self.function.ast_mark = Some(self.ast.mark());
        self.function.decl_mark = Some(self.decls.mark());

        let block = self.open_block(span);
        self.function.block = Some(block);

        let return_type = match self.types.get(self.types.main_variant(self.decls.get(fndecl).ty)).kind {
            TypeKind::Function { return_type, .. } => return_type,
            _ => self.types.type_int,
        };
        let result = self.build_decl(DeclKind::Result, Some(self.name_value), return_type, false, false, span);
        self.decls.get_mut(result).home = Some(DeclHome::Block(block));

        if let DeclKind::Func(data) = &mut self.decls.get_mut(fndecl).kind {
            data.body = Some(block);
            data.result = Some(result);
        }

        self.function.phase = FunctionPhase::DeclaratorAccepted;
        true
    }

    /// Match the formal parameter names captured from the function
    /// declarator against the parameter declarations pushed into the
    /// body's contour (the form where types are declared between the
    /// name list and the body). Every name ends up with exactly one
    /// parameter declaration, defaulting to `int`; the final chain is
    /// reordered to the name list's order and stored both as the
    /// function's formals and as the contour's declarations.
    pub fn store_parm_decls(&mut self) {
        if self.function.phase != FunctionPhase::DeclaratorAccepted {
            panic!("ICE: store_parm_decls outside a function declarator");
        }
        let fndecl = self.function.current.expect("ICE: no function in progress");
        let block = self.function.block.expect("ICE: no function block");
        let fn_span = self.decls.get(fndecl).span;

        let parmdecls = self.current_declarations();
        let parm_names: Vec<ParmName> = match &self.decls.get(fndecl).kind {
            DeclKind::Func(data) => data.parm_names.clone(),
            _ => Vec::new(),
        };

        let mut chain: Vec<DeclRef> = Vec::with_capacity(parm_names.len());
        for parm in &parm_names {
            let Some(name) = parm.name else {
                self.diag.report(SemanticError::ParameterNameMissing { span: fn_span });
                continue;
            };

            // A declaration in the contour may specify this parm by name.
            let mut found = parmdecls
                .iter()
                .copied()
                .find(|&d| self.decls.get(d).name == Some(name));

            // Already bound to another slot means a duplicate name; the
            // duplicate slot is dropped.
            if let Some(f) = found
                && self.decls.get(f).home.is_some()
            {
                self.diag
                    .report(SemanticError::MultipleParametersNamed { name, span: fn_span });
                continue;
            }

            // A type given in the arglist overrides any declaration.
            if let Some(declared_ty) = parm.ty {
                let arg_type = self.promoted_arg_type(declared_ty);
                match found {
                    Some(f) => {
                        self.diag
                            .report(SemanticError::ParameterTypeGivenTwice { name, span: fn_span });
                        // The arg-list type wins, in the declaration the
                        // name is already bound to.
                        let d = self.decls.get_mut(f);
                        d.ty = declared_ty;
                        d.kind = DeclKind::Parm { arg_type };
                    }
                    None => {
                        let f = self.build_decl(
                            DeclKind::Parm { arg_type },
                            Some(name),
                            declared_ty,
                            false,
                            false,
                            fn_span,
                        );
                        found = Some(self.declare(f));
                    }
                }
            }

            // No declaration anywhere: the parameter defaults to int.
            let f = match found {
                Some(f) => f,
                None => {
                    let ty = self.types.type_int;
                    let f = self.build_decl(DeclKind::Parm { arg_type: ty }, Some(name), ty, false, false, fn_span);
                    self.declare(f)
                }
            };

            self.decls.get_mut(f).home = Some(DeclHome::Block(block));
            chain.push(f);
        }

        // Complain about declarations not matched with any name.
        for d in parmdecls {
            if self.decls.get(d).home.is_none() {
                let decl = self.decls.get(d);
                self.diag.report(SemanticError::NoSuchParameter {
                    name: decl.name.unwrap_or_else(|| NameId::from("<anonymous>")),
                    span: decl.span,
                });
            }
        }

        if let DeclKind::Func(data) = &mut self.decls.get_mut(fndecl).kind {
            data.parms = chain.clone();
        }
        self.replace_declarations(chain.clone());
        self.layout_parms(&chain);

        self.function.phase = FunctionPhase::ParametersBound;
    }

    /// Close out the function: the body block is finished, the contour is
    /// popped (resolving gotos against labels), the completed function is
    /// handed to the code generator, and the function-local allocation
    /// region is released.
    pub fn finish_function(&mut self, stmts: ThinVec<NodeRef>, backend: &mut dyn Backend) {
        if self.function.phase != FunctionPhase::ParametersBound {
            panic!("ICE: finish_function without bound parameters");
        }
        let fndecl = self.function.current.expect("ICE: no function in progress");
        let block = self.function.block.expect("ICE: no function block");

        // Now locally defined.
        let flags = &mut self.decls.get_mut(fndecl).flags;
        flags.remove(DeclFlags::EXTERNAL);
        flags.insert(DeclFlags::STATIC | DeclFlags::DEFINED);

        self.finish_block(block, Vec::new(), Vec::new(), stmts);
        self.exit_scope();

        backend.emit_function(
            UnitView {
                ast: &self.ast,
                decls: &self.decls,
                types: &self.types,
            },
            fndecl,
        );

        // Stop pointing at the nodes about to be released; the DEFINED
        // flag keeps recording that this was an actual definition.
        if let DeclKind::Func(data) = &mut self.decls.get_mut(fndecl).kind {
            data.parms.clear();
            data.parm_names.clear();
            data.result = None;
            data.body = None;
        }
        if let Some(mark) = self.function.decl_mark.take() {
            self.decls.release_to(mark);
        }
        if let Some(mark) = self.function.ast_mark.take() {
            self.ast.release_to(mark);
        }

        self.function.current = None;
        self.function.block = None;
        self.function.phase = FunctionPhase::Idle;
        debug!("Resolver: finished function");
    }

    /// Record a named label of the current function body. Reports a
    /// duplicate if the name is already a label in this function.
    pub fn push_label(&mut self, name: NameId, span: SourceSpan) -> NodeRef {
        let decl = self.build_decl(DeclKind::Label, Some(name), self.types.type_void, false, false, span);
        if let Some(block) = self.function.block {
            self.decls.get_mut(decl).home = Some(DeclHome::Block(block));
        }
        let stmt = self.ast.push_node(NodeKind::Label(decl), span);

        if self.scopes.label_value(name).is_some() {
            self.diag.report(SemanticError::DuplicateLabel { name, span });
        } else {
            self.scopes.set_label_value(name, decl);
        }
        self.function.named_labels.push(stmt);
        stmt
    }

    /// Record a goto statement. Resolution is always deferred to the
    /// function's end, since a label may legally appear after its goto.
    pub fn push_goto(&mut self, target: NameId, span: SourceSpan) -> NodeRef {
        let stmt = self.ast.push_node(NodeKind::Goto(GotoTarget::Named(target)), span);
        self.function.gotos.push(stmt);
        stmt
    }

    /// Note that a `return value;` statement has been seen.
    pub fn set_returns_value(&mut self) {
        self.function.returns_value = true;
    }

    pub fn returns_value(&self) -> bool {
        self.function.returns_value
    }

    /// The function declaration currently being defined, if any.
    pub fn current_function(&self) -> Option<DeclRef> {
        self.function.current
    }

    pub fn function_phase(&self) -> FunctionPhase {
        self.function.phase
    }

    /// Match every pending goto with a named label. Runs exactly when
    /// the function's top contour is popped; afterwards both the label
    /// and goto sets are empty and all label bindings are cleared.
    pub(crate) fn resolve_pending_gotos(&mut self) {
        let gotos = std::mem::take(&mut self.function.gotos);
        for stmt in gotos {
            let NodeKind::Goto(GotoTarget::Named(name)) = *self.ast.get_kind(stmt) else {
                continue;
            };
            match self.scopes.label_value(name) {
                Some(label) => {
                    self.ast.replace_node(stmt, NodeKind::Goto(GotoTarget::Resolved(label)));
                }
                None => {
                    self.diag.report(SemanticError::NoLabelForGoto {
                        name,
                        span: self.ast.get_span(stmt),
                    });
                    // The goto becomes a no-op target rather than
                    // blocking the rest of the function.
                    self.ast.replace_node(stmt, NodeKind::Goto(GotoTarget::Unresolved));
                }
            }
        }

        let labels = std::mem::take(&mut self.function.named_labels);
        for stmt in labels {
            if let NodeKind::Label(decl) = *self.ast.get_kind(stmt)
                && let Some(name) = self.decls.get(decl).name
            {
                self.scopes.clear_label_value(name);
            }
        }
    }

    /// Assign each parameter its position in the argument area.
    fn layout_parms(&mut self, parms: &[DeclRef]) {
        let mut offset_bits: u32 = 0;
        for &p in parms {
            let size = self.types.size_of(self.decls.get(p).ty).unwrap_or(4);
            self.decls.get_mut(p).offset_bits = Some(offset_bits);
            // Each argument occupies at least one word.
            offset_bits += size.max(4).next_multiple_of(4) * 8;
        }
    }
}
