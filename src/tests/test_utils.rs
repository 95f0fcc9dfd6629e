//! Common utilities for resolver tests.

use thin_vec::ThinVec;

use crate::ast::{GotoTarget, NameId, NodeKind, NodeRef, ParsedDeclSpec, SourceSpan, SpecKeyword};
use crate::diagnostic::DiagnosticLevel;
use crate::dumper::dump_decl;
use crate::lang_options::LangOptions;
use crate::semantic::{Backend, DeclKind, DeclRef, Resolver, UnitView};

pub fn resolver() -> Resolver {
    Resolver::new(LangOptions::default())
}

pub fn pedantic_resolver() -> Resolver {
    Resolver::new(LangOptions::pedantic())
}

pub fn sp() -> SourceSpan {
    SourceSpan::builtin()
}

pub fn name(s: &str) -> NameId {
    NameId::from(s)
}

/// Build one declaration specifier from a keyword or type name.
pub fn spec(s: &str) -> ParsedDeclSpec {
    let keyword = match s {
        "auto" => Some(SpecKeyword::Auto),
        "static" => Some(SpecKeyword::Static),
        "extern" => Some(SpecKeyword::Extern),
        "register" => Some(SpecKeyword::Register),
        "typedef" => Some(SpecKeyword::Typedef),
        "long" => Some(SpecKeyword::Long),
        "short" => Some(SpecKeyword::Short),
        "signed" => Some(SpecKeyword::Signed),
        "unsigned" => Some(SpecKeyword::Unsigned),
        "const" => Some(SpecKeyword::Const),
        "volatile" => Some(SpecKeyword::Volatile),
        _ => None,
    };
    match keyword {
        Some(k) => ParsedDeclSpec::Keyword(k),
        None => ParsedDeclSpec::TypeName(name(s)),
    }
}

pub fn specs(list: &[&str]) -> ThinVec<ParsedDeclSpec> {
    list.iter().map(|s| spec(s)).collect()
}

pub fn lit(r: &mut Resolver, value: i64) -> NodeRef {
    r.ast.push_node(NodeKind::LiteralInt(value), sp())
}

/// Error messages collected so far.
pub fn errors(r: &Resolver) -> Vec<String> {
    r.diag
        .diagnostics()
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Error)
        .map(|d| d.message.clone())
        .collect()
}

pub fn warnings(r: &Resolver) -> Vec<String> {
    r.diag
        .diagnostics()
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Warning)
        .map(|d| d.message.clone())
        .collect()
}

/// One function definition as seen at hand-off.
#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub name: String,
    pub parms: Vec<String>,
    pub goto_targets: Vec<String>,
}

/// Backend capturing formatted summaries of everything handed off.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub functions: Vec<FunctionRecord>,
    pub variables: Vec<String>,
}

impl Backend for RecordingBackend {
    fn emit_function(&mut self, unit: UnitView<'_>, func: DeclRef) {
        let d = unit.decls.get(func);
        let fn_name = d.name.map(|n| n.to_string()).unwrap_or_else(|| "<anonymous>".into());

        let mut parms = Vec::new();
        let mut goto_targets = Vec::new();
        if let DeclKind::Func(data) = &d.kind {
            for &p in &data.parms {
                parms.push(dump_decl(unit.decls, unit.types, p));
            }
            if let Some(body) = data.body
                && let NodeKind::Block { stmts, .. } = unit.ast.get_kind(body)
            {
                for &stmt in stmts {
                    if let NodeKind::Goto(target) = unit.ast.get_kind(stmt) {
                        goto_targets.push(match *target {
                            GotoTarget::Resolved(label) => {
                                let label_name = unit
                                    .decls
                                    .get(label)
                                    .name
                                    .map(|n| n.to_string())
                                    .unwrap_or_default();
                                format!("resolved:{}", label_name)
                            }
                            GotoTarget::Named(n) => format!("named:{}", n),
                            GotoTarget::Unresolved => "unresolved".to_string(),
                        });
                    }
                }
            }
        }

        self.functions.push(FunctionRecord {
            name: fn_name,
            parms,
            goto_targets,
        });
    }

    fn emit_variable(&mut self, unit: UnitView<'_>, var: DeclRef) {
        self.variables.push(dump_decl(unit.decls, unit.types, var));
    }
}
