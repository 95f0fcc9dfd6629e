//! Plain-text formatting of resolved types and declarations, for tests
//! and debugging.

use crate::semantic::decls::{DeclArena, DeclKind, DeclRef};
use crate::semantic::type_registry::TypeRegistry;
use crate::semantic::types::{ArrayDomain, FloatRank, FunctionParams, IntRank, TypeKind, TypeRef};

/// Render a type as readable English, e.g.
/// `array[3] of pointer to function returning pointer to int`.
pub fn dump_type(types: &TypeRegistry, ty: TypeRef) -> String {
    let t = types.get(ty);
    let mut out = String::new();
    if !t.qualifiers.is_empty() {
        out.push_str(&format!("{} ", t.qualifiers));
    }

    let main = types.get(types.main_variant(ty));
    match &main.kind {
        TypeKind::Void => out.push_str("void"),
        TypeKind::Integer { signed, rank } => {
            if !signed {
                out.push_str("unsigned ");
            }
            out.push_str(match rank {
                IntRank::Char => "char",
                IntRank::Short => "short",
                IntRank::Int => "int",
                IntRank::Long => "long",
            });
        }
        TypeKind::Real { rank } => out.push_str(match rank {
            FloatRank::Float => "float",
            FloatRank::Double => "double",
            FloatRank::LongDouble => "long double",
        }),
        TypeKind::Pointer { pointee } => {
            out.push_str("pointer to ");
            out.push_str(&dump_type(types, *pointee));
        }
        TypeKind::Array { element, domain } => {
            match domain {
                Some(ArrayDomain::Fixed { max_index }) => {
                    out.push_str(&format!("array[{}] of ", max_index + 1));
                }
                Some(ArrayDomain::Computed(_)) => out.push_str("array[*] of "),
                None => out.push_str("array[] of "),
            }
            out.push_str(&dump_type(types, *element));
        }
        TypeKind::Function { return_type, params } => {
            match params {
                FunctionParams::Unspecified => out.push_str("function"),
                FunctionParams::Known { types: parms, variadic } => {
                    let mut list: Vec<String> = parms.iter().map(|&p| dump_type(types, p)).collect();
                    if *variadic {
                        list.push("...".to_string());
                    }
                    out.push_str(&format!("function({})", list.join(", ")));
                }
            }
            out.push_str(" returning ");
            out.push_str(&dump_type(types, *return_type));
        }
        TypeKind::Record { is_union, .. } => {
            let keyword = if *is_union { "union" } else { "struct" };
            match main.name {
                Some(name) => out.push_str(&format!("{} {}", keyword, name)),
                None => out.push_str(&format!("{} (anonymous)", keyword)),
            }
        }
        TypeKind::Enum { .. } => match main.name {
            Some(name) => out.push_str(&format!("enum {}", name)),
            None => out.push_str("enum (anonymous)"),
        },
        TypeKind::Error => out.push_str("<error>"),
    }
    out
}

/// Render a declaration as `kind name: type`.
pub fn dump_decl(decls: &DeclArena, types: &TypeRegistry, decl: DeclRef) -> String {
    let d = decls.get(decl);
    let kind = match &d.kind {
        DeclKind::Var => "var",
        DeclKind::Parm { .. } => "parm",
        DeclKind::Result => "result",
        DeclKind::Func(_) => "func",
        DeclKind::Typedef => "typedef",
        DeclKind::Field { .. } => "field",
        DeclKind::EnumConst { .. } => "const",
        DeclKind::Label => "label",
    };
    let name = d.name.map(|n| n.to_string()).unwrap_or_else(|| "<anonymous>".into());
    format!("{} {}: {}", kind, name, dump_type(types, d.ty))
}
