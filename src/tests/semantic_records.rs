//! Struct/union construction: forward references, bit-fields, the tag
//! namespace, and record layout.

use crate::ast::{ParsedDeclSpec, ParsedDeclarator};
use crate::dumper::dump_type;
use crate::semantic::{DeclFlags, DeclKind, DeclRef, Resolver, TagKind, TypeKind};
use crate::tests::test_utils::*;

fn int_field(r: &mut Resolver, field_name: &str, width: Option<i64>) -> DeclRef {
    let width = width.map(|w| lit(r, w));
    r.resolve_field(&ParsedDeclarator::name(name(field_name)), &specs(&["int"]), width, sp())
}

fn members_of(r: &Resolver, t: crate::semantic::TypeRef) -> Vec<DeclRef> {
    match &r.types.get(r.types.main_variant(t)).kind {
        TypeKind::Record { members, .. } => members.clone(),
        _ => panic!("not a record"),
    }
}

#[test]
fn forward_reference_is_completed_in_place() {
    let mut r = resolver();
    let foo = name("foo");

    let fwd = r.build_struct(TagKind::Struct, Some(foo), Vec::new(), true, sp());
    assert!(!r.types.get(fwd).is_complete());
    let ptr = r.types.pointer_to(fwd);

    let x = int_field(&mut r, "x", None);
    let defined = r.build_struct(TagKind::Struct, Some(foo), vec![x], false, sp());

    // Same type object: pointers taken before the definition see the
    // completed field list afterward.
    assert_eq!(r.types.main_variant(defined), r.types.main_variant(fwd));
    assert!(r.types.get(fwd).is_complete());
    assert_eq!(members_of(&r, fwd), vec![x]);
    assert_eq!(dump_type(&r.types, ptr), "pointer to struct foo");
    assert!(errors(&r).is_empty());
}

#[test]
fn incomplete_struct_object_is_diagnosed() {
    let mut r = resolver();
    let fwd = r.build_struct(TagKind::Struct, Some(name("bar")), Vec::new(), true, sp());

    let d = r.start_decl(
        &ParsedDeclarator::name(name("v")),
        &[ParsedDeclSpec::TagType(fwd)],
        false,
        sp(),
    );
    assert_eq!(errors(&r), vec!["undefined struct tag `bar`".to_string()]);
    // Degraded, but the declaration exists and keeps its name.
    assert_eq!(r.lookup_name(name("v")), Some(d));
}

#[test]
fn pointer_to_incomplete_struct_is_fine() {
    let mut r = resolver();
    let fwd = r.build_struct(TagKind::Struct, Some(name("node")), Vec::new(), true, sp());
    let d = r.start_decl(
        &ParsedDeclarator::pointer(ParsedDeclarator::name(name("head"))),
        &[ParsedDeclSpec::TagType(fwd)],
        false,
        sp(),
    );
    assert!(errors(&r).is_empty());
    assert_eq!(dump_type(&r.types, r.decls.get(d).ty), "pointer to struct node");
}

#[test]
fn zero_width_bit_field_is_spliced_and_realigns_its_successor() {
    // struct { int a:0; int b:3; int c; }
    let mut r = resolver();
    let a = int_field(&mut r, "a", Some(0));
    let b = int_field(&mut r, "b", Some(3));
    let c = int_field(&mut r, "c", None);
    let t = r.build_struct(TagKind::Struct, Some(name("bits")), vec![a, b, c], false, sp());

    // The :0 member is dropped from the final field list entirely; it
    // exists only to force alignment of the field after it.
    assert_eq!(members_of(&r, t), vec![b, c]);

    let bd = r.decls.get(b);
    assert!(bd.flags.contains(DeclFlags::WORD_ALIGNED));
    assert!(bd.flags.contains(DeclFlags::PACKED));
    assert!(matches!(bd.kind, DeclKind::Field { bit_size: Some(3), .. }));

    let cd = r.decls.get(c);
    assert!(!cd.flags.contains(DeclFlags::WORD_ALIGNED));
    assert!(!cd.flags.contains(DeclFlags::PACKED));
    assert!(errors(&r).is_empty());
}

#[test]
fn non_constant_bit_field_width_is_dropped() {
    let mut r = resolver();
    let width = r.ast.push_node(crate::ast::NodeKind::Ident(name("w")), sp());
    let a = r.resolve_field(&ParsedDeclarator::name(name("a")), &specs(&["int"]), Some(width), sp());
    let t = r.build_struct(TagKind::Struct, Some(name("s")), vec![a], false, sp());

    assert_eq!(
        errors(&r),
        vec!["structure field `a` width not an integer constant".to_string()]
    );
    // The field stays, unpacked.
    assert_eq!(members_of(&r, t), vec![a]);
    assert!(!r.decls.get(a).flags.contains(DeclFlags::PACKED));
}

#[test]
fn struct_layout_rounds_size_to_alignment() {
    // struct { char c; int i; } -> 8 bytes, alignment 4.
    let mut r = resolver();
    let c = r.resolve_field(&ParsedDeclarator::name(name("c")), &specs(&["char"]), None, sp());
    let i = int_field(&mut r, "i", None);
    let t = r.build_struct(TagKind::Struct, Some(name("pair")), vec![c, i], false, sp());

    let layout = r.types.get(r.types.main_variant(t)).layout.unwrap();
    assert_eq!((layout.size, layout.align), (8, 4));
    assert_eq!(r.decls.get(c).offset_bits, Some(0));
    assert_eq!(r.decls.get(i).offset_bits, Some(32));
}

#[test]
fn union_members_all_start_at_zero() {
    let mut r = resolver();
    let c = r.resolve_field(&ParsedDeclarator::name(name("c")), &specs(&["char"]), None, sp());
    let l = r.resolve_field(&ParsedDeclarator::name(name("l")), &specs(&["long"]), None, sp());
    let t = r.build_struct(TagKind::Union, Some(name("u")), vec![c, l], false, sp());

    let layout = r.types.get(r.types.main_variant(t)).layout.unwrap();
    assert_eq!((layout.size, layout.align), (8, 8));
    assert_eq!(r.decls.get(c).offset_bits, Some(0));
    assert_eq!(r.decls.get(l).offset_bits, Some(0));
}

#[test]
fn field_declared_as_function_becomes_pointer() {
    let mut r = resolver();
    let f = r.resolve_field(
        &ParsedDeclarator::function(thin_vec::ThinVec::new(), ParsedDeclarator::name(name("op"))),
        &specs(&["int"]),
        None,
        sp(),
    );
    assert_eq!(errors(&r), vec!["field `op` declared as a function".to_string()]);
    assert_eq!(
        dump_type(&r.types, r.decls.get(f).ty),
        "pointer to function returning int"
    );
}

#[test]
fn wrong_kind_of_tag_reports_but_returns() {
    let mut r = resolver();
    let x = int_field(&mut r, "x", None);
    let t = r.build_struct(TagKind::Struct, Some(name("foo")), vec![x], false, sp());

    let found = r.lookup_tag(TagKind::Union, name("foo"), false, sp());
    assert_eq!(found, Some(t));
    assert_eq!(errors(&r), vec!["`foo` defined as wrong kind of tag".to_string()]);
}

#[test]
fn duplicate_tag_in_same_scope_reports() {
    let mut r = resolver();
    let a = r.types.incomplete_record(false);
    let b = r.types.incomplete_record(false);
    r.declare_tag(Some(name("t")), a, sp());
    r.declare_tag(Some(name("t")), b, sp());
    assert_eq!(
        errors(&r),
        vec!["redeclaration of struct, union or enum tag `t`".to_string()]
    );
    // The existing entry is untouched.
    assert_eq!(r.lookup_tag(TagKind::Struct, name("t"), true, sp()), Some(a));
}

#[test]
fn anonymous_tags_are_not_reachable_by_lookup() {
    let mut r = resolver();
    let x = int_field(&mut r, "x", None);
    let t = r.build_struct(TagKind::Struct, None, vec![x], false, sp());
    assert!(r.types.get(t).is_complete());
    assert_eq!(dump_type(&r.types, t), "struct (anonymous)");
    assert_eq!(r.current_tags().len(), 1);
    assert_eq!(r.current_tags()[0].0, None);
}

#[test]
fn shadow_tag_pushes_a_forward_reference_for_inherited_tags() {
    let mut r = resolver();
    let outer_field = int_field(&mut r, "x", None);
    let outer = r.build_struct(TagKind::Struct, Some(name("s")), vec![outer_field], false, sp());

    r.enter_scope();
    r.shadow_tag(&[ParsedDeclSpec::TagType(outer)], sp());

    // A new incomplete tag now shadows the outer definition here.
    let inner = r.lookup_tag(TagKind::Struct, name("s"), true, sp()).unwrap();
    assert_ne!(r.types.main_variant(inner), r.types.main_variant(outer));
    assert!(!r.types.get(inner).is_complete());

    // Defining struct s in this contour completes the shadow, not the
    // outer type.
    let y = int_field(&mut r, "y", None);
    let redefined = r.build_struct(TagKind::Struct, Some(name("s")), vec![y], false, sp());
    assert_eq!(r.types.main_variant(redefined), r.types.main_variant(inner));
    r.exit_scope();

    // Outside, the original definition is visible again, intact.
    assert_eq!(
        r.lookup_tag(TagKind::Struct, name("s"), false, sp()),
        Some(outer)
    );
    assert_eq!(members_of(&r, outer), vec![outer_field]);
    assert!(errors(&r).is_empty());
}

#[test]
fn empty_declaration_warns_in_pedantic_mode() {
    let mut r = pedantic_resolver();
    r.shadow_tag(&specs(&["int"]), sp());
    assert_eq!(warnings(&r), vec!["empty declaration".to_string()]);
}

#[test]
fn shadow_tag_of_new_definition_is_silent() {
    // A bare `struct fresh { int x; };` declares the tag and nothing
    // else; that is not an empty declaration.
    let mut r = pedantic_resolver();
    let x = int_field(&mut r, "x", None);
    let t = r.build_struct(TagKind::Struct, Some(name("fresh")), vec![x], false, sp());
    r.shadow_tag(&[ParsedDeclSpec::TagType(t)], sp());
    assert!(warnings(&r).is_empty());

    // Likewise a bare forward reference `struct later;`.
    let fwd = r.build_struct(TagKind::Struct, Some(name("later")), Vec::new(), true, sp());
    r.shadow_tag(&[ParsedDeclSpec::TagType(fwd)], sp());
    assert!(warnings(&r).is_empty());
}
