//! Declarator resolution: specifier combinations, the declarator walk,
//! parameter decay, and array-bound settlement.

use thin_vec::{ThinVec, thin_vec};

use crate::ast::{NodeKind, ParsedDeclarator, ParsedParam};
use crate::dumper::dump_type;
use crate::semantic::{DeclContext, DeclFlags, DeclKind, Resolver, NullBackend};
use crate::tests::test_utils::*;

fn type_of(r: &Resolver, d: crate::semantic::DeclRef) -> String {
    dump_type(&r.types, r.decls.get(d).ty)
}

#[test]
fn declarator_round_trip_ordinary() {
    // int *(*x[3])();
    let mut r = resolver();
    let three = lit(&mut r, 3);
    let declarator = ParsedDeclarator::pointer(ParsedDeclarator::function(
        ThinVec::new(),
        ParsedDeclarator::pointer(ParsedDeclarator::array(Some(three), ParsedDeclarator::name(name("x")))),
    ));

    let d = r.start_decl(&declarator, &specs(&["int"]), false, sp());
    assert!(matches!(r.decls.get(d).kind, DeclKind::Var));
    assert_eq!(
        type_of(&r, d),
        "array[3] of pointer to function returning pointer to int"
    );
    assert!(errors(&r).is_empty());
}

#[test]
fn declarator_round_trip_parameter_decays_outermost_layer() {
    // The same declarator in parameter context: only the parameter's own
    // outermost array layer decays to a pointer.
    let mut r = resolver();
    let three = lit(&mut r, 3);
    let declarator = ParsedDeclarator::pointer(ParsedDeclarator::function(
        ThinVec::new(),
        ParsedDeclarator::pointer(ParsedDeclarator::array(Some(three), ParsedDeclarator::name(name("x")))),
    ));

    let d = r
        .resolve_declarator(&specs(&["int"]), &declarator, DeclContext::Parm, sp())
        .as_decl()
        .unwrap();
    assert!(matches!(r.decls.get(d).kind, DeclKind::Parm { .. }));
    assert_eq!(
        type_of(&r, d),
        "pointer to pointer to function returning pointer to int"
    );
}

#[test]
fn void_variable_is_rejected_once_and_becomes_int() {
    let mut r = resolver();
    let d = r.start_decl(&ParsedDeclarator::name(name("v")), &specs(&["void"]), false, sp());
    assert_eq!(errors(&r), vec!["variable or field `v` declared void".to_string()]);
    assert_eq!(type_of(&r, d), "int");
}

#[test]
fn modifier_combinations_select_integer_types() {
    let mut r = resolver();
    let cases: &[(&[&str], &str)] = &[
        (&["int"], "int"),
        (&[], "int"),
        (&["unsigned"], "unsigned int"),
        (&["unsigned", "char"], "unsigned char"),
        (&["signed", "char"], "char"),
        (&["short"], "short"),
        (&["unsigned", "short"], "unsigned short"),
        (&["long", "int"], "long"),
        (&["unsigned", "long"], "unsigned long"),
        (&["long", "double"], "long double"),
    ];
    for (i, (spec_list, expected)) in cases.iter().enumerate() {
        let d = r.start_decl(
            &ParsedDeclarator::name(name(&format!("v{}", i))),
            &specs(spec_list),
            false,
            sp(),
        );
        assert_eq!(&type_of(&r, d), expected, "specs {:?}", spec_list);
    }
    assert!(errors(&r).is_empty());
}

#[test]
fn repeated_long_collapses_to_long() {
    let mut r = resolver();
    let d = r.start_decl(
        &ParsedDeclarator::name(name("big")),
        &specs(&["long", "long", "int"]),
        false,
        sp(),
    );
    assert_eq!(type_of(&r, d), "long");
    assert!(errors(&r).is_empty());
}

#[test]
fn conflicting_modifiers_are_rejected() {
    let mut r = resolver();
    r.start_decl(&ParsedDeclarator::name(name("a")), &specs(&["long", "short"]), false, sp());
    r.start_decl(
        &ParsedDeclarator::name(name("b")),
        &specs(&["signed", "unsigned"]),
        false,
        sp(),
    );
    assert_eq!(
        errors(&r),
        vec![
            "long and short specified together".to_string(),
            "signed and unsigned specified together".to_string(),
        ]
    );
}

#[test]
fn modifiers_require_explicit_int_base() {
    let mut r = resolver();
    r.start_decl(
        &ParsedDeclarator::name(name("T")),
        &specs(&["typedef", "int"]),
        false,
        sp(),
    );
    r.start_decl(&ParsedDeclarator::name(name("v")), &specs(&["long", "T"]), false, sp());
    assert_eq!(
        errors(&r),
        vec!["long, short, signed or unsigned used invalidly".to_string()]
    );
}

#[test]
fn two_data_types_are_rejected() {
    let mut r = resolver();
    r.start_decl(&ParsedDeclarator::name(name("v")), &specs(&["int", "double"]), false, sp());
    assert_eq!(errors(&r), vec!["two or more data types in declaration".to_string()]);
}

#[test]
fn unknown_type_name_is_rejected_and_defaults_to_int() {
    let mut r = resolver();
    let d = r.start_decl(&ParsedDeclarator::name(name("v")), &specs(&["mystery"]), false, sp());
    assert_eq!(
        errors(&r),
        vec!["`mystery` fails to be a typedef or built in type".to_string()]
    );
    assert_eq!(type_of(&r, d), "int");
}

#[test]
fn typedef_declares_and_resolves() {
    let mut r = resolver();
    let t = r.start_decl(
        &ParsedDeclarator::pointer(ParsedDeclarator::name(name("str"))),
        &specs(&["typedef", "char"]),
        false,
        sp(),
    );
    assert!(matches!(r.decls.get(t).kind, DeclKind::Typedef));

    let v = r.start_decl(&ParsedDeclarator::name(name("s")), &specs(&["str"]), false, sp());
    assert_eq!(type_of(&r, v), "pointer to char");
    assert!(errors(&r).is_empty());
}

#[test]
fn typedef_qualifiers_are_inherited() {
    let mut r = resolver();
    r.start_decl(
        &ParsedDeclarator::name(name("ci")),
        &specs(&["typedef", "const", "int"]),
        false,
        sp(),
    );
    let v = r.start_decl(&ParsedDeclarator::name(name("v")), &specs(&["ci"]), false, sp());
    // The variable's type reduces to the main variant; constness lands
    // on the declaration.
    assert_eq!(type_of(&r, v), "int");
    assert!(r.decls.get(v).flags.contains(DeclFlags::READONLY));
}

#[test]
fn qualifiers_bind_to_the_pointee() {
    let mut r = resolver();
    let d = r.start_decl(
        &ParsedDeclarator::pointer(ParsedDeclarator::name(name("p"))),
        &specs(&["const", "int"]),
        false,
        sp(),
    );
    assert_eq!(type_of(&r, d), "pointer to const int");
    assert!(!r.decls.get(d).flags.contains(DeclFlags::READONLY));
}

#[test]
fn pointer_qualifiers_bind_to_the_declaration() {
    use crate::semantic::TypeQualifiers;
    let mut r = resolver();
    let d = r.start_decl(
        &ParsedDeclarator::pointer_qualified(TypeQualifiers::CONST, ParsedDeclarator::name(name("p"))),
        &specs(&["int"]),
        false,
        sp(),
    );
    assert_eq!(type_of(&r, d), "pointer to int");
    assert!(r.decls.get(d).flags.contains(DeclFlags::READONLY));
}

#[test]
fn array_of_void_and_functions_degrade_to_int() {
    let mut r = resolver();
    let two = lit(&mut r, 2);
    let d = r.start_decl(
        &ParsedDeclarator::array(Some(two), ParsedDeclarator::name(name("a"))),
        &specs(&["void"]),
        false,
        sp(),
    );
    assert_eq!(type_of(&r, d), "array[2] of int");

    // int c[2]() declares an array of functions.
    let two = lit(&mut r, 2);
    let bad = ParsedDeclarator::function(
        ThinVec::new(),
        ParsedDeclarator::array(Some(two), ParsedDeclarator::name(name("c"))),
    );
    let d = r.start_decl(&bad, &specs(&["int"]), false, sp());
    assert_eq!(type_of(&r, d), "array[2] of int");
    assert_eq!(
        errors(&r),
        vec![
            "array of voids declared".to_string(),
            "array of functions declared".to_string(),
        ]
    );
}

#[test]
fn function_returning_function_or_array_degrades_to_int() {
    let mut r = resolver();
    // int f()(): function wrapper over function wrapper.
    let bad = ParsedDeclarator::function(
        ThinVec::new(),
        ParsedDeclarator::function(ThinVec::new(), ParsedDeclarator::name(name("f"))),
    );
    let d = r.start_decl(&bad, &specs(&["int"]), false, sp());
    assert_eq!(type_of(&r, d), "function returning int");
    assert_eq!(errors(&r), vec!["function returning a function declared".to_string()]);
}

#[test]
fn storage_class_validation() {
    let mut r = resolver();
    r.start_decl(
        &ParsedDeclarator::name(name("a")),
        &specs(&["auto", "int"]),
        false,
        sp(),
    );
    r.start_decl(
        &ParsedDeclarator::name(name("b")),
        &specs(&["static", "extern", "int"]),
        false,
        sp(),
    );
    assert_eq!(
        errors(&r),
        vec![
            "`auto` specified in external declaration".to_string(),
            "two or more storage classes in declaration".to_string(),
        ]
    );
}

#[test]
fn register_is_tolerated_for_parameters() {
    let mut r = resolver();
    let d = r
        .resolve_declarator(
            &specs(&["register", "int"]),
            &ParsedDeclarator::name(name("p")),
            DeclContext::Parm,
            sp(),
        )
        .as_decl()
        .unwrap();
    assert!(errors(&r).is_empty());
    assert!(r.decls.get(d).flags.contains(DeclFlags::REGISTER));

    r.resolve_declarator(
        &specs(&["static", "int"]),
        &ParsedDeclarator::name(name("q")),
        DeclContext::Parm,
        sp(),
    );
    assert_eq!(errors(&r), vec!["storage class specified in parameter list".to_string()]);
}

#[test]
fn parameters_record_promoted_argument_types() {
    let mut r = resolver();
    let f = r
        .resolve_declarator(
            &specs(&["float"]),
            &ParsedDeclarator::name(name("f")),
            DeclContext::Parm,
            sp(),
        )
        .as_decl()
        .unwrap();
    let c = r
        .resolve_declarator(
            &specs(&["char"]),
            &ParsedDeclarator::name(name("c")),
            DeclContext::Parm,
            sp(),
        )
        .as_decl()
        .unwrap();

    let arg_type = |r: &Resolver, d| match r.decls.get(d).kind {
        DeclKind::Parm { arg_type } => dump_type(&r.types, arg_type),
        _ => panic!("not a parameter"),
    };
    assert_eq!(type_of(&r, f), "float");
    assert_eq!(arg_type(&r, f), "double");
    assert_eq!(arg_type(&r, c), "int");
}

#[test]
fn type_name_resolution_yields_bare_types() {
    // (int **) as in a cast.
    let mut r = resolver();
    let t = r.resolve_type_name(
        &specs(&["int"]),
        &ParsedDeclarator::pointer(ParsedDeclarator::pointer(ParsedDeclarator::Abstract)),
        sp(),
    );
    assert_eq!(dump_type(&r.types, t), "pointer to pointer to int");
    assert!(errors(&r).is_empty());
}

#[test]
fn prototype_parameters_produce_type_lists() {
    let mut r = resolver();
    let params: ThinVec<ParsedParam> = thin_vec![
        ParsedParam::Typed {
            specs: specs(&["int"]),
            declarator: ParsedDeclarator::name(name("a")),
            span: sp(),
        },
        ParsedParam::Typed {
            specs: specs(&["char"]),
            declarator: ParsedDeclarator::pointer(ParsedDeclarator::name(name("b"))),
            span: sp(),
        },
        ParsedParam::VoidMarker,
    ];
    let declarator = ParsedDeclarator::function(params, ParsedDeclarator::name(name("f")));
    let d = r.start_decl(&declarator, &specs(&["int"]), false, sp());
    assert_eq!(type_of(&r, d), "function(int, pointer to char) returning int");
    assert!(errors(&r).is_empty());
}

#[test]
fn open_parameter_list_stays_variadic() {
    let mut r = resolver();
    let params: ThinVec<ParsedParam> = thin_vec![ParsedParam::Typed {
        specs: specs(&["int"]),
        declarator: ParsedDeclarator::name(name("a")),
        span: sp(),
    }];
    let declarator = ParsedDeclarator::function(params, ParsedDeclarator::name(name("f")));
    let d = r.start_decl(&declarator, &specs(&["int"]), false, sp());
    assert_eq!(type_of(&r, d), "function(int, ...) returning int");
}

#[test]
fn mixed_parameter_list_discards_types_but_keeps_names() {
    let mut r = resolver();
    let params: ThinVec<ParsedParam> = thin_vec![
        ParsedParam::Typed {
            specs: specs(&["int"]),
            declarator: ParsedDeclarator::name(name("a")),
            span: sp(),
        },
        ParsedParam::Name(name("b")),
    ];
    let declarator = ParsedDeclarator::function(params, ParsedDeclarator::name(name("f")));
    let d = r.start_decl(&declarator, &specs(&["int"]), false, sp());
    assert_eq!(type_of(&r, d), "function returning int");
    assert_eq!(
        errors(&r),
        vec!["types sometimes given and sometimes omitted in parameter list".to_string()]
    );
    // The name list survives for the function lifecycle.
    match &r.decls.get(d).kind {
        DeclKind::Func(data) => {
            let names: Vec<_> = data.parm_names.iter().map(|p| p.name).collect();
            assert_eq!(names, vec![Some(name("a")), Some(name("b"))]);
        }
        _ => panic!("not a function"),
    }
}

#[test]
fn open_array_settles_from_initializer_list() {
    let mut r = resolver();
    let mut backend = RecordingBackend::default();

    let d = r.start_decl(
        &ParsedDeclarator::array(None, ParsedDeclarator::name(name("a"))),
        &specs(&["int"]),
        true,
        sp(),
    );
    let items = (0..3).map(|i| lit(&mut r, i)).collect::<ThinVec<_>>();
    let init = r.ast.push_node(NodeKind::InitList(items), sp());
    r.finish_decl(d, Some(init), sp(), &mut backend);

    assert_eq!(type_of(&r, d), "array[3] of int");
    assert_eq!(backend.variables, vec!["var a: array[3] of int".to_string()]);
    assert!(errors(&r).is_empty());
}

#[test]
fn open_char_array_settles_from_string_initializer() {
    let mut r = resolver();
    let mut backend = NullBackend;

    let d = r.start_decl(
        &ParsedDeclarator::array(None, ParsedDeclarator::name(name("s"))),
        &specs(&["char"]),
        true,
        sp(),
    );
    // "ab" plus the terminating null.
    let init = r.ast.push_node(NodeKind::LiteralString { length: 3 }, sp());
    r.finish_decl(d, Some(init), sp(), &mut backend);
    assert_eq!(type_of(&r, d), "array[3] of char");
}

#[test]
fn missing_array_size_is_pedantic_only() {
    let mut r = pedantic_resolver();
    let mut backend = NullBackend;
    let d = r.start_decl(
        &ParsedDeclarator::array(None, ParsedDeclarator::name(name("a"))),
        &specs(&["int"]),
        false,
        sp(),
    );
    r.finish_decl(d, None, sp(), &mut backend);
    assert_eq!(errors(&r), vec!["size missing in array declaration".to_string()]);
    // Degraded to a one-element array so processing continues.
    assert_eq!(type_of(&r, d), "array[1] of int");
}

#[test]
fn non_constant_array_bound_defers_the_domain() {
    let mut r = resolver();
    let n = r.ast.push_node(NodeKind::Ident(name("n")), sp());
    let d = r.start_decl(
        &ParsedDeclarator::array(Some(n), ParsedDeclarator::name(name("a"))),
        &specs(&["int"]),
        false,
        sp(),
    );
    assert_eq!(type_of(&r, d), "array[*] of int");
}
