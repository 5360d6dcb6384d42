//! Integration tests for end-to-end compilation.
//!
//! These tests build translation units the way the external parser would,
//! then run them through merging, analysis and LLVM IR generation.

use classc::{
    analyze,
    ast::{
        ast::{ClassDecl, FunctionDecl, Member, Parameter, Program, UseDecl},
        expressions::{BinaryOp, Expr, UnaryOp},
        statements::{Stmt, VarDecl},
        types::{BaseType, TypeInfo},
    },
    compile_program,
    compiler::compiler::CompilerOptions,
    errors::errors::{Error, ErrorImpl},
    report_error,
};
use inkwell::context::Context;
use regex::Regex;

fn options() -> CompilerOptions {
    CompilerOptions {
        native_target: false,
        ..Default::default()
    }
}

fn entry_class(body: Vec<Stmt>) -> ClassDecl {
    ClassDecl::new(
        "Program",
        vec![Member::Method(FunctionDecl::entry(
            "Main",
            TypeInfo::named("i"),
            body,
        ))],
    )
}

fn unit(classes: Vec<ClassDecl>) -> Program {
    Program::new(classes)
}

fn compile_ir(units: Vec<Program>) -> String {
    let context = Context::create();
    let compiler = compile_program(units, &context, &options()).expect("program should compile");
    compiler.print_ir()
}

fn analysis_error(units: Vec<Program>) -> Error {
    analyze(units).expect_err("analysis should fail")
}

fn int_array(size: i64) -> TypeInfo {
    TypeInfo::array(BaseType::Int, Some(Expr::int(size)))
}

#[test]
fn test_compile_arithmetic_and_logic() {
    // return (1 + 2 * 3 - (4 / 2)) > 0 and (not false) or (10 < 20);
    let arithmetic = Expr::binary(
        Expr::binary(
            Expr::int(1),
            BinaryOp::Add,
            Expr::binary(Expr::int(2), BinaryOp::Multiply, Expr::int(3)),
        ),
        BinaryOp::Subtract,
        Expr::binary(Expr::int(4), BinaryOp::Divide, Expr::int(2)),
    );
    let condition = Expr::binary(
        Expr::binary(
            Expr::binary(arithmetic, BinaryOp::Greater, Expr::int(0)),
            BinaryOp::And,
            Expr::unary(UnaryOp::Not, Expr::bool(false)),
        ),
        BinaryOp::Or,
        Expr::binary(Expr::int(10), BinaryOp::Less, Expr::int(20)),
    );

    let program = ClassDecl::new(
        "Program",
        vec![Member::Method(FunctionDecl::entry(
            "Main",
            TypeInfo::named("b"),
            vec![Stmt::ret(Some(condition))],
        ))],
    );

    // func DoSomething(a: i, b: i): b { return (a + b) * 2 >= 10 or false; }
    let test = ClassDecl::new(
        "Test",
        vec![Member::Method(FunctionDecl::new(
            "DoSomething",
            TypeInfo::named("b"),
            vec![
                Parameter::new("a", TypeInfo::named("i")),
                Parameter::new("b", TypeInfo::named("i")),
            ],
            vec![Stmt::ret(Some(Expr::binary(
                Expr::binary(
                    Expr::binary(
                        Expr::binary(Expr::ident("a"), BinaryOp::Add, Expr::ident("b")),
                        BinaryOp::Multiply,
                        Expr::int(2),
                    ),
                    BinaryOp::GreaterEquals,
                    Expr::int(10),
                ),
                BinaryOp::Or,
                Expr::bool(false),
            )))],
        ))],
    );

    let ir = compile_ir(vec![unit(vec![program, test])]);

    assert!(Regex::new(r"define i32 @main\(\)").unwrap().is_match(&ir));
    assert!(Regex::new(r#"define i1 @"Test\.DoSomething"\(%Test\* %this, i64 %a, i64 %b\)"#)
        .unwrap()
        .is_match(&ir));
    // Constant operands in `main` fold away; the parameters in `DoSomething` do not
    assert!(ir.contains("mul i64"));
    assert!(ir.contains("icmp sge i64"));
    assert!(ir.contains("or i1"));
}

#[test]
fn test_logic_on_integers_is_rejected() {
    // return 1 + 2 * 3 - (4 / 2) and (not 0) or (10 < 20);
    let value = Expr::binary(
        Expr::binary(
            Expr::binary(
                Expr::binary(
                    Expr::int(1),
                    BinaryOp::Add,
                    Expr::binary(Expr::int(2), BinaryOp::Multiply, Expr::int(3)),
                ),
                BinaryOp::Subtract,
                Expr::binary(Expr::int(4), BinaryOp::Divide, Expr::int(2)),
            ),
            BinaryOp::And,
            Expr::unary(UnaryOp::Not, Expr::int(0)),
        ),
        BinaryOp::Or,
        Expr::binary(Expr::int(10), BinaryOp::Less, Expr::int(20)),
    );

    let error = analysis_error(vec![unit(vec![entry_class(vec![Stmt::ret(Some(value))])])]);
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_duplicate_field() {
    let class = ClassDecl::new(
        "C",
        vec![
            Member::Field(VarDecl::new("x", Some(TypeInfo::named("i")), None)),
            Member::Field(VarDecl::new("x", Some(TypeInfo::named("i")), None)),
        ],
    );

    let error = analysis_error(vec![unit(vec![entry_class(vec![]), class])]);
    assert_eq!(error.get_error_name(), "DuplicateDefinition");
    assert_eq!(error.get_impl().to_string(), "Field 'x' already defined in class 'C'.");
}

#[test]
fn test_duplicate_class_across_units() {
    let first = unit(vec![entry_class(vec![]), ClassDecl::new("Shape", vec![])]);
    let second = unit(vec![ClassDecl::new("Shape", vec![])]);

    let error = analysis_error(vec![first, second]);
    assert_eq!(
        *error.get_impl(),
        ErrorImpl::DuplicateDefinition {
            kind: String::from("Class"),
            name: String::from("Shape"),
            scope: String::from("the program"),
        }
    );
}

#[test]
fn test_classes_from_other_units_are_visible() {
    let shapes = unit(vec![ClassDecl::new(
        "Square",
        vec![
            Member::Field(VarDecl::new("side", Some(TypeInfo::named("i")), Some(Expr::int(4)))),
            Member::Method(FunctionDecl::new(
                "Area",
                TypeInfo::named("i"),
                vec![],
                vec![Stmt::ret(Some(Expr::binary(
                    Expr::ident("side"),
                    BinaryOp::Multiply,
                    Expr::ident("side"),
                )))],
            )),
        ],
    )]);
    let mut main = unit(vec![entry_class(vec![
        Stmt::declare("sq", None, Some(Expr::call("Square", vec![]))),
        Stmt::expr(Expr::call(
            "show",
            vec![Expr::method_call(Expr::ident("sq"), "Area", vec![])],
        )),
    ])]);
    main.uses.push(UseDecl::new("Square"));

    let ir = compile_ir(vec![main, shapes]);
    assert!(ir.contains(r#"call %Square* @"Square#new"()"#));
    assert!(ir.contains(r#"@"Square.Area"(%Square*"#));
}

#[test]
fn test_no_entry_point() {
    let class = ClassDecl::new(
        "Program",
        vec![Member::Method(FunctionDecl::new(
            "Main",
            TypeInfo::named("i"),
            vec![],
            vec![],
        ))],
    );

    let error = analysis_error(vec![unit(vec![class])]);
    assert_eq!(*error.get_impl(), ErrorImpl::NoEntryPoint);
    assert!(report_error(&error).starts_with("Error: NoEntryPoint"));
}

#[test]
fn test_multiple_entry_points() {
    let other = ClassDecl::new(
        "Other",
        vec![Member::Method(FunctionDecl::entry(
            "Start",
            TypeInfo::named("i"),
            vec![],
        ))],
    );

    let error = analysis_error(vec![unit(vec![entry_class(vec![])]), unit(vec![other])]);
    assert_eq!(error.get_error_name(), "MultipleEntryPoints");
}

#[test]
fn test_entry_class_with_field() {
    let class = ClassDecl::new(
        "Program",
        vec![
            Member::Field(VarDecl::new("count", Some(TypeInfo::named("i")), None)),
            Member::Method(FunctionDecl::entry("Main", TypeInfo::named("i"), vec![])),
        ],
    );

    let error = analysis_error(vec![unit(vec![class])]);
    assert_eq!(error.get_error_name(), "InvalidEntryShape");
}

#[test]
fn test_entry_class_with_other_method() {
    let class = ClassDecl::new(
        "Program",
        vec![
            Member::Method(FunctionDecl::entry("Main", TypeInfo::named("i"), vec![])),
            Member::Method(FunctionDecl::new("Helper", TypeInfo::named("void"), vec![], vec![])),
        ],
    );

    let error = analysis_error(vec![unit(vec![class])]);
    assert_eq!(error.get_error_name(), "InvalidEntryShape");
}

#[test]
fn test_array_index_must_be_int() {
    for index in [Expr::float(1.5), Expr::bool(true), Expr::string("1")] {
        let error = analysis_error(vec![unit(vec![entry_class(vec![
            Stmt::declare("arr", Some(int_array(3)), None),
            Stmt::expr(Expr::call(
                "show",
                vec![Expr::index(Expr::ident("arr"), index)],
            )),
        ])])]);

        match error.get_impl() {
            ErrorImpl::TypeMismatch { context, expected, .. } => {
                assert_eq!(context, "array index");
                assert_eq!(expected, "i");
            }
            other => panic!("expected a type mismatch, got {:?}", other),
        }
    }
}

#[test]
fn test_string_into_int() {
    let error = analysis_error(vec![unit(vec![entry_class(vec![Stmt::declare(
        "n",
        Some(TypeInfo::named("i")),
        Some(Expr::string("hello")),
    )])])]);

    match error.get_impl() {
        ErrorImpl::TypeMismatch {
            expected, received, ..
        } => {
            assert_eq!(expected, "i");
            assert_eq!(received, "s");
        }
        other => panic!("expected a type mismatch, got {:?}", other),
    }
}

#[test]
fn test_widening_is_one_way() {
    let widened = analyze(vec![unit(vec![entry_class(vec![Stmt::declare(
        "x",
        Some(TypeInfo::named("f")),
        Some(Expr::int(1)),
    )])])]);
    assert!(widened.is_ok());

    let error = analysis_error(vec![unit(vec![entry_class(vec![Stmt::declare(
        "x",
        Some(TypeInfo::named("i")),
        Some(Expr::float(1.0)),
    )])])]);
    assert_eq!(error.get_error_name(), "TypeMismatch");
}

#[test]
fn test_ask_and_show_string() {
    let ir = compile_ir(vec![unit(vec![entry_class(vec![
        Stmt::declare("name", Some(TypeInfo::named("s")), None),
        Stmt::expr(Expr::call("ask", vec![Expr::ident("name")])),
        Stmt::expr(Expr::call("show", vec![Expr::ident("name")])),
    ])])]);

    assert!(Regex::new(r"call i8\* @malloc\(i64 256\)").unwrap().is_match(&ir));
    assert!(Regex::new(r"store i8\* %input_buffer, i8\*\* %name")
        .unwrap()
        .is_match(&ir));
    assert!(Regex::new(r#"c"%s\\00""#).unwrap().is_match(&ir));
    assert!(Regex::new(r#"c"%s\\0A\\00""#).unwrap().is_match(&ir));
    assert!(Regex::new(r"call i32 \(i8\*, \.\.\.\) @scanf").unwrap().is_match(&ir));
    assert!(Regex::new(r"call i32 \(i8\*, \.\.\.\) @printf").unwrap().is_match(&ir));
}

#[test]
fn test_ask_numbers_reads_into_slot() {
    let ir = compile_ir(vec![unit(vec![entry_class(vec![
        Stmt::declare("count", Some(TypeInfo::named("i")), None),
        Stmt::declare("ratio", Some(TypeInfo::named("f")), None),
        Stmt::expr(Expr::call("ask", vec![Expr::ident("count")])),
        Stmt::expr(Expr::call("ask", vec![Expr::ident("ratio")])),
    ])])]);

    assert!(ir.contains(r#"c"%lld\00""#));
    assert!(ir.contains(r#"c"%lf\00""#));
    assert!(ir.contains("i64* %count"));
    assert!(ir.contains("double* %ratio"));
}

#[test]
fn test_constructor_allocates_struct_size() {
    let point = ClassDecl::new(
        "Point",
        vec![
            Member::Field(VarDecl::new("x", Some(TypeInfo::named("f")), None)),
            Member::Field(VarDecl::new("y", Some(TypeInfo::named("f")), Some(Expr::int(2)))),
        ],
    );
    let ir = compile_ir(vec![unit(vec![
        entry_class(vec![Stmt::declare("p", None, Some(Expr::call("Point", vec![])))]),
        point,
    ])]);

    assert!(ir.contains("%Point = type { double, double }"));
    assert!(ir.contains(r#"define %Point* @"Point#new"()"#));
    assert!(Regex::new(r"@malloc\(i64 ptrtoint \(%Point\* getelementptr")
        .unwrap()
        .is_match(&ir));
    assert!(ir.contains("store double 2.000000e+00"));
}

#[test]
fn test_array_length_is_stored() {
    let ir = compile_ir(vec![unit(vec![entry_class(vec![
        Stmt::declare("arr", Some(int_array(3)), None),
        Stmt::declare("items", None, Some(Expr::array(vec![Expr::int(1), Expr::int(2)]))),
        Stmt::expr(Expr::call(
            "show",
            vec![Expr::call("len", vec![Expr::ident("arr")])],
        )),
        Stmt::assign(Expr::index(Expr::ident("items"), Expr::int(0)), Expr::int(5)),
        Stmt::ret(Some(Expr::call("len", vec![Expr::ident("items")]))),
    ])])]);

    assert!(ir.contains("{ i64, i64* }"));
    assert!(ir.contains("store i64 3"));
    assert!(ir.contains("store i64 2"));
    assert!(ir.contains("fill.cond"));
    assert!(ir.contains("%len = load i64"));
}

#[test]
fn test_int_array_converts_to_float_array() {
    let ir = compile_ir(vec![unit(vec![entry_class(vec![
        Stmt::declare("whole", None, Some(Expr::array(vec![Expr::int(1), Expr::int(2)]))),
        Stmt::declare(
            "ratios",
            Some(TypeInfo::array(BaseType::Float, None)),
            Some(Expr::ident("whole")),
        ),
    ])])]);

    assert!(ir.contains("convert.body"));
    assert!(ir.contains("sitofp i64"));
}

#[test]
fn test_control_flow_blocks() {
    let ir = compile_ir(vec![unit(vec![entry_class(vec![
        Stmt::declare("total", Some(TypeInfo::named("i")), Some(Expr::int(0))),
        Stmt::looped(
            Some(Stmt::declare("i", Some(TypeInfo::named("i")), Some(Expr::int(0)))),
            Expr::binary(Expr::ident("i"), BinaryOp::Less, Expr::int(10)),
            Some(Stmt::assign(
                Expr::ident("i"),
                Expr::binary(Expr::ident("i"), BinaryOp::Add, Expr::int(1)),
            )),
            vec![Stmt::assign(
                Expr::ident("total"),
                Expr::binary(Expr::ident("total"), BinaryOp::Add, Expr::ident("i")),
            )],
        ),
        Stmt::repeat(
            Expr::binary(Expr::ident("total"), BinaryOp::Greater, Expr::int(100)),
            vec![Stmt::assign(
                Expr::ident("total"),
                Expr::binary(Expr::ident("total"), BinaryOp::Subtract, Expr::int(1)),
            )],
        ),
        Stmt::check(
            Expr::binary(Expr::ident("total"), BinaryOp::Equals, Expr::int(100)),
            vec![Stmt::ret(Some(Expr::int(1)))],
            Some(vec![Stmt::ret(Some(Expr::int(2)))]),
        ),
    ])])]);

    for label in ["forcond:", "forbody:", "forafter:", "cond:", "loop:", "afterloop:", "then:", "else:", "ifcont:"] {
        assert!(ir.contains(label), "missing block {}", label);
    }
    assert!(ir.contains("ret i32 1"));
    assert!(ir.contains("ret i32 2"));
}

#[test]
fn test_analysis_failure_emits_nothing() {
    let context = Context::create();
    let result = compile_program(
        vec![unit(vec![entry_class(vec![Stmt::expr(Expr::call(
            "missing",
            vec![],
        ))])])],
        &context,
        &options(),
    );

    let error = match result {
        Ok(_) => panic!("compilation should fail"),
        Err(error) => error,
    };
    assert_eq!(error.get_error_name(), "UndefinedSymbol");
}

#[test]
fn test_method_named_new_keeps_constructor() {
    let foo = ClassDecl::new(
        "Foo",
        vec![
            Member::Field(VarDecl::new("x", Some(TypeInfo::named("i")), None)),
            Member::Method(FunctionDecl::new(
                "new",
                TypeInfo::named("i"),
                vec![],
                vec![Stmt::ret(Some(Expr::int(7)))],
            )),
        ],
    );
    let ir = compile_ir(vec![unit(vec![
        entry_class(vec![
            Stmt::declare("f", Some(TypeInfo::named("Foo")), Some(Expr::call("Foo", vec![]))),
            Stmt::ret(Some(Expr::method_call(Expr::ident("f"), "new", vec![]))),
        ]),
        foo,
    ])]);

    assert!(ir.contains(r#"define %Foo* @"Foo#new"()"#));
    assert!(ir.contains(r#"define i64 @"Foo.new"(%Foo* %this)"#));
    assert!(!ir.contains("Foo.new.1"));
}

#[test]
fn test_any_holding_float_compares_by_bits() {
    let ir = compile_ir(vec![unit(vec![entry_class(vec![
        Stmt::declare("a", Some(TypeInfo::named("any")), Some(Expr::float(1.5))),
        Stmt::check(
            Expr::binary(Expr::ident("a"), BinaryOp::Equals, Expr::float(1.5)),
            vec![Stmt::ret(Some(Expr::int(1)))],
            None,
        ),
    ])])]);

    // 1.5 is 0x3FF8000000000000
    assert!(Regex::new(r"icmp eq i64 %\w+, 4609434218613702656")
        .unwrap()
        .is_match(&ir));
    assert!(!ir.contains("fptosi"));
}
