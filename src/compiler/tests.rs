//! Unit tests for code generation.

use inkwell::{context::Context, types::BasicType};

use crate::{
    ast::{
        ast::{ClassDecl, FunctionDecl, Member, Parameter, Program},
        expressions::{BinaryOp, Expr},
        statements::{Stmt, VarDecl},
        types::{BaseType, Type, TypeInfo},
    },
    type_checker::type_checker::type_check,
};

use super::compiler::{compile, Compiler, CompilerOptions};

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

fn lower<'a>(context: &'a Context, classes: Vec<ClassDecl>) -> Compiler<'a> {
    let program = type_check(Program::new(classes)).expect("program should type check");
    compile(&program, context, &options()).expect("program should lower")
}

#[test]
fn test_convert_primitive_types() {
    let context = Context::create();
    let compiler = Compiler::new(&context, options());

    assert_eq!(
        compiler.convert_type(&Type::int()).unwrap(),
        context.i64_type().as_basic_type_enum()
    );
    assert_eq!(
        compiler.convert_type(&Type::float()).unwrap(),
        context.f64_type().as_basic_type_enum()
    );
    assert_eq!(
        compiler.convert_type(&Type::bool()).unwrap(),
        context.bool_type().as_basic_type_enum()
    );
    assert!(compiler.convert_type(&Type::string()).unwrap().is_pointer_type());
    assert!(compiler
        .convert_type(&Type::array_of(BaseType::Int))
        .unwrap()
        .is_pointer_type());
}

#[test]
fn test_void_has_no_representation() {
    let context = Context::create();
    let compiler = Compiler::new(&context, options());

    let error = compiler.convert_type(&Type::void()).unwrap_err();
    assert!(error.is_internal());
}

#[test]
fn test_unknown_class_is_internal_error() {
    let context = Context::create();
    let compiler = Compiler::new(&context, options());

    assert!(compiler.convert_type(&Type::class("Ghost")).is_err());
}

#[test]
fn test_zero_values() {
    let context = Context::create();
    let compiler = Compiler::new(&context, options());

    let zero = compiler.zero_value(&Type::int()).unwrap().into_int_value();
    assert_eq!(zero.get_zero_extended_constant(), Some(0));

    let null = compiler.zero_value(&Type::string()).unwrap().into_pointer_value();
    assert!(null.is_null());
}

#[test]
fn test_entry_method_becomes_main() {
    let context = Context::create();
    let compiler = lower(
        &context,
        vec![entry_class(vec![Stmt::ret(Some(Expr::int(7)))])],
    );

    let main = compiler.module.get_function("main").expect("main is defined");
    assert_eq!(main.count_params(), 0);
    assert_eq!(
        main.get_type().get_return_type(),
        Some(context.i32_type().as_basic_type_enum())
    );
    assert!(compiler.module.get_function("Program#new").is_some());
    assert!(compiler.module.get_function("Program.Main").is_none());
}

#[test]
fn test_method_takes_this_first() {
    let context = Context::create();
    let counter = ClassDecl::new(
        "Counter",
        vec![
            Member::Field(VarDecl::new("count", Some(TypeInfo::named("i")), None)),
            Member::Method(FunctionDecl::new(
                "Add",
                TypeInfo::named("i"),
                vec![Parameter::new("step", TypeInfo::named("i"))],
                vec![Stmt::ret(Some(Expr::binary(
                    Expr::ident("count"),
                    BinaryOp::Add,
                    Expr::ident("step"),
                )))],
            )),
        ],
    );
    let compiler = lower(&context, vec![entry_class(vec![]), counter]);

    let add = compiler.module.get_function("Counter.Add").expect("method is defined");
    assert_eq!(add.count_params(), 2);
    let this = add.get_nth_param(0).unwrap();
    assert!(this.is_pointer_value());
    assert_eq!(this.into_pointer_value().get_name().to_str(), Ok("this"));
}

#[test]
fn test_missing_return_yields_zero() {
    let context = Context::create();
    let compiler = lower(&context, vec![entry_class(vec![])]);

    let ir = compiler.print_ir();
    assert!(ir.contains("ret i32 0"));
}

#[test]
fn test_runtime_is_declared() {
    let context = Context::create();
    let compiler = lower(&context, vec![entry_class(vec![])]);

    for name in ["printf", "scanf", "malloc"] {
        assert!(
            compiler.module.get_function(name).is_some(),
            "{} should be declared",
            name
        );
    }
}

#[test]
fn test_show_picks_format_from_type() {
    let context = Context::create();
    let compiler = lower(
        &context,
        vec![entry_class(vec![
            Stmt::expr(Expr::call("show", vec![Expr::int(1)])),
            Stmt::expr(Expr::call("show", vec![Expr::float(1.5)])),
            Stmt::expr(Expr::call("show", vec![Expr::string("hi")])),
        ])],
    );

    let ir = compiler.print_ir();
    assert!(ir.contains("%lld\\0A"));
    assert!(ir.contains("%f\\0A"));
    assert!(ir.contains("%s\\0A"));
}

#[test]
fn test_int_widens_to_float_on_declaration() {
    let context = Context::create();
    let compiler = lower(
        &context,
        vec![entry_class(vec![Stmt::declare(
            "x",
            Some(TypeInfo::named("f")),
            Some(Expr::int(3)),
        )])],
    );

    assert!(compiler.print_ir().contains("sitofp"));
}

#[test]
fn test_locals_are_allocated_in_entry_block() {
    let context = Context::create();
    let compiler = lower(
        &context,
        vec![entry_class(vec![Stmt::repeat(
            Expr::bool(false),
            vec![Stmt::declare("x", None, Some(Expr::int(1)))],
        )])],
    );

    let main = compiler.module.get_function("main").unwrap();
    let entry = main.get_first_basic_block().unwrap();
    let first = entry.get_first_instruction().unwrap();
    assert_eq!(first.get_opcode(), inkwell::values::InstructionOpcode::Alloca);
}
