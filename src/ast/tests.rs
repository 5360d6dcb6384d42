//! Unit tests for the AST data model.

use super::{
    ast::{ClassDecl, FunctionDecl, Member, Program, UseDecl},
    expressions::{BinaryOp, Expr, UnaryOp},
    statements::VarDecl,
    types::{BaseType, Type, TypeInfo},
};

#[test]
fn test_base_type_from_name() {
    assert_eq!(BaseType::from_name("i"), BaseType::Int);
    assert_eq!(BaseType::from_name("f"), BaseType::Float);
    assert_eq!(BaseType::from_name("b"), BaseType::Bool);
    assert_eq!(BaseType::from_name("s"), BaseType::String);
    assert_eq!(BaseType::from_name("void"), BaseType::Void);
    assert_eq!(
        BaseType::from_name("Point"),
        BaseType::Class(String::from("Point"))
    );
}

#[test]
fn test_type_display() {
    assert_eq!(Type::int().to_string(), "i");
    assert_eq!(Type::array_of(BaseType::Float).to_string(), "f[]");
    assert_eq!(Type::class("Node").nullable().to_string(), "Node?");
    assert_eq!(Type::null().to_string(), "null?");
}

#[test]
fn test_type_info_drops_size_when_resolved() {
    let info = TypeInfo::array(BaseType::Int, Some(Expr::int(3)));
    assert!(info.array_size.is_some());
    assert_eq!(info.as_type(), Type::array_of(BaseType::Int));
}

#[test]
fn test_element_type() {
    let array = Type::array_of(BaseType::String);
    assert_eq!(array.element(), Type::string());
}

#[test]
fn test_operator_parsing() {
    assert_eq!("and".parse::<BinaryOp>().unwrap(), BinaryOp::And);
    assert_eq!(">=".parse::<BinaryOp>().unwrap(), BinaryOp::GreaterEquals);
    assert_eq!("%".parse::<BinaryOp>().unwrap(), BinaryOp::Modulo);
    assert_eq!("not".parse::<UnaryOp>().unwrap(), UnaryOp::Not);
    assert!("**".parse::<BinaryOp>().is_err());
}

#[test]
fn test_operator_classes() {
    assert!(BinaryOp::Or.is_logical());
    assert!(BinaryOp::NotEquals.is_relational());
    assert!(BinaryOp::Modulo.is_arithmetic());
    assert!(!BinaryOp::Less.is_arithmetic());
}

#[test]
fn test_merge_keeps_class_order() {
    let first = Program {
        uses: vec![UseDecl::new("Helper")],
        classes: vec![ClassDecl::new("Program", vec![])],
    };
    let second = Program::new(vec![
        ClassDecl::new("Helper", vec![]),
        ClassDecl::new("Other", vec![]),
    ]);

    let merged = Program::merge(vec![first, second]);
    let names: Vec<&str> = merged.classes.iter().map(|c| c.name.as_str()).collect();

    assert_eq!(names, vec!["Program", "Helper", "Other"]);
    assert_eq!(merged.uses.len(), 1);
}

#[test]
fn test_class_member_iterators() {
    let class = ClassDecl::new(
        "Counter",
        vec![
            Member::Field(VarDecl::new("value", Some(TypeInfo::named("i")), None)),
            Member::Method(FunctionDecl::new("get", TypeInfo::named("i"), vec![], vec![])),
            Member::Field(VarDecl::new("step", None, None)),
        ],
    );

    assert_eq!(class.fields().count(), 2);
    assert_eq!(class.methods().count(), 1);
}
