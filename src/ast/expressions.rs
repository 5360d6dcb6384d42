//! Expression nodes.

use std::{fmt::Display, str::FromStr};

use crate::Position;

/// Literal values. The external parser has already converted the source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Float(f64),
    Int(i64),
    String(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Equals,
    NotEquals,
    Less,
    Greater,
    LessEquals,
    GreaterEquals,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOp::Equals
                | BinaryOp::NotEquals
                | BinaryOp::Less
                | BinaryOp::Greater
                | BinaryOp::LessEquals
                | BinaryOp::GreaterEquals
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEquals => "<=",
            BinaryOp::GreaterEquals => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}

impl FromStr for BinaryOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(BinaryOp::And),
            "or" => Ok(BinaryOp::Or),
            "==" => Ok(BinaryOp::Equals),
            "!=" => Ok(BinaryOp::NotEquals),
            "<" => Ok(BinaryOp::Less),
            ">" => Ok(BinaryOp::Greater),
            "<=" => Ok(BinaryOp::LessEquals),
            ">=" => Ok(BinaryOp::GreaterEquals),
            "+" => Ok(BinaryOp::Add),
            "-" => Ok(BinaryOp::Subtract),
            "*" => Ok(BinaryOp::Multiply),
            "/" => Ok(BinaryOp::Divide),
            "%" => Ok(BinaryOp::Modulo),
            other => Err(format!("unknown binary operator `{}`", other)),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl FromStr for UnaryOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" => Ok(UnaryOp::Negate),
            "not" => Ok(UnaryOp::Not),
            other => Err(format!("unknown unary operator `{}`", other)),
        }
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Negate => write!(f, "-"),
            UnaryOp::Not => write!(f, "not"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    Literal(Literal),
    ArrayLiteral(Vec<Expr>),
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
    },
    /// `name(args)` or `receiver.name(args)`
    Call {
        receiver: Option<Box<Expr>>,
        name: String,
        arguments: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        target: Box<Expr>,
        member: String,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, position: Position) -> Self {
        Expr { kind, position }
    }

    pub fn ident(name: &str) -> Self {
        Expr::new(ExprKind::Identifier(name.to_string()), Position::null())
    }

    pub fn int(value: i64) -> Self {
        Expr::new(ExprKind::Literal(Literal::Int(value)), Position::null())
    }

    pub fn float(value: f64) -> Self {
        Expr::new(ExprKind::Literal(Literal::Float(value)), Position::null())
    }

    pub fn bool(value: bool) -> Self {
        Expr::new(ExprKind::Literal(Literal::Bool(value)), Position::null())
    }

    pub fn string(value: &str) -> Self {
        Expr::new(
            ExprKind::Literal(Literal::String(value.to_string())),
            Position::null(),
        )
    }

    pub fn null() -> Self {
        Expr::new(ExprKind::Literal(Literal::Null), Position::null())
    }

    pub fn array(elements: Vec<Expr>) -> Self {
        Expr::new(ExprKind::ArrayLiteral(elements), Position::null())
    }

    pub fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Self {
        Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            Position::null(),
        )
    }

    pub fn unary(operator: UnaryOp, operand: Expr) -> Self {
        Expr::new(
            ExprKind::Unary {
                operator,
                operand: Box::new(operand),
            },
            Position::null(),
        )
    }

    pub fn call(name: &str, arguments: Vec<Expr>) -> Self {
        Expr::new(
            ExprKind::Call {
                receiver: None,
                name: name.to_string(),
                arguments,
            },
            Position::null(),
        )
    }

    pub fn method_call(receiver: Expr, name: &str, arguments: Vec<Expr>) -> Self {
        Expr::new(
            ExprKind::Call {
                receiver: Some(Box::new(receiver)),
                name: name.to_string(),
                arguments,
            },
            Position::null(),
        )
    }

    pub fn index(target: Expr, index: Expr) -> Self {
        Expr::new(
            ExprKind::Index {
                target: Box::new(target),
                index: Box::new(index),
            },
            Position::null(),
        )
    }

    pub fn member(target: Expr, member: &str) -> Self {
        Expr::new(
            ExprKind::Member {
                target: Box::new(target),
                member: member.to_string(),
            },
            Position::null(),
        )
    }

    /// Replaces the position, for builders that know where the node came from.
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}
