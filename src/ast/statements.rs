//! Statement nodes.

use crate::Position;

use super::{expressions::Expr, types::TypeInfo};

/// `declare name: type = initializer;`
///
/// Used both for local variables and for class fields.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub var_type: Option<TypeInfo>,
    pub initializer: Option<Expr>,
    pub position: Position,
}

impl VarDecl {
    pub fn new(name: &str, var_type: Option<TypeInfo>, initializer: Option<Expr>) -> Self {
        VarDecl {
            name: name.to_string(),
            var_type,
            initializer,
            position: Position::null(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    VarDecl(VarDecl),
    /// `set target = value;`
    Assign { target: Expr, value: Expr },
    Return(Option<Expr>),
    /// `check (condition) { ... } otherwise { ... }`
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    /// Count controlled loop: `loop (init; condition; action) { ... }`
    Loop {
        init: Option<Box<Stmt>>,
        condition: Expr,
        action: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    /// Condition controlled loop: `repeat (condition) { ... }`
    Repeat { condition: Expr, body: Vec<Stmt> },
    /// A bare call or member access whose value is discarded
    Expression(Expr),
}

impl Stmt {
    pub fn new(kind: StmtKind, position: Position) -> Self {
        Stmt { kind, position }
    }

    pub fn declare(name: &str, var_type: Option<TypeInfo>, initializer: Option<Expr>) -> Self {
        Stmt::new(
            StmtKind::VarDecl(VarDecl::new(name, var_type, initializer)),
            Position::null(),
        )
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Stmt::new(StmtKind::Assign { target, value }, Position::null())
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::new(StmtKind::Return(value), Position::null())
    }

    pub fn check(condition: Expr, then_body: Vec<Stmt>, else_body: Option<Vec<Stmt>>) -> Self {
        Stmt::new(
            StmtKind::If {
                condition,
                then_body,
                else_body,
            },
            Position::null(),
        )
    }

    pub fn repeat(condition: Expr, body: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::Repeat { condition, body }, Position::null())
    }

    pub fn looped(init: Option<Stmt>, condition: Expr, action: Option<Stmt>, body: Vec<Stmt>) -> Self {
        Stmt::new(
            StmtKind::Loop {
                init: init.map(Box::new),
                condition,
                action: action.map(Box::new),
                body,
            },
            Position::null(),
        )
    }

    pub fn expr(expression: Expr) -> Self {
        let position = expression.position.clone();
        Stmt::new(StmtKind::Expression(expression), position)
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}
