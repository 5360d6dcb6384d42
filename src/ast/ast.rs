use crate::Position;

use super::{statements::{Stmt, VarDecl}, types::TypeInfo};

/// A whole program, or a single translation unit before merging.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub uses: Vec<UseDecl>,
    pub classes: Vec<ClassDecl>,
}

impl Program {
    pub fn new(classes: Vec<ClassDecl>) -> Self {
        Program {
            uses: vec![],
            classes,
        }
    }

    /// Merges the translation units into a single program.
    ///
    /// Classes keep their order, file by file. No name checking happens here;
    /// a collision between files is reported by the type checker exactly like a
    /// collision within one file.
    pub fn merge(units: impl IntoIterator<Item = Program>) -> Program {
        let mut merged = Program::default();
        for unit in units {
            merged.uses.extend(unit.uses);
            merged.classes.extend(unit.classes);
        }
        merged
    }
}

/// `use ClassName;`
#[derive(Debug, Clone, PartialEq)]
pub struct UseDecl {
    pub class_name: String,
    pub position: Position,
}

impl UseDecl {
    pub fn new(class_name: &str) -> Self {
        UseDecl {
            class_name: class_name.to_string(),
            position: Position::null(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub members: Vec<Member>,
    pub position: Position,
}

impl ClassDecl {
    pub fn new(name: &str, members: Vec<Member>) -> Self {
        ClassDecl {
            name: name.to_string(),
            members,
            position: Position::null(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &VarDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Field(field) => Some(field),
            Member::Method(_) => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            Member::Field(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(VarDecl),
    Method(FunctionDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub param_type: TypeInfo,
    pub position: Position,
}

impl Parameter {
    pub fn new(name: &str, param_type: TypeInfo) -> Self {
        Parameter {
            name: name.to_string(),
            param_type,
            position: Position::null(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: TypeInfo,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Stmt>,
    /// Marks the process entry point
    pub is_entry: bool,
    pub position: Position,
}

impl FunctionDecl {
    pub fn new(name: &str, return_type: TypeInfo, parameters: Vec<Parameter>, body: Vec<Stmt>) -> Self {
        FunctionDecl {
            name: name.to_string(),
            return_type,
            parameters,
            body,
            is_entry: false,
            position: Position::null(),
        }
    }

    pub fn entry(name: &str, return_type: TypeInfo, body: Vec<Stmt>) -> Self {
        FunctionDecl {
            is_entry: true,
            ..FunctionDecl::new(name, return_type, vec![], body)
        }
    }
}
