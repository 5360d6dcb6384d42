use lazy_static::lazy_static;
use std::{collections::HashMap, fmt::Display};

use crate::ast::types::Type;

lazy_static! {
    pub static ref BUILTIN_LOOKUP: HashMap<&'static str, Builtin> = {
        let mut map = HashMap::new();
        map.insert("len", Builtin::Len);
        map.insert("convertToInt", Builtin::ConvertToInt);
        map.insert("convertToFloat", Builtin::ConvertToFloat);
        map.insert("convertToBool", Builtin::ConvertToBool);
        map.insert("ask", Builtin::Ask);
        map.insert("show", Builtin::Show);
        map
    };
}

/// Functions every program can call without declaring them.
///
/// They are bound in the global scope, so no class may reuse their names.
/// Each takes exactly one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `len(array) -> i`
    Len,
    ConvertToInt,
    ConvertToFloat,
    ConvertToBool,
    /// `ask(variable)`, reads stdin into a variable
    Ask,
    /// `show(value)`, prints a value and a newline
    Show,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        BUILTIN_LOOKUP.get(name).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::ConvertToInt => "convertToInt",
            Builtin::ConvertToFloat => "convertToFloat",
            Builtin::ConvertToBool => "convertToBool",
            Builtin::Ask => "ask",
            Builtin::Show => "show",
        }
    }

    pub fn return_type(&self) -> Type {
        match self {
            Builtin::Len | Builtin::ConvertToInt => Type::int(),
            Builtin::ConvertToFloat => Type::float(),
            Builtin::ConvertToBool => Type::bool(),
            Builtin::Ask | Builtin::Show => Type::void(),
        }
    }

    pub fn arity(&self) -> usize {
        1
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
