//! Type annotations as they appear in the AST.
//!
//! A type annotation names a base type, optionally marked as an array or as
//! nullable. Array annotations may carry a size expression (`i[3]`) which is
//! evaluated at runtime when the variable is declared.
//!
//! [`Type`] is the semantic form used by the type checker and the code
//! generator; it is a [`TypeInfo`] without the size expression.

use std::fmt::Display;

use super::expressions::Expr;

/// The base of a type, before array or nullable modifiers are applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// `i`: 64-bit signed integer
    Int,
    /// `f`: double precision float
    Float,
    /// `b`: 1-bit boolean
    Bool,
    /// `s`: heap allocated, null terminated string
    String,
    Void,
    Any,
    /// Type of the `null` literal
    Null,
    /// Element type of an empty array literal
    Unknown,
    /// Pointer to an instance of a user class
    Class(String),
}

impl BaseType {
    /// Parses a base type name as written in source.
    ///
    /// Anything that is not a reserved name is treated as a class name; whether
    /// the class exists is checked later by the type checker.
    pub fn from_name(name: &str) -> Self {
        match name {
            "i" => BaseType::Int,
            "f" => BaseType::Float,
            "b" => BaseType::Bool,
            "s" => BaseType::String,
            "void" => BaseType::Void,
            "any" => BaseType::Any,
            "null" => BaseType::Null,
            "unknown" => BaseType::Unknown,
            class => BaseType::Class(class.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            BaseType::Int => "i",
            BaseType::Float => "f",
            BaseType::Bool => "b",
            BaseType::String => "s",
            BaseType::Void => "void",
            BaseType::Any => "any",
            BaseType::Null => "null",
            BaseType::Unknown => "unknown",
            BaseType::Class(name) => name,
        }
    }

    /// Widening rank of numeric types, `None` for everything else.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            BaseType::Int => Some(1),
            BaseType::Float => Some(2),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub base: BaseType,
    pub is_array: bool,
    pub is_nullable: bool,
}

impl Type {
    pub fn new(base: BaseType) -> Self {
        Type {
            base,
            is_array: false,
            is_nullable: false,
        }
    }

    pub fn array_of(base: BaseType) -> Self {
        Type {
            base,
            is_array: true,
            is_nullable: false,
        }
    }

    pub fn int() -> Self {
        Type::new(BaseType::Int)
    }

    pub fn float() -> Self {
        Type::new(BaseType::Float)
    }

    pub fn bool() -> Self {
        Type::new(BaseType::Bool)
    }

    pub fn string() -> Self {
        Type::new(BaseType::String)
    }

    pub fn void() -> Self {
        Type::new(BaseType::Void)
    }

    pub fn any() -> Self {
        Type::new(BaseType::Any)
    }

    pub fn null() -> Self {
        Type {
            base: BaseType::Null,
            is_array: false,
            is_nullable: true,
        }
    }

    pub fn class(name: &str) -> Self {
        Type::new(BaseType::Class(name.to_string()))
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// The type of a single element of this array type.
    pub fn element(&self) -> Type {
        Type {
            base: self.base.clone(),
            is_array: false,
            is_nullable: self.is_nullable,
        }
    }

    pub fn is_void(&self) -> bool {
        !self.is_array && self.base == BaseType::Void
    }

    pub fn is_bool(&self) -> bool {
        !self.is_array && self.base == BaseType::Bool
    }

    pub fn is_int(&self) -> bool {
        !self.is_array && self.base == BaseType::Int
    }

    pub fn is_numeric(&self) -> bool {
        !self.is_array && self.base.is_numeric()
    }

    /// Name of the class this type points to, if it is a (non-array) class type.
    pub fn class_name(&self) -> Option<&str> {
        match &self.base {
            BaseType::Class(name) if !self.is_array => Some(name),
            _ => None,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base.name())?;
        if self.is_array {
            write!(f, "[]")?;
        }
        if self.is_nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// A type annotation as written in source.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub base_name: BaseType,
    pub is_array: bool,
    pub is_nullable: bool,
    /// Element count for `T[n]` declarations
    pub array_size: Option<Box<Expr>>,
}

impl TypeInfo {
    pub fn new(base_name: BaseType) -> Self {
        TypeInfo {
            base_name,
            is_array: false,
            is_nullable: false,
            array_size: None,
        }
    }

    pub fn named(name: &str) -> Self {
        TypeInfo::new(BaseType::from_name(name))
    }

    pub fn array(base_name: BaseType, size: Option<Expr>) -> Self {
        TypeInfo {
            base_name,
            is_array: true,
            is_nullable: false,
            array_size: size.map(Box::new),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn as_type(&self) -> Type {
        Type {
            base: self.base_name.clone(),
            is_array: self.is_array,
            is_nullable: self.is_nullable,
        }
    }
}

impl From<Type> for TypeInfo {
    fn from(ty: Type) -> Self {
        TypeInfo {
            base_name: ty.base,
            is_array: ty.is_array,
            is_nullable: ty.is_nullable,
            array_size: None,
        }
    }
}
