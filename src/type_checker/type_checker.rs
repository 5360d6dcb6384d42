use std::time::Instant;

use crate::{
    ast::{
        ast::{ClassDecl, FunctionDecl, Member, Program},
        expressions::{Expr, ExprKind, Literal, UnaryOp},
        statements::{Stmt, StmtKind, VarDecl},
        types::{BaseType, Type, TypeInfo},
    },
    errors::errors::{Error, ErrorImpl},
    Position, MK_ERROR, MK_TYPE_MISMATCH,
};

use super::{
    builtins::{Builtin, BUILTIN_LOOKUP},
    symbol_table::{
        ClassId, FunctionSymbol, ScopeId, Symbol, SymbolTable, VariableKind, VariableSymbol,
    },
    typed_ast::{
        Callee, TypedClass, TypedExpr, TypedExprKind, TypedField, TypedFunction, TypedProgram,
        TypedStmt, Warning,
    },
};

#[derive(Debug)]
pub struct TypeChecker {
    pub symbols: SymbolTable,
    /// First method flagged as the entry point
    pub entry: Option<(ClassId, usize)>,
    pub warnings: Vec<Warning>,
}

/// Where analysis currently is. Handed down through every check instead of
/// being kept as mutable state on the checker.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext {
    pub class: ClassId,
    /// Index of the method being analyzed, `None` for field initializers
    pub function: Option<usize>,
    pub scope: ScopeId,
}

impl TypeChecker {
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        let global = symbols.global();
        for (name, builtin) in BUILTIN_LOOKUP.iter() {
            // The table starts empty, built-in names are unique
            let _ = symbols.declare(global, name, Symbol::Builtin(*builtin));
        }

        TypeChecker {
            symbols,
            entry: None,
            warnings: vec![],
        }
    }

    fn current_function(&self, ctx: &AnalysisContext) -> Result<&FunctionSymbol, Error> {
        match ctx.function {
            Some(index) => Ok(self.symbols.method(ctx.class, index)),
            None => Err(Error::internal("statement analyzed outside of a method")),
        }
    }

    fn function_name(&self, function: &FunctionSymbol) -> String {
        format!("{}.{}", self.symbols.class(function.class).name, function.name)
    }

    fn scope_name(&self, ctx: &AnalysisContext) -> String {
        match ctx.function {
            Some(index) => format!(
                "method '{}'",
                self.function_name(self.symbols.method(ctx.class, index))
            ),
            None => format!("class '{}'", self.symbols.class(ctx.class).name),
        }
    }

    /// Turns a written type annotation into a type, checking that any class it
    /// names exists.
    pub fn resolve_type(&self, info: &TypeInfo, position: &Position) -> Result<Type, Error> {
        if let BaseType::Class(name) = &info.base_name {
            if self.symbols.find_class(name).is_none() {
                return MK_ERROR!(
                    ErrorImpl::UndefinedSymbol {
                        symbol: name.clone()
                    },
                    position
                );
            }
        }
        Ok(info.as_type())
    }
}

/// Whether a value of type `source` can be stored where `target` is expected.
///
/// Not symmetric: `i` fits into `f` but not the other way around.
pub fn compatible(target: &Type, source: &Type) -> bool {
    if source.base == BaseType::Null {
        return target.is_nullable;
    }

    if target.is_array != source.is_array {
        return false;
    }

    if target.base == source.base {
        return true;
    }

    if let (Some(target_rank), Some(source_rank)) =
        (target.base.numeric_rank(), source.base.numeric_rank())
    {
        return source_rank <= target_rank;
    }

    target.base == BaseType::Any
}

fn either_compatible(left: &Type, right: &Type) -> bool {
    compatible(left, right) || compatible(right, left)
}

fn variable_expr(
    type_checker: &TypeChecker,
    ctx: &AnalysisContext,
    variable: &VariableSymbol,
    position: &Position,
) -> Result<TypedExpr, Error> {
    let kind = match variable.kind {
        VariableKind::Local | VariableKind::Parameter => TypedExprKind::Local(variable.name.clone()),
        VariableKind::Field => {
            let class = type_checker.symbols.class(ctx.class);
            let index = class
                .fields
                .iter()
                .position(|field| field.name == variable.name)
                .ok_or_else(|| {
                    Error::internal(format!(
                        "field '{}' is missing from class '{}'",
                        variable.name, class.name
                    ))
                })? as u32;
            TypedExprKind::Field {
                class: class.name.clone(),
                field: variable.name.clone(),
                index,
            }
        }
    };

    Ok(TypedExpr::new(kind, variable.var_type.clone(), position.clone()))
}

pub fn type_check_expr(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    expr: &Expr,
) -> Result<TypedExpr, Error> {
    let position = &expr.position;

    match &expr.kind {
        ExprKind::Identifier(name) => match type_checker.symbols.lookup(ctx.scope, name) {
            Some(Symbol::Variable(variable)) => {
                let variable = variable.clone();
                variable_expr(type_checker, ctx, &variable, position)
            }
            Some(Symbol::Class(_)) => Ok(TypedExpr::new(
                TypedExprKind::ClassRef(name.clone()),
                Type::class(name),
                position.clone(),
            )),
            _ => MK_ERROR!(
                ErrorImpl::UndefinedSymbol {
                    symbol: name.clone()
                },
                position
            ),
        },
        ExprKind::Literal(literal) => {
            let ty = match literal {
                Literal::Bool(_) => Type::bool(),
                Literal::Float(_) => Type::float(),
                Literal::Int(_) => Type::int(),
                Literal::String(_) => Type::string(),
                Literal::Null => Type::null(),
            };
            Ok(TypedExpr::new(
                TypedExprKind::Literal(literal.clone()),
                ty,
                position.clone(),
            ))
        }
        ExprKind::ArrayLiteral(elements) => type_check_array_literal(type_checker, ctx, elements, position),
        ExprKind::Binary {
            left,
            operator,
            right,
        } => {
            let left = type_check_value(type_checker, ctx, left)?;
            let right = type_check_value(type_checker, ctx, right)?;
            let context = format!("operands of '{}'", operator);

            let ty = if operator.is_logical() {
                if !left.ty.is_bool() {
                    return MK_TYPE_MISMATCH!(context, Type::bool(), left.ty, left.position);
                }
                if !right.ty.is_bool() {
                    return MK_TYPE_MISMATCH!(context, Type::bool(), right.ty, right.position);
                }
                Type::bool()
            } else if operator.is_relational() {
                if !either_compatible(&left.ty, &right.ty) {
                    return MK_TYPE_MISMATCH!(context, left.ty, right.ty, right.position);
                }
                Type::bool()
            } else {
                if !left.ty.is_numeric() {
                    return MK_TYPE_MISMATCH!(context, "numeric", left.ty, left.position);
                }
                if !right.ty.is_numeric() {
                    return MK_TYPE_MISMATCH!(context, "numeric", right.ty, right.position);
                }
                if left.ty.base == BaseType::Float || right.ty.base == BaseType::Float {
                    Type::float()
                } else {
                    Type::int()
                }
            };

            Ok(TypedExpr::new(
                TypedExprKind::Binary {
                    left: Box::new(left),
                    operator: *operator,
                    right: Box::new(right),
                },
                ty,
                position.clone(),
            ))
        }
        ExprKind::Unary { operator, operand } => {
            let operand = type_check_value(type_checker, ctx, operand)?;
            let context = format!("operand of '{}'", operator);

            let ty = match operator {
                UnaryOp::Negate => {
                    if !operand.ty.is_numeric() {
                        return MK_TYPE_MISMATCH!(context, "numeric", operand.ty, operand.position);
                    }
                    Type::new(operand.ty.base.clone())
                }
                UnaryOp::Not => {
                    if !operand.ty.is_bool() {
                        return MK_TYPE_MISMATCH!(context, Type::bool(), operand.ty, operand.position);
                    }
                    Type::bool()
                }
            };

            Ok(TypedExpr::new(
                TypedExprKind::Unary {
                    operator: *operator,
                    operand: Box::new(operand),
                },
                ty,
                position.clone(),
            ))
        }
        ExprKind::Call {
            receiver,
            name,
            arguments,
        } => type_check_call(type_checker, ctx, receiver.as_deref(), name, arguments, position),
        ExprKind::Index { target, index } => {
            let (target, index) = type_check_element(type_checker, ctx, target, index)?;
            let ty = target.ty.element();

            Ok(TypedExpr::new(
                TypedExprKind::Index {
                    target: Box::new(target),
                    index: Box::new(index),
                },
                ty,
                position.clone(),
            ))
        }
        ExprKind::Member { target, member } => {
            let target = type_check_value(type_checker, ctx, target)?;
            let undefined = ErrorImpl::UndefinedMember {
                type_: target.ty.to_string(),
                member: member.clone(),
            };

            let Some(class_id) = target
                .ty
                .class_name()
                .and_then(|name| type_checker.symbols.find_class(name))
            else {
                return MK_ERROR!(undefined, position);
            };
            let class = type_checker.symbols.class(class_id);

            if let Some(index) = class.fields.iter().position(|field| &field.name == member) {
                let field = &class.fields[index];
                return Ok(TypedExpr::new(
                    TypedExprKind::Member {
                        class: class.name.clone(),
                        field: field.name.clone(),
                        index: index as u32,
                        target: Box::new(target),
                    },
                    field.var_type.clone(),
                    position.clone(),
                ));
            }

            // A method named without parentheses is called with no arguments
            match class.get_method(member) {
                Some(method) => {
                    if !method.parameters.is_empty() {
                        return MK_ERROR!(
                            ErrorImpl::ArityMismatch {
                                function: format!("{}.{}", class.name, method.name),
                                expected: method.parameters.len(),
                                received: 0,
                            },
                            position
                        );
                    }

                    Ok(TypedExpr::new(
                        TypedExprKind::Call {
                            callee: Callee::Method {
                                class: class.name.clone(),
                                name: method.name.clone(),
                                receiver: Some(Box::new(target)),
                            },
                            arguments: vec![],
                        },
                        method.return_type.clone(),
                        position.clone(),
                    ))
                }
                None => MK_ERROR!(undefined, position),
            }
        }
    }
}

/// Checks an expression whose result is used, so it cannot be `void`.
pub fn type_check_value(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    expr: &Expr,
) -> Result<TypedExpr, Error> {
    let typed = type_check_expr(type_checker, ctx, expr)?;
    if typed.ty.is_void() {
        return MK_TYPE_MISMATCH!("value", "a value", typed.ty, typed.position);
    }
    Ok(typed)
}

fn type_check_array_literal(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    elements: &[Expr],
    position: &Position,
) -> Result<TypedExpr, Error> {
    let mut typed = Vec::with_capacity(elements.len());
    for element in elements {
        let element = type_check_value(type_checker, ctx, element)?;
        if element.ty.is_array {
            return MK_TYPE_MISMATCH!("array literal element", "a scalar", element.ty, element.position);
        }
        if let Some(previous) = typed
            .iter()
            .find(|previous: &&TypedExpr| !either_compatible(&previous.ty, &element.ty))
        {
            return MK_TYPE_MISMATCH!("array literal element", previous.ty, element.ty, element.position);
        }
        typed.push(element);
    }

    let widest_numeric = typed
        .iter()
        .filter(|element| element.ty.is_numeric())
        .max_by_key(|element| element.ty.base.numeric_rank())
        .map(|element| element.ty.base.clone());
    let first_non_null = typed
        .iter()
        .find(|element| element.ty.base != BaseType::Null)
        .map(|element| element.ty.base.clone());

    let base = match (widest_numeric, first_non_null, typed.is_empty()) {
        (_, _, true) => BaseType::Unknown,
        (Some(numeric), _, _) => numeric,
        (None, Some(base), _) => base,
        (None, None, _) => BaseType::Null,
    };
    let is_nullable = typed.iter().any(|element| element.ty.is_nullable);

    Ok(TypedExpr::new(
        TypedExprKind::ArrayLiteral(typed),
        Type {
            base,
            is_array: true,
            is_nullable,
        },
        position.clone(),
    ))
}

/// Checks the two halves of `target[index]`.
fn type_check_element(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    target: &Expr,
    index: &Expr,
) -> Result<(TypedExpr, TypedExpr), Error> {
    let target = type_check_value(type_checker, ctx, target)?;
    if !target.ty.is_array {
        return MK_TYPE_MISMATCH!("indexed value", "an array", target.ty, target.position);
    }

    let index = type_check_value(type_checker, ctx, index)?;
    if !index.ty.is_int() {
        return MK_TYPE_MISMATCH!("array index", Type::int(), index.ty, index.position);
    }

    Ok((target, index))
}

fn type_check_call(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    receiver: Option<&Expr>,
    name: &str,
    arguments: &[Expr],
    position: &Position,
) -> Result<TypedExpr, Error> {
    let Some(receiver) = receiver else {
        let symbol = type_checker.symbols.lookup(ctx.scope, name).cloned();
        return match symbol {
            Some(Symbol::Builtin(builtin)) => {
                type_check_builtin(type_checker, ctx, builtin, arguments, position)
            }
            Some(Symbol::Class(_)) => {
                if !arguments.is_empty() {
                    return MK_ERROR!(
                        ErrorImpl::ArityMismatch {
                            function: name.to_string(),
                            expected: 0,
                            received: arguments.len(),
                        },
                        position
                    );
                }
                Ok(TypedExpr::new(
                    TypedExprKind::Call {
                        callee: Callee::Constructor(name.to_string()),
                        arguments: vec![],
                    },
                    Type::class(name),
                    position.clone(),
                ))
            }
            Some(Symbol::Method(class, index)) => {
                let method = type_checker.symbols.method(class, index).clone();
                type_check_method_call(type_checker, ctx, &method, None, arguments, position)
            }
            Some(Symbol::Variable(_)) | None => MK_ERROR!(
                ErrorImpl::UndefinedSymbol {
                    symbol: name.to_string()
                },
                position
            ),
        };
    };

    let receiver = type_check_value(type_checker, ctx, receiver)?;
    let method = receiver
        .ty
        .class_name()
        .and_then(|class| type_checker.symbols.find_class(class))
        .and_then(|class| type_checker.symbols.class(class).get_method(name))
        .cloned();

    match method {
        Some(method) => type_check_method_call(
            type_checker,
            ctx,
            &method,
            Some(receiver),
            arguments,
            position,
        ),
        None => MK_ERROR!(
            ErrorImpl::UndefinedMember {
                type_: receiver.ty.to_string(),
                member: name.to_string(),
            },
            position
        ),
    }
}

fn type_check_method_call(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    method: &FunctionSymbol,
    receiver: Option<TypedExpr>,
    arguments: &[Expr],
    position: &Position,
) -> Result<TypedExpr, Error> {
    let function = type_checker.function_name(method);

    if arguments.len() != method.parameters.len() {
        return MK_ERROR!(
            ErrorImpl::ArityMismatch {
                function,
                expected: method.parameters.len(),
                received: arguments.len(),
            },
            position
        );
    }

    let mut typed_arguments = Vec::with_capacity(arguments.len());
    for (number, (argument, parameter)) in arguments.iter().zip(&method.parameters).enumerate() {
        let argument = type_check_value(type_checker, ctx, argument)?;
        if !compatible(&parameter.var_type, &argument.ty) {
            return MK_TYPE_MISMATCH!(
                format!("argument {} of '{}'", number + 1, function),
                parameter.var_type,
                argument.ty,
                argument.position
            );
        }
        typed_arguments.push(argument);
    }

    Ok(TypedExpr::new(
        TypedExprKind::Call {
            callee: Callee::Method {
                class: type_checker.symbols.class(method.class).name.clone(),
                name: method.name.clone(),
                receiver: receiver.map(Box::new),
            },
            arguments: typed_arguments,
        },
        method.return_type.clone(),
        position.clone(),
    ))
}

fn type_check_builtin(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    builtin: Builtin,
    arguments: &[Expr],
    position: &Position,
) -> Result<TypedExpr, Error> {
    if arguments.len() != builtin.arity() {
        return MK_ERROR!(
            ErrorImpl::ArityMismatch {
                function: builtin.name().to_string(),
                expected: builtin.arity(),
                received: arguments.len(),
            },
            position
        );
    }

    let context = format!("argument of '{}'", builtin);
    let argument = match builtin {
        Builtin::Len => {
            let argument = type_check_value(type_checker, ctx, &arguments[0])?;
            if !argument.ty.is_array {
                return MK_TYPE_MISMATCH!(context, "an array", argument.ty, argument.position);
            }
            argument
        }
        Builtin::ConvertToInt | Builtin::ConvertToFloat | Builtin::ConvertToBool => {
            let argument = type_check_value(type_checker, ctx, &arguments[0])?;
            if argument.ty.is_array
                || !matches!(
                    argument.ty.base,
                    BaseType::Int | BaseType::Float | BaseType::Bool
                )
            {
                return MK_TYPE_MISMATCH!(context, "i, f or b", argument.ty, argument.position);
            }
            argument
        }
        Builtin::Show => type_check_value(type_checker, ctx, &arguments[0])?,
        Builtin::Ask => {
            let argument = type_check_value(type_checker, ctx, &arguments[0])?;
            if !argument.is_variable() {
                return MK_TYPE_MISMATCH!(context, "a variable", argument.ty, argument.position);
            }
            if argument.ty.is_array
                || !matches!(
                    argument.ty.base,
                    BaseType::Int | BaseType::Float | BaseType::String
                )
            {
                return MK_TYPE_MISMATCH!(context, "i, f or s", argument.ty, argument.position);
            }
            argument
        }
    };

    Ok(TypedExpr::new(
        TypedExprKind::Call {
            callee: Callee::Builtin(builtin),
            arguments: vec![argument],
        },
        builtin.return_type(),
        position.clone(),
    ))
}

/// Resolves the left hand side of `set target = value;`.
fn type_check_target(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    target: &Expr,
) -> Result<TypedExpr, Error> {
    let position = &target.position;

    match &target.kind {
        ExprKind::Identifier(name) => match type_checker.symbols.lookup(ctx.scope, name) {
            Some(Symbol::Variable(variable)) => {
                let variable = variable.clone();
                variable_expr(type_checker, ctx, &variable, position)
            }
            _ => MK_ERROR!(
                ErrorImpl::UndefinedSymbol {
                    symbol: name.clone()
                },
                position
            ),
        },
        ExprKind::Index { target, index } => {
            let (target, index) = type_check_element(type_checker, ctx, target, index)?;
            let ty = target.ty.element();
            Ok(TypedExpr::new(
                TypedExprKind::Index {
                    target: Box::new(target),
                    index: Box::new(index),
                },
                ty,
                position.clone(),
            ))
        }
        ExprKind::Member { target, member } => {
            let target = type_check_value(type_checker, ctx, target)?;
            let Some(class_name) = target.ty.class_name().map(String::from) else {
                return MK_TYPE_MISMATCH!("assignment target", "a class instance", target.ty, target.position);
            };

            let field = type_checker
                .symbols
                .find_class(&class_name)
                .map(|class| type_checker.symbols.class(class))
                .and_then(|class| {
                    class
                        .fields
                        .iter()
                        .position(|field| &field.name == member)
                        .map(|index| (index, class.fields[index].var_type.clone()))
                });

            match field {
                Some((index, ty)) => Ok(TypedExpr::new(
                    TypedExprKind::Member {
                        target: Box::new(target),
                        class: class_name,
                        field: member.clone(),
                        index: index as u32,
                    },
                    ty,
                    position.clone(),
                )),
                None => MK_ERROR!(
                    ErrorImpl::UndefinedSymbol {
                        symbol: format!("{}.{}", class_name, member)
                    },
                    position
                ),
            }
        }
        _ => MK_TYPE_MISMATCH!(
            "assignment target",
            "a variable, element or field",
            "expression",
            position
        ),
    }
}

fn type_check_var_decl(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    declaration: &VarDecl,
) -> Result<TypedStmt, Error> {
    let position = &declaration.position;

    if type_checker
        .symbols
        .lookup_local(ctx.scope, &declaration.name)
        .is_some()
    {
        return MK_ERROR!(
            ErrorImpl::DuplicateDefinition {
                kind: String::from("Variable"),
                name: declaration.name.clone(),
                scope: type_checker.scope_name(ctx),
            },
            position
        );
    }

    let declared = match &declaration.var_type {
        Some(info) => Some(type_checker.resolve_type(info, position)?),
        None => None,
    };
    let size = type_check_array_size(type_checker, ctx, declaration.var_type.as_ref())?;
    let value = match &declaration.initializer {
        Some(initializer) => Some(type_check_value(type_checker, ctx, initializer)?),
        None => None,
    };

    let var_type = match (declared, &value) {
        (Some(declared), Some(value)) => {
            if !compatible(&declared, &value.ty) {
                return MK_TYPE_MISMATCH!(
                    format!("initializer of '{}'", declaration.name),
                    declared,
                    value.ty,
                    value.position
                );
            }
            declared
        }
        (Some(declared), None) => declared,
        (None, Some(value)) => value.ty.clone(),
        (None, None) => Type::any(),
    };

    let variable = VariableSymbol {
        name: declaration.name.clone(),
        var_type: var_type.clone(),
        kind: VariableKind::Local,
        position: position.clone(),
    };
    if type_checker
        .symbols
        .declare(ctx.scope, &declaration.name, Symbol::Variable(variable))
        .is_err()
    {
        return Err(Error::internal(format!(
            "could not declare '{}'",
            declaration.name
        )));
    }

    Ok(TypedStmt::VarDecl {
        name: declaration.name.clone(),
        var_type,
        size,
        value,
    })
}

fn type_check_array_size(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    info: Option<&TypeInfo>,
) -> Result<Option<TypedExpr>, Error> {
    let Some(size) = info.and_then(|info| info.array_size.as_deref()) else {
        return Ok(None);
    };

    let size = type_check_value(type_checker, ctx, size)?;
    if !size.ty.is_int() {
        return MK_TYPE_MISMATCH!("array size", Type::int(), size.ty, size.position);
    }
    Ok(Some(size))
}

fn type_check_condition(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    condition: &Expr,
    statement: &str,
) -> Result<TypedExpr, Error> {
    let condition = type_check_value(type_checker, ctx, condition)?;
    if !condition.ty.is_bool() {
        return MK_TYPE_MISMATCH!(
            format!("condition of '{}'", statement),
            Type::bool(),
            condition.ty,
            condition.position
        );
    }
    Ok(condition)
}

pub fn type_check_stmt(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    stmt: &Stmt,
) -> Result<TypedStmt, Error> {
    match &stmt.kind {
        StmtKind::VarDecl(declaration) => type_check_var_decl(type_checker, ctx, declaration),
        StmtKind::Assign { target, value } => {
            let target = type_check_target(type_checker, ctx, target)?;
            let value = type_check_value(type_checker, ctx, value)?;

            if !compatible(&target.ty, &value.ty) {
                return MK_TYPE_MISMATCH!("assignment", target.ty, value.ty, value.position);
            }

            Ok(TypedStmt::Assign { target, value })
        }
        StmtKind::Return(value) => {
            let function = type_checker.current_function(ctx)?;
            let function_name = type_checker.function_name(function);
            let return_type = function.return_type.clone();

            match value {
                Some(value) => {
                    let value = type_check_value(type_checker, ctx, value)?;
                    if !compatible(&return_type, &value.ty) {
                        return MK_TYPE_MISMATCH!(
                            format!("return value of '{}'", function_name),
                            return_type,
                            value.ty,
                            value.position
                        );
                    }
                    Ok(TypedStmt::Return(Some(value)))
                }
                None => {
                    if !return_type.is_void()
                        && !return_type.is_nullable
                        && return_type.base != BaseType::Any
                    {
                        let warning = Warning {
                            message: format!(
                                "'{}' returns '{}' but this return has no value",
                                function_name, return_type
                            ),
                            position: stmt.position.clone(),
                        };
                        tracing::warn!(%warning, "return without value");
                        type_checker.warnings.push(warning);
                    }
                    Ok(TypedStmt::Return(None))
                }
            }
        }
        StmtKind::If {
            condition,
            then_body,
            else_body,
        } => Ok(TypedStmt::If {
            condition: type_check_condition(type_checker, ctx, condition, "check")?,
            then_body: type_check_block(type_checker, ctx, then_body)?,
            else_body: match else_body {
                Some(body) => Some(type_check_block(type_checker, ctx, body)?),
                None => None,
            },
        }),
        StmtKind::Loop {
            init,
            condition,
            action,
            body,
        } => {
            let init = match init {
                Some(init) => Some(Box::new(type_check_stmt(type_checker, ctx, init)?)),
                None => None,
            };
            let condition = type_check_condition(type_checker, ctx, condition, "loop")?;
            // The action runs after the body, so it sees the body's locals
            let body = type_check_block(type_checker, ctx, body)?;
            let action = match action {
                Some(action) => Some(Box::new(type_check_stmt(type_checker, ctx, action)?)),
                None => None,
            };

            Ok(TypedStmt::Loop {
                init,
                condition,
                action,
                body,
            })
        }
        StmtKind::Repeat { condition, body } => Ok(TypedStmt::Repeat {
            condition: type_check_condition(type_checker, ctx, condition, "repeat")?,
            body: type_check_block(type_checker, ctx, body)?,
        }),
        StmtKind::Expression(expression) => {
            let typed = type_check_expr(type_checker, ctx, expression)?;
            match expression.kind {
                ExprKind::Call { .. } | ExprKind::Member { .. } => {
                    Ok(TypedStmt::Expression(typed))
                }
                _ => MK_TYPE_MISMATCH!(
                    "expression statement",
                    "a call or member access",
                    typed.ty,
                    typed.position
                ),
            }
        }
    }
}

/// Statement lists share the scope of the enclosing method.
pub fn type_check_block(
    type_checker: &mut TypeChecker,
    ctx: &AnalysisContext,
    body: &[Stmt],
) -> Result<Vec<TypedStmt>, Error> {
    body.iter()
        .map(|stmt| type_check_stmt(type_checker, ctx, stmt))
        .collect()
}

fn register_classes(type_checker: &mut TypeChecker, program: &Program) -> Result<(), Error> {
    for class in program.classes.iter() {
        if type_checker
            .symbols
            .add_class(&class.name, class.position.clone())
            .is_err()
        {
            return MK_ERROR!(
                ErrorImpl::DuplicateDefinition {
                    kind: String::from("Class"),
                    name: class.name.clone(),
                    scope: String::from("the program"),
                },
                class.position
            );
        }
        tracing::debug!(class = %class.name, "registered class");
    }
    Ok(())
}

fn register_field(
    type_checker: &mut TypeChecker,
    class_id: ClassId,
    field: &VarDecl,
) -> Result<(), Error> {
    let var_type = match &field.var_type {
        Some(info) => type_checker.resolve_type(info, &field.position)?,
        None => Type::any(),
    };
    let symbol = VariableSymbol {
        name: field.name.clone(),
        var_type,
        kind: VariableKind::Field,
        position: field.position.clone(),
    };

    let scope = type_checker.symbols.class(class_id).scope;
    if type_checker
        .symbols
        .declare(scope, &field.name, Symbol::Variable(symbol.clone()))
        .is_err()
        || !type_checker.symbols.class_mut(class_id).add_field(symbol)
    {
        return MK_ERROR!(
            ErrorImpl::DuplicateDefinition {
                kind: String::from("Field"),
                name: field.name.clone(),
                scope: format!("class '{}'", type_checker.symbols.class(class_id).name),
            },
            field.position
        );
    }
    Ok(())
}

fn register_method(
    type_checker: &mut TypeChecker,
    class_id: ClassId,
    method: &FunctionDecl,
) -> Result<(), Error> {
    let class_scope = type_checker.symbols.class(class_id).scope;
    let class_name = type_checker.symbols.class(class_id).name.clone();
    let index = type_checker.symbols.class(class_id).methods.len();

    if type_checker
        .symbols
        .declare(class_scope, &method.name, Symbol::Method(class_id, index))
        .is_err()
    {
        return MK_ERROR!(
            ErrorImpl::DuplicateDefinition {
                kind: String::from("Method"),
                name: method.name.clone(),
                scope: format!("class '{}'", class_name),
            },
            method.position
        );
    }

    let return_type = type_checker.resolve_type(&method.return_type, &method.position)?;
    let scope = type_checker.symbols.add_scope(class_scope);
    let mut parameters = Vec::with_capacity(method.parameters.len());
    for parameter in method.parameters.iter() {
        let symbol = VariableSymbol {
            name: parameter.name.clone(),
            var_type: type_checker.resolve_type(&parameter.param_type, &parameter.position)?,
            kind: VariableKind::Parameter,
            position: parameter.position.clone(),
        };
        if type_checker
            .symbols
            .declare(scope, &parameter.name, Symbol::Variable(symbol.clone()))
            .is_err()
        {
            return MK_ERROR!(
                ErrorImpl::DuplicateDefinition {
                    kind: String::from("Parameter"),
                    name: parameter.name.clone(),
                    scope: format!("method '{}.{}'", class_name, method.name),
                },
                parameter.position
            );
        }
        parameters.push(symbol);
    }

    if method.is_entry {
        if let Some((first_class, first_method)) = type_checker.entry {
            let first = type_checker.symbols.method(first_class, first_method);
            return MK_ERROR!(
                ErrorImpl::MultipleEntryPoints {
                    first: type_checker.function_name(first),
                    second: format!("{}.{}", class_name, method.name),
                },
                method.position
            );
        }
        type_checker.entry = Some((class_id, index));
    }

    type_checker.symbols.class_mut(class_id).add_method(FunctionSymbol {
        name: method.name.clone(),
        parameters,
        return_type,
        is_entry: method.is_entry,
        class: class_id,
        scope,
        position: method.position.clone(),
    });
    tracing::debug!(class = %class_name, method = %method.name, entry = method.is_entry, "registered method");
    Ok(())
}

fn register_members(
    type_checker: &mut TypeChecker,
    class_id: ClassId,
    class: &ClassDecl,
) -> Result<(), Error> {
    for member in class.members.iter() {
        match member {
            Member::Field(field) => register_field(type_checker, class_id, field)?,
            Member::Method(method) => register_method(type_checker, class_id, method)?,
        }
    }
    Ok(())
}

fn type_check_class(
    type_checker: &mut TypeChecker,
    class_id: ClassId,
    class: &ClassDecl,
) -> Result<TypedClass, Error> {
    let class_ctx = AnalysisContext {
        class: class_id,
        function: None,
        scope: type_checker.symbols.class(class_id).scope,
    };

    let mut fields = vec![];
    for (declaration, symbol) in class
        .fields()
        .zip(type_checker.symbols.class(class_id).fields.clone())
    {
        let size = type_check_array_size(type_checker, &class_ctx, declaration.var_type.as_ref())?;
        let initializer = match &declaration.initializer {
            Some(initializer) => {
                let value = type_check_value(type_checker, &class_ctx, initializer)?;
                if !compatible(&symbol.var_type, &value.ty) {
                    return MK_TYPE_MISMATCH!(
                        format!("initializer of field '{}'", symbol.name),
                        symbol.var_type,
                        value.ty,
                        value.position
                    );
                }
                Some(value)
            }
            None => None,
        };

        fields.push(TypedField {
            name: symbol.name,
            ty: symbol.var_type,
            size,
            initializer,
        });
    }

    let mut methods = vec![];
    for (index, declaration) in class.methods().enumerate() {
        let symbol = type_checker.symbols.method(class_id, index).clone();
        let ctx = AnalysisContext {
            class: class_id,
            function: Some(index),
            scope: symbol.scope,
        };

        methods.push(TypedFunction {
            class: class.name.clone(),
            name: symbol.name,
            parameters: symbol
                .parameters
                .into_iter()
                .map(|parameter| (parameter.name, parameter.var_type))
                .collect(),
            return_type: symbol.return_type,
            is_entry: symbol.is_entry,
            body: type_check_block(type_checker, &ctx, &declaration.body)?,
        });
    }

    Ok(TypedClass {
        name: class.name.clone(),
        fields,
        methods,
    })
}

fn check_entry(type_checker: &TypeChecker) -> Result<(), Error> {
    let Some((class_id, index)) = type_checker.entry else {
        return MK_ERROR!(ErrorImpl::NoEntryPoint, Position::null());
    };
    let class = type_checker.symbols.class(class_id);
    let entry = type_checker.symbols.method(class_id, index);

    let reason = if !class.fields.is_empty() {
        Some(format!("has {} field(s)", class.fields.len()))
    } else if class.methods.len() > 1 {
        Some(format!("has methods other than '{}'", entry.name))
    } else if !entry.parameters.is_empty() {
        Some(format!("has an entry method '{}' that takes parameters", entry.name))
    } else {
        None
    };

    match reason {
        Some(reason) => MK_ERROR!(
            ErrorImpl::InvalidEntryShape {
                class: class.name.clone(),
                reason,
            },
            class.position
        ),
        None => Ok(()),
    }
}

/// Validates a merged program and produces its typed AST.
///
/// Classes are registered before any member so that members may refer to
/// classes declared later. Members are registered before any body so that
/// methods may call methods declared later. Stops at the first violation.
#[tracing::instrument(skip_all, fields(classes = program.classes.len()))]
pub fn type_check(program: Program) -> Result<TypedProgram, Error> {
    let started = Instant::now();
    let mut type_checker = TypeChecker::new();

    register_classes(&mut type_checker, &program)?;
    for (index, class) in program.classes.iter().enumerate() {
        register_members(&mut type_checker, ClassId(index), class)?;
    }

    for declaration in program.uses.iter() {
        if type_checker.symbols.find_class(&declaration.class_name).is_none() {
            return MK_ERROR!(
                ErrorImpl::UndefinedSymbol {
                    symbol: declaration.class_name.clone()
                },
                declaration.position
            );
        }
    }

    let mut classes = Vec::with_capacity(program.classes.len());
    for (index, class) in program.classes.iter().enumerate() {
        classes.push(type_check_class(&mut type_checker, ClassId(index), class)?);
    }

    check_entry(&type_checker)?;

    tracing::info!(
        classes = classes.len(),
        warnings = type_checker.warnings.len(),
        elapsed = ?started.elapsed(),
        "semantic analysis finished"
    );

    Ok(TypedProgram {
        classes,
        warnings: type_checker.warnings,
    })
}
