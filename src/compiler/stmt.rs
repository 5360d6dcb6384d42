use inkwell::values::BasicValueEnum;

use crate::{
    ast::types::Type,
    errors::errors::Error,
    type_checker::typed_ast::{TypedExpr, TypedExprKind, TypedField, TypedStmt},
};

use super::{
    array::{allocate_array, fill_array},
    compiler::Compiler,
    expr::{coerce_value, gen_address, gen_call, gen_condition, gen_expression, gen_value_as},
};

/// Whether the block the builder points at already ends in a terminator.
pub fn is_terminated(compiler: &Compiler) -> bool {
    compiler
        .builder
        .get_insert_block()
        .and_then(|block| block.get_terminator())
        .is_some()
}

/// Returns the zero of the current return type. Used when control reaches
/// the end of a method without a `return`.
pub fn build_default_return(compiler: &Compiler) -> Result<(), Error> {
    if compiler.in_entry {
        let zero = compiler.context.i32_type().const_zero();
        compiler.builder.build_return(Some(&zero))?;
    } else if compiler.return_type.is_void() {
        compiler.builder.build_return(None)?;
    } else {
        let zero = compiler.zero_value(&compiler.return_type)?;
        compiler.builder.build_return(Some(&zero))?;
    }
    Ok(())
}

/// The value a variable or field starts with.
///
/// An explicit initializer wins, then a sized array filled with zeroes,
/// then an empty array, then the zero of the type.
fn gen_initial_value<'a>(
    compiler: &Compiler<'a>,
    ty: &Type,
    size: Option<&TypedExpr>,
    value: Option<&TypedExpr>,
) -> Result<BasicValueEnum<'a>, Error> {
    if let Some(value) = value {
        return gen_value_as(compiler, value, ty);
    }

    if !ty.is_array {
        return compiler.zero_value(ty);
    }

    let element = ty.element();
    let length = match size {
        Some(size) => gen_expression(compiler, size)?.into_int_value(),
        None => compiler.context.i64_type().const_zero(),
    };
    let header = allocate_array(compiler, length, &element)?;
    if size.is_some() {
        let zero = compiler.zero_value(&Type::new(element.base.clone()))?;
        fill_array(compiler, header, length, zero)?;
    }
    Ok(header.into())
}

pub fn gen_field_value<'a>(
    compiler: &Compiler<'a>,
    field: &TypedField,
) -> Result<BasicValueEnum<'a>, Error> {
    gen_initial_value(
        compiler,
        &field.ty,
        field.size.as_ref(),
        field.initializer.as_ref(),
    )
}

/// Generates statements until one of them terminates the current block.
/// Anything after a `return` is unreachable and skipped.
pub fn gen_block<'a>(compiler: &mut Compiler<'a>, statements: &[TypedStmt]) -> Result<(), Error> {
    for statement in statements {
        if is_terminated(compiler) {
            break;
        }
        gen_statement(compiler, statement)?;
    }
    Ok(())
}

fn gen_return<'a>(compiler: &Compiler<'a>, value: Option<&TypedExpr>) -> Result<(), Error> {
    let value = match value {
        Some(value) if !value.ty.is_void() => value,
        // A value-less return yields the zero of the declared type
        _ => return build_default_return(compiler),
    };

    let result = gen_value_as(compiler, value, &compiler.return_type)?;
    if compiler.in_entry {
        let code = coerce_value(compiler, result, compiler.context.i32_type().into())?;
        compiler.builder.build_return(Some(&code))?;
    } else {
        compiler.builder.build_return(Some(&result))?;
    }
    Ok(())
}

pub fn gen_statement<'a>(compiler: &mut Compiler<'a>, statement: &TypedStmt) -> Result<(), Error> {
    match statement {
        TypedStmt::VarDecl {
            name,
            var_type,
            size,
            value,
        } => {
            let initial = gen_initial_value(compiler, var_type, size.as_ref(), value.as_ref())?;
            let slot = compiler.build_entry_alloca(compiler.convert_type(var_type)?, name)?;
            compiler.builder.build_store(slot, initial)?;
            compiler.named_allocas.insert(name.clone(), slot);
        }
        TypedStmt::Assign { target, value } => {
            let value = gen_value_as(compiler, value, &target.ty)?;
            let slot = gen_address(compiler, target)?;
            compiler.builder.build_store(slot, value)?;
        }
        TypedStmt::Return(value) => gen_return(compiler, value.as_ref())?,
        TypedStmt::If {
            condition,
            then_body,
            else_body,
        } => {
            let condition = gen_condition(compiler, condition)?;

            let then_block = compiler.create_basic_block("then")?;
            let else_block = compiler.create_basic_block("else")?;
            let merge_block = compiler.create_basic_block("ifcont")?;

            compiler
                .builder
                .build_conditional_branch(condition, then_block, else_block)?;

            compiler.builder.position_at_end(then_block);
            gen_block(compiler, then_body)?;
            if !is_terminated(compiler) {
                compiler.builder.build_unconditional_branch(merge_block)?;
            }

            compiler.builder.position_at_end(else_block);
            if let Some(else_body) = else_body {
                gen_block(compiler, else_body)?;
            }
            if !is_terminated(compiler) {
                compiler.builder.build_unconditional_branch(merge_block)?;
            }

            compiler.builder.position_at_end(merge_block);
        }
        TypedStmt::Repeat { condition, body } => {
            let cond_block = compiler.create_basic_block("cond")?;
            let loop_block = compiler.create_basic_block("loop")?;
            let after_block = compiler.create_basic_block("afterloop")?;

            compiler.builder.build_unconditional_branch(cond_block)?;

            compiler.builder.position_at_end(cond_block);
            let condition = gen_condition(compiler, condition)?;
            compiler
                .builder
                .build_conditional_branch(condition, loop_block, after_block)?;

            compiler.builder.position_at_end(loop_block);
            gen_block(compiler, body)?;
            if !is_terminated(compiler) {
                compiler.builder.build_unconditional_branch(cond_block)?;
            }

            compiler.builder.position_at_end(after_block);
        }
        TypedStmt::Loop {
            init,
            condition,
            action,
            body,
        } => {
            if let Some(init) = init {
                gen_statement(compiler, init)?;
            }

            let cond_block = compiler.create_basic_block("forcond")?;
            let body_block = compiler.create_basic_block("forbody")?;
            let after_block = compiler.create_basic_block("forafter")?;

            compiler.builder.build_unconditional_branch(cond_block)?;

            compiler.builder.position_at_end(cond_block);
            let condition = gen_condition(compiler, condition)?;
            compiler
                .builder
                .build_conditional_branch(condition, body_block, after_block)?;

            compiler.builder.position_at_end(body_block);
            gen_block(compiler, body)?;
            if !is_terminated(compiler) {
                if let Some(action) = action {
                    gen_statement(compiler, action)?;
                }
                compiler.builder.build_unconditional_branch(cond_block)?;
            }

            compiler.builder.position_at_end(after_block);
        }
        TypedStmt::Expression(expression) => match &expression.kind {
            TypedExprKind::Call { callee, arguments } => {
                gen_call(compiler, callee, arguments)?;
            }
            _ => {
                gen_expression(compiler, expression)?;
            }
        },
    }

    Ok(())
}
