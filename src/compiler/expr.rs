use inkwell::{
    types::{BasicType, BasicTypeEnum},
    values::{BasicMetadataValueEnum, BasicValueEnum, IntValue, PointerValue},
    AddressSpace, FloatPredicate, IntPredicate,
};

use crate::{
    ast::{
        expressions::{BinaryOp, Literal, UnaryOp},
        types::{BaseType, Type},
    },
    errors::errors::Error,
    type_checker::{
        builtins::Builtin,
        typed_ast::{constructor_symbol, method_symbol, Callee, TypedExpr, TypedExprKind},
    },
};

use super::{
    array::{allocate_array, array_length, convert_array, element_pointer},
    compiler::Compiler,
    runtime::{build_malloc, build_printf, build_scanf},
};

/// Converts a value to another LLVM representation.
///
/// Integers are sign extended except for `i1`, which is zero extended.
/// Anything converted to `i1` is compared against zero.
pub fn coerce_value<'a>(
    compiler: &Compiler<'a>,
    value: BasicValueEnum<'a>,
    target: BasicTypeEnum<'a>,
) -> Result<BasicValueEnum<'a>, Error> {
    if value.get_type() == target {
        return Ok(value);
    }

    let builder = &compiler.builder;
    let converted: BasicValueEnum<'a> = match (value, target) {
        (BasicValueEnum::IntValue(int), BasicTypeEnum::IntType(int_type)) => {
            let from = int.get_type().get_bit_width();
            let to = int_type.get_bit_width();
            if to == 1 {
                builder
                    .build_int_compare(IntPredicate::NE, int, int.get_type().const_zero(), "tobool")?
                    .into()
            } else if from == 1 {
                builder.build_int_z_extend(int, int_type, "zext")?.into()
            } else if from < to {
                builder.build_int_s_extend(int, int_type, "sext")?.into()
            } else {
                builder.build_int_truncate(int, int_type, "trunc")?.into()
            }
        }
        (BasicValueEnum::IntValue(int), BasicTypeEnum::FloatType(float_type)) => {
            if int.get_type().get_bit_width() == 1 {
                builder
                    .build_unsigned_int_to_float(int, float_type, "uitofp")?
                    .into()
            } else {
                builder
                    .build_signed_int_to_float(int, float_type, "sitofp")?
                    .into()
            }
        }
        (BasicValueEnum::FloatValue(float), BasicTypeEnum::IntType(int_type)) => {
            if int_type.get_bit_width() == 1 {
                builder
                    .build_float_compare(
                        FloatPredicate::ONE,
                        float,
                        float.get_type().const_zero(),
                        "tobool",
                    )?
                    .into()
            } else {
                builder
                    .build_float_to_signed_int(float, int_type, "fptosi")?
                    .into()
            }
        }
        (BasicValueEnum::FloatValue(float), BasicTypeEnum::FloatType(float_type)) => {
            builder.build_float_cast(float, float_type, "fcast")?.into()
        }
        (BasicValueEnum::PointerValue(pointer), BasicTypeEnum::PointerType(pointer_type)) => {
            builder.build_pointer_cast(pointer, pointer_type, "cast")?.into()
        }
        (BasicValueEnum::PointerValue(pointer), BasicTypeEnum::IntType(int_type)) => {
            if int_type.get_bit_width() == 1 {
                builder.build_is_not_null(pointer, "tobool")?.into()
            } else {
                builder.build_ptr_to_int(pointer, int_type, "ptrtoint")?.into()
            }
        }
        (BasicValueEnum::IntValue(int), BasicTypeEnum::PointerType(pointer_type)) => {
            let int = coerce_value(compiler, int.into(), compiler.context.i64_type().into())?;
            builder
                .build_int_to_ptr(int.into_int_value(), pointer_type, "inttoptr")?
                .into()
        }
        (BasicValueEnum::FloatValue(float), BasicTypeEnum::PointerType(pointer_type)) => {
            let bits = builder
                .build_bit_cast(float, compiler.context.i64_type(), "bits")?
                .into_int_value();
            builder
                .build_int_to_ptr(bits, pointer_type, "inttoptr")?
                .into()
        }
        (value, target) => {
            return Err(Error::internal(format!(
                "cannot convert {:?} to {:?}",
                value.get_type(),
                target
            )))
        }
    };

    Ok(converted)
}

/// Converts a value of type `from` to type `to`, copying arrays whose element
/// representation differs.
pub fn coerce<'a>(
    compiler: &Compiler<'a>,
    value: BasicValueEnum<'a>,
    from: &Type,
    to: &Type,
) -> Result<BasicValueEnum<'a>, Error> {
    if from.is_array && to.is_array {
        let from_element = compiler.convert_type(&Type::new(from.base.clone()))?;
        let to_element = compiler.convert_type(&Type::new(to.base.clone()))?;
        if from_element != to_element {
            return Ok(convert_array(compiler, value.into_pointer_value(), &to.element())?.into());
        }
    }

    coerce_value(compiler, value, compiler.convert_type(to)?)
}

/// Generates an expression whose result is stored where `target` is expected.
pub fn gen_value_as<'a>(
    compiler: &Compiler<'a>,
    expression: &TypedExpr,
    target: &Type,
) -> Result<BasicValueEnum<'a>, Error> {
    if let TypedExprKind::ArrayLiteral(elements) = &expression.kind {
        if target.is_array {
            return Ok(gen_array_literal(compiler, elements, &target.element())?.into());
        }
    }

    let value = gen_expression(compiler, expression)?;
    coerce(compiler, value, &expression.ty, target)
}

/// Generates a value for `check`, `loop` and `repeat`.
pub fn gen_condition<'a>(
    compiler: &Compiler<'a>,
    expression: &TypedExpr,
) -> Result<IntValue<'a>, Error> {
    let value = gen_expression(compiler, expression)?;
    Ok(coerce_value(compiler, value, compiler.context.bool_type().into())?.into_int_value())
}

fn gen_literal<'a>(compiler: &Compiler<'a>, literal: &Literal) -> Result<BasicValueEnum<'a>, Error> {
    Ok(match literal {
        Literal::Int(value) => compiler
            .context
            .i64_type()
            .const_int(*value as u64, true)
            .into(),
        Literal::Float(value) => compiler.context.f64_type().const_float(*value).into(),
        Literal::Bool(value) => compiler
            .context
            .bool_type()
            .const_int(*value as u64, false)
            .into(),
        Literal::String(value) => compiler
            .builder
            .build_global_string_ptr(value, "str")?
            .as_pointer_value()
            .into(),
        Literal::Null => compiler
            .context
            .i8_type()
            .ptr_type(AddressSpace::default())
            .const_null()
            .into(),
    })
}

pub fn gen_array_literal<'a>(
    compiler: &Compiler<'a>,
    elements: &[TypedExpr],
    element: &Type,
) -> Result<PointerValue<'a>, Error> {
    let i64_type = compiler.context.i64_type();
    let header = allocate_array(
        compiler,
        i64_type.const_int(elements.len() as u64, false),
        element,
    )?;

    let element = Type::new(element.base.clone());
    for (index, value) in elements.iter().enumerate() {
        let value = gen_value_as(compiler, value, &element)?;
        let slot = element_pointer(compiler, header, i64_type.const_int(index as u64, false))?;
        compiler.builder.build_store(slot, value)?;
    }

    Ok(header)
}

/// Address of something that can be assigned to or read by `ask`.
pub fn gen_address<'a>(
    compiler: &Compiler<'a>,
    expression: &TypedExpr,
) -> Result<PointerValue<'a>, Error> {
    match &expression.kind {
        TypedExprKind::Local(name) => compiler
            .named_allocas
            .get(name)
            .copied()
            .ok_or_else(|| Error::internal(format!("variable '{}' has no stack slot", name))),
        TypedExprKind::Field { field, index, .. } => {
            let this = compiler
                .this_value
                .ok_or_else(|| Error::internal(format!("field '{}' used without an object", field)))?;
            Ok(compiler.builder.build_struct_gep(this, *index, field)?)
        }
        TypedExprKind::Member {
            target,
            field,
            index,
            ..
        } => {
            let object = gen_expression(compiler, target)?.into_pointer_value();
            Ok(compiler.builder.build_struct_gep(object, *index, field)?)
        }
        TypedExprKind::Index { target, index } => {
            let header = gen_expression(compiler, target)?.into_pointer_value();
            let index = gen_expression(compiler, index)?.into_int_value();
            element_pointer(compiler, header, index)
        }
        _ => Err(Error::internal("expression is not addressable")),
    }
}

fn gen_arithmetic<'a>(
    compiler: &Compiler<'a>,
    left: BasicValueEnum<'a>,
    operator: BinaryOp,
    right: BasicValueEnum<'a>,
    result: &Type,
) -> Result<BasicValueEnum<'a>, Error> {
    let builder = &compiler.builder;

    if result.base == BaseType::Float {
        let float_type = compiler.context.f64_type().into();
        let left = coerce_value(compiler, left, float_type)?.into_float_value();
        let right = coerce_value(compiler, right, float_type)?.into_float_value();

        return Ok(match operator {
            BinaryOp::Add => builder.build_float_add(left, right, "fadd")?,
            BinaryOp::Subtract => builder.build_float_sub(left, right, "fsub")?,
            BinaryOp::Multiply => builder.build_float_mul(left, right, "fmul")?,
            BinaryOp::Divide => builder.build_float_div(left, right, "fdiv")?,
            BinaryOp::Modulo => builder.build_float_rem(left, right, "frem")?,
            _ => return Err(Error::internal(format!("'{}' is not arithmetic", operator))),
        }
        .into());
    }

    let left = left.into_int_value();
    let right = right.into_int_value();
    Ok(match operator {
        BinaryOp::Add => builder.build_int_add(left, right, "add")?,
        BinaryOp::Subtract => builder.build_int_sub(left, right, "sub")?,
        BinaryOp::Multiply => builder.build_int_mul(left, right, "mul")?,
        BinaryOp::Divide => builder.build_int_signed_div(left, right, "div")?,
        BinaryOp::Modulo => builder.build_int_signed_rem(left, right, "rem")?,
        _ => return Err(Error::internal(format!("'{}' is not arithmetic", operator))),
    }
    .into())
}

/// An operand of an integer comparison as `i64`.
///
/// A float compared with `any` keeps its bit pattern, the same encoding
/// `coerce_value` uses when a float is stored into `any`.
fn comparison_bits<'a>(
    compiler: &Compiler<'a>,
    value: BasicValueEnum<'a>,
    other: &Type,
) -> Result<IntValue<'a>, Error> {
    let i64_type = compiler.context.i64_type();
    match value {
        BasicValueEnum::FloatValue(float) if !other.is_array && other.base == BaseType::Any => {
            Ok(compiler
                .builder
                .build_bit_cast(float, i64_type, "bits")?
                .into_int_value())
        }
        value => Ok(coerce_value(compiler, value, i64_type.into())?.into_int_value()),
    }
}

fn gen_comparison<'a>(
    compiler: &Compiler<'a>,
    left: (BasicValueEnum<'a>, &Type),
    operator: BinaryOp,
    right: (BasicValueEnum<'a>, &Type),
) -> Result<BasicValueEnum<'a>, Error> {
    let (left, left_type) = left;
    let (right, right_type) = right;

    let is_float = |ty: &Type| ty.is_numeric() && ty.base == BaseType::Float;
    if left_type.is_numeric()
        && right_type.is_numeric()
        && (is_float(left_type) || is_float(right_type))
    {
        let float_type = compiler.context.f64_type().into();
        let left = coerce_value(compiler, left, float_type)?.into_float_value();
        let right = coerce_value(compiler, right, float_type)?.into_float_value();
        let predicate = match operator {
            BinaryOp::Equals => FloatPredicate::OEQ,
            BinaryOp::NotEquals => FloatPredicate::ONE,
            BinaryOp::Less => FloatPredicate::OLT,
            BinaryOp::Greater => FloatPredicate::OGT,
            BinaryOp::LessEquals => FloatPredicate::OLE,
            BinaryOp::GreaterEquals => FloatPredicate::OGE,
            _ => return Err(Error::internal(format!("'{}' is not relational", operator))),
        };
        return Ok(compiler
            .builder
            .build_float_compare(predicate, left, right, "fcmp")?
            .into());
    }

    // Everything else compares as integers; pointers compare by address
    let (left, right) = if left.is_int_value() && left.get_type() == right.get_type() {
        (left.into_int_value(), right.into_int_value())
    } else {
        (
            comparison_bits(compiler, left, right_type)?,
            comparison_bits(compiler, right, left_type)?,
        )
    };

    let signed = left_type.is_int() && right_type.is_int();
    let predicate = match (operator, signed) {
        (BinaryOp::Equals, _) => IntPredicate::EQ,
        (BinaryOp::NotEquals, _) => IntPredicate::NE,
        (BinaryOp::Less, true) => IntPredicate::SLT,
        (BinaryOp::Less, false) => IntPredicate::ULT,
        (BinaryOp::Greater, true) => IntPredicate::SGT,
        (BinaryOp::Greater, false) => IntPredicate::UGT,
        (BinaryOp::LessEquals, true) => IntPredicate::SLE,
        (BinaryOp::LessEquals, false) => IntPredicate::ULE,
        (BinaryOp::GreaterEquals, true) => IntPredicate::SGE,
        (BinaryOp::GreaterEquals, false) => IntPredicate::UGE,
        _ => return Err(Error::internal(format!("'{}' is not relational", operator))),
    };

    Ok(compiler
        .builder
        .build_int_compare(predicate, left, right, "cmp")?
        .into())
}

fn gen_binary<'a>(
    compiler: &Compiler<'a>,
    left: &TypedExpr,
    operator: BinaryOp,
    right: &TypedExpr,
    result: &Type,
) -> Result<BasicValueEnum<'a>, Error> {
    // Both operands are always evaluated, left first
    let left_value = gen_expression(compiler, left)?;
    let right_value = gen_expression(compiler, right)?;

    if operator.is_logical() {
        let left_value = left_value.into_int_value();
        let right_value = right_value.into_int_value();
        return Ok(match operator {
            BinaryOp::And => compiler.builder.build_and(left_value, right_value, "and")?,
            _ => compiler.builder.build_or(left_value, right_value, "or")?,
        }
        .into());
    }

    if operator.is_arithmetic() {
        return gen_arithmetic(compiler, left_value, operator, right_value, result);
    }

    gen_comparison(
        compiler,
        (left_value, &left.ty),
        operator,
        (right_value, &right.ty),
    )
}

fn gen_unary<'a>(
    compiler: &Compiler<'a>,
    operator: UnaryOp,
    operand: &TypedExpr,
) -> Result<BasicValueEnum<'a>, Error> {
    let value = gen_expression(compiler, operand)?;

    match (operator, value) {
        (UnaryOp::Negate, BasicValueEnum::IntValue(int)) => {
            Ok(compiler.builder.build_int_neg(int, "neg")?.into())
        }
        (UnaryOp::Negate, BasicValueEnum::FloatValue(float)) => {
            Ok(compiler.builder.build_float_neg(float, "fneg")?.into())
        }
        (UnaryOp::Not, BasicValueEnum::IntValue(int)) => {
            Ok(compiler.builder.build_not(int, "not")?.into())
        }
        (operator, value) => Err(Error::internal(format!(
            "cannot apply '{}' to {:?}",
            operator,
            value.get_type()
        ))),
    }
}

/// `show(value)`: picks the `printf` format from the value's representation.
fn gen_show<'a>(compiler: &Compiler<'a>, argument: &TypedExpr) -> Result<(), Error> {
    let value = gen_expression(compiler, argument)?;

    let (format, value): (&str, BasicMetadataValueEnum<'a>) = match value {
        BasicValueEnum::IntValue(int) if int.get_type().get_bit_width() == 1 => (
            "%d\n",
            compiler
                .builder
                .build_int_z_extend(int, compiler.context.i32_type(), "flag")?
                .into(),
        ),
        BasicValueEnum::IntValue(int) => ("%lld\n", int.into()),
        BasicValueEnum::FloatValue(float) => ("%f\n", float.into()),
        BasicValueEnum::PointerValue(pointer)
            if !argument.ty.is_array && argument.ty.base == BaseType::String =>
        {
            ("%s\n", pointer.into())
        }
        BasicValueEnum::PointerValue(pointer) => ("%p\n", pointer.into()),
        other => {
            return Err(Error::internal(format!(
                "cannot show a value of type {:?}",
                other.get_type()
            )))
        }
    };

    build_printf(compiler, format, value)
}

/// `ask(variable)`: reads one value from stdin into the variable.
fn gen_ask<'a>(compiler: &Compiler<'a>, argument: &TypedExpr) -> Result<(), Error> {
    let slot = gen_address(compiler, argument)?;

    match argument.ty.base {
        BaseType::String => {
            let size = compiler
                .context
                .i64_type()
                .const_int(compiler.options.input_buffer_size, false);
            let buffer = build_malloc(compiler, size, "input_buffer")?;
            compiler.builder.build_store(slot, buffer)?;
            build_scanf(compiler, "%s", buffer)
        }
        BaseType::Int => build_scanf(compiler, "%lld", slot),
        BaseType::Float => build_scanf(compiler, "%lf", slot),
        _ => Err(Error::internal(format!(
            "cannot read a value of type '{}'",
            argument.ty
        ))),
    }
}

fn gen_builtin<'a>(
    compiler: &Compiler<'a>,
    builtin: Builtin,
    arguments: &[TypedExpr],
) -> Result<Option<BasicValueEnum<'a>>, Error> {
    let argument = arguments
        .first()
        .ok_or_else(|| Error::internal(format!("'{}' called without an argument", builtin)))?;

    let converted_to = match builtin {
        Builtin::Len => {
            let header = gen_expression(compiler, argument)?.into_pointer_value();
            return Ok(Some(array_length(compiler, header)?.into()));
        }
        Builtin::Show => return gen_show(compiler, argument).map(|_| None),
        Builtin::Ask => return gen_ask(compiler, argument).map(|_| None),
        Builtin::ConvertToInt => compiler.context.i64_type().as_basic_type_enum(),
        Builtin::ConvertToFloat => compiler.context.f64_type().as_basic_type_enum(),
        Builtin::ConvertToBool => compiler.context.bool_type().as_basic_type_enum(),
    };

    let value = gen_expression(compiler, argument)?;
    Ok(Some(coerce_value(compiler, value, converted_to)?))
}

/// Generates a call. Returns `None` for calls that produce no value.
pub fn gen_call<'a>(
    compiler: &Compiler<'a>,
    callee: &Callee,
    arguments: &[TypedExpr],
) -> Result<Option<BasicValueEnum<'a>>, Error> {
    match callee {
        Callee::Builtin(builtin) => gen_builtin(compiler, *builtin, arguments),
        Callee::Constructor(class) => {
            let constructor = compiler.function(&constructor_symbol(class))?.value;
            Ok(compiler
                .builder
                .build_call(constructor, &[], "new")?
                .try_as_basic_value()
                .left())
        }
        Callee::Method {
            class,
            name,
            receiver,
        } => {
            let function = compiler.function(&method_symbol(class, name))?.clone();
            let mut args: Vec<BasicMetadataValueEnum<'a>> = vec![];

            if !function.is_entry {
                let this_type = compiler
                    .class_struct(class)?
                    .ptr_type(AddressSpace::default());
                let this = match receiver {
                    Some(receiver) => gen_expression(compiler, receiver)?.into_pointer_value(),
                    None => compiler.this_value.unwrap_or(this_type.const_null()),
                };
                args.push(
                    compiler
                        .builder
                        .build_pointer_cast(this, this_type, "this")?
                        .into(),
                );
            }

            for (argument, parameter) in arguments.iter().zip(function.parameters.iter()) {
                args.push(gen_value_as(compiler, argument, parameter)?.into());
            }

            let returns_value = function.is_entry || !function.return_type.is_void();
            let result = compiler
                .builder
                .build_call(function.value, &args, if returns_value { "call" } else { "" })?
                .try_as_basic_value()
                .left();

            match result {
                // The entry method returns i32 whatever its declared type
                Some(value) if function.is_entry && !function.return_type.is_void() => Ok(Some(
                    coerce_value(compiler, value, compiler.convert_type(&function.return_type)?)?,
                )),
                Some(_) if function.is_entry => Ok(None),
                result => Ok(result),
            }
        }
    }
}

/// Generates LLVM IR for an expression that produces a value.
pub fn gen_expression<'a>(
    compiler: &Compiler<'a>,
    expression: &TypedExpr,
) -> Result<BasicValueEnum<'a>, Error> {
    match &expression.kind {
        TypedExprKind::Literal(literal) => gen_literal(compiler, literal),
        TypedExprKind::Local(name) => {
            let slot = gen_address(compiler, expression)?;
            Ok(compiler.builder.build_load(slot, name)?)
        }
        TypedExprKind::Field { field, .. } | TypedExprKind::Member { field, .. } => {
            let slot = gen_address(compiler, expression)?;
            Ok(compiler.builder.build_load(slot, field)?)
        }
        TypedExprKind::Index { .. } => {
            let slot = gen_address(compiler, expression)?;
            Ok(compiler.builder.build_load(slot, "elem")?)
        }
        TypedExprKind::ClassRef(class) => Ok(compiler
            .class_struct(class)?
            .ptr_type(AddressSpace::default())
            .const_null()
            .into()),
        TypedExprKind::ArrayLiteral(elements) => {
            Ok(gen_array_literal(compiler, elements, &expression.ty.element())?.into())
        }
        TypedExprKind::Binary {
            left,
            operator,
            right,
        } => gen_binary(compiler, left, *operator, right, &expression.ty),
        TypedExprKind::Unary { operator, operand } => gen_unary(compiler, *operator, operand),
        TypedExprKind::Call { callee, arguments } => gen_call(compiler, callee, arguments)?
            .ok_or_else(|| Error::internal("a call without a value was used as a value")),
    }
}
