//! The C runtime the emitted module links against.
//!
//! Only three functions are used: `printf` for `show`, `scanf` for `ask` and
//! `malloc` for objects, arrays and input buffers.

use inkwell::{
    module::Linkage,
    values::{BasicMetadataValueEnum, FunctionValue, IntValue, PointerValue},
    AddressSpace,
};

use crate::errors::errors::Error;

use super::compiler::Compiler;

/// Declares `printf`, `scanf` and `malloc` in the module.
pub fn declare_runtime(compiler: &Compiler) {
    let i8_ptr_type = compiler.context.i8_type().ptr_type(AddressSpace::default());

    // i32 printf(i8* format, ...)
    let printf_type = compiler
        .context
        .i32_type()
        .fn_type(&[i8_ptr_type.into()], true);
    compiler
        .module
        .add_function("printf", printf_type, Some(Linkage::External));

    // i32 scanf(i8* format, ...)
    let scanf_type = compiler
        .context
        .i32_type()
        .fn_type(&[i8_ptr_type.into()], true);
    compiler
        .module
        .add_function("scanf", scanf_type, Some(Linkage::External));

    // i8* malloc(i64 size)
    let malloc_type = i8_ptr_type.fn_type(&[compiler.context.i64_type().into()], false);
    compiler
        .module
        .add_function("malloc", malloc_type, Some(Linkage::External));
}

fn runtime_function<'a>(compiler: &Compiler<'a>, name: &str) -> Result<FunctionValue<'a>, Error> {
    compiler
        .module
        .get_function(name)
        .ok_or_else(|| Error::internal(format!("runtime function '{}' is not declared", name)))
}

/// Calls `malloc(size)` and returns the raw `i8*`.
pub fn build_malloc<'a>(
    compiler: &Compiler<'a>,
    size: IntValue<'a>,
    name: &str,
) -> Result<PointerValue<'a>, Error> {
    let malloc = runtime_function(compiler, "malloc")?;
    let size = compiler
        .builder
        .build_int_cast(size, compiler.context.i64_type(), "size")?;

    compiler
        .builder
        .build_call(malloc, &[size.into()], name)?
        .try_as_basic_value()
        .left()
        .map(|value| value.into_pointer_value())
        .ok_or_else(|| Error::internal("malloc returned no value"))
}

fn build_formatted_call<'a>(
    compiler: &Compiler<'a>,
    function: &str,
    format: &str,
    argument: BasicMetadataValueEnum<'a>,
) -> Result<(), Error> {
    let function = runtime_function(compiler, function)?;
    let format = compiler
        .builder
        .build_global_string_ptr(format, "fmt")?
        .as_pointer_value();

    compiler
        .builder
        .build_call(function, &[format.into(), argument], "")?;
    Ok(())
}

/// `printf(format, value)`
pub fn build_printf<'a>(
    compiler: &Compiler<'a>,
    format: &str,
    value: BasicMetadataValueEnum<'a>,
) -> Result<(), Error> {
    build_formatted_call(compiler, "printf", format, value)
}

/// `scanf(format, destination)`
pub fn build_scanf<'a>(
    compiler: &Compiler<'a>,
    format: &str,
    destination: PointerValue<'a>,
) -> Result<(), Error> {
    build_formatted_call(compiler, "scanf", format, destination.into())
}
