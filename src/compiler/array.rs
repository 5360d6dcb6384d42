//! Runtime arrays.
//!
//! An array value is a pointer to a heap header `{ i64 length, T* data }`.
//! Both the header and the element storage come from `malloc`.

use inkwell::{
    types::BasicType,
    values::{BasicValueEnum, IntValue, PointerValue},
    AddressSpace, IntPredicate,
};

use crate::{ast::types::Type, errors::errors::Error};

use super::{compiler::Compiler, expr::coerce_value, runtime::build_malloc};

/// Loads the element count stored in the header.
pub fn array_length<'a>(
    compiler: &Compiler<'a>,
    header: PointerValue<'a>,
) -> Result<IntValue<'a>, Error> {
    let length = compiler.builder.build_struct_gep(header, 0, "len.ptr")?;
    Ok(compiler.builder.build_load(length, "len")?.into_int_value())
}

/// Address of element `index`. No bounds check is emitted.
pub fn element_pointer<'a>(
    compiler: &Compiler<'a>,
    header: PointerValue<'a>,
    index: IntValue<'a>,
) -> Result<PointerValue<'a>, Error> {
    let data = compiler.builder.build_struct_gep(header, 1, "data.ptr")?;
    let data = compiler.builder.build_load(data, "data")?.into_pointer_value();

    // SAFETY: the index is not checked against the stored length, matching the
    // language semantics for out of range accesses.
    Ok(unsafe {
        compiler
            .builder
            .build_in_bounds_gep(data, &[index], "elem")?
    })
}

/// Allocates a header and room for `length` elements of type `element`.
/// The elements are left uninitialised.
pub fn allocate_array<'a>(
    compiler: &Compiler<'a>,
    length: IntValue<'a>,
    element: &Type,
) -> Result<PointerValue<'a>, Error> {
    let i64_type = compiler.context.i64_type();
    let header_type = compiler.array_header_type(element)?;
    let element_type = compiler.convert_type(&Type::new(element.base.clone()))?;

    let header_size = header_type
        .size_of()
        .ok_or_else(|| Error::internal("array header has no size"))?;
    let raw_header = build_malloc(compiler, header_size, "array")?;
    let header = compiler.builder.build_pointer_cast(
        raw_header,
        header_type.ptr_type(AddressSpace::default()),
        "header",
    )?;

    let element_size = element_type
        .size_of()
        .ok_or_else(|| Error::internal("array element has no size"))?;
    let length = compiler.builder.build_int_cast(length, i64_type, "len")?;
    let bytes = compiler.builder.build_int_mul(length, element_size, "bytes")?;
    let raw_data = build_malloc(compiler, bytes, "array.data")?;
    let data = compiler.builder.build_pointer_cast(
        raw_data,
        element_type.ptr_type(AddressSpace::default()),
        "data",
    )?;

    let length_slot = compiler.builder.build_struct_gep(header, 0, "len.ptr")?;
    compiler.builder.build_store(length_slot, length)?;
    let data_slot = compiler.builder.build_struct_gep(header, 1, "data.ptr")?;
    compiler.builder.build_store(data_slot, data)?;

    Ok(header)
}

/// Emits `for (i = 0; i < count; i++) body(i)` using `<name>.cond`,
/// `<name>.body` and `<name>.end` blocks.
pub fn build_counted_loop<'a>(
    compiler: &Compiler<'a>,
    count: IntValue<'a>,
    name: &str,
    mut body: impl FnMut(IntValue<'a>) -> Result<(), Error>,
) -> Result<(), Error> {
    let i64_type = compiler.context.i64_type();
    let counter = compiler.build_entry_alloca(i64_type.into(), &format!("{}.i", name))?;
    compiler.builder.build_store(counter, i64_type.const_zero())?;

    let cond_block = compiler.create_basic_block(&format!("{}.cond", name))?;
    let body_block = compiler.create_basic_block(&format!("{}.body", name))?;
    let end_block = compiler.create_basic_block(&format!("{}.end", name))?;
    compiler.builder.build_unconditional_branch(cond_block)?;

    compiler.builder.position_at_end(cond_block);
    let index = compiler.builder.build_load(counter, "i")?.into_int_value();
    let more = compiler
        .builder
        .build_int_compare(IntPredicate::SLT, index, count, "more")?;
    compiler
        .builder
        .build_conditional_branch(more, body_block, end_block)?;

    compiler.builder.position_at_end(body_block);
    body(index)?;
    let next = compiler
        .builder
        .build_int_add(index, i64_type.const_int(1, false), "next")?;
    compiler.builder.build_store(counter, next)?;
    compiler.builder.build_unconditional_branch(cond_block)?;

    compiler.builder.position_at_end(end_block);
    Ok(())
}

/// Stores `value` into every element.
pub fn fill_array<'a>(
    compiler: &Compiler<'a>,
    header: PointerValue<'a>,
    length: IntValue<'a>,
    value: BasicValueEnum<'a>,
) -> Result<(), Error> {
    build_counted_loop(compiler, length, "fill", |index| {
        let slot = element_pointer(compiler, header, index)?;
        compiler.builder.build_store(slot, value)?;
        Ok(())
    })
}

/// Copies an array into a new one with a different element representation,
/// e.g. `i[]` into `f[]`.
pub fn convert_array<'a>(
    compiler: &Compiler<'a>,
    header: PointerValue<'a>,
    to: &Type,
) -> Result<PointerValue<'a>, Error> {
    let length = array_length(compiler, header)?;
    let converted = allocate_array(compiler, length, to)?;
    let element_type = compiler.convert_type(&Type::new(to.base.clone()))?;

    build_counted_loop(compiler, length, "convert", |index| {
        let source = element_pointer(compiler, header, index)?;
        let value = compiler.builder.build_load(source, "elem")?;
        let value = coerce_value(compiler, value, element_type)?;
        let destination = element_pointer(compiler, converted, index)?;
        compiler.builder.build_store(destination, value)?;
        Ok(())
    })?;

    Ok(converted)
}
