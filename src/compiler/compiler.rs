//! Main compiler module.
//!
//! This module contains the core Compiler structure and implements the lowering
//! pipeline from typed AST to LLVM IR. It manages the LLVM context, module
//! creation, type conversion and per-function state.

use std::{collections::HashMap, path::PathBuf, time::Instant};

use inkwell::{
    basic_block::BasicBlock,
    builder::Builder,
    context::Context,
    module::{Linkage, Module},
    targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetMachine},
    types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType, StructType},
    values::{BasicValueEnum, FunctionValue, PointerValue},
    AddressSpace, OptimizationLevel,
};

use crate::{
    ast::types::{BaseType, Type},
    errors::errors::Error,
    type_checker::typed_ast::{
        constructor_symbol, method_symbol, TypedClass, TypedFunction, TypedProgram,
    },
};

use super::{
    runtime::{build_malloc, declare_runtime},
    stmt::{build_default_return, gen_block, gen_field_value, is_terminated},
};

/// Settings that change the emitted module.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Name of the LLVM module
    pub module_name: String,
    /// Bytes allocated for every string read by `ask`
    pub input_buffer_size: u64,
    /// Set the host triple and data layout on the module
    pub native_target: bool,
    /// Run the LLVM verifier before handing the module out
    pub verify: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            module_name: String::from("main"),
            input_buffer_size: 256,
            native_target: true,
            verify: true,
        }
    }
}

/// A declared method together with what calls to it need to know.
#[derive(Debug, Clone)]
pub struct FunctionEntry<'a> {
    pub value: FunctionValue<'a>,
    pub parameters: Vec<Type>,
    pub return_type: Type,
    /// The entry method takes no `this` and returns `i32`
    pub is_entry: bool,
}

/// The main compiler structure that holds the state of the lowering process.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the LLVM context
pub struct Compiler<'a> {
    pub options: CompilerOptions,

    /// Map of local variable names to their stack slots, rebuilt per function
    pub named_allocas: HashMap<String, PointerValue<'a>>,
    /// Map of class names to their LLVM struct types
    pub named_structs: HashMap<String, StructType<'a>>,
    /// Map of `Class.method` to the declared function
    pub functions: HashMap<String, FunctionEntry<'a>>,

    /// Object the current method or constructor runs on
    pub this_value: Option<PointerValue<'a>>,
    /// Declared return type of the current function
    pub return_type: Type,
    pub in_entry: bool,

    /// Reference to the LLVM context
    pub context: &'a Context,
    /// The LLVM module being built
    pub module: Module<'a>,
    /// The LLVM IR builder
    pub builder: Builder<'a>,
}

impl<'a> Compiler<'a> {
    pub fn new(context: &'a Context, options: CompilerOptions) -> Self {
        Compiler {
            module: context.create_module(&options.module_name),
            builder: context.create_builder(),
            context,
            options,
            named_allocas: HashMap::new(),
            named_structs: HashMap::new(),
            functions: HashMap::new(),
            this_value: None,
            return_type: Type::void(),
            in_entry: false,
        }
    }

    /// Returns the textual IR of the module.
    pub fn print_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Saves the current LLVM module to a file.
    pub fn save_module_to_file(&self, output_file: PathBuf) -> Result<(), Error> {
        self.module.print_to_file(&output_file).map_err(|error| {
            Error::internal(format!(
                "could not write '{}': {}",
                output_file.display(),
                error
            ))
        })
    }

    /// Sets the triple and data layout of the machine the compiler runs on.
    fn set_native_target(&self) -> Result<(), Error> {
        Target::initialize_native(&InitializationConfig::default()).map_err(Error::internal)?;
        let target_triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&target_triple)
            .map_err(|error| Error::internal(error.to_string()))?;
        let target_machine = target
            .create_target_machine(
                &target_triple,
                "generic",
                "",
                OptimizationLevel::None,
                RelocMode::PIC,
                CodeModel::Default,
            )
            .ok_or_else(|| Error::internal("no target machine for the host triple"))?;

        self.module.set_triple(&target_triple);
        self.module
            .set_data_layout(&target_machine.get_target_data().get_data_layout());
        Ok(())
    }

    fn i8_ptr_type(&self) -> BasicTypeEnum<'a> {
        self.context
            .i8_type()
            .ptr_type(AddressSpace::default())
            .into()
    }

    /// Header of an array value: `{ i64 length, T* data }`.
    pub fn array_header_type(&self, element: &Type) -> Result<StructType<'a>, Error> {
        let element = self.convert_type(&Type::new(element.base.clone()))?;
        Ok(self.context.struct_type(
            &[
                self.context.i64_type().into(),
                element.ptr_type(AddressSpace::default()).into(),
            ],
            false,
        ))
    }

    /// Converts a language type to an LLVM basic type.
    ///
    /// `void` has no basic type and is an internal error here; callers that
    /// can see `void` handle it before converting.
    pub fn convert_type(&self, ty: &Type) -> Result<BasicTypeEnum<'a>, Error> {
        if ty.is_array {
            return Ok(self
                .array_header_type(&ty.element())?
                .ptr_type(AddressSpace::default())
                .into());
        }

        match &ty.base {
            BaseType::Int => Ok(self.context.i64_type().into()),
            BaseType::Float => Ok(self.context.f64_type().into()),
            BaseType::Bool => Ok(self.context.bool_type().into()),
            BaseType::String | BaseType::Any | BaseType::Null | BaseType::Unknown => {
                Ok(self.i8_ptr_type())
            }
            BaseType::Class(name) => Ok(self
                .class_struct(name)?
                .ptr_type(AddressSpace::default())
                .into()),
            BaseType::Void => Err(Error::internal("'void' has no value representation")),
        }
    }

    pub fn class_struct(&self, name: &str) -> Result<StructType<'a>, Error> {
        self.named_structs
            .get(name)
            .copied()
            .ok_or_else(|| Error::internal(format!("class '{}' was never declared", name)))
    }

    pub fn function(&self, symbol: &str) -> Result<&FunctionEntry<'a>, Error> {
        self.functions
            .get(symbol)
            .ok_or_else(|| Error::internal(format!("function '{}' was never declared", symbol)))
    }

    /// The zero of a type: `0`, `0.0`, `false` or a null pointer.
    pub fn zero_value(&self, ty: &Type) -> Result<BasicValueEnum<'a>, Error> {
        match self.convert_type(ty)? {
            BasicTypeEnum::IntType(int_type) => Ok(int_type.const_zero().into()),
            BasicTypeEnum::FloatType(float_type) => Ok(float_type.const_zero().into()),
            BasicTypeEnum::PointerType(pointer_type) => Ok(pointer_type.const_null().into()),
            other => Err(Error::internal(format!("no zero value for {:?}", other))),
        }
    }

    pub fn current_function(&self) -> Result<FunctionValue<'a>, Error> {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .ok_or_else(|| Error::internal("builder is not positioned inside a function"))
    }

    /// Creates a new basic block at the end of the current function.
    pub fn create_basic_block(&self, name: &str) -> Result<BasicBlock<'a>, Error> {
        Ok(self
            .context
            .append_basic_block(self.current_function()?, name))
    }

    /// Allocates a stack slot in the entry block of the current function, so
    /// that slots declared inside loops are allocated once.
    pub fn build_entry_alloca(
        &self,
        ty: BasicTypeEnum<'a>,
        name: &str,
    ) -> Result<PointerValue<'a>, Error> {
        let entry = self
            .current_function()?
            .get_first_basic_block()
            .ok_or_else(|| Error::internal("function has no entry block"))?;

        let builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(instruction) => builder.position_before(&instruction),
            None => builder.position_at_end(entry),
        }

        Ok(builder.build_alloca(ty, name)?)
    }

    /// Creates a function prototype with external linkage.
    fn create_function_proto(&self, name: &str, function_type: FunctionType<'a>) -> FunctionValue<'a> {
        self.module
            .add_function(name, function_type, Some(Linkage::External))
    }

    /// Declares one struct per class.
    ///
    /// All structs are created opaque first so that fields can point to any
    /// class, including their own.
    fn declare_classes(&mut self, classes: &[TypedClass]) -> Result<(), Error> {
        for class in classes {
            let struct_type = self.context.opaque_struct_type(&class.name);
            self.named_structs.insert(class.name.clone(), struct_type);
        }

        for class in classes {
            let fields = class
                .fields
                .iter()
                .map(|field| self.convert_type(&field.ty))
                .collect::<Result<Vec<BasicTypeEnum<'a>>, Error>>()?;
            self.class_struct(&class.name)?.set_body(&fields, false);
            tracing::debug!(class = %class.name, fields = fields.len(), "declared class struct");
        }
        Ok(())
    }

    fn declare_method(&mut self, class: &TypedClass, method: &TypedFunction) -> Result<(), Error> {
        let mut parameters: Vec<BasicMetadataTypeEnum<'a>> = vec![];
        if !method.is_entry {
            parameters.push(
                self.class_struct(&class.name)?
                    .ptr_type(AddressSpace::default())
                    .into(),
            );
        }
        for (_, ty) in method.parameters.iter() {
            parameters.push(self.convert_type(ty)?.into());
        }

        let function_type = if method.is_entry {
            self.context.i32_type().fn_type(&parameters, false)
        } else if method.return_type.is_void() {
            self.context.void_type().fn_type(&parameters, false)
        } else {
            self.convert_type(&method.return_type)?
                .fn_type(&parameters, false)
        };

        let value = self.create_function_proto(&method.symbol_name(), function_type);
        self.functions.insert(
            method_symbol(&class.name, &method.name),
            FunctionEntry {
                value,
                parameters: method.parameters.iter().map(|(_, ty)| ty.clone()).collect(),
                return_type: method.return_type.clone(),
                is_entry: method.is_entry,
            },
        );
        Ok(())
    }

    /// Declares every constructor and method before any body is generated so
    /// that calls can refer to functions defined later.
    fn declare_functions(&mut self, classes: &[TypedClass]) -> Result<(), Error> {
        for class in classes {
            let constructor_type = self
                .class_struct(&class.name)?
                .ptr_type(AddressSpace::default())
                .fn_type(&[], false);
            let value = self.create_function_proto(&constructor_symbol(&class.name), constructor_type);
            self.functions.insert(
                constructor_symbol(&class.name),
                FunctionEntry {
                    value,
                    parameters: vec![],
                    return_type: Type::class(&class.name),
                    is_entry: false,
                },
            );

            for method in class.methods.iter() {
                self.declare_method(class, method)?;
            }
        }
        Ok(())
    }

    /// Positions the builder in a fresh entry block and resets per-function state.
    fn begin_function(&mut self, function: FunctionValue<'a>) {
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);
        self.named_allocas.clear();
        self.this_value = None;
    }

    /// Generates `Class.new`: allocates the object and initialises its fields.
    fn gen_constructor(&mut self, class: &TypedClass) -> Result<(), Error> {
        let function = self.function(&constructor_symbol(&class.name))?.value;
        self.begin_function(function);
        self.return_type = Type::class(&class.name);
        self.in_entry = false;

        let struct_type = self.class_struct(&class.name)?;
        let size = struct_type
            .size_of()
            .ok_or_else(|| Error::internal(format!("class '{}' has no size", class.name)))?;
        let raw = build_malloc(self, size, "object")?;
        let object = self
            .builder
            .build_pointer_cast(raw, struct_type.ptr_type(AddressSpace::default()), "this")?;
        self.this_value = Some(object);

        for (index, field) in class.fields.iter().enumerate() {
            let value = gen_field_value(self, field)?;
            let slot = self
                .builder
                .build_struct_gep(object, index as u32, &field.name)?;
            self.builder.build_store(slot, value)?;
        }

        self.builder.build_return(Some(&object))?;
        Ok(())
    }

    fn gen_method(&mut self, class: &TypedClass, method: &TypedFunction) -> Result<(), Error> {
        let function = self.function(&method_symbol(&class.name, &method.name))?.value;
        self.begin_function(function);
        self.return_type = method.return_type.clone();
        self.in_entry = method.is_entry;

        let mut params = function.get_param_iter();
        if !method.is_entry {
            let this = params
                .next()
                .ok_or_else(|| Error::internal("method is missing its 'this' parameter"))?;
            this.set_name("this");
            self.this_value = Some(this.into_pointer_value());
        }

        for ((name, ty), value) in method.parameters.iter().zip(params) {
            value.set_name(name);
            let alloca = self.build_entry_alloca(self.convert_type(ty)?, name)?;
            self.builder.build_store(alloca, value)?;
            self.named_allocas.insert(name.clone(), alloca);
        }

        gen_block(self, &method.body)?;

        if !is_terminated(self) {
            build_default_return(self)?;
        }

        tracing::debug!(function = %method.symbol_name(), "lowered method");
        Ok(())
    }

    /// Lowers the whole program into the module.
    fn gen(&mut self, program: &TypedProgram) -> Result<(), Error> {
        if self.options.native_target {
            self.set_native_target()?;
        }

        declare_runtime(self);
        self.declare_classes(&program.classes)?;
        self.declare_functions(&program.classes)?;

        for class in program.classes.iter() {
            self.gen_constructor(class)?;
            for method in class.methods.iter() {
                self.gen_method(class, method)?;
            }
        }

        if self.options.verify {
            self.module.verify().map_err(|error| {
                Error::internal(format!("module verification failed: {}", error))
            })?;
        }
        Ok(())
    }
}

/// Lowers a validated program to an LLVM module.
///
/// The returned compiler owns the module, ready to be printed or saved for
/// the external backend.
#[tracing::instrument(skip_all, fields(module = %options.module_name))]
pub fn compile<'a>(
    program: &TypedProgram,
    context: &'a Context,
    options: &CompilerOptions,
) -> Result<Compiler<'a>, Error> {
    let started = Instant::now();
    let mut compiler = Compiler::new(context, options.clone());

    compiler.gen(program)?;

    tracing::info!(
        functions = compiler.functions.len(),
        elapsed = ?started.elapsed(),
        "code generation finished"
    );
    Ok(compiler)
}
