//! Main compiler module.
//!
//! This module contains the core Compiler structure and drives a compilation
//! unit from a parsed statement block to LLVM IR, and from there to object
//! files and an executable. It owns the LLVM module and builder, the scope
//! stack, the function registry and the list of recorded diagnostics.

use std::{
    collections::HashMap,
    fmt::{self, Display},
    path::{Path, PathBuf},
    time::Instant,
};

use inkwell::{
    basic_block::BasicBlock,
    builder::Builder,
    context::Context,
    module::{Linkage, Module},
    passes::PassManager,
    targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetMachine},
    values::FunctionValue,
};
use log::{debug, info, trace, warn};

use crate::{
    ast::{
        ast::{Block, Node, NodeKind},
        statements::{DataDecl, ExtNode, FuncDecl},
        types::Modifier,
    },
    errors::errors::{Error, ErrorImpl, PipelineError},
    parser::SourceParser,
    Span,
};

use super::{
    options::{CompileOptions, OptLevel},
    prelude::PreludeLoader,
    registry::{FnEntry, FunctionRegistry},
    scope::{ScopeStack, Variable},
    toolchain::{compile_ir_to_obj, link_obj},
    types::{llvm_to_type, Bail, CompileResult, DataType, FnSig, Type, TypedValue},
};

/// Stages of a compilation unit, in order. A unit never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Empty,
    PreludeMerged,
    UserCodeCompiled,
    Optimized,
    Emitted,
    Linked,
}

impl PipelineState {
    fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Empty => Some(PipelineState::PreludeMerged),
            PipelineState::PreludeMerged => Some(PipelineState::UserCodeCompiled),
            PipelineState::UserCodeCompiled => Some(PipelineState::Optimized),
            PipelineState::Optimized => Some(PipelineState::Emitted),
            PipelineState::Emitted => Some(PipelineState::Linked),
            PipelineState::Linked => None,
        }
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Empty => "empty",
            PipelineState::PreludeMerged => "prelude-merged",
            PipelineState::UserCodeCompiled => "user-code-compiled",
            PipelineState::Optimized => "optimized",
            PipelineState::Emitted => "emitted",
            PipelineState::Linked => "linked",
        };
        write!(f, "{}", name)
    }
}

/// The function whose body is being compiled.
#[derive(Debug, Clone)]
pub(crate) struct FnContext<'ctx> {
    pub name: String,
    pub value: FunctionValue<'ctx>,
    pub ret: Type,
    pub span: Span,
}

/// The state of one compilation unit.
///
/// # Type Parameters
///
/// * `'ctx` - Lifetime of the LLVM context
/// * `'ast` - Lifetime of the syntax tree being compiled
pub struct Compiler<'ctx, 'ast> {
    /// Reference to the LLVM context
    pub context: &'ctx Context,
    /// The LLVM module being built
    pub module: Module<'ctx>,
    /// The LLVM IR builder
    pub builder: Builder<'ctx>,
    pub options: CompileOptions,

    pub scopes: ScopeStack<'ctx>,
    pub functions: FunctionRegistry<'ctx, 'ast>,
    /// Declared data records by name
    pub data_types: HashMap<String, DataType<'ctx>>,
    /// Module names requested by import statements, in order
    pub imports: Vec<String>,

    pub(crate) current_fn: Option<FnContext<'ctx>>,
    /// Blocks only reachable through code following a return
    pub(crate) dead_blocks: Vec<BasicBlock<'ctx>>,

    errors: Vec<Error>,
    /// Sticky: once set, no later stage produces output
    err_flag: bool,
    state: PipelineState,
}

impl<'ctx, 'ast> Compiler<'ctx, 'ast> {
    /// Creates a compiler with an empty module targeting the host.
    pub fn new(context: &'ctx Context, options: CompileOptions) -> Self {
        let compiler = Compiler {
            context,
            module: context.create_module(&options.module_name),
            builder: context.create_builder(),
            options,
            scopes: ScopeStack::new(),
            functions: FunctionRegistry::new(),
            data_types: HashMap::new(),
            imports: Vec::new(),
            current_fn: None,
            dead_blocks: Vec::new(),
            errors: Vec::new(),
            err_flag: false,
            state: PipelineState::Empty,
        };
        compiler.configure_target();
        compiler
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.err_flag
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Records a diagnostic at `span` and returns the error value.
    pub fn comp_err(&mut self, error: ErrorImpl, span: &Span) -> TypedValue<'ctx> {
        debug!("{}: {}", span.start, error);
        self.errors.push(Error::new(error, span.start));
        self.err_flag = true;
        TypedValue::error()
    }

    /// Turns the outcome of compiling a node into its value, recording any
    /// failure not yet reported against `span`.
    pub fn finish(&mut self, result: CompileResult<'ctx>, span: &Span) -> TypedValue<'ctx> {
        match result {
            Ok(value) => value,
            Err(Bail::Reported) => TypedValue::error(),
            Err(Bail::Error(error)) => self.comp_err(error, span),
        }
    }

    /// Reports `bail` against `span` if needed; the result is always `Reported`.
    pub fn reported(&mut self, bail: Bail, span: &Span) -> Bail {
        if let Bail::Error(error) = bail {
            self.comp_err(error, span);
        }
        Bail::Reported
    }

    fn configure_target(&self) {
        if let Err(err) = Target::initialize_native(&InitializationConfig::default()) {
            warn!("failed to initialize the native target: {}", err);
            return;
        }

        let triple = TargetMachine::get_default_triple();
        let target = match Target::from_triple(&triple) {
            Ok(target) => target,
            Err(err) => {
                warn!("no target for {:?}: {}", triple, err);
                return;
            }
        };

        match target.create_target_machine(
            &triple,
            "generic",
            "",
            self.options.opt_level.into(),
            RelocMode::PIC,
            CodeModel::Default,
        ) {
            Some(machine) => {
                self.module.set_triple(&triple);
                self.module
                    .set_data_layout(&machine.get_target_data().get_data_layout());
            }
            None => warn!("failed to create a target machine for {:?}", triple),
        }
    }

    fn transition(&self, to: PipelineState) -> Result<(), PipelineError> {
        if self.err_flag {
            return Err(PipelineError::Aborted {
                errors: self.errors.len(),
            });
        }

        let allowed = match (self.state, to) {
            (PipelineState::Empty, PipelineState::UserCodeCompiled) => true,
            (from, to) => from.next() == Some(to),
        };
        if !allowed {
            return Err(PipelineError::OutOfOrder {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }

        trace!("pipeline: {} -> {}", self.state, to);
        Ok(())
    }

    /// Links the prelude into the working module and makes its functions callable.
    pub fn merge_prelude(&mut self, loader: &dyn PreludeLoader) -> Result<(), PipelineError> {
        self.transition(PipelineState::PreludeMerged)?;
        let start = Instant::now();

        let prelude = loader.load(self.context).map_err(|err| {
            self.err_flag = true;
            PipelineError::Prelude(err)
        })?;
        self.module.link_in_module(prelude).map_err(|err| {
            self.err_flag = true;
            PipelineError::Prelude(err.to_string())
        })?;

        let registered = self.register_module_functions();
        self.state = PipelineState::PreludeMerged;
        info!(
            "merged prelude ({} functions) in {:?}",
            registered,
            start.elapsed()
        );
        Ok(())
    }

    /// Registers every function already in the module, recovering its
    /// signature from the IR types.
    fn register_module_functions(&mut self) -> usize {
        let mut registered = 0;
        for function in self.module.get_functions() {
            let name = function.get_name().to_string_lossy().into_owned();
            if name.starts_with("llvm.") || self.functions.contains(&name) {
                continue;
            }

            let fn_type = function.get_type();
            let ret = match fn_type.get_return_type() {
                Some(ret) => llvm_to_type(ret),
                None => Some(Type::VOID),
            };
            let params = function
                .get_params()
                .iter()
                .map(|param| llvm_to_type(param.get_type()))
                .collect::<Option<Vec<Type>>>();

            match (ret, params) {
                (Some(ret), Some(params)) => {
                    let sig = FnSig {
                        ret,
                        params,
                        varargs: fn_type.is_var_arg(),
                    };
                    self.functions.define(
                        &name,
                        FnEntry {
                            value: function,
                            sig,
                        },
                    );
                    registered += 1;
                }
                _ => debug!("skipping `{}`: signature has no language type", name),
            }
        }
        registered
    }

    /// Compiles the root block of the unit.
    ///
    /// Top level statements go into `i32 main()`. After the walk, every
    /// function that was declared but never called is compiled as well.
    pub fn compile(&mut self, root: &'ast Block) -> Result<(), PipelineError> {
        self.transition(PipelineState::UserCodeCompiled)?;
        let start = Instant::now();

        self.begin_entry(&root.span);
        self.scopes.enter_scope();
        self.compile_block_body(root);
        self.finish_function();
        self.scopes.exit_scope();
        self.current_fn = None;

        if self.options.emit_uncalled {
            while let Some((symbol, decl)) = self.functions.next_pending() {
                trace!("compiling uncalled function `{}`", symbol);
                // Failures are already recorded.
                let _ = self.compile_fn(&symbol, decl);
            }
        }

        info!(
            "compiled `{}` in {:?} with {} error(s)",
            self.options.module_name,
            start.elapsed(),
            self.errors.len()
        );

        if self.err_flag {
            return Err(PipelineError::Aborted {
                errors: self.errors.len(),
            });
        }
        self.state = PipelineState::UserCodeCompiled;
        Ok(())
    }

    fn begin_entry(&mut self, span: &Span) {
        let fn_type = self.context.i32_type().fn_type(&[], false);
        let main = match self.module.get_function("main") {
            Some(existing) if existing.count_basic_blocks() == 0 => existing,
            _ => self
                .module
                .add_function("main", fn_type, Some(Linkage::External)),
        };

        self.functions.define(
            "main",
            FnEntry {
                value: main,
                sig: FnSig {
                    ret: Type::I32,
                    params: vec![],
                    varargs: false,
                },
            },
        );

        let entry = self.context.append_basic_block(main, "entry");
        self.builder.position_at_end(entry);
        self.current_fn = Some(FnContext {
            name: "main".to_string(),
            value: main,
            ret: Type::I32,
            span: *span,
        });
    }

    /// Compiles the statements of `block` into the current frame.
    ///
    /// Declarations are registered first so they can be used before the
    /// statement that declares them. A failing statement does not stop the
    /// walk. The value of the block is the value of its last statement.
    pub fn compile_block_body(&mut self, block: &'ast Block) -> TypedValue<'ctx> {
        self.hoist(block);

        let mut last = TypedValue::void();
        for node in block.iter() {
            last = node.compile(self);
        }
        last
    }

    fn hoist(&mut self, block: &'ast Block) {
        let declarations: Vec<&'ast Node> =
            block.iter().filter(|node| node.is_declaration()).collect();

        for &node in &declarations {
            if let NodeKind::DataDecl(decl) = &node.kind {
                self.declare_data(decl, &node.span);
            }
        }
        for &node in &declarations {
            if let NodeKind::Ext(ext) = &node.kind {
                self.declare_extension(ext, &node.span);
            }
        }
        for &node in &declarations {
            if let NodeKind::FuncDecl(decl) = &node.kind {
                self.declare_function(&decl.name, decl, &node.span);
            }
        }
    }

    fn declare_data(&mut self, decl: &'ast DataDecl, span: &Span) {
        if self.data_types.contains_key(&decl.name) {
            self.comp_err(
                ErrorImpl::TypeAlreadyDeclared {
                    type_: decl.name.clone(),
                },
                span,
            );
            return;
        }

        // Registered before its fields resolve so a field can point back at the record.
        let llvm = self.context.opaque_struct_type(&decl.name);
        self.data_types.insert(
            decl.name.clone(),
            DataType {
                name: decl.name.clone(),
                fields: vec![],
                llvm,
            },
        );

        let mut fields = Vec::with_capacity(decl.field_count());
        let mut field_types = Vec::with_capacity(decl.field_count());
        let mut failed = false;
        for field in decl.fields.iter() {
            let resolved = self
                .resolve_type(&field.type_expr)
                .and_then(|ty| self.llvm_type(&ty).map(|llvm| (ty, llvm)));
            match resolved {
                Ok((ty, llvm)) => {
                    fields.push((field.name.clone(), ty));
                    field_types.push(llvm);
                }
                Err(err) => {
                    self.comp_err(err, &field.span);
                    failed = true;
                }
            }
        }

        if failed {
            self.data_types.remove(&decl.name);
            return;
        }

        llvm.set_body(&field_types, false);
        if let Some(data) = self.data_types.get_mut(&decl.name) {
            data.fields = fields;
        }
        trace!("declared data `{}`", decl.name);
    }

    fn declare_extension(&mut self, ext: &'ast ExtNode, span: &Span) {
        let target = match self.resolve_type(&ext.type_expr) {
            Ok(target) => target,
            Err(err) => {
                self.comp_err(err, span);
                return;
            }
        };

        for method in ext.methods.iter() {
            let symbol = format!("{}_{}", target.mangled(), method.name);
            self.declare_function(&symbol, method, &method.span);
        }
    }

    fn declare_function(&mut self, symbol: &str, decl: &'ast FuncDecl, span: &Span) {
        // A body-less function already in the module may be given a body.
        let replaceable = self
            .functions
            .get_defined(symbol)
            .is_some_and(|entry| entry.value.count_basic_blocks() == 0);
        if replaceable {
            self.functions.forget_defined(symbol);
        }

        if let Err(err) = self.functions.declare(symbol, decl) {
            self.comp_err(err, span);
        }
    }

    /// Finds the function called `name`, compiling it on first use.
    pub fn resolve_function(&mut self, name: &str) -> CompileResult<'ctx, FnEntry<'ctx>> {
        if let Some(entry) = self.functions.get_defined(name) {
            return Ok(entry.clone());
        }

        if let Some(decl) = self.functions.take_declared(name) {
            return self.compile_fn(name, decl);
        }

        if self.functions.is_failed(name) {
            return Err(Bail::Reported);
        }

        Err(ErrorImpl::FunctionNotDeclared {
            function: name.to_string(),
        }
        .into())
    }

    fn fn_sig(&self, decl: &FuncDecl) -> Result<FnSig, ErrorImpl> {
        let ret = match &decl.return_type {
            Some(type_expr) => self.resolve_type(type_expr)?,
            None => Type::VOID,
        };
        let params = decl
            .params
            .iter()
            .map(|param| self.resolve_type(&param.type_expr))
            .collect::<Result<Vec<Type>, ErrorImpl>>()?;

        Ok(FnSig {
            ret,
            params,
            varargs: decl.varargs,
        })
    }

    /// Emits `decl` under `symbol`. Any failure is recorded before returning.
    fn compile_fn(&mut self, symbol: &str, decl: &'ast FuncDecl) -> CompileResult<'ctx, FnEntry<'ctx>> {
        debug!("compiling function `{}`", symbol);

        let signature = self
            .fn_sig(decl)
            .and_then(|sig| self.fn_type(&sig).map(|fn_type| (sig, fn_type)));
        let (sig, fn_type) = match signature {
            Ok(signature) => signature,
            Err(err) => {
                self.functions.mark_failed(symbol);
                self.comp_err(err, &decl.span);
                return Err(Bail::Reported);
            }
        };

        let private = decl.body.is_some() && decl.has_modifier(Modifier::Pri);
        let linkage = if private {
            Linkage::Internal
        } else {
            Linkage::External
        };

        let value = match self.module.get_function(symbol) {
            Some(existing)
                if existing.count_basic_blocks() == 0 && existing.get_type() == fn_type =>
            {
                existing.set_linkage(linkage);
                existing
            }
            Some(_) => {
                self.functions.mark_failed(symbol);
                self.comp_err(
                    ErrorImpl::FunctionAlreadyDeclared {
                        function: symbol.to_string(),
                    },
                    &decl.span,
                );
                return Err(Bail::Reported);
            }
            None => self.module.add_function(symbol, fn_type, Some(linkage)),
        };

        let entry = FnEntry { value, sig };
        // Defined before the body so recursive calls resolve.
        self.functions.define(symbol, entry.clone());

        if let Some(body) = &decl.body {
            self.compile_fn_body(symbol, decl, body, &entry);
        }

        Ok(entry)
    }

    fn compile_fn_body(&mut self, symbol: &str, decl: &'ast FuncDecl, body: &'ast Block, entry: &FnEntry<'ctx>) {
        let saved_block = self.builder.get_insert_block();
        let saved_fn = self.current_fn.take();
        let saved_frames = self.scopes.take_frames();

        let block = self.context.append_basic_block(entry.value, "entry");
        self.builder.position_at_end(block);
        self.current_fn = Some(FnContext {
            name: symbol.to_string(),
            value: entry.value,
            ret: entry.sig.ret.clone(),
            span: decl.span,
        });

        self.scopes.enter_scope();
        for (param, (value, ty)) in decl
            .params
            .iter()
            .zip(entry.value.get_param_iter().zip(entry.sig.params.iter()))
        {
            self.scopes
                .bind(&param.name, Variable::immutable(value, ty.clone()));
        }
        self.compile_block_body(body);
        self.finish_function();
        self.scopes.exit_scope();

        self.scopes.restore_frames(saved_frames);
        self.current_fn = saved_fn;
        if let Some(block) = saved_block {
            self.builder.position_at_end(block);
        }
    }

    /// Terminates the block the builder is in when the function body ends.
    fn finish_function(&mut self) {
        let Some(current) = self.current_fn.clone() else {
            return;
        };
        let Some(block) = self.builder.get_insert_block() else {
            return;
        };
        if block.get_terminator().is_some() {
            return;
        }

        let result = if self.dead_blocks.contains(&block) {
            self.builder.build_unreachable()
        } else if current.ret.is_void() {
            self.builder.build_return(None)
        } else if current.name == "main" {
            self.builder
                .build_return(Some(&self.context.i32_type().const_zero()))
        } else {
            self.comp_err(
                ErrorImpl::MissingReturn {
                    function: current.name.clone(),
                },
                &current.span,
            );
            self.builder.build_unreachable()
        };

        if let Err(err) = result {
            self.comp_err(err.into(), &current.span);
        }
    }

    pub(crate) fn current_function(&self) -> CompileResult<'ctx, FunctionValue<'ctx>> {
        self.current_fn
            .as_ref()
            .map(|current| current.value)
            .ok_or_else(|| {
                Bail::Error(ErrorImpl::Builder {
                    message: "no function is being compiled".to_string(),
                })
            })
    }

    pub(crate) fn is_dead(&self, block: BasicBlock<'ctx>) -> bool {
        self.dead_blocks.contains(&block)
    }

    /// Whether the builder's current block can still be reached and is open.
    pub(crate) fn falls_through(&self) -> bool {
        self.builder
            .get_insert_block()
            .is_some_and(|block| block.get_terminator().is_none() && !self.is_dead(block))
    }

    /// Verifies the module and runs the optimisation passes for the configured level.
    pub fn optimize(&mut self) -> Result<(), PipelineError> {
        self.transition(PipelineState::Optimized)?;
        let start = Instant::now();

        if let Err(err) = self.module.verify() {
            self.err_flag = true;
            return Err(PipelineError::Verify(err.to_string()));
        }

        let passes: PassManager<Module<'ctx>> = PassManager::create(());
        if self.options.opt_level >= OptLevel::O1 {
            passes.add_promote_memory_to_register_pass();
            passes.add_instruction_combining_pass();
            passes.add_reassociate_pass();
            passes.add_gvn_pass();
            passes.add_cfg_simplification_pass();
        }
        passes.add_verifier_pass();
        passes.run_on(&self.module);

        if let Some(path) = &self.options.emit_ir {
            self.module
                .print_to_file(path)
                .map_err(|err| PipelineError::Io(err.to_string()))?;
        }

        self.state = PipelineState::Optimized;
        info!(
            "optimized at {:?} in {:?}",
            self.options.opt_level,
            start.elapsed()
        );
        Ok(())
    }

    /// Writes the IR next to `obj_path` and lowers it to an object file.
    pub fn emit_object(&mut self, obj_path: &Path) -> Result<PathBuf, PipelineError> {
        self.transition(PipelineState::Emitted)?;
        let start = Instant::now();

        let ir_path = obj_path.with_extension("ll");
        self.module
            .print_to_file(&ir_path)
            .map_err(|err| PipelineError::Io(err.to_string()))?;

        let status = compile_ir_to_obj(&self.module, &ir_path, obj_path, &self.options.llc);
        if status != 0 {
            return Err(PipelineError::Toolchain {
                tool: self.options.llc.clone(),
                status,
            });
        }

        self.state = PipelineState::Emitted;
        info!("emitted {} in {:?}", obj_path.display(), start.elapsed());
        Ok(obj_path.to_path_buf())
    }

    /// Links `objects` into the executable `out`.
    pub fn link(&mut self, objects: &[PathBuf], out: &Path) -> Result<(), PipelineError> {
        self.transition(PipelineState::Linked)?;
        let start = Instant::now();

        let status = link_obj(objects, out, &self.options.linker, &self.options.linker_args);
        if status != 0 {
            return Err(PipelineError::Toolchain {
                tool: self.options.linker.clone(),
                status,
            });
        }

        self.state = PipelineState::Linked;
        info!("linked {} in {:?}", out.display(), start.elapsed());
        Ok(())
    }

    fn failure(&self, cause: PipelineError) -> BuildFailure {
        BuildFailure {
            errors: self.errors.clone(),
            cause,
        }
    }
}

/// What a successful build produced.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// The optimized module as textual IR.
    pub ir: String,
    pub object: Option<PathBuf>,
    pub executable: Option<PathBuf>,
}

/// A failed build: the diagnostics recorded so far and the stage that stopped.
#[derive(Debug, thiserror::Error)]
#[error("{cause}")]
pub struct BuildFailure {
    pub errors: Vec<Error>,
    pub cause: PipelineError,
}

/// Parses, compiles and optimizes `path`.
///
/// When `options.output` is set the unit is also lowered to an object file
/// next to it and linked into an executable.
///
/// # Arguments
///
/// * `context` - The LLVM context owning every module of the unit
/// * `parser` - Turns the source file into a statement block
/// * `path` - The source file
/// * `prelude` - Module to merge before user code, if any
/// * `options` - Compilation settings
pub fn compile_file(
    context: &Context,
    parser: &dyn SourceParser,
    path: &Path,
    prelude: Option<&dyn PreludeLoader>,
    options: CompileOptions,
) -> Result<Artifacts, BuildFailure> {
    let root = parser.parse_file(path).map_err(|err| BuildFailure {
        errors: vec![err.into()],
        cause: PipelineError::Aborted { errors: 1 },
    })?;

    let output = options.output.clone();
    let mut compiler = Compiler::new(context, options);

    if let Some(prelude) = prelude {
        compiler
            .merge_prelude(prelude)
            .map_err(|cause| compiler.failure(cause))?;
    }
    compiler
        .compile(&root)
        .map_err(|cause| compiler.failure(cause))?;
    compiler
        .optimize()
        .map_err(|cause| compiler.failure(cause))?;

    let mut artifacts = Artifacts {
        ir: compiler.module.print_to_string().to_string(),
        object: None,
        executable: None,
    };

    if let Some(output) = output {
        let object = compiler
            .emit_object(&output.with_extension("o"))
            .map_err(|cause| compiler.failure(cause))?;
        compiler
            .link(std::slice::from_ref(&object), &output)
            .map_err(|cause| compiler.failure(cause))?;
        artifacts.object = Some(object);
        artifacts.executable = Some(output);
    }

    Ok(artifacts)
}
