//! Per-unit compilation settings.

use std::path::PathBuf;

use inkwell::OptimizationLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum OptLevel {
    #[default]
    O0,
    O1,
    O2,
    O3,
}

impl From<OptLevel> for OptimizationLevel {
    fn from(level: OptLevel) -> Self {
        match level {
            OptLevel::O0 => OptimizationLevel::None,
            OptLevel::O1 => OptimizationLevel::Less,
            OptLevel::O2 => OptimizationLevel::Default,
            OptLevel::O3 => OptimizationLevel::Aggressive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Name of the LLVM module.
    pub module_name: String,
    pub opt_level: OptLevel,
    /// Writes the optimized IR here when set.
    pub emit_ir: Option<PathBuf>,
    /// Executable path produced by linking.
    pub output: Option<PathBuf>,
    pub llc: String,
    pub linker: String,
    pub linker_args: Vec<String>,
    /// Compile functions that are declared but never called.
    pub emit_uncalled: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            module_name: "main".to_string(),
            opt_level: OptLevel::default(),
            emit_ir: None,
            output: None,
            llc: "llc".to_string(),
            linker: "clang".to_string(),
            linker_args: Vec::new(),
            emit_uncalled: true,
        }
    }
}

impl CompileOptions {
    pub fn with_module_name(mut self, name: &str) -> Self {
        self.module_name = name.to_string();
        self
    }

    pub fn with_opt_level(mut self, level: OptLevel) -> Self {
        self.opt_level = level;
        self
    }

    pub fn with_emit_ir(mut self, path: PathBuf) -> Self {
        self.emit_ir = Some(path);
        self
    }

    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output = Some(path);
        self
    }

    pub fn with_llc(mut self, llc: &str) -> Self {
        self.llc = llc.to_string();
        self
    }

    pub fn with_linker(mut self, linker: &str, args: &[&str]) -> Self {
        self.linker = linker.to_string();
        self.linker_args = args.iter().map(|arg| arg.to_string()).collect();
        self
    }

    pub fn with_emit_uncalled(mut self, emit: bool) -> Self {
        self.emit_uncalled = emit;
        self
    }
}
