//! Prelude loading.
//!
//! The prelude is a ready-made IR module providing runtime functions. It is
//! merged into the working module before user code compiles, and every
//! function it defines becomes callable by name.

use std::path::PathBuf;

use inkwell::{context::Context, memory_buffer::MemoryBuffer, module::Module};

/// Produces the prelude module inside `context`.
pub trait PreludeLoader {
    fn load<'ctx>(&self, context: &'ctx Context) -> Result<Module<'ctx>, String>;
}

/// A prelude given as textual IR.
#[derive(Debug, Clone)]
pub struct IrSourcePrelude {
    pub name: String,
    pub source: String,
}

impl IrSourcePrelude {
    pub fn new(name: &str, source: &str) -> Self {
        IrSourcePrelude {
            name: name.to_string(),
            source: source.to_string(),
        }
    }
}

impl PreludeLoader for IrSourcePrelude {
    fn load<'ctx>(&self, context: &'ctx Context) -> Result<Module<'ctx>, String> {
        let buffer =
            MemoryBuffer::create_from_memory_range_copy(self.source.as_bytes(), &self.name);
        context
            .create_module_from_ir(buffer)
            .map_err(|err| err.to_string())
    }
}

/// A prelude read from a `.ll` or `.bc` file.
#[derive(Debug, Clone)]
pub struct IrFilePrelude {
    pub path: PathBuf,
}

impl IrFilePrelude {
    pub fn new(path: PathBuf) -> Self {
        IrFilePrelude { path }
    }
}

impl PreludeLoader for IrFilePrelude {
    fn load<'ctx>(&self, context: &'ctx Context) -> Result<Module<'ctx>, String> {
        let buffer = MemoryBuffer::create_from_file(&self.path).map_err(|err| {
            format!("failed to read prelude {}: {}", self.path.display(), err)
        })?;
        context
            .create_module_from_ir(buffer)
            .map_err(|err| err.to_string())
    }
}
