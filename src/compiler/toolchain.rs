//! Calls into the native toolchain.
//!
//! Both entry points run an external process and return its exit status.
//! A process that could not be started reports `-1`.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use inkwell::module::Module;
use log::{debug, warn};

/// Lowers the IR file `in_file` to a position independent object file.
///
/// `module` is the module `in_file` was printed from; only its name is used,
/// for logging.
///
/// # Arguments
///
/// * `module` - The module being lowered
/// * `in_file` - Path of the textual IR
/// * `out_file` - Path of the object file to produce
/// * `llc` - Name or path of the `llc` executable
///
/// # Returns
///
/// The exit status of `llc`.
pub fn compile_ir_to_obj(module: &Module, in_file: &Path, out_file: &Path, llc: &str) -> i32 {
    debug!(
        "lowering module `{}`: {} -> {}",
        module.get_name().to_string_lossy(),
        in_file.display(),
        out_file.display()
    );

    let mut command = Command::new(llc);
    command
        .arg("-filetype=obj")
        .arg("-relocation-model=pic")
        .arg(in_file)
        .arg("-o")
        .arg(out_file);

    run(command, llc)
}

/// Links object files into an executable.
///
/// # Returns
///
/// The exit status of the linker.
pub fn link_obj(in_files: &[PathBuf], out_file: &Path, linker: &str, extra_args: &[String]) -> i32 {
    debug!("linking {} object(s) into {}", in_files.len(), out_file.display());

    let mut command = Command::new(linker);
    command
        .arg("-fPIE")
        .arg("-pie")
        .arg("-o")
        .arg(out_file)
        .args(in_files)
        .args(extra_args);

    run(command, linker)
}

fn run(mut command: Command, tool: &str) -> i32 {
    match command.status() {
        Ok(status) => status.code().unwrap_or(-1),
        Err(err) => {
            warn!("failed to run `{}`: {}", tool, err);
            -1
        }
    }
}
