//! External compiler invocations.
//!
//! Compilers are located once per run and driven through argument
//! vectors, never a shell string. Child output is discarded; the exit
//! status and the presence of the expected output decide the outcome.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use log::debug;
use thiserror::Error;

/// Source extensions the pipeline accepts for compilation to IR.
pub const SOURCE_EXTENSIONS: &[&str] = &["C", "c", "cc", "cxx", "cpp", "CPP", "c++", "cp"];
pub const IR_EXTENSION: &str = "ll";

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("no usable {0} compiler on PATH")]
    CompilerMissing(&'static str),
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {status}")]
    Failed { command: String, status: ExitStatus },
    #[error("expected output {0} was not produced")]
    MissingOutput(PathBuf),
}

/// Locations of the C and C++ compilers, resolved once per run.
pub struct Toolchain {
    cc: PathBuf,
    cxx: PathBuf,
}

impl Toolchain {
    pub fn locate() -> Result<Self, ToolchainError> {
        let cc = which::which("clang").map_err(|_| ToolchainError::CompilerMissing("C"))?;
        let cxx = which::which("clang++").map_err(|_| ToolchainError::CompilerMissing("C++"))?;
        debug!("toolchain: {} / {}", cc.display(), cxx.display());
        Ok(Self { cc, cxx })
    }

    /// Whether `path` is something the pipeline can take as input.
    pub fn is_compilable(path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        extension == IR_EXTENSION || SOURCE_EXTENSIONS.contains(&extension)
    }

    pub fn is_ir(path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(IR_EXTENSION)
    }

    /// `<compiler> -O0 -emit-llvm <src> -S -o <ir>`
    pub fn compile_to_ir(&self, source: &Path, ir: &Path) -> Result<(), ToolchainError> {
        let compiler = if is_c_source(source) { &self.cc } else { &self.cxx };
        let mut command = Command::new(compiler);
        command
            .arg("-O0")
            .arg("-emit-llvm")
            .arg(source)
            .arg("-S")
            .arg("-o")
            .arg(ir);
        run(command)?;
        if !ir.exists() {
            return Err(ToolchainError::MissingOutput(ir.to_path_buf()));
        }
        Ok(())
    }

    /// Link target and driver IR into an instrumented fuzzer binary.
    pub fn link_fuzzer(
        &self,
        target_ir: &Path,
        driver_ir: &Path,
        fuzzer: &Path,
    ) -> Result<(), ToolchainError> {
        let mut command = Command::new(&self.cxx);
        command
            .arg("-O0")
            .arg("-g")
            .arg("-fno-omit-frame-pointer")
            .arg("-fsanitize=address,fuzzer")
            .arg("-fsanitize-coverage=trace-cmp,trace-gep,trace-div")
            .arg(target_ir)
            .arg(driver_ir)
            .arg("-o")
            .arg(fuzzer);
        run(command)?;
        if !fuzzer.exists() {
            return Err(ToolchainError::MissingOutput(fuzzer.to_path_buf()));
        }
        Ok(())
    }
}

fn is_c_source(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("c"))
}

/// Run to completion with all child output discarded.
fn run(mut command: Command) -> Result<(), ToolchainError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let rendered = format!("{:?}", command);
    debug!("running {}", rendered);

    let status = command.status().map_err(|source| ToolchainError::Spawn {
        command: rendered.clone(),
        source,
    })?;
    if !status.success() {
        return Err(ToolchainError::Failed {
            command: rendered,
            status,
        });
    }
    Ok(())
}
