//! Load → pass → verify → save, per on-disk IR file.
//!
//! Each launch parses the file into a fresh context, runs one pass and
//! writes the module back only when the pass succeeded. The failed deep
//! sanitize therefore never taints the on-disk master, which is exactly
//! what the shallow retry reloads.

use std::path::{Path, PathBuf};

use inkwell::context::Context;
use inkwell::memory_buffer::MemoryBuffer;
use inkwell::module::Module;
use log::{info, warn};
use thiserror::Error;

use fuzzgen_analysis::{FunctionDump, ModuleAnalyzer, ModuleDump};

use crate::corrector::NameCorrector;
use crate::sanitizer::Sanitizer;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to load IR from {path}: {message}")]
    Load { path: PathBuf, message: String },
    #[error("failed to write IR to {path}: {message}")]
    Store { path: PathBuf, message: String },
}

pub struct PassLauncher {
    ir_path: PathBuf,
}

impl PassLauncher {
    pub fn new(ir_path: impl Into<PathBuf>) -> Self {
        Self {
            ir_path: ir_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.ir_path
    }

    /// Parse the module and produce its dump; `success` carries the
    /// analysis outcome.
    pub fn launch_analysis(&self) -> Result<ModuleDump, LaunchError> {
        let context = Context::create();
        let module = self.load(&context)?;

        let mut analyzer = ModuleAnalyzer::new();
        let dump = analyzer.analyze(&module);
        analyzer.log_graphs();
        Ok(dump)
    }

    /// Deep sanitize, falling back to a shallow pass on a fresh copy when
    /// the verifier rejects the deep result.
    pub fn launch_sanitizer(&self, target: &FunctionDump) -> Result<bool, LaunchError> {
        let context = Context::create();

        info!("deep sanitization launched for {}", target.name);
        let module = self.load(&context)?;
        if Sanitizer::new(target, true).run(&module) {
            self.store(&module)?;
            return Ok(true);
        }

        warn!("deep sanitization for {} failed", target.name);
        info!("launching shallow sanitization for {}", target.name);

        // Start over from the on-disk master; the deep attempt only
        // mutated its in-memory copy.
        let fresh = self.load(&context)?;
        if Sanitizer::new(target, false).run(&fresh) {
            self.store(&fresh)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Align the driver module's mangled declaration with the plain target
    /// name.
    pub fn launch_name_corrector(&self, target: &FunctionDump) -> Result<bool, LaunchError> {
        let context = Context::create();
        let module = self.load(&context)?;

        if NameCorrector::new(target).run(&module) {
            self.store(&module)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn load<'ctx>(&self, context: &'ctx Context) -> Result<Module<'ctx>, LaunchError> {
        let buffer = MemoryBuffer::create_from_file(&self.ir_path).map_err(|error| {
            LaunchError::Load {
                path: self.ir_path.clone(),
                message: error.to_string(),
            }
        })?;
        context
            .create_module_from_ir(buffer)
            .map_err(|error| LaunchError::Load {
                path: self.ir_path.clone(),
                message: error.to_string(),
            })
    }

    fn store(&self, module: &Module<'_>) -> Result<(), LaunchError> {
        module
            .print_to_file(&self.ir_path)
            .map_err(|error| LaunchError::Store {
                path: self.ir_path.clone(),
                message: error.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    fn write_fixture(dir: &tempfile::TempDir) -> PathBuf {
        let context = Context::create();
        let module = context.create_module("fixture");
        module.set_source_file_name("fixture.c");
        let builder = context.create_builder();
        let void_fn = context.void_type().fn_type(&[], false);

        let leaf = module.add_function("leaf", void_fn, None);
        let entry = context.append_basic_block(leaf, "entry");
        builder.position_at_end(entry);
        builder.build_return(None).unwrap();

        let root = module.add_function("root", void_fn, None);
        let entry = context.append_basic_block(root, "entry");
        builder.position_at_end(entry);
        builder.build_call(leaf, &[], "").unwrap();
        builder.build_return(None).unwrap();

        let path = dir.path().join("fixture.ll");
        module.print_to_file(&path).unwrap();
        path
    }

    #[test]
    fn analysis_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir);

        let dump = PassLauncher::new(&path).launch_analysis().unwrap();
        assert!(dump.success);
        assert_eq!(dump.standalone_count, 1);
        assert_eq!(dump.standalone_functions[0].name, "leaf");
    }

    #[test]
    fn sanitizer_rewrites_the_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir);

        let launcher = PassLauncher::new(&path);
        let dump = launcher.launch_analysis().unwrap();
        let target = dump.standalone_functions[0].clone();

        assert!(launcher.launch_sanitizer(&target).unwrap());

        // Reload and confirm only the target survived.
        let context = Context::create();
        let buffer = MemoryBuffer::create_from_file(&path).unwrap();
        let module = context.create_module_from_ir(buffer).unwrap();
        assert!(module.get_function("leaf").is_some());
        assert!(module.get_function("root").is_none());
    }

    #[test]
    fn load_failure_is_reported() {
        let launcher = PassLauncher::new("/nonexistent/never.ll");
        assert!(launcher.launch_analysis().is_err());
    }
}
