//! Single-source orchestration: one translation unit in, one directory of
//! fuzzers out.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};

use fuzzgen_analysis::FunctionDump;
use fuzzgen_harness::{extract_declaration, FuzzerGenerator, SourceFile};
use fuzzgen_passes::PassLauncher;

use crate::options::Options;
use crate::paths::{self, Garbage};
use crate::toolchain::{Toolchain, IR_EXTENSION};

pub struct SourceWrapper {
    source_path: PathBuf,
    ir_path: PathBuf,
    options: Options,
    toolchain: Toolchain,
    garbage: Garbage,
}

impl SourceWrapper {
    /// Validate the input and resolve the toolchain. Configuration errors
    /// fail the whole run here.
    pub fn new(input: PathBuf, options: Options) -> Result<Self> {
        let source_path = fs::canonicalize(&input)
            .with_context(|| format!("input file {} is not accessible", input.display()))?;
        if !Toolchain::is_compilable(&source_path) {
            bail!("input file {} cannot be compiled", source_path.display());
        }
        let toolchain = Toolchain::locate()?;
        let ir_path = source_path.with_extension(IR_EXTENSION);

        Ok(Self {
            source_path,
            ir_path,
            options,
            toolchain,
            garbage: Garbage::default(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        // Master IR for the whole translation unit.
        if Toolchain::is_ir(&self.source_path) {
            self.ir_path = self.source_path.clone();
        } else {
            info!("compiling {} to IR", self.source_path.display());
            self.toolchain
                .compile_to_ir(&self.source_path, &self.ir_path)?;
            self.garbage.register(&self.ir_path);
        }

        let launcher = PassLauncher::new(&self.ir_path);
        let dump = launcher.launch_analysis()?;
        if !dump.success {
            bail!("analysis failed for {}", self.source_path.display());
        }

        let declaration_source = self.declaration_source(&dump.source_file);
        let source = SourceFile::open(&declaration_source)?;
        let text = source.text()?;

        let results_dir = self.prepare_result_directory()?;

        let mut generated = 0usize;
        for function in &dump.standalone_functions {
            if function.arguments.is_empty() {
                info!("skipping {}: no arguments to fuzz", function.name);
                continue;
            }
            let Some(declaration) = extract_declaration(text, &function.name) else {
                warn!(
                    "skipping {}: declaration not recoverable from {}",
                    function.name,
                    declaration_source.display()
                );
                continue;
            };
            match generate_target(
                &self.toolchain,
                &self.ir_path,
                &results_dir,
                function,
                &declaration,
                self.options,
                &mut self.garbage,
            ) {
                Ok(()) => generated += 1,
                Err(error) => warn!("target {} failed: {:#}", function.name, error),
            }
        }

        info!(
            "{} fuzzer(s) generated under {}",
            generated,
            results_dir.display()
        );
        Ok(())
    }

    /// Where to look for declarations. For a ready-made IR input the
    /// recorded source file is the best bet, when it still exists.
    fn declaration_source(&self, recorded: &str) -> PathBuf {
        if Toolchain::is_ir(&self.source_path) && !recorded.is_empty() {
            let recorded = PathBuf::from(recorded);
            if recorded.exists() {
                return recorded;
            }
        }
        self.source_path.clone()
    }

    fn prepare_result_directory(&self) -> Result<PathBuf> {
        let results_dir = paths::result_directory(&self.source_path, self.options.random_names);
        if results_dir.exists() && !self.options.overwrite {
            bail!(
                "result directory {} already exists (use --overwrite)",
                results_dir.display()
            );
        }
        fs::create_dir_all(&results_dir)
            .with_context(|| format!("cannot create {}", results_dir.display()))?;
        Ok(results_dir)
    }
}

impl Drop for SourceWrapper {
    fn drop(&mut self) {
        if self.options.auto_delete {
            self.garbage.empty();
        }
    }
}

/// The per-target pipeline. Any failure removes the per-target directory;
/// the caller just moves on to the next target.
pub(crate) fn generate_target(
    toolchain: &Toolchain,
    master_ir: &Path,
    results_dir: &Path,
    function: &FunctionDump,
    declaration: &str,
    options: Options,
    garbage: &mut Garbage,
) -> Result<()> {
    let target_dir = paths::target_directory(results_dir, &function.name, options.random_names);
    fs::create_dir_all(&target_dir)
        .with_context(|| format!("cannot create {}", target_dir.display()))?;

    let outcome = build_target(toolchain, master_ir, &target_dir, function, declaration, garbage);
    if outcome.is_err() {
        let _ = fs::remove_dir_all(&target_dir);
    }
    outcome
}

fn build_target(
    toolchain: &Toolchain,
    master_ir: &Path,
    target_dir: &Path,
    function: &FunctionDump,
    declaration: &str,
    garbage: &mut Garbage,
) -> Result<()> {
    // Per-function copy of the master IR.
    let target_ir = target_dir.join(format!("{}.{}", function.name, IR_EXTENSION));
    fs::copy(master_ir, &target_ir)
        .with_context(|| format!("cannot copy master IR to {}", target_ir.display()))?;

    // Strip the copy down to the target.
    if !PassLauncher::new(&target_ir).launch_sanitizer(function)? {
        bail!("sanitizer could not isolate {}", function.name);
    }

    // Synthesize the driver.
    let Some(driver) = FuzzerGenerator::new(declaration, function).generate() else {
        bail!("signature of {} is not fuzzable", function.name);
    };

    let driver_source = target_dir.join(format!("fuzz_{}.cc", function.name));
    fs::write(&driver_source, &driver)
        .with_context(|| format!("cannot write {}", driver_source.display()))?;

    // Driver source to driver IR.
    let driver_ir = target_dir.join(format!("fuzz_{}.{}", function.name, IR_EXTENSION));
    toolchain.compile_to_ir(&driver_source, &driver_ir)?;

    // Align the driver's mangled declaration with the promoted symbol.
    if !PassLauncher::new(&driver_ir).launch_name_corrector(function)? {
        bail!("name correction failed for {}", function.name);
    }

    // Link the instrumented fuzzer.
    let fuzzer = target_dir.join("fuzzer");
    toolchain.link_fuzzer(&target_ir, &driver_ir, &fuzzer)?;

    garbage.register(&target_ir);
    garbage.register(&driver_source);
    garbage.register(&driver_ir);

    info!("fuzzer ready: {}", fuzzer.display());
    Ok(())
}
