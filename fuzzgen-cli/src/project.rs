//! Project mode: a pre-linked IR module plus the list of sources it came
//! from.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use fuzzgen_harness::{extract_declaration, SourceFile};
use fuzzgen_passes::PassLauncher;

use crate::options::Options;
use crate::paths::{self, Garbage};
use crate::toolchain::Toolchain;
use crate::wrapper::generate_target;

pub struct ProjectWrapper {
    ir_path: PathBuf,
    sources: Vec<PathBuf>,
    options: Options,
    toolchain: Toolchain,
    garbage: Garbage,
}

impl ProjectWrapper {
    pub fn new(input: PathBuf, sources_list: PathBuf, options: Options) -> Result<Self> {
        let ir_path = fs::canonicalize(&input)
            .with_context(|| format!("input file {} is not accessible", input.display()))?;
        if !Toolchain::is_ir(&ir_path) {
            bail!(
                "project mode expects a pre-linked IR module, got {}",
                ir_path.display()
            );
        }

        let listing = fs::read_to_string(&sources_list)
            .with_context(|| format!("cannot read sources list {}", sources_list.display()))?;
        let sources: Vec<PathBuf> = listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect();
        if sources.is_empty() {
            bail!("sources list {} is empty", sources_list.display());
        }
        for source in &sources {
            if !source.is_absolute() {
                bail!("source path {} is not absolute", source.display());
            }
        }

        let toolchain = Toolchain::locate()?;

        Ok(Self {
            ir_path,
            sources,
            options,
            toolchain,
            garbage: Garbage::default(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let launcher = PassLauncher::new(&self.ir_path);
        let dump = launcher.launch_analysis()?;
        if !dump.success {
            bail!("analysis failed for {}", self.ir_path.display());
        }

        // Map every listed source once; unreadable entries are skipped and
        // their targets fall out through declaration lookup.
        let mut mapped = Vec::new();
        for path in &self.sources {
            match SourceFile::open(path) {
                Ok(source) => mapped.push(source),
                Err(error) => warn!("{}", error),
            }
        }

        let results_dir = paths::result_directory(&self.ir_path, self.options.random_names);
        if results_dir.exists() && !self.options.overwrite {
            bail!(
                "result directory {} already exists (use --overwrite)",
                results_dir.display()
            );
        }
        fs::create_dir_all(&results_dir)
            .with_context(|| format!("cannot create {}", results_dir.display()))?;

        let mut generated = 0usize;
        for function in &dump.standalone_functions {
            if function.arguments.is_empty() {
                info!("skipping {}: no arguments to fuzz", function.name);
                continue;
            }
            let Some(declaration) = find_declaration(&mapped, &function.name) else {
                warn!(
                    "skipping {}: declaration not found in any listed source",
                    function.name
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
}

impl Drop for ProjectWrapper {
    fn drop(&mut self) {
        if self.options.auto_delete {
            self.garbage.empty();
        }
    }
}

/// First declaration found while walking the sources in listing order.
fn find_declaration(sources: &[SourceFile], name: &str) -> Option<String> {
    for source in sources {
        let Ok(text) = source.text() else {
            continue;
        };
        if let Some(declaration) = extract_declaration(text, name) {
            return Some(declaration);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_mode_requires_an_ir_module() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.c");
        fs::write(&input, "int main(void) { return 0; }").unwrap();
        let list = dir.path().join("sources.txt");
        fs::write(&list, "/abs/a.c\n").unwrap();

        assert!(ProjectWrapper::new(input, list, Options::default()).is_err());
    }

    #[test]
    fn relative_source_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("module.ll");
        fs::write(&input, "; ModuleID = 'module'\n").unwrap();
        let list = dir.path().join("sources.txt");
        fs::write(&list, "relative/path.c\n").unwrap();

        assert!(ProjectWrapper::new(input, list, Options::default()).is_err());
    }

    #[test]
    fn empty_source_lists_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("module.ll");
        fs::write(&input, "; ModuleID = 'module'\n").unwrap();
        let list = dir.path().join("sources.txt");
        fs::write(&list, "\n   \n").unwrap();

        assert!(ProjectWrapper::new(input, list, Options::default()).is_err());
    }
}
