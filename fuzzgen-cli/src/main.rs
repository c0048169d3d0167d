use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

mod options;
mod paths;
mod project;
mod toolchain;
mod wrapper;

use options::Options;
use project::ProjectWrapper;
use wrapper::SourceWrapper;

/// Generate libFuzzer harnesses for standalone C/C++ functions.
#[derive(Parser)]
#[command(
    name = "fuzzgen",
    version,
    about = "Automatic fuzz-harness generator for C/C++ sources"
)]
struct Cli {
    /// Input translation unit: a source file, or a pre-linked IR module
    /// in project mode.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// File listing one absolute source path per line; switches on
    /// project mode.
    #[arg(short, long, value_name = "PATH")]
    sources: Option<PathBuf>,

    /// Do not append hash suffixes to result directories.
    #[arg(long)]
    no_random_names: bool,

    /// Delete registered temporary files when the run ends.
    #[arg(long)]
    auto_delete: bool,

    /// Reuse an existing result directory.
    #[arg(long)]
    overwrite: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let options = Options {
        random_names: !cli.no_random_names,
        auto_delete: cli.auto_delete,
        overwrite: cli.overwrite,
    };

    let outcome = match cli.sources {
        Some(sources) => {
            ProjectWrapper::new(cli.input, sources, options).and_then(|mut wrapper| wrapper.run())
        }
        None => SourceWrapper::new(cli.input, options).and_then(|mut wrapper| wrapper.run()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("fuzzgen: {:#}", error);
            ExitCode::FAILURE
        }
    }
}
