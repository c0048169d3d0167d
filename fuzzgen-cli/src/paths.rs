//! Result-tree naming and temp-file bookkeeping.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use sha2::{Digest, Sha256};

const SHORT_HASH_LENGTH: usize = 8;

/// 8-hex-char tag derived from a time seed; enough to keep concurrent
/// runs from colliding on directory names.
pub fn short_hash() -> String {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    let digest = Sha256::digest(format!("{}-{}", seed, std::process::id()).as_bytes());

    let mut rendered = String::with_capacity(SHORT_HASH_LENGTH);
    for byte in digest.iter().take(SHORT_HASH_LENGTH / 2) {
        rendered.push_str(&format!("{:02x}", byte));
    }
    rendered
}

/// `<parent>/<stem>_fuzz_results[_<hash>]`
pub fn result_directory(input: &Path, random_names: bool) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("module");
    let mut name = format!("{stem}_fuzz_results");
    if random_names {
        name.push('_');
        name.push_str(&short_hash());
    }
    input.parent().unwrap_or_else(|| Path::new(".")).join(name)
}

/// `<results>/<fn>[_<hash>]`
pub fn target_directory(results: &Path, function_name: &str, random_names: bool) -> PathBuf {
    let mut name = function_name.to_string();
    if random_names {
        name.push('_');
        name.push_str(&short_hash());
    }
    results.join(name)
}

/// Files registered for deletion at the end of a run.
#[derive(Debug, Default)]
pub struct Garbage {
    files: Vec<PathBuf>,
}

impl Garbage {
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        self.files.push(path.into());
    }

    /// Remove every registered file. Directories are left alone; missing
    /// files only get a note in the log.
    pub fn empty(&mut self) {
        for path in self.files.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("removed temporary {}", path.display()),
                Err(error) => warn!("could not remove {}: {}", path.display(), error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hashes_are_eight_hex_chars() {
        let hash = short_hash();
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn result_directory_is_named_after_the_stem() {
        let fixed = result_directory(Path::new("/work/parse.c"), false);
        assert_eq!(fixed, Path::new("/work/parse_fuzz_results"));

        let random = result_directory(Path::new("/work/parse.c"), true);
        let name = random.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("parse_fuzz_results_"));
        assert_eq!(name.len(), "parse_fuzz_results_".len() + 8);
    }

    #[test]
    fn target_directory_is_named_after_the_function() {
        let results = Path::new("/work/parse_fuzz_results");
        assert_eq!(
            target_directory(results, "trim", false),
            Path::new("/work/parse_fuzz_results/trim")
        );
        let random = target_directory(results, "trim", true);
        assert!(random
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("trim_"));
    }

    #[test]
    fn garbage_removes_registered_files() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("keep.txt");
        let toss = dir.path().join("toss.txt");
        std::fs::write(&keep, "k").unwrap();
        std::fs::write(&toss, "t").unwrap();

        let mut garbage = Garbage::default();
        garbage.register(&toss);
        garbage.empty();

        assert!(keep.exists());
        assert!(!toss.exists());
    }
}
