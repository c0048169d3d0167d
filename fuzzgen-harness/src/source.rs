//! Read-only view of a source file backed by a memory mapping.
//!
//! Mapping and descriptor are released together when the value drops, on
//! every exit path.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to map {path}: {source}")]
    Map {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid UTF-8")]
    Encoding { path: PathBuf },
}

enum Backing {
    Mapped(Mmap),
    // mmap rejects zero-length files.
    Empty,
}

pub struct SourceFile {
    path: PathBuf,
    backing: Backing,
}

impl SourceFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| SourceError::Open {
            path: path.clone(),
            source,
        })?;

        let length = file
            .metadata()
            .map_err(|source| SourceError::Open {
                path: path.clone(),
                source,
            })?
            .len();
        if length == 0 {
            return Ok(Self {
                path,
                backing: Backing::Empty,
            });
        }

        // Safety: the mapping is private and read-only; the tool only maps
        // files it was pointed at and never writes through them.
        let map = unsafe { Mmap::map(&file) }.map_err(|source| SourceError::Map {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            backing: Backing::Mapped(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> Result<&str, SourceError> {
        match &self.backing {
            Backing::Empty => Ok(""),
            Backing::Mapped(map) => {
                std::str::from_utf8(map).map_err(|_| SourceError::Encoding {
                    path: self.path.clone(),
                })
            }
        }
    }
}
