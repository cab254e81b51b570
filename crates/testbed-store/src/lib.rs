//! On-disk persistence for testbed configurations.
//!
//! A configuration lives in a single YAML file. `load` reads it back without
//! applying defaults, `sync` stamps `updated-at` and rewrites it atomically with
//! owner-only permissions, and `backup` keeps a copy of the operator's original
//! before the first rewrite.

pub mod file;

pub use file::{backup, backup_path, load, sync};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("configuration has no path to sync to")]
    NoPath,
}
