//! Local persistence for the issue manifest, outcomes, and dispatch registrations.
//!
//! Every store is one JSON document, loaded and replaced whole:
//!
//! ```text
//! <state-dir>/
//!   lint-manifest.json              # Issue records, in detector order
//!   lint-outcomes.json              # Latest outcome per issue id
//!   lint-unresolved-outcomes.json   # Outcomes with no issue id, by dispatch id
//!   task-issue-map.json             # Dispatch id → issue id
//! ```
//!
//! Mutations go through `load_*_for_update` and `commit_*`. A snapshot
//! remembers the SHA-256 of the bytes it was read from; committing over a
//! file that changed since then fails with [`StorageError::Conflict`]
//! instead of silently overwriting another invocation's work.
//! Writes land in a temp file first and are renamed into place.

mod dispatches;
mod issues;
mod outcomes;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub use issues::{find_by_status, find_by_tier_and_status};
pub use outcomes::{Filing, OutcomeBook, file_outcome, resolved_dispatch_ids};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("{0} changed since it was loaded; re-run the command")]
    Conflict(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Where each store lives on disk.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub manifest: PathBuf,
    pub outcomes: PathBuf,
    pub unresolved_outcomes: PathBuf,
    pub dispatch_map: PathBuf,
}

/// Identifies the exact bytes a snapshot was read from.
/// `None` means the file didn't exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(Option<String>);

impl Revision {
    fn of(bytes: &[u8]) -> Self {
        Self(Some(hex::encode(Sha256::digest(bytes))))
    }
}

/// Loaded data plus the revision it was loaded at.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub data: T,
    revision: Revision,
}

/// Local file-based storage for the orchestration stores.
pub struct Storage {
    paths: StorePaths,
}

impl Storage {
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }
}

/// Read and decode a store. A missing file decodes as `T::default()`.
fn read_store<T: DeserializeOwned + Default>(path: &Path) -> Result<Snapshot<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(Snapshot {
                data: T::default(),
                revision: Revision(None),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let data = serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Snapshot {
        data,
        revision: Revision::of(&bytes),
    })
}

/// The revision currently on disk.
fn current_revision(path: &Path) -> Result<Revision> {
    match fs::read(path) {
        Ok(bytes) => Ok(Revision::of(&bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Revision(None)),
        Err(e) => Err(e.into()),
    }
}

/// Write a store only if it still matches `expected`.
///
/// The check and the rename are not atomic together; this catches the
/// common case of two overlapping invocations, not every interleaving.
fn commit_store<T: Serialize>(path: &Path, expected: &Revision, data: &T) -> Result<Revision> {
    if current_revision(path)? != *expected {
        tracing::warn!(path = %path.display(), "store changed since it was loaded");
        return Err(StorageError::Conflict(path.to_path_buf()));
    }
    write_store(path, data)
}

/// Write a store unconditionally, via temp file and rename.
fn write_store<T: Serialize>(path: &Path, data: &T) -> Result<Revision> {
    let mut json = serde_json::to_string_pretty(data).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
    fs::write(&tmp, json.as_bytes())?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    Ok(Revision::of(json.as_bytes()))
}
