//! Finding transcript files in a directory.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;

/// A transcript on disk, named by the dispatch that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFile {
    /// The file stem.
    pub task_id: String,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("transcript directory not found: {}", .0.display())]
    MissingDir(PathBuf),

    #[error("invalid transcript glob '{glob}': {source}")]
    Glob {
        glob: String,
        #[source]
        source: ignore::Error,
    },
}

/// Lists transcripts directly inside `dir` whose name matches `glob`,
/// ordered by dispatch id.
///
/// Hidden files and ignore files are not consulted: a transcript directory
/// is machine-written and every matching file counts.
pub fn discover(dir: &Path, glob: &str) -> Result<Vec<TranscriptFile>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::MissingDir(dir.to_path_buf()));
    }

    let glob_error = |source| ScanError::Glob {
        glob: glob.to_string(),
        source,
    };
    let mut builder = OverrideBuilder::new(dir);
    builder.add(glob).map_err(glob_error)?;
    let overrides = builder.build().map_err(glob_error)?;

    let mut files: Vec<TranscriptFile> = WalkBuilder::new(dir)
        .standard_filters(false)
        .max_depth(Some(1))
        .overrides(overrides)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable transcript entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter_map(|entry| {
            let task_id = entry.path().file_stem()?.to_str()?.to_string();
            Some(TranscriptFile {
                task_id,
                path: entry.into_path(),
            })
        })
        .collect();

    files.sort_by(|a, b| a.task_id.cmp(&b.task_id));
    Ok(files)
}
