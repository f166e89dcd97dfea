// crates/copy_tree/src/lib.rs

use filetime::FileTime;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum CopyTreeError {
    #[error("Source directory {} does not exist", .0.display())]
    SourceMissing(PathBuf),
    #[error("Source {} is not a directory", .0.display())]
    SourceNotADirectory(PathBuf),
    #[error("Cannot resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot derive a snapshot directory name from {}", .0.display())]
    NoBasename(PathBuf),
    #[error(
        "Snapshot target {} overlaps source {}",
        target.display(),
        source_dir.display()
    )]
    TargetOverlapsSource { source_dir: PathBuf, target: PathBuf },
    #[error("Error walking source tree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to preserve timestamps on {}: {source}", path.display())]
    Timestamps {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a successful copy touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopySummary {
    /// Directory inside the destination that mirrors the source root.
    pub target: PathBuf,
    pub files: usize,
    pub directories: usize,
}

/// Directory (relative to the destination) that a snapshot of `source` lands in.
///
/// A relative path made only of plain components is kept as-is (`./data/raw`
/// becomes `data/raw`). Anything else, i.e. an absolute path, `.`, or a path
/// climbing through `..`, is reduced to the name of the directory it resolves to.
///
/// # Errors
///
/// Fails if the path has to be resolved and cannot be, or resolves to `/`.
pub fn snapshot_subdir(source: &Path) -> Result<PathBuf, CopyTreeError> {
    let plain_relative = source.is_relative()
        && source
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    let kept: PathBuf = source
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    if plain_relative && !kept.as_os_str().is_empty() {
        return Ok(kept);
    }

    let resolved = fs::canonicalize(source).map_err(|err| CopyTreeError::Resolve {
        path: source.to_path_buf(),
        source: err,
    })?;
    resolved
        .file_name()
        .map(PathBuf::from)
        .ok_or(CopyTreeError::NoBasename(resolved))
}

/// Copies the contents of `source` into `destination/<snapshot_subdir(source)>`.
///
/// Existing files are overwritten; files that exist only in the destination
/// are left alone. Symbolic links are followed, permissions and timestamps
/// are carried over. `.git` entries inside the source are skipped, and so is
/// the destination itself when it lives inside the source.
///
/// # Errors
///
/// Refuses to start when the target directory is the source itself or would
/// be walked as part of it. Otherwise stops at the first entry that cannot be
/// read or written.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<CopySummary, CopyTreeError> {
    if !source.exists() {
        return Err(CopyTreeError::SourceMissing(source.to_path_buf()));
    }
    if !source.is_dir() {
        return Err(CopyTreeError::SourceNotADirectory(source.to_path_buf()));
    }

    let subdir = snapshot_subdir(source)?;
    let source_root = resolve(source)?;
    create_dir(destination)?;
    let destination_root = resolve(destination)?;
    let target_root = match destination_root.join(&subdir) {
        existing if existing.exists() => resolve(&existing)?,
        planned => planned,
    };
    if overlaps(&source_root, &destination_root, &target_root) {
        return Err(CopyTreeError::TargetOverlapsSource {
            source_dir: source_root,
            target: target_root,
        });
    }

    let target = destination.join(&subdir);
    create_dir(&target)?;
    log::info!("Copying {} into {}", source_root.display(), target.display());

    let mut summary = CopySummary {
        target: target.clone(),
        files: 0,
        directories: 0,
    };

    let walker = WalkDir::new(&source_root)
        .follow_links(true)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| !skip_entry(entry, &destination_root, &target_root));

    for entry in walker {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(&source_root) else {
            continue;
        };
        let to = target.join(relative);
        if entry.file_type().is_dir() {
            create_dir(&to)?;
            summary.directories += 1;
        } else {
            if let Some(parent) = to.parent() {
                create_dir(parent)?;
            }
            copy_file(entry.path(), &to)?;
            summary.files += 1;
        }
    }

    log::debug!(
        "Copied {} file(s) and {} dir(s) into {}",
        summary.files,
        summary.directories,
        summary.target.display()
    );
    Ok(summary)
}

/// Whether writing into `target` would clobber or re-walk the source.
///
/// A target under the source is only safe when the destination holding it is
/// strictly inside the source, because the walk skips the destination.
fn overlaps(source_root: &Path, destination_root: &Path, target_root: &Path) -> bool {
    let destination_skipped =
        destination_root != source_root && destination_root.starts_with(source_root);
    target_root.starts_with(source_root) && !destination_skipped
}

fn skip_entry(entry: &DirEntry, destination_root: &Path, target_root: &Path) -> bool {
    if entry.file_name() == ".git" {
        log::debug!("Skipping {}", entry.path().display());
        return true;
    }
    entry.file_type().is_dir() && (entry.path() == destination_root || entry.path() == target_root)
}

fn resolve(path: &Path) -> Result<PathBuf, CopyTreeError> {
    fs::canonicalize(path).map_err(|source| CopyTreeError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}

fn create_dir(path: &Path) -> Result<(), CopyTreeError> {
    fs::create_dir_all(path).map_err(|source| CopyTreeError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_file(from: &Path, to: &Path) -> Result<(), CopyTreeError> {
    fs::copy(from, to).map_err(|source| CopyTreeError::CopyFile {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    let timestamps = |source: io::Error| CopyTreeError::Timestamps {
        path: to.to_path_buf(),
        source,
    };
    let meta = fs::metadata(from).map_err(timestamps)?;
    filetime::set_file_times(
        to,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .map_err(timestamps)
}
