//! Submission archive builder.
//!
//! Packs a set of declared files into a zip, rooted at a declared directory.
//! Every path is resolved (symlinks included) before anything is written, and
//! a single component-wise prefix check keeps the archive inside the root.
//! The size limit is enforced on the finished file, not estimated up front.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{NelsonError, Result};

/// Fixed name of the uploaded archive (and its default location on disk).
pub const SUBMISSION_FILENAME: &str = "student.zip";

/// A declared file resolved against the root.
struct Entry {
    source: PathBuf,
    name: String,
    is_dir: bool,
}

/// Build the archive at `archive_path` from `paths`, all of which must lie
/// under `root`.
///
/// Fails with [`NelsonError::PathEscape`] before creating the archive if any
/// path resolves outside `root`. Fails with [`NelsonError::ArchiveTooLarge`]
/// after writing if the archive exceeds `max_size`; the oversized file is left
/// on disk and is safe to delete.
pub fn build_archive(
    root: &Path,
    paths: &[PathBuf],
    max_size: u64,
    archive_path: &Path,
) -> Result<PathBuf> {
    let entries = resolve_entries(root, paths, archive_path)?;

    let file = File::create(archive_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in &entries {
        if entry.is_dir {
            zip.add_directory(entry.name.as_str(), options)?;
        } else {
            zip.start_file(entry.name.as_str(), options)?;
            let mut source = File::open(&entry.source)?;
            io::copy(&mut source, &mut zip)?;
        }
    }
    zip.finish()?;

    let actual = fs::metadata(archive_path)?.len();
    tracing::debug!(archive = %archive_path.display(), files = entries.len(), bytes = actual, "archive written");

    if actual > max_size {
        return Err(NelsonError::ArchiveTooLarge { limit: max_size, actual });
    }

    Ok(archive_path.to_path_buf())
}

/// Resolve every declared path and check it against the root.
///
/// A declared path naming the archive itself (typically a stale
/// `student.zip` left by an earlier run) is skipped: it is truncated before
/// its entry would be read.
fn resolve_entries(root: &Path, paths: &[PathBuf], archive_path: &Path) -> Result<Vec<Entry>> {
    let root = if root.as_os_str().is_empty() { Path::new(".") } else { root };
    let abs_root = fs::canonicalize(root)?;
    let abs_archive = fs::canonicalize(archive_path).ok();

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(paths.len());

    for path in paths {
        let escape = || NelsonError::PathEscape {
            root: root.to_path_buf(),
            path: path.clone(),
        };

        let abs = fs::canonicalize(path).map_err(|e| {
            io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
        })?;

        let relative = abs.strip_prefix(&abs_root).map_err(|_| escape())?;
        if abs_archive.as_ref() == Some(&abs) {
            tracing::debug!(path = %path.display(), "skipping the archive itself");
            continue;
        }
        let name = archive_name(relative);
        if name.is_empty() {
            // The root itself carries no content of its own.
            continue;
        }

        if seen.insert(name.clone()) {
            entries.push(Entry {
                is_dir: abs.is_dir(),
                source: abs,
                name,
            });
        }
    }

    Ok(entries)
}

/// Zip entry name for a root-relative path: forward slashes on every platform.
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
