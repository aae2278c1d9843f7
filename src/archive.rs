//! Post-download zip extraction.
//!
//! Blocking; callers on the async runtime go through
//! [`tokio::task::spawn_blocking`].

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument};
use zip::ZipArchive;

/// Errors raised while extracting an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading the archive or writing an entry failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The archive is not a readable zip file.
    #[error("cannot read zip archive {path}: {source}")]
    Zip {
        /// The archive.
        path: PathBuf,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// An entry's path would land outside the extraction directory.
    #[error("refusing to extract '{entry}' from {path}: path escapes the target directory")]
    UnsafeEntry {
        /// The archive.
        path: PathBuf,
        /// Raw entry name.
        entry: String,
    },
}

impl ArchiveError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    fn zip(path: &Path, source: zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Returns true if `path` looks like a zip archive (by extension).
#[must_use]
pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Directory `archive` is extracted into: a sibling named after its stem.
#[must_use]
pub fn extraction_dir(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map_or_else(|| "archive".into(), |s| s.to_os_string());
    archive.with_file_name(stem)
}

/// Extracts `archive` into [`extraction_dir`] and returns that directory.
///
/// Existing files with the same names are overwritten.
///
/// # Errors
///
/// Returns [`ArchiveError::UnsafeEntry`] before writing anything if any
/// entry escapes the target directory, otherwise the first IO or zip error.
#[instrument(level = "debug", fields(archive = %archive.display()))]
pub fn extract_zip(archive: &Path) -> Result<PathBuf, ArchiveError> {
    let file = File::open(archive).map_err(|e| ArchiveError::io(archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| ArchiveError::zip(archive, e))?;
    let target = extraction_dir(archive);

    // Validate every entry first so a hostile archive leaves nothing behind.
    let mut entries = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let entry = zip.by_index(index).map_err(|e| ArchiveError::zip(archive, e))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(ArchiveError::UnsafeEntry {
                path: archive.to_path_buf(),
                entry: entry.name().to_string(),
            });
        };
        entries.push((index, relative, entry.is_dir()));
    }

    std::fs::create_dir_all(&target).map_err(|e| ArchiveError::io(&target, e))?;
    for (index, relative, is_dir) in entries {
        let out_path = target.join(relative);
        if is_dir {
            std::fs::create_dir_all(&out_path).map_err(|e| ArchiveError::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        let mut entry = zip.by_index(index).map_err(|e| ArchiveError::zip(archive, e))?;
        let mut out = File::create(&out_path).map_err(|e| ArchiveError::io(&out_path, e))?;
        let bytes = io::copy(&mut entry, &mut out).map_err(|e| ArchiveError::io(&out_path, e))?;
        debug!(entry = %out_path.display(), bytes, "extracted entry");
    }

    info!(target = %target.display(), entries = zip.len(), "extracted archive");
    Ok(target)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_is_zip_by_extension() {
        assert!(is_zip(Path::new("a/photos.zip")));
        assert!(is_zip(Path::new("a/PHOTOS.ZIP")));
        assert!(!is_zip(Path::new("a/photos.jpg")));
        assert!(!is_zip(Path::new("a/zip")));
    }

    #[test]
    fn test_extraction_dir_is_sibling_stem() {
        assert_eq!(
            extraction_dir(Path::new("/data/Album/photos.zip")),
            PathBuf::from("/data/Album/photos")
        );
    }

    #[test]
    fn test_extract_zip_writes_nested_entries() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("set.zip");
        write_zip(&archive, &[("a.txt", b"alpha"), ("sub/b.txt", b"beta")]);

        let target = extract_zip(&archive).unwrap();

        assert_eq!(target, dir.path().join("set"));
        assert_eq!(std::fs::read(target.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(target.join("sub/b.txt")).unwrap(), b"beta");
    }

    #[test]
    fn test_extract_zip_rejects_escaping_entries() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("ok.txt", b"fine"), ("../escape.txt", b"bad")]);

        let error = extract_zip(&archive).unwrap_err();

        assert!(matches!(error, ArchiveError::UnsafeEntry { .. }));
        assert!(!dir.path().join("escape.txt").exists());
        assert!(!dir.path().join("evil").exists());
    }

    #[test]
    fn test_extract_zip_reports_corrupt_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"not a zip").unwrap();

        assert!(matches!(
            extract_zip(&archive).unwrap_err(),
            ArchiveError::Zip { .. }
        ));
    }
}
