//! Atomic artifact writes.
//!
//! Bytes go to a temporary file in the output directory, are flushed and
//! synced, then renamed over `<report_id>.<ext>`. The temporary file is
//! removed on every failure path when its guard drops.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tlf_core::DocumentFormat;

use crate::error::RenderError;

/// A rendered document persisted on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportArtifact {
    pub report_id: String,
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub sha256: String,
    pub bytes: usize,
}

/// Hex-encoded SHA-256 of `bytes`.
#[must_use]
pub fn digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Write `bytes` to `<output_dir>/<report_id>.<ext>`, replacing any existing file.
///
/// # Errors
///
/// [`RenderError::Io`] when the directory cannot be created or the file
/// cannot be written; the previous file, if any, is left in place.
pub fn write_artifact(
    output_dir: &Path,
    report_id: &str,
    format: DocumentFormat,
    bytes: &[u8],
) -> Result<ReportArtifact, RenderError> {
    let path = output_dir.join(format!("{report_id}.{}", format.extension()));
    write_atomic(&path, bytes).map_err(|source| RenderError::Io {
        path: path.clone(),
        source,
    })?;

    let artifact = ReportArtifact {
        report_id: report_id.to_string(),
        sha256: digest(bytes),
        bytes: bytes.len(),
        format,
        path,
    };
    tracing::debug!(
        report = %artifact.report_id,
        path = %artifact.path.display(),
        sha256 = %artifact.sha256,
        "wrote artifact"
    );
    Ok(artifact)
}

/// Replace `path` with `bytes` through a synced temporary file in the same
/// directory. Creates the parent directory when missing.
///
/// # Errors
///
/// Any I/O error; `path` keeps its previous contents in that case.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("output");

        write_artifact(&out, "t14_1", DocumentFormat::Txt, b"first").expect("first write");
        let artifact =
            write_artifact(&out, "t14_1", DocumentFormat::Txt, b"second").expect("second write");

        assert_eq!(artifact.path, out.join("t14_1.txt"));
        assert_eq!(fs::read(&artifact.path).expect("read"), b"second");
        assert_eq!(artifact.sha256, digest(b"second"));
        let entries: Vec<_> = fs::read_dir(&out).expect("read_dir").collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn unwritable_directory_reports_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"x").expect("write");

        let err = write_artifact(&blocker, "t", DocumentFormat::Rtf, b"data").unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }));
    }
}
