use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::{Builder, NamedTempFile};

use crate::domain::{NuccoreAccession, ReportFormat};
use crate::error::NuccoreError;

pub const DEFAULT_OUTDIR: &str = "./ncbi_nuccore_download";

/// Flat output directory: one `{ACCESSION}.{ext}` file per record and format.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: Utf8PathBuf,
}

impl OutputLayout {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn record_path(&self, accession: &NuccoreAccession, format: ReportFormat) -> Utf8PathBuf {
        self.root
            .join(format!("{}.{}", accession.as_str(), format.extension()))
    }

    pub fn ensure_root(&self) -> Result<(), NuccoreError> {
        fs::create_dir_all(self.root.as_std_path()).map_err(|err| {
            NuccoreError::Filesystem(format!("create {}: {err}", self.root))
        })
    }

    /// Temp file next to the final location so that `persist` is a rename.
    pub fn staging_file(&self) -> Result<NamedTempFile, NuccoreError> {
        Builder::new()
            .prefix(".nuccore-fetch")
            .suffix(".part")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| NuccoreError::Filesystem(err.to_string()))
    }

    pub fn persist(staged: NamedTempFile, dest: &Utf8Path) -> Result<(), NuccoreError> {
        staged
            .persist(dest.as_std_path())
            .map(|_| ())
            .map_err(|err| NuccoreError::Filesystem(format!("persist {dest}: {}", err.error)))
    }
}
