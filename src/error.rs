use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum NuccoreError {
    #[error("invalid nuccore accession: {0:?}")]
    #[diagnostic(help("expected e.g. NC_000001.11, NM_001256799, U12345, AF123456.1"))]
    InvalidAccession(String),

    #[error("no accessions given")]
    #[diagnostic(help("pass -a/--accession or list accessions in a --config file"))]
    EmptyAccessionList,

    #[error("NCBI request failed: {0}")]
    Http(String),

    #[error("NCBI returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("NCBI returned an empty response")]
    EmptyResponse,

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl NuccoreError {
    /// Whether the error came from talking to NCBI rather than from local input.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            NuccoreError::Http(_) | NuccoreError::Status { .. } | NuccoreError::EmptyResponse
        )
    }
}
