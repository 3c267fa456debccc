use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::app::DownloadRequest;
use crate::domain::{ReportFormat, RequestedAccession};
use crate::error::NuccoreError;
use crate::layout::DEFAULT_OUTDIR;

/// Request file, e.g.
///
/// ```json
/// {
///   "outdir": "refs",
///   "formats": ["fasta", "genbank"],
///   "accessions": ["NC_000001.11", { "accession": "NM_000546", "formats": ["gff3"] }]
/// }
/// ```
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub outdir: Option<PathBuf>,
    #[serde(default)]
    pub formats: Option<Vec<ReportFormat>>,
    #[serde(default)]
    pub accessions: Vec<AccessionEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AccessionEntry {
    Shorthand(String),
    Detailed(AccessionEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AccessionEntryObject {
    pub accession: String,
    #[serde(default)]
    pub formats: Option<Vec<ReportFormat>>,
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub accessions: Vec<String>,
    pub outdir: Option<PathBuf>,
    pub formats: Vec<ReportFormat>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> Result<Config, NuccoreError> {
        let content =
            fs::read_to_string(path).map_err(|_| NuccoreError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| NuccoreError::ConfigParse(err.to_string()))
    }

    /// Merges CLI values and an optional config file into one download request.
    ///
    /// CLI accessions come first and use the CLI (or config-wide) formats; a
    /// config entry with its own `formats` keeps them. Repeats across both
    /// sources are merged later by the download plan.
    pub fn resolve(
        cli: CliOverrides,
        config: Option<Config>,
    ) -> Result<DownloadRequest, NuccoreError> {
        let config = config.unwrap_or_default();

        let outdir = cli
            .outdir
            .or(config.outdir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTDIR));
        let outdir = Utf8PathBuf::from_path_buf(outdir).map_err(|path| {
            NuccoreError::Filesystem(format!("output path is not UTF-8: {}", path.display()))
        })?;

        let formats = if !cli.formats.is_empty() {
            cli.formats
        } else {
            config
                .formats
                .unwrap_or_else(|| vec![ReportFormat::Fasta])
        };

        let mut accessions = cli
            .accessions
            .into_iter()
            .map(|accession| RequestedAccession::new(accession, &formats))
            .collect::<Vec<_>>();
        accessions.extend(config.accessions.into_iter().map(|entry| match entry {
            AccessionEntry::Shorthand(accession) => RequestedAccession::new(accession, &formats),
            AccessionEntry::Detailed(AccessionEntryObject { accession, formats: own }) => {
                RequestedAccession::new(accession, own.as_deref().unwrap_or(&formats))
            }
        }));

        if accessions.is_empty() {
            return Err(NuccoreError::EmptyAccessionList);
        }
        Ok(DownloadRequest { accessions, outdir })
    }
}

/// Splits `-a` values on whitespace so `-a "NC_000001.11 U12345"` and padded
/// values work. A value that is blank on its own is kept as `""` and later
/// reported as invalid.
pub fn split_accession_args<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut accessions = Vec::new();
    for value in values {
        let value = value.as_ref();
        if value.trim().is_empty() {
            accessions.push(String::new());
        } else {
            accessions.extend(value.split_whitespace().map(str::to_string));
        }
    }
    accessions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_only_uses_defaults() {
        let cli = CliOverrides {
            accessions: vec!["NC_000001.11".to_string()],
            ..CliOverrides::default()
        };
        let request = ConfigLoader::resolve(cli, None).unwrap();
        assert_eq!(request.outdir, Utf8PathBuf::from(DEFAULT_OUTDIR));
        assert_eq!(
            request.accessions,
            vec![RequestedAccession::new("NC_000001.11", &[ReportFormat::Fasta])]
        );
    }

    #[test]
    fn split_drops_padding_but_keeps_blank_values() {
        assert_eq!(
            split_accession_args([" NC_000001.11", "U12345 ", "NM_000546  XM_011541469.2"]),
            vec!["NC_000001.11", "U12345", "NM_000546", "XM_011541469.2"]
        );
        assert_eq!(split_accession_args(["", "U12345"]), vec!["", "U12345"]);
    }
}
