use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::NuccoreError;

// RefSeq nucleotide prefixes, then INSDC primary, WGS/TSA and MGA layouts.
static ACCESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(?:
            (?:AC|NC|NG|NT|NW|NZ|NM|NR|XM|XR)_
            (?:\d{6}|\d{9}|[A-Z]{2}\d{6}|[A-Z]{2}\d{8}|[A-Z]{4}\d{8,10}|[A-Z]{6}\d{9,11})
          | [A-Z]\d{5}
          | [A-Z]{2}\d{6}
          | [A-Z]{2}\d{8}
          | [A-Z]{4}\d{8,10}
          | [A-Z]{6}\d{9,11}
          | [A-Z]{5}\d{7}
        )
        (?:\.\d+)?$",
    )
    .expect("accession regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Fasta,
    Genbank,
    Gff3,
}

impl ReportFormat {
    /// Value of the `report=` query parameter understood by the viewer endpoint.
    pub fn report_param(self) -> &'static str {
        match self {
            ReportFormat::Fasta => "fasta",
            ReportFormat::Genbank => "genbank",
            ReportFormat::Gff3 => "gff3",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Fasta => "fasta",
            ReportFormat::Genbank => "gb",
            ReportFormat::Gff3 => "gff3",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.report_param())
    }
}

/// Keeps the first occurrence of every format.
pub fn dedup_formats(formats: &[ReportFormat]) -> Vec<ReportFormat> {
    let mut seen = HashSet::new();
    formats
        .iter()
        .copied()
        .filter(|format| seen.insert(*format))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NuccoreAccession(String);

impl NuccoreAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NuccoreAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NuccoreAccession {
    type Err = NuccoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(value);
        if !ACCESSION_RE.is_match(&normalized) {
            return Err(NuccoreError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

pub fn is_valid_accession(value: &str) -> bool {
    value.parse::<NuccoreAccession>().is_ok()
}

fn normalize(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

/// One accession as the user asked for it, before normalization.
///
/// An empty `formats` list means FASTA only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedAccession {
    pub accession: String,
    pub formats: Vec<ReportFormat>,
}

impl RequestedAccession {
    pub fn new(accession: impl Into<String>, formats: &[ReportFormat]) -> Self {
        Self {
            accession: accession.into(),
            formats: formats.to_vec(),
        }
    }
}

impl From<&str> for RequestedAccession {
    fn from(value: &str) -> Self {
        Self::new(value, &[])
    }
}

impl From<String> for RequestedAccession {
    fn from(value: String) -> Self {
        Self::new(value, &[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub accession: String,
    pub formats: Vec<ReportFormat>,
}

/// Unique requested accessions in first-occurrence order.
///
/// Entries are normalized (trimmed, upper-cased) before comparison, so
/// `nc_000001.11` and `NC_000001.11 ` collapse into one and their formats are
/// unioned. Validation is left to the download loop so that bad entries can be
/// reported one by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    entries: Vec<PlanEntry>,
}

impl DownloadPlan {
    pub fn new<I, R>(requested: I) -> Result<Self, NuccoreError>
    where
        I: IntoIterator<Item = R>,
        R: Into<RequestedAccession>,
    {
        let mut index = HashMap::<String, usize>::new();
        let mut entries: Vec<PlanEntry> = Vec::new();
        for item in requested {
            let item = item.into();
            let accession = normalize(&item.accession);
            let formats = if item.formats.is_empty() {
                vec![ReportFormat::Fasta]
            } else {
                item.formats
            };
            match index.get(&accession) {
                Some(&position) => entries[position].formats.extend(formats),
                None => {
                    index.insert(accession.clone(), entries.len());
                    entries.push(PlanEntry { accession, formats });
                }
            }
        }
        if entries.is_empty() {
            return Err(NuccoreError::EmptyAccessionList);
        }
        for entry in &mut entries {
            entry.formats = dedup_formats(&entry.formats);
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn accessions(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.accession.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_refseq_accession() {
        let acc: NuccoreAccession = " nc_000001.11 ".parse().unwrap();
        assert_eq!(acc.as_str(), "NC_000001.11");
    }

    #[test]
    fn parse_invalid_accession() {
        let err = "bad_id".parse::<NuccoreAccession>().unwrap_err();
        assert_matches!(err, NuccoreError::InvalidAccession(value) if value == "bad_id");
    }

    #[test]
    fn plan_keeps_first_occurrence_order() {
        let plan = DownloadPlan::new(["NM_000546", "nc_000001.11", "NM_000546 "]).unwrap();
        assert_eq!(plan.accessions(), vec!["NM_000546", "NC_000001.11"]);
    }

    #[test]
    fn plan_rejects_empty_input() {
        let err = DownloadPlan::new(Vec::<String>::new()).unwrap_err();
        assert_matches!(err, NuccoreError::EmptyAccessionList);
    }

    #[test]
    fn plan_unions_formats_of_duplicates() {
        let plan = DownloadPlan::new([
            RequestedAccession::new("NC_000001.11", &[]),
            RequestedAccession::new("U12345", &[ReportFormat::Genbank]),
            RequestedAccession::new(
                "nc_000001.11",
                &[ReportFormat::Gff3, ReportFormat::Fasta],
            ),
        ])
        .unwrap();
        assert_eq!(plan.accessions(), vec!["NC_000001.11", "U12345"]);
        assert_eq!(
            plan.entries()[0].formats,
            vec![ReportFormat::Fasta, ReportFormat::Gff3]
        );
        assert_eq!(plan.entries()[1].formats, vec![ReportFormat::Genbank]);
    }

    #[test]
    fn format_dedup() {
        let formats = dedup_formats(&[
            ReportFormat::Gff3,
            ReportFormat::Fasta,
            ReportFormat::Gff3,
        ]);
        assert_eq!(formats, vec![ReportFormat::Gff3, ReportFormat::Fasta]);
    }
}
