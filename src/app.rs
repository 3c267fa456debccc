use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::{DownloadPlan, NuccoreAccession, ReportFormat, RequestedAccession};
use crate::error::NuccoreError;
use crate::layout::OutputLayout;
use crate::ncbi::NuccoreClient;

/// Everything one run downloads. Accessions may repeat; the plan merges them.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub accessions: Vec<RequestedAccession>,
    pub outdir: Utf8PathBuf,
}

impl DownloadRequest {
    /// Every accession with the same formats.
    pub fn uniform<I, S>(accessions: I, outdir: Utf8PathBuf, formats: &[ReportFormat]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accessions: accessions
                .into_iter()
                .map(|accession| RequestedAccession::new(accession, formats))
                .collect(),
            outdir,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Downloaded,
    Invalid,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadItemResult {
    pub accession: String,
    pub status: ItemStatus,
    pub files: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub generated_at: String,
    pub outdir: String,
    pub total: usize,
    pub items: Vec<DownloadItemResult>,
}

impl DownloadReport {
    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }

    pub fn has_invalid(&self) -> bool {
        self.count(ItemStatus::Invalid) > 0
    }

    pub fn has_fetch_failures(&self) -> bool {
        self.count(ItemStatus::Failed) > 0
    }

    pub fn succeeded(&self) -> bool {
        !self.has_invalid() && !self.has_fetch_failures()
    }
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        total: usize,
    },
    Skipped {
        accession: String,
        reason: String,
    },
    Downloading {
        accession: String,
        format: ReportFormat,
    },
    Downloaded {
        accession: String,
        files: Vec<String>,
    },
    Failed {
        accession: String,
        reason: String,
    },
    Progress {
        current: usize,
        total: usize,
    },
    Finished {
        succeeded: bool,
        elapsed: Duration,
    },
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<C: NuccoreClient> {
    client: C,
}

impl<C: NuccoreClient> App<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn download(
        &self,
        request: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadReport, NuccoreError> {
        let started = Instant::now();
        let plan = DownloadPlan::new(request.accessions.iter().cloned())?;
        let layout = OutputLayout::new(request.outdir.clone());
        layout.ensure_root()?;

        let total = plan.entries().len();
        sink.event(ProgressEvent::Started { total });

        let mut items = Vec::with_capacity(total);
        for (index, entry) in plan.entries().iter().enumerate() {
            let raw = &entry.accession;
            let item = match raw.parse::<NuccoreAccession>() {
                Ok(accession) => {
                    self.download_accession(&layout, &accession, &entry.formats, sink)
                }
                Err(err) => {
                    tracing::warn!(accession = %raw, "not a valid accession, skipping");
                    sink.event(ProgressEvent::Skipped {
                        accession: raw.clone(),
                        reason: err.to_string(),
                    });
                    DownloadItemResult {
                        accession: raw.clone(),
                        status: ItemStatus::Invalid,
                        files: Vec::new(),
                        errors: vec![err.to_string()],
                    }
                }
            };
            items.push(item);
            sink.event(ProgressEvent::Progress {
                current: index + 1,
                total,
            });
        }

        let report = DownloadReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            outdir: layout.root().to_string(),
            total,
            items,
        };
        sink.event(ProgressEvent::Finished {
            succeeded: report.succeeded(),
            elapsed: started.elapsed(),
        });
        Ok(report)
    }

    fn download_accession(
        &self,
        layout: &OutputLayout,
        accession: &NuccoreAccession,
        formats: &[ReportFormat],
        sink: &dyn ProgressSink,
    ) -> DownloadItemResult {
        let mut files = Vec::new();
        let mut errors = Vec::new();

        for &format in formats {
            sink.event(ProgressEvent::Downloading {
                accession: accession.to_string(),
                format,
            });
            let dest = layout.record_path(accession, format);
            match self.fetch_to(layout, accession, format, &dest) {
                Ok(()) => files.push(dest.to_string()),
                Err(err) => {
                    tracing::warn!(%accession, %format, error = %err, "download failed");
                    errors.push(format!("{format}: {err}"));
                }
            }
        }

        if errors.is_empty() {
            sink.event(ProgressEvent::Downloaded {
                accession: accession.to_string(),
                files: files.clone(),
            });
            DownloadItemResult {
                accession: accession.to_string(),
                status: ItemStatus::Downloaded,
                files,
                errors,
            }
        } else {
            sink.event(ProgressEvent::Failed {
                accession: accession.to_string(),
                reason: errors.join("; "),
            });
            DownloadItemResult {
                accession: accession.to_string(),
                status: ItemStatus::Failed,
                files,
                errors,
            }
        }
    }

    // The staged temp file is removed on drop, so a failed fetch leaves nothing behind.
    fn fetch_to(
        &self,
        layout: &OutputLayout,
        accession: &NuccoreAccession,
        format: ReportFormat,
        dest: &camino::Utf8Path,
    ) -> Result<(), NuccoreError> {
        let staged = layout.staging_file()?;
        let info = self
            .client
            .download_record(accession, format, staged.path())?;
        tracing::debug!(%accession, %format, bytes = info.bytes, "record written");
        OutputLayout::persist(staged, dest)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;

    use super::*;
    use crate::ncbi::{DEFAULT_BASE_URL, DownloadInfo, accession_url};

    struct StaticClient;

    impl NuccoreClient for StaticClient {
        fn url_for(&self, accession: &NuccoreAccession, format: ReportFormat) -> String {
            accession_url(DEFAULT_BASE_URL, accession, format)
        }

        fn download_record(
            &self,
            accession: &NuccoreAccession,
            _format: ReportFormat,
            destination: &Path,
        ) -> Result<DownloadInfo, NuccoreError> {
            let body = format!(">{accession}\nACGT\n");
            std::fs::write(destination, &body).unwrap();
            Ok(DownloadInfo {
                bytes: body.len() as u64,
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: RefCell<Vec<ProgressEvent>>,
    }

    impl ProgressSink for RecordingSink {
        fn event(&self, event: ProgressEvent) {
            self.events.borrow_mut().push(event);
        }
    }

    #[test]
    fn progress_counts_every_unique_entry() {
        let temp = tempfile::tempdir().unwrap();
        let outdir = Utf8PathBuf::from_path_buf(temp.path().join("out")).unwrap();
        let request = DownloadRequest::uniform(
            ["NC_000001.11", "bad_id", "NC_000001.11"],
            outdir,
            &[ReportFormat::Fasta],
        );
        let sink = RecordingSink::default();
        let report = App::new(StaticClient).download(&request, &sink).unwrap();

        assert!(!report.succeeded());
        let progress = sink
            .events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Progress { current, total } => Some((*current, *total)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(progress, vec![(1, 2), (2, 2)]);

        let events = sink.events.borrow();
        let started = events
            .iter()
            .filter(|event| matches!(event, ProgressEvent::Started { .. }))
            .count();
        let finished = events
            .iter()
            .filter(|event| matches!(event, ProgressEvent::Finished { .. }))
            .count();
        assert_eq!((started, finished), (1, 1));
    }
}
