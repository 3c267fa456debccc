use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{NuccoreAccession, ReportFormat};
use crate::error::NuccoreError;

pub const DEFAULT_BASE_URL: &str = "https://www.ncbi.nlm.nih.gov/sviewer/viewer.fcgi";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct DownloadInfo {
    pub bytes: u64,
}

pub trait NuccoreClient: Send + Sync {
    fn url_for(&self, accession: &NuccoreAccession, format: ReportFormat) -> String;

    fn download_record(
        &self,
        accession: &NuccoreAccession,
        format: ReportFormat,
        destination: &Path,
    ) -> Result<DownloadInfo, NuccoreError>;
}

pub fn accession_url(base_url: &str, accession: &NuccoreAccession, format: ReportFormat) -> String {
    format!(
        "{}?id={}&db=nuccore&report={}&retmode=text",
        base_url,
        accession.as_str(),
        format.report_param()
    )
}

#[derive(Clone)]
pub struct NuccoreHttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NuccoreHttpClient {
    pub fn new() -> Result<Self, NuccoreError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, NuccoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("nuccore-fetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| NuccoreError::Http(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| NuccoreError::Http(err.to_string()))?;

        let api_key = std::env::var("NCBI_API_KEY").ok();
        Ok(Self::with_client(client).with_api_key(api_key))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }

    /// Blank keys are ignored.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn write_response_to_file(
        &self,
        mut response: reqwest::blocking::Response,
        destination: &Path,
    ) -> Result<DownloadInfo, NuccoreError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .map(|body| body.trim().chars().take(200).collect::<String>())
                .unwrap_or_else(|_| "NCBI request failed".to_string());
            return Err(NuccoreError::Status { status, message });
        }

        let mut file =
            File::create(destination).map_err(|err| NuccoreError::Filesystem(err.to_string()))?;
        let bytes = std::io::copy(&mut response, &mut file)
            .map_err(|err| NuccoreError::Http(err.to_string()))?;
        if bytes == 0 {
            return Err(NuccoreError::EmptyResponse);
        }
        Ok(DownloadInfo { bytes })
    }
}

impl NuccoreClient for NuccoreHttpClient {
    fn url_for(&self, accession: &NuccoreAccession, format: ReportFormat) -> String {
        accession_url(&self.base_url, accession, format)
    }

    fn download_record(
        &self,
        accession: &NuccoreAccession,
        format: ReportFormat,
        destination: &Path,
    ) -> Result<DownloadInfo, NuccoreError> {
        let url = self.url_for(accession, format);
        tracing::debug!(%url, "requesting record");
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }
        let response = request
            .send()
            .map_err(|err| NuccoreError::Http(err.to_string()))?;
        self.write_response_to_file(response, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_contains_accession_and_report() {
        let acc: NuccoreAccession = "NC_000001.11".parse().unwrap();
        let url = accession_url(DEFAULT_BASE_URL, &acc, ReportFormat::Fasta);
        assert_eq!(
            url,
            "https://www.ncbi.nlm.nih.gov/sviewer/viewer.fcgi?id=NC_000001.11&db=nuccore&report=fasta&retmode=text"
        );
    }

    #[test]
    fn base_url_override() {
        let client = NuccoreHttpClient::new()
            .unwrap()
            .with_base_url("http://localhost:9/viewer");
        let acc: NuccoreAccession = "U12345".parse().unwrap();
        assert!(
            client
                .url_for(&acc, ReportFormat::Gff3)
                .starts_with("http://localhost:9/viewer?id=U12345&")
        );
    }
}
