use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::QuestionBankError;

/// Somewhere a bank file can be read from.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Human-readable location for logs.
    fn describe(&self) -> String;

    /// Raw JSON text of the bank file.
    async fn fetch(&self) -> Result<String, QuestionBankError>;
}

/// Bank file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuestionSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, QuestionBankError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| QuestionBankError::Io {
                path: self.describe(),
                source,
            })
    }
}

/// Bank file served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: Url,
}

impl HttpSource {
    #[must_use]
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl QuestionSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<String, QuestionBankError> {
        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(QuestionBankError::HttpStatus {
                url: self.describe(),
                status: response.status(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Build a source from a CLI/env entry: `http://` and `https://` entries are
/// fetched, anything else is a file path.
///
/// # Errors
///
/// Returns `QuestionBankError::InvalidUrl` for a malformed HTTP(S) URL.
pub fn source_from_spec(
    spec: &str,
    client: &Client,
) -> Result<Box<dyn QuestionSource>, QuestionBankError> {
    let spec = spec.trim();
    let lower = spec.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        let url = Url::parse(spec)?;
        return Ok(Box::new(HttpSource::new(client.clone(), url)));
    }
    Ok(Box::new(FileSource::new(spec)))
}
