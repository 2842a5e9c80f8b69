use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use core_types::KnowledgeFetchError;
use regex::Regex;
use tracing::debug;

static GOOGLE_DOC_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/document/d/([a-zA-Z0-9_-]+)").expect("document id pattern is valid")
});

/// Fetches the raw text of a knowledge document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_text(&self, source_ref: &str) -> Result<String, KnowledgeFetchError>;
}

/// Resolves a shared document link to the URL that serves its plain text.
pub fn export_url_for(source_ref: &str) -> Result<String, KnowledgeFetchError> {
    let source_ref = source_ref.trim();
    if let Some(captures) = GOOGLE_DOC_ID.captures(source_ref) {
        return Ok(format!(
            "https://docs.google.com/document/d/{}/export?format=txt",
            &captures[1]
        ));
    }
    if source_ref.starts_with("http://") || source_ref.starts_with("https://") {
        return Ok(source_ref.to_string());
    }
    Err(KnowledgeFetchError::InvalidSourceRef(source_ref.to_string()))
}

pub struct HttpDocumentSource {
    client: reqwest::Client,
}

impl HttpDocumentSource {
    pub fn new(timeout: Duration) -> Result<Self, KnowledgeFetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| KnowledgeFetchError::Network(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch_text(&self, source_ref: &str) -> Result<String, KnowledgeFetchError> {
        let url = export_url_for(source_ref)?;
        debug!(%url, "fetching knowledge document");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| KnowledgeFetchError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KnowledgeFetchError::Http {
                status: status.as_u16(),
            });
        }
        response
            .text()
            .await
            .map_err(|err| KnowledgeFetchError::Network(err.to_string()))
    }
}
