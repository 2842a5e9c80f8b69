use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use core_types::KnowledgeFetchError;
use parking_lot::Mutex;
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

mod source;

pub use source::{DocumentSource, HttpDocumentSource, export_url_for};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Built-in campus corpus used whenever no document can be served.
pub const DEFAULT_CORPUS: &str = include_str!("default_corpus.txt");

static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line pattern is valid"));

pub fn normalize_document(raw: &str) -> String {
    let unix = raw.replace("\r\n", "\n");
    BLANK_LINE_RUNS.replace_all(&unix, "\n\n").trim().to_string()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    text: String,
    fetched_at: Instant,
}

/// Time-bounded cache of grounding text, keyed by source reference.
pub struct KnowledgeCache {
    source: Arc<dyn DocumentSource>,
    ttl: Duration,
    default_corpus: String,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl KnowledgeCache {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self::with_settings(source, DEFAULT_TTL, DEFAULT_CORPUS)
    }

    pub fn with_settings(
        source: Arc<dyn DocumentSource>,
        ttl: Duration,
        default_corpus: impl Into<String>,
    ) -> Self {
        Self {
            source,
            ttl,
            default_corpus: default_corpus.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn default_corpus(&self) -> &str {
        &self.default_corpus
    }

    /// Returns grounding text for `source_ref`. Never fails: fetch problems fall
    /// back to the last cached text for the source, then to the default corpus.
    pub async fn grounding_text(&self, source_ref: Option<&str>) -> String {
        let Some(key) = source_key(source_ref) else {
            return self.default_corpus.clone();
        };

        if let Some(text) = self.fresh_entry(&key) {
            debug!(source = %key, "knowledge cache hit");
            return text;
        }

        match self.fetch(&key).await {
            Ok(text) => {
                info!(source = %key, bytes = text.len(), "knowledge document refreshed");
                self.entries.lock().insert(
                    key,
                    CacheEntry {
                        text: text.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                text
            }
            Err(err) => {
                warn!(source = %key, error = %err, "knowledge fetch failed, using fallback");
                self.current_text(Some(key.as_str()))
            }
        }
    }

    /// Cached text for `source_ref` regardless of age, or the default corpus.
    pub fn current_text(&self, source_ref: Option<&str>) -> String {
        source_key(source_ref)
            .and_then(|key| self.entries.lock().get(&key).map(|entry| entry.text.clone()))
            .unwrap_or_else(|| self.default_corpus.clone())
    }

    pub fn invalidate(&self) {
        self.entries.lock().clear();
    }

    fn fresh_entry(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        (entry.fetched_at.elapsed() < self.ttl).then(|| entry.text.clone())
    }

    async fn fetch(&self, key: &str) -> Result<String, KnowledgeFetchError> {
        let raw = self.source.fetch_text(key).await?;
        let text = normalize_document(&raw);
        if text.is_empty() {
            return Err(KnowledgeFetchError::EmptyDocument);
        }
        Ok(text)
    }
}

fn source_key(source_ref: Option<&str>) -> Option<String> {
    source_ref
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
        replies: Mutex<Vec<Result<String, KnowledgeFetchError>>>,
    }

    impl CountingSource {
        fn new(replies: Vec<Result<String, KnowledgeFetchError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                replies: Mutex::new(replies),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentSource for CountingSource {
        async fn fetch_text(&self, _source_ref: &str) -> Result<String, KnowledgeFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock();
            if replies.len() > 1 {
                replies.remove(0)
            } else {
                replies
                    .first()
                    .cloned()
                    .unwrap_or(Err(KnowledgeFetchError::EmptyDocument))
            }
        }
    }

    const DOC: &str = "https://docs.google.com/document/d/abc/edit";

    #[test]
    fn normalizes_line_endings_and_blank_runs() {
        let text = normalize_document("\r\n  FEES:\r\n\r\n\r\n\r\nDue on the 15th.\r\n\n");
        assert_eq!(text, "FEES:\n\nDue on the 15th.");
    }

    #[test]
    fn default_corpus_mentions_campus_information() {
        assert!(DEFAULT_CORPUS.contains("CAMPUS INFORMATION"));
        assert!(DEFAULT_CORPUS.contains("SCHOLARSHIPS:"));
    }

    #[tokio::test]
    async fn missing_source_uses_default_without_fetching() {
        let source = CountingSource::new(vec![Ok("remote".to_string())]);
        let cache = KnowledgeCache::new(source.clone());

        assert!(cache.grounding_text(None).await.contains("CAMPUS INFORMATION"));
        assert!(cache.grounding_text(Some("  ")).await.contains("CAMPUS INFORMATION"));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_at_most_once_per_ttl_window() {
        let source = CountingSource::new(vec![Ok("FEES: 100".to_string())]);
        let cache = KnowledgeCache::new(source.clone());

        assert_eq!(cache.grounding_text(Some(DOC)).await, "FEES: 100");
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.grounding_text(Some(DOC)).await, "FEES: 100");
        assert_eq!(source.calls(), 1);

        tokio::time::advance(DEFAULT_TTL).await;
        cache.grounding_text(Some(DOC)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_stale_text_and_retries_next_call() {
        let source = CountingSource::new(vec![
            Ok("first".to_string()),
            Err(KnowledgeFetchError::Http { status: 503 }),
            Ok("second".to_string()),
        ]);
        let cache = KnowledgeCache::with_settings(source.clone(), Duration::from_secs(10), "default");

        assert_eq!(cache.grounding_text(Some(DOC)).await, "first");
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.grounding_text(Some(DOC)).await, "first");
        assert_eq!(cache.grounding_text(Some(DOC)).await, "second");
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn failure_without_cached_entry_uses_default_corpus() {
        let source = CountingSource::new(vec![Err(KnowledgeFetchError::Network(
            "connection refused".to_string(),
        ))]);
        let cache = KnowledgeCache::new(source.clone());
        let text = cache.grounding_text(Some(DOC)).await;
        assert!(text.contains("CAMPUS INFORMATION"));
    }

    #[tokio::test]
    async fn blank_document_counts_as_failure() {
        let source = CountingSource::new(vec![Ok("\r\n\n\n  ".to_string())]);
        let cache = KnowledgeCache::with_settings(source.clone(), DEFAULT_TTL, "default");
        assert_eq!(cache.grounding_text(Some(DOC)).await, "default");
        assert_eq!(cache.current_text(Some(DOC)), "default");
    }

    #[tokio::test]
    async fn entries_are_kept_per_source() {
        let source = CountingSource::new(vec![Ok("a".to_string()), Ok("b".to_string())]);
        let cache = KnowledgeCache::new(source.clone());

        assert_eq!(cache.grounding_text(Some("https://kb.example/a")).await, "a");
        assert_eq!(cache.grounding_text(Some("https://kb.example/b")).await, "b");
        assert_eq!(cache.current_text(Some("https://kb.example/a")), "a");
        assert_eq!(source.calls(), 2);

        cache.invalidate();
        assert!(cache.current_text(Some("https://kb.example/a")).contains("CAMPUS"));
    }
}
