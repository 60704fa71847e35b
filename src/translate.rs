//! Best-effort machine translation of report text.
//!
//! - [`TranslateText`]: core trait, one external call per text
//! - [`GoogleTranslate`]: the public `gtx` endpoint of Google Translate
//! - [`TranslationCache`]: memo of finished translations, optionally persisted as JSON
//! - [`Translator`]: cache, pacing and failure handling on top of any backend
//!
//! Translation never fails a report. A backend error logs a warning and yields the
//! original text, and that outcome is cached like a success so the same text is not
//! retried within the cache lifetime.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::models::StoredArticle;
use crate::utils::truncate_for_log;

const GTX_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// External calls between two long pauses.
const CALLS_PER_PAUSE: usize = 5;

/// Trait for a text translation backend.
pub trait TranslateText {
    /// Translate `text` into the `target` language code (for example `pt`).
    async fn translate_text(&self, text: &str, target: &str) -> Result<String, Box<dyn Error>>;
}

/// Google Translate through its unauthenticated `client=gtx` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: Client,
}

impl GoogleTranslate {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl TranslateText for GoogleTranslate {
    #[instrument(level = "debug", skip_all, fields(lang = %target, chars = text.len()))]
    async fn translate_text(&self, text: &str, target: &str) -> Result<String, Box<dyn Error>> {
        let url = format!(
            "{GTX_ENDPOINT}?client=gtx&sl=auto&tl={}&dt=t&q={}",
            urlencoding::encode(target),
            urlencoding::encode(text)
        );
        let body: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_gtx_response(&body).ok_or_else(|| "unexpected translation response shape".into())
    }
}

/// Join the translated segments of a `gtx` response.
///
/// The payload is a nested array whose first element lists one `[translated,
/// original, ...]` entry per sentence.
fn parse_gtx_response(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0)?.as_str())
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Translations keyed by target language, then by source text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationCache {
    entries: HashMap<String, HashMap<String, String>>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cache saved by [`TranslationCache::save`]; a missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        if !path.exists() {
            debug!(path = %path.display(), "No translation cache file yet");
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let cache: Self = serde_json::from_str(&content)?;
        info!(path = %path.display(), entries = cache.len(), "Loaded translation cache");
        Ok(cache)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), entries = self.len(), "Saved translation cache");
        Ok(())
    }

    pub fn get(&self, target: &str, text: &str) -> Option<&str> {
        self.entries.get(target)?.get(text).map(String::as_str)
    }

    pub fn insert(&mut self, target: &str, text: &str, translated: &str) {
        self.entries
            .entry(target.to_string())
            .or_default()
            .insert(text.to_string(), translated.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cached, paced translation into one target language.
#[derive(Debug)]
pub struct Translator<T> {
    backend: T,
    target: String,
    cache: TranslationCache,
    /// Pause after each external call.
    delay: Duration,
    /// Extra pause after every fifth external call.
    pause: Duration,
    calls: usize,
}

impl<T> Translator<T>
where
    T: TranslateText,
{
    pub fn new(backend: T, target: impl Into<String>, cache: TranslationCache) -> Self {
        Self {
            backend,
            target: target.into(),
            cache,
            delay: Duration::ZERO,
            pause: Duration::ZERO,
            calls: 0,
        }
    }

    pub fn with_pacing(mut self, delay: Duration, pause: Duration) -> Self {
        self.delay = delay;
        self.pause = pause;
        self
    }

    /// Number of external calls made so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Translate one text, falling back to the input on failure.
    ///
    /// Surrounding whitespace is trimmed before the cache lookup and the call. Blank
    /// text is returned as given without touching the backend.
    pub async fn translate(&mut self, text: &str) -> String {
        let key = text.trim();
        if key.is_empty() {
            return text.to_string();
        }
        if let Some(hit) = self.cache.get(&self.target, key) {
            return hit.to_string();
        }

        let t0 = Instant::now();
        let translated = match self.backend.translate_text(key, &self.target).await {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    error = %e,
                    text = %truncate_for_log(key, 60),
                    "Translation failed; keeping original text"
                );
                key.to_string()
            }
        };
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "Translated text");

        self.cache.insert(&self.target, key, &translated);
        self.calls += 1;
        self.pace().await;
        translated
    }

    async fn pace(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.calls % CALLS_PER_PAUSE == 0 && !self.pause.is_zero() {
            sleep(self.pause).await;
        }
    }

    /// Translate title and summary of every row in place.
    #[instrument(level = "info", skip_all, fields(rows = rows.len(), lang = %self.target))]
    pub async fn translate_rows(&mut self, rows: &mut [StoredArticle]) {
        let calls_before = self.calls;
        for row in rows.iter_mut() {
            row.title = self.translate(&row.title).await;
            if let Some(summary) = row.summary.take() {
                row.summary = Some(self.translate(&summary).await);
            }
        }
        info!(
            external_calls = self.calls - calls_before,
            cached = self.cache.len(),
            "Translated rows"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    /// Upper-cases text and records every call; texts containing "fail" error out.
    #[derive(Debug, Default)]
    struct StubBackend {
        seen: RefCell<Vec<String>>,
    }

    impl TranslateText for StubBackend {
        async fn translate_text(&self, text: &str, target: &str) -> Result<String, Box<dyn Error>> {
            self.seen.borrow_mut().push(text.to_string());
            if text.contains("fail") {
                return Err("service unavailable".into());
            }
            Ok(format!("[{target}] {}", text.to_uppercase()))
        }
    }

    fn translator() -> Translator<StubBackend> {
        Translator::new(StubBackend::default(), "pt", TranslationCache::new())
    }

    fn row(title: &str, summary: Option<&str>) -> StoredArticle {
        StoredArticle {
            id: 1,
            source: "globaltimes".to_string(),
            url: "https://a.test/1".to_string(),
            title: title.to_string(),
            summary: summary.map(str::to_string),
            category: None,
            published_at: None,
            author: None,
            scraped_at: "2026-02-18T12:00:00.000000".to_string(),
            is_principal: false,
        }
    }

    #[tokio::test]
    async fn test_translate_memoizes_trimmed_text() {
        let mut t = translator();
        assert_eq!(t.translate("  hello ").await, "[pt] HELLO");
        assert_eq!(t.translate("hello").await, "[pt] HELLO");
        assert_eq!(t.calls(), 1);
        assert_eq!(*t.backend.seen.borrow(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_blank_text_skips_backend() {
        let mut t = translator();
        assert_eq!(t.translate("   ").await, "   ");
        assert_eq!(t.translate("").await, "");
        assert_eq!(t.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_returns_original_and_is_cached() {
        let mut t = translator();
        assert_eq!(t.translate("will fail").await, "will fail");
        assert_eq!(t.translate("will fail").await, "will fail");
        assert_eq!(t.backend.seen.borrow().len(), 1);
        assert_eq!(t.cache().get("pt", "will fail"), Some("will fail"));
    }

    #[tokio::test]
    async fn test_pacing_delays_each_call_and_pauses_every_fifth() {
        let delay = Duration::from_millis(40);
        let pause = Duration::from_millis(150);
        let mut t = translator().with_pacing(delay, pause);

        let t0 = Instant::now();
        for word in ["one", "two", "three", "four", "five"] {
            t.translate(word).await;
        }
        assert_eq!(t.calls(), 5);
        assert!(t0.elapsed() >= delay * 5 + pause);

        let t0 = Instant::now();
        for word in ["one", "two", "three", "four", "five"] {
            t.translate(word).await;
        }
        assert_eq!(t.calls(), 5);
        assert!(t0.elapsed() < delay);
    }

    #[tokio::test]
    async fn test_pause_only_after_fifth_call() {
        let pause = Duration::from_millis(300);
        let mut t = translator().with_pacing(Duration::ZERO, pause);

        let t0 = Instant::now();
        for word in ["one", "two", "three", "four"] {
            t.translate(word).await;
        }
        assert!(t0.elapsed() < pause);

        t.translate("five").await;
        assert!(t0.elapsed() >= pause);
    }

    #[tokio::test]
    async fn test_translate_rows_rewrites_title_and_summary() {
        let mut t = translator();
        let mut rows = vec![row("Trade talks", Some("Both sides met")), row("No summary", None)];
        t.translate_rows(&mut rows).await;

        assert_eq!(rows[0].title, "[pt] TRADE TALKS");
        assert_eq!(rows[0].summary.as_deref(), Some("[pt] BOTH SIDES MET"));
        assert_eq!(rows[1].title, "[pt] NO SUMMARY");
        assert!(rows[1].summary.is_none());
        assert_eq!(t.calls(), 3);
    }

    #[test]
    fn test_cache_is_per_target_language() {
        let mut cache = TranslationCache::new();
        cache.insert("pt", "hello", "olá");
        assert_eq!(cache.get("pt", "hello"), Some("olá"));
        assert_eq!(cache.get("es", "hello"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_persists_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translations.json");

        assert!(TranslationCache::load(&path).unwrap().is_empty());

        let mut cache = TranslationCache::new();
        cache.insert("pt", "Economy", "Economia");
        cache.save(&path).unwrap();

        let loaded = TranslationCache::load(&path).unwrap();
        assert_eq!(loaded, cache);
    }

    #[tokio::test]
    async fn test_warm_cache_avoids_calls() {
        let mut cache = TranslationCache::new();
        cache.insert("pt", "Economy", "Economia");
        let mut t = Translator::new(StubBackend::default(), "pt", cache);
        assert_eq!(t.translate("Economy").await, "Economia");
        assert_eq!(t.calls(), 0);
    }

    #[test]
    fn test_parse_gtx_response_joins_segments() {
        let body = json!([
            [["Olá mundo. ", "Hello world. ", null], ["Tudo bem?", "All good?", null]],
            null,
            "en"
        ]);
        assert_eq!(parse_gtx_response(&body).as_deref(), Some("Olá mundo. Tudo bem?"));
        assert_eq!(parse_gtx_response(&json!({"error": 1})), None);
        assert_eq!(parse_gtx_response(&json!([[]])), None);
    }

    #[test]
    fn test_google_translate_builds() {
        assert!(GoogleTranslate::new("newsflow-test", Duration::from_secs(15)).is_ok());
    }
}
