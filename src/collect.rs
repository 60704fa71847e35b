//! Collection and report assembly.
//!
//! [`collect_all`] runs every source in order: fetch, extract, upsert. One source
//! failing to fetch is logged and skipped; a storage error aborts the run.
//! [`build_sections`] reads the report window back out of the store for each source
//! and optionally translates it.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

use crate::fetch::FetchPage;
use crate::outputs::html::ReportSection;
use crate::scrapers::{ScrapeContext, SourceDescriptor};
use crate::store::ArticleStore;
use crate::translate::{TranslateText, Translator};

/// What happened to one source during a collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// The batch was upserted; holds the number of records written.
    Stored(usize),
    /// The listing parsed to zero records; nothing was written.
    Empty,
    /// The listing could not be fetched.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source_id: &'static str,
    pub status: SourceStatus,
}

/// Collect every source in `sources`, in order, and upsert the results.
///
/// `now` is the reference instant for relative dates on listing pages.
///
/// # Errors
///
/// Only store failures are returned. Transport failures are logged per source and
/// reported as [`SourceStatus::Failed`].
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn collect_all<F: FetchPage>(
    store: &ArticleStore,
    fetcher: &F,
    sources: &[SourceDescriptor],
    now: DateTime<Utc>,
    detail_delay: Duration,
) -> Result<Vec<SourceOutcome>, Box<dyn Error>> {
    let ctx = ScrapeContext {
        fetcher,
        now,
        detail_delay,
    };
    let mut outcomes = Vec::with_capacity(sources.len());

    for source in sources {
        let t0 = Instant::now();
        info!(source = %source.id, name = %source.display_name, "Collecting");

        let articles = match source.extractor.collect(&ctx).await {
            Ok(articles) => articles,
            Err(e) => {
                error!(source = %source.id, error = %e, "Collection failed; skipping source");
                outcomes.push(SourceOutcome {
                    source_id: source.id,
                    status: SourceStatus::Failed(e.to_string()),
                });
                continue;
            }
        };

        if articles.is_empty() {
            warn!(source = %source.id, "No articles extracted");
            outcomes.push(SourceOutcome {
                source_id: source.id,
                status: SourceStatus::Empty,
            });
            continue;
        }

        let stored = store.upsert_batch(source.id, &articles)?;
        info!(
            source = %source.id,
            stored,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Saved articles"
        );
        outcomes.push(SourceOutcome {
            source_id: source.id,
            status: SourceStatus::Stored(stored),
        });
    }

    Ok(outcomes)
}

/// Read the last `hours` of articles for each source and build report sections.
///
/// With a translator, titles and summaries are translated in place; the translator's
/// cache is shared across all sections.
#[instrument(level = "info", skip_all, fields(sources = sources.len(), hours = hours))]
pub async fn build_sections<T: TranslateText>(
    store: &ArticleStore,
    sources: &[SourceDescriptor],
    hours: u32,
    now: DateTime<Utc>,
    mut translator: Option<&mut Translator<T>>,
) -> Result<Vec<ReportSection>, Box<dyn Error>> {
    let mut sections = Vec::with_capacity(sources.len());

    for source in sources {
        let mut rows = store.query_within_window_at(source.id, hours, now)?;
        if !rows.is_empty() {
            if let Some(t) = translator.as_deref_mut() {
                t.translate_rows(&mut rows).await;
            }
        }
        let last_scraped_at = store.last_scraped_at(source.id)?;
        info!(source = %source.id, rows = rows.len(), "Built report section");

        sections.push(ReportSection {
            source_id: source.id.to_string(),
            display_name: source.display_name.to_string(),
            rows,
            last_scraped_at,
        });
    }

    Ok(sections)
}
