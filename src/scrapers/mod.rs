//! News source scrapers.
//!
//! Each supported site gets its own module with a pure `parse_listing` function that
//! turns the listing page markup into [`ScrapedArticle`] records. The [`Extractor`] enum
//! gives the orchestrator one uniform entry point over all of them, and
//! [`registry`] lists the sources in the order they are collected.
//!
//! # Supported Sources
//!
//! | Id | Site | Module | Notes |
//! |----|------|--------|-------|
//! | `globaltimes` | Global Times, China | [`globaltimes`] | Sectioned page; principal articles get a second fetch for their date |
//! | `xinhua_chinabiz` | Xinhua, China-Biz | [`xinhua`] | Flat link list paired with a list of times |
//! | `scmp_china` | SCMP, China | [`scmp`] | Headlines paired with `<time>` elements; relative times in Hong Kong time |
//!
//! # Common Rules
//!
//! - URLs are made absolute against the source base and lose their query string
//! - Records without a title or URL are dropped
//! - A URL seen twice in one batch keeps its first occurrence
//! - Dates that fail to parse become `None`; they never fail the batch

use chrono::{DateTime, Utc};
use itertools::Itertools;
use scraper::{ElementRef, Selector};
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

use crate::dates::hong_kong;
use crate::fetch::FetchPage;
use crate::models::ScrapedArticle;
use crate::utils::collapse_whitespace;

pub mod globaltimes;
pub mod scmp;
pub mod xinhua;

/// Everything an extraction needs besides the listing markup.
pub struct ScrapeContext<'a, F> {
    /// Used for follow-up requests (Global Times article pages).
    pub fetcher: &'a F,
    /// Reference instant captured once per collection run.
    pub now: DateTime<Utc>,
    /// Pause before each follow-up request.
    pub detail_delay: Duration,
}

/// One extraction strategy per supported site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    GlobalTimes,
    Scmp,
    Xinhua,
}

impl Extractor {
    /// URL of the listing page this extractor understands.
    pub fn listing_url(&self) -> &'static str {
        match self {
            Extractor::GlobalTimes => globaltimes::LISTING_URL,
            Extractor::Scmp => scmp::LISTING_URL,
            Extractor::Xinhua => xinhua::LISTING_URL,
        }
    }

    /// Turn listing markup into article records.
    ///
    /// Global Times additionally fetches article pages for principal records that
    /// lack a date; failures there only leave the date empty.
    pub async fn extract<F: FetchPage>(
        &self,
        html: &str,
        ctx: &ScrapeContext<'_, F>,
    ) -> Vec<ScrapedArticle> {
        match self {
            Extractor::GlobalTimes => {
                let mut articles = globaltimes::parse_listing(html);
                globaltimes::enrich_principals(&mut articles, ctx).await;
                articles
            }
            Extractor::Scmp => scmp::parse_listing(html, ctx.now.with_timezone(&hong_kong())),
            Extractor::Xinhua => xinhua::parse_listing(html),
        }
    }

    /// Fetch the listing page and extract it.
    ///
    /// # Errors
    ///
    /// Returns the transport error when the listing page itself cannot be fetched.
    #[instrument(level = "info", skip(ctx))]
    pub async fn collect<F: FetchPage>(
        &self,
        ctx: &ScrapeContext<'_, F>,
    ) -> Result<Vec<ScrapedArticle>, Box<dyn Error>> {
        let html = ctx.fetcher.fetch_page(self.listing_url()).await?;
        let articles = self.extract(&html, ctx).await;
        info!(count = articles.len(), "Extracted articles");
        Ok(articles)
    }
}

/// A configured news source: stable id, display name, and how to scrape it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub extractor: Extractor,
}

/// All sources, in collection order.
pub fn registry() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor {
            id: "globaltimes",
            display_name: "Global Times — China",
            extractor: Extractor::GlobalTimes,
        },
        SourceDescriptor {
            id: "xinhua_chinabiz",
            display_name: "Xinhua China-Biz",
            extractor: Extractor::Xinhua,
        },
        SourceDescriptor {
            id: "scmp_china",
            display_name: "SCMP — China",
            extractor: Extractor::Scmp,
        },
    ]
}

/// Look up a source by id.
pub fn find_source(id: &str) -> Option<SourceDescriptor> {
    registry().into_iter().find(|s| s.id == id)
}

/// Resolve `href` against `base` and drop the query string.
pub fn normalize_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let joined = base.join(href).ok()?.to_string();
    let url = joined.split('?').next().unwrap_or_default();
    (!url.is_empty()).then(|| url.to_string())
}

/// Visible text of an element with whitespace collapsed.
pub(crate) fn node_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// `Some(s)` unless `s` is empty.
pub(crate) fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// First descendant of `scope` matching any of `selectors`, tried in order.
pub(crate) fn first_match<'a>(scope: ElementRef<'a>, selectors: &[&Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| scope.select(sel).next())
}

/// Build a record from a raw link, or `None` when the URL or title is unusable.
pub(crate) fn article_from_link(base: &Url, href: &str, title: &str) -> Option<ScrapedArticle> {
    let url = normalize_url(base, href)?;
    let title = collapse_whitespace(title);
    if title.is_empty() {
        return None;
    }
    Some(ScrapedArticle::new(url, title))
}

/// Keep the first record for every URL, preserving order.
pub(crate) fn dedupe_by_url(articles: Vec<ScrapedArticle>) -> Vec<ScrapedArticle> {
    articles
        .into_iter()
        .unique_by(|a| a.url.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_url_relative_and_query() {
        let base = Url::parse("https://www.globaltimes.cn").unwrap();
        assert_eq!(
            normalize_url(&base, "/page/202602/1355.shtml?utm=x").as_deref(),
            Some("https://www.globaltimes.cn/page/202602/1355.shtml")
        );
        assert_eq!(
            normalize_url(&base, " https://other.test/a?b=1 ").as_deref(),
            Some("https://other.test/a")
        );
        assert_eq!(normalize_url(&base, "   "), None);
    }

    #[test]
    fn test_normalize_url_relative_to_listing_path() {
        let base = Url::parse("https://english.news.cn/list/china-business.htm").unwrap();
        assert_eq!(
            normalize_url(&base, "../20260218/abc/c.html").as_deref(),
            Some("https://english.news.cn/20260218/abc/c.html")
        );
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let mut first = ScrapedArticle::new("https://a.test/1", "First");
        first.is_principal = true;
        let articles = vec![
            first.clone(),
            ScrapedArticle::new("https://a.test/2", "Second"),
            ScrapedArticle::new("https://a.test/1", "Duplicate"),
        ];
        let deduped = dedupe_by_url(articles);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0], first);
    }

    #[test]
    fn test_registry_order_and_lookup() {
        let ids: Vec<_> = registry().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["globaltimes", "xinhua_chinabiz", "scmp_china"]);
        assert_eq!(find_source("scmp_china").unwrap().extractor, Extractor::Scmp);
        assert!(find_source("reuters").is_none());
    }

    #[tokio::test]
    async fn test_collect_propagates_listing_failure() {
        let fetcher = StubFetcher::default();
        let ctx = ScrapeContext {
            fetcher: &fetcher,
            now: Utc.with_ymd_and_hms(2026, 2, 18, 4, 0, 0).unwrap(),
            detail_delay: Duration::ZERO,
        };
        assert!(Extractor::Xinhua.collect(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_collect_extracts_fetched_listing() {
        let html = r#"<ul>
            <li><a href="../20260218/a/c.html" target="_blank">Yuan steady</a><span class="time">2026-02-18 16:20:00</span></li>
        </ul>"#;
        let fetcher = StubFetcher::default().with_page(xinhua::LISTING_URL, html);
        let ctx = ScrapeContext {
            fetcher: &fetcher,
            now: Utc.with_ymd_and_hms(2026, 2, 18, 17, 0, 0).unwrap(),
            detail_delay: Duration::ZERO,
        };
        let articles = Extractor::Xinhua.collect(&ctx).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Yuan steady");
    }
}
