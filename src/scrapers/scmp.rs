//! South China Morning Post, China section.
//!
//! Headlines live in `span[data-qa="ContentHeadline-Headline"]` inside the article
//! link, and dates in `time[data-qa="ContentActionBar-handleRenderDisplayDateTime-time"]`.
//! The two are collected separately and paired by position: headline *i* goes with
//! time *i*, and the shorter list bounds the batch. If the page ever gains or loses a
//! time element, every later pairing shifts silently.
//!
//! A `datetime` attribute is used when present. Otherwise the visible text is a
//! relative phrase such as `2 hours ago`, resolved against the run's reference time
//! in Hong Kong.

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use super::{article_from_link, dedupe_by_url, node_text, non_empty};
use crate::dates::{parse_iso_attr, parse_relative};
use crate::models::ScrapedArticle;

pub const BASE_URL: &str = "https://www.scmp.com";
pub const LISTING_URL: &str = "https://www.scmp.com/news/china";
pub const DEFAULT_CATEGORY: &str = "China";

static BASE: Lazy<Url> = Lazy::new(|| Url::parse(BASE_URL).unwrap());
static HEADLINE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"span[data-qa="ContentHeadline-Headline"]"#).unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"time[data-qa="ContentActionBar-handleRenderDisplayDateTime-time"]"#).unwrap()
});
static SUMMARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"h3[data-qa="ContentSummary-ContainerWithTag"]"#).unwrap());
static CATEGORY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[data-qa="BaseLink-renderAnchor-StyledAnchor"]"#).unwrap());

fn enclosing_link(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "a")
}

/// Parse the China listing. `now` is the reference instant in Hong Kong time.
#[instrument(level = "info", skip_all, fields(%now))]
pub fn parse_listing(html: &str, now: DateTime<FixedOffset>) -> Vec<ScrapedArticle> {
    let document = Html::parse_document(html);
    let headlines: Vec<_> = document.select(&HEADLINE).collect();
    let times: Vec<_> = document.select(&TIME).collect();
    debug!(headlines = headlines.len(), times = times.len(), "Pairing headlines with times");

    let mut articles = Vec::new();
    for (span, time_el) in headlines.into_iter().zip(times) {
        let Some(link) = enclosing_link(span) else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(mut article) = article_from_link(&BASE, href, &node_text(span)) else {
            continue;
        };

        article.published_at = match time_el.value().attr("datetime").filter(|v| !v.trim().is_empty()) {
            Some(value) => parse_iso_attr(value),
            None => parse_relative(&node_text(time_el), now),
        };

        let container = link.parent().and_then(ElementRef::wrap);
        article.summary = container
            .and_then(|c| c.select(&SUMMARY).next())
            .map(node_text)
            .and_then(non_empty);
        article.category = Some(
            container
                .and_then(|c| c.select(&CATEGORY).next())
                .map(node_text)
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        );
        articles.push(article);
    }

    let articles = dedupe_by_url(articles);
    info!(count = articles.len(), "SCMP China: parsed articles");
    articles
}
