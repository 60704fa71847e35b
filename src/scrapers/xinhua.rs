//! Xinhua English, China-Biz list.
//!
//! The list page is a flat run of `<a target="_blank">` links and a separate run of
//! `<span class="time">2026-02-18 16:20:00</span>` elements in the same order. Links are
//! paired with times by index after dropping the "More" control; a link past the end
//! of the time list simply has no date.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{info, instrument};
use url::Url;

use super::{article_from_link, dedupe_by_url, node_text};
use crate::dates::parse_listing_time;
use crate::models::ScrapedArticle;

pub const LISTING_URL: &str = "https://english.news.cn/list/china-business.htm";
pub const CATEGORY: &str = "China-Biz";

/// Text of the pagination link that is not an article.
const MORE_PLACEHOLDER: &str = "More";

static BASE: Lazy<Url> = Lazy::new(|| Url::parse(LISTING_URL).unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href][target="_blank"]"#).unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("span.time").unwrap());

/// Parse the China-Biz list page.
#[instrument(level = "info", skip_all)]
pub fn parse_listing(html: &str) -> Vec<ScrapedArticle> {
    let document = Html::parse_document(html);

    let links: Vec<_> = document
        .select(&LINK)
        .map(|a| (a, node_text(a)))
        .filter(|(_, text)| !text.is_empty() && text != MORE_PLACEHOLDER)
        .collect();
    let times: Vec<String> = document.select(&TIME).map(node_text).collect();

    let articles = links
        .into_iter()
        .enumerate()
        .filter_map(|(i, (a, title))| {
            let href = a.value().attr("href")?;
            let mut article = article_from_link(&BASE, href, &title)?;
            article.category = Some(CATEGORY.to_string());
            article.published_at = times.get(i).and_then(|t| parse_listing_time(t));
            Some(article)
        })
        .collect();

    let articles = dedupe_by_url(articles);
    info!(count = articles.len(), "Xinhua China-Biz: parsed articles");
    articles
}
