//! Global Times China section scraper.
//!
//! The [China index](https://www.globaltimes.cn/china/index.html) is split into
//! several visually distinct blocks. They are read in this fixed order:
//!
//! 1. `china_article_form1`: hero feature (title, summary)
//! 2. `china_article_form2`: feature with image (title, `form2_desc` summary)
//! 3. `china_article_form3`: simple item
//! 4. `china_content`: `column_title` headings followed by `china_article_form4` and
//!    `mid_elem` blocks, which inherit the preceding heading as category
//! 5. `content_bottom`: short list of titles
//! 6. `list_content`: the "MORE" list, with a `By Author | 2026/2/18 21:38:48` byline
//!
//! Blocks 1 to 5 are principal articles and carry no date on the listing. For each
//! of them the article page is fetched to read `<span class="pub_time">`.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{ScrapeContext, article_from_link, dedupe_by_url, first_match, node_text, non_empty};
use crate::dates::{parse_byline, parse_published_marker};
use crate::fetch::FetchPage;
use crate::models::ScrapedArticle;
use crate::utils::truncate_for_log;

pub const BASE_URL: &str = "https://www.globaltimes.cn";
pub const LISTING_URL: &str = "https://www.globaltimes.cn/china/index.html";

fn sel(s: &str) -> Selector {
    Selector::parse(s).unwrap()
}

static BASE: Lazy<Url> = Lazy::new(|| Url::parse(BASE_URL).unwrap());

static FORM1: Lazy<Selector> = Lazy::new(|| sel("div.china_article_form1"));
static FORM2: Lazy<Selector> = Lazy::new(|| sel("div.china_article_form2"));
static FORM3: Lazy<Selector> = Lazy::new(|| sel("div.china_article_form3"));
static CHINA_CONTENT: Lazy<Selector> = Lazy::new(|| sel("div.china_content"));
static CONTENT_BOTTOM: Lazy<Selector> = Lazy::new(|| sel("div.content_bottom"));
static LIST_CONTENT: Lazy<Selector> = Lazy::new(|| sel("div.list_content"));
static LEVEL01_LIST: Lazy<Selector> = Lazy::new(|| sel("div.level01_list"));
static LIST_INFO: Lazy<Selector> = Lazy::new(|| sel("div.list_info"));
static SOURCE_TIME: Lazy<Selector> = Lazy::new(|| sel("div.source_time"));
static FORM2_DESC: Lazy<Selector> = Lazy::new(|| sel("div.form2_desc"));
static MID_TITLE: Lazy<Selector> = Lazy::new(|| sel("div.mid_title"));
static MID_DESC: Lazy<Selector> = Lazy::new(|| sel("div.mid_desc"));
static TITLE_ML: Lazy<Selector> = Lazy::new(|| sel("a.new_title_ml"));
static TITLE_MS: Lazy<Selector> = Lazy::new(|| sel("a.new_title_ms"));
static TITLE_SS: Lazy<Selector> = Lazy::new(|| sel("a.new_title_ss"));
static PAGE_LINK: Lazy<Selector> = Lazy::new(|| sel(r#"a[href*="/page/"]"#));
static PUB_TIME: Lazy<Selector> = Lazy::new(|| sel("span.pub_time"));
static DIV: Lazy<Selector> = Lazy::new(|| sel("div"));
static UL: Lazy<Selector> = Lazy::new(|| sel("ul"));
static LI: Lazy<Selector> = Lazy::new(|| sel("li"));
static A: Lazy<Selector> = Lazy::new(|| sel("a"));
static P: Lazy<Selector> = Lazy::new(|| sel("p"));

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).next().map(node_text).and_then(non_empty)
}

/// Build a record from `link`, using the `title` attribute when the link has no text.
fn principal_from_link(
    base: &Url,
    link: ElementRef<'_>,
    summary: Option<String>,
    category: Option<&str>,
) -> Option<ScrapedArticle> {
    let href = link.value().attr("href")?;
    let text = node_text(link);
    let title = if text.is_empty() {
        link.value().attr("title").unwrap_or_default().to_string()
    } else {
        text
    };
    let mut article = article_from_link(base, href, &title)?;
    article.summary = summary;
    article.category = category.map(str::trim).filter(|c| !c.is_empty()).map(String::from);
    article.is_principal = true;
    Some(article)
}

/// Parse the China index page into records, principal sections first.
///
/// Principal records come back with `published_at = None`; see [`enrich_principals`].
#[instrument(level = "info", skip_all)]
pub fn parse_listing(html: &str) -> Vec<ScrapedArticle> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let base = &*BASE;
    let mut articles = Vec::new();

    for form1 in root.select(&FORM1) {
        if let Some(link) = first_match(form1, &[&*TITLE_ML, &*PAGE_LINK]) {
            let summary = first_text(form1, &P);
            articles.extend(principal_from_link(base, link, summary, None));
        }
    }

    for form2 in root.select(&FORM2) {
        if let Some(link) = first_match(form2, &[&*TITLE_MS, &*PAGE_LINK]) {
            let summary = form2
                .select(&FORM2_DESC)
                .next()
                .and_then(|desc| first_text(desc, &P));
            articles.extend(principal_from_link(base, link, summary, None));
        }
    }

    for form3 in root.select(&FORM3) {
        if let Some(link) = first_match(form3, &[&*TITLE_MS, &*PAGE_LINK]) {
            let summary = first_text(form3, &P);
            articles.extend(principal_from_link(base, link, summary, None));
        }
    }

    if let Some(china_content) = root.select(&CHINA_CONTENT).next() {
        let mut category: Option<String> = None;
        for elem in china_content.select(&DIV) {
            if has_class(elem, "column_title") {
                if let Some(a) = elem.select(&A).next() {
                    category = Some(node_text(a));
                }
                continue;
            }
            if has_class(elem, "china_article_form4") {
                if let Some(link) = first_match(elem, &[&*TITLE_MS, &*PAGE_LINK]) {
                    let summary = first_text(elem, &P);
                    articles.extend(principal_from_link(base, link, summary, category.as_deref()));
                }
            } else if has_class(elem, "mid_elem") {
                let link = match elem.select(&MID_TITLE).next() {
                    Some(mid_title) => mid_title.select(&A).next(),
                    None => elem.select(&PAGE_LINK).next(),
                };
                if let Some(link) = link {
                    let summary = first_text(elem, &MID_DESC);
                    articles.extend(principal_from_link(base, link, summary, category.as_deref()));
                }
            }
        }
    }

    if let Some(content_bottom) = root.select(&CONTENT_BOTTOM).next() {
        for li in content_bottom.select(&LI) {
            if let Some(link) = first_match(li, &[&*TITLE_SS, &*PAGE_LINK]) {
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                if let Some(mut article) = article_from_link(base, href, &node_text(link)) {
                    article.is_principal = true;
                    articles.push(article);
                }
            }
        }
    }

    if let Some(list_content) = root.select(&LIST_CONTENT).next() {
        let ul = match list_content.select(&LEVEL01_LIST).next() {
            Some(level01) => level01.select(&UL).next(),
            None => list_content.select(&UL).next(),
        }
        .unwrap_or(list_content);

        for li in ul.select(&LI) {
            let Some(info) = li.select(&LIST_INFO).next() else {
                continue;
            };
            let Some(link) = first_match(info, &[&*TITLE_MS, &*PAGE_LINK]) else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(mut article) = article_from_link(base, href, &node_text(link)) else {
                continue;
            };
            article.summary = first_text(info, &P);
            if let Some(source_time) = info.select(&SOURCE_TIME).next() {
                let (author, published_at) = parse_byline(&source_time.text().collect::<String>());
                article.author = author;
                article.published_at = published_at;
            }
            articles.push(article);
        }
    }

    let articles = dedupe_by_url(articles);
    info!(count = articles.len(), "Global Times China: parsed articles from all sections");
    articles
}

/// Read `<span class="pub_time">Published: Feb 17, 2026 10:37 AM</span>` from an article page.
pub fn parse_article_page(html: &str) -> Option<DateTime<Utc>> {
    let document = Html::parse_document(html);
    let span = document.select(&PUB_TIME).next()?;
    parse_published_marker(&node_text(span))
}

/// Fill `published_at` for principal records by fetching each article page.
///
/// Requests are sequential with `ctx.detail_delay` before each one. A failed fetch
/// or an unparseable marker is logged and leaves the record untouched.
#[instrument(level = "info", skip_all)]
pub async fn enrich_principals<F: FetchPage>(
    articles: &mut [ScrapedArticle],
    ctx: &ScrapeContext<'_, F>,
) {
    let pending: Vec<(usize, String)> = articles
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_principal && a.published_at.is_none())
        .map(|(i, a)| (i, a.url.clone()))
        .collect();
    if pending.is_empty() {
        return;
    }
    info!(count = pending.len(), "Fetching publication dates from article pages");

    let resolved: Vec<(usize, Option<DateTime<Utc>>)> = stream::iter(pending)
        .then(|(i, url)| async move {
            sleep(ctx.detail_delay).await;
            match ctx.fetcher.fetch_page(&url).await {
                Ok(html) => {
                    let published = parse_article_page(&html);
                    match published {
                        Some(dt) => debug!(url = %truncate_for_log(&url, 50), %dt, "Found pub_time"),
                        None => debug!(url = %truncate_for_log(&url, 50), "No pub_time on article page"),
                    }
                    (i, published)
                }
                Err(e) => {
                    warn!(url = %truncate_for_log(&url, 60), error = %e, "Failed to fetch pub_time");
                    (i, None)
                }
            }
        })
        .collect()
        .await;

    for (i, published) in resolved {
        if published.is_some() {
            articles[i].published_at = published;
        }
    }
}
