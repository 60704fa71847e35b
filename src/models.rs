//! Data models for scraped and stored articles.
//!
//! - [`ScrapedArticle`]: one record produced by a source extractor, before it is
//!   persisted (it carries no `scraped_at`)
//! - [`StoredArticle`]: one row of the `articles` table as read back from the store
//!
//! Timestamps on stored rows are kept as the strings found in the database so that a
//! malformed value can be skipped by the readers instead of failing the whole query.

use chrono::{DateTime, Utc};

/// An article as extracted from a source listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedArticle {
    /// Absolute URL with the query string removed.
    pub url: String,
    /// Headline text, never empty.
    pub title: String,
    pub summary: Option<String>,
    pub category: Option<String>,
    /// Publication instant in UTC, when the source exposes one.
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    /// True for articles taken from a featured/top section of the listing.
    pub is_principal: bool,
}

impl ScrapedArticle {
    /// Create a record with only the required fields set.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            summary: None,
            category: None,
            published_at: None,
            author: None,
            is_principal: false,
        }
    }
}

/// A row of the `articles` table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArticle {
    /// Insertion order key.
    pub id: i64,
    pub source: String,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub category: Option<String>,
    /// Naive ISO-8601 string interpreted as UTC.
    pub published_at: Option<String>,
    pub author: Option<String>,
    pub scraped_at: String,
    pub is_principal: bool,
}
