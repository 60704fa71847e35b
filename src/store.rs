//! SQLite article store.
//!
//! One table, `articles`, keyed by `(source, url)`. Collection runs upsert into it;
//! rows are never deleted. `is_principal` only ever goes from 0 to 1: once an article
//! has been seen in a featured section it stays flagged even if a later run finds it
//! in an ordinary list.
//!
//! Timestamps are stored as naive ISO-8601 text in UTC (`published_at` to the second,
//! `scraped_at` to the microsecond). Readers parse them leniently and skip rows whose
//! `published_at` does not parse instead of failing.

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{Connection, Row, params};
use std::error::Error;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::dates::{SCRAPED_AT_FORMAT, parse_stored, to_stored};
use crate::models::{ScrapedArticle, StoredArticle};

pub const CREATE_ARTICLES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    summary TEXT,
    category TEXT,
    published_at TEXT,
    author TEXT,
    scraped_at TEXT NOT NULL,
    is_principal INTEGER NOT NULL DEFAULT 0,
    UNIQUE(source, url)
)
"#;

pub const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source);
CREATE INDEX IF NOT EXISTS idx_articles_is_principal ON articles(is_principal);
CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at);
CREATE INDEX IF NOT EXISTS idx_articles_url ON articles(url);
"#;

const UPSERT_ARTICLE: &str = r#"
INSERT INTO articles (source, url, title, summary, category, published_at, author, scraped_at, is_principal)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT(source, url) DO UPDATE SET
    title = excluded.title,
    summary = excluded.summary,
    category = excluded.category,
    published_at = excluded.published_at,
    author = excluded.author,
    scraped_at = excluded.scraped_at,
    is_principal = CASE WHEN excluded.is_principal = 1 THEN 1 ELSE articles.is_principal END
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, source, url, title, summary, category, published_at, author, scraped_at, is_principal FROM articles";

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<StoredArticle> {
    Ok(StoredArticle {
        id: row.get(0)?,
        source: row.get(1)?,
        url: row.get(2)?,
        title: row.get(3)?,
        summary: row.get(4)?,
        category: row.get(5)?,
        published_at: row.get(6)?,
        author: row.get(7)?,
        scraped_at: row.get(8)?,
        is_principal: row.get(9)?,
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Handle to the article database.
pub struct ArticleStore {
    conn: Connection,
}

impl ArticleStore {
    /// Open (or create) the database file, creating its parent directory if needed.
    pub fn open(path: &Path) -> Result<Self, Box<dyn Error>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened article store");
        Ok(Self { conn })
    }

    /// In-memory store, used by tests.
    #[cfg(test)]
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Create the table and indexes if missing and add `is_principal` to stores
    /// created before that column existed. Safe to call on every run.
    #[instrument(level = "info", skip_all)]
    pub fn initialize(&self) -> rusqlite::Result<()> {
        self.conn.execute(CREATE_ARTICLES_TABLE, ())?;
        if !self.has_column("is_principal")? {
            self.conn.execute(
                "ALTER TABLE articles ADD COLUMN is_principal INTEGER NOT NULL DEFAULT 0",
                (),
            )?;
            info!("Migrated articles table: added is_principal");
        }
        self.conn.execute_batch(CREATE_INDEXES)?;
        Ok(())
    }

    fn has_column(&self, name: &str) -> rusqlite::Result<bool> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(articles)")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns.iter().any(|c| c == name))
    }

    /// Insert or update every record of a batch, stamped with the current time.
    pub fn upsert_batch(&self, source: &str, articles: &[ScrapedArticle]) -> rusqlite::Result<usize> {
        self.upsert_batch_at(source, articles, Utc::now())
    }

    /// Insert or update every record of a batch, stamped with `scraped_at`.
    ///
    /// Returns the number of records processed, not the number that changed. Each
    /// statement commits on its own.
    #[instrument(level = "info", skip(self, articles), fields(count = articles.len()))]
    pub fn upsert_batch_at(
        &self,
        source: &str,
        articles: &[ScrapedArticle],
        scraped_at: DateTime<Utc>,
    ) -> rusqlite::Result<usize> {
        let scraped_at = scraped_at.format(SCRAPED_AT_FORMAT).to_string();
        let mut stmt = self.conn.prepare_cached(UPSERT_ARTICLE)?;
        let mut count = 0;
        for a in articles {
            stmt.execute(params![
                source,
                a.url,
                a.title,
                non_blank(&a.summary),
                non_blank(&a.category),
                a.published_at.as_ref().map(to_stored),
                non_blank(&a.author),
                scraped_at,
                a.is_principal,
            ])?;
            count += 1;
        }
        Ok(count)
    }

    /// Latest `scraped_at` for `source`, or `None` when it has no rows.
    pub fn last_scraped_at(&self, source: &str) -> rusqlite::Result<Option<String>> {
        self.conn.query_row(
            "SELECT max(scraped_at) FROM articles WHERE source = ?1",
            params![source],
            |row| row.get(0),
        )
    }

    /// Rows of `source` published within the last `hours` hours.
    pub fn query_within_window(&self, source: &str, hours: u32) -> rusqlite::Result<Vec<StoredArticle>> {
        self.query_within_window_at(source, hours, Utc::now())
    }

    /// Rows of `source` whose `published_at` is at or after `now - hours`.
    ///
    /// A window reaching past the earliest representable instant covers every row.
    ///
    /// Newest first; rows with equal timestamps keep the most recently inserted
    /// first. Rows with a missing or unparseable `published_at` are left out.
    pub fn query_within_window_at(
        &self,
        source: &str,
        hours: u32,
        now: DateTime<Utc>,
    ) -> rusqlite::Result<Vec<StoredArticle>> {
        let cutoff = now
            .checked_sub_signed(TimeDelta::hours(i64::from(hours)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE source = ?1 AND published_at IS NOT NULL ORDER BY id DESC"
        ))?;
        let rows = stmt
            .query_map(params![source], article_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut dated: Vec<(DateTime<Utc>, StoredArticle)> = rows
            .into_iter()
            .filter_map(|row| {
                let published = row.published_at.as_deref().and_then(parse_stored)?;
                (published >= cutoff).then_some((published, row))
            })
            .collect();
        // stable sort: ties stay in id DESC order
        dated.sort_by(|a, b| b.0.cmp(&a.0));

        debug!(source, hours, count = dated.len(), "Window query");
        Ok(dated.into_iter().map(|(_, row)| row).collect())
    }

    /// Every row of `source`, most recently inserted first.
    pub fn all_for_source(&self, source: &str) -> rusqlite::Result<Vec<StoredArticle>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE source = ?1 ORDER BY id DESC"))?;
        let rows = stmt
            .query_map(params![source], article_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Up to `limit` rows, optionally for one source, newest publication first.
    pub fn list(&self, source: Option<&str>, limit: usize) -> rusqlite::Result<Vec<StoredArticle>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE (?1 IS NULL OR source = ?1) ORDER BY published_at DESC NULLS LAST, id DESC LIMIT ?2"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![source, limit], article_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    #[cfg(test)]
    fn count(&self) -> rusqlite::Result<i64> {
        self.conn
            .query_row("SELECT count(*) FROM articles", [], |row| row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> ArticleStore {
        let store = ArticleStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 18, h, m, 0).unwrap()
    }

    fn article(url: &str, published: Option<DateTime<Utc>>, principal: bool) -> ScrapedArticle {
        let mut a = ScrapedArticle::new(url, format!("Title {url}"));
        a.published_at = published;
        a.is_principal = principal;
        a
    }

    fn principal_of(store: &ArticleStore, url: &str) -> bool {
        store
            .all_for_source("globaltimes")
            .unwrap()
            .into_iter()
            .find(|r| r.url == url)
            .unwrap()
            .is_principal
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let store = store();
        store.initialize().unwrap();
        assert!(store.has_column("is_principal").unwrap());
    }

    #[test]
    fn test_initialize_migrates_legacy_table() {
        let store = ArticleStore::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TABLE articles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    source TEXT NOT NULL, url TEXT NOT NULL, title TEXT NOT NULL,
                    summary TEXT, category TEXT, published_at TEXT, author TEXT,
                    scraped_at TEXT NOT NULL, UNIQUE(source, url));
                 INSERT INTO articles (source, url, title, scraped_at)
                 VALUES ('globaltimes', 'https://a.test/old', 'Old', '2026-01-01T00:00:00');",
            )
            .unwrap();
        assert!(!store.has_column("is_principal").unwrap());

        store.initialize().unwrap();

        assert!(store.has_column("is_principal").unwrap());
        assert!(!principal_of(&store, "https://a.test/old"));
    }

    #[test]
    fn test_upsert_twice_is_idempotent() {
        let store = store();
        let batch = vec![
            article("https://a.test/1", Some(at(10, 0)), true),
            article("https://a.test/2", None, false),
        ];

        assert_eq!(store.upsert_batch("globaltimes", &batch).unwrap(), 2);
        assert_eq!(store.upsert_batch("globaltimes", &batch).unwrap(), 2);

        assert_eq!(store.count().unwrap(), 2);
        assert!(principal_of(&store, "https://a.test/1"));
        assert!(!principal_of(&store, "https://a.test/2"));
    }

    #[test]
    fn test_principal_is_promoted_never_demoted() {
        let store = store();
        store
            .upsert_batch("globaltimes", &[article("https://a.test/up", None, false)])
            .unwrap();
        store
            .upsert_batch("globaltimes", &[article("https://a.test/up", None, true)])
            .unwrap();
        assert!(principal_of(&store, "https://a.test/up"));

        store
            .upsert_batch("globaltimes", &[article("https://a.test/up", None, false)])
            .unwrap();
        assert!(principal_of(&store, "https://a.test/up"));
    }

    #[test]
    fn test_upsert_updates_mutable_fields() {
        let store = store();
        let mut a = article("https://a.test/1", None, false);
        a.summary = Some("first".to_string());
        store.upsert_batch_at("globaltimes", &[a.clone()], at(9, 0)).unwrap();

        a.title = "Renamed".to_string();
        a.summary = Some("   ".to_string());
        a.published_at = Some(at(8, 30));
        a.author = Some("Liu Xin".to_string());
        store.upsert_batch_at("globaltimes", &[a], at(10, 0)).unwrap();

        let rows = store.all_for_source("globaltimes").unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.title, "Renamed");
        assert!(row.summary.is_none());
        assert_eq!(row.published_at.as_deref(), Some("2026-02-18T08:30:00"));
        assert_eq!(row.author.as_deref(), Some("Liu Xin"));
        assert_eq!(row.scraped_at, "2026-02-18T10:00:00.000000");
    }

    #[test]
    fn test_same_url_different_sources_are_distinct() {
        let store = store();
        let batch = vec![article("https://a.test/shared", None, false)];
        store.upsert_batch("globaltimes", &batch).unwrap();
        store.upsert_batch("scmp_china", &batch).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_last_scraped_at() {
        let store = store();
        assert!(store.last_scraped_at("globaltimes").unwrap().is_none());

        store
            .upsert_batch_at("globaltimes", &[article("https://a.test/1", None, false)], at(9, 0))
            .unwrap();
        store
            .upsert_batch_at("globaltimes", &[article("https://a.test/2", None, false)], at(11, 0))
            .unwrap();
        store
            .upsert_batch_at("scmp_china", &[article("https://a.test/3", None, false)], at(12, 0))
            .unwrap();

        assert_eq!(
            store.last_scraped_at("globaltimes").unwrap().as_deref(),
            Some("2026-02-18T11:00:00.000000")
        );
    }

    #[test]
    fn test_window_excludes_null_old_and_malformed() {
        let store = store();
        let now = at(12, 0);
        store
            .upsert_batch(
                "globaltimes",
                &[
                    article("https://a.test/recent", Some(at(10, 0)), false),
                    article("https://a.test/undated", None, true),
                    article("https://a.test/old", Some(now - TimeDelta::hours(25)), false),
                    article("https://a.test/newest", Some(at(11, 30)), false),
                ],
            )
            .unwrap();
        store
            .conn
            .execute(
                "INSERT INTO articles (source, url, title, published_at, scraped_at)
                 VALUES ('globaltimes', 'https://a.test/bad', 'Bad', 'yesterday', '2026-02-18T12:00:00')",
                (),
            )
            .unwrap();

        let rows = store.query_within_window_at("globaltimes", 24, now).unwrap();
        let urls: Vec<_> = rows.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test/newest", "https://a.test/recent"]);
    }

    #[test]
    fn test_window_ties_prefer_latest_insert() {
        let store = store();
        store
            .upsert_batch(
                "scmp_china",
                &[
                    article("https://a.test/first", Some(at(10, 0)), false),
                    article("https://a.test/second", Some(at(10, 0)), false),
                ],
            )
            .unwrap();
        let rows = store.query_within_window_at("scmp_china", 24, at(12, 0)).unwrap();
        assert_eq!(rows[0].url, "https://a.test/second");
        assert_eq!(rows[1].url, "https://a.test/first");
    }

    #[test]
    fn test_window_accepts_space_separated_timestamps() {
        let store = store();
        store
            .conn
            .execute(
                "INSERT INTO articles (source, url, title, published_at, scraped_at)
                 VALUES ('xinhua_chinabiz', 'https://a.test/x', 'X', '2026-02-18 11:00:00', '2026-02-18T12:00:00')",
                (),
            )
            .unwrap();
        let rows = store.query_within_window_at("xinhua_chinabiz", 24, at(12, 0)).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_huge_window_returns_everything_dated() {
        let store = store();
        store
            .upsert_batch(
                "globaltimes",
                &[
                    article("https://a.test/ancient", Some(Utc.with_ymd_and_hms(1990, 6, 1, 0, 0, 0).unwrap()), false),
                    article("https://a.test/recent", Some(at(10, 0)), false),
                    article("https://a.test/undated", None, false),
                ],
            )
            .unwrap();

        let rows = store.query_within_window_at("globaltimes", u32::MAX, at(12, 0)).unwrap();
        let urls: Vec<_> = rows.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test/recent", "https://a.test/ancient"]);

        assert_eq!(store.query_within_window("globaltimes", u32::MAX).unwrap().len(), 2);
    }

    #[test]
    fn test_window_relative_to_current_time() {
        let store = store();
        let now = Utc::now();
        store
            .upsert_batch(
                "scmp_china",
                &[
                    article("https://a.test/fresh", Some(now - TimeDelta::hours(1)), false),
                    article("https://a.test/stale", Some(now - TimeDelta::hours(48)), false),
                ],
            )
            .unwrap();
        let rows = store.query_within_window("scmp_china", 24).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url, "https://a.test/fresh");
    }

    #[test]
    fn test_list_orders_and_limits() {
        let store = store();
        store
            .upsert_batch(
                "globaltimes",
                &[
                    article("https://a.test/undated", None, false),
                    article("https://a.test/early", Some(at(8, 0)), false),
                    article("https://a.test/late", Some(at(11, 0)), false),
                ],
            )
            .unwrap();
        store
            .upsert_batch("scmp_china", &[article("https://a.test/scmp", Some(at(9, 0)), false)])
            .unwrap();

        let all = store.list(None, 50).unwrap();
        let urls: Vec<_> = all.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://a.test/late",
                "https://a.test/scmp",
                "https://a.test/early",
                "https://a.test/undated",
            ]
        );

        let limited = store.list(Some("globaltimes"), 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert!(limited.iter().all(|r| r.source == "globaltimes"));
    }
}
