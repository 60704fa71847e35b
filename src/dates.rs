//! Timestamp normalization for the supported sources.
//!
//! Every source publishes dates in its own textual convention. The parsers in this
//! module turn those strings into UTC instants and return `None` on anything they do
//! not recognise; a bad date never fails an extraction.
//!
//! | Source | Format | Parser |
//! |--------|--------|--------|
//! | Global Times listing | `By Author \| 2026/2/18 21:38:48` | [`parse_byline`] |
//! | Global Times article | `Published: Feb 17, 2026 10:37 AM` | [`parse_published_marker`] |
//! | SCMP | `datetime="2026-02-18T19:12:50.000Z"` or `2 hours ago` | [`parse_iso_attr`], [`parse_relative`] |
//! | Xinhua | `2026-02-18 16:20:00` | [`parse_listing_time`] |
//!
//! Naive timestamps (Global Times, Xinhua) are taken as UTC wall-clock values, which
//! is also how the store interprets them.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Storage format for `published_at`.
pub const STORED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Storage format for `scraped_at` (microsecond precision).
pub const SCRAPED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

static BYLINE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\|\s*").unwrap());
static RELATIVE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*(minute|hour|day)s?\s+ago").unwrap());

/// Build a fixed offset from whole hours east of UTC, falling back to UTC when out of range.
pub fn offset_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Hong Kong time (UTC+8, no daylight saving).
pub fn hong_kong() -> FixedOffset {
    offset_hours(8)
}

/// First `n` characters of `s` (the whole string when shorter).
fn prefix(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map(|(i, _)| &s[..i]).unwrap_or(s)
}

fn naive_as_utc(s: &str, formats: &[&str]) -> Option<DateTime<Utc>> {
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn strip_by(s: &str) -> &str {
    match s.get(..3) {
        Some(head) if head.eq_ignore_ascii_case("by ") => s[3..].trim(),
        _ => s,
    }
}

/// Parse a Global Times byline such as `By Liu Xin | 2026/2/18 21:38:48`.
///
/// Returns the author (with any `By ` prefix removed) and the timestamp. Seconds are
/// optional. Either half may be missing.
pub fn parse_byline(text: &str) -> (Option<String>, Option<DateTime<Utc>>) {
    let text = text.trim();
    if text.is_empty() {
        return (None, None);
    }

    let mut parts = BYLINE_SEPARATOR.splitn(text, 2);
    let author = parts
        .next()
        .map(|a| strip_by(strip_by(a.trim())).to_string())
        .filter(|a| !a.is_empty());
    let published = parts
        .next()
        .and_then(|d| naive_as_utc(d.trim(), &["%Y/%m/%d %H:%M:%S", "%Y/%m/%d %H:%M"]));

    (author, published)
}

/// Parse the article-page marker `Published: Feb 17, 2026 10:37 AM`.
pub fn parse_published_marker(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let text = text.strip_prefix("Published:").map(str::trim).unwrap_or(text);
    if text.is_empty() {
        return None;
    }
    naive_as_utc(text, &["%b %d, %Y %I:%M %p", "%B %d, %Y %I:%M %p"])
}

/// Parse a machine-readable `datetime` attribute.
///
/// RFC 3339 values are converted to UTC. Anything else falls back to the first 19
/// characters read as a UTC wall-clock time.
pub fn parse_iso_attr(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    naive_as_utc(prefix(value, 19), &["%Y-%m-%dT%H:%M:%S"])
}

/// Resolve `N minute(s)/hour(s)/day(s) ago` against `now` in the source's local time.
pub fn parse_relative(text: &str, now: DateTime<FixedOffset>) -> Option<DateTime<Utc>> {
    let text = text.trim().to_lowercase();
    let caps = RELATIVE_TIME.captures(&text)?;
    let n: i64 = caps[1].parse().ok()?;
    let delta = match &caps[2] {
        "minute" => TimeDelta::try_minutes(n)?,
        "hour" => TimeDelta::try_hours(n)?,
        _ => TimeDelta::try_days(n)?,
    };
    now.checked_sub_signed(delta).map(|dt| dt.with_timezone(&Utc))
}

/// Parse a Xinhua listing time `2026-02-18 16:20:00` (seconds optional).
pub fn parse_listing_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    naive_as_utc(prefix(text, 19), &["%Y-%m-%d %H:%M:%S"])
        .or_else(|| naive_as_utc(prefix(text, 16), &["%Y-%m-%d %H:%M"]))
}

/// Parse a timestamp read back from the store. Accepts `T` or space separators and
/// ignores fractional seconds or offsets past the 19th character.
pub fn parse_stored(value: &str) -> Option<DateTime<Utc>> {
    let s = prefix(value.trim(), 19);
    if s.contains('T') {
        naive_as_utc(s, &[STORED_FORMAT])
    } else {
        naive_as_utc(s, &["%Y-%m-%d %H:%M:%S"])
    }
}

/// Format an instant for the `published_at` column.
pub fn to_stored(dt: &DateTime<Utc>) -> String {
    dt.format(STORED_FORMAT).to_string()
}
