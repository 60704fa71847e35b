//! Plain-text listing of stored rows for the `list` command.

use std::fmt::Write as _;
use std::io;

use crate::models::StoredArticle;
use crate::utils::{terminal_safe, truncate_chars};

const TITLE_CHARS: usize = 80;
const SUMMARY_CHARS: usize = 100;

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}

/// Render rows as numbered blocks followed by a `Total exibido: N` line.
pub fn render_listing(rows: &[StoredArticle]) -> String {
    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        let title = truncate_chars(&row.title, TITLE_CHARS, "...");
        let summary = truncate_chars(row.summary.as_deref().unwrap_or_default(), SUMMARY_CHARS, "...");
        let _ = write!(
            out,
            "\n--- {n} ---\nsource: {source}\ntitle: {title}\nurl: {url}\nsummary: {summary}\ncategory: {category}\npublished_at: {published}\nauthor: {author}\nscraped_at: {scraped}\n",
            n = i + 1,
            source = row.source,
            url = row.url,
            category = or_none(row.category.as_deref()),
            published = or_none(row.published_at.as_deref()),
            author = or_none(row.author.as_deref()),
            scraped = row.scraped_at,
        );
    }
    let _ = writeln!(out, "\nTotal exibido: {}", rows.len());
    terminal_safe_lines(&out)
}

/// Write the listing of `rows` to `out`.
///
/// A reader closing the pipe early (`newsflow list | head`) is not an error; any
/// other write failure is returned.
pub fn write_listing<W: io::Write>(out: &mut W, rows: &[StoredArticle]) -> io::Result<()> {
    match out.write_all(render_listing(rows).as_bytes()).and_then(|()| out.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Apply [`terminal_safe`] per line so the newlines survive.
fn terminal_safe_lines(s: &str) -> String {
    s.split('\n').map(terminal_safe).collect::<Vec<_>>().join("\n")
}
