//! HTML report rendering.
//!
//! Two documents are produced:
//!
//! - **Newsflow** ([`render_newsflow`]): the daily digest. A header with totals and
//!   the source list, then one section per source with the articles published inside
//!   the report window, newest first.
//! - **Full dump** ([`render_full_dump`]): every stored row of one source, most
//!   recently inserted first, with raw timestamps.
//!
//! Rendering is pure. Every time shown is derived from the inputs (including "now",
//! which is [`ReportOptions::generated_at`]), so the same rows always give the same
//! bytes. All scraped text is HTML-escaped; summaries are cut before escaping so an
//! entity is never split.

use chrono::{DateTime, FixedOffset, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::dates::parse_stored;
use crate::models::StoredArticle;
use crate::utils::truncate_chars;

/// Characters of summary shown on a newsflow card.
pub const CARD_SUMMARY_CHARS: usize = 320;

/// Characters of summary shown in the full dump.
pub const DUMP_SUMMARY_CHARS: usize = 300;

/// One source's block in the newsflow report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub source_id: String,
    pub display_name: String,
    /// Rows to show, already ordered (and translated, if requested).
    pub rows: Vec<StoredArticle>,
    /// Latest `scraped_at` for the source, as stored.
    pub last_scraped_at: Option<String>,
}

/// Rendering parameters shared by every section.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// Window length shown in the header and section headings.
    pub hours: u32,
    /// Reference instant for the header, the footer and recency labels.
    pub generated_at: DateTime<Utc>,
    /// Timezone every displayed time is converted to.
    pub display_offset: FixedOffset,
    /// Target language when titles and summaries were machine-translated.
    pub translated_to: Option<String>,
}

const STYLE: &str = r#"    :root {
      --bg: #fafafa;
      --surface: #ffffff;
      --text: #1a1a1a;
      --text-muted: #5c5c5c;
      --border: #e5e5e5;
      --accent: #0d47a1;
      --accent-soft: #e3f2fd;
      --principal-bg: #f5f5f5;
      --radius: 8px;
      --shadow: 0 1px 3px rgba(0,0,0,.06);
    }
    * { box-sizing: border-box; }
    body {
      margin: 0;
      padding: 0;
      font-family: 'DM Sans', system-ui, -apple-system, sans-serif;
      font-size: 15px;
      line-height: 1.5;
      color: var(--text);
      background: var(--bg);
      min-height: 100vh;
    }
    .wrap { max-width: 720px; margin: 0 auto; padding: 24px 20px 48px; }
    .header {
      background: var(--surface);
      border-radius: var(--radius);
      padding: 24px 28px;
      margin-bottom: 24px;
      box-shadow: var(--shadow);
      border: 1px solid var(--border);
    }
    .header h1 {
      font-family: 'DM Serif Display', Georgia, serif;
      font-size: 1.75rem;
      font-weight: 400;
      margin: 0 0 8px 0;
      letter-spacing: -0.02em;
    }
    .header .sub { font-size: 0.8125rem; color: var(--text-muted); margin-bottom: 16px; }
    .header .sub.translated { color: var(--accent); font-weight: 500; }
    .meta-bar {
      display: flex;
      flex-wrap: wrap;
      gap: 20px 24px;
      font-size: 0.8125rem;
      color: var(--text-muted);
      padding-top: 16px;
      border-top: 1px solid var(--border);
    }
    .meta-bar strong { color: var(--text); font-weight: 500; }
    .stats { display: flex; gap: 16px; margin-top: 12px; flex-wrap: wrap; }
    .stat {
      background: var(--accent-soft);
      color: var(--accent);
      padding: 6px 12px;
      border-radius: 6px;
      font-size: 0.8125rem;
      font-weight: 500;
    }
    .source-section { margin-top: 32px; }
    .section-title {
      font-family: 'DM Serif Display', Georgia, serif;
      font-size: 1.125rem;
      font-weight: 400;
      margin: 28px 0 12px 0;
      letter-spacing: -0.01em;
    }
    .section-title:first-of-type { margin-top: 0; }
    .section-subtitle { font-size: 1rem; margin-top: 16px; }
    .section-desc { font-size: 0.8125rem; color: var(--text-muted); margin: 0 0 16px 0; }
    .card {
      background: var(--surface);
      border-radius: var(--radius);
      padding: 18px 20px;
      margin-bottom: 12px;
      box-shadow: var(--shadow);
      border: 1px solid var(--border);
      transition: border-color .15s, box-shadow .15s;
    }
    .card:hover { border-color: #ccc; box-shadow: 0 2px 8px rgba(0,0,0,.08); }
    .card.principal { background: var(--principal-bg); border-left: 3px solid var(--accent); }
    .card h2 { font-size: 1rem; font-weight: 600; margin: 0 0 8px 0; line-height: 1.35; }
    .card h2 a { color: var(--text); text-decoration: none; }
    .card h2 a:hover { color: var(--accent); text-decoration: underline; }
    .card .meta { font-size: 0.75rem; color: var(--text-muted); margin-bottom: 8px; }
    .card .summary { font-size: 0.875rem; color: var(--text-muted); margin: 0; line-height: 1.45; }
    .card .summary:empty { display: none; }
    .footer {
      margin-top: 40px;
      padding-top: 20px;
      border-top: 1px solid var(--border);
      font-size: 0.75rem;
      color: var(--text-muted);
      text-align: center;
    }
    @media (max-width: 600px) {
      .wrap { padding: 16px 14px 32px; }
      .header { padding: 20px 18px; }
      .header h1 { font-size: 1.5rem; }
      .card { padding: 14px 16px; }
    }
"#;

const FONTS: &str = r#"  <link rel="preconnect" href="https://fonts.googleapis.com">
  <link rel="preconnect" href="https://fonts.gstatic.com" crossorigin>
  <link href="https://fonts.googleapis.com/css2?family=DM+Sans:ital,opsz,wght@0,9..40,400;0,9..40,500;0,9..40,600;0,9..40,700&family=DM+Serif+Display&display=swap" rel="stylesheet">
"#;

/// Summary text for a card: trimmed, cut to 320 characters plus `…` when longer.
pub fn truncate_summary(summary: &str) -> String {
    truncate_chars(summary.trim(), CARD_SUMMARY_CHARS, "…")
}

/// `DD/MM/YYYY às HH:MM` in the display timezone.
///
/// Values that do not parse fall back to their first 16 characters.
pub fn format_full_datetime(value: &str, offset: FixedOffset) -> String {
    match parse_stored(value) {
        Some(dt) => dt.with_timezone(&offset).format("%d/%m/%Y às %H:%M").to_string(),
        None => truncate_chars(value.trim(), 16, ""),
    }
}

/// Short recency label for a stored timestamp, relative to `now`.
///
/// Same calendar day → `HH:MM`, previous day → `ontem HH:MM`, anything else →
/// `DD/MM HH:MM`, all in the display timezone.
pub fn format_recency(value: &str, now: DateTime<Utc>, offset: FixedOffset) -> String {
    let Some(dt) = parse_stored(value) else {
        return truncate_chars(value.trim(), 16, "");
    };
    let local = dt.with_timezone(&offset);
    let today = now.with_timezone(&offset).date_naive();

    if local.date_naive() == today {
        local.format("%H:%M").to_string()
    } else if today.pred_opt() == Some(local.date_naive()) {
        local.format("ontem %H:%M").to_string()
    } else {
        local.format("%d/%m %H:%M").to_string()
    }
}

/// "Global Times — China" → "Global Times", "Xinhua China-Biz" → "Xinhua".
fn short_source_name(display_name: &str) -> &str {
    match display_name.split_once('—') {
        Some((head, _)) => head.trim(),
        None => display_name
            .strip_suffix(" China-Biz")
            .unwrap_or(display_name)
            .trim(),
    }
}

/// Comma list with `e` before the last item: "A, B e C".
fn join_pt(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} e {}", init.join(", "), last),
    }
}

fn translation_banner(lang: &str) -> String {
    if lang.eq_ignore_ascii_case("pt") {
        "Tradução automática para português (EN/ZH → PT)".to_string()
    } else {
        format!("Tradução automática (→ {})", lang.to_uppercase())
    }
}

fn render_card(row: &StoredArticle, opts: &ReportOptions) -> String {
    let time = row
        .published_at
        .as_deref()
        .map(|p| format_recency(p, opts.generated_at, opts.display_offset))
        .filter(|t| !t.is_empty());
    let meta = [time.as_deref(), row.author.as_deref(), row.category.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" · ");
    let summary = truncate_summary(row.summary.as_deref().unwrap_or_default());
    let class = if row.is_principal { "card principal" } else { "card" };

    format!(
        r#"      <article class="{class}">
        <h2><a href="{url}" target="_blank" rel="noopener">{title}</a></h2>
        <p class="meta"><span>{meta}</span></p>
        <p class="summary">{summary}</p>
      </article>
"#,
        url = encode_double_quoted_attribute(&row.url),
        title = encode_text(row.title.trim()),
        meta = encode_text(&meta),
        summary = encode_text(&summary),
    )
}

fn render_section(section: &ReportSection, opts: &ReportOptions) -> String {
    let last_update = section
        .last_scraped_at
        .as_deref()
        .map(|s| format_full_datetime(s, opts.display_offset))
        .unwrap_or_else(|| "—".to_string());

    let mut out = format!(
        r#"
    <section class="source-section" aria-label="{label}" id="{id}">
      <h2 class="section-title">{name}</h2>
      <p class="section-desc">{last_update} (última atualização)</p>
      <h3 class="section-title section-subtitle">Últimas {hours} horas</h3>
"#,
        label = encode_double_quoted_attribute(&section.display_name),
        id = encode_double_quoted_attribute(&section.source_id),
        name = encode_text(&section.display_name),
        last_update = encode_text(&last_update),
        hours = opts.hours,
    );
    for row in &section.rows {
        out.push_str(&render_card(row, opts));
    }
    out.push_str("    </section>\n");
    out
}

/// Render the newsflow digest for `sections`, in the order given.
pub fn render_newsflow(sections: &[ReportSection], opts: &ReportOptions) -> String {
    let generated = opts
        .generated_at
        .with_timezone(&opts.display_offset)
        .format("%d/%m/%Y às %H:%M")
        .to_string();
    let total: usize = sections.iter().map(|s| s.rows.len()).sum();
    let short_names: Vec<&str> = sections
        .iter()
        .map(|s| short_source_name(&s.display_name))
        .collect();
    let full_names = sections
        .iter()
        .map(|s| s.display_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::new();
    out.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Newsflow China — Visão diária</title>
{FONTS}  <style>
{STYLE}  </style>
</head>
<body>
  <div class="wrap">
    <header class="header">
      <h1>Newsflow China</h1>
"#
    ));
    if let Some(lang) = &opts.translated_to {
        out.push_str(&format!(
            "      <p class=\"sub translated\">{}</p>\n",
            encode_text(&translation_banner(lang))
        ));
    }
    out.push_str(&format!(
        r#"      <div class="stats">
        <span class="stat">{total} notícias no total</span>
        <span class="stat">Janela: últimas {hours} h</span>
      </div>
      <div class="meta-bar">
        <span><strong>Fontes:</strong> {sources}</span>
        <span><strong>Atualizado em</strong> {generated}</span>
      </div>
    </header>
"#,
        hours = opts.hours,
        sources = encode_text(&join_pt(&short_names)),
        generated = encode_text(&generated),
    ));

    for section in sections {
        out.push_str(&render_section(section, opts));
    }

    out.push_str(&format!(
        r#"
    <footer class="footer">
      Newsflow China · Atualizado em {generated} · Fontes: {sources}
    </footer>
  </div>
</body>
</html>
"#,
        generated = encode_text(&generated),
        sources = encode_text(&full_names),
    ));
    out
}

/// Render every row of one source as a plain list.
pub fn render_full_dump(source: &str, rows: &[StoredArticle]) -> String {
    let mut out = format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="UTF-8">
  <title>Notícias Coletadas</title>
  <style>
    body {{ font-family: system-ui, sans-serif; margin: 2rem; max-width: 900px; }}
    .article {{ border-bottom: 1px solid #eee; padding: 1rem 0; }}
    .article h3 {{ margin: 0 0 .5rem; }}
    .meta {{ color: #666; font-size: .9rem; }}
    a {{ color: #06c; }}
  </style>
</head>
<body>
  <h1>Notícias Coletadas ({count} itens)</h1>
"#,
        count = rows.len()
    );

    for row in rows {
        let published = row
            .published_at
            .as_deref()
            .map(|p| truncate_chars(p, 19, "").replace('T', " "));
        let meta = [
            published.as_deref(),
            row.author.as_deref(),
            row.category.as_deref(),
            Some(source),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");
        let summary = truncate_chars(
            row.summary.as_deref().unwrap_or_default().trim(),
            DUMP_SUMMARY_CHARS,
            "...",
        );

        out.push_str(&format!(
            r#"  <div class="article">
    <h3><a href="{url}" target="_blank" rel="noopener">{title}</a></h3>
    <p class="meta">{meta}</p>
    <p>{summary}</p>
  </div>
"#,
            url = encode_double_quoted_attribute(&row.url),
            title = encode_text(row.title.trim()),
            meta = encode_text(&meta),
            summary = encode_text(&summary),
        ));
    }

    out.push_str("</body>\n</html>\n");
    out
}
