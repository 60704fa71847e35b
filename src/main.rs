//! # Newsflow
//!
//! A China news digest. Scrapes the China sections of Global Times, Xinhua
//! (China-Biz) and the South China Morning Post, keeps every article in a local
//! SQLite database, and renders a daily HTML report of what was published in the
//! last hours, optionally machine-translated into Portuguese.
//!
//! ## Usage
//!
//! ```sh
//! newsflow                                   # collect everything, rebuild newsflow_diario.html
//! newsflow report --source scmp_china --newsflow --hours 12
//! newsflow list --source globaltimes --limit 20
//! ```
//!
//! ## Architecture
//!
//! The `collect` run is a sequential pipeline:
//! 1. **Collection**: fetch each source's listing page and extract article records
//! 2. **Storage**: upsert each batch keyed by `(source, url)`
//! 3. **Query**: read back the articles published inside the report window
//! 4. **Translation**: optionally translate titles and summaries
//! 5. **Output**: render and write the HTML report

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod collect;
mod config;
mod dates;
mod fetch;
mod models;
mod outputs;
mod scrapers;
mod store;
mod translate;
mod utils;

use cli::{Cli, CollectArgs, Command, ListArgs, ReportArgs};
use collect::{SourceStatus, build_sections, collect_all};
use config::Config;
use fetch::HttpFetcher;
use outputs::html::{ReportOptions, render_full_dump, render_newsflow};
use outputs::listing::write_listing;
use outputs::{FULL_DUMP_FILENAME, NEWSFLOW_FILENAME, write_report};
use scrapers::{SourceDescriptor, find_source, registry};
use store::ArticleStore;
use translate::{GoogleTranslate, TranslationCache, Translator};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init (stderr, so `list` output stays clean) ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = Instant::now();
    info!("newsflow starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(db) = &args.database {
        config.database_path = db.clone();
    }

    let store = ArticleStore::open(&config.database_path)?;
    store.initialize()?;
    info!(path = %config.database_path.display(), "Article store ready");

    match args.command() {
        Command::Collect(collect_args) => run_collect(&config, &store, &collect_args).await?,
        Command::Report(report_args) => run_report(&config, &store, &report_args).await?,
        Command::List(list_args) => run_list(&store, &list_args)?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

async fn run_collect(config: &Config, store: &ArticleStore, args: &CollectArgs) -> Result<(), Box<dyn Error>> {
    // Early check: ensure the output dir is writable before spending time on the network
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let fetcher = HttpFetcher::new(&config.user_agent, config.request_timeout())?;
    let sources = registry();
    let outcomes = collect_all(store, &fetcher, &sources, Utc::now(), config.detail_fetch_delay()).await?;

    let stored: usize = outcomes
        .iter()
        .map(|o| match o.status {
            SourceStatus::Stored(n) => n,
            _ => 0,
        })
        .sum();
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o.status, SourceStatus::Failed(_)))
        .count();
    for outcome in &outcomes {
        if let SourceStatus::Failed(reason) = &outcome.status {
            warn!(source = outcome.source_id, %reason, "Source skipped this run");
        }
    }
    info!(stored, failed, sources = outcomes.len(), "Collection finished");

    let hours = args.hours.unwrap_or(config.window_hours);
    let translate = config.translate && !args.no_translate;
    write_newsflow(config, store, &sources, hours, translate).await?;
    Ok(())
}

async fn run_report(config: &Config, store: &ArticleStore, args: &ReportArgs) -> Result<(), Box<dyn Error>> {
    let Some(source) = find_source(&args.source) else {
        let known = registry().iter().map(|s| s.id).collect::<Vec<_>>().join(", ");
        error!(source = %args.source, %known, "Unknown source");
        return Err(format!("unknown source '{}' (expected one of: {known})", args.source).into());
    };

    if args.newsflow {
        let hours = args.hours.unwrap_or(config.window_hours);
        let translate = args.should_translate(config.translate);
        write_newsflow(config, store, &[source], hours, translate).await?;
        return Ok(());
    }

    if args.translate || args.hours.is_some() {
        warn!("--translate and --hours only apply with --newsflow; ignoring");
    }
    let rows = store.all_for_source(source.id)?;
    let html = render_full_dump(source.id, &rows);
    let path = write_report(&config.output_dir, FULL_DUMP_FILENAME, &html).await?;
    info!(path = %path.display(), count = rows.len(), "Exported full dump");
    Ok(())
}

fn run_list(store: &ArticleStore, args: &ListArgs) -> Result<(), Box<dyn Error>> {
    let rows = store.list(args.source.as_deref(), args.limit)?;
    write_listing(&mut std::io::stdout().lock(), &rows)?;
    Ok(())
}

/// Query, optionally translate, render and write the newsflow report for `sources`.
async fn write_newsflow(
    config: &Config,
    store: &ArticleStore,
    sources: &[SourceDescriptor],
    hours: u32,
    translate: bool,
) -> Result<PathBuf, Box<dyn Error>> {
    let generated_at = Utc::now();

    let sections = if translate {
        info!(lang = %config.target_language, "Translating titles and summaries");
        let mut translator = build_translator(config)?;
        let sections = build_sections(store, sources, hours, generated_at, Some(&mut translator)).await?;
        info!(
            external_calls = translator.calls(),
            cached = translator.cache().len(),
            "Translation finished"
        );
        if let Some(path) = &config.translation_cache_path {
            if let Err(e) = translator.cache().save(path) {
                warn!(path = %path.display(), error = %e, "Failed to save translation cache");
            }
        }
        sections
    } else {
        build_sections::<GoogleTranslate>(store, sources, hours, generated_at, None).await?
    };

    let opts = ReportOptions {
        hours,
        generated_at,
        display_offset: config.display_offset(),
        translated_to: translate.then(|| config.target_language.clone()),
    };
    let html = render_newsflow(&sections, &opts);
    let path = write_report(&config.output_dir, NEWSFLOW_FILENAME, &html).await?;

    let total: usize = sections.iter().map(|s| s.rows.len()).sum();
    info!(path = %path.display(), total, hours, "Exported newsflow report");
    Ok(path)
}

fn build_translator(config: &Config) -> Result<Translator<GoogleTranslate>, Box<dyn Error>> {
    let cache = match &config.translation_cache_path {
        Some(path) => TranslationCache::load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Unreadable translation cache; starting empty");
            TranslationCache::new()
        }),
        None => TranslationCache::new(),
    };
    debug!(warm = !cache.is_empty(), entries = cache.len(), "Translation cache ready");
    let backend = GoogleTranslate::new(&config.user_agent, config.request_timeout())?;
    Ok(Translator::new(backend, config.target_language.clone(), cache)
        .with_pacing(config.translation_delay(), config.translation_pause()))
}
