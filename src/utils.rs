//! Utility functions for text cleanup, truncation, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Whitespace normalization for text pulled out of HTML nodes
//! - Character-safe truncation for logs, listings, and report summaries
//! - Terminal-safe output for the `list` command
//! - File system validation for output directories

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Collapse runs of whitespace into single spaces and trim the ends.
///
/// Scraped HTML text usually arrives split across nodes with stray newlines and
/// indentation; this turns it into one display line.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(collapse_whitespace("  a\n   b  "), "a b");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate a string to at most `max` characters, appending `marker` when cut.
///
/// Counts characters rather than bytes so multi-byte text never splits mid-codepoint.
pub fn truncate_chars(s: &str, max: usize, marker: &str) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}{}", &s[..idx], marker),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
        None => s.to_string(),
    }
}

/// Strip characters that render badly or not at all in a terminal.
///
/// Removes zero-width spaces, Unicode replacement characters, and control
/// characters other than tab.
pub fn terminal_safe(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '\u{200b}' && *c != '\u{fffd}')
        .filter(|c| !c.is_control() || *c == '\t')
        .collect()
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
