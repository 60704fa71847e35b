//! Report output.
//!
//! # Submodules
//!
//! - [`html`]: renders the newsflow digest and the per-source full dump
//! - [`listing`]: plain-text row dump for the `list` command
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── newsflow_diario.html     # combined digest, rewritten on every run
//! └── noticias_coletadas.html  # full dump of one source (report command only)
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub mod html;
pub mod listing;

/// File name of the newsflow digest.
pub const NEWSFLOW_FILENAME: &str = "newsflow_diario.html";

/// File name of the full dump.
pub const FULL_DUMP_FILENAME: &str = "noticias_coletadas.html";

/// Write a rendered report to `dir/filename`, creating `dir` if needed.
///
/// Returns the path written.
#[instrument(level = "info", skip(html), fields(bytes = html.len()))]
pub async fn write_report(dir: &Path, filename: &str, html: &str) -> Result<PathBuf, Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(dir).await {
        error!(dir = %dir.display(), error = %e, "Failed to create output dir");
        return Err(e.into());
    }
    let path = dir.join(filename);
    fs::write(&path, html).await?;
    info!(path = %path.display(), "Wrote report");
    Ok(path)
}
