//! Command-line surface of `iris-timeline-import`.

use std::path::Path;
use std::path::PathBuf;

use clap::Parser;

use crate::client::Auth;
use crate::request::CsvOptions;
use crate::request::DEFAULT_EVENT_SOURCE;

#[derive(Debug, Clone, Parser)]
#[command(
    version,
    about = "Import IRIS timeline events from a CSV file via REST API."
)]
pub struct ImportCli {
    /// Base REST URL, e.g. https://iris.local/api/v1
    #[arg(long = "base-url")]
    pub base_url: String,

    /// IRIS case identifier to import events into.
    #[arg(long = "case-id")]
    pub case_id: i64,

    /// Path to the CSV file to import.
    #[arg(long = "csv")]
    pub csv: PathBuf,

    /// Optional bearer token for the Authorization header.
    #[arg(long = "api-token")]
    pub api_token: Option<String>,

    /// Optional Cookie header value to reuse an existing session.
    #[arg(long = "cookie")]
    pub cookie: Option<String>,

    /// Source label to set on imported events.
    #[arg(long = "event-source", default_value = DEFAULT_EVENT_SOURCE)]
    pub event_source: String,

    /// Do not include imported events in the case summary view.
    #[arg(long = "no-summary")]
    pub no_summary: bool,

    /// Do not include imported events in the timeline visualization graph.
    #[arg(long = "no-graph")]
    pub no_graph: bool,

    /// Enable event_sync_iocs_assets in CSVOptions.
    #[arg(long = "sync-iocs-assets")]
    pub sync_iocs_assets: bool,

    /// Debug logging on stderr.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl ImportCli {
    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            event_sync_iocs_assets: self.sync_iocs_assets,
            event_in_summary: !self.no_summary,
            event_in_graph: !self.no_graph,
            event_source: self.event_source.clone(),
        }
    }

    pub fn auth(&self) -> Auth {
        Auth {
            api_token: self.api_token.clone().filter(|t| !t.is_empty()),
            cookie: self.cookie.clone().filter(|c| !c.is_empty()),
        }
    }
}

/// Expand a leading `~` and make the path absolute.
///
/// Paths that do not exist are still made absolute so the error message
/// names the full location that was checked.
pub fn resolve_csv_path(raw: &Path) -> PathBuf {
    let expanded = match raw.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => raw.to_path_buf(),
        },
        Err(_) => raw.to_path_buf(),
    };
    std::fs::canonicalize(&expanded)
        .or_else(|_| std::path::absolute(&expanded))
        .unwrap_or(expanded)
}
