//! `iris-timeline-import`: upload a CSV file of timeline events to an IRIS
//! case through the REST API.
//!
//! The server expects one event per row with the header
//!
//! ```text
//! event_date,event_tz,event_title,event_category,event_content,
//! event_raw,event_source,event_assets,event_iocs,event_tags
//! ```
//!
//! Assets (`;`-separated) and IOCs (`|`-separated) must already exist in the
//! case; the server resolves them to ids. This crate only ships the file: it
//! performs a single POST and reports the outcome.

pub mod cli;
pub mod client;
pub mod report;
pub mod request;

use std::io::Write;

pub use cli::ImportCli;
pub use client::TimelineClient;
pub use request::CsvOptions;
pub use request::CsvUploadRequest;

/// Errors that stop an import before a response is available.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("CSV file not found: {}", .0.display())]
    CsvNotFound(std::path::PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    ReadCsv {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid base URL {url:?}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid {name} header value")]
    Header { name: &'static str },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Run one import and return the process exit code.
///
/// Results go to `out`, failures to `err`. A missing CSV file fails before
/// any network call.
pub async fn run(cli: &ImportCli, out: &mut impl Write, err: &mut impl Write) -> i32 {
    let csv_path = cli::resolve_csv_path(&cli.csv);
    if !csv_path.is_file() {
        let _ = writeln!(err, "{}", ImportError::CsvNotFound(csv_path));
        return 1;
    }

    match import(cli, &csv_path).await {
        Ok(response) => report::report(&response, out, err),
        Err(e) => {
            tracing::debug!("import aborted: {e:?}");
            let _ = writeln!(err, "[-] Import failed: {e}");
            1
        }
    }
}

async fn import(
    cli: &ImportCli,
    csv_path: &std::path::Path,
) -> Result<client::UploadResponse, ImportError> {
    let csv_text = std::fs::read_to_string(csv_path).map_err(|source| ImportError::ReadCsv {
        path: csv_path.to_path_buf(),
        source,
    })?;
    let body = CsvUploadRequest::new(csv_text, cli.csv_options());

    let client = TimelineClient::new(&cli.base_url, cli.auth())?;
    tracing::info!(
        "uploading {} ({} bytes) to case {}",
        csv_path.display(),
        body.csv_data.len(),
        cli.case_id
    );
    client.upload_csv(cli.case_id, &body).await
}
