//! JSON body of the CSV upload endpoint.

use serde::Deserialize;
use serde::Serialize;

/// Source label used when none is given.
pub const DEFAULT_EVENT_SOURCE: &str = "E01 timeline";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Link events to the case IOCs and assets named in each row.
    pub event_sync_iocs_assets: bool,
    pub event_in_summary: bool,
    pub event_in_graph: bool,
    pub event_source: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            event_sync_iocs_assets: false,
            event_in_summary: true,
            event_in_graph: true,
            event_source: DEFAULT_EVENT_SOURCE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvUploadRequest {
    /// Raw CSV text, header included.
    #[serde(rename = "CSVData")]
    pub csv_data: String,
    #[serde(rename = "CSVOptions")]
    pub csv_options: CsvOptions,
}

impl CsvUploadRequest {
    pub fn new(csv_data: String, csv_options: CsvOptions) -> Self {
        Self {
            csv_data,
            csv_options,
        }
    }
}
