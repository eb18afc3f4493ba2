//! HTTP client for the timeline CSV upload endpoint.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::COOKIE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde_json::Value;
use url::Url;

use crate::ImportError;
use crate::request::CsvUploadRequest;

/// Path of the upload endpoint below the REST root.
pub const CSV_UPLOAD_PATH: &str = "case/timeline/events/csv_upload";

/// Whole-request timeout. There is a single attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Credentials attached to the request. Both may be set; neither is required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auth {
    pub api_token: Option<String>,
    /// Raw `Cookie:` header value.
    pub cookie: Option<String>,
}

pub fn build_headers(auth: &Auth) -> Result<HeaderMap, ImportError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = &auth.api_token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ImportError::Header { name: "Authorization" })?;
        headers.insert(AUTHORIZATION, value);
    }
    if let Some(cookie) = &auth.cookie {
        let value =
            HeaderValue::from_str(cookie).map_err(|_| ImportError::Header { name: "Cookie" })?;
        headers.insert(COOKIE, value);
    }
    Ok(headers)
}

/// Upload URL for a case. The case is selected with the `cid` query
/// parameter.
pub fn upload_url(base_url: &str, case_id: i64) -> Result<Url, ImportError> {
    let joined = format!("{}/{CSV_UPLOAD_PATH}", base_url.trim_end_matches('/'));
    let mut url = Url::parse(&joined).map_err(|source| ImportError::BaseUrl {
        url: base_url.to_string(),
        source,
    })?;
    url.query_pairs_mut()
        .append_pair("cid", &case_id.to_string());
    Ok(url)
}

/// Status and body of the server's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResponse {
    pub status: StatusCode,
    /// Parsed JSON body, or `{"raw": <text>}` when the body is not JSON.
    pub body: Value,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The `message` field when present and non-empty.
    pub fn message(&self) -> Option<String> {
        match self.body.get("message")? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

pub(crate) fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::json!({ "raw": text }))
}

pub struct TimelineClient {
    http: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl TimelineClient {
    pub fn new(base_url: &str, auth: Auth) -> Result<Self, ImportError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            headers: build_headers(&auth)?,
        })
    }

    /// POST the upload once. Any HTTP status is returned as a response; only
    /// transport failures are errors.
    pub async fn upload_csv(
        &self,
        case_id: i64,
        body: &CsvUploadRequest,
    ) -> Result<UploadResponse, ImportError> {
        let url = upload_url(&self.base_url, case_id)?;
        tracing::debug!("POST {url}");

        let response = self
            .http
            .post(url)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("server answered {status} ({} bytes)", text.len());
        Ok(UploadResponse {
            status,
            body: parse_body(&text),
        })
    }
}
