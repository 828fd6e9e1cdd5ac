// src/fetch/smartsheet.rs

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::error::SourceError;
use crate::schema::{Attachment, Column, RawRow, RawValue, Sheet};

pub const DEFAULT_API_BASE: &str = "https://api.smartsheet.com/2.0/";

const MAX_RETRIES: u32 = 3;
const BACKOFF_MS: u64 = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSheet {
    id: Option<u64>,
    name: Option<String>,
    #[serde(default)]
    columns: Vec<ApiColumn>,
    #[serde(default)]
    rows: Vec<ApiRow>,
}

#[derive(Debug, Deserialize)]
struct ApiColumn {
    id: u64,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiRow {
    id: Option<u64>,
    #[serde(default)]
    cells: Vec<ApiCell>,
    #[serde(default)]
    attachments: Vec<ApiAttachment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCell {
    column_id: u64,
    #[serde(default)]
    value: Value,
    display_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttachment {
    id: u64,
    #[serde(default)]
    name: String,
    mime_type: Option<String>,
    size_in_kb: Option<u64>,
}

fn json_to_raw(v: Value) -> RawValue {
    match v {
        Value::Null => RawValue::Empty,
        Value::String(s) => RawValue::Text(s),
        Value::Bool(b) => RawValue::Bool(b),
        Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or_default(),
        other => RawValue::Text(other.to_string()),
    }
}

impl ApiCell {
    /// `value`, falling back to `displayValue` when the value is falsy.
    fn into_raw(self) -> RawValue {
        let value = json_to_raw(self.value);
        if !value.is_falsy() {
            return value;
        }
        match self.display_value {
            Some(display) if !display.is_empty() => RawValue::Text(display),
            _ => RawValue::Empty,
        }
    }
}

impl From<ApiSheet> for Sheet {
    fn from(api: ApiSheet) -> Self {
        let columns = api
            .columns
            .into_iter()
            .map(|c| Column::new(c.id, c.title))
            .collect();

        let rows = api
            .rows
            .into_iter()
            .enumerate()
            .map(|(position, row)| RawRow {
                id: row.id,
                position,
                cells: row
                    .cells
                    .into_iter()
                    .map(|cell| (cell.column_id, cell.into_raw()))
                    .filter(|(_, v)| !matches!(v, RawValue::Empty))
                    .collect(),
                attachments: row
                    .attachments
                    .into_iter()
                    .map(|a| Attachment {
                        id: a.id,
                        name: a.name,
                        mime_type: a
                            .mime_type
                            .unwrap_or_else(|| "application/octet-stream".to_string()),
                        size: a.size_in_kb.unwrap_or(0),
                    })
                    .collect(),
            })
            .collect();

        Sheet {
            id: api.id,
            name: api.name,
            columns,
            rows,
        }
    }
}

/// Decode a `GET /sheets/{id}` response body.
pub fn decode_sheet(body: &str) -> Result<Sheet, SourceError> {
    let api: ApiSheet = serde_json::from_str(body)?;
    Ok(api.into())
}

/// Minimal read-only client for the Smartsheet REST API.
#[derive(Debug, Clone)]
pub struct SmartsheetClient {
    http: Client,
    base: Url,
    token: String,
}

impl SmartsheetClient {
    pub fn new(base: &str, token: impl Into<String>) -> anyhow::Result<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
            token: token.into(),
        })
    }

    pub fn sheet_url(
        &self,
        sheet_id: u64,
        include_attachments: bool,
    ) -> Result<Url, url::ParseError> {
        let mut url = self.base.join(&format!("sheets/{sheet_id}"))?;
        if include_attachments {
            url.query_pairs_mut().append_pair("include", "attachments");
        }
        Ok(url)
    }

    /// Fetch and decode one sheet, retrying transient failures.
    #[instrument(level = "info", skip(self))]
    pub async fn get_sheet(
        &self,
        sheet_id: u64,
        include_attachments: bool,
    ) -> anyhow::Result<Sheet> {
        let url = self.sheet_url(sheet_id, include_attachments)?;
        let body = self.get_text_with_retry(&url).await?;
        let sheet = decode_sheet(&body)?;
        info!(
            name = sheet.name.as_deref().unwrap_or("?"),
            columns = sheet.columns.len(),
            rows = sheet.rows.len(),
            "fetched sheet"
        );
        Ok(sheet)
    }

    async fn get_text_core(&self, url: &Url) -> Result<String, SourceError> {
        debug!("Fetching {}", url);
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn get_text_with_retry(&self, url: &Url) -> Result<String, SourceError> {
        let mut attempts = 0;
        loop {
            match self.get_text_core(url).await {
                Ok(t) => return Ok(t),
                Err(e) if attempts < MAX_RETRIES && is_transient(&e) => {
                    attempts += 1;
                    let backoff = BACKOFF_MS * 2u64.pow(attempts - 1);
                    warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    error!(%url, error = %e, "Giving up");
                    return Err(e);
                }
            }
        }
    }
}

/// Network errors, throttling and server errors are worth another try;
/// auth and not-found are not.
fn is_transient(err: &SourceError) -> bool {
    match err {
        SourceError::Http(_) => true,
        SourceError::Api { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
        }
        _ => false,
    }
}
