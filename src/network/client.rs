//! HTTP client wrapper - CRUD, export and import calls against the timetable API

use std::path::Path;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::Deserialize;

use crate::constants::REQUEST_TIMEOUT_SECS;
use crate::error::ConsoleError;
use crate::models::{DocumentKind, ExportFilter, ListQuery, Record, RecordDraft, RecordId, ResourceKind};

/// How create/update payloads are encoded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    #[default]
    Multipart,
    Json,
}

#[derive(Deserialize)]
struct ImportReply {
    #[serde(default)]
    count: u64,
}

/// Resource client for one API base URL
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    encoding: PayloadEncoding,
}

impl ApiClient {
    pub fn new(base_url: &str, encoding: PayloadEncoding) -> Self {
        ApiClient {
            http: create_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            encoding,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn record_url(&self, kind: ResourceKind, id: RecordId) -> String {
        self.url(&format!("{}/{}", kind.api_path(), id))
    }

    fn list_request(&self, kind: ResourceKind, query: &ListQuery) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .get(self.url(kind.api_path()))
            .header(ACCEPT, "application/json");
        if !query.is_empty() {
            builder = builder.query(query.pairs());
        }
        builder
    }

    fn mutation_request(&self, method: Method, url: String, draft: &RecordDraft) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url).header(ACCEPT, "application/json");
        match self.encoding {
            PayloadEncoding::Multipart => {
                let form = draft
                    .form_fields()
                    .into_iter()
                    .fold(Form::new(), |form, (key, value)| form.text(key, value));
                builder.multipart(form)
            }
            PayloadEncoding::Json => builder.json(&draft.to_json()),
        }
    }

    fn export_request(&self, document: DocumentKind, filter: &ExportFilter) -> reqwest::RequestBuilder {
        let mut builder = self.http.get(self.url(document.api_path()));
        let query = filter.query();
        if document.accepts_filter() && !query.is_empty() {
            builder = builder.query(query.pairs());
        }
        builder
    }

    /// Fetch the full (or server-narrowed) collection of `kind`
    pub async fn list(&self, kind: ResourceKind, query: &ListQuery) -> Result<Vec<Record>, ConsoleError> {
        let resp = check_status(self.list_request(kind, query).send().await?).await?;
        let value: serde_json::Value = resp.json().await?;
        Record::parse_list(kind, value).map_err(|e| ConsoleError::Decode(e.to_string()))
    }

    pub async fn create(&self, draft: &RecordDraft) -> Result<Record, ConsoleError> {
        let kind = draft.kind();
        let req = self.mutation_request(Method::POST, self.url(kind.api_path()), draft);
        let resp = check_status(req.send().await?).await?;
        let value: serde_json::Value = resp.json().await?;
        Record::parse_one(kind, value).map_err(|e| ConsoleError::Decode(e.to_string()))
    }

    pub async fn update(&self, id: RecordId, draft: &RecordDraft) -> Result<Record, ConsoleError> {
        let kind = draft.kind();
        let req = self.mutation_request(Method::PUT, self.record_url(kind, id), draft);
        let resp = check_status(req.send().await?).await?;
        let value: serde_json::Value = resp.json().await?;
        Record::parse_one(kind, value).map_err(|e| ConsoleError::Decode(e.to_string()))
    }

    /// Delete one record; the success body is ignored
    pub async fn delete(&self, kind: ResourceKind, id: RecordId) -> Result<(), ConsoleError> {
        let req = self.http.delete(self.record_url(kind, id));
        check_status(req.send().await?).await?;
        Ok(())
    }

    /// Download a generated document
    pub async fn export_document(
        &self,
        document: DocumentKind,
        filter: &ExportFilter,
    ) -> Result<Vec<u8>, ConsoleError> {
        let resp = check_status(self.export_request(document, filter).send().await?).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// Upload a file for bulk import, returning the imported record count
    pub async fn import_file(&self, path: &Path) -> Result<u64, ConsoleError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "import".to_string());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let req = self
            .http
            .post(self.url("import"))
            .header(ACCEPT, "application/json")
            .multipart(form);
        let resp = check_status(req.send().await?).await?;
        let reply: ImportReply = resp.json().await?;
        Ok(reply.count)
    }
}

/// Turn a non-success response into [`ConsoleError::Status`]
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ConsoleError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

/// Error for a failed status. FastAPI reports `{"detail": ...}`; other
/// bodies are used verbatim, an empty body falls back to the reason phrase.
pub fn status_error(status: StatusCode, body: &str) -> ConsoleError {
    let body = body.trim();
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
    let message = match detail {
        Some(d) => d,
        None if !body.is_empty() => body.to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    ConsoleError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Create an HTTP client with default configuration
pub fn create_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
