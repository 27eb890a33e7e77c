//! Google Drive v3 REST client.

use std::time::Duration;

use agendafetch_shared::{AgendaFetchError, FileEntry, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::query::children_query;
use crate::{ChildFilter, FOLDER_MIME_TYPE, StorageBackend, kind_for_mime};

/// Default API root.
const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/";

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("AgendaFetch/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Largest page size `files.list` accepts.
const LIST_PAGE_SIZE: &str = "1000";

/// Fields requested from `files.list`.
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
}

impl From<DriveFile> for FileEntry {
    fn from(file: DriveFile) -> Self {
        Self {
            kind: kind_for_mime(&file.mime_type),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ---------------------------------------------------------------------------
// DriveClient
// ---------------------------------------------------------------------------

/// Authenticated Drive v3 client.
pub struct DriveClient {
    client: Client,
    base_url: Url,
    access_token: String,
}

impl DriveClient {
    /// Create a client that authenticates every request with `access_token`.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AgendaFetchError::Network(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| AgendaFetchError::config(format!("invalid Drive base URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            access_token: access_token.into(),
        })
    }

    /// Point the client at a different API root (mock servers in tests).
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// `<base>/drive/v3/files/<segments...>`
    fn files_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AgendaFetchError::config(format!("Drive base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["drive", "v3", "files"])
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.access_token)
    }

    async fn list_page(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<FileList> {
        let url = self.files_url(&[])?;
        let mut params = vec![
            ("q", query),
            ("fields", LIST_FIELDS),
            ("pageSize", LIST_PAGE_SIZE),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let response = send(self.authorized(self.client.get(url).query(&params))).await?;
        read_json(response).await
    }
}

impl StorageBackend for DriveClient {
    #[instrument(skip(self))]
    async fn export(&self, document_id: &str) -> Result<String> {
        let url = self.files_url(&[document_id, "export"])?;
        let request = self
            .client
            .get(url)
            .query(&[("mimeType", "text/html")]);

        let response = send(self.authorized(request)).await?;
        response
            .text()
            .await
            .map_err(|e| AgendaFetchError::Network(format!("failed to read export body: {e}")))
    }

    #[instrument(skip(self, filter))]
    async fn list_children(
        &self,
        container_id: &str,
        filter: &ChildFilter,
    ) -> Result<Vec<FileEntry>> {
        let query = children_query(container_id, filter);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(&query, page_token.as_deref()).await?;
            entries.extend(page.files.into_iter().map(FileEntry::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = entries.len(), "listed children");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn create_container(&self, parent_id: &str, name: &str) -> Result<String> {
        let url = self.files_url(&[])?;
        let body = serde_json::json!({
            "name": name,
            "parents": [parent_id],
            "mimeType": FOLDER_MIME_TYPE,
        });
        let request = self
            .client
            .post(url)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&body);

        let response = send(self.authorized(request)).await?;
        let created: CreatedFile = read_json(response).await?;
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.files_url(&[id])?;
        let request = self
            .client
            .delete(url)
            .query(&[("supportsAllDrives", "true")]);

        send(self.authorized(request)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn copy(&self, source_id: &str, new_name: &str, destination_parent_id: &str) -> Result<()> {
        let url = self.files_url(&[source_id, "copy"])?;
        let body = serde_json::json!({
            "name": new_name,
            "parents": [destination_parent_id],
        });
        let request = self
            .client
            .post(url)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .json(&body);

        send(self.authorized(request)).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Send a request and turn non-2xx responses into [`AgendaFetchError::Backend`].
async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| AgendaFetchError::Network(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.to_string()
            } else {
                body
            }
        });

    Err(AgendaFetchError::Backend {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| AgendaFetchError::Network(format!("failed to read response body: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| AgendaFetchError::parse(format!("unexpected Drive response: {e}")))
}
