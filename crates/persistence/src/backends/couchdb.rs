//! CouchDB / Cloudant HTTP client.
//!
//! Speaks the plain CouchDB document API with `reqwest`:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `post_document` | `POST /{db}` |
//! | `get_document` | `GET /{db}/{id}` |
//! | `delete_document` | `DELETE /{db}/{id}?rev={rev}` |
//! | `list_all_documents` | `POST /{db}/_all_docs` |
//! | `find` | `POST /{db}/_find` (bookmark paging) |
//! | `database_exists` | `HEAD /{db}` |
//! | `create_database` | `PUT /{db}` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, trace};

use crate::client::{ClientError, Document, DocumentRow, DocumentStoreClient, WriteResult};
use crate::types::Selector;

const DESIGN_DOC_PREFIX: &str = "_design/";

/// Credentials sent with every request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouchDbAuth {
    /// No credentials (CouchDB "admin party").
    #[default]
    None,
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
}

impl std::fmt::Debug for CouchDbAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouchDbAuth::None => write!(f, "None"),
            CouchDbAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Connection settings for [`CouchDbClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDbConfig {
    /// Service URL, e.g. `http://localhost:5984`.
    pub url: String,

    /// Credentials.
    #[serde(default)]
    pub auth: CouchDbAuth,

    /// Per-request timeout.
    #[serde(with = "crate::humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Page size used when following `_find` bookmarks.
    #[serde(default = "default_find_page_size")]
    pub find_page_size: u32,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_find_page_size() -> u32 {
    200
}

impl Default for CouchDbConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5984".to_string(),
            auth: CouchDbAuth::default(),
            request_timeout: default_request_timeout(),
            find_page_size: default_find_page_size(),
        }
    }
}

/// [`DocumentStoreClient`] over the CouchDB HTTP API.
#[derive(Debug, Clone)]
pub struct CouchDbClient {
    http: reqwest::Client,
    base_url: Url,
    auth: CouchDbAuth,
    find_page_size: u32,
}

/// Error body returned by CouchDB, e.g. `{"error":"conflict","reason":"..."}`.
#[derive(Debug, Default, Deserialize)]
struct CouchErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct AllDocsResponse {
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    id: String,
    value: AllDocsValue,
    #[serde(default)]
    doc: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct AllDocsValue {
    rev: String,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    docs: Vec<Document>,
    #[serde(default)]
    bookmark: Option<String>,
    #[serde(default)]
    warning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OkResponse {
    #[serde(default)]
    ok: bool,
}

impl CouchDbClient {
    /// Creates a client. No request is made until the first operation.
    pub fn new(config: CouchDbConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| ClientError::BadRequest(format!("invalid service URL '{}': {e}", config.url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BadRequest(format!(
                "service URL '{}' cannot be used as a base",
                config.url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            auth: config.auth,
            find_page_size: config.find_page_size.max(1),
        })
    }

    /// The service URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `{base}/{segment}/{segment}...`, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.auth {
            CouchDbAuth::None => builder,
            CouchDbAuth::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        trace!(status = status.as_u16(), url = %response.url(), "CouchDB response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))
    }
}

/// Maps a non-success HTTP status to a [`ClientError`].
pub(crate) fn map_status(status: StatusCode, body: &str) -> ClientError {
    let parsed: CouchErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = match (parsed.error.is_empty(), parsed.reason.is_empty()) {
        (false, false) => format!("{}: {}", parsed.error, parsed.reason),
        (false, true) => parsed.error,
        (true, false) => parsed.reason,
        (true, true) => status.to_string(),
    };

    match status.as_u16() {
        404 => ClientError::NotFound,
        409 | 412 => ClientError::Conflict(message),
        400 | 413 | 415 => ClientError::BadRequest(message),
        401 | 403 => ClientError::Unauthorized(message),
        429 => ClientError::Throttled(message),
        500..=599 => ClientError::Unavailable(message),
        code => ClientError::Status {
            status: code,
            message,
        },
    }
}

fn map_transport_error(err: reqwest::Error) -> ClientError {
    if err.is_decode() {
        ClientError::Malformed(err.to_string())
    } else {
        ClientError::Transport(err.to_string())
    }
}

fn is_design_document(id: &str) -> bool {
    id.starts_with(DESIGN_DOC_PREFIX)
}

#[async_trait]
impl DocumentStoreClient for CouchDbClient {
    async fn post_document(
        &self,
        database: &str,
        document: &Document,
    ) -> Result<WriteResult, ClientError> {
        let url = self.endpoint(&[database]);
        self.send_json(self.request(Method::POST, url).json(document))
            .await
    }

    async fn get_document(&self, database: &str, id: &str) -> Result<Document, ClientError> {
        let url = self.endpoint(&[database, id]);
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn delete_document(
        &self,
        database: &str,
        id: &str,
        rev: &str,
    ) -> Result<WriteResult, ClientError> {
        let mut url = self.endpoint(&[database, id]);
        url.query_pairs_mut().append_pair("rev", rev);
        self.send_json(self.request(Method::DELETE, url)).await
    }

    async fn list_all_documents(
        &self,
        database: &str,
        include_docs: bool,
    ) -> Result<Vec<DocumentRow>, ClientError> {
        let url = self.endpoint(&[database, "_all_docs"]);
        let body = json!({ "include_docs": include_docs });
        let response: AllDocsResponse = self
            .send_json(self.request(Method::POST, url).json(&body))
            .await?;

        Ok(response
            .rows
            .into_iter()
            .filter(|row| !is_design_document(&row.id))
            .map(|row| DocumentRow {
                id: row.id,
                rev: row.value.rev,
                doc: row.doc,
            })
            .collect())
    }

    async fn find(
        &self,
        database: &str,
        selector: &Selector,
    ) -> Result<Vec<Document>, ClientError> {
        let url = self.endpoint(&[database, "_find"]);
        let mut documents = Vec::new();
        let mut bookmark: Option<String> = None;

        loop {
            let mut body = json!({
                "selector": selector,
                "limit": self.find_page_size,
            });
            if let Some(bookmark) = &bookmark {
                body["bookmark"] = json!(bookmark);
            }

            let page: FindResponse = self
                .send_json(self.request(Method::POST, url.clone()).json(&body))
                .await?;
            if let Some(warning) = &page.warning {
                debug!(database, warning = %warning, "CouchDB _find warning");
            }

            let received = page.docs.len();
            documents.extend(page.docs);

            match page.bookmark {
                Some(next) if received as u32 >= self.find_page_size && !next.is_empty() => {
                    bookmark = Some(next);
                }
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn database_exists(&self, database: &str) -> Result<bool, ClientError> {
        let url = self.endpoint(&[database]);
        match self.send(self.request(Method::HEAD, url)).await {
            Ok(_) => Ok(true),
            Err(ClientError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn create_database(&self, database: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&[database]);
        let response: OkResponse = self.send_json(self.request(Method::PUT, url)).await?;
        if response.ok {
            Ok(())
        } else {
            Err(ClientError::Malformed(format!(
                "creating database {database} did not return ok"
            )))
        }
    }
}
