use crate::{DocumentService, ProviderError, Tag};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Multipart field carrying the document bytes.
const DOCUMENT_FIELD: &str = "document";
const TAGS_FIELD: &str = "tags";
/// Response bodies are kept for diagnostics up to this many bytes.
const MAX_ERROR_BODY: usize = 4096;

#[derive(Clone, Debug)]
pub struct PaperlessConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl PaperlessConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client for the Paperless-ngx REST API.
#[derive(Clone)]
pub struct PaperlessClient {
    client: Client,
    cfg: Arc<PaperlessConfig>,
}

#[derive(Deserialize)]
struct TagPage {
    results: Vec<Tag>,
    #[serde(default)]
    next: Option<String>,
}

impl PaperlessClient {
    pub fn new(mut cfg: PaperlessConfig) -> Result<Self, ProviderError> {
        cfg.base_url = cfg.base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self {
            client,
            cfg: Arc::new(cfg),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.cfg.base_url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(AUTHORIZATION, format!("Token {}", self.cfg.api_key))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ProviderError> {
        self.authorized(builder)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))
    }
}

async fn status_error(operation: &'static str, resp: Response) -> ProviderError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    ProviderError::Status {
        operation,
        status,
        body: truncate_body(body.trim_end()),
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[async_trait::async_trait]
impl DocumentService for PaperlessClient {
    async fn fetch_tags(&self) -> Result<Vec<Tag>, ProviderError> {
        let mut tags = Vec::new();
        let mut visited = HashSet::new();
        let mut url = Some(format!("{}/api/tags/", self.cfg.base_url));
        while let Some(current) = url.take() {
            if !visited.insert(current.clone()) {
                warn!(url = %current, "tag pagination revisits a page, stopping");
                break;
            }
            debug!(url = %current, "fetching tag page");
            let resp = self.send(self.client.get(&current)).await?;
            if !resp.status().is_success() {
                return Err(status_error("get tags", resp).await);
            }
            let body = resp
                .bytes()
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;
            let page: TagPage = serde_json::from_slice(&body)
                .map_err(|e| ProviderError::Decode(format!("tags response: {e}")))?;
            tags.extend(page.results);
            url = page.next.filter(|next| !next.is_empty());
        }
        Ok(tags)
    }

    async fn upload(&self, path: &Path, tag_ids: &[i64]) -> Result<(), ProviderError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ProviderError::FileOpen {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let mut form = Form::new().part(DOCUMENT_FIELD, Part::bytes(bytes).file_name(file_name));
        for id in tag_ids {
            form = form.text(TAGS_FIELD, id.to_string());
        }

        let builder = self
            .client
            .post(format!("{}/api/documents/post_document/", self.cfg.base_url))
            .timeout(self.cfg.timeout)
            .multipart(form);
        let resp = self.send(builder).await?;
        if !resp.status().is_success() {
            return Err(status_error("upload document", resp).await);
        }
        Ok(())
    }
}
