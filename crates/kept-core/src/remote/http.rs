//! REST client for the hosted Kept backend.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::{FileTransfer, RemoteStore};
use crate::config::ClientConfig;
use crate::models::{FileRecord, FileUpload, Resource, ResourceKind};
use crate::util::compact_text;
use crate::{Error, Result};

/// HTTP client speaking the backend's `/v1/{collection}` routes.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    access_token: Option<String>,
}

impl HttpBackend {
    /// Builds a client for an explicit API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into().as_str(), None)
    }

    /// Builds a client from validated client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let backend = Self::build(
            &config.api_base_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )?;
        Ok(match config.access_token.as_deref() {
            Some(token) => backend.with_access_token(token),
            None => backend,
        })
    }

    fn build(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self {
            base_url,
            client,
            access_token: None,
        })
    }

    /// Attach a bearer token to every request.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.trim().is_empty()).then_some(token);
        self
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, kind: ResourceKind) -> String {
        format!("{}/v1/{}", self.base_url, kind.collection())
    }

    fn record_url(&self, kind: ResourceKind, id: &str) -> String {
        format!("{}/{}", self.collection_url(kind), urlencoding::encode(id))
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match self.access_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(failure(response, action).await)
    }

    /// Like [`Self::send`], but maps HTTP 404 to `None`.
    async fn send_optional(&self, request: RequestBuilder, action: &str) -> Result<Option<Response>> {
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if response.status().is_success() {
            return Ok(Some(response));
        }
        Err(failure(response, action).await)
    }

    async fn transition<R: Resource>(&self, id: &str, route: &str) -> Result<Option<R>> {
        let url = format!("{}/{route}", self.record_url(R::KIND, id));
        let action = format!("{route} {}", R::KIND);
        match self.send_optional(self.request(Method::POST, url), &action).await? {
            Some(response) => Ok(Some(response.json::<R>().await?)),
            None => Ok(None),
        }
    }
}

impl<R: Resource> RemoteStore<R> for HttpBackend {
    async fn list(&self, user_id: &str) -> Result<Vec<R>> {
        let url = format!(
            "{}?user_id={}",
            self.collection_url(R::KIND),
            urlencoding::encode(user_id)
        );
        let action = format!("list {}", R::KIND.collection());
        let response = self.send(self.request(Method::GET, url), &action).await?;
        Ok(response.json::<Vec<R>>().await?)
    }

    async fn get(&self, id: &str) -> Result<Option<R>> {
        let url = self.record_url(R::KIND, id);
        let action = format!("get {}", R::KIND);
        match self.send_optional(self.request(Method::GET, url), &action).await? {
            Some(response) => Ok(Some(response.json::<R>().await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, input: &R::Input) -> Result<R> {
        let request = self
            .request(Method::POST, self.collection_url(R::KIND))
            .json(input);
        let action = format!("create {}", R::KIND);
        let response = self.send(request, &action).await?;
        Ok(response.json::<R>().await?)
    }

    async fn update(&self, id: &str, patch: &R::Patch) -> Result<Option<R>> {
        let request = self
            .request(Method::PATCH, self.record_url(R::KIND, id))
            .json(patch);
        let action = format!("update {}", R::KIND);
        match self.send_optional(request, &action).await? {
            Some(response) => Ok(Some(response.json::<R>().await?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.record_url(R::KIND, id);
        let action = format!("delete {}", R::KIND);
        self.send(self.request(Method::DELETE, url), &action).await?;
        Ok(())
    }

    async fn archive(&self, id: &str) -> Result<Option<R>> {
        self.transition::<R>(id, "archive").await
    }

    async fn restore(&self, id: &str) -> Result<Option<R>> {
        self.transition::<R>(id, "restore").await
    }
}

impl FileTransfer for HttpBackend {
    async fn upload_file(&self, upload: &FileUpload) -> Result<FileRecord> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.name.clone())
            .mime_str(&upload.mime_type)?;
        let form = Form::new()
            .text("user_id", upload.user_id.clone())
            .text("name", upload.name.clone())
            .part("file", part);
        let url = format!("{}/upload", self.collection_url(ResourceKind::File));
        let response = self
            .send(self.request(Method::POST, url).multipart(form), "upload file")
            .await?;
        Ok(response.json::<FileRecord>().await?)
    }

    async fn file_download_url(&self, path: &str) -> Result<String> {
        let url = format!(
            "{}/download-url?path={}",
            self.collection_url(ResourceKind::File),
            urlencoding::encode(path)
        );
        let response = self
            .send(self.request(Method::GET, url), "request download URL")
            .await?;
        let payload = response.json::<DownloadUrlResponse>().await?;
        Ok(payload.url)
    }
}

#[derive(Debug, Deserialize)]
struct DownloadUrlResponse {
    url: String,
}

async fn failure(response: Response, action: &str) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::Remote(format!(
        "Failed to {action}: HTTP {status}: {}",
        compact_text(&body)
    ))
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(Error::InvalidInput(
            "API base URL must not be empty".to_string(),
        ));
    }
    if !crate::util::is_http_url(&base) {
        return Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base)
}
