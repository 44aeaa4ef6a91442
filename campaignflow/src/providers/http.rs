//! reqwest-backed provider clients.
//!
//! People search, job search and contact lookup speak a small JSON protocol:
//!
//! | Call | Request | Response |
//! |------|---------|----------|
//! | `POST {base}/people/search` | `{filters, page, pageSize}` | [`ProviderPage`] |
//! | `POST {base}/people/jobs` | [`JobSearchRequest`] | `{jobId}` |
//! | `GET {base}/people/jobs/{jobId}` | | `{status, progress?, result?, error?}` |
//! | `POST {base}/contacts/lookup` | `{candidate}` | `{contact}` (null or 404 when unknown) |
//!
//! Reasoning uses an OpenAI-compatible `POST {base}/chat/completions` in JSON
//! mode. Every client sends `Authorization: Bearer {api_key}` when a key is
//! configured.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    ContactEnricher, ContentFetcher, JobSearchRequest, PageContent, PeopleSearchJobProvider,
    PeopleSearchProvider, ProviderPage, ReasoningService, StructuredPrompt,
};
use crate::core::{Candidate, ContactAddress, FilterSet};
use crate::errors::{ConfigError, ProviderError};
use crate::normalize::collapse_whitespace;
use crate::poller::{JobHandle, JobStatus};
use crate::utils::truncate_chars;

const ERROR_BODY_CHARS: usize = 500;

#[allow(clippy::expect_used)]
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));

#[allow(clippy::expect_used)]
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="description"], meta[property="og:description"]"#)
        .expect("valid description selector")
});

#[allow(clippy::expect_used)]
static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Connection settings shared by the HTTP clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpProviderConfig {
    /// Base URL, without trailing slash.
    #[serde(default)]
    pub base_url: String,
    /// Bearer token.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

fn default_timeout() -> f64 {
    30.0
}

fn default_user_agent() -> String {
    concat!("campaignflow/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_response_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl HttpProviderConfig {
    /// Creates a config for `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }

    /// Checks the config for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0) {
            return Err(ConfigError::invalid("http.timeout_seconds", "must be positive"));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::invalid("http.max_response_bytes", "must be positive"));
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn client(&self) -> Result<Client, ProviderError> {
        if let Err(e) = self.validate() {
            return Err(ProviderError::NotConfigured(e.to_string()));
        }
        Client::builder()
            .timeout(self.timeout())
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("failed to build HTTP client: {e}")))
    }

    fn require_base_url(&self, provider: &str) -> Result<(), ProviderError> {
        if self.base_url.is_empty() {
            return Err(ProviderError::NotConfigured(format!("{provider} requires base_url")));
        }
        Ok(())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

fn transport_error(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Transport(format!("request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::Transport(format!("connection failed: {e}"))
    } else {
        ProviderError::Transport(e.to_string())
    }
}

/// Sends `request`, mapping non-success statuses to [`ProviderError::Http`].
async fn send(request: RequestBuilder) -> Result<Response, ProviderError> {
    let response = request.send().await.map_err(|e| transport_error(&e))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Http {
        status: status.as_u16(),
        message: truncate_chars(body.trim(), ERROR_BODY_CHARS).to_string(),
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Fetches pages over HTTP and extracts their readable text.
#[derive(Debug, Clone)]
pub struct HttpContentFetcher {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpContentFetcher {
    /// Creates a fetcher. `base_url` is ignored.
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> Result<PageContent, ProviderError> {
        debug!(url, "Fetching subject page");
        let response = send(self.client.get(url)).await?;
        let final_url = response.url().to_string();

        if response
            .content_length()
            .is_some_and(|len| len > self.config.max_response_bytes as u64)
        {
            return Err(ProviderError::Decode(format!(
                "response exceeds {} bytes",
                self.config.max_response_bytes
            )));
        }
        let bytes = response.bytes().await.map_err(|e| transport_error(&e))?;
        if bytes.len() > self.config.max_response_bytes {
            return Err(ProviderError::Decode(format!(
                "response exceeds {} bytes",
                self.config.max_response_bytes
            )));
        }

        let html = String::from_utf8_lossy(&bytes);
        let page = extract_page(&final_url, &html);
        debug!(
            url = %page.url,
            title = %page.title,
            body_chars = page.body_text.chars().count(),
            "Fetched subject page"
        );
        Ok(page)
    }
}

/// Extracts title, meta description and visible body text from HTML.
#[must_use]
pub fn extract_page(url: &str, html: &str) -> PageContent {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default();

    let description = document
        .select(&DESCRIPTION)
        .find_map(|m| m.value().attr("content"))
        .map(collapse_whitespace)
        .unwrap_or_default();

    let mut body = String::new();
    if let Some(root) = document.select(&BODY).next() {
        for node in root.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
            });
            if !hidden {
                body.push_str(text);
                body.push(' ');
            }
        }
    }

    PageContent {
        url: url.to_string(),
        title,
        description,
        body_text: collapse_whitespace(&body),
    }
}

/// Reasoning over an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleReasoning {
    client: Client,
    config: HttpProviderConfig,
    model: String,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleReasoning {
    /// Creates a client for `model`.
    pub fn new(config: HttpProviderConfig, model: impl Into<String>) -> Result<Self, ProviderError> {
        config.require_base_url("reasoning")?;
        Ok(Self {
            client: config.client()?,
            config,
            model: model.into(),
            temperature: 0.2,
        })
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Builds the chat completion request body for `prompt`.
    #[must_use]
    pub fn request_body(&self, prompt: &StructuredPrompt) -> Value {
        let system = format!(
            "{}\n\nAnswer with a single JSON object matching this shape:\n{}",
            prompt.instructions, prompt.output_schema
        );
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt.input.to_string() },
            ],
        })
    }
}

#[async_trait]
impl ReasoningService for OpenAiCompatibleReasoning {
    async fn complete(&self, prompt: &StructuredPrompt) -> Result<Value, ProviderError> {
        let request = self
            .client
            .post(self.config.url("chat/completions"))
            .json(&self.request_body(prompt));
        let response: ChatResponse = decode(send(self.config.authorize(request)).await?).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Decode("completion has no content".to_string()))?;
        debug!(task = prompt.task.as_str(), chars = content.len(), "Reasoning answered");
        parse_answer(&content)
    }
}

/// Parses a model answer as JSON, tolerating a fenced code block.
pub fn parse_answer(content: &str) -> Result<Value, ProviderError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim()).map_err(|e| {
        ProviderError::Decode(format!(
            "answer is not JSON ({e}): {}",
            truncate_chars(trimmed, ERROR_BODY_CHARS)
        ))
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    filters: &'a FilterSet,
    page: u32,
    page_size: u32,
}

/// Paginated people search over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPeopleSearch {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpPeopleSearch {
    /// Creates a client.
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        config.require_base_url("people search")?;
        Ok(Self {
            client: config.client()?,
            config,
        })
    }
}

#[async_trait]
impl PeopleSearchProvider for HttpPeopleSearch {
    async fn search_page(
        &self,
        filters: &FilterSet,
        page: u32,
        page_size: u32,
    ) -> Result<ProviderPage, ProviderError> {
        let body = SearchBody {
            filters,
            page,
            page_size,
        };
        let request = self.client.post(self.config.url("people/search")).json(&body);
        let page_body: ProviderPage = decode(send(self.config.authorize(request)).await?).await?;
        debug!(
            page,
            page_size,
            candidates = page_body.candidates.len(),
            total = page_body.total_available,
            "People search page"
        );
        Ok(page_body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    job_id: String,
}

/// Job status as reported over the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusBody {
    /// `pending`, `running`, `complete` or `error`.
    pub status: String,
    /// Progress percentage.
    #[serde(default)]
    pub progress: Option<u8>,
    /// Result page, when complete.
    #[serde(default)]
    pub result: Option<ProviderPage>,
    /// Error message, when failed.
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatusBody {
    /// Converts to a [`JobStatus`].
    pub fn into_status(self) -> Result<JobStatus<ProviderPage>, ProviderError> {
        match self.status.to_ascii_lowercase().as_str() {
            "pending" | "queued" | "running" => Ok(JobStatus::Pending {
                progress: self.progress.map(|p| p.min(100)),
            }),
            "complete" | "completed" | "done" => Ok(JobStatus::Complete(self.result.unwrap_or_default())),
            "error" | "failed" => Ok(JobStatus::Error(
                self.error.unwrap_or_else(|| "job failed without a message".to_string()),
            )),
            other => Err(ProviderError::Decode(format!("unknown job status '{other}'"))),
        }
    }
}

/// Job-based people search over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPeopleSearchJobs {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpPeopleSearchJobs {
    /// Creates a client.
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        config.require_base_url("people search jobs")?;
        Ok(Self {
            client: config.client()?,
            config,
        })
    }
}

#[async_trait]
impl PeopleSearchJobProvider for HttpPeopleSearchJobs {
    async fn submit(&self, request: &JobSearchRequest) -> Result<JobHandle, ProviderError> {
        let http = self.client.post(self.config.url("people/jobs")).json(request);
        let submitted: SubmitResponse = decode(send(self.config.authorize(http)).await?).await?;
        Ok(JobHandle::new(submitted.job_id))
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus<ProviderPage>, ProviderError> {
        let url = self.config.url(&format!("people/jobs/{}", handle.as_str()));
        let body: JobStatusBody = decode(send(self.config.authorize(self.client.get(url))).await?).await?;
        body.into_status()
    }
}

#[derive(Debug, Serialize)]
struct LookupBody<'a> {
    candidate: &'a Candidate,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    contact: Option<ContactAddress>,
}

/// Contact lookup over HTTP.
#[derive(Debug, Clone)]
pub struct HttpContactEnricher {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpContactEnricher {
    /// Creates a client.
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        config.require_base_url("contact enricher")?;
        Ok(Self {
            client: config.client()?,
            config,
        })
    }
}

#[async_trait]
impl ContactEnricher for HttpContactEnricher {
    async fn enrich(&self, candidate: &Candidate) -> Result<Option<ContactAddress>, ProviderError> {
        let request = self
            .client
            .post(self.config.url("contacts/lookup"))
            .json(&LookupBody { candidate });
        match send(self.config.authorize(request)).await {
            Ok(response) => {
                let body: LookupResponse = decode(response).await?;
                Ok(body.contact.filter(|c| !c.email.trim().is_empty()))
            }
            Err(ProviderError::Http { status: 404, .. }) => Ok(None),
            Err(e) => {
                warn!(candidate = %candidate.dedupe_key(), error = %e, "Contact lookup failed");
                Err(e)
            }
        }
    }
}
