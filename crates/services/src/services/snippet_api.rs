//! HTTP adapter for the snippet backend API.
//!
//! Each façade operation maps onto exactly one authenticated request/response
//! cycle. The adapter is stateless between calls: the bearer token is
//! re-acquired from the injected [`AccessTokenProvider`] every time, and
//! nothing is retried here.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use domain::models::{
    ApiRule, CreateSnippet, CreateTestCase, Diagnostic, FileType, Page, Rule, RuleKind,
    RuleSetUpdate, RunSnippetRequest, RunSnippetResponse, ShareSnippetRequest, Snippet,
    SnippetFileUpload, TestCase, TestCaseResult, UpdateSnippet, User,
};
use reqwest::{Client, RequestBuilder, StatusCode, multipart};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::{auth::AccessTokenProvider, config::Config, snippet_operations::SnippetOperations};

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("unauthorized (http {status})")]
    Unauthorized { status: u16 },
    #[error("validation failed with {} diagnostic(s)", diagnostics.len())]
    Validation {
        status: u16,
        diagnostics: Vec<Diagnostic>,
    },
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
    #[error("invalid request url: {0}")]
    Url(String),
}

impl ApiError {
    pub fn first_diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Validation { diagnostics, .. } => diagnostics.first(),
            _ => None,
        }
    }

    /// The string a view should show: the first diagnostic when the backend
    /// provided one, otherwise the error itself.
    pub fn user_message(&self) -> String {
        match self.first_diagnostic() {
            Some(diag) => diag.to_string(),
            None => self.to_string(),
        }
    }
}

/// Failure bodies the backend sends for rejected writes. Either a bare
/// diagnostics array or an object wrapping one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FailureBody {
    Wrapped { diagnostics: Vec<Diagnostic> },
    Bare(Vec<Diagnostic>),
}

/// Map a non-2xx response to the error taxonomy. 401/403 become
/// `Unauthorized`; a parseable diagnostics body becomes `Validation`;
/// everything else surfaces status and raw body.
fn failure_to_error(status: u16, body: String) -> ApiError {
    if status == 401 || status == 403 {
        return ApiError::Unauthorized { status };
    }
    let diagnostics = match serde_json::from_str::<FailureBody>(&body) {
        Ok(FailureBody::Wrapped { diagnostics }) => diagnostics,
        Ok(FailureBody::Bare(diagnostics)) => diagnostics,
        Err(_) => Vec::new(),
    };
    if diagnostics.is_empty() {
        ApiError::Http { status, body }
    } else {
        ApiError::Validation {
            status,
            diagnostics,
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(e.to_string())
    }
}

/// The single production [`SnippetOperations`] binding.
pub struct SnippetApiClient {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl SnippetApiClient {
    pub fn new(
        base_url: Url,
        tokens: Arc<dyn AccessTokenProvider>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder =
            Client::builder().user_agent(concat!("snippet-hub/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    pub fn from_config(
        config: &Config,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ApiError> {
        Self::new(
            config.backend_url.clone(),
            tokens,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    /// Extend the base URL with path segments, preserving any base path prefix.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(format!("base url {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the bearer credential. If acquisition fails the request goes out
    /// without an Authorization header so the server's auth error surfaces
    /// instead of the client hanging on a missing token.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.access_token().await {
            Ok(token) => request.bearer_auth(token.expose_secret()),
            Err(e) => {
                warn!(error = %e, "token acquisition failed, sending unauthenticated");
                request
            }
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let res = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Serde(e.to_string())),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(failure_to_error(status, body))
            }
        }
    }

    /// For operations whose success body carries nothing we need (delete
    /// returns 200/204).
    async fn send_ignoring_body(&self, request: RequestBuilder) -> Result<(), ApiError> {
        let res = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if res.status().is_success() {
            return Ok(());
        }
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(failure_to_error(status, body))
    }

    async fn send_text(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let res = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if res.status().is_success() {
            return res.text().await.map_err(map_reqwest_error);
        }
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(failure_to_error(status, body))
    }

    fn paged(&self, request: RequestBuilder, page: u32, size: u32, name: Option<&str>) -> RequestBuilder {
        let request = request.query(&[("page", page.to_string()), ("size", size.to_string())]);
        match name {
            Some(name) => request.query(&[("name", name)]),
            None => request,
        }
    }
}

#[async_trait]
impl SnippetOperations for SnippetApiClient {
    async fn list_snippets(
        &self,
        page: u32,
        page_size: u32,
        name: Option<&str>,
    ) -> Result<Page<Snippet>, ApiError> {
        let url = self.endpoint(&["snippets", "all"])?;
        debug!(%url, page, page_size, "listing snippets");
        self.send(self.paged(self.http.get(url), page, page_size, name))
            .await
    }

    async fn create_snippet(&self, create: &CreateSnippet) -> Result<Snippet, ApiError> {
        let url = self.endpoint(&["snippets"])?;
        debug!(%url, name = %create.name, "creating snippet");
        self.send(self.http.post(url).json(create)).await
    }

    async fn create_snippet_from_file(
        &self,
        upload: &SnippetFileUpload,
    ) -> Result<Snippet, ApiError> {
        let url = self.endpoint(&["snippets", "file"])?;
        debug!(%url, name = %upload.name, file = %upload.file_name, "creating snippet from file");

        let file_part = multipart::Part::bytes(upload.content.clone())
            .file_name(upload.file_name.clone())
            .mime_str("text/plain")
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let form = multipart::Form::new()
            .text("name", upload.name.clone())
            .text("language", upload.language.clone())
            .text("version", upload.version.clone())
            .text("extension", upload.extension.clone())
            .part("file", file_part);

        self.send(self.http.post(url).multipart(form)).await
    }

    async fn get_snippet(&self, id: &str) -> Result<Option<Snippet>, ApiError> {
        let url = self.endpoint(&["snippets", id])?;
        let res = self
            .authorize(self.http.get(url))
            .await
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => match res.json::<Snippet>().await {
                Ok(snippet) => Ok(Some(snippet)),
                // A 2xx without a usable body reads as "not found" so callers
                // can render an empty state instead of crashing.
                Err(e) => {
                    warn!(id, error = %e, "snippet body unusable, treating as absent");
                    Ok(None)
                }
            },
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(failure_to_error(status, body))
            }
        }
    }

    async fn update_snippet(&self, id: &str, update: &UpdateSnippet) -> Result<Snippet, ApiError> {
        let url = self.endpoint(&["snippets", id])?;
        debug!(%url, "updating snippet content");
        self.send(self.http.put(url).json(update)).await
    }

    async fn delete_snippet(&self, id: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["snippets", id])?;
        debug!(%url, "deleting snippet");
        self.send_ignoring_body(self.http.delete(url)).await?;
        Ok(id.to_string())
    }

    async fn list_users(
        &self,
        page: u32,
        page_size: u32,
        name: Option<&str>,
    ) -> Result<Page<User>, ApiError> {
        let url = self.endpoint(&["api", "users"])?;
        self.send(self.paged(self.http.get(url), page, page_size, name))
            .await
    }

    async fn share_snippet(&self, share: &ShareSnippetRequest) -> Result<Snippet, ApiError> {
        let url = self.endpoint(&["snippets", "share"])?;
        debug!(%url, snippet_id = %share.snippet_id, user_id = %share.user_id, "sharing snippet");
        self.send(self.http.post(url).json(share)).await
    }

    async fn get_rules(&self, kind: RuleKind) -> Result<Vec<Rule>, ApiError> {
        let url = self.endpoint(&["snippets", "rules", &kind.to_string()])?;
        let rules: Vec<ApiRule> = self.send(self.http.get(url)).await?;
        Ok(rules.into_iter().map(Rule::from).collect())
    }

    async fn replace_rules(
        &self,
        kind: RuleKind,
        update: &RuleSetUpdate,
    ) -> Result<Vec<Rule>, ApiError> {
        let url = self.endpoint(&["snippets", "rules", &kind.to_string()])?;
        debug!(%url, rules = update.rules.len(), "replacing rule set");
        let rules: Vec<ApiRule> = self.send(self.http.put(url).json(update)).await?;
        Ok(rules.into_iter().map(Rule::from).collect())
    }

    async fn get_file_types(&self) -> Result<Vec<FileType>, ApiError> {
        let url = self.endpoint(&["snippets", "config", "filetypes"])?;
        self.send(self.http.get(url)).await
    }

    async fn list_test_cases(&self, snippet_id: &str) -> Result<Vec<TestCase>, ApiError> {
        let url = self.endpoint(&["snippets", snippet_id, "tests"])?;
        self.send(self.http.get(url)).await
    }

    async fn create_test_case(
        &self,
        snippet_id: &str,
        create: &CreateTestCase,
    ) -> Result<TestCase, ApiError> {
        let url = self.endpoint(&["snippets", snippet_id, "tests"])?;
        debug!(%url, name = %create.name, "creating test case");
        self.send(self.http.post(url).json(create)).await
    }

    async fn remove_test_case(&self, test_case_id: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["snippets", "tests", test_case_id])?;
        debug!(%url, "removing test case");
        self.send_ignoring_body(self.http.delete(url)).await?;
        Ok(test_case_id.to_string())
    }

    async fn run_test_case(
        &self,
        snippet_id: &str,
        test_case_id: &str,
    ) -> Result<TestCaseResult, ApiError> {
        let url = self.endpoint(&["snippets", snippet_id, "tests", test_case_id, "run"])?;
        debug!(%url, "running test case");
        self.send(self.http.post(url)).await
    }

    async fn format_snippet(&self, id: &str) -> Result<Snippet, ApiError> {
        let url = self.endpoint(&["snippets", "run", id, "format"])?;
        debug!(%url, "formatting snippet");
        self.send(self.http.post(url)).await
    }

    async fn lint_snippet(&self, id: &str) -> Result<Snippet, ApiError> {
        let url = self.endpoint(&["snippets", "run", id, "lint"])?;
        debug!(%url, "linting snippet");
        self.send(self.http.post(url)).await
    }

    async fn run_snippet(&self, id: &str, inputs: &[String]) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint(&["snippets", id, "run"])?;
        debug!(%url, input_lines = inputs.len(), "running snippet");
        let body = RunSnippetRequest {
            inputs: inputs.to_vec(),
        };
        let response: RunSnippetResponse = self.send(self.http.post(url).json(&body)).await?;
        Ok(response.outputs)
    }

    async fn download_snippet(&self, id: &str, formatted: bool) -> Result<String, ApiError> {
        let url = self.endpoint(&["snippets", id, "download"])?;
        let request = self
            .http
            .get(url)
            .query(&[("formatted", formatted.to_string())]);
        self.send_text(request).await
    }
}
