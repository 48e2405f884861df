//! The operations façade: everything the application can ask the snippet
//! backend to do, decoupled from the HTTP binding so callers (and tests)
//! never touch the wire directly.

use async_trait::async_trait;
use domain::models::{
    CreateSnippet, CreateTestCase, FileType, Page, Rule, RuleKind, RuleSetUpdate,
    ShareSnippetRequest, Snippet, SnippetFileUpload, TestCase, TestCaseResult, UpdateSnippet, User,
};

use super::snippet_api::ApiError;

/// One method per backend operation. [`SnippetApiClient`] is the single
/// production implementation; tests substitute in-memory fakes.
///
/// [`SnippetApiClient`]: super::snippet_api::SnippetApiClient
#[async_trait]
pub trait SnippetOperations: Send + Sync {
    async fn list_snippets(
        &self,
        page: u32,
        page_size: u32,
        name: Option<&str>,
    ) -> Result<Page<Snippet>, ApiError>;

    async fn create_snippet(&self, create: &CreateSnippet) -> Result<Snippet, ApiError>;

    async fn create_snippet_from_file(
        &self,
        upload: &SnippetFileUpload,
    ) -> Result<Snippet, ApiError>;

    /// `Ok(None)` when the snippet does not exist (or no longer exists).
    async fn get_snippet(&self, id: &str) -> Result<Option<Snippet>, ApiError>;

    async fn update_snippet(&self, id: &str, update: &UpdateSnippet) -> Result<Snippet, ApiError>;

    /// Returns the deleted id so callers can key invalidation off it.
    async fn delete_snippet(&self, id: &str) -> Result<String, ApiError>;

    async fn list_users(
        &self,
        page: u32,
        page_size: u32,
        name: Option<&str>,
    ) -> Result<Page<User>, ApiError>;

    async fn share_snippet(&self, share: &ShareSnippetRequest) -> Result<Snippet, ApiError>;

    async fn get_rules(&self, kind: RuleKind) -> Result<Vec<Rule>, ApiError>;

    /// Replaces the whole rule set and returns the stored collection.
    async fn replace_rules(
        &self,
        kind: RuleKind,
        update: &RuleSetUpdate,
    ) -> Result<Vec<Rule>, ApiError>;

    async fn get_file_types(&self) -> Result<Vec<FileType>, ApiError>;

    async fn list_test_cases(&self, snippet_id: &str) -> Result<Vec<TestCase>, ApiError>;

    async fn create_test_case(
        &self,
        snippet_id: &str,
        create: &CreateTestCase,
    ) -> Result<TestCase, ApiError>;

    /// Returns the removed test-case id.
    async fn remove_test_case(&self, test_case_id: &str) -> Result<String, ApiError>;

    async fn run_test_case(
        &self,
        snippet_id: &str,
        test_case_id: &str,
    ) -> Result<TestCaseResult, ApiError>;

    /// Server-side format of the stored content; mutates and returns the snippet.
    async fn format_snippet(&self, id: &str) -> Result<Snippet, ApiError>;

    async fn lint_snippet(&self, id: &str) -> Result<Snippet, ApiError>;

    /// Executes the snippet with one string per stdin line, returning stdout lines.
    async fn run_snippet(&self, id: &str, inputs: &[String]) -> Result<Vec<String>, ApiError>;

    /// Raw (or server-formatted) content for saving to disk.
    async fn download_snippet(&self, id: &str, formatted: bool) -> Result<String, ApiError>;
}
