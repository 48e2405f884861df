//! Cached query/mutation layer over the operations façade.
//!
//! Reads are addressed by composite keys (operation + parameters) and served
//! through coalescing caches: concurrent callers with an identical key share
//! one in-flight request. Mutations go straight to the backend and, on
//! success, invalidate exactly the keys their contract names; on failure the
//! last-known-good cached state is left untouched. There are no optimistic
//! updates and nothing is retried here.

use std::sync::Arc;

use domain::models::{
    CreateSnippet, CreateTestCase, FileType, Page, Rule, RuleKind, RuleSetUpdate,
    SharePermission, ShareSnippetRequest, Snippet, SnippetFileUpload, TestCase, TestCaseResult,
    UpdateSnippet, User,
};
use moka::future::Cache;
use tracing::debug;

use super::{snippet_api::ApiError, snippet_operations::SnippetOperations};

/// Key for parameterized list reads: (page, page size, name filter).
type ListKey = (u32, u32, Option<String>);

const LIST_CACHE_CAPACITY: u64 = 64;
const DETAIL_CACHE_CAPACITY: u64 = 1024;

fn shared_error(e: Arc<ApiError>) -> ApiError {
    e.as_ref().clone()
}

/// Client-side source of truth for server state. One per application.
pub struct SnippetStore {
    ops: Arc<dyn SnippetOperations>,
    snippet_lists: Cache<ListKey, Page<Snippet>>,
    snippets: Cache<String, Option<Snippet>>,
    test_cases: Cache<String, Vec<TestCase>>,
    users: Cache<ListKey, Page<User>>,
    rules: Cache<RuleKind, Vec<Rule>>,
    file_types: Cache<(), Vec<FileType>>,
}

impl SnippetStore {
    pub fn new(ops: Arc<dyn SnippetOperations>) -> Self {
        Self {
            ops,
            snippet_lists: Cache::new(LIST_CACHE_CAPACITY),
            snippets: Cache::new(DETAIL_CACHE_CAPACITY),
            test_cases: Cache::new(DETAIL_CACHE_CAPACITY),
            users: Cache::new(LIST_CACHE_CAPACITY),
            rules: Cache::new(2),
            file_types: Cache::new(1),
        }
    }

    pub async fn list_snippets(
        &self,
        page: u32,
        page_size: u32,
        name: Option<&str>,
    ) -> Result<Page<Snippet>, ApiError> {
        let key = (page, page_size, name.map(str::to_owned));
        self.snippet_lists
            .try_get_with(key, async {
                debug!(page, page_size, name, "snippet list miss, fetching");
                self.ops.list_snippets(page, page_size, name).await
            })
            .await
            .map_err(shared_error)
    }

    /// Cached detail lookup. A cached `None` means the backend said the
    /// snippet does not exist; deletion invalidates the key so a stale value
    /// is never served after a delete.
    pub async fn snippet(&self, id: &str) -> Result<Option<Snippet>, ApiError> {
        self.snippets
            .try_get_with(id.to_owned(), async {
                debug!(id, "snippet detail miss, fetching");
                self.ops.get_snippet(id).await
            })
            .await
            .map_err(shared_error)
    }

    pub async fn test_cases(&self, snippet_id: &str) -> Result<Vec<TestCase>, ApiError> {
        self.test_cases
            .try_get_with(snippet_id.to_owned(), async {
                debug!(snippet_id, "test cases miss, fetching");
                self.ops.list_test_cases(snippet_id).await
            })
            .await
            .map_err(shared_error)
    }

    pub async fn users(
        &self,
        page: u32,
        page_size: u32,
        name: Option<&str>,
    ) -> Result<Page<User>, ApiError> {
        let key = (page, page_size, name.map(str::to_owned));
        self.users
            .try_get_with(key, async { self.ops.list_users(page, page_size, name).await })
            .await
            .map_err(shared_error)
    }

    pub async fn rules(&self, kind: RuleKind) -> Result<Vec<Rule>, ApiError> {
        self.rules
            .try_get_with(kind, async {
                debug!(%kind, "rule set miss, fetching");
                self.ops.get_rules(kind).await
            })
            .await
            .map_err(shared_error)
    }

    pub async fn file_types(&self) -> Result<Vec<FileType>, ApiError> {
        self.file_types
            .try_get_with((), async { self.ops.get_file_types().await })
            .await
            .map_err(shared_error)
    }

    pub async fn create_snippet(&self, create: &CreateSnippet) -> Result<Snippet, ApiError> {
        let snippet = self.ops.create_snippet(create).await?;
        self.invalidate_lists();
        Ok(snippet)
    }

    pub async fn create_snippet_from_file(
        &self,
        upload: &SnippetFileUpload,
    ) -> Result<Snippet, ApiError> {
        let snippet = self.ops.create_snippet_from_file(upload).await?;
        self.invalidate_lists();
        Ok(snippet)
    }

    /// Content changed server-side, so both the detail and every cached list
    /// page (compliance column) are stale.
    pub async fn update_snippet(
        &self,
        id: &str,
        update: &UpdateSnippet,
    ) -> Result<Snippet, ApiError> {
        let snippet = self.ops.update_snippet(id, update).await?;
        self.invalidate_snippet(id).await;
        Ok(snippet)
    }

    pub async fn delete_snippet(&self, id: &str) -> Result<String, ApiError> {
        let deleted = self.ops.delete_snippet(id).await?;
        self.invalidate_snippet(id).await;
        Ok(deleted)
    }

    pub async fn format_snippet(&self, id: &str) -> Result<Snippet, ApiError> {
        let snippet = self.ops.format_snippet(id).await?;
        self.invalidate_snippet(id).await;
        Ok(snippet)
    }

    pub async fn lint_snippet(&self, id: &str) -> Result<Snippet, ApiError> {
        let snippet = self.ops.lint_snippet(id).await?;
        self.invalidate_snippet(id).await;
        Ok(snippet)
    }

    /// Sharing changes nothing we cache.
    pub async fn share_snippet(
        &self,
        snippet_id: &str,
        user_id: &str,
        permission: SharePermission,
    ) -> Result<Snippet, ApiError> {
        let request = ShareSnippetRequest {
            snippet_id: snippet_id.to_owned(),
            user_id: user_id.to_owned(),
            permission_type: permission,
        };
        self.ops.share_snippet(&request).await
    }

    pub async fn create_test_case(
        &self,
        snippet_id: &str,
        create: &CreateTestCase,
    ) -> Result<TestCase, ApiError> {
        let test_case = self.ops.create_test_case(snippet_id, create).await?;
        self.test_cases.invalidate(snippet_id).await;
        Ok(test_case)
    }

    pub async fn remove_test_case(
        &self,
        snippet_id: &str,
        test_case_id: &str,
    ) -> Result<String, ApiError> {
        let removed = self.ops.remove_test_case(test_case_id).await?;
        self.test_cases.invalidate(snippet_id).await;
        Ok(removed)
    }

    /// Transient execution result, never cached.
    pub async fn run_test_case(
        &self,
        snippet_id: &str,
        test_case_id: &str,
    ) -> Result<TestCaseResult, ApiError> {
        self.ops.run_test_case(snippet_id, test_case_id).await
    }

    pub async fn replace_rules(
        &self,
        kind: RuleKind,
        update: &RuleSetUpdate,
    ) -> Result<Vec<Rule>, ApiError> {
        let rules = self.ops.replace_rules(kind, update).await?;
        self.rules.invalidate(&kind).await;
        Ok(rules)
    }

    pub async fn run_snippet(&self, id: &str, inputs: &[String]) -> Result<Vec<String>, ApiError> {
        self.ops.run_snippet(id, inputs).await
    }

    pub async fn download_snippet(&self, id: &str, formatted: bool) -> Result<String, ApiError> {
        self.ops.download_snippet(id, formatted).await
    }

    async fn invalidate_snippet(&self, id: &str) {
        debug!(id, "invalidating snippet detail and list family");
        self.snippets.invalidate(id).await;
        self.invalidate_lists();
    }

    /// The whole list family: every (page, size, filter) combination.
    fn invalidate_lists(&self) {
        self.snippet_lists.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use domain::models::{Compliance, SnippetSource, TestCaseStatus};

    use super::*;

    /// Counting fake backend. Every read yields once so overlapping callers
    /// genuinely race on the cache.
    #[derive(Default)]
    struct RecordingOps {
        list_calls: AtomicUsize,
        get_calls: AtomicUsize,
        test_case_calls: AtomicUsize,
        rule_calls: AtomicUsize,
        file_type_calls: AtomicUsize,
        deleted: AtomicBool,
        fail_updates: AtomicBool,
        created: Mutex<Vec<Snippet>>,
    }

    impl RecordingOps {
        fn snippet(id: &str) -> Snippet {
            Snippet {
                id: id.to_owned(),
                name: "E2E 123".into(),
                content: "println(1);".into(),
                description: None,
                language: "printscript".into(),
                version: "1.1".into(),
                extension: "prs".into(),
                source: SnippetSource::Inline,
                compliance: Compliance::Pending,
                owner_id: "owner".into(),
                owner_email: "owner@example.com".into(),
            }
        }
    }

    #[async_trait]
    impl SnippetOperations for RecordingOps {
        async fn list_snippets(
            &self,
            page: u32,
            page_size: u32,
            _name: Option<&str>,
        ) -> Result<Page<Snippet>, ApiError> {
            tokio::task::yield_now().await;
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let mut items = vec![Self::snippet("s-1")];
            items.extend(self.created.lock().unwrap().iter().cloned());
            Ok(Page {
                page,
                page_size,
                count: items.len() as u32,
                items,
            })
        }

        async fn create_snippet(&self, create: &CreateSnippet) -> Result<Snippet, ApiError> {
            let mut snippet = Self::snippet("s-new");
            snippet.name = create.name.clone();
            self.created.lock().unwrap().push(snippet.clone());
            Ok(snippet)
        }

        async fn create_snippet_from_file(
            &self,
            upload: &SnippetFileUpload,
        ) -> Result<Snippet, ApiError> {
            let mut snippet = Self::snippet("s-file");
            snippet.name = upload.name.clone();
            snippet.source = SnippetSource::FileUpload;
            self.created.lock().unwrap().push(snippet.clone());
            Ok(snippet)
        }

        async fn get_snippet(&self, id: &str) -> Result<Option<Snippet>, ApiError> {
            tokio::task::yield_now().await;
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            if self.deleted.load(Ordering::SeqCst) {
                Ok(None)
            } else {
                Ok(Some(Self::snippet(id)))
            }
        }

        async fn update_snippet(
            &self,
            id: &str,
            update: &UpdateSnippet,
        ) -> Result<Snippet, ApiError> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(ApiError::Http {
                    status: 500,
                    body: "update rejected".into(),
                });
            }
            let mut snippet = Self::snippet(id);
            snippet.content = update.content.clone();
            Ok(snippet)
        }

        async fn delete_snippet(&self, id: &str) -> Result<String, ApiError> {
            self.deleted.store(true, Ordering::SeqCst);
            Ok(id.to_owned())
        }

        async fn list_users(
            &self,
            page: u32,
            page_size: u32,
            _name: Option<&str>,
        ) -> Result<Page<User>, ApiError> {
            Ok(Page {
                page,
                page_size,
                count: 0,
                items: Vec::new(),
            })
        }

        async fn share_snippet(&self, share: &ShareSnippetRequest) -> Result<Snippet, ApiError> {
            Ok(Self::snippet(&share.snippet_id))
        }

        async fn get_rules(&self, kind: RuleKind) -> Result<Vec<Rule>, ApiError> {
            tokio::task::yield_now().await;
            self.rule_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Rule {
                id: format!("{kind}_rule"),
                name: "Rule".into(),
                is_active: true,
                value: None,
            }])
        }

        async fn replace_rules(
            &self,
            _kind: RuleKind,
            update: &RuleSetUpdate,
        ) -> Result<Vec<Rule>, ApiError> {
            Ok(update.rules.iter().cloned().map(Rule::from).collect())
        }

        async fn get_file_types(&self) -> Result<Vec<FileType>, ApiError> {
            tokio::task::yield_now().await;
            self.file_type_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![FileType {
                language: "printscript".into(),
                extension: "prs".into(),
                versions: vec!["1.0".into(), "1.1".into()],
            }])
        }

        async fn list_test_cases(&self, _snippet_id: &str) -> Result<Vec<TestCase>, ApiError> {
            tokio::task::yield_now().await;
            self.test_case_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn create_test_case(
            &self,
            _snippet_id: &str,
            create: &CreateTestCase,
        ) -> Result<TestCase, ApiError> {
            Ok(TestCase {
                id: "tc-1".into(),
                name: create.name.clone(),
                inputs: create.inputs.clone(),
                expected_outputs: create.expected_outputs.clone(),
                target_version_number: create.target_version_number,
            })
        }

        async fn remove_test_case(&self, test_case_id: &str) -> Result<String, ApiError> {
            Ok(test_case_id.to_owned())
        }

        async fn run_test_case(
            &self,
            _snippet_id: &str,
            _test_case_id: &str,
        ) -> Result<TestCaseResult, ApiError> {
            Ok(TestCaseResult {
                status: TestCaseStatus::Mismatch,
                actual: Some(vec!["1".into(), "3".into()]),
                expected: vec!["1".into(), "2".into()],
                mismatch_at: Some(1),
                diagnostic: None,
            })
        }

        async fn format_snippet(&self, id: &str) -> Result<Snippet, ApiError> {
            Ok(Self::snippet(id))
        }

        async fn lint_snippet(&self, id: &str) -> Result<Snippet, ApiError> {
            Ok(Self::snippet(id))
        }

        async fn run_snippet(
            &self,
            _id: &str,
            _inputs: &[String],
        ) -> Result<Vec<String>, ApiError> {
            Ok(vec!["1".into()])
        }

        async fn download_snippet(&self, _id: &str, _formatted: bool) -> Result<String, ApiError> {
            Ok("println(1);".into())
        }
    }

    fn store() -> (Arc<RecordingOps>, SnippetStore) {
        let ops = Arc::new(RecordingOps::default());
        let store = SnippetStore::new(ops.clone());
        (ops, store)
    }

    #[tokio::test]
    async fn concurrent_identical_reads_share_one_fetch() {
        let (ops, store) = store();

        let (a, b) = tokio::join!(store.snippet("s-1"), store.snippet("s-1"));
        assert!(a.unwrap().is_some());
        assert!(b.unwrap().is_some());
        assert_eq!(ops.get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_fetch_independently() {
        let (ops, store) = store();

        store.list_snippets(0, 10, None).await.unwrap();
        store.list_snippets(1, 10, None).await.unwrap();
        store.list_snippets(0, 10, Some("E2E")).await.unwrap();
        // Repeat of the first key: served from cache.
        store.list_snippets(0, 10, None).await.unwrap();

        assert_eq!(ops.list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn creating_a_snippet_invalidates_every_cached_list() {
        let (ops, store) = store();

        let before = store.list_snippets(0, 10, Some("E2E")).await.unwrap();
        assert_eq!(before.len(), 1);

        store
            .create_snippet(&CreateSnippet::inline(
                "E2E 456",
                "println(1);",
                "printscript",
                "1.1",
                "prs",
            ))
            .await
            .unwrap();

        // The list family was invalidated, so the same key refetches and the
        // new snippet shows up.
        let after = store.list_snippets(0, 10, Some("E2E")).await.unwrap();
        assert_eq!(ops.list_calls.load(Ordering::SeqCst), 2);
        assert!(after.items.iter().any(|s| s.name == "E2E 456"));
    }

    #[tokio::test]
    async fn file_upload_creation_also_invalidates_lists() {
        let (ops, store) = store();

        store.list_snippets(0, 10, None).await.unwrap();

        let upload = SnippetFileUpload {
            name: "uploaded".into(),
            language: "printscript".into(),
            version: "1.1".into(),
            extension: "prs".into(),
            file_name: "uploaded.prs".into(),
            content: b"println(1);".to_vec(),
        };
        let snippet = store.create_snippet_from_file(&upload).await.unwrap();
        assert_eq!(snippet.source, SnippetSource::FileUpload);

        let after = store.list_snippets(0, 10, None).await.unwrap();
        assert_eq!(ops.list_calls.load(Ordering::SeqCst), 2);
        assert!(after.items.iter().any(|s| s.name == "uploaded"));
    }

    #[tokio::test]
    async fn update_invalidates_detail_and_list() {
        let (ops, store) = store();

        store.snippet("s-1").await.unwrap();
        store.list_snippets(0, 10, None).await.unwrap();

        store
            .update_snippet(
                "s-1",
                &UpdateSnippet {
                    content: "println(2);".into(),
                },
            )
            .await
            .unwrap();

        store.snippet("s-1").await.unwrap();
        store.list_snippets(0, 10, None).await.unwrap();

        assert_eq!(ops.get_calls.load(Ordering::SeqCst), 2);
        assert_eq!(ops.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn deleted_snippet_reads_as_absent_not_stale() {
        let (ops, store) = store();

        assert!(store.snippet("s-1").await.unwrap().is_some());
        store.delete_snippet("s-1").await.unwrap();

        // The detail key was invalidated, so this refetches and sees None.
        assert!(store.snippet("s-1").await.unwrap().is_none());
        assert_eq!(ops.get_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_cache_untouched() {
        let (ops, store) = store();

        store.list_snippets(0, 10, None).await.unwrap();
        ops.fail_updates.store(true, Ordering::SeqCst);

        let err = store
            .update_snippet("s-1", &UpdateSnippet { content: "x".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, .. }));

        // Still served from cache: no invalidation happened.
        store.list_snippets(0, 10, None).await.unwrap();
        assert_eq!(ops.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_case_mutations_invalidate_only_their_snippet() {
        let (ops, store) = store();

        store.test_cases("a").await.unwrap();
        store.test_cases("b").await.unwrap();

        store
            .create_test_case(
                "a",
                &CreateTestCase {
                    name: "prints one".into(),
                    inputs: None,
                    expected_outputs: vec!["1".into()],
                    target_version_number: None,
                },
            )
            .await
            .unwrap();

        store.test_cases("a").await.unwrap();
        store.test_cases("b").await.unwrap();

        // "a" was refetched after the invalidation, "b" was not.
        assert_eq!(ops.test_case_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn replacing_rules_invalidates_only_that_kind() {
        let (ops, store) = store();

        store.rules(RuleKind::Format).await.unwrap();
        store.rules(RuleKind::Linting).await.unwrap();

        let update = RuleSetUpdate::new(RuleKind::Format, &[]);
        store.replace_rules(RuleKind::Format, &update).await.unwrap();

        store.rules(RuleKind::Format).await.unwrap();
        store.rules(RuleKind::Linting).await.unwrap();

        assert_eq!(ops.rule_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reference_data_is_fetched_once() {
        let (ops, store) = store();

        store.file_types().await.unwrap();
        store.file_types().await.unwrap();
        store.file_types().await.unwrap();

        assert_eq!(ops.file_type_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_executions_are_never_cached() {
        let (_ops, store) = store();

        let result = store.run_test_case("s-1", "tc-1").await.unwrap();
        assert_eq!(result.status, TestCaseStatus::Mismatch);
        assert_eq!(result.mismatch_at, Some(1));

        let outputs = store.run_snippet("s-1", &["".into()]).await.unwrap();
        assert_eq!(outputs, vec!["1".to_string()]);
    }
}
