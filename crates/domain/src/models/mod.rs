pub mod file_type;
pub mod pagination;
pub mod rule;
pub mod snippet;
pub mod test_case;
pub mod user;

pub use file_type::FileType;
pub use pagination::Page;
pub use rule::{ApiRule, Diagnostic, Rule, RuleKind, RuleSetUpdate, RuleValue};
pub use snippet::{
    Compliance, CreateSnippet, RunSnippetRequest, RunSnippetResponse, Snippet, SnippetFileUpload,
    SnippetSource, UpdateSnippet,
};
pub use test_case::{CreateTestCase, TestCase, TestCaseResult, TestCaseStatus, TestDiagnostic};
pub use user::{SharePermission, ShareSnippetRequest, User};
