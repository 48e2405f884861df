use serde::{Deserialize, Serialize};
use strum_macros::Display;
use ts_rs::TS;

/// A stored test case, scoped to exactly one snippet (referenced by path on
/// the wire, so there is no foreign key here).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub name: String,
    /// One entry per program input line, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
    pub expected_outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version_number: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestCase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
    pub expected_outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version_number: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TestCaseStatus {
    Ok,
    Mismatch,
    Error,
}

/// Diagnostic attached to an errored test execution. Distinct from the
/// validation [`Diagnostic`](super::rule::Diagnostic): this one carries an
/// execution error code and optional position.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TestDiagnostic {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

/// Outcome of running one test case against its snippet. Transient: never
/// cached, never persisted client-side.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub status: TestCaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Vec<String>>,
    pub expected: Vec<String>,
    /// 0-based index of the first differing output line on MISMATCH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mismatch_at: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<TestDiagnostic>,
}

impl TestCaseResult {
    pub fn passed(&self) -> bool {
        self.status == TestCaseStatus::Ok
    }
}
