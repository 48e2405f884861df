use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Compliance verdict computed server-side on create/update/lint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Compliance {
    #[default]
    Pending,
    Failed,
    NotCompliant,
    Compliant,
}

/// How the snippet content entered the system.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SnippetSource {
    #[default]
    Inline,
    FileUpload,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub language: String,
    pub version: String,
    pub extension: String,
    #[serde(default)]
    pub source: SnippetSource,
    #[serde(default)]
    pub compliance: Compliance,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub owner_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnippet {
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub language: String,
    pub version: String,
    pub extension: String,
    #[serde(default)]
    pub source: SnippetSource,
}

impl CreateSnippet {
    /// Create-request for content typed directly into the editor.
    pub fn inline(
        name: impl Into<String>,
        content: impl Into<String>,
        language: impl Into<String>,
        version: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            description: None,
            language: language.into(),
            version: version.into(),
            extension: extension.into(),
            source: SnippetSource::Inline,
        }
    }
}

/// Only the content can be changed after creation; the id is immutable.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateSnippet {
    pub content: String,
}

/// Carrier for the multipart create-from-file request. Not a wire type.
#[derive(Debug, Clone)]
pub struct SnippetFileUpload {
    pub name: String,
    pub language: String,
    pub version: String,
    pub extension: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Body for executing a snippet: one entry per program input line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RunSnippetRequest {
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RunSnippetResponse {
    pub outputs: Vec<String>,
}
