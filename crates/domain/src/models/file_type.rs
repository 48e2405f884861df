use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Read-only reference data: one entry per supported language.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct FileType {
    pub language: String,
    pub extension: String,
    pub versions: Vec<String>,
}

impl FileType {
    /// Resolve the language entry for an uploaded file's extension.
    pub fn for_extension<'a>(file_types: &'a [FileType], extension: &str) -> Option<&'a FileType> {
        file_types.iter().find(|ft| ft.extension == extension)
    }
}
