use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// A share-recipient candidate from the user directory.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum SharePermission {
    #[default]
    Reader,
    Editor,
}

/// The share endpoint expects exactly these three fields, nothing else.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ShareSnippetRequest {
    pub snippet_id: String,
    pub user_id: String,
    pub permission_type: SharePermission,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn share_request_body_has_exactly_three_keys() {
        let request = ShareSnippetRequest {
            snippet_id: "s-1".into(),
            user_id: "u-1".into(),
            permission_type: SharePermission::Editor,
        };
        let value = serde_json::to_value(&request).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["snippetId"], "s-1");
        assert_eq!(object["userId"], "u-1");
        assert_eq!(object["permissionType"], "EDITOR");
    }

    #[test]
    fn permission_parses_case_insensitively() {
        assert_eq!(
            SharePermission::from_str("reader").unwrap(),
            SharePermission::Reader
        );
        assert!(SharePermission::from_str("OWNER").is_err());
    }
}
