use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Pagination envelope the backend wraps every collection in.
///
/// Some backend revisions answer `size` instead of `pageSize`; both are
/// accepted, `pageSize` is what we send back out.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page: u32,
    #[serde(alias = "size")]
    pub page_size: u32,
    /// Total number of items across all pages, when the backend reports it.
    #[serde(default)]
    pub count: u32,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_size_as_alias_for_page_size() {
        let page: Page<String> =
            serde_json::from_str(r#"{"page":0,"size":10,"items":["a","b"]}"#).unwrap();
        assert_eq!(page.page_size, 10);
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn item_count_never_exceeds_page_size() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"page":1,"pageSize":3,"count":7,"items":[1,2,3]}"#).unwrap();
        assert!(page.len() <= page.page_size as usize);
    }
}
