//! The remote store seam and the Zipline payload shapes the gate consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use zipgate_core::{Result, StagedContent};

/// One file as reported by the remote listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, rename = "type")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub favorite: bool,
}

/// One page of a file listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePage {
    pub page: Vec<RemoteFile>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

/// Filters for a file listing. `None` fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub favorite: Option<bool>,
}

impl ListQuery {
    /// Parameters as cache-key input, absent ones included as `None`.
    pub fn params(&self) -> [(&'static str, Option<Value>); 4] {
        [
            ("page", self.page.map(|v| json!(v))),
            ("perpage", self.per_page.map(|v| json!(v))),
            ("search", self.search.as_ref().map(|v| json!(v))),
            ("favorite", self.favorite.map(|v| json!(v))),
        ]
    }

    /// Query-string pairs for the request.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.unwrap_or(1).to_string())];
        if let Some(per_page) = self.per_page {
            pairs.push(("perpage", per_page.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("searchQuery", search.clone()));
        }
        if let Some(favorite) = self.favorite {
            pairs.push(("favorite", favorite.to_string()));
        }
        pairs
    }
}

/// The remote operations the gate needs.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_files(&self, query: &ListQuery) -> Result<FilePage>;

    async fn upload(&self, filename: &str, content: &StagedContent) -> Result<UploadResponse>;

    async fn delete_file(&self, id: &str) -> Result<RemoteFile>;
}
