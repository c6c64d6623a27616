use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const DEFAULT_SORT_BY: &str = "id";

/// One catalog record. Owned by the server; the client only holds copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Opaque absolute or relative URL, passed through unmodified.
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
}

/// Accepts an ISO-8601 local timestamp and treats anything else as absent, so a
/// server-side serializer change never makes a whole page undecodable.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

/// Server-computed snapshot of one page of the sorted catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    #[serde(rename = "content")]
    pub entries: Vec<CatalogEntry>,
    #[serde(rename = "pageNo")]
    pub page_number: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    #[serde(rename = "totalElements")]
    pub total_elements: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    #[serde(rename = "last")]
    pub is_last_page: bool,
}

impl PageResult {
    /// Whether `target` names a page that exists in this snapshot's view of the catalog.
    pub fn contains_page(&self, target: u32) -> bool {
        target < self.total_pages
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; anything other than `asc` sorts descending, as the server does.
impl FromStr for SortDirection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else {
            Ok(SortDirection::Desc)
        }
    }
}

/// Identifies one cached page query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub page_number: u32,
    pub page_size: u32,
    pub sort_by: String,
    pub sort_direction: SortDirection,
}

impl Default for PageKey {
    fn default() -> Self {
        Self {
            page_number: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: DEFAULT_SORT_BY.to_string(),
            sort_direction: SortDirection::Desc,
        }
    }
}

impl PageKey {
    pub fn new(
        page_number: u32,
        page_size: u32,
        sort_by: impl Into<String>,
        sort_direction: SortDirection,
    ) -> Self {
        Self {
            page_number,
            page_size,
            sort_by: sort_by.into(),
            sort_direction,
        }
    }

    /// Same size and sort, different page.
    pub fn with_page(&self, page_number: u32) -> Self {
        Self {
            page_number,
            ..self.clone()
        }
    }

    /// Query parameters understood by `GET /products`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("pageNo", self.page_number.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("sortBy", self.sort_by.clone()),
            ("sortType", self.sort_direction.to_string()),
        ]
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page={} size={} sort={} {}",
            self.page_number, self.page_size, self.sort_by, self.sort_direction
        )
    }
}
