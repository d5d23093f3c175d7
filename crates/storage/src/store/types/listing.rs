#![forbid(unsafe_code)]

use super::trees::TreeSummary;

/// Sort key for tree listing. The first three are backed by stored columns;
/// the rest are computed per request and sorted in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeCriteria {
    CreatedAt,
    UpdatedAt,
    Name,
    Views,
    Comments,
    Likes,
    Popularity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Clone, Debug)]
pub struct TreeListRequest {
    pub text: Option<String>,
    pub only_mine: bool,
    pub created_from_ms: Option<i64>,
    pub created_to_ms: Option<i64>,
    pub criteria: TreeCriteria,
    pub order: SortOrder,
    pub page: usize,
    pub page_size: usize,
}

impl Default for TreeListRequest {
    fn default() -> Self {
        Self {
            text: None,
            only_mine: false,
            created_from_ms: None,
            created_to_ms: None,
            criteria: TreeCriteria::CreatedAt,
            order: SortOrder::Desc,
            page: 0,
            page_size: 20,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TreeListPage {
    pub trees: Vec<TreeSummary>,
    /// Total number of trees matching the filter, before paging.
    pub total: usize,
}
