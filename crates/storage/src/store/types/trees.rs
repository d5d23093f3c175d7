#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq)]
pub struct TreeRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub collaborators: Vec<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct TreeCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub collaborators: Vec<String>,
}

/// Partial update for tree metadata. `description` distinguishes "leave
/// untouched" (`None`) from "clear" (`Some(None)`).
#[derive(Clone, Debug, Default)]
pub struct TreePatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub add_collaborators: Vec<String>,
    pub remove_collaborators: Vec<String>,
}

/// A tree plus its resolved social counters, as listed to clients.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeSummary {
    pub row: TreeRow,
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewRow {
    pub viewer_id: String,
    pub viewed_at_ms: i64,
}
