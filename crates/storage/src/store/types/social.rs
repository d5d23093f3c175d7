#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq)]
pub struct CommentRow {
    pub id: String,
    pub tree_id: String,
    pub user_id: String,
    pub content: String,
    pub parent_id: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}
