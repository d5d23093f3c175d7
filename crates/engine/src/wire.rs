#![forbid(unsafe_code)]

//! Client-facing JSON shapes. Storage rows stay snake_case and millisecond
//! based; the wire uses camelCase keys and RFC 3339 timestamps.

use crate::support::time::rfc3339_ms;
use serde::Serialize;

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesNode {
    pub id: String,
    pub tree_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ancestor_id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apparition: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_apparition: Option<f64>,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub descendants: Vec<SpeciesNode>,
}

impl From<pt_storage::SpeciesNode> for SpeciesNode {
    fn from(node: pt_storage::SpeciesNode) -> Self {
        Self {
            id: node.id,
            tree_id: node.tree_id,
            ancestor_id: node.ancestor_id,
            name: node.name,
            apparition: node.apparition,
            after_apparition: node.after_apparition,
            duration: node.duration,
            description: node.description,
            image: node.image,
            descendants: node.descendants.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub collaborators: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
}

impl From<pt_storage::TreeSummary> for TreeSummary {
    fn from(summary: pt_storage::TreeSummary) -> Self {
        let row = summary.row;
        Self {
            id: row.id,
            user_id: row.owner_id,
            name: row.name,
            description: row.description,
            image: row.image,
            is_public: row.is_public,
            tags: row.tags,
            collaborators: row.collaborators,
            created_at: rfc3339_ms(row.created_at_ms),
            updated_at: rfc3339_ms(row.updated_at_ms),
            likes: summary.likes,
            comments: summary.comments,
            views: summary.views,
        }
    }
}

/// One page of the ranked listing; `count` is the total across all pages.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TreeListPage {
    pub trees: Vec<TreeSummary>,
    pub count: usize,
}

impl From<pt_storage::TreeListPage> for TreeListPage {
    fn from(page: pt_storage::TreeListPage) -> Self {
        Self {
            trees: page.trees.into_iter().map(Into::into).collect(),
            count: page.total,
        }
    }
}
