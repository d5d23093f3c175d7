#![forbid(unsafe_code)]

use pt_core::temporal::Position;

/// One species record as stored: flat, with its temporal position held as the
/// root/attached sum type rather than a nullable field pair.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesRow {
    pub id: String,
    pub tree_id: String,
    pub name: String,
    pub position: Position,
    pub duration: f64,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Inline definition of a descendant created as part of its parent's create
/// or replace call. Seeds are always attached, so they carry an offset and
/// never an absolute apparition.
#[derive(Clone, Debug, Default)]
pub struct SpeciesSeed {
    pub name: String,
    pub after_apparition: Option<f64>,
    pub duration: f64,
    pub description: Option<String>,
    pub descendants: Vec<SpeciesSeed>,
}

#[derive(Clone, Debug, Default)]
pub struct SpeciesCreateRequest {
    pub name: String,
    pub ancestor_id: Option<String>,
    pub apparition: Option<f64>,
    pub after_apparition: Option<f64>,
    pub duration: f64,
    pub description: Option<String>,
    pub descendants: Vec<SpeciesSeed>,
}

/// The three-way re-parent input: leave the ancestry untouched, detach the
/// node into a root, or attach it under another species of the same tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AncestorChange {
    #[default]
    Keep,
    Clear,
    Set(String),
}

#[derive(Clone, Debug, Default)]
pub struct SpeciesPatch {
    pub name: Option<String>,
    pub duration: Option<f64>,
    pub description: Option<Option<String>>,
    pub ancestor: AncestorChange,
    pub apparition: Option<f64>,
    pub after_apparition: Option<f64>,
    pub descendants: Option<Vec<SpeciesSeed>>,
}

/// Fully reconstructed node shape returned by every read path.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesNode {
    pub id: String,
    pub tree_id: String,
    pub ancestor_id: Option<String>,
    pub name: String,
    pub apparition: Option<f64>,
    pub after_apparition: Option<f64>,
    pub duration: f64,
    pub description: Option<String>,
    pub image: Option<String>,
    pub descendants: Vec<SpeciesNode>,
}

impl SpeciesNode {
    pub fn from_row(row: SpeciesRow, descendants: Vec<SpeciesNode>) -> Self {
        Self {
            id: row.id,
            tree_id: row.tree_id,
            ancestor_id: row.position.ancestor_id().map(str::to_string),
            name: row.name,
            apparition: row.position.apparition(),
            after_apparition: row.position.after_apparition(),
            duration: row.duration,
            description: row.description,
            image: row.image,
            descendants,
        }
    }

    /// Total number of nodes in this subtree, self included.
    pub fn node_count(&self) -> usize {
        1 + self
            .descendants
            .iter()
            .map(SpeciesNode::node_count)
            .sum::<usize>()
    }
}
