#![forbid(unsafe_code)]

use super::species::species_row_tx;
use super::trees::tree_row_tx;
use super::{SpeciesRow, StoreError, TreeRow};
use pt_core::ids::UserId;
use rusqlite::Transaction;

/// Access guard shared by every engine operation: resolve the tree, then
/// gate private trees on membership. Public trees are open to any caller
/// holding the tree id.
pub(crate) fn check_tree_tx(
    tx: &Transaction<'_>,
    tree_id: &str,
    caller: Option<&UserId>,
) -> Result<TreeRow, StoreError> {
    let tree = tree_row_tx(tx, tree_id)?.ok_or(StoreError::TreeNotFound)?;
    if !tree.is_public && !is_member(&tree, caller) {
        return Err(StoreError::AccessDenied);
    }
    Ok(tree)
}

/// `check` with a species id: the species must exist and belong to the tree
/// the caller named.
pub(crate) fn check_species_tx(
    tx: &Transaction<'_>,
    tree_id: &str,
    id: &str,
    caller: Option<&UserId>,
) -> Result<SpeciesRow, StoreError> {
    check_tree_tx(tx, tree_id, caller)?;
    let species = species_row_tx(tx, id)?.ok_or(StoreError::SpeciesNotFound)?;
    if species.tree_id != tree_id {
        return Err(StoreError::ForeignSpecies {
            species_id: species.id,
            tree_id: tree_id.to_string(),
        });
    }
    Ok(species)
}

pub(crate) fn is_member(tree: &TreeRow, caller: Option<&UserId>) -> bool {
    let Some(caller) = caller else {
        return false;
    };
    tree.owner_id == caller.as_str()
        || tree
            .collaborators
            .iter()
            .any(|collaborator| collaborator == caller.as_str())
}

pub(crate) fn require_member(tree: &TreeRow, caller: &UserId) -> Result<(), StoreError> {
    if !is_member(tree, Some(caller)) {
        return Err(StoreError::AccessDenied);
    }
    Ok(())
}

pub(crate) fn require_owner(tree: &TreeRow, caller: &UserId) -> Result<(), StoreError> {
    if tree.owner_id != caller.as_str() {
        return Err(StoreError::AccessDenied);
    }
    Ok(())
}
