#![forbid(unsafe_code)]

use super::super::access::check_tree_tx;
use super::super::{SpeciesNode, SqliteStore, StoreError, now_ms, touch_tree_tx};
use super::get::nested_species_tx;
use super::species_row_tx;
use pt_core::ids::UserId;
use rusqlite::{Transaction, params};

impl SqliteStore {
    /// Deletes a species and its whole descendant subtree, plus any likes
    /// referencing the removed nodes. Deleting a species that is already gone
    /// is a no-op: callers treat "already gone" as success.
    pub fn species_delete(
        &mut self,
        tree_id: &str,
        id: &str,
        caller: Option<&UserId>,
    ) -> Result<(), StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        check_tree_tx(&tx, tree_id, caller)?;

        let Some(row) = species_row_tx(&tx, id)? else {
            tx.commit()?;
            return Ok(());
        };
        if row.tree_id != tree_id {
            return Err(StoreError::ForeignSpecies {
                species_id: row.id,
                tree_id: tree_id.to_string(),
            });
        }

        delete_subtree_tx(&tx, id)?;
        touch_tree_tx(&tx, tree_id, now_ms)?;
        tx.commit()?;
        Ok(())
    }
}

/// Enumerate-then-delete: the subtree is fully reconstructed and flattened
/// before the first row is removed. Returns the number of deleted nodes.
pub(crate) fn delete_subtree_tx(tx: &Transaction<'_>, id: &str) -> Result<usize, StoreError> {
    let Some(node) = nested_species_tx(tx, id)? else {
        return Ok(0);
    };
    let ids = flatten_ids(&node);
    for species_id in &ids {
        tx.execute("DELETE FROM likes WHERE species_id=?1", params![species_id])?;
        tx.execute("DELETE FROM species WHERE id=?1", params![species_id])?;
    }
    Ok(ids.len())
}

/// Pre-order flattening of a nested subtree into the ids it contains, self
/// first.
pub fn flatten_ids(node: &SpeciesNode) -> Vec<String> {
    let mut ids = vec![node.id.clone()];
    for child in &node.descendants {
        ids.extend(flatten_ids(child));
    }
    ids
}
