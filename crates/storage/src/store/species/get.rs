#![forbid(unsafe_code)]

use super::super::access::{check_species_tx, check_tree_tx};
use super::super::{SpeciesNode, SqliteStore, StoreError};
use super::{children_ids_tx, species_row_tx};
use pt_core::ids::UserId;
use rusqlite::{Transaction, params};

impl SqliteStore {
    /// One node, reconstructed as a fully nested subtree.
    pub fn species_get(
        &mut self,
        tree_id: &str,
        id: &str,
        caller: Option<&UserId>,
    ) -> Result<SpeciesNode, StoreError> {
        let tx = self.conn.transaction()?;
        check_species_tx(&tx, tree_id, id, caller)?;
        let node = nested_species_tx(&tx, id)?.ok_or(StoreError::SpeciesNotFound)?;
        tx.commit()?;
        Ok(node)
    }

    /// Every root of the tree's forest, each fully nested.
    pub fn species_roots(
        &mut self,
        tree_id: &str,
        caller: Option<&UserId>,
    ) -> Result<Vec<SpeciesNode>, StoreError> {
        let tx = self.conn.transaction()?;
        check_tree_tx(&tx, tree_id, caller)?;

        let mut stmt = tx.prepare(
            "SELECT id FROM species WHERE tree_id=?1 AND ancestor_id IS NULL ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![tree_id], |row| row.get::<_, String>(0))?;
        let root_ids = rows.collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut roots = Vec::with_capacity(root_ids.len());
        for id in root_ids {
            if let Some(node) = nested_species_tx(&tx, &id)? {
                roots.push(node);
            }
        }
        tx.commit()?;
        Ok(roots)
    }
}

/// Flat-to-nested reconstruction. The access check happens once at the public
/// entry point; recursion below it trusts the transaction snapshot. A child
/// that vanished between queries is skipped rather than failing the read.
pub(crate) fn nested_species_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<Option<SpeciesNode>, StoreError> {
    let Some(row) = species_row_tx(tx, id)? else {
        return Ok(None);
    };
    let child_ids = children_ids_tx(tx, id)?;
    let mut descendants = Vec::with_capacity(child_ids.len());
    for child_id in child_ids {
        if let Some(child) = nested_species_tx(tx, &child_id)? {
            descendants.push(child);
        }
    }
    Ok(Some(SpeciesNode::from_row(row, descendants)))
}
