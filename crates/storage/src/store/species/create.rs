#![forbid(unsafe_code)]

use super::super::access::check_tree_tx;
use super::super::{
    SpeciesCreateRequest, SpeciesNode, SpeciesRow, SpeciesSeed, SqliteStore, StoreError,
    next_id_tx, now_ms, touch_tree_tx,
};
use super::{insert_species_row_tx, species_row_tx};
use pt_core::ids::UserId;
use pt_core::temporal::{self, Position};
use rusqlite::Transaction;

impl SqliteStore {
    /// Creates a species under a tree, optionally attached to an ancestor and
    /// optionally seeding a whole descendant subtree in the same call. The
    /// entire batch commits or rolls back as one transaction.
    pub fn species_create(
        &mut self,
        tree_id: &str,
        caller: Option<&UserId>,
        request: SpeciesCreateRequest,
    ) -> Result<SpeciesNode, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        check_tree_tx(&tx, tree_id, caller)?;
        let node = create_species_tx(&tx, tree_id, request)?;
        touch_tree_tx(&tx, tree_id, now_ms)?;
        tx.commit()?;
        Ok(node)
    }
}

pub(crate) fn create_species_tx(
    tx: &Transaction<'_>,
    tree_id: &str,
    request: SpeciesCreateRequest,
) -> Result<SpeciesNode, StoreError> {
    let SpeciesCreateRequest {
        name,
        ancestor_id,
        apparition,
        after_apparition,
        duration,
        description,
        descendants,
    } = request;

    if name.trim().is_empty() {
        return Err(StoreError::InvalidInput("species name must not be empty"));
    }

    let position = match ancestor_id {
        Some(ancestor_id) => {
            let ancestor =
                species_row_tx(tx, &ancestor_id)?.ok_or(StoreError::SpeciesNotFound)?;
            if ancestor.tree_id != tree_id {
                return Err(StoreError::ForeignSpecies {
                    species_id: ancestor.id,
                    tree_id: tree_id.to_string(),
                });
            }
            Position::Attached {
                ancestor_id,
                after_apparition: temporal::child_offset(after_apparition, ancestor.duration),
            }
        }
        None => Position::Root {
            apparition: apparition.unwrap_or(0.0),
        },
    };

    let id = next_id_tx(tx, "species_seq", "sp_")?;
    let row = SpeciesRow {
        id: id.clone(),
        tree_id: tree_id.to_string(),
        name,
        position,
        duration: duration.max(0.0),
        description,
        image: None,
    };
    insert_species_row_tx(tx, &row)?;

    let mut children = Vec::new();
    for seed in descendants {
        children.push(create_species_tx(tx, tree_id, seed_request(&id, seed))?);
    }
    Ok(SpeciesNode::from_row(row, children))
}

pub(crate) fn seed_request(ancestor_id: &str, seed: SpeciesSeed) -> SpeciesCreateRequest {
    SpeciesCreateRequest {
        name: seed.name,
        ancestor_id: Some(ancestor_id.to_string()),
        apparition: None,
        after_apparition: seed.after_apparition,
        duration: seed.duration,
        description: seed.description,
        descendants: seed.descendants,
    }
}
