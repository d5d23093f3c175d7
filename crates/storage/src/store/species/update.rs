#![forbid(unsafe_code)]

use super::super::access::check_species_tx;
use super::super::{
    AncestorChange, SpeciesNode, SpeciesPatch, SqliteStore, StoreError, now_ms, touch_tree_tx,
};
use super::create::{create_species_tx, seed_request};
use super::delete::delete_subtree_tx;
use super::get::nested_species_tx;
use super::{
    absolute_apparition_tx, children_ids_tx, earliest_child_offset_tx, ensure_no_cycle_tx,
    save_species_row_tx, species_row_tx,
};
use pt_core::ids::UserId;
use pt_core::temporal::{self, Position};

impl SqliteStore {
    /// Applies a partial update: plain fields, the three-way re-parent
    /// policy, and optionally a wholesale replacement of the direct-descendant
    /// subtrees. Returns the freshly reconstructed nested node.
    pub fn species_update(
        &mut self,
        tree_id: &str,
        id: &str,
        caller: Option<&UserId>,
        patch: SpeciesPatch,
    ) -> Result<SpeciesNode, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let mut row = check_species_tx(&tx, tree_id, id, caller)?;

        let SpeciesPatch {
            name,
            duration,
            description,
            ancestor,
            apparition,
            after_apparition,
            descendants,
        } = patch;

        if let Some(name) = name {
            if !name.trim().is_empty() {
                row.name = name;
            }
        }
        if let Some(duration) = duration {
            // A duration may not extend past where the earliest existing
            // child begins.
            let earliest = earliest_child_offset_tx(&tx, id)?;
            row.duration = temporal::clamp_duration(duration, earliest);
        }
        if let Some(description) = description {
            row.description = description.filter(|d| !d.is_empty());
        }

        match ancestor {
            AncestorChange::Keep => match &mut row.position {
                Position::Root { apparition: stored } => {
                    if let Some(value) = apparition {
                        *stored = value;
                    }
                }
                Position::Attached {
                    after_apparition: stored,
                    ..
                } => {
                    if let Some(value) = after_apparition {
                        *stored = temporal::explicit_offset(value);
                    }
                }
            },
            AncestorChange::Clear => {
                if row.position.is_root() {
                    if let Some(value) = apparition {
                        row.position = Position::Root { apparition: value };
                    }
                } else {
                    // Detaching keeps the node's absolute position unless the
                    // caller supplies one explicitly.
                    let absolute = match apparition {
                        Some(value) => value,
                        None => absolute_apparition_tx(&tx, id)?,
                    };
                    row.position = Position::Root {
                        apparition: absolute,
                    };
                }
            }
            AncestorChange::Set(new_ancestor_id) => {
                let ancestor_row = species_row_tx(&tx, &new_ancestor_id)?
                    .ok_or(StoreError::SpeciesNotFound)?;
                if ancestor_row.tree_id != tree_id {
                    return Err(StoreError::ForeignSpecies {
                        species_id: ancestor_row.id,
                        tree_id: tree_id.to_string(),
                    });
                }
                ensure_no_cycle_tx(&tx, id, &new_ancestor_id)?;

                let offset = match after_apparition {
                    Some(value) => temporal::explicit_offset(value),
                    None => match &row.position {
                        // Already attached: the offset survives the move.
                        Position::Attached {
                            after_apparition, ..
                        } => *after_apparition,
                        // Root turning child: derive the offset that keeps
                        // its absolute apparition in place.
                        Position::Root { .. } => {
                            let old_absolute = absolute_apparition_tx(&tx, id)?;
                            let ancestor_absolute =
                                absolute_apparition_tx(&tx, &new_ancestor_id)?;
                            temporal::reattach_offset(old_absolute, ancestor_absolute)
                        }
                    },
                };
                row.position = Position::Attached {
                    ancestor_id: new_ancestor_id,
                    after_apparition: offset,
                };
            }
        }

        // Persist field/position changes before any descendant replacement so
        // replacement seeds clamp against the new duration.
        save_species_row_tx(&tx, &row)?;

        if let Some(seeds) = descendants {
            for child_id in children_ids_tx(&tx, id)? {
                delete_subtree_tx(&tx, &child_id)?;
            }
            for seed in seeds {
                create_species_tx(&tx, tree_id, seed_request(id, seed))?;
            }
        }

        touch_tree_tx(&tx, tree_id, now_ms)?;
        let node = nested_species_tx(&tx, id)?.ok_or(StoreError::SpeciesNotFound)?;
        tx.commit()?;
        Ok(node)
    }
}
