#![forbid(unsafe_code)]

mod create;
pub(crate) mod delete;
mod get;
mod image;
mod update;

use super::{SpeciesRow, StoreError};
use pt_core::temporal::Position;
use rusqlite::{OptionalExtension, Transaction, params};
use std::collections::BTreeSet;

pub(crate) fn species_row_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<Option<SpeciesRow>, StoreError> {
    Ok(tx
        .query_row(
            r#"
            SELECT id, tree_id, ancestor_id, name, apparition, after_apparition,
                   duration, description, image
            FROM species
            WHERE id=?1
            "#,
            params![id],
            |row| {
                let ancestor_id: Option<String> = row.get(2)?;
                let apparition: Option<f64> = row.get(4)?;
                let after_apparition: Option<f64> = row.get(5)?;
                let position = match ancestor_id {
                    Some(ancestor_id) => Position::Attached {
                        ancestor_id,
                        after_apparition: after_apparition.unwrap_or(0.0),
                    },
                    None => Position::Root {
                        apparition: apparition.unwrap_or(0.0),
                    },
                };
                Ok(SpeciesRow {
                    id: row.get(0)?,
                    tree_id: row.get(1)?,
                    name: row.get(3)?,
                    position,
                    duration: row.get(6)?,
                    description: row.get(7)?,
                    image: row.get(8)?,
                })
            },
        )
        .optional()?)
}

pub(crate) fn insert_species_row_tx(
    tx: &Transaction<'_>,
    row: &SpeciesRow,
) -> Result<(), StoreError> {
    tx.execute(
        r#"
        INSERT INTO species(id, tree_id, ancestor_id, name, apparition, after_apparition,
                            duration, description, image)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            row.id,
            row.tree_id,
            row.position.ancestor_id(),
            row.name,
            row.position.apparition(),
            row.position.after_apparition(),
            row.duration,
            row.description,
            row.image,
        ],
    )?;
    Ok(())
}

pub(crate) fn save_species_row_tx(
    tx: &Transaction<'_>,
    row: &SpeciesRow,
) -> Result<(), StoreError> {
    tx.execute(
        r#"
        UPDATE species
        SET ancestor_id=?2, name=?3, apparition=?4, after_apparition=?5,
            duration=?6, description=?7, image=?8
        WHERE id=?1
        "#,
        params![
            row.id,
            row.position.ancestor_id(),
            row.name,
            row.position.apparition(),
            row.position.after_apparition(),
            row.duration,
            row.description,
            row.image,
        ],
    )?;
    Ok(())
}

pub(crate) fn children_ids_tx(
    tx: &Transaction<'_>,
    ancestor_id: &str,
) -> Result<Vec<String>, StoreError> {
    let mut stmt = tx.prepare("SELECT id FROM species WHERE ancestor_id=?1 ORDER BY id ASC")?;
    let rows = stmt.query_map(params![ancestor_id], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(crate) fn earliest_child_offset_tx(
    tx: &Transaction<'_>,
    ancestor_id: &str,
) -> Result<Option<f64>, StoreError> {
    Ok(tx.query_row(
        "SELECT MIN(after_apparition) FROM species WHERE ancestor_id=?1",
        params![ancestor_id],
        |row| row.get(0),
    )?)
}

/// Absolute apparition of a node: its stored apparition for a root, or the
/// sum of offsets up the stored ancestor chain. Missing links contribute 0
/// (best-effort, matching the read path's tolerance of concurrent deletes).
pub(crate) fn absolute_apparition_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<f64, StoreError> {
    let mut total = 0.0;
    let mut current = id.to_string();
    let mut visited = BTreeSet::new();
    loop {
        if !visited.insert(current.clone()) {
            // Corrupt ancestry loop; stop rather than spin.
            return Ok(total);
        }
        let Some(row) = species_row_tx(tx, &current)? else {
            return Ok(total);
        };
        match row.position {
            Position::Root { apparition } => return Ok(total + apparition),
            Position::Attached {
                ancestor_id,
                after_apparition,
            } => {
                total += after_apparition;
                current = ancestor_id;
            }
        }
    }
}

/// Re-parent cycle guard: walking up from the proposed ancestor must never
/// reach the node being moved.
pub(crate) fn ensure_no_cycle_tx(
    tx: &Transaction<'_>,
    moving_id: &str,
    new_ancestor_id: &str,
) -> Result<(), StoreError> {
    let mut current = new_ancestor_id.to_string();
    let mut visited = BTreeSet::new();
    loop {
        if current == moving_id {
            return Err(StoreError::AncestryCycle {
                species_id: moving_id.to_string(),
            });
        }
        if !visited.insert(current.clone()) {
            return Ok(());
        }
        match species_row_tx(tx, &current)? {
            Some(row) => match row.position {
                Position::Attached { ancestor_id, .. } => current = ancestor_id,
                Position::Root { .. } => return Ok(()),
            },
            None => return Ok(()),
        }
    }
}
