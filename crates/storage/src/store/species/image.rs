#![forbid(unsafe_code)]

use super::super::access::check_species_tx;
use super::super::{SpeciesNode, SqliteStore, StoreError, now_ms, touch_tree_tx};
use super::get::nested_species_tx;
use pt_core::ids::UserId;
use rusqlite::params;

impl SqliteStore {
    /// Sets or clears the stored image reference. Image bytes live with an
    /// external collaborator; only the resolved URL is persisted here. The
    /// previous reference is returned so the caller can release it.
    pub fn species_set_image(
        &mut self,
        tree_id: &str,
        id: &str,
        caller: Option<&UserId>,
        image: Option<&str>,
    ) -> Result<(SpeciesNode, Option<String>), StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let row = check_species_tx(&tx, tree_id, id, caller)?;
        let previous = row.image;

        tx.execute(
            "UPDATE species SET image=?2 WHERE id=?1",
            params![id, image],
        )?;
        touch_tree_tx(&tx, tree_id, now_ms)?;
        let node = nested_species_tx(&tx, id)?.ok_or(StoreError::SpeciesNotFound)?;
        tx.commit()?;
        Ok((node, previous))
    }
}
