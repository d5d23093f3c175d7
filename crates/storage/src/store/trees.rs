#![forbid(unsafe_code)]

use super::access::{check_tree_tx, require_member, require_owner};
use super::{
    SqliteStore, StoreError, TreeCreateRequest, TreePatch, TreeRow, TreeSummary, ViewRow,
    next_id_tx, now_ms, touch_tree_tx,
};
use pt_core::ids::UserId;
use rusqlite::{OptionalExtension, Transaction, params};

impl SqliteStore {
    pub fn tree_create(
        &mut self,
        owner: &UserId,
        request: TreeCreateRequest,
    ) -> Result<TreeRow, StoreError> {
        let TreeCreateRequest {
            name,
            description,
            is_public,
            tags,
            collaborators,
        } = request;
        if name.trim().is_empty() {
            return Err(StoreError::InvalidInput("tree name must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let id = next_id_tx(&tx, "tree_seq", "tr_")?;

        let row = TreeRow {
            id,
            owner_id: owner.as_str().to_string(),
            name,
            description,
            image: None,
            is_public,
            tags,
            collaborators: dedup_collaborators(owner.as_str(), collaborators),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        tx.execute(
            r#"
            INSERT INTO ph_trees(id, owner_id, name, description, image, is_public,
                                 tags_json, collaborators_json, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                row.id,
                row.owner_id,
                row.name,
                row.description,
                row.image,
                row.is_public as i64,
                encode_list(&row.tags),
                encode_list(&row.collaborators),
                row.created_at_ms,
                row.updated_at_ms,
            ],
        )?;
        tx.commit()?;
        Ok(row)
    }

    pub fn tree_get(
        &mut self,
        id: &str,
        caller: Option<&UserId>,
    ) -> Result<TreeSummary, StoreError> {
        let tx = self.conn.transaction()?;
        let row = check_tree_tx(&tx, id, caller)?;
        let summary = summary_tx(&tx, row)?;
        tx.commit()?;
        Ok(summary)
    }

    pub fn tree_update(
        &mut self,
        id: &str,
        caller: &UserId,
        patch: TreePatch,
    ) -> Result<TreeRow, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let mut row = tree_row_tx(&tx, id)?.ok_or(StoreError::TreeNotFound)?;
        require_member(&row, caller)?;

        let TreePatch {
            name,
            description,
            is_public,
            tags,
            add_collaborators,
            remove_collaborators,
        } = patch;

        if let Some(name) = name {
            if !name.trim().is_empty() {
                row.name = name;
            }
        }
        if let Some(description) = description {
            row.description = description.filter(|d| !d.is_empty());
        }
        if let Some(is_public) = is_public {
            row.is_public = is_public;
        }
        if let Some(tags) = tags {
            row.tags = tags;
        }
        for collaborator in add_collaborators {
            if collaborator != row.owner_id && !row.collaborators.contains(&collaborator) {
                row.collaborators.push(collaborator);
            }
        }
        if !remove_collaborators.is_empty() {
            // Only the owner may revoke collaborators.
            require_owner(&row, caller)?;
            row.collaborators
                .retain(|collaborator| !remove_collaborators.contains(collaborator));
        }

        row.updated_at_ms = now_ms;
        save_tree_row_tx(&tx, &row)?;
        tx.commit()?;
        Ok(row)
    }

    /// Owner-only delete, cascading to species, comments, likes (on the tree,
    /// its comments and its species) and view events.
    pub fn tree_delete(&mut self, id: &str, caller: &UserId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let row = tree_row_tx(&tx, id)?.ok_or(StoreError::TreeNotFound)?;
        require_owner(&row, caller)?;

        tx.execute(
            "DELETE FROM likes WHERE comment_id IN (SELECT id FROM comments WHERE tree_id=?1)",
            params![id],
        )?;
        tx.execute(
            "DELETE FROM likes WHERE species_id IN (SELECT id FROM species WHERE tree_id=?1)",
            params![id],
        )?;
        tx.execute("DELETE FROM likes WHERE tree_id=?1", params![id])?;
        tx.execute("DELETE FROM comments WHERE tree_id=?1", params![id])?;
        tx.execute("DELETE FROM species WHERE tree_id=?1", params![id])?;
        tx.execute("DELETE FROM tree_views WHERE tree_id=?1", params![id])?;
        tx.execute("DELETE FROM ph_trees WHERE id=?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    /// Registers a view by the caller and returns the tree's view count. A
    /// viewer holds at most one view event per tree; re-viewing refreshes its
    /// timestamp. Anonymous callers only read the count.
    pub fn tree_set_view(
        &mut self,
        id: &str,
        caller: Option<&UserId>,
    ) -> Result<i64, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        check_tree_tx(&tx, id, caller)?;
        if let Some(caller) = caller {
            tx.execute(
                r#"
                INSERT INTO tree_views(tree_id, viewer_id, viewed_at_ms) VALUES (?1, ?2, ?3)
                ON CONFLICT(tree_id, viewer_id) DO UPDATE SET viewed_at_ms=excluded.viewed_at_ms
                "#,
                params![id, caller.as_str(), now_ms],
            )?;
        }
        let views = view_count_tx(&tx, id)?;
        tx.commit()?;
        Ok(views)
    }

    pub fn tree_views(&mut self, id: &str, caller: Option<&UserId>) -> Result<Vec<ViewRow>, StoreError> {
        let tx = self.conn.transaction()?;
        check_tree_tx(&tx, id, caller)?;
        let mut stmt = tx.prepare(
            "SELECT viewer_id, viewed_at_ms FROM tree_views WHERE tree_id=?1 ORDER BY viewed_at_ms ASC",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(ViewRow {
                viewer_id: row.get(0)?,
                viewed_at_ms: row.get(1)?,
            })
        })?;
        let views = rows.collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        tx.commit()?;
        Ok(views)
    }

    /// Bumps the tree's `updated_at` stamp. Exposed for collaborators outside
    /// this crate that mutate tree-adjacent records.
    pub fn tree_touch(&mut self, id: &str) -> Result<(), StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        tree_row_tx(&tx, id)?.ok_or(StoreError::TreeNotFound)?;
        touch_tree_tx(&tx, id, now_ms)?;
        tx.commit()?;
        Ok(())
    }
}

fn dedup_collaborators(owner_id: &str, collaborators: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for collaborator in collaborators {
        if collaborator != owner_id && !out.contains(&collaborator) {
            out.push(collaborator);
        }
    }
    out
}

pub(crate) const TREE_COLUMNS: &str = "id, owner_id, name, description, image, is_public, \
     tags_json, collaborators_json, created_at_ms, updated_at_ms";

pub(crate) fn decode_tree_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TreeRow> {
    Ok(TreeRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        image: row.get(4)?,
        is_public: row.get::<_, i64>(5)? != 0,
        tags: decode_list(&row.get::<_, String>(6)?),
        collaborators: decode_list(&row.get::<_, String>(7)?),
        created_at_ms: row.get(8)?,
        updated_at_ms: row.get(9)?,
    })
}

pub(crate) fn tree_row_tx(
    tx: &Transaction<'_>,
    id: &str,
) -> Result<Option<TreeRow>, StoreError> {
    let sql = format!("SELECT {TREE_COLUMNS} FROM ph_trees WHERE id=?1");
    Ok(tx
        .query_row(&sql, params![id], decode_tree_row)
        .optional()?)
}

pub(crate) fn save_tree_row_tx(tx: &Transaction<'_>, row: &TreeRow) -> Result<(), StoreError> {
    tx.execute(
        r#"
        UPDATE ph_trees
        SET name=?2, description=?3, image=?4, is_public=?5,
            tags_json=?6, collaborators_json=?7, updated_at_ms=?8
        WHERE id=?1
        "#,
        params![
            row.id,
            row.name,
            row.description,
            row.image,
            row.is_public as i64,
            encode_list(&row.tags),
            encode_list(&row.collaborators),
            row.updated_at_ms,
        ],
    )?;
    Ok(())
}

pub(crate) fn summary_tx(tx: &Transaction<'_>, row: TreeRow) -> Result<TreeSummary, StoreError> {
    let likes = scalar_tx(tx, "SELECT COUNT(*) FROM likes WHERE tree_id=?1", &row.id)?;
    let comments = scalar_tx(tx, "SELECT COUNT(*) FROM comments WHERE tree_id=?1", &row.id)?;
    let views = view_count_tx(tx, &row.id)?;
    Ok(TreeSummary {
        row,
        likes,
        comments,
        views,
    })
}

pub(crate) fn view_count_tx(tx: &Transaction<'_>, tree_id: &str) -> Result<i64, StoreError> {
    scalar_tx(tx, "SELECT COUNT(*) FROM tree_views WHERE tree_id=?1", tree_id)
}

fn scalar_tx(tx: &Transaction<'_>, sql: &str, id: &str) -> Result<i64, StoreError> {
    Ok(tx.query_row(sql, params![id], |row| row.get(0))?)
}

// String lists (tags, collaborators) are stored as JSON text columns, the way
// the rest of the document fields stay schema-less.
fn encode_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn decode_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}
