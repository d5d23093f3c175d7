#![forbid(unsafe_code)]

use super::access::{check_species_tx, check_tree_tx};
use super::{CommentRow, SqliteStore, StoreError, next_id_tx, now_ms};
use pt_core::ids::UserId;
use rusqlite::{OptionalExtension, Transaction, params};

// Minimal comment/like records: enough surface for the ranking engine's
// event snapshots and the cascade rules. Follow/notification bookkeeping
// stays with external collaborators.
impl SqliteStore {
    pub fn comment_add(
        &mut self,
        tree_id: &str,
        caller: &UserId,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<CommentRow, StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::InvalidInput("comment must not be empty"));
        }
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        check_tree_tx(&tx, tree_id, Some(caller))?;

        if let Some(parent_id) = parent_id {
            let parent_tree: Option<String> = tx
                .query_row(
                    "SELECT tree_id FROM comments WHERE id=?1",
                    params![parent_id],
                    |row| row.get(0),
                )
                .optional()?;
            match parent_tree {
                Some(parent_tree) if parent_tree == tree_id => {}
                Some(_) => {
                    return Err(StoreError::InvalidInput(
                        "parent comment belongs to another tree",
                    ));
                }
                None => return Err(StoreError::CommentNotFound),
            }
        }

        let id = next_id_tx(&tx, "comment_seq", "cm_")?;
        let row = CommentRow {
            id,
            tree_id: tree_id.to_string(),
            user_id: caller.as_str().to_string(),
            content: content.to_string(),
            parent_id: parent_id.map(str::to_string),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        tx.execute(
            r#"
            INSERT INTO comments(id, tree_id, user_id, content, parent_id, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                row.id,
                row.tree_id,
                row.user_id,
                row.content,
                row.parent_id,
                row.created_at_ms,
                row.updated_at_ms,
            ],
        )?;
        tx.commit()?;
        Ok(row)
    }

    /// Removes a comment and the likes referencing it. Author or tree owner
    /// only.
    pub fn comment_delete(
        &mut self,
        tree_id: &str,
        comment_id: &str,
        caller: &UserId,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let tree = check_tree_tx(&tx, tree_id, Some(caller))?;

        let author: Option<String> = tx
            .query_row(
                "SELECT user_id FROM comments WHERE id=?1 AND tree_id=?2",
                params![comment_id, tree_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(author) = author else {
            return Err(StoreError::CommentNotFound);
        };
        if author != caller.as_str() && tree.owner_id != caller.as_str() {
            return Err(StoreError::AccessDenied);
        }

        tx.execute("DELETE FROM likes WHERE comment_id=?1", params![comment_id])?;
        tx.execute("DELETE FROM comments WHERE id=?1", params![comment_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Likes the tree; at most one like per user and tree. Returns the tree's
    /// like count.
    pub fn like_tree(&mut self, tree_id: &str, caller: &UserId) -> Result<i64, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        check_tree_tx(&tx, tree_id, Some(caller))?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM likes WHERE user_id=?1 AND tree_id=?2",
                params![caller.as_str(), tree_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_none() {
            let id = next_id_tx(&tx, "like_seq", "lk_")?;
            tx.execute(
                "INSERT INTO likes(id, user_id, tree_id, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
                params![id, caller.as_str(), tree_id, now_ms],
            )?;
        }
        let count = like_count_tx(&tx, tree_id)?;
        tx.commit()?;
        Ok(count)
    }

    pub fn unlike_tree(&mut self, tree_id: &str, caller: &UserId) -> Result<i64, StoreError> {
        let tx = self.conn.transaction()?;
        check_tree_tx(&tx, tree_id, Some(caller))?;
        tx.execute(
            "DELETE FROM likes WHERE user_id=?1 AND tree_id=?2",
            params![caller.as_str(), tree_id],
        )?;
        let count = like_count_tx(&tx, tree_id)?;
        tx.commit()?;
        Ok(count)
    }

    pub fn like_species(
        &mut self,
        tree_id: &str,
        species_id: &str,
        caller: &UserId,
    ) -> Result<(), StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        check_species_tx(&tx, tree_id, species_id, Some(caller))?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM likes WHERE user_id=?1 AND species_id=?2",
                params![caller.as_str(), species_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_none() {
            let id = next_id_tx(&tx, "like_seq", "lk_")?;
            tx.execute(
                "INSERT INTO likes(id, user_id, species_id, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
                params![id, caller.as_str(), species_id, now_ms],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn like_comment(
        &mut self,
        tree_id: &str,
        comment_id: &str,
        caller: &UserId,
    ) -> Result<(), StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        check_tree_tx(&tx, tree_id, Some(caller))?;
        let exists: Option<String> = tx
            .query_row(
                "SELECT id FROM comments WHERE id=?1 AND tree_id=?2",
                params![comment_id, tree_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::CommentNotFound);
        }
        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM likes WHERE user_id=?1 AND comment_id=?2",
                params![caller.as_str(), comment_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_none() {
            let id = next_id_tx(&tx, "like_seq", "lk_")?;
            tx.execute(
                "INSERT INTO likes(id, user_id, comment_id, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
                params![id, caller.as_str(), comment_id, now_ms],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

pub(crate) fn like_count_tx(tx: &Transaction<'_>, tree_id: &str) -> Result<i64, StoreError> {
    Ok(tx.query_row(
        "SELECT COUNT(*) FROM likes WHERE tree_id=?1",
        params![tree_id],
        |row| row.get(0),
    )?)
}
