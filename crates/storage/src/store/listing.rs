#![forbid(unsafe_code)]

use super::trees::{TREE_COLUMNS, decode_tree_row, summary_tx, tree_row_tx};
use super::{
    SortOrder, SqliteStore, StoreError, TreeCriteria, TreeListPage, TreeListRequest, TreeRow,
    TreeSummary, now_ms,
};
use pt_core::ids::UserId;
use pt_core::popularity::{self, PopularityWeights};
use rusqlite::types::Value;
use rusqlite::{Transaction, params, params_from_iter};
use std::cmp::Ordering;

const MAX_PAGE_SIZE: usize = 200;

impl SqliteStore {
    /// Filtered, sorted, paged tree listing. Stored-column criteria delegate
    /// the sort to SQL; computed criteria (views, comments, likes,
    /// popularity) materialize the filtered set, score it in memory, then
    /// slice the page. O(filtered set) per request — acceptable while tree
    /// counts stay small.
    pub fn trees_list(
        &mut self,
        request: TreeListRequest,
        caller: Option<&UserId>,
        weights: &PopularityWeights,
    ) -> Result<TreeListPage, StoreError> {
        if request.only_mine && caller.is_none() {
            return Err(StoreError::AccessDenied);
        }
        let page_size = request.page_size.clamp(1, MAX_PAGE_SIZE);
        let skip = request.page.saturating_mul(page_size);
        let (filter, values) = build_filter(&request, caller);

        let order = request.order;
        let tx = self.conn.transaction()?;
        let page = match request.criteria {
            TreeCriteria::CreatedAt => {
                stored_sort_page_tx(&tx, "created_at_ms", order, &filter, &values, page_size, skip)?
            }
            TreeCriteria::UpdatedAt => {
                stored_sort_page_tx(&tx, "updated_at_ms", order, &filter, &values, page_size, skip)?
            }
            TreeCriteria::Name => stored_sort_page_tx(
                &tx,
                "name COLLATE NOCASE",
                order,
                &filter,
                &values,
                page_size,
                skip,
            )?,
            TreeCriteria::Views => computed_sort_page_tx(
                &tx,
                ComputedKey::Views,
                order,
                &filter,
                &values,
                weights,
                page_size,
                skip,
            )?,
            TreeCriteria::Comments => computed_sort_page_tx(
                &tx,
                ComputedKey::Comments,
                order,
                &filter,
                &values,
                weights,
                page_size,
                skip,
            )?,
            TreeCriteria::Likes => computed_sort_page_tx(
                &tx,
                ComputedKey::Likes,
                order,
                &filter,
                &values,
                weights,
                page_size,
                skip,
            )?,
            TreeCriteria::Popularity => computed_sort_page_tx(
                &tx,
                ComputedKey::Popularity,
                order,
                &filter,
                &values,
                weights,
                page_size,
                skip,
            )?,
        };
        tx.commit()?;
        Ok(page)
    }

    /// The tree's current popularity score at `now_ms`, straight from the
    /// event snapshots. Pure recomputation; nothing is cached.
    pub fn tree_popularity(
        &mut self,
        tree_id: &str,
        now_ms: i64,
        weights: &PopularityWeights,
    ) -> Result<f64, StoreError> {
        let tx = self.conn.transaction()?;
        tree_row_tx(&tx, tree_id)?.ok_or(StoreError::TreeNotFound)?;
        let score = popularity_tx(&tx, tree_id, now_ms, weights)?;
        tx.commit()?;
        Ok(score)
    }
}

/// Sort key computed per row after the SQL filter: social counters or the
/// decayed popularity score.
enum ComputedKey {
    Views,
    Comments,
    Likes,
    Popularity,
}

fn stored_sort_page_tx(
    tx: &Transaction<'_>,
    column: &str,
    order: SortOrder,
    filter: &str,
    values: &[Value],
    page_size: usize,
    skip: usize,
) -> Result<TreeListPage, StoreError> {
    let total: i64 = tx.query_row(
        &format!("SELECT COUNT(*) FROM ph_trees WHERE {filter}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let dir = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let order_by = format!("{column} {dir}, id {dir}");

    let sql = format!(
        "SELECT {TREE_COLUMNS} FROM ph_trees WHERE {filter} ORDER BY {order_by} LIMIT ? OFFSET ?"
    );
    let mut page_values: Vec<Value> = values.to_vec();
    page_values.push(Value::from(page_size as i64));
    page_values.push(Value::from(skip as i64));

    let mut stmt = tx.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(page_values.iter()), decode_tree_row)?;
    let rows = rows.collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    let mut trees = Vec::with_capacity(rows.len());
    for row in rows {
        trees.push(summary_tx(tx, row)?);
    }
    Ok(TreeListPage {
        trees,
        total: total.max(0) as usize,
    })
}

fn computed_sort_page_tx(
    tx: &Transaction<'_>,
    key: ComputedKey,
    order: SortOrder,
    filter: &str,
    values: &[Value],
    weights: &PopularityWeights,
    page_size: usize,
    skip: usize,
) -> Result<TreeListPage, StoreError> {
    // Stable base order so equal keys keep a deterministic sequence.
    let sql = format!(
        "SELECT {TREE_COLUMNS} FROM ph_trees WHERE {filter} ORDER BY created_at_ms ASC, id ASC"
    );
    let mut stmt = tx.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), decode_tree_row)?;
    let rows = rows.collect::<Result<Vec<TreeRow>, _>>()?;
    drop(stmt);

    let now_ms = now_ms();
    let mut keyed: Vec<(f64, TreeSummary)> = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id.clone();
        let summary = summary_tx(tx, row)?;
        let sort_key = match key {
            ComputedKey::Views => summary.views as f64,
            ComputedKey::Comments => summary.comments as f64,
            ComputedKey::Likes => summary.likes as f64,
            ComputedKey::Popularity => popularity_tx(tx, &id, now_ms, weights)?,
        };
        keyed.push((sort_key, summary));
    }

    match order {
        SortOrder::Asc => {
            keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        }
        SortOrder::Desc => {
            keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        }
    }

    let total = keyed.len();
    let trees = keyed
        .into_iter()
        .skip(skip)
        .take(page_size)
        .map(|(_, summary)| summary)
        .collect();
    Ok(TreeListPage { trees, total })
}

pub(crate) fn popularity_tx(
    tx: &Transaction<'_>,
    tree_id: &str,
    now_ms: i64,
    weights: &PopularityWeights,
) -> Result<f64, StoreError> {
    let views = stamps_tx(
        tx,
        "SELECT viewed_at_ms FROM tree_views WHERE tree_id=?1",
        tree_id,
    )?;
    let comments = stamps_tx(
        tx,
        "SELECT created_at_ms FROM comments WHERE tree_id=?1",
        tree_id,
    )?;
    let likes = stamps_tx(
        tx,
        "SELECT created_at_ms FROM likes WHERE tree_id=?1",
        tree_id,
    )?;
    Ok(popularity::score(now_ms, weights, &views, &comments, &likes))
}

fn stamps_tx(tx: &Transaction<'_>, sql: &str, tree_id: &str) -> Result<Vec<i64>, StoreError> {
    let mut stmt = tx.prepare(sql)?;
    let rows = stmt.query_map(params![tree_id], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn build_filter(
    request: &TreeListRequest,
    caller: Option<&UserId>,
) -> (String, Vec<Value>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    match (caller, request.only_mine) {
        (None, _) => conditions.push("is_public=1".to_string()),
        (Some(caller), true) => {
            conditions.push("owner_id=?".to_string());
            values.push(Value::from(caller.as_str().to_string()));
        }
        (Some(caller), false) => {
            conditions.push("(is_public=1 OR owner_id=?)".to_string());
            values.push(Value::from(caller.as_str().to_string()));
        }
    }

    if let Some(text) = request.text.as_deref() {
        let text = text.trim();
        if !text.is_empty() {
            let pattern = like_pattern(text);
            conditions.push("(name LIKE ? ESCAPE '\\' OR tags_json LIKE ? ESCAPE '\\')".to_string());
            values.push(Value::from(pattern.clone()));
            values.push(Value::from(pattern));
        }
    }
    if let Some(from) = request.created_from_ms {
        conditions.push("created_at_ms>=?".to_string());
        values.push(Value::from(from));
    }
    if let Some(to) = request.created_to_ms {
        conditions.push("created_at_ms<=?".to_string());
        values.push(Value::from(to));
    }

    (conditions.join(" AND "), values)
}

fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    format!("%{escaped}%")
}
