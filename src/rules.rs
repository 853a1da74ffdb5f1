//! Saved filters and rules: creation, ordering and removal.

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::db::{category_by_name, tag_by_name};
use crate::error::{Result, TallyError};
use crate::filter::{parse_with, Mode, ParseOptions};
use crate::models::{Rule, SavedFilter};
use crate::resolver::encode_tag_ids;
use crate::store::{rule_from_row, RULE_COLUMNS};

/// Store a saved filter. The expression must strict-parse.
pub fn add_saved_filter(
    conn: &Connection,
    id: &str,
    name: &str,
    expression: &str,
    options: &ParseOptions,
) -> Result<SavedFilter> {
    let key = id.trim().to_lowercase();
    if key.is_empty() {
        return Err(TallyError::Other("saved filter id cannot be empty".to_string()));
    }
    parse_with(expression, Mode::Strict, options)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM saved_filters WHERE id = ?1)",
        [&key],
        |r| r.get(0),
    )?;
    if exists {
        return Err(TallyError::DuplicateFilter(key));
    }

    let expression = expression.trim();
    conn.execute(
        "INSERT INTO saved_filters (id, name, expression) VALUES (?1, ?2, ?3)",
        rusqlite::params![key, name, expression],
    )?;
    Ok(SavedFilter {
        id: key,
        name: name.to_string(),
        expression: expression.to_string(),
    })
}

pub fn list_saved_filters(conn: &Connection) -> Result<Vec<SavedFilter>> {
    let mut stmt = conn.prepare("SELECT id, name, expression FROM saved_filters ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SavedFilter {
                id: row.get(0)?,
                name: row.get(1)?,
                expression: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Remove a saved filter. Rules that reference it stay and fail to resolve.
pub fn delete_saved_filter(conn: &Connection, id: &str) -> Result<()> {
    let key = id.trim().to_lowercase();
    let removed = conn.execute("DELETE FROM saved_filters WHERE id = ?1", [&key])?;
    if removed == 0 {
        return Err(TallyError::UnknownFilter(key));
    }
    Ok(())
}

pub struct NewRule<'a> {
    pub name: &'a str,
    pub saved_filter_id: &'a str,
    pub set_category: Option<&'a str>,
    pub add_tags: &'a [String],
}

/// Append a rule after the current last one.
pub fn add_rule(conn: &Connection, new_rule: &NewRule) -> Result<Rule> {
    if new_rule.set_category.is_none() && new_rule.add_tags.is_empty() {
        return Err(TallyError::InvalidRule(
            "a rule needs a category to set or at least one tag to add".to_string(),
        ));
    }

    let filter_key = new_rule.saved_filter_id.trim().to_lowercase();
    let filter_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM saved_filters WHERE id = ?1)",
        [&filter_key],
        |r| r.get(0),
    )?;
    if !filter_exists {
        return Err(TallyError::UnknownFilter(filter_key));
    }

    let category_id = match new_rule.set_category {
        Some(name) => Some(category_by_name(conn, name)?.id),
        None => None,
    };
    let mut tag_ids = BTreeSet::new();
    for name in new_rule.add_tags {
        tag_ids.insert(tag_by_name(conn, name)?.id);
    }

    let next_order: i64 = conn.query_row("SELECT COALESCE(MAX(sort_order), 0) + 1 FROM rules", [], |r| {
        r.get(0)
    })?;
    conn.execute(
        "INSERT INTO rules (name, saved_filter_id, set_category_id, add_tag_ids, sort_order) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            new_rule.name,
            filter_key,
            category_id,
            encode_tag_ids(&tag_ids),
            next_order
        ],
    )?;
    get_rule(conn, conn.last_insert_rowid())
}

pub fn get_rule(conn: &Connection, id: i64) -> Result<Rule> {
    let sql = format!(
        "SELECT {RULE_COLUMNS} FROM rules r LEFT JOIN categories c ON r.set_category_id = c.id WHERE r.id = ?1"
    );
    conn.query_row(&sql, [id], rule_from_row)
        .optional()?
        .ok_or(TallyError::UnknownRule(id))
}

/// Every rule, enabled or not, in sort order.
pub fn list_rules(conn: &Connection) -> Result<Vec<Rule>> {
    let sql = format!(
        "SELECT {RULE_COLUMNS} FROM rules r LEFT JOIN categories c ON r.set_category_id = c.id \
         ORDER BY r.sort_order, r.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], rule_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn ordered_ids(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM rules ORDER BY sort_order, id")?;
    let ids = stmt
        .query_map([], |r| r.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn write_order(conn: &Connection, ids: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare("UPDATE rules SET sort_order = ?1 WHERE id = ?2")?;
    for (i, id) in ids.iter().enumerate() {
        stmt.execute([i as i64 + 1, *id])?;
    }
    Ok(())
}

/// Rewrite sort orders as 1..N keeping the current relative order.
pub fn renumber_rules(conn: &Connection) -> Result<()> {
    let ids = ordered_ids(conn)?;
    write_order(conn, &ids)
}

pub fn delete_rule(conn: &Connection, id: i64) -> Result<Rule> {
    let rule = get_rule(conn, id)?;
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute("DELETE FROM rules WHERE id = ?1", [id])?;
    renumber_rules(&tx)?;
    tx.commit()?;
    Ok(rule)
}

/// Move a rule to a 1-based position; positions past the end clamp to last.
pub fn move_rule(conn: &Connection, id: i64, position: usize) -> Result<()> {
    get_rule(conn, id)?;
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut ids = ordered_ids(&tx)?;
    ids.retain(|&other| other != id);
    let index = position.saturating_sub(1).min(ids.len());
    ids.insert(index, id);
    write_order(&tx, &ids)?;
    tx.commit()?;
    Ok(())
}

pub fn set_rule_enabled(conn: &Connection, id: i64, enabled: bool) -> Result<()> {
    let updated = conn.execute(
        "UPDATE rules SET is_enabled = ?1 WHERE id = ?2",
        rusqlite::params![enabled as i64, id],
    )?;
    if updated == 0 {
        return Err(TallyError::UnknownRule(id));
    }
    Ok(())
}
