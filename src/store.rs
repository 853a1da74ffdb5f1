//! Storage contracts the rule engine depends on, and their SQLite
//! implementation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::info;

use crate::categorizer::TxnChange;
use crate::error::Result;
use crate::models::{CategoryRef, Rule, SavedFilter, TransactionRecord};

pub trait SavedFilterLookup {
    /// Case-insensitive lookup by id.
    fn saved_filter(&self, id: &str) -> Result<Option<SavedFilter>>;
}

pub trait TagLookup {
    fn tag_name(&self, id: i64) -> Result<Option<String>>;
}

pub trait RuleSource {
    /// Enabled rules in ascending sort order.
    fn enabled_rules(&self) -> Result<Vec<Rule>>;
}

pub trait TransactionSource {
    /// Transactions inside `scope`, in import order then id, with tags attached.
    fn scoped_transactions(&self, scope: &Scope) -> Result<Vec<TransactionRecord>>;
}

pub trait ApplyWriter {
    /// Persist all changes atomically: either every change lands or none does.
    fn apply_changes(&self, changes: &[TxnChange]) -> Result<()>;
}

/// Subset of transactions a run covers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    /// Empty means every account.
    pub account_ids: Vec<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

pub(crate) const RULE_COLUMNS: &str = "r.id, r.name, r.saved_filter_id, r.set_category_id, c.name, \
     r.add_tag_ids, r.sort_order, r.is_enabled";

pub(crate) fn rule_from_row(row: &rusqlite::Row) -> rusqlite::Result<Rule> {
    let category_id: Option<i64> = row.get(3)?;
    let category_name: Option<String> = row.get(4)?;
    let set_category = match (category_id, category_name) {
        (Some(id), Some(name)) => Some(CategoryRef { id, name }),
        _ => None,
    };
    Ok(Rule {
        id: row.get(0)?,
        name: row.get(1)?,
        saved_filter_id: row.get(2)?,
        set_category,
        add_tag_ids: row.get(5)?,
        sort_order: row.get(6)?,
        is_enabled: row.get::<_, i64>(7)? != 0,
    })
}

impl SavedFilterLookup for SqliteStore<'_> {
    fn saved_filter(&self, id: &str) -> Result<Option<SavedFilter>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, name, expression FROM saved_filters WHERE id = ?1",
                [id.trim().to_lowercase()],
                |row| {
                    Ok(SavedFilter {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        expression: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }
}

impl TagLookup for SqliteStore<'_> {
    fn tag_name(&self, id: i64) -> Result<Option<String>> {
        let name = self
            .conn
            .query_row("SELECT name FROM tags WHERE id = ?1", [id], |r| r.get(0))
            .optional()?;
        Ok(name)
    }
}

impl RuleSource for SqliteStore<'_> {
    fn enabled_rules(&self) -> Result<Vec<Rule>> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM rules r LEFT JOIN categories c ON r.set_category_id = c.id \
             WHERE r.is_enabled = 1 ORDER BY r.sort_order, r.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rules = stmt
            .query_map([], rule_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }
}

impl TransactionSource for SqliteStore<'_> {
    fn scoped_transactions(&self, scope: &Scope) -> Result<Vec<TransactionRecord>> {
        let mut sql = String::from(
            "SELECT t.id, t.account_id, a.name, t.date, t.description, t.amount, \
             t.category_id, c.name, t.notes \
             FROM transactions t \
             JOIN accounts a ON t.account_id = a.id \
             LEFT JOIN categories c ON t.category_id = c.id \
             WHERE 1 = 1",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !scope.account_ids.is_empty() {
            let placeholders = vec!["?"; scope.account_ids.len()].join(", ");
            sql.push_str(&format!(" AND t.account_id IN ({placeholders})"));
            for id in &scope.account_ids {
                params.push(Box::new(*id));
            }
        }
        if let Some(from) = scope.from {
            sql.push_str(" AND t.date >= ?");
            params.push(Box::new(from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = scope.to {
            sql.push_str(" AND t.date <= ?");
            params.push(Box::new(to.format("%Y-%m-%d").to_string()));
        }
        sql.push_str(" ORDER BY COALESCE(t.import_id, 0), t.id");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut records = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                let category_id: Option<i64> = row.get(6)?;
                let category_name: Option<String> = row.get(7)?;
                Ok(TransactionRecord {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    account_name: row.get(2)?,
                    date: row.get(3)?,
                    description: row.get(4)?,
                    amount: row.get(5)?,
                    category: match (category_id, category_name) {
                        (Some(id), Some(name)) => Some(CategoryRef { id, name }),
                        _ => None,
                    },
                    notes: row.get(8)?,
                    tags: BTreeMap::new(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut tag_stmt = self.conn.prepare(
            "SELECT tg.id, tg.name FROM transaction_tags tt \
             JOIN tags tg ON tt.tag_id = tg.id WHERE tt.transaction_id = ?1",
        )?;
        for record in &mut records {
            let tags = tag_stmt
                .query_map([record.id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
                .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
            record.tags = tags;
        }

        Ok(records)
    }
}

impl ApplyWriter for SqliteStore<'_> {
    fn apply_changes(&self, changes: &[TxnChange]) -> Result<()> {
        // IMMEDIATE takes the write lock up front so two apply runs cannot interleave.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        {
            let mut set_category =
                tx.prepare("UPDATE transactions SET category_id = ?1 WHERE id = ?2")?;
            let mut add_tag = tx.prepare(
                "INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id) VALUES (?1, ?2)",
            )?;
            for change in changes {
                if let Some(category_id) = change.new_category {
                    set_category.execute([category_id, change.transaction_id])?;
                }
                for tag_id in &change.add_tags {
                    add_tag.execute([change.transaction_id, *tag_id])?;
                }
            }
        }
        tx.commit()?;
        info!(transactions = changes.len(), "applied rule changes");
        Ok(())
    }
}
