use colored::Colorize;
use comfy_table::{Cell, Table};
use tracing::debug;

use crate::db::account_id;
use crate::error::Result;
use crate::filter::{
    contains_field_predicate, evaluate, fallback_plain_text, mark_text_metadata, parse_with, serialize, Expr, Mode,
    ParseOptions,
};
use crate::fmt::money;
use crate::models::TransactionRecord;
use crate::store::{Scope, SqliteStore, TransactionSource};

use super::open_db;

/// Parse a search box query. Malformed input degrades to a plain text search.
pub(crate) fn search_expr(query: &str, options: &ParseOptions) -> Expr {
    let parsed = match parse_with(query, Mode::Permissive, options) {
        Ok(expr) => expr,
        Err(e) => {
            eprintln!("{} {e}; searching for the text as typed", "Warning:".yellow());
            fallback_plain_text(query)
        }
    };
    if contains_field_predicate(&parsed) {
        parsed
    } else {
        mark_text_metadata(&parsed)
    }
}

pub(crate) fn matching<'a>(expr: &Expr, records: &'a [TransactionRecord]) -> Vec<&'a TransactionRecord> {
    records
        .iter()
        .filter(|record| evaluate(expr, &record.match_record()))
        .collect()
}

pub fn run(query: &str, accounts: &[String]) -> Result<()> {
    let (settings, conn) = open_db()?;

    let mut scope = Scope::default();
    for name in accounts {
        scope.account_ids.push(account_id(&conn, name)?);
    }

    let expr = search_expr(query, &settings.parse_options());
    debug!(query = %serialize(&expr), "search");

    let store = SqliteStore::new(&conn);
    let records = store.scoped_transactions(&scope)?;
    let hits = matching(&expr, &records);

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Account", "Description", "Amount", "Category", "Tags"]);
    let mut total = 0.0;
    for record in &hits {
        total += record.amount;
        let amount = if record.amount < 0.0 {
            money(record.amount).red().to_string()
        } else {
            money(record.amount).green().to_string()
        };
        table.add_row(vec![
            Cell::new(record.id),
            Cell::new(&record.date),
            Cell::new(&record.account_name),
            Cell::new(&record.description),
            Cell::new(amount),
            Cell::new(record.category.as_ref().map(|c| c.name.as_str()).unwrap_or("")),
            Cell::new(record.tags.values().cloned().collect::<Vec<_>>().join(", ")),
        ]);
    }
    println!("{table}");
    println!("{} matches, net {}", hits.len(), money(total));
    Ok(())
}
