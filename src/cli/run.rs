use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::categorizer::{self, RunMode, RunReport};
use crate::db::account_id;
use crate::error::{Result, TallyError};
use crate::fmt::{clip, money};
use crate::resolver::resolve_rules;
use crate::store::{RuleSource, Scope, SqliteStore, TransactionSource};

use super::open_db;

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| TallyError::InvalidDate(format!("'{value}' (expected YYYY-MM-DD)")))
}

pub fn run(apply: bool, accounts: &[String], from: Option<&str>, to: Option<&str>) -> Result<()> {
    let (settings, conn) = open_db()?;

    let mut scope = Scope::default();
    for name in accounts {
        scope.account_ids.push(account_id(&conn, name)?);
    }
    scope.from = from.map(parse_day).transpose()?;
    scope.to = to.map(parse_day).transpose()?;

    let store = SqliteStore::new(&conn);
    let rules = store.enabled_rules()?;
    let slots = resolve_rules(&rules, &store, &store, &settings.parse_options());
    let batch = store.scoped_transactions(&scope)?;

    let mode = if apply { RunMode::Apply } else { RunMode::DryRun };
    let report = categorizer::run(&slots, &batch, mode, &store)?;

    print_report(&report, mode);
    Ok(())
}

fn print_report(report: &RunReport, mode: RunMode) {
    if report.outcomes.is_empty() {
        println!("No enabled rules.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["ID", "Rule", "Filter", "Matched", "Category", "Tags", "Status"]);
        for outcome in &report.outcomes {
            let status = match &outcome.error {
                Some(err) => err.red().to_string(),
                None => "ok".green().to_string(),
            };
            table.add_row(vec![
                Cell::new(outcome.rule_id),
                Cell::new(&outcome.rule_name),
                Cell::new(&outcome.filter_text),
                Cell::new(outcome.matched),
                Cell::new(outcome.category_changes),
                Cell::new(outcome.tag_changes),
                Cell::new(status),
            ]);
        }
        println!("Rules\n{table}");

        for outcome in report.outcomes.iter().filter(|o| !o.samples.is_empty()) {
            println!("{}", outcome.rule_name.bold());
            for sample in &outcome.samples {
                let mut effects = Vec::new();
                if sample.category_before != sample.category_after {
                    effects.push(format!(
                        "{} \u{2192} {}",
                        sample.category_before.as_deref().unwrap_or("(none)"),
                        sample.category_after.as_deref().unwrap_or("(none)"),
                    ));
                }
                if !sample.tags_added.is_empty() {
                    effects.push(format!("+{}", sample.tags_added.join(", +")));
                }
                println!(
                    "  {}  {:<32} {:>12}  {}",
                    sample.date,
                    clip(&sample.description, 32),
                    money(sample.amount),
                    effects.join("  ").cyan()
                );
            }
        }
        println!();
    }

    let s = &report.summary;
    let prefix = match mode {
        RunMode::DryRun => "Dry run:",
        RunMode::Apply => "Applied:",
    };
    println!(
        "{} {} transactions scoped, {} modified, {} category changes, {} tag changes, {} failed rules",
        prefix.bold(),
        s.transactions_scoped,
        s.total_modified,
        s.category_changes,
        s.tag_changes,
        s.failed_rules
    );
}
