use rusqlite::Connection;

use crate::db::{add_account, add_tag, category_by_name, init_db, insert_transaction, tag_transaction};
use crate::error::Result;
use crate::filter::ParseOptions;
use crate::models::NewTransaction;
use crate::rules::{add_rule, add_saved_filter, NewRule};

use super::open_db;

struct DemoAccount {
    name: &'static str,
    account_type: &'static str,
    institution: &'static str,
}

const ACCOUNTS: &[DemoAccount] = &[
    DemoAccount { name: "Checking", account_type: "checking", institution: "First Street Bank" },
    DemoAccount { name: "Visa", account_type: "credit_card", institution: "First Street Bank" },
];

const TAGS: &[&str] = &["Pantry", "Work", "Reimbursable"];

struct DemoTxn {
    account: &'static str,
    date: &'static str,
    description: &'static str,
    amount: f64,
    category: Option<&'static str>,
    notes: Option<&'static str>,
    tags: &'static [&'static str],
}

const TRANSACTIONS: &[DemoTxn] = &[
    DemoTxn { account: "Checking", date: "2025-01-03", description: "ACME CORP PAYROLL", amount: 3200.00, category: Some("Salary"), notes: None, tags: &[] },
    DemoTxn { account: "Checking", date: "2025-01-05", description: "WHOLE FOODS MARKET", amount: -86.40, category: Some("Food"), notes: None, tags: &[] },
    DemoTxn { account: "Checking", date: "2025-01-09", description: "TRADER JOES #552", amount: -54.12, category: Some("Food"), notes: None, tags: &[] },
    DemoTxn { account: "Visa", date: "2025-01-11", description: "UBER *TRIP", amount: -23.50, category: None, notes: Some("client visit"), tags: &[] },
    DemoTxn { account: "Visa", date: "2025-01-14", description: "LYFT RIDE", amount: -18.75, category: None, notes: None, tags: &[] },
    DemoTxn { account: "Checking", date: "2025-01-15", description: "CITY APARTMENTS", amount: -1450.00, category: Some("Rent"), notes: None, tags: &[] },
    DemoTxn { account: "Visa", date: "2025-01-20", description: "CAFE ROMA", amount: -12.80, category: Some("Food"), notes: Some("team lunch"), tags: &["Work"] },
    DemoTxn { account: "Checking", date: "2025-02-03", description: "ACME CORP PAYROLL", amount: 3200.00, category: Some("Salary"), notes: None, tags: &[] },
    DemoTxn { account: "Checking", date: "2025-02-06", description: "WHOLE FOODS MARKET", amount: -92.15, category: Some("Food"), notes: None, tags: &[] },
    DemoTxn { account: "Visa", date: "2025-02-12", description: "UBER *TRIP", amount: -31.20, category: None, notes: None, tags: &[] },
    DemoTxn { account: "Visa", date: "2025-02-18", description: "BEST BUY #118", amount: -249.99, category: Some("Shopping"), notes: Some("monitor for office"), tags: &[] },
    DemoTxn { account: "Checking", date: "2025-02-28", description: "INTEREST PAYMENT", amount: 1.84, category: Some("Interest"), notes: None, tags: &[] },
];

const FILTERS: &[(&str, &str, &str)] = &[
    ("food-shops", "Food shops", "cat:Food NOT desc:cafe"),
    ("groceries", "Groceries", "cat:Groceries"),
    ("commute", "Commute", "desc:uber OR desc:lyft"),
    ("large-card", "Large card purchases", "acc:Visa type:debit amt:<-100"),
];

struct DemoRule {
    name: &'static str,
    filter: &'static str,
    category: Option<&'static str>,
    tags: &'static [&'static str],
}

const RULES: &[DemoRule] = &[
    DemoRule { name: "Food shops are groceries", filter: "food-shops", category: Some("Groceries"), tags: &[] },
    DemoRule { name: "Tag groceries", filter: "groceries", category: None, tags: &["Pantry"] },
    DemoRule { name: "Commute", filter: "commute", category: Some("Transport"), tags: &["Work"] },
    DemoRule { name: "Flag large card purchases", filter: "large-card", category: None, tags: &["Reimbursable"] },
];

fn insert_demo_data(conn: &Connection) -> Result<usize> {
    for account in ACCOUNTS {
        add_account(conn, account.name, account.account_type, Some(account.institution))?;
    }
    for tag in TAGS {
        add_tag(conn, tag)?;
    }

    for txn in TRANSACTIONS {
        let account_id = crate::db::account_id(conn, txn.account)?;
        let category_id = match txn.category {
            Some(name) => Some(category_by_name(conn, name)?.id),
            None => None,
        };
        let id = insert_transaction(
            conn,
            &NewTransaction {
                account_id,
                date: txn.date,
                description: txn.description,
                amount: txn.amount,
                category_id,
                notes: txn.notes,
            },
        )?;
        for tag in txn.tags {
            tag_transaction(conn, id, crate::db::tag_by_name(conn, tag)?.id)?;
        }
    }

    // Demo filters use only full dates, so the default options suffice.
    let options = ParseOptions::default();
    for (id, name, expression) in FILTERS {
        add_saved_filter(conn, id, name, expression, &options)?;
    }
    for rule in RULES {
        let tags: Vec<String> = rule.tags.iter().map(|t| t.to_string()).collect();
        add_rule(
            conn,
            &NewRule {
                name: rule.name,
                saved_filter_id: rule.filter,
                set_category: rule.category,
                add_tags: &tags,
            },
        )?;
    }

    Ok(TRANSACTIONS.len())
}

pub fn run() -> Result<()> {
    let (_, conn) = open_db()?;
    init_db(&conn)?;

    // Idempotency guard
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE name = ?1)",
        [ACCOUNTS[0].name],
        |r| r.get(0),
    )?;
    if exists {
        println!("Demo data already loaded (account '{}' exists).", ACCOUNTS[0].name);
        return Ok(());
    }

    let txn_count = insert_demo_data(&conn)?;

    println!("Demo data loaded!");
    println!("  Accounts:      {}", ACCOUNTS.len());
    println!("  Transactions:  {txn_count}");
    println!("  Saved filters: {}", FILTERS.len());
    println!("  Rules:         {}", RULES.len());
    println!();
    println!("Try these next:");
    println!("  tally rules list");
    println!("  tally run");
    println!("  tally run --apply");
    println!("  tally search 'cat:Groceries tag:Pantry'");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::{self, RunMode};
    use crate::db::test_support::test_db;
    use crate::resolver::resolve_rules;
    use crate::store::{RuleSource, Scope, SqliteStore, TransactionSource};

    fn run_rules(conn: &Connection, mode: RunMode) -> categorizer::RunReport {
        let store = SqliteStore::new(conn);
        let rules = store.enabled_rules().unwrap();
        let slots = resolve_rules(&rules, &store, &store, &ParseOptions::default());
        let batch = store.scoped_transactions(&Scope::default()).unwrap();
        categorizer::run(&slots, &batch, mode, &store).unwrap()
    }

    #[test]
    fn test_demo_creates_data() {
        let (_dir, conn) = test_db();
        let txn_count = insert_demo_data(&conn).unwrap();

        let db_txn_count: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0)).unwrap();
        let rule_count: i64 = conn.query_row("SELECT count(*) FROM rules", [], |r| r.get(0)).unwrap();
        assert_eq!(db_txn_count, txn_count as i64);
        assert_eq!(rule_count, RULES.len() as i64);
    }

    #[test]
    fn test_demo_rules_chain_and_settle() {
        let (_dir, conn) = test_db();
        insert_demo_data(&conn).unwrap();

        let preview = run_rules(&conn, RunMode::DryRun);
        assert_eq!(preview.summary.failed_rules, 0);
        // 3 food shops, 3 rides, 1 large card purchase
        assert_eq!(preview.summary.total_modified, 7);
        // The pantry rule only sees groceries because the first rule ran.
        assert_eq!(preview.outcomes[1].matched, 3);

        let applied = run_rules(&conn, RunMode::Apply);
        assert_eq!(applied.summary.total_modified, 7);

        let again = run_rules(&conn, RunMode::DryRun);
        assert_eq!(again.summary.total_modified, 0);
        assert_eq!(again.summary.category_changes, 0);
        assert_eq!(again.summary.tag_changes, 0);
    }

    #[test]
    fn test_demo_idempotent_guard() {
        let (_dir, conn) = test_db();
        insert_demo_data(&conn).unwrap();
        // A second insert would collide on the unique account name.
        assert!(insert_demo_data(&conn).is_err());
    }
}
