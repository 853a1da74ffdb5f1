use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, TallyError};
use crate::models::{Account, CategoryRef, NewTransaction, Tag};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    account_type TEXT NOT NULL,
    institution TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    is_active INTEGER DEFAULT 1
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    account_id INTEGER NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    category_id INTEGER,
    notes TEXT,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS transaction_tags (
    transaction_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (transaction_id, tag_id),
    FOREIGN KEY (transaction_id) REFERENCES transactions(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS saved_filters (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    expression TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS rules (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    saved_filter_id TEXT NOT NULL,
    set_category_id INTEGER,
    add_tag_ids TEXT NOT NULL DEFAULT '[]',
    sort_order INTEGER NOT NULL,
    is_enabled INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (set_category_id) REFERENCES categories(id)
);
";

const DEFAULT_CATEGORIES: &[&str] = &[
    "Salary",
    "Interest",
    "Refunds",
    "Food",
    "Groceries",
    "Dining Out",
    "Transport",
    "Rent",
    "Utilities",
    "Subscriptions",
    "Health",
    "Entertainment",
    "Travel",
    "Shopping",
    "Transfer",
    "Uncategorized",
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for name in DEFAULT_CATEGORIES {
            conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
        }
    }
    Ok(())
}

pub fn add_account(
    conn: &Connection,
    name: &str,
    account_type: &str,
    institution: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (name, account_type, institution) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, account_type, institution],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare("SELECT id, name, account_type, institution FROM accounts ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Account {
                id: row.get(0)?,
                name: row.get(1)?,
                account_type: row.get(2)?,
                institution: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn account_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM accounts WHERE name = ?1", [name], |r| r.get(0))
        .optional()?
        .ok_or_else(|| TallyError::UnknownAccount(name.to_string()))
}

pub fn add_category(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn list_categories(conn: &Connection) -> Result<Vec<CategoryRef>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories WHERE is_active = 1 ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| Ok(CategoryRef { id: row.get(0)?, name: row.get(1)? }))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn category_by_name(conn: &Connection, name: &str) -> Result<CategoryRef> {
    conn.query_row(
        "SELECT id, name FROM categories WHERE name = ?1",
        [name],
        |row| Ok(CategoryRef { id: row.get(0)?, name: row.get(1)? }),
    )
    .optional()?
    .ok_or_else(|| TallyError::UnknownCategory(name.to_string()))
}

pub fn add_tag(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO tags (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn list_tags(conn: &Connection) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| Ok(Tag { id: row.get(0)?, name: row.get(1)? }))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn tag_by_name(conn: &Connection, name: &str) -> Result<Tag> {
    conn.query_row("SELECT id, name FROM tags WHERE name = ?1", [name], |row| {
        Ok(Tag { id: row.get(0)?, name: row.get(1)? })
    })
    .optional()?
    .ok_or_else(|| TallyError::UnknownTag(name.to_string()))
}

pub fn insert_transaction(conn: &Connection, txn: &NewTransaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (account_id, date, description, amount, category_id, notes) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            txn.account_id,
            txn.date,
            txn.description,
            txn.amount,
            txn.category_id,
            txn.notes
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn tag_transaction(conn: &Connection, transaction_id: i64, tag_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id) VALUES (?1, ?2)",
        [transaction_id, tag_id],
    )?;
    Ok(())
}
