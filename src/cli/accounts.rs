use comfy_table::{Cell, Table};

use crate::db::{add_account, list_accounts};
use crate::error::Result;

use super::open_db;

pub fn add(name: &str, account_type: &str, institution: Option<&str>) -> Result<()> {
    let (_, conn) = open_db()?;
    add_account(&conn, name, account_type, institution)?;
    println!("Added account: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, conn) = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Institution"]);
    for account in list_accounts(&conn)? {
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(account.name),
            Cell::new(account.account_type),
            Cell::new(account.institution.unwrap_or_default()),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
