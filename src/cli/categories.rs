use comfy_table::{Cell, Table};

use crate::db::{add_category, list_categories};
use crate::error::Result;

use super::open_db;

pub fn add(name: &str) -> Result<()> {
    let (_, conn) = open_db()?;
    add_category(&conn, name)?;
    println!("Added category: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, conn) = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for category in list_categories(&conn)? {
        table.add_row(vec![Cell::new(category.id), Cell::new(category.name)]);
    }
    println!("Categories\n{table}");
    Ok(())
}
