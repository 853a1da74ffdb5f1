use comfy_table::{Cell, Table};

use crate::db::{add_tag, list_tags};
use crate::error::Result;

use super::open_db;

pub fn add(name: &str) -> Result<()> {
    let (_, conn) = open_db()?;
    add_tag(&conn, name)?;
    println!("Added tag: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, conn) = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for tag in list_tags(&conn)? {
        table.add_row(vec![Cell::new(tag.id), Cell::new(tag.name)]);
    }
    println!("Tags\n{table}");
    Ok(())
}
