use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::filter::{parse_with, serialize, Mode};
use crate::rules::{add_saved_filter, delete_saved_filter, list_saved_filters};
use crate::settings::load_settings;

use super::open_db;

pub fn add(id: &str, expression: &str, name: Option<&str>) -> Result<()> {
    let (settings, conn) = open_db()?;
    let saved = add_saved_filter(
        &conn,
        id,
        name.unwrap_or(id),
        expression,
        &settings.parse_options(),
    )?;
    println!("Saved filter '{}': {}", saved.id, saved.expression);
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, conn) = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Expression"]);
    for filter in list_saved_filters(&conn)? {
        table.add_row(vec![
            Cell::new(filter.id),
            Cell::new(filter.name),
            Cell::new(filter.expression),
        ]);
    }
    println!("Saved filters\n{table}");
    Ok(())
}

pub fn delete(id: &str) -> Result<()> {
    let (_, conn) = open_db()?;
    delete_saved_filter(&conn, id)?;
    println!("Deleted saved filter '{}'", id.trim().to_lowercase());
    Ok(())
}

/// Parse without touching the database.
pub fn check(expression: &str, strict: bool) -> Result<()> {
    let settings = load_settings();
    let mode = if strict { Mode::Strict } else { Mode::Permissive };
    let expr = parse_with(expression, mode, &settings.parse_options())?;
    println!("{}", serialize(&expr));
    Ok(())
}
