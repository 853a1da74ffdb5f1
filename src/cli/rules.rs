use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::resolver::decode_tag_ids;
use crate::rules::{add_rule, delete_rule, get_rule, list_rules, move_rule, set_rule_enabled, NewRule};
use crate::store::{SqliteStore, TagLookup};

use super::open_db;

pub fn add(name: &str, filter: &str, category: Option<&str>, tags: &[String]) -> Result<()> {
    let (_, conn) = open_db()?;
    let rule = add_rule(
        &conn,
        &NewRule {
            name,
            saved_filter_id: filter,
            set_category: category,
            add_tags: tags,
        },
    )?;
    println!("Added rule {} at position {}: '{}'", rule.id, rule.sort_order, rule.name);
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, conn) = open_db()?;
    let store = SqliteStore::new(&conn);

    let mut table = Table::new();
    table.set_header(vec!["#", "ID", "Name", "Filter", "Set Category", "Add Tags", "Enabled"]);
    for rule in list_rules(&conn)? {
        let tags = match decode_tag_ids(&rule.add_tag_ids) {
            Ok(ids) => {
                let mut names = Vec::new();
                for id in ids {
                    names.push(store.tag_name(id)?.unwrap_or_else(|| format!("#{id}?")));
                }
                names.join(", ")
            }
            Err(_) => rule.add_tag_ids.clone(),
        };
        let enabled = if rule.is_enabled {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        };
        table.add_row(vec![
            Cell::new(rule.sort_order),
            Cell::new(rule.id),
            Cell::new(rule.name),
            Cell::new(rule.saved_filter_id),
            Cell::new(rule.set_category.map(|c| c.name).unwrap_or_default()),
            Cell::new(tags),
            Cell::new(enabled),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let (_, conn) = open_db()?;
    let rule = delete_rule(&conn, id)?;
    println!("Deleted rule {id}: '{}'", rule.name);
    Ok(())
}

pub fn move_to(id: i64, position: usize) -> Result<()> {
    let (_, conn) = open_db()?;
    move_rule(&conn, id, position)?;
    let rule = get_rule(&conn, id)?;
    println!("Moved rule {id} to position {}", rule.sort_order);
    Ok(())
}

pub fn set_enabled(id: i64, enabled: bool) -> Result<()> {
    let (_, conn) = open_db()?;
    set_rule_enabled(&conn, id, enabled)?;
    println!("{} rule {id}", if enabled { "Enabled" } else { "Disabled" });
    Ok(())
}
