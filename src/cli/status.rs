use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    match settings.short_year_century {
        Some(century) => println!("YY-MM:      {century} + YY"),
        None => println!("YY-MM:      (disabled)"),
    }

    if db_path.exists() {
        let conn = get_connection(&db_path)?;

        let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
        let transactions: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        let uncategorized: i64 = conn.query_row(
            "SELECT count(*) FROM transactions WHERE category_id IS NULL",
            [],
            |r| r.get(0),
        )?;
        let filters: i64 = conn.query_row("SELECT count(*) FROM saved_filters", [], |r| r.get(0))?;
        let rules: i64 = conn.query_row("SELECT count(*) FROM rules", [], |r| r.get(0))?;
        let enabled: i64 =
            conn.query_row("SELECT count(*) FROM rules WHERE is_enabled = 1", [], |r| r.get(0))?;

        println!();
        println!("Accounts:       {accounts}");
        println!("Transactions:   {transactions}");
        println!("Uncategorized:  {uncategorized}");
        println!("Saved filters:  {filters}");
        println!("Rules:          {rules} ({enabled} enabled)");
    } else {
        println!();
        println!("Database not found. Run `tally init` to set up.");
    }

    Ok(())
}
