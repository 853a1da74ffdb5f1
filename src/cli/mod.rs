pub mod accounts;
pub mod categories;
pub mod demo;
pub mod filters;
pub mod init;
pub mod rules;
pub mod run;
pub mod search;
pub mod status;
pub mod tags;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{Result, TallyError};
use crate::settings::{load_settings, Settings};

/// Open the configured database, failing if `tally init` has not run yet.
pub(crate) fn open_db() -> Result<(Settings, Connection)> {
    let settings = load_settings();
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(TallyError::Other(
            "No database found. Run `tally init` first.".to_string(),
        ));
    }
    let conn = get_connection(&db_path)?;
    Ok((settings, conn))
}

#[derive(Parser)]
#[command(name = "tally", about = "Filter queries and ordered categorization rules for personal transactions.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Century for two-digit years in date:YY-MM, e.g. 2000
        #[arg(long = "short-year-century")]
        short_year_century: Option<i32>,
    },
    /// Show current database and summary statistics.
    Status,
    /// Load sample accounts, transactions, filters and rules.
    Demo,
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Manage tags.
    Tags {
        #[command(subcommand)]
        command: TagsCommands,
    },
    /// Manage saved filters.
    Filters {
        #[command(subcommand)]
        command: FiltersCommands,
    },
    /// Manage ordered categorization rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Preview (or with --apply, persist) the effect of all enabled rules.
    Run {
        /// Write the changes to the database
        #[arg(long)]
        apply: bool,
        /// Limit to these accounts (repeatable)
        #[arg(long)]
        account: Vec<String>,
        /// First date to include: YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// Last date to include: YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
    },
    /// Search transactions with a filter query.
    Search {
        /// Filter query, e.g. 'cat:Food amt:<-50'
        query: String,
        /// Limit to these accounts (repeatable)
        #[arg(long)]
        account: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        /// Account name, e.g. 'Checking'
        name: String,
        /// Account type: checking, savings, credit_card
        #[arg(long = "type", default_value = "checking")]
        account_type: String,
        /// Institution name
        #[arg(long)]
        institution: Option<String>,
    },
    /// List all accounts.
    List,
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category.
    Add { name: String },
    /// List active categories.
    List,
}

#[derive(Subcommand)]
pub enum TagsCommands {
    /// Add a tag.
    Add { name: String },
    /// List tags.
    List,
}

#[derive(Subcommand)]
pub enum FiltersCommands {
    /// Save a filter expression under an id.
    Add {
        /// Lookup id (stored lowercase)
        id: String,
        /// Filter expression
        expression: String,
        /// Display name (default: the id)
        #[arg(long)]
        name: Option<String>,
    },
    /// List saved filters.
    List,
    /// Delete a saved filter.
    Delete { id: String },
    /// Parse an expression and print its canonical form.
    Check {
        expression: String,
        /// Reject AND/OR mixed without parentheses
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Append a rule that runs a saved filter.
    Add {
        /// Rule name
        name: String,
        /// Saved filter id to match with
        #[arg(long)]
        filter: String,
        /// Category to set on matches
        #[arg(long)]
        category: Option<String>,
        /// Tag to add on matches (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List rules in run order.
    List,
    /// Delete a rule.
    Delete { id: i64 },
    /// Move a rule to a 1-based position.
    Move { id: i64, position: usize },
    /// Enable a rule.
    Enable { id: i64 },
    /// Disable a rule.
    Disable { id: i64 },
}
