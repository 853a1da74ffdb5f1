mod categorizer;
mod cli;
mod db;
mod error;
mod filter;
mod fmt;
mod models;
mod resolver;
mod rules;
mod settings;
mod store;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{
    AccountsCommands, CategoriesCommands, Cli, Commands, FiltersCommands, RulesCommands, TagsCommands,
};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            short_year_century,
        } => cli::init::run(data_dir, short_year_century),
        Commands::Status => cli::status::run(),
        Commands::Demo => cli::demo::run(),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                name,
                account_type,
                institution,
            } => cli::accounts::add(&name, &account_type, institution.as_deref()),
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::Add { name } => cli::categories::add(&name),
            CategoriesCommands::List => cli::categories::list(),
        },
        Commands::Tags { command } => match command {
            TagsCommands::Add { name } => cli::tags::add(&name),
            TagsCommands::List => cli::tags::list(),
        },
        Commands::Filters { command } => match command {
            FiltersCommands::Add { id, expression, name } => {
                cli::filters::add(&id, &expression, name.as_deref())
            }
            FiltersCommands::List => cli::filters::list(),
            FiltersCommands::Delete { id } => cli::filters::delete(&id),
            FiltersCommands::Check { expression, strict } => cli::filters::check(&expression, strict),
        },
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                name,
                filter,
                category,
                tags,
            } => cli::rules::add(&name, &filter, category.as_deref(), &tags),
            RulesCommands::List => cli::rules::list(),
            RulesCommands::Delete { id } => cli::rules::delete(id),
            RulesCommands::Move { id, position } => cli::rules::move_to(id, position),
            RulesCommands::Enable { id } => cli::rules::set_enabled(id, true),
            RulesCommands::Disable { id } => cli::rules::set_enabled(id, false),
        },
        Commands::Run {
            apply,
            account,
            from,
            to,
        } => cli::run::run(apply, &account, from.as_deref(), to.as_deref()),
        Commands::Search { query, account } => cli::search::run(&query, &account),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
