use thiserror::Error;

use crate::filter::ParseError;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] ParseError),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Unknown saved filter: {0}")]
    UnknownFilter(String),

    #[error("Saved filter already exists: {0}")]
    DuplicateFilter(String),

    #[error("No rule with ID {0}")]
    UnknownRule(i64),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;
