use std::collections::BTreeMap;

use crate::filter::MatchRecord;

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: String,
    pub institution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedFilter {
    /// Lowercase lookup key.
    pub id: String,
    pub name: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: i64,
    pub name: String,
    pub saved_filter_id: String,
    pub set_category: Option<CategoryRef>,
    /// Stored encoding of the add-tag set, e.g. `[3,7]` or `3,7`.
    pub add_tag_ids: String,
    /// Dense 1..N across all rules.
    pub sort_order: i64,
    pub is_enabled: bool,
}

/// Snapshot of one transaction as the rule engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: i64,
    pub account_id: i64,
    pub account_name: String,
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub category: Option<CategoryRef>,
    pub notes: Option<String>,
    /// Tag id -> tag name.
    pub tags: BTreeMap<i64, String>,
}

impl TransactionRecord {
    pub fn match_record(&self) -> MatchRecord<'_> {
        MatchRecord {
            description: &self.description,
            category: self.category.as_ref().map(|c| c.name.as_str()),
            notes: self.notes.as_deref(),
            account: &self.account_name,
            date: &self.date,
            amount: self.amount,
            tags: self.tags.values().map(String::as_str).collect(),
        }
    }
}

/// Input for inserting a transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction<'a> {
    pub account_id: i64,
    pub date: &'a str,
    pub description: &'a str,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub notes: Option<&'a str>,
}
