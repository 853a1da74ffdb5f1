//! Ordered rule application over a batch of transactions.
//!
//! Each transaction is processed independently. Rules run in ascending sort
//! order, and every rule is evaluated against the category and tags left by
//! the rules before it in the same pass, so reordering rules can change the
//! result.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::filter::{evaluate, MatchRecord};
use crate::models::{CategoryRef, TransactionRecord};
use crate::resolver::RuleSlot;
use crate::store::ApplyWriter;

/// How many example transactions each outcome keeps for previews.
pub const SAMPLE_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    DryRun,
    Apply,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeSample {
    pub transaction_id: i64,
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub category_before: Option<String>,
    pub category_after: Option<String>,
    pub tags_added: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub rule_id: i64,
    pub rule_name: String,
    pub filter_text: String,
    /// Set when the rule could not be resolved; counts stay zero.
    pub error: Option<String>,
    pub matched: usize,
    pub category_changes: usize,
    pub tag_changes: usize,
    pub samples: Vec<OutcomeSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub transactions_scoped: usize,
    pub total_modified: usize,
    pub category_changes: usize,
    pub tag_changes: usize,
    pub failed_rules: usize,
}

/// Net change for one transaction after all rules ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnChange {
    pub transaction_id: i64,
    pub new_category: Option<i64>,
    pub add_tags: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcomes: Vec<RuleOutcome>,
    pub summary: RunSummary,
    pub changes: Vec<TxnChange>,
}

fn working_record<'a>(
    txn: &'a TransactionRecord,
    category: &'a Option<CategoryRef>,
    tags: &'a BTreeMap<i64, String>,
) -> MatchRecord<'a> {
    MatchRecord {
        description: &txn.description,
        category: category.as_ref().map(|c| c.name.as_str()),
        notes: txn.notes.as_deref(),
        account: &txn.account_name,
        date: &txn.date,
        amount: txn.amount,
        tags: tags.values().map(String::as_str).collect(),
    }
}

/// Compute outcomes and net changes without touching storage.
pub fn plan(slots: &[RuleSlot], batch: &[TransactionRecord]) -> RunReport {
    let mut ordered: Vec<&RuleSlot> = slots.iter().collect();
    ordered.sort_by_key(|slot| slot.sort_order);

    let mut outcomes: Vec<RuleOutcome> = ordered
        .iter()
        .map(|slot| RuleOutcome {
            rule_id: slot.rule_id,
            rule_name: slot.name.clone(),
            filter_text: slot.filter_text.clone(),
            error: slot.resolution.as_ref().err().map(|e| e.to_string()),
            matched: 0,
            category_changes: 0,
            tag_changes: 0,
            samples: Vec::new(),
        })
        .collect();

    let mut summary = RunSummary {
        transactions_scoped: batch.len(),
        failed_rules: ordered.iter().filter(|s| s.resolution.is_err()).count(),
        ..RunSummary::default()
    };
    let mut changes = Vec::new();

    for txn in batch {
        let mut category = txn.category.clone();
        let mut tags = txn.tags.clone();

        for (slot, outcome) in ordered.iter().zip(outcomes.iter_mut()) {
            let Ok(rule) = &slot.resolution else {
                continue;
            };
            if !evaluate(&rule.filter, &working_record(txn, &category, &tags)) {
                continue;
            }
            outcome.matched += 1;

            let category_before = category.clone();
            if let Some(target) = &rule.set_category {
                if category.as_ref().map(|c| c.id) != Some(target.id) {
                    category = Some(target.clone());
                    outcome.category_changes += 1;
                }
            }

            let mut tags_added = Vec::new();
            for (id, name) in &rule.add_tags {
                if !tags.contains_key(id) {
                    tags.insert(*id, name.clone());
                    tags_added.push(name.clone());
                }
            }
            outcome.tag_changes += tags_added.len();

            if outcome.samples.len() < SAMPLE_LIMIT {
                outcome.samples.push(OutcomeSample {
                    transaction_id: txn.id,
                    date: txn.date.clone(),
                    description: txn.description.clone(),
                    amount: txn.amount,
                    category_before: category_before.map(|c| c.name),
                    category_after: category.as_ref().map(|c| c.name.clone()),
                    tags_added,
                });
            }
        }

        let original_category = txn.category.as_ref().map(|c| c.id);
        let final_category = category.as_ref().map(|c| c.id);
        let category_changed = final_category != original_category;
        let added: Vec<i64> = tags.keys().filter(|id| !txn.tags.contains_key(id)).copied().collect();

        if category_changed || !added.is_empty() {
            summary.total_modified += 1;
            if category_changed {
                summary.category_changes += 1;
            }
            summary.tag_changes += added.len();
            changes.push(TxnChange {
                transaction_id: txn.id,
                new_category: if category_changed { final_category } else { None },
                add_tags: added,
            });
        }
    }

    for outcome in &outcomes {
        debug!(
            rule = %outcome.rule_name,
            matched = outcome.matched,
            category_changes = outcome.category_changes,
            tag_changes = outcome.tag_changes,
            "rule evaluated"
        );
    }

    RunReport {
        outcomes,
        summary,
        changes,
    }
}

/// Plan the run and, in `Apply` mode, persist every change in one atomic write.
pub fn run(
    slots: &[RuleSlot],
    batch: &[TransactionRecord],
    mode: RunMode,
    writer: &impl ApplyWriter,
) -> Result<RunReport> {
    let report = plan(slots, batch);
    if mode == RunMode::Apply && !report.changes.is_empty() {
        writer.apply_changes(&report.changes)?;
    }
    Ok(report)
}
