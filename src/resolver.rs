//! Binds persisted rules to parsed filters.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::warn;

use crate::filter::{contains_field_predicate, mark_text_metadata, parse_with, Expr, Mode, ParseError, ParseOptions};
use crate::models::{CategoryRef, Rule};
use crate::store::{SavedFilterLookup, TagLookup};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("saved filter not found: {0}")]
    FilterNotFound(String),

    #[error("saved filter invalid: {source}")]
    FilterInvalid { expression: String, source: ParseError },

    #[error("invalid tag list '{raw}': {reason}")]
    TagDecode { raw: String, reason: String },

    #[error("unknown tag id {0}")]
    UnknownTag(i64),

    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// A rule whose filter parsed and whose actions are ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRule {
    pub rule_id: i64,
    pub name: String,
    pub sort_order: i64,
    pub filter_text: String,
    pub filter: Expr,
    pub set_category: Option<CategoryRef>,
    /// Tag id -> tag name.
    pub add_tags: BTreeMap<i64, String>,
}

/// One entry handed to the engine: a rule and the result of resolving it.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSlot {
    pub rule_id: i64,
    pub name: String,
    pub sort_order: i64,
    pub filter_text: String,
    pub resolution: Result<ResolvedRule, ResolutionError>,
}

/// Decode a stored add-tag list. Accepts `[1, 2]` or `1,2`; empty means none.
pub fn decode_tag_ids(raw: &str) -> Result<BTreeSet<i64>, ResolutionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(BTreeSet::new());
    }
    let decode_err = |reason: String| ResolutionError::TagDecode {
        raw: raw.to_string(),
        reason,
    };
    if trimmed.starts_with('[') {
        let ids: Vec<i64> = serde_json::from_str(trimmed).map_err(|e| decode_err(e.to_string()))?;
        return Ok(ids.into_iter().collect());
    }
    trimmed
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<i64>()
                .map_err(|_| decode_err(format!("'{part}' is not an integer")))
        })
        .collect()
}

/// Canonical stored form of a tag id set: a sorted JSON array.
pub fn encode_tag_ids(ids: &BTreeSet<i64>) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Resolve one rule. The slot keeps the saved expression whenever the
/// filter was found, even if a later step failed.
pub fn resolve(
    rule: &Rule,
    filters: &impl SavedFilterLookup,
    tags: &impl TagLookup,
    options: &ParseOptions,
) -> RuleSlot {
    let slot = |filter_text: String, resolution: Result<ResolvedRule, ResolutionError>| RuleSlot {
        rule_id: rule.id,
        name: rule.name.clone(),
        sort_order: rule.sort_order,
        filter_text,
        resolution,
    };

    let saved = match filters.saved_filter(&rule.saved_filter_id) {
        Ok(Some(saved)) => saved,
        Ok(None) => {
            return slot(
                String::new(),
                Err(ResolutionError::FilterNotFound(rule.saved_filter_id.clone())),
            )
        }
        Err(e) => return slot(String::new(), Err(ResolutionError::Lookup(e.to_string()))),
    };
    let filter_text = saved.expression;

    let resolution = bind(rule, &filter_text, tags, options);
    slot(filter_text, resolution)
}

fn bind(
    rule: &Rule,
    expression: &str,
    tags: &impl TagLookup,
    options: &ParseOptions,
) -> Result<ResolvedRule, ResolutionError> {
    let parsed = parse_with(expression, Mode::Strict, options).map_err(|source| {
        ResolutionError::FilterInvalid {
            expression: expression.to_string(),
            source,
        }
    })?;

    let mut add_tags = BTreeMap::new();
    for id in decode_tag_ids(&rule.add_tag_ids)? {
        let name = tags
            .tag_name(id)
            .map_err(|e| ResolutionError::Lookup(e.to_string()))?
            .ok_or(ResolutionError::UnknownTag(id))?;
        add_tags.insert(id, name);
    }

    let filter = if contains_field_predicate(&parsed) {
        parsed
    } else {
        mark_text_metadata(&parsed)
    };

    Ok(ResolvedRule {
        rule_id: rule.id,
        name: rule.name.clone(),
        sort_order: rule.sort_order,
        filter_text: expression.to_string(),
        filter,
        set_category: rule.set_category.clone(),
        add_tags,
    })
}

/// Resolve a batch. A failure only affects its own slot.
pub fn resolve_rules(
    rules: &[Rule],
    filters: &impl SavedFilterLookup,
    tags: &impl TagLookup,
    options: &ParseOptions,
) -> Vec<RuleSlot> {
    rules
        .iter()
        .map(|rule| {
            let slot = resolve(rule, filters, tags, options);
            if let Err(e) = &slot.resolution {
                warn!(rule = %rule.name, error = %e, "rule skipped");
            }
            slot
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::MemoryCatalog;
    use super::*;
    use crate::filter::ast::TextScope;

    fn rule(filter_id: &str, tag_ids: &str) -> Rule {
        Rule {
            id: 1,
            name: "Test rule".to_string(),
            saved_filter_id: filter_id.to_string(),
            set_category: None,
            add_tag_ids: tag_ids.to_string(),
            sort_order: 1,
            is_enabled: true,
        }
    }

    #[test]
    fn test_decode_tag_ids_formats() {
        let expected: BTreeSet<i64> = [2, 5, 9].into_iter().collect();
        assert_eq!(decode_tag_ids("[9, 2, 5, 2]").unwrap(), expected);
        assert_eq!(decode_tag_ids("5,9, 2").unwrap(), expected);
        assert!(decode_tag_ids("").unwrap().is_empty());
        assert!(decode_tag_ids("[]").unwrap().is_empty());
    }

    #[test]
    fn test_decode_tag_ids_rejects_garbage() {
        assert!(matches!(decode_tag_ids("[1, \"x\"]"), Err(ResolutionError::TagDecode { .. })));
        assert!(matches!(decode_tag_ids("1,,2"), Err(ResolutionError::TagDecode { .. })));
        assert!(matches!(decode_tag_ids("[1, 2"), Err(ResolutionError::TagDecode { .. })));
    }

    #[test]
    fn test_encode_is_sorted_json() {
        let ids: BTreeSet<i64> = [7, 3].into_iter().collect();
        assert_eq!(encode_tag_ids(&ids), "[3,7]");
        assert_eq!(decode_tag_ids(&encode_tag_ids(&ids)).unwrap(), ids);
    }

    #[test]
    fn test_resolve_success() {
        let catalog = MemoryCatalog::default()
            .with_filter("Food", "cat:Food amt:<0")
            .with_tag(4, "Pantry");
        let resolved = resolve(&rule("FOOD", "[4]"), &catalog, &catalog, &ParseOptions::default()).resolution.unwrap();
        assert_eq!(resolved.filter_text, "cat:Food amt:<0");
        assert_eq!(resolved.add_tags.get(&4).map(String::as_str), Some("Pantry"));
    }

    #[test]
    fn test_missing_filter() {
        let catalog = MemoryCatalog::default();
        let err = resolve(&rule("nope", ""), &catalog, &catalog, &ParseOptions::default()).resolution.unwrap_err();
        assert_eq!(err, ResolutionError::FilterNotFound("nope".into()));
        assert!(err.to_string().contains("saved filter not found"));
    }

    #[test]
    fn test_invalid_filter_uses_strict_mode() {
        let catalog = MemoryCatalog::default().with_filter("mix", "cat:Food OR cat:Rent amt:<0");
        let err = resolve(&rule("mix", ""), &catalog, &catalog, &ParseOptions::default()).resolution.unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::FilterInvalid {
                source: ParseError::AmbiguousMix,
                ..
            }
        ));
        assert!(err.to_string().contains("saved filter invalid"));
    }

    #[test]
    fn test_unknown_tag_id() {
        let catalog = MemoryCatalog::default().with_filter("food", "cat:Food");
        let err = resolve(&rule("food", "3"), &catalog, &catalog, &ParseOptions::default()).resolution.unwrap_err();
        assert_eq!(err, ResolutionError::UnknownTag(3));
    }

    #[test]
    fn test_text_only_filter_is_marked_metadata() {
        let catalog = MemoryCatalog::default()
            .with_filter("coffee", "coffee")
            .with_filter("coffee-debit", "coffee type:debit");
        let opts = ParseOptions::default();

        let text_only = resolve(&rule("coffee", ""), &catalog, &catalog, &opts).resolution.unwrap();
        let Expr::Text(term) = &text_only.filter else { panic!("expected text term") };
        assert_eq!(term.scope, TextScope::Metadata);

        let with_field = resolve(&rule("coffee-debit", ""), &catalog, &catalog, &opts).resolution.unwrap();
        let Expr::And(lhs, _) = &with_field.filter else { panic!("expected And") };
        let Expr::Text(term) = lhs.as_ref() else { panic!("expected text term") };
        assert_eq!(term.scope, TextScope::Description);
    }

    #[test]
    fn test_resolve_rules_isolates_failures() {
        let catalog = MemoryCatalog::default().with_filter("food", "cat:Food");
        let mut broken = rule("missing", "");
        broken.id = 2;
        let slots = resolve_rules(&[rule("food", ""), broken], &catalog, &catalog, &ParseOptions::default());
        assert_eq!(slots.len(), 2);
        assert!(slots[0].resolution.is_ok());
        assert_eq!(slots[0].filter_text, "cat:Food");
        assert!(slots[1].resolution.is_err());
        assert_eq!(slots[1].rule_id, 2);
    }

    #[test]
    fn test_failed_slot_keeps_found_filter_text() {
        let catalog = MemoryCatalog::default()
            .with_filter("food", "cat:Food")
            .with_filter("mix", "a OR b c");
        let mut unknown_tag = rule("food", "[8]");
        unknown_tag.id = 2;
        let mut bad_tags = rule("food", "[8,");
        bad_tags.id = 3;
        let mut invalid = rule("mix", "");
        invalid.id = 4;

        let slots = resolve_rules(
            &[unknown_tag, bad_tags, invalid, rule("missing", "")],
            &catalog,
            &catalog,
            &ParseOptions::default(),
        );
        assert_eq!(slots[0].resolution, Err(ResolutionError::UnknownTag(8)));
        assert_eq!(slots[0].filter_text, "cat:Food");
        assert!(matches!(slots[1].resolution, Err(ResolutionError::TagDecode { .. })));
        assert_eq!(slots[1].filter_text, "cat:Food");
        assert_eq!(slots[2].filter_text, "a OR b c");
        assert!(slots[3].filter_text.is_empty());
    }
}
