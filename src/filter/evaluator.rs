use chrono::NaiveDate;

use super::ast::{AmountMatch, DateMatch, Expr, Field, Predicate, TextScope, TxnKind, Value};

/// Cent tolerance for `amt:` equality.
const AMOUNT_EPSILON: f64 = 0.005;

/// Borrowed view of the columns a filter can look at.
#[derive(Debug, Clone, Default)]
pub struct MatchRecord<'a> {
    pub description: &'a str,
    pub category: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub account: &'a str,
    /// ISO `YYYY-MM-DD`.
    pub date: &'a str,
    pub amount: f64,
    pub tags: Vec<&'a str>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn evaluate(expr: &Expr, row: &MatchRecord) -> bool {
    match expr {
        Expr::Text(term) => {
            if contains_ci(row.description, &term.text) {
                return true;
            }
            term.scope == TextScope::Metadata
                && (row.notes.is_some_and(|n| contains_ci(n, &term.text))
                    || row.tags.iter().any(|t| contains_ci(t, &term.text)))
        }
        Expr::Field(pred) => evaluate_predicate(pred, row),
        Expr::And(a, b) => evaluate(a, row) && evaluate(b, row),
        Expr::Or(a, b) => evaluate(a, row) || evaluate(b, row),
        Expr::Not(inner) => !evaluate(inner, row),
    }
}

fn evaluate_predicate(pred: &Predicate, row: &MatchRecord) -> bool {
    match (&pred.field, &pred.value) {
        (Field::Description, Value::Contains(v)) => contains_ci(row.description, v),
        (Field::Note, Value::Contains(v)) => row.notes.is_some_and(|n| contains_ci(n, v)),
        (Field::Account, Value::Contains(v)) => contains_ci(row.account, v),
        (Field::Category, Value::Contains(v)) => row.category.is_some_and(|c| contains_ci(c, v)),
        (Field::Tag, Value::Contains(v)) => row.tags.iter().any(|t| contains_ci(t, v)),
        (Field::Amount, Value::Amount(m)) => amount_matches(*m, row.amount),
        (Field::Type, Value::Kind(kind)) => match kind {
            TxnKind::Debit => row.amount < 0.0,
            TxnKind::Credit => row.amount >= 0.0,
        },
        (Field::Date, Value::Date(m)) => date_matches(m, row.date),
        // The parser never pairs a field with another value kind.
        _ => false,
    }
}

fn amount_matches(m: AmountMatch, amount: f64) -> bool {
    match m {
        AmountMatch::Eq(v) => (amount - v).abs() < AMOUNT_EPSILON,
        AmountMatch::Lt(v) => amount < v,
        AmountMatch::Le(v) => amount <= v,
        AmountMatch::Gt(v) => amount > v,
        AmountMatch::Ge(v) => amount >= v,
        AmountMatch::Between(lo, hi) => amount >= lo && amount <= hi,
    }
}

fn date_matches(m: &DateMatch, raw: &str) -> bool {
    let Some(day) = raw.get(..10).and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()) else {
        return false;
    };
    match m.bounds() {
        Some((from, to)) => day >= from && day <= to,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{mark_text_metadata, parse_permissive};

    fn row<'a>() -> MatchRecord<'a> {
        MatchRecord {
            description: "WHOLE FOODS MARKET #123",
            category: Some("Groceries"),
            notes: Some("weekly shop"),
            account: "Visa Rewards",
            date: "2025-02-14",
            amount: -82.40,
            tags: vec!["Pantry", "Household"],
        }
    }

    fn matches(query: &str, record: &MatchRecord) -> bool {
        evaluate(&parse_permissive(query).unwrap(), record)
    }

    #[test]
    fn test_keyword_case_sensitivity() {
        let mut r = row();
        r.description = "coffee and tea";
        assert!(matches("coffee and tea", &r));
        r.description = "coffee tea";
        assert!(!matches("coffee and tea", &r));
    }

    #[test]
    fn test_text_fields_are_case_insensitive_substrings() {
        let r = row();
        assert!(matches("desc:whole", &r));
        assert!(matches("acc:visa", &r));
        assert!(matches("note:WEEKLY", &r));
        assert!(matches("cat:grocer", &r));
        assert!(matches("tag:pan", &r));
        assert!(!matches("tag:Work", &r));
        assert!(!matches("desc:target", &r));
    }

    #[test]
    fn test_missing_category_and_notes_never_match() {
        let mut r = row();
        r.category = None;
        r.notes = None;
        assert!(!matches("cat:Groceries", &r));
        assert!(!matches("note:weekly", &r));
        assert!(matches("NOT cat:Groceries", &r));
    }

    #[test]
    fn test_amount_comparisons() {
        let r = row();
        assert!(matches("amt:-82.40", &r));
        assert!(matches("amt:<-50", &r));
        assert!(!matches("amt:>-50", &r));
        assert!(matches("amt:-100..-80", &r));
        assert!(matches("amt:-82.4..0", &r));
        assert!(!matches("amt:0..100", &r));
    }

    #[test]
    fn test_type_by_sign() {
        let mut r = row();
        assert!(matches("type:debit", &r));
        r.amount = 0.0;
        assert!(matches("type:credit", &r));
        assert!(!matches("type:debit", &r));
    }

    #[test]
    fn test_month_range_is_inclusive() {
        let mut r = row();
        for (date, expected) in [
            ("2025-01-01", true),
            ("2025-03-31", true),
            ("2024-12-31", false),
            ("2025-04-01", false),
        ] {
            r.date = date;
            assert_eq!(matches("date:2025-01..2025-03", &r), expected, "{date}");
        }
    }

    #[test]
    fn test_single_month_and_day() {
        let r = row();
        assert!(matches("date:2025-02", &r));
        assert!(matches("date:2025-02-14", &r));
        assert!(!matches("date:2025-02-15", &r));
    }

    #[test]
    fn test_unparseable_row_date() {
        let mut r = row();
        r.date = "14/02/2025";
        assert!(!matches("date:2025-02", &r));
    }

    #[test]
    fn test_metadata_scope_widens_bare_terms() {
        let r = row();
        let expr = parse_permissive("household").unwrap();
        assert!(!evaluate(&expr, &r));
        assert!(evaluate(&mark_text_metadata(&expr), &r));

        let notes = parse_permissive("weekly").unwrap();
        assert!(evaluate(&mark_text_metadata(&notes), &r));
    }
}
