//! Canonical text form of a filter.
//!
//! Output always uses explicit uppercase operators and short field names, and
//! keeps AND groups inside OR (and vice versa) parenthesized so the result
//! strict-parses back to an equivalent tree.

use super::ast::{AmountMatch, DateMatch, Expr, Predicate, Value};

pub fn serialize(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(expr, &mut out);
    out
}

fn write_expr(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Text(term) => write_text(&term.text, true, out),
        Expr::Field(pred) => write_predicate(pred, out),
        Expr::And(a, b) => {
            write_and_operand(a, out);
            out.push_str(" AND ");
            write_and_operand(b, out);
        }
        Expr::Or(a, b) => {
            write_or_operand(a, out);
            out.push_str(" OR ");
            write_or_operand(b, out);
        }
        Expr::Not(inner) => {
            out.push_str("NOT ");
            match inner.as_ref() {
                Expr::And(..) | Expr::Or(..) => write_grouped(inner, out),
                _ => write_expr(inner, out),
            }
        }
    }
}

fn write_and_operand(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Or(..) => write_grouped(expr, out),
        _ => write_expr(expr, out),
    }
}

fn write_or_operand(expr: &Expr, out: &mut String) {
    match expr {
        Expr::And(..) => write_grouped(expr, out),
        _ => write_expr(expr, out),
    }
}

fn write_grouped(expr: &Expr, out: &mut String) {
    out.push('(');
    write_expr(expr, out);
    out.push(')');
}

fn write_predicate(pred: &Predicate, out: &mut String) {
    out.push_str(pred.field.name());
    out.push(':');
    match &pred.value {
        Value::Contains(v) => write_text(v, false, out),
        Value::Amount(m) => out.push_str(&render_amount(*m)),
        Value::Kind(kind) => out.push_str(kind.name()),
        Value::Date(m) => out.push_str(&render_date(m)),
    }
}

fn render_amount(m: AmountMatch) -> String {
    match m {
        AmountMatch::Eq(v) => format!("{v}"),
        AmountMatch::Lt(v) => format!("<{v}"),
        AmountMatch::Le(v) => format!("<={v}"),
        AmountMatch::Gt(v) => format!(">{v}"),
        AmountMatch::Ge(v) => format!(">={v}"),
        AmountMatch::Between(lo, hi) => format!("{lo}..{hi}"),
    }
}

fn render_date(m: &DateMatch) -> String {
    match m {
        DateMatch::On(p) => p.render(),
        DateMatch::Between(a, b) => format!("{}..{}", a.render(), b.render()),
    }
}

fn needs_quotes(text: &str, bare_term: bool) -> bool {
    if text.is_empty() {
        return true;
    }
    if bare_term && matches!(text, "AND" | "OR" | "NOT") {
        return true;
    }
    text.chars().any(|c| {
        c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\\') || (bare_term && c == ':')
    })
}

fn write_text(text: &str, bare_term: bool, out: &mut String) {
    if !needs_quotes(text, bare_term) {
        out.push_str(text);
        return;
    }
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{parse_permissive, parse_strict};

    fn canonical(text: &str) -> String {
        serialize(&parse_permissive(text).unwrap())
    }

    fn assert_fixed_point(text: &str) {
        let once = serialize(&parse_strict(text).unwrap());
        let twice = serialize(&parse_strict(&once).unwrap());
        assert_eq!(once, twice, "not a fixed point for {text:?}");
    }

    #[test]
    fn test_uppercase_explicit_operators() {
        assert_eq!(canonical("cat:Food amt:>50"), "cat:Food AND amt:>50");
        assert_eq!(canonical("category:Food OR description:uber"), "cat:Food OR desc:uber");
    }

    #[test]
    fn test_minimal_parentheses() {
        assert_eq!(
            canonical("((cat:Food OR cat:Transport)) AND (amt:>50)"),
            "(cat:Food OR cat:Transport) AND amt:>50"
        );
        assert_eq!(canonical("(a AND b) AND c"), "a AND b AND c");
        assert_eq!(canonical("NOT (a OR b)"), "NOT (a OR b)");
        assert_eq!(canonical("NOT a b"), "NOT a AND b");
    }

    #[test]
    fn test_permissive_mix_serializes_strict_safe() {
        let out = canonical("a OR b AND c");
        assert_eq!(out, "a OR (b AND c)");
        assert!(parse_strict(&out).is_ok());
    }

    #[test]
    fn test_quoting() {
        assert_eq!(canonical("desc:\"Whole Foods\""), "desc:\"Whole Foods\"");
        assert_eq!(canonical("\"coffee and tea\""), "\"coffee and tea\"");
        assert_eq!(canonical("\"AND\""), "\"AND\"");
        assert_eq!(canonical("\"a:b\""), "\"a:b\"");
        assert_eq!(canonical(r#"note:"say \"hi\"""#), r#"note:"say \"hi\"""#);
        assert_eq!(canonical("cat:AND"), "cat:AND");
    }

    #[test]
    fn test_value_normalization() {
        assert_eq!(canonical("amt:-50.00"), "amt:-50");
        assert_eq!(canonical("amt:=12.5"), "amt:12.5");
        assert_eq!(canonical("amt:-100..-20"), "amt:-100..-20");
        assert_eq!(canonical("type:DEBIT"), "type:debit");
        assert_eq!(canonical("date:2025-01..2025-03"), "date:2025-01..2025-03");
        assert_eq!(canonical("date:2025-01-05"), "date:2025-01-05");
    }

    #[test]
    fn test_round_trip_fixed_points() {
        for text in [
            "cat:Food",
            "cat:Food amt:>50",
            "(cat:Food OR cat:Transport) AND amt:>50",
            "NOT cat:Food AND tag:Work",
            "NOT NOT (a OR b)",
            "coffee and tea",
            "desc:\"PROPERTY MGMT\" OR (type:credit date:2025-01..2025-06)",
            "a OR (b c) OR NOT (d OR e)",
            "\"AND\" \"x:y\" note:\"back\\\\slash\"",
            "amt:<=-0.5 amt:>=-100",
        ] {
            assert_fixed_point(text);
        }
    }

    mod generated {
        use chrono::NaiveDate;
        use proptest::prelude::*;

        use crate::filter::ast::{AmountMatch, DateMatch, DatePoint, Expr, Field, TxnKind, Value};
        use crate::filter::{parse_strict, serialize};

        fn word() -> impl Strategy<Value = String> {
            "[a-zA-Z][a-zA-Z0-9 :\"\\\\()]{0,6}"
        }

        fn cents() -> impl Strategy<Value = f64> {
            (-1_000_000i64..1_000_000).prop_map(|c| c as f64 / 100.0)
        }

        fn amount() -> impl Strategy<Value = AmountMatch> {
            prop_oneof![
                cents().prop_map(AmountMatch::Eq),
                cents().prop_map(AmountMatch::Lt),
                cents().prop_map(AmountMatch::Le),
                cents().prop_map(AmountMatch::Gt),
                cents().prop_map(AmountMatch::Ge),
                (cents(), cents()).prop_map(|(a, b)| AmountMatch::Between(a.min(b), a.max(b))),
            ]
        }

        fn date_point() -> impl Strategy<Value = DatePoint> {
            prop_oneof![
                (2000i32..2030, 1u32..=12, 1u32..=28).prop_filter_map("valid day", |(y, m, d)| {
                    NaiveDate::from_ymd_opt(y, m, d).map(DatePoint::Day)
                }),
                (0i32..=9999, 1u32..=12).prop_map(|(year, month)| DatePoint::Month { year, month }),
            ]
        }

        fn date() -> impl Strategy<Value = DateMatch> {
            prop_oneof![
                date_point().prop_map(DateMatch::On),
                (date_point(), date_point()).prop_map(|(a, b)| {
                    if a.first_day() <= b.first_day() {
                        DateMatch::Between(a, b)
                    } else {
                        DateMatch::Between(b, a)
                    }
                }),
            ]
        }

        fn leaf() -> impl Strategy<Value = Expr> {
            let text_field = prop_oneof![
                Just(Field::Description),
                Just(Field::Category),
                Just(Field::Note),
                Just(Field::Account),
                Just(Field::Tag),
            ];
            prop_oneof![
                word().prop_map(Expr::text),
                (text_field, word()).prop_map(|(f, v)| Expr::field(f, Value::Contains(v))),
                amount().prop_map(|m| Expr::field(Field::Amount, Value::Amount(m))),
                prop_oneof![Just(TxnKind::Debit), Just(TxnKind::Credit)]
                    .prop_map(|k| Expr::field(Field::Type, Value::Kind(k))),
                date().prop_map(|d| Expr::field(Field::Date, Value::Date(d))),
            ]
        }

        fn expr() -> impl Strategy<Value = Expr> {
            leaf().prop_recursive(5, 32, 2, |inner| {
                prop_oneof![
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::and(a, b)),
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::or(a, b)),
                    inner.prop_map(Expr::not),
                ]
            })
        }

        proptest! {
            #[test]
            fn serialized_trees_strict_parse_to_a_fixed_point(tree in expr()) {
                let text = serialize(&tree);
                let parsed = parse_strict(&text);
                prop_assert!(parsed.is_ok(), "{text:?} did not strict-parse: {parsed:?}");
                let parsed = parsed.unwrap();

                let again = serialize(&parsed);
                prop_assert_eq!(&again, &text);
                prop_assert_eq!(parse_strict(&again).unwrap(), parsed);
            }
        }
    }
}
