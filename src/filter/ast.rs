//! Expression tree for transaction filters.
//!
//! Trees are built by the parser and never mutated afterwards; helpers such
//! as [`mark_text_metadata`] return a new tree.

use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Bare or quoted word with no field prefix.
    Text(TextTerm),
    /// `field:value`
    Field(Predicate),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextTerm {
    pub text: String,
    pub scope: TextScope,
}

/// Which columns a bare text term searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextScope {
    /// Description only.
    Description,
    /// Description, notes and tag names.
    Metadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: Field,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Description,
    Category,
    Note,
    Account,
    Tag,
    Amount,
    Type,
    Date,
}

impl Field {
    /// Resolve a field prefix, accepting the short and long spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "desc" | "description" => Some(Field::Description),
            "cat" | "category" => Some(Field::Category),
            "note" | "notes" => Some(Field::Note),
            "acc" | "account" => Some(Field::Account),
            "tag" | "tags" => Some(Field::Tag),
            "amt" | "amount" => Some(Field::Amount),
            "type" => Some(Field::Type),
            "date" => Some(Field::Date),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Field::Description => "desc",
            Field::Category => "cat",
            Field::Note => "note",
            Field::Account => "acc",
            Field::Tag => "tag",
            Field::Amount => "amt",
            Field::Type => "type",
            Field::Date => "date",
        }
    }
}

/// Typed predicate value. The variant carries the comparison operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Case-insensitive containment, used by the text-valued fields.
    Contains(String),
    Amount(AmountMatch),
    Kind(TxnKind),
    Date(DateMatch),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountMatch {
    Eq(f64),
    Lt(f64),
    Le(f64),
    Gt(f64),
    Ge(f64),
    /// Inclusive on both ends.
    Between(f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnKind {
    Debit,
    Credit,
}

impl TxnKind {
    pub fn name(&self) -> &'static str {
        match self {
            TxnKind::Debit => "debit",
            TxnKind::Credit => "credit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePoint {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
}

impl DatePoint {
    pub fn first_day(&self) -> Option<NaiveDate> {
        match *self {
            DatePoint::Day(d) => Some(d),
            DatePoint::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
        }
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        match *self {
            DatePoint::Day(d) => Some(d),
            DatePoint::Month { year, month } => {
                let (next_year, next_month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
            }
        }
    }

    pub fn render(&self) -> String {
        match *self {
            DatePoint::Day(d) => format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()),
            DatePoint::Month { year, month } => format!("{year:04}-{month:02}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMatch {
    On(DatePoint),
    /// Inclusive: from the first day of the start through the last day of the end.
    Between(DatePoint, DatePoint),
}

impl DateMatch {
    /// Inclusive bounds covered by this match.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            DateMatch::On(p) => Some((p.first_day()?, p.last_day()?)),
            DateMatch::Between(a, b) => Some((a.first_day()?, b.last_day()?)),
        }
    }
}

impl Expr {
    pub fn text(text: impl Into<String>) -> Self {
        Expr::Text(TextTerm {
            text: text.into(),
            scope: TextScope::Description,
        })
    }

    pub fn field(field: Field, value: Value) -> Self {
        Expr::Field(Predicate { field, value })
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Self {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Self {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn not(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }
}

/// True when any node of the tree is a field predicate.
pub fn contains_field_predicate(expr: &Expr) -> bool {
    match expr {
        Expr::Text(_) => false,
        Expr::Field(_) => true,
        Expr::And(a, b) | Expr::Or(a, b) => contains_field_predicate(a) || contains_field_predicate(b),
        Expr::Not(inner) => contains_field_predicate(inner),
    }
}

/// Copy of `expr` whose bare text terms also search notes and tag names.
pub fn mark_text_metadata(expr: &Expr) -> Expr {
    match expr {
        Expr::Text(term) => Expr::Text(TextTerm {
            text: term.text.clone(),
            scope: TextScope::Metadata,
        }),
        Expr::Field(p) => Expr::Field(p.clone()),
        Expr::And(a, b) => Expr::and(mark_text_metadata(a), mark_text_metadata(b)),
        Expr::Or(a, b) => Expr::or(mark_text_metadata(a), mark_text_metadata(b)),
        Expr::Not(inner) => Expr::not(mark_text_metadata(inner)),
    }
}

/// Treat the whole input as one description search. Callers use this when a
/// free-typed filter does not parse.
pub fn fallback_plain_text(raw: &str) -> Expr {
    Expr::text(raw.trim())
}
