//! Recursive-descent parser. Precedence, loosest first: OR, AND (explicit or
//! implicit), NOT, atom.

use chrono::NaiveDate;

use super::ast::{AmountMatch, DateMatch, DatePoint, Expr, Field, TxnKind, Value};
use super::error::ParseError;
use super::lexer::{tokenize, Spanned, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Permissive,
    /// Additionally rejects AND mixed with OR at one nesting level.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOptions {
    /// Century added to two-digit years in `date:YY-MM`, e.g. 2000.
    /// When unset, two-digit years are rejected.
    pub short_year_century: Option<i32>,
}

#[cfg_attr(not(test), allow(dead_code))]
pub fn parse_permissive(text: &str) -> Result<Expr, ParseError> {
    parse_with(text, Mode::Permissive, &ParseOptions::default())
}

#[cfg_attr(not(test), allow(dead_code))]
pub fn parse_strict(text: &str) -> Result<Expr, ParseError> {
    parse_with(text, Mode::Strict, &ParseOptions::default())
}

/// Deepest allowed nesting of `(` and `NOT`.
pub const MAX_NESTING: usize = 256;
/// Tallest allowed expression tree; long AND/OR chains count one level per operator.
pub const MAX_HEIGHT: usize = 1024;

pub fn parse_with(text: &str, mode: Mode, options: &ParseOptions) -> Result<Expr, ParseError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
        mode,
        options,
    };
    let (expr, _) = parser.parse_or()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(ParseError::Unexpected {
            found: extra.token.describe(),
            offset: extra.offset,
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Open `(` and `NOT` around the current position.
    nesting: usize,
    mode: Mode,
    options: &'a ParseOptions,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn next(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.offset)
            .unwrap_or(0)
    }

    fn previous_description(&self) -> String {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|s| s.token.describe())
            .unwrap_or_else(|| "start".to_string())
    }

    fn enter(&mut self, offset: usize) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(ParseError::TooDeep(offset));
        }
        Ok(())
    }

    fn check_height(&self, height: usize) -> Result<(), ParseError> {
        if height > MAX_HEIGHT {
            return Err(ParseError::TooDeep(self.offset()));
        }
        Ok(())
    }

    /// Returns the expression and its tree height.
    fn parse_or(&mut self) -> Result<(Expr, usize), ParseError> {
        let (mut expr, factors, mut height) = self.parse_and()?;
        let mut has_and = factors > 1;
        let mut has_or = false;

        while let Some(Token::Or) = self.peek() {
            self.next();
            let (rhs, factors, rhs_height) = self.parse_and()?;
            has_and |= factors > 1;
            has_or = true;
            expr = Expr::or(expr, rhs);
            height = height.max(rhs_height) + 1;
            self.check_height(height)?;
        }

        if self.mode == Mode::Strict && has_and && has_or {
            return Err(ParseError::AmbiguousMix);
        }
        Ok((expr, height))
    }

    /// Returns the expression, how many factors were joined at this level,
    /// and the tree height.
    fn parse_and(&mut self) -> Result<(Expr, usize, usize), ParseError> {
        let (mut expr, mut height) = self.parse_not()?;
        let mut factors = 1;

        loop {
            match self.peek() {
                None | Some(Token::Or) | Some(Token::RParen) => break,
                Some(Token::And) => {
                    self.next();
                }
                // Adjacent terms: implicit AND.
                Some(_) => {}
            }
            let (rhs, rhs_height) = self.parse_not()?;
            expr = Expr::and(expr, rhs);
            factors += 1;
            height = height.max(rhs_height) + 1;
            self.check_height(height)?;
        }

        Ok((expr, factors, height))
    }

    fn parse_not(&mut self) -> Result<(Expr, usize), ParseError> {
        if let Some(Token::Not) = self.peek() {
            let offset = self.offset();
            self.next();
            self.enter(offset)?;
            let (inner, height) = self.parse_not()?;
            self.nesting -= 1;
            self.check_height(height + 1)?;
            return Ok((Expr::not(inner), height + 1));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<(Expr, usize), ParseError> {
        let Some(Spanned { token, offset }) = self.next() else {
            return Err(ParseError::UnexpectedEnd(self.previous_description()));
        };
        match token {
            Token::LParen => {
                self.enter(offset)?;
                let inner = self.parse_or()?;
                self.nesting -= 1;
                match self.next() {
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => Ok(inner),
                    _ => Err(ParseError::UnclosedParen(offset)),
                }
            }
            Token::Word(text) => Ok((Expr::text(text), 1)),
            Token::Field { name, value } => Ok((self.predicate(&name, &value)?, 1)),
            other => Err(ParseError::Unexpected {
                found: other.describe(),
                offset,
            }),
        }
    }

    fn predicate(&self, name: &str, raw: &str) -> Result<Expr, ParseError> {
        let field = Field::from_name(name).ok_or_else(|| ParseError::UnknownField(name.to_string()))?;
        let value = match field {
            Field::Description | Field::Category | Field::Note | Field::Account | Field::Tag => {
                Value::Contains(raw.to_string())
            }
            Field::Amount => Value::Amount(parse_amount(raw)?),
            Field::Type => Value::Kind(parse_kind(raw)?),
            Field::Date => Value::Date(parse_date(raw, self.options)?),
        };
        Ok(Expr::field(field, value))
    }
}

fn invalid(field: Field, value: &str, reason: impl Into<String>) -> ParseError {
    ParseError::InvalidValue {
        field: field.name().to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_number(raw: &str, whole: &str) -> Result<f64, ParseError> {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(invalid(Field::Amount, whole, "expected a number")),
    }
}

fn parse_amount(raw: &str) -> Result<AmountMatch, ParseError> {
    if let Some((lo, hi)) = raw.split_once("..") {
        let lo = parse_number(lo, raw)?;
        let hi = parse_number(hi, raw)?;
        if lo > hi {
            return Err(invalid(Field::Amount, raw, "range start is greater than its end"));
        }
        return Ok(AmountMatch::Between(lo, hi));
    }
    let ops: [(&str, fn(f64) -> AmountMatch); 5] = [
        ("<=", AmountMatch::Le),
        (">=", AmountMatch::Ge),
        ("<", AmountMatch::Lt),
        (">", AmountMatch::Gt),
        ("=", AmountMatch::Eq),
    ];
    for (prefix, build) in ops {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return Ok(build(parse_number(rest, raw)?));
        }
    }
    Ok(AmountMatch::Eq(parse_number(raw, raw)?))
}

fn parse_kind(raw: &str) -> Result<TxnKind, ParseError> {
    match raw.to_lowercase().as_str() {
        "debit" => Ok(TxnKind::Debit),
        "credit" => Ok(TxnKind::Credit),
        _ => Err(invalid(Field::Type, raw, "expected debit or credit")),
    }
}

fn parse_date(raw: &str, options: &ParseOptions) -> Result<DateMatch, ParseError> {
    if let Some((start, end)) = raw.split_once("..") {
        let start = parse_date_point(start, raw, options)?;
        let end = parse_date_point(end, raw, options)?;
        if start.first_day() > end.last_day() {
            return Err(invalid(Field::Date, raw, "range start is after its end"));
        }
        return Ok(DateMatch::Between(start, end));
    }
    Ok(DateMatch::On(parse_date_point(raw, raw, options)?))
}

fn parse_date_point(part: &str, whole: &str, options: &ParseOptions) -> Result<DatePoint, ParseError> {
    let pieces: Vec<&str> = part.split('-').collect();
    let all_digits = pieces
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if !all_digits {
        return Err(invalid(Field::Date, whole, "expected YYYY-MM-DD, YYYY-MM or YY-MM"));
    }

    match pieces.as_slice() {
        [y, m, d] if y.len() == 4 && m.len() == 2 && d.len() == 2 => {
            NaiveDate::parse_from_str(part, "%Y-%m-%d")
                .map(DatePoint::Day)
                .map_err(|_| invalid(Field::Date, whole, "no such calendar day"))
        }
        [y, m] if y.len() == 4 && m.len() == 2 => {
            let year: i32 = y.parse().map_err(|_| invalid(Field::Date, whole, "bad year"))?;
            month_point(year, m, whole)
        }
        [y, m] if y.len() == 2 && m.len() == 2 => {
            let century = options.short_year_century.ok_or_else(|| {
                invalid(
                    Field::Date,
                    whole,
                    "two-digit years need the short_year_century setting; use YYYY-MM",
                )
            })?;
            let short: i32 = y.parse().map_err(|_| invalid(Field::Date, whole, "bad year"))?;
            let year = century
                .checked_add(short)
                .ok_or_else(|| invalid(Field::Date, whole, "year must be 0000-9999"))?;
            month_point(year, m, whole)
        }
        _ => Err(invalid(Field::Date, whole, "expected YYYY-MM-DD, YYYY-MM or YY-MM")),
    }
}

fn month_point(year: i32, month: &str, whole: &str) -> Result<DatePoint, ParseError> {
    if !(0..=9999).contains(&year) {
        return Err(invalid(Field::Date, whole, "year must be 0000-9999"));
    }
    let month: u32 = month
        .parse()
        .map_err(|_| invalid(Field::Date, whole, "bad month"))?;
    if !(1..=12).contains(&month) {
        return Err(invalid(Field::Date, whole, "month must be 01-12"));
    }
    Ok(DatePoint::Month { year, month })
}
