//! Boolean filter language over transactions.
//!
//! Examples:
//! - `cat:Food AND amt:<-50`
//! - `cat:Food amt:>50` (implicit AND)
//! - `(desc:uber OR desc:lyft) NOT tag:Personal`
//! - `date:2025-01..2025-03 type:debit`
//! - `coffee` (bare terms search the description)

pub mod ast;
pub mod canonical;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use ast::{contains_field_predicate, fallback_plain_text, mark_text_metadata, Expr};
pub use canonical::serialize;
pub use error::ParseError;
pub use evaluator::{evaluate, MatchRecord};
#[cfg_attr(not(test), allow(unused_imports))]
pub use parser::{parse_permissive, parse_strict, parse_with, Mode, ParseOptions};
