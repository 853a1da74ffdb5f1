use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty filter expression")]
    Empty,

    #[error("unterminated quote starting at position {0}")]
    UnterminatedQuote(usize),

    #[error("missing value for field '{0}'")]
    MissingValue(String),

    #[error("unknown field '{0}' (expected desc, cat, note, acc, tag, amt, type or date)")]
    UnknownField(String),

    #[error("invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("unexpected {found} at position {offset}")]
    Unexpected { found: String, offset: usize },

    #[error("unexpected end of filter after {0}")]
    UnexpectedEnd(String),

    #[error("missing ')' for '(' at position {0}")]
    UnclosedParen(usize),

    #[error("filter nests too deeply at position {0}")]
    TooDeep(usize),

    #[error("AND and OR are mixed at the same level; use parentheses to group them")]
    AmbiguousMix,
}
