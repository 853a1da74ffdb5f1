use std::iter::Peekable;
use std::str::CharIndices;

use super::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Word(String),
    Field { name: String, value: String },
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
            Token::Not => "NOT".to_string(),
            Token::Word(w) => format!("'{w}'"),
            Token::Field { name, value } => format!("'{name}:{value}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    /// Byte offset of the token in the input.
    pub offset: usize,
}

fn ends_bare(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')' || c == '"'
}

/// Split filter text into tokens. Keywords are recognized only when unquoted
/// and fully uppercase.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let token = match c {
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            '"' => Token::Word(read_quoted(&mut chars)?),
            _ => read_bare(&mut chars)?,
        };
        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

/// Reads a `"..."` string; the iterator must be positioned on the opening quote.
fn read_quoted(chars: &mut Peekable<CharIndices>) -> Result<String, ParseError> {
    let start = match chars.next() {
        Some((i, _)) => i,
        None => return Err(ParseError::UnterminatedQuote(0)),
    };
    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err(ParseError::UnterminatedQuote(start)),
            Some((_, '"')) => return Ok(out),
            Some((_, '\\')) => match chars.next() {
                Some((_, escaped)) => out.push(escaped),
                None => return Err(ParseError::UnterminatedQuote(start)),
            },
            Some((_, ch)) => out.push(ch),
        }
    }
}

fn read_bare(chars: &mut Peekable<CharIndices>) -> Result<Token, ParseError> {
    let mut word = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if ends_bare(c) {
            break;
        }
        if c == ':' && !word.is_empty() && word.chars().all(|ch| ch.is_ascii_alphabetic()) {
            chars.next();
            let value = read_field_value(chars)?;
            return match value {
                Some(value) => Ok(Token::Field { name: word, value }),
                None => Err(ParseError::MissingValue(word)),
            };
        }
        word.push(c);
        chars.next();
    }

    Ok(match word.as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        _ => Token::Word(word),
    })
}

fn read_field_value(chars: &mut Peekable<CharIndices>) -> Result<Option<String>, ParseError> {
    if let Some(&(_, '"')) = chars.peek() {
        return read_quoted(chars).map(Some);
    }
    let mut value = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if ends_bare(c) {
            break;
        }
        value.push(c);
        chars.next();
    }
    Ok(if value.is_empty() { None } else { Some(value) })
}
