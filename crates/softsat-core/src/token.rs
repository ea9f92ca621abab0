//! Token vocabulary of the clause language.
//!
//! A clause is one line of text such as `$10 v ~($11 ^ ~$12)`. Any
//! character that is not part of a token is skipped.

use crate::error::ParseError;

/// Clause-language token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// Variable reference: `$<index>`
    Var(usize),
    /// Soft AND: `^`
    And,
    /// Soft OR: `v`
    Or,
    /// Soft NOT: `~`
    Not,
    /// Open group: `(`
    Open,
    /// Close group: `)`
    Close,
}

/// A token with the 1-based column it starts at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub column: usize,
}

/// Split a clause into tokens.
///
/// Variable indices too large for `usize` saturate, so they are rejected
/// later as out of range.
pub fn tokenize(clause: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = clause.chars().enumerate().peekable();

    while let Some((i, ch)) = chars.next() {
        let column = i + 1;
        let token = match ch {
            '$' => {
                let mut index: Option<usize> = None;
                while let Some(&(_, d)) = chars.peek() {
                    let Some(digit) = d.to_digit(10) else { break };
                    let acc = index.unwrap_or(0);
                    index = Some(acc.saturating_mul(10).saturating_add(digit as usize));
                    chars.next();
                }
                Token::Var(index.ok_or(ParseError::MissingVariableIndex(column))?)
            }
            '^' => Token::And,
            'v' => Token::Or,
            '~' => Token::Not,
            '(' => Token::Open,
            ')' => Token::Close,
            _ => continue,
        };
        tokens.push(Spanned { token, column });
    }

    Ok(tokens)
}
