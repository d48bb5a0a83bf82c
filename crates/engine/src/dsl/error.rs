use std::fmt;

use crate::dsl::lexer::TokenKind;

/// The input contains text that matches no lexical pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    /// Byte offset where scanning failed.
    pub offset: usize,
    /// Unconsumed input starting at `offset`.
    pub remainder: String,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to match a token at offset {} with remains \"{}\"",
            self.offset, self.remainder
        )
    }
}

impl std::error::Error for TokenError {}

/// The token stream is lexically valid but breaks the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Unexpected {
        expected: String,
        found: TokenKind,
        lexeme: String,
        offset: usize,
        /// Lexemes of the tokens following the offending one.
        remaining: Vec<String>,
    },
    UnknownPredicate {
        name: String,
        offset: usize,
    },
    InvalidVisibility {
        value: String,
        offset: usize,
    },
    /// A date shift (`+3`, `-1`) without `day|week|month|year`.
    MissingPeriod {
        found: String,
        offset: usize,
    },
    InvalidDate {
        text: String,
        offset: usize,
    },
    InvalidNumber {
        text: String,
        offset: usize,
    },
    TooDeep {
        limit: usize,
        offset: usize,
    },
}

impl ParseError {
    /// Byte offset of the token the error refers to.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Unexpected { offset, .. }
            | ParseError::UnknownPredicate { offset, .. }
            | ParseError::InvalidVisibility { offset, .. }
            | ParseError::MissingPeriod { offset, .. }
            | ParseError::InvalidDate { offset, .. }
            | ParseError::InvalidNumber { offset, .. }
            | ParseError::TooDeep { offset, .. } => *offset,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Unexpected {
                expected,
                found,
                lexeme,
                remaining,
                ..
            } => {
                if lexeme.is_empty() {
                    write!(f, "expected {expected}, got {}", found.describe())?;
                } else {
                    write!(f, "expected {expected}, got {} \"{lexeme}\"", found.describe())?;
                }
                if !remaining.is_empty() {
                    write!(f, " (remaining: {})", remaining.join(" "))?;
                }
                Ok(())
            }
            ParseError::UnknownPredicate { name, .. } => write!(
                f,
                "unknown predicate \"{name}\": did you mean to use a :qualified:tag?"
            ),
            ParseError::InvalidVisibility { value, .. } => write!(
                f,
                "unexpected visibility \"{value}\": expected public, restricted or private"
            ),
            ParseError::MissingPeriod { found, .. } => write!(
                f,
                "date shift must name a period (day, week, month, year), got \"{found}\""
            ),
            ParseError::InvalidDate { text, .. } => write!(f, "invalid date or time \"{text}\""),
            ParseError::InvalidNumber { text, .. } => write!(f, "number out of range \"{text}\""),
            ParseError::TooDeep { limit, .. } => {
                write!(f, "query nests deeper than {limit} levels")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Discriminant of a [`SearchError`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchErrorKind {
    Token,
    Unexpected,
    UnknownPredicate,
    InvalidVisibility,
    MissingPeriod,
    InvalidDate,
    InvalidNumber,
    TooDeep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    Token(TokenError),
    Parse(ParseError),
}

impl SearchError {
    pub fn kind(&self) -> SearchErrorKind {
        match self {
            SearchError::Token(_) => SearchErrorKind::Token,
            SearchError::Parse(err) => match err {
                ParseError::Unexpected { .. } => SearchErrorKind::Unexpected,
                ParseError::UnknownPredicate { .. } => SearchErrorKind::UnknownPredicate,
                ParseError::InvalidVisibility { .. } => SearchErrorKind::InvalidVisibility,
                ParseError::MissingPeriod { .. } => SearchErrorKind::MissingPeriod,
                ParseError::InvalidDate { .. } => SearchErrorKind::InvalidDate,
                ParseError::InvalidNumber { .. } => SearchErrorKind::InvalidNumber,
                ParseError::TooDeep { .. } => SearchErrorKind::TooDeep,
            },
        }
    }

    /// Every search error is a malformed query, never a server fault.
    pub fn is_client_error(&self) -> bool {
        true
    }

    pub fn offset(&self) -> usize {
        match self {
            SearchError::Token(err) => err.offset,
            SearchError::Parse(err) => err.offset(),
        }
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Token(err) => write!(f, "search query could not be understood: {err}"),
            SearchError::Parse(err) => write!(f, "search query could not be understood: {err}"),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SearchError::Token(err) => Some(err),
            SearchError::Parse(err) => Some(err),
        }
    }
}

impl From<TokenError> for SearchError {
    fn from(err: TokenError) -> Self {
        SearchError::Token(err)
    }
}

impl From<ParseError> for SearchError {
    fn from(err: ParseError) -> Self {
        SearchError::Parse(err)
    }
}
