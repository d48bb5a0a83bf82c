use std::ops::Range;

use serde::Serialize;

use crate::dsl::error::TokenError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    // Picture ids and date components
    Number,
    // Tag words, qualifier names and date keywords
    // Examples: vacation, owner, new-york, today
    Ident,
    Colon,
    // Segment separator (weak AND)
    Slash,
    Comma,
    // Strong AND
    Amp,
    // OR
    Pipe,
    // Negation or a backwards date shift
    Dash,
    // Descendant wildcard on a qualified tag
    Star,
    // Strong AND or a forwards date shift
    Plus,
    LParen,
    RParen,
    // Less than or equal
    Lte,
    // Less than
    Lt,
    // Equal
    Eq,
    // Greater than or equal
    Gte,
    // Greater than
    Gt,
    Eof,
}

impl TokenKind {
    /// Human readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Number => "number",
            TokenKind::Ident => "identifier",
            TokenKind::Colon => "':'",
            TokenKind::Slash => "'/'",
            TokenKind::Comma => "','",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Dash => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Plus => "'+'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Lte => "'<='",
            TokenKind::Lt => "'<'",
            TokenKind::Eq => "'='",
            TokenKind::Gte => "'>='",
            TokenKind::Gt => "'>'",
            TokenKind::Eof => "end of query",
        }
    }
}

/// Single token with lexeme and span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

impl Token<'_> {
    /// Case-insensitive keyword comparison for identifiers.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Ident && self.lexeme.eq_ignore_ascii_case(keyword)
    }
}

/// Identifier rules differ between free query text and date expressions.
///
/// In `Query` mode a tag word may contain digits, `_` and inner hyphens
/// (`new-york`, `trip2020`). Date expressions need `today-1week` and
/// `01T10` split apart, so `Date` mode identifiers are letters only.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LexMode {
    #[default]
    Query,
    Date,
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    mode: LexMode,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            mode: LexMode::Query,
        }
    }

    pub fn mode(&self) -> LexMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LexMode) {
        self.mode = mode;
    }

    /// Byte offset of the next unscanned character.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Restart scanning at `offset`, which must be a token boundary.
    pub fn rewind(&mut self, offset: usize) {
        debug_assert!(self.input.is_char_boundary(offset));
        self.pos = offset.min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn emit(&mut self, kind: TokenKind, len: usize) -> Token<'a> {
        let start = self.pos;
        let end = start + len;
        self.pos = end;
        Token {
            kind,
            lexeme: &self.input[start..end],
            span: start..end,
        }
    }

    /// Length in bytes of the identifier at the start of `rest`.
    fn ident_len(&self, rest: &str) -> usize {
        let mut chars = rest.char_indices().peekable();
        let mut end = 0;

        while let Some((i, c)) = chars.next() {
            let accept = match self.mode {
                LexMode::Query => {
                    c.is_alphanumeric()
                        || c == '_'
                        || (c == '-'
                            && chars
                                .peek()
                                .is_some_and(|&(_, n)| n.is_alphanumeric() || n == '_'))
                }
                LexMode::Date => c.is_alphabetic() || c == '_',
            };
            if !accept {
                break;
            }
            end = i + c.len_utf8();
        }

        end
    }

    /// Return the next token from the input.
    ///
    /// Once the input is exhausted every further call yields `Eof`.
    pub fn next_token(&mut self) -> Result<Token<'a>, TokenError> {
        self.skip_whitespace();

        let rest = &self.input[self.pos..];
        let Some(c) = rest.chars().next() else {
            let len = self.input.len();
            return Ok(Token {
                kind: TokenKind::Eof,
                lexeme: "",
                span: len..len,
            });
        };

        if c.is_ascii_digit() {
            let len = rest
                .bytes()
                .position(|b| !b.is_ascii_digit())
                .unwrap_or(rest.len());
            return Ok(self.emit(TokenKind::Number, len));
        }

        if c.is_alphabetic() {
            let len = self.ident_len(rest);
            return Ok(self.emit(TokenKind::Ident, len));
        }

        let single = match c {
            ':' => Some(TokenKind::Colon),
            '/' => Some(TokenKind::Slash),
            ',' => Some(TokenKind::Comma),
            '&' => Some(TokenKind::Amp),
            '|' => Some(TokenKind::Pipe),
            '-' => Some(TokenKind::Dash),
            '*' => Some(TokenKind::Star),
            '+' => Some(TokenKind::Plus),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            _ => None,
        };
        if let Some(kind) = single {
            // All structural characters are single-byte ASCII.
            return Ok(self.emit(kind, 1));
        }

        // Longest match first so `<=` never splits into `<` `=`.
        let comparison = [
            ("<=", TokenKind::Lte),
            ("<", TokenKind::Lt),
            ("=", TokenKind::Eq),
            (">=", TokenKind::Gte),
            (">", TokenKind::Gt),
        ];
        for (symbol, kind) in comparison {
            if rest.starts_with(symbol) {
                return Ok(self.emit(kind, symbol.len()));
            }
        }

        Err(TokenError {
            offset: self.pos,
            remainder: rest.to_owned(),
        })
    }
}

/// Tokenize the whole input in `Query` mode, including the trailing `Eof`.
pub fn lex(input: &str) -> Result<Vec<Token<'_>>, TokenError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::with_capacity(16);

    loop {
        let token = lexer.next_token()?;
        let is_eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if is_eof {
            break;
        }
    }

    Ok(tokens)
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
