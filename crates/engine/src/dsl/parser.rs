use std::collections::VecDeque;

use chrono::{Local, NaiveDateTime};
use log::{debug, trace};

use crate::dsl::ast::{Atom, Predicate, Query};
use crate::dsl::error::{ParseError, SearchError};
use crate::dsl::lexer::{LexMode, Lexer, Token, TokenKind};
use crate::tags::{NoTags, TagHierarchy};

/// Compiles search strings into predicate trees.
///
/// Holds only a shared reference to the tag hierarchy plus plain
/// configuration, so one parser can serve any number of threads.
pub struct SearchParser<'h, H: TagHierarchy + ?Sized> {
    tags: &'h H,
    now: NaiveDateTime,
    max_depth: usize,
}

impl<H: TagHierarchy + ?Sized> Clone for SearchParser<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: TagHierarchy + ?Sized> Copy for SearchParser<'_, H> {}

impl<'h, H: TagHierarchy + ?Sized> SearchParser<'h, H> {
    /// Parser anchored at the current local time, with the nesting limit
    /// taken from the environment.
    pub fn new(tags: &'h H) -> Self {
        Self {
            tags,
            now: Local::now().naive_local(),
            max_depth: packrat_runtime::max_query_depth(),
        }
    }

    /// Fix the instant `today` and `now` resolve against.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Capped at [`packrat_runtime::MAX_QUERY_DEPTH_CEILING`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.min(packrat_runtime::MAX_QUERY_DEPTH_CEILING);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn parse(&self, input: &str) -> Result<Query, SearchError> {
        let mut parser = Parser {
            input,
            lexer: Lexer::new(input),
            lookahead: VecDeque::new(),
            last_end: 0,
            tags: self.tags,
            now: self.now,
            max_depth: self.max_depth,
            depth: 0,
        };

        let predicate = parser.search()?;
        debug!("parsed {input:?} into {predicate}");
        Ok(Query { predicate })
    }
}

/// Parse without a tag hierarchy: every `:qualified:tag` resolves to nothing.
pub fn parse_search(input: &str) -> Result<Query, SearchError> {
    SearchParser::new(&NoTags).parse(input)
}

pub(super) struct Parser<'a, 'h, H: TagHierarchy + ?Sized> {
    input: &'a str,
    lexer: Lexer<'a>,
    lookahead: VecDeque<Token<'a>>,
    /// End offset of the last consumed token.
    last_end: usize,
    tags: &'h H,
    pub(super) now: NaiveDateTime,
    max_depth: usize,
    depth: usize,
}

impl<'a, H: TagHierarchy + ?Sized> Parser<'a, '_, H> {
    fn fill(&mut self, n: usize) -> Result<(), SearchError> {
        while self.lookahead.len() <= n {
            let tok = self.lexer.next_token()?;
            trace!("token {:?} {:?} at {:?}", tok.kind, tok.lexeme, tok.span);
            self.lookahead.push_back(tok);
        }
        Ok(())
    }

    /// The token `n` positions ahead without consuming anything.
    pub(super) fn peek_nth(&mut self, n: usize) -> Result<&Token<'a>, SearchError> {
        self.fill(n)?;
        Ok(&self.lookahead[n])
    }

    pub(super) fn peek(&mut self) -> Result<TokenKind, SearchError> {
        Ok(self.peek_nth(0)?.kind)
    }

    pub(super) fn peek_token(&mut self) -> Result<Token<'a>, SearchError> {
        self.peek_nth(0).cloned()
    }

    pub(super) fn advance(&mut self) -> Result<Token<'a>, SearchError> {
        let tok = match self.lookahead.pop_front() {
            Some(tok) => tok,
            None => self.lexer.next_token()?,
        };
        self.last_end = tok.span.end;
        Ok(tok)
    }

    pub(super) fn expect(
        &mut self,
        kind: TokenKind,
        what: &str,
    ) -> Result<Token<'a>, SearchError> {
        let tok = self.advance()?;
        if tok.kind == kind {
            Ok(tok)
        } else {
            Err(self.unexpected(what, tok))
        }
    }

    /// Build an `Unexpected` error for `tok`, listing the tokens after it.
    pub(super) fn unexpected(&self, expected: &str, tok: Token<'a>) -> SearchError {
        let mut rest = Lexer::new(self.input);
        rest.rewind(tok.span.end);

        let mut remaining = Vec::new();
        while let Ok(next) = rest.next_token() {
            if next.kind == TokenKind::Eof {
                break;
            }
            remaining.push(next.lexeme.to_owned());
        }

        ParseError::Unexpected {
            expected: expected.to_owned(),
            found: tok.kind,
            lexeme: tok.lexeme.to_owned(),
            offset: tok.span.start,
            remaining,
        }
        .into()
    }

    /// Source text from `start` up to the end of the last consumed token.
    pub(super) fn consumed_since(&self, start: usize) -> &'a str {
        self.input.get(start..self.last_end).unwrap_or_default()
    }

    /// Switch lexing rules. Buffered lookahead was produced under the old
    /// mode, so it is dropped and re-lexed from its first token.
    pub(super) fn set_mode(&mut self, mode: LexMode) {
        if self.lexer.mode() == mode {
            return;
        }
        if let Some(first) = self.lookahead.front() {
            self.lexer.rewind(first.span.start);
        }
        self.lookahead.clear();
        self.lexer.set_mode(mode);
    }

    pub(super) fn enter(&mut self, offset: usize) -> Result<(), SearchError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::TooDeep {
                limit: self.max_depth,
                offset,
            }
            .into());
        }
        Ok(())
    }

    pub(super) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// search := segment ('/' segment)*
    fn search(&mut self) -> Result<Predicate, SearchError> {
        let mut segments = vec![self.segment()?];
        while self.peek()? == TokenKind::Slash {
            self.advance()?;
            segments.push(self.segment()?);
        }

        let tok = self.advance()?;
        if tok.kind != TokenKind::Eof {
            return Err(self.unexpected("'/' or end of query", tok));
        }

        Ok(Predicate::and_all(segments))
    }

    /// Adjacent terms and `,` both AND. An empty segment is the identity.
    fn segment(&mut self) -> Result<Predicate, SearchError> {
        let mut terms = Vec::new();
        loop {
            match self.peek()? {
                TokenKind::Comma => {
                    self.advance()?;
                }
                TokenKind::Number
                | TokenKind::Ident
                | TokenKind::Colon
                | TokenKind::LParen
                | TokenKind::Dash => terms.push(self.not_expr()?),
                _ => break,
            }
        }
        Ok(Predicate::and_all(terms))
    }

    /// `-` negates the whole or-expression that follows it. A dangling `-`
    /// before `/` or the end of input is dropped.
    fn not_expr(&mut self) -> Result<Predicate, SearchError> {
        if self.peek()? != TokenKind::Dash {
            return self.or_expr();
        }

        self.advance()?;
        match self.peek()? {
            TokenKind::Slash | TokenKind::Eof => Ok(Predicate::all()),
            _ => Ok(self.or_expr()?.negate()),
        }
    }

    fn or_expr(&mut self) -> Result<Predicate, SearchError> {
        let mut alternatives = vec![self.and_expr()?];
        while self.peek()? == TokenKind::Pipe {
            self.advance()?;
            alternatives.push(self.and_expr()?);
        }
        Ok(Predicate::or_all(alternatives))
    }

    fn and_expr(&mut self) -> Result<Predicate, SearchError> {
        let mut terms = vec![self.term()?];
        while matches!(self.peek()?, TokenKind::Amp | TokenKind::Plus) {
            self.advance()?;
            terms.push(self.term()?);
        }
        Ok(Predicate::and_all(terms))
    }

    fn term(&mut self) -> Result<Predicate, SearchError> {
        let tok = self.peek_token()?;
        match tok.kind {
            TokenKind::LParen => {
                self.advance()?;
                self.enter(tok.span.start)?;
                if self.peek()? == TokenKind::RParen {
                    let close = self.advance()?;
                    return Err(self.unexpected("a term", close));
                }
                let inner = self.segment()?;
                self.expect(TokenKind::RParen, "')'")?;
                self.leave();
                Ok(inner)
            }
            TokenKind::Number => {
                self.advance()?;
                let id = tok
                    .lexeme
                    .parse::<u64>()
                    .map_err(|_| ParseError::InvalidNumber {
                        text: tok.lexeme.to_owned(),
                        offset: tok.span.start,
                    })?;
                Ok(Predicate::atom(Atom::Id { id }))
            }
            TokenKind::Colon => self.tag_path(),
            TokenKind::Ident => {
                if self.peek_nth(1)?.kind == TokenKind::Colon {
                    return self.qualifier();
                }
                self.advance()?;
                Ok(Predicate::atom(Atom::Tag {
                    word: tok.lexeme.to_lowercase(),
                }))
            }
            TokenKind::Eof => Ok(Predicate::all()),
            _ => {
                self.advance()?;
                Err(self.unexpected("a term", tok))
            }
        }
    }

    /// `:word(:word)*` with an optional trailing `*` for the descendants.
    fn tag_path(&mut self) -> Result<Predicate, SearchError> {
        let mut words: Vec<&'a str> = Vec::new();
        while self.peek()? == TokenKind::Colon {
            self.advance()?;
            words.push(self.expect(TokenKind::Ident, "tag word")?.lexeme);
        }

        let include_descendants = self.peek()? == TokenKind::Star;
        if include_descendants {
            self.advance()?;
        }

        let tags = match self.tags.resolve_path(&words) {
            Some(tag) if include_descendants => self.tags.more_specific(tag),
            Some(tag) => vec![tag],
            None => {
                debug!("tag path :{} does not exist", words.join(":"));
                Vec::new()
            }
        };

        Ok(Predicate::atom(Atom::TagPath {
            path: words.into_iter().map(str::to_owned).collect(),
            include_descendants,
            tags,
        }))
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
