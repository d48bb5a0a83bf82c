use chrono::{NaiveDate, NaiveTime};

use crate::dsl::ast::{Atom, DateField, DateFilter, Predicate, Relation, Visibility};
use crate::dsl::daterange::{DateRange, Period};
use crate::dsl::error::{ParseError, SearchError};
use crate::dsl::lexer::{LexMode, Token, TokenKind};
use crate::dsl::parser::Parser;
use crate::tags::TagHierarchy;

fn period_keyword(tok: &Token<'_>) -> Option<Period> {
    if tok.kind == TokenKind::Ident {
        Period::from_keyword(tok.lexeme)
    } else {
        None
    }
}

impl<'a, H: TagHierarchy + ?Sized> Parser<'a, '_, H> {
    /// `name ':' value`, entered with the name and colon still in lookahead.
    pub(super) fn qualifier(&mut self) -> Result<Predicate, SearchError> {
        let name = self.advance()?;
        self.advance()?;

        let key = name.lexeme.to_ascii_lowercase();
        let atom = match key.as_str() {
            "vis" => Atom::Visibility {
                visibility: self.visibility()?,
            },
            "owner" => Atom::Owner {
                username: self.expect(TokenKind::Ident, "identifier")?.lexeme.to_owned(),
            },
            "photog" => Atom::Photographer {
                username: self.expect(TokenKind::Ident, "identifier")?.lexeme.to_owned(),
            },
            "camera" => Atom::Camera {
                nickname: self.expect(TokenKind::Ident, "identifier")?.lexeme.to_owned(),
            },
            other => match DateField::from_keyword(other) {
                Some(field) => Atom::Date(self.date_filter(field)?),
                None => {
                    return Err(ParseError::UnknownPredicate {
                        name: name.lexeme.to_owned(),
                        offset: name.span.start,
                    }
                    .into());
                }
            },
        };

        Ok(Predicate::atom(atom))
    }

    fn visibility(&mut self) -> Result<Visibility, SearchError> {
        let tok = self.advance()?;
        if tok.kind == TokenKind::Eof {
            return Err(self.unexpected("visibility", tok));
        }

        match Visibility::from_keyword(tok.lexeme) {
            Some(visibility) if tok.kind == TokenKind::Ident => Ok(visibility),
            _ => Err(ParseError::InvalidVisibility {
                value: tok.lexeme.to_owned(),
                offset: tok.span.start,
            }
            .into()),
        }
    }

    /// Date expressions are lexed with letters-only identifiers so that
    /// `today-1week` and `01T10` split apart.
    fn date_filter(&mut self, field: DateField) -> Result<DateFilter, SearchError> {
        self.set_mode(LexMode::Date);
        let filter = self.date_relation(field);
        self.set_mode(LexMode::Query);
        filter
    }

    /// daterel := (<= | < | = | >= | >)? dateexpr
    fn date_relation(&mut self, field: DateField) -> Result<DateFilter, SearchError> {
        let relation = match self.peek()? {
            TokenKind::Lt => Some(Relation::Lt),
            TokenKind::Lte => Some(Relation::Lte),
            TokenKind::Eq => Some(Relation::Eq),
            TokenKind::Gte => Some(Relation::Gte),
            TokenKind::Gt => Some(Relation::Gt),
            _ => None,
        };
        if relation.is_some() {
            self.advance()?;
        }

        Ok(DateFilter {
            field,
            relation: relation.unwrap_or(Relation::Eq),
            range: self.date_expr()?,
        })
    }

    /// dateexpr := (period ':')? daterange
    fn date_expr(&mut self) -> Result<DateRange, SearchError> {
        let start = self.peek_nth(0)?.span.start;
        let leading = period_keyword(self.peek_nth(0)?);
        let rounding = match leading {
            Some(period) if self.peek_nth(1)?.kind == TokenKind::Colon => Some(period),
            _ => None,
        };
        if rounding.is_some() {
            self.advance()?;
            self.advance()?;
        }

        let range = self.date_range()?;
        match rounding {
            Some(period) => range.round(period).ok_or_else(|| self.invalid_date(start)),
            None => Ok(range),
        }
    }

    /// daterange := datedelta (',' datedelta)?
    ///
    /// A comma only continues the date when a date follows it; otherwise it
    /// is left for the segment as a plain AND.
    fn date_range(&mut self) -> Result<DateRange, SearchError> {
        let first = self.date_delta()?;
        if self.peek()? == TokenKind::Comma && self.starts_datetime(1)? {
            self.advance()?;
            let second = self.date_delta()?;
            return Ok(first.union(&second));
        }
        Ok(first)
    }

    fn starts_datetime(&mut self, n: usize) -> Result<bool, SearchError> {
        let tok = self.peek_nth(n)?;
        Ok(matches!(tok.kind, TokenKind::Number | TokenKind::LParen)
            || tok.is_keyword("today")
            || tok.is_keyword("now"))
    }

    /// datedelta := datetime (('-'|'+') NUMBER? period)*
    fn date_delta(&mut self) -> Result<DateRange, SearchError> {
        let start = self.peek_nth(0)?.span.start;
        let mut range = self.date_time()?;
        while let Some((period, n)) = self.shift()? {
            range = range
                .add(period, n)
                .ok_or_else(|| self.invalid_date(start))?;
        }
        Ok(range)
    }

    /// True when the next tokens read as `-3 week` or `+month`.
    fn shift_ahead(&mut self) -> Result<bool, SearchError> {
        if !matches!(self.peek()?, TokenKind::Dash | TokenKind::Plus) {
            return Ok(false);
        }
        if period_keyword(self.peek_nth(1)?).is_some() {
            return Ok(true);
        }
        Ok(self.peek_nth(1)?.kind == TokenKind::Number
            && period_keyword(self.peek_nth(2)?).is_some())
    }

    /// Consume one shift, if present. A signed number with no period after
    /// it is an error; any other `-` or `+` ends the date.
    fn shift(&mut self) -> Result<Option<(Period, i64)>, SearchError> {
        let sign = match self.peek()? {
            TokenKind::Plus => 1,
            TokenKind::Dash => -1,
            _ => return Ok(None),
        };

        let next = self.peek_nth(1)?.clone();
        if let Some(period) = period_keyword(&next) {
            self.advance()?;
            self.advance()?;
            return Ok(Some((period, sign)));
        }
        if next.kind != TokenKind::Number {
            return Ok(None);
        }

        let after = self.peek_nth(2)?.clone();
        let Some(period) = period_keyword(&after) else {
            let found = if after.lexeme.is_empty() {
                after.kind.describe().to_owned()
            } else {
                after.lexeme.to_owned()
            };
            return Err(ParseError::MissingPeriod {
                found,
                offset: after.span.start,
            }
            .into());
        };

        self.advance()?;
        self.advance()?;
        self.advance()?;
        let count = next
            .lexeme
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidNumber {
                text: next.lexeme.to_owned(),
                offset: next.span.start,
            })?;
        Ok(Some((period, sign * count)))
    }

    /// datetime := '(' dateexpr ')' | today | now | date (T time)?
    fn date_time(&mut self) -> Result<DateRange, SearchError> {
        let tok = self.peek_token()?;
        match tok.kind {
            TokenKind::LParen => {
                self.advance()?;
                self.enter(tok.span.start)?;
                let inner = self.date_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                self.leave();
                Ok(inner)
            }
            TokenKind::Number => self.calendar_date(),
            _ if tok.is_keyword("today") => {
                self.advance()?;
                DateRange::today_at(self.now).ok_or_else(|| self.invalid_date(tok.span.start))
            }
            _ if tok.is_keyword("now") => {
                self.advance()?;
                Ok(DateRange::instant(self.now))
            }
            _ => {
                self.advance()?;
                Err(self.unexpected("a date", tok))
            }
        }
    }

    /// `-NUMBER` continuing a date, as opposed to a shift.
    fn date_part_ahead(&mut self) -> Result<bool, SearchError> {
        Ok(self.peek()? == TokenKind::Dash
            && self.peek_nth(1)?.kind == TokenKind::Number
            && !self.shift_ahead()?)
    }

    /// date := NUMBER ('-' NUMBER ('-' NUMBER)?)?
    ///
    /// The range spans the precision given: a year, a month or a day. With a
    /// time of day the date is a single instant.
    fn calendar_date(&mut self) -> Result<DateRange, SearchError> {
        let year_tok = self.advance()?;
        let start = year_tok.span.start;
        let year = self.date_number(&year_tok)?;

        let mut month = None;
        let mut day = None;
        if self.date_part_ahead()? {
            self.advance()?;
            let tok = self.advance()?;
            month = Some(self.date_number(&tok)?);

            if self.date_part_ahead()? {
                self.advance()?;
                let tok = self.advance()?;
                day = Some(self.date_number(&tok)?);
            }
        }

        let time = if self.peek_nth(0)?.is_keyword("t")
            && self.peek_nth(1)?.kind == TokenKind::Number
        {
            self.advance()?;
            Some(self.time_of_day(start)?)
        } else {
            None
        };

        let date = i32::try_from(year)
            .ok()
            .and_then(|y| NaiveDate::from_ymd_opt(y, month.unwrap_or(1), day.unwrap_or(1)))
            .ok_or_else(|| self.invalid_date(start))?;

        if let Some(time) = time {
            return Ok(DateRange::instant(date.and_time(time)));
        }

        let span = match (month, day) {
            (None, _) => Period::Year,
            (Some(_), None) => Period::Month,
            (Some(_), Some(_)) => Period::Day,
        };
        DateRange::spanning(date.and_time(NaiveTime::MIN), span)
            .ok_or_else(|| self.invalid_date(start))
    }

    /// time := NUMBER ':' NUMBER (':' NUMBER)?
    fn time_of_day(&mut self, start: usize) -> Result<NaiveTime, SearchError> {
        let tok = self.expect(TokenKind::Number, "hour")?;
        let hour = self.date_number(&tok)?;
        self.expect(TokenKind::Colon, "':'")?;
        let tok = self.expect(TokenKind::Number, "minute")?;
        let minute = self.date_number(&tok)?;

        let mut second = 0;
        if self.peek()? == TokenKind::Colon && self.peek_nth(1)?.kind == TokenKind::Number {
            self.advance()?;
            let tok = self.advance()?;
            second = self.date_number(&tok)?;
        }

        NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| self.invalid_date(start))
    }

    fn date_number(&self, tok: &Token<'a>) -> Result<u32, SearchError> {
        tok.lexeme.parse::<u32>().map_err(|_| {
            ParseError::InvalidDate {
                text: tok.lexeme.to_owned(),
                offset: tok.span.start,
            }
            .into()
        })
    }

    fn invalid_date(&self, start: usize) -> SearchError {
        ParseError::InvalidDate {
            text: self.consumed_since(start).to_owned(),
            offset: start,
        }
        .into()
    }
}

#[cfg(test)]
#[path = "predicates_tests.rs"]
mod tests;
