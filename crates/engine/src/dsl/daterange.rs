use std::fmt;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

/// Calendar unit used for rounding and shifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Some(Period::Day),
            "week" => Some(Period::Week),
            "month" => Some(Period::Month),
            "year" => Some(Period::Year),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Calendar addition.
///
/// Years and months are applied first, carrying month overflow into the year
/// and clamping the day to the target month (Jan 31 + 1 month = Feb 28/29).
/// Days and weeks are then a plain day-count shift. Time of day is kept.
/// Returns `None` when the result leaves chrono's representable range.
pub fn add(
    dt: NaiveDateTime,
    years: i64,
    months: i64,
    days: i64,
    weeks: i64,
) -> Option<NaiveDateTime> {
    let total_months = i64::from(dt.year())
        .checked_mul(12)?
        .checked_add(i64::from(dt.month0()))?
        .checked_add(years.checked_mul(12)?)?
        .checked_add(months)?;

    let year = i32::try_from(total_months.div_euclid(12)).ok()?;
    let month = u32::try_from(total_months.rem_euclid(12)).ok()? + 1;
    let day = dt.day().min(days_in_month(year, month)?);
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let shift = days.checked_add(weeks.checked_mul(7)?)?;
    let date = date.checked_add_signed(TimeDelta::try_days(shift)?)?;

    Some(date.and_time(dt.time()))
}

/// Shift `dt` by `n` whole periods.
pub fn add_period(dt: NaiveDateTime, period: Period, n: i64) -> Option<NaiveDateTime> {
    match period {
        Period::Day => add(dt, 0, 0, n, 0),
        Period::Week => add(dt, 0, 0, 0, n),
        Period::Month => add(dt, 0, n, 0, 0),
        Period::Year => add(dt, n, 0, 0, 0),
    }
}

/// Monday on or before `dt`, at midnight.
pub fn week_start(dt: NaiveDateTime) -> NaiveDateTime {
    let date = dt.date();
    let back = i64::from(date.weekday().num_days_from_monday());
    date.checked_sub_signed(TimeDelta::days(back))
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

pub fn round_down(period: Period, dt: NaiveDateTime) -> NaiveDateTime {
    let midnight = dt.date().and_time(NaiveTime::MIN);
    match period {
        Period::Day => midnight,
        Period::Week => week_start(midnight),
        Period::Month => midnight.with_day(1).unwrap_or(midnight),
        Period::Year => NaiveDate::from_ymd_opt(dt.year(), 1, 1)
            .map(|d| d.and_time(NaiveTime::MIN))
            .unwrap_or(midnight),
    }
}

/// Smallest `period` boundary at or after `dt`.
///
/// Computed as the start of the period that follows the one holding the
/// instant just before `dt`, so a value already on a boundary is unchanged.
pub fn round_up(period: Period, dt: NaiveDateTime) -> Option<NaiveDateTime> {
    let before = dt.checked_sub_signed(TimeDelta::microseconds(1))?;
    let next = add_period(before, period, 1)?;
    Some(round_down(period, next))
}

/// A pair of timestamps bounding a period. `None` on either side means
/// unbounded. Construction keeps `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        match (start, end) {
            (Some(s), Some(e)) if e < s => Self {
                start: Some(e),
                end: Some(s),
            },
            _ => Self { start, end },
        }
    }

    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    /// Zero-width range at `at`.
    pub fn instant(at: NaiveDateTime) -> Self {
        Self::between(at, at)
    }

    /// `[start, start + 1 period)`.
    pub fn spanning(start: NaiveDateTime, period: Period) -> Option<Self> {
        Some(Self::between(start, add_period(start, period, 1)?))
    }

    /// The calendar day containing `now`.
    pub fn today_at(now: NaiveDateTime) -> Option<Self> {
        Self::spanning(round_down(Period::Day, now), Period::Day)
    }

    pub fn today() -> Option<Self> {
        Self::today_at(Local::now().naive_local())
    }

    pub fn now() -> Self {
        Self::instant(Local::now().naive_local())
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn is_instant(&self) -> bool {
        self.is_bounded() && self.start == self.end
    }

    /// Exclusive upper bound for filtering. An instant ends one nanosecond
    /// after its start, so it contains exactly that timestamp.
    pub fn exclusive_end(&self) -> Option<NaiveDateTime> {
        match (self.start, self.end) {
            (Some(s), Some(e)) if s == e => Some(
                s.checked_add_signed(TimeDelta::nanoseconds(1))
                    .unwrap_or(NaiveDateTime::MAX),
            ),
            (_, end) => end,
        }
    }

    /// Smallest range covering both; an unbounded side stays unbounded.
    pub fn union(&self, other: &DateRange) -> DateRange {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        DateRange::new(start, end)
    }

    /// Overlap of both ranges, or `None` when they are disjoint.
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match (start, end) {
            (Some(s), Some(e)) if e < s => None,
            _ => Some(DateRange { start, end }),
        }
    }

    /// Widen to whole periods: `start` down, `end` up.
    pub fn round(&self, period: Period) -> Option<DateRange> {
        let start = self.start.map(|s| round_down(period, s));
        let end = match self.end {
            Some(e) => Some(round_up(period, e)?),
            None => None,
        };
        Some(DateRange::new(start, end))
    }

    /// Shift both bounds by `n` periods.
    pub fn add(&self, period: Period, n: i64) -> Option<DateRange> {
        let start = match self.start {
            Some(s) => Some(add_period(s, period, n)?),
            None => None,
        };
        let end = match self.end {
            Some(e) => Some(add_period(e, period, n)?),
            None => None,
        };
        Some(DateRange::new(start, end))
    }

    /// Half-open membership: `start <= at < end`.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start.is_none_or(|s| at >= s) && self.end.is_none_or(|e| at < e)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(s) => write!(f, "{s}")?,
            None => f.write_str("*")?,
        }
        f.write_str(" - ")?;
        match self.end {
            Some(e) => write!(f, "{e}"),
            None => f.write_str("*"),
        }
    }
}

#[cfg(test)]
#[path = "daterange_tests.rs"]
mod tests;
