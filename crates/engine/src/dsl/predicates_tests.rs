use crate::dsl::ast::{Atom, DateField, DateFilter, Predicate, Relation};
use crate::dsl::daterange::DateRange;
use crate::dsl::error::{ParseError, SearchError};
use crate::dsl::parser::SearchParser;
use crate::tags::NoTags;
use chrono::{NaiveDate, NaiveDateTime};

fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    at(y, m, d, 0, 0, 0)
}

// Wednesday afternoon.
fn fixed_now() -> NaiveDateTime {
    at(2024, 5, 15, 14, 30, 0)
}

fn date_filter(input: &str) -> DateFilter {
    let query = SearchParser::new(&NoTags)
        .with_now(fixed_now())
        .parse(input)
        .unwrap_or_else(|e| panic!("{input:?} should parse: {e}"));
    match query.predicate {
        Predicate::Atom(Atom::Date(filter)) => filter,
        other => panic!("expected a date atom for {input:?}, got {other}"),
    }
}

fn range(input: &str) -> DateRange {
    date_filter(input).range
}

fn parse_err(input: &str) -> ParseError {
    match SearchParser::new(&NoTags).with_now(fixed_now()).parse(input) {
        Err(SearchError::Parse(err)) => err,
        other => panic!("{input:?} should fail, got {other:?}"),
    }
}

#[test]
fn date_precision_sets_span() {
    let cases: &[(&str, NaiveDateTime, NaiveDateTime)] = &[
        ("created:2020", day(2020, 1, 1), day(2021, 1, 1)),
        ("created:2020-02", day(2020, 2, 1), day(2020, 3, 1)),
        ("created:2020-02-29", day(2020, 2, 29), day(2020, 3, 1)),
        ("created:2020-12-31", day(2020, 12, 31), day(2021, 1, 1)),
    ];
    for (input, start, end) in cases {
        assert_eq!(range(input), DateRange::between(*start, *end), "input: {input:?}");
    }
}

#[test]
fn time_of_day_makes_an_instant() {
    let r = range("created:2020-06-01T10:30");
    assert!(r.is_instant());
    assert_eq!(r.start(), Some(at(2020, 6, 1, 10, 30, 0)));

    let r = range("modified:2020-06-01t10:30:15");
    assert_eq!(r.start(), Some(at(2020, 6, 1, 10, 30, 15)));
}

#[test]
fn relations_and_fields() {
    let cases: &[(&str, DateField, Relation)] = &[
        ("created:2020", DateField::Created, Relation::Eq),
        ("created:=2020", DateField::Created, Relation::Eq),
        ("uploaded:<2020", DateField::Uploaded, Relation::Lt),
        ("uploaded:<=2020", DateField::Uploaded, Relation::Lte),
        ("Modified:>=2020", DateField::Modified, Relation::Gte),
        ("modified:>2020", DateField::Modified, Relation::Gt),
    ];
    for (input, field, relation) in cases {
        let filter = date_filter(input);
        assert_eq!(filter.field, *field, "input: {input:?}");
        assert_eq!(filter.relation, *relation, "input: {input:?}");
    }
}

#[test]
fn today_and_now_use_injected_clock() {
    assert_eq!(
        range("created:today"),
        DateRange::between(day(2024, 5, 15), day(2024, 5, 16))
    );
    assert_eq!(range("created:now"), DateRange::instant(fixed_now()));
    assert_eq!(
        range("created:TODAY"),
        DateRange::between(day(2024, 5, 15), day(2024, 5, 16))
    );
}

#[test]
fn shifts_move_both_bounds() {
    let cases: &[(&str, NaiveDateTime, NaiveDateTime)] = &[
        ("created:today-1week", day(2024, 5, 8), day(2024, 5, 9)),
        ("created:today-week", day(2024, 5, 8), day(2024, 5, 9)),
        ("created:today+2day", day(2024, 5, 17), day(2024, 5, 18)),
        ("created:2020-1year", day(2019, 1, 1), day(2020, 1, 1)),
        ("created:2020-01-31+1month", day(2020, 2, 29), day(2020, 3, 1)),
        ("created:2020-3month-1day", day(2019, 9, 30), day(2020, 9, 30)),
    ];
    for (input, start, end) in cases {
        assert_eq!(range(input), DateRange::between(*start, *end), "input: {input:?}");
    }
}

#[test]
fn period_prefix_rounds_result() {
    assert_eq!(
        range("created:month:2020-06-17"),
        DateRange::between(day(2020, 6, 1), day(2020, 7, 1))
    );
    assert_eq!(
        range("created:week:today"),
        DateRange::between(day(2024, 5, 13), day(2024, 5, 20))
    );
    assert_eq!(
        range("created:year:(now-1month)"),
        DateRange::between(day(2024, 1, 1), day(2025, 1, 1))
    );
}

#[test]
fn parenthesised_date_expressions() {
    assert_eq!(
        range("created:(2020-06-01,2020-06-10)+1year"),
        DateRange::between(day(2021, 6, 1), day(2021, 6, 11))
    );
}

#[test]
fn date_then_more_terms() {
    let got = SearchParser::new(&NoTags)
        .with_now(fixed_now())
        .parse("created:2020 sea/owner:bob")
        .unwrap()
        .predicate;
    let Predicate::And(parts) = got else {
        panic!("expected conjunction, got {got}");
    };
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[1].to_string(), "tag:sea");
    assert_eq!(parts[2].to_string(), "owner:bob");
}

#[test]
fn plus_without_shift_is_strong_and() {
    let got = SearchParser::new(&NoTags)
        .parse("created:2020+sea")
        .unwrap()
        .predicate;
    assert_eq!(got.atom_count(), 2);
    assert!(matches!(got, Predicate::And(_)));
}

#[test]
fn shift_needs_a_period() {
    let cases: &[(&str, &str)] = &[
        ("created:2020-01-01-5", "end of query"),
        ("created:today+3", "end of query"),
        ("created:today-3 sea", "sea"),
    ];
    for (input, found_text) in cases {
        match parse_err(input) {
            ParseError::MissingPeriod { found, .. } => {
                assert_eq!(found, *found_text, "input: {input:?}")
            }
            other => panic!("{input:?}: unexpected error {other:?}"),
        }
    }
}

#[test]
fn invalid_calendar_values() {
    for input in [
        "created:2020-13",
        "created:2021-02-29",
        "created:2020-06-01T25:00",
        "created:2020-06-01T10:61",
        "created:99999999999",
    ] {
        assert!(
            matches!(parse_err(input), ParseError::InvalidDate { .. }),
            "input: {input:?}"
        );
    }
}

#[test]
fn invalid_date_reports_source_text() {
    assert_eq!(
        parse_err("created:2021-02-29"),
        ParseError::InvalidDate {
            text: "2021-02-29".into(),
            offset: 8,
        }
    );
}

#[test]
fn missing_or_garbled_date() {
    for input in ["created:", "created:sea", "created:(2020"] {
        assert!(
            matches!(parse_err(input), ParseError::Unexpected { .. }),
            "input: {input:?}"
        );
    }
}

#[test]
fn nested_date_parentheses_count_toward_depth() {
    let input = format!("created:{}2020{}", "(".repeat(5), ")".repeat(5));
    let parser = SearchParser::new(&NoTags).with_max_depth(4);
    assert!(matches!(
        parser.parse(&input),
        Err(SearchError::Parse(ParseError::TooDeep { limit: 4, .. }))
    ));
    assert!(parser.with_max_depth(5).parse(&input).is_ok());
}
