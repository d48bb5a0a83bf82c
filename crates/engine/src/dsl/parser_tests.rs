use super::{SearchParser, parse_search};
use crate::dsl::ast::{Atom, DateField, DateFilter, Predicate, Relation, Visibility};
use crate::dsl::daterange::DateRange;
use crate::dsl::error::{ParseError, SearchError, SearchErrorKind};
use crate::dsl::lexer::TokenKind;
use crate::tags::{TagHierarchy, TagTree};
use chrono::{NaiveDate, NaiveDateTime};

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn sample_tags() -> TagTree {
    let mut tree = TagTree::new();
    for path in [":trip:paris:louvre", ":trip:paris:eiffel", ":trip:rome"] {
        tree.get_or_create(path).unwrap();
    }
    tree
}

fn parse(input: &str) -> Predicate {
    parse_search(input)
        .unwrap_or_else(|e| panic!("{input:?} should parse: {e}"))
        .predicate
}

fn parse_err(input: &str) -> ParseError {
    match parse_search(input) {
        Err(SearchError::Parse(err)) => err,
        other => panic!("{input:?} should fail to parse, got {other:?}"),
    }
}

fn tag(word: &str) -> Predicate {
    Predicate::atom(Atom::Tag {
        word: word.to_owned(),
    })
}

fn owner(name: &str) -> Predicate {
    Predicate::atom(Atom::Owner {
        username: name.to_owned(),
    })
}

#[test]
fn empty_input_matches_everything() {
    for input in ["", "   \t ", "/", "//", ","] {
        let query = parse_search(input).unwrap();
        assert!(query.matches_everything(), "input: {input:?}");
    }
}

#[test]
fn bare_word_is_lowercased_tag() {
    assert_eq!(parse("vacation"), tag("vacation"));
    assert_eq!(parse("Vacation"), tag("vacation"));
    assert_eq!(parse("new-york"), tag("new-york"));
}

#[test]
fn number_is_picture_id() {
    assert_eq!(parse("42"), Predicate::atom(Atom::Id { id: 42 }));
    assert!(matches!(
        parse_err("99999999999999999999999"),
        ParseError::InvalidNumber { .. }
    ));
}

#[test]
fn qualified_tag_path_with_descendants() {
    let tree = sample_tags();
    let parser = SearchParser::new(&tree);
    let paris = tree.lookup(":trip:paris").unwrap();

    let got = parser.parse(":trip:paris*").unwrap().predicate;
    assert_eq!(
        got,
        Predicate::atom(Atom::TagPath {
            path: vec!["trip".into(), "paris".into()],
            include_descendants: true,
            tags: tree.more_specific(paris),
        })
    );

    let got = parser.parse(":trip:paris").unwrap().predicate;
    assert_eq!(
        got,
        Predicate::atom(Atom::TagPath {
            path: vec!["trip".into(), "paris".into()],
            include_descendants: false,
            tags: vec![paris],
        })
    );
}

#[test]
fn unknown_tag_path_resolves_to_nothing() {
    let tree = sample_tags();
    let got = SearchParser::new(&tree)
        .parse(":trip:london*")
        .unwrap()
        .predicate;
    match got {
        Predicate::Atom(Atom::TagPath { tags, .. }) => assert!(tags.is_empty()),
        other => panic!("expected tag path, got {other:?}"),
    }
}

#[test]
fn tag_path_round_trips_words() {
    let paths = ["trip", "trip:paris", "Trip:Paris:louvre", "a:b-c:d_e:f1"];
    for p in paths {
        let got = parse(&format!(":{p}"));
        let Predicate::Atom(Atom::TagPath { path, .. }) = got else {
            panic!("expected tag path for {p:?}");
        };
        let expected: Vec<String> = p.split(':').map(str::to_owned).collect();
        assert_eq!(path, expected, "path: {p:?}");
    }
}

#[test]
fn segments_are_anded() {
    assert_eq!(
        parse("owner:alice/vis:public"),
        Predicate::And(vec![
            owner("alice"),
            Predicate::atom(Atom::Visibility {
                visibility: Visibility::Public,
            }),
        ])
    );
    assert_eq!(parse("a//b/"), Predicate::And(vec![tag("a"), tag("b")]));
}

#[test]
fn adjacency_comma_and_strong_and() {
    let expected = Predicate::And(vec![tag("a"), tag("b"), tag("c")]);
    for input in ["a b c", "a,b,c", "a&b+c", "a (b c)"] {
        assert_eq!(parse(input), expected, "input: {input:?}");
    }
}

#[test]
fn strong_and_binds_tighter_than_or() {
    assert_eq!(
        parse("a&b|c"),
        Predicate::Or(vec![Predicate::And(vec![tag("a"), tag("b")]), tag("c")])
    );
}

#[test]
fn or_binds_tighter_than_adjacency() {
    assert_eq!(
        parse("a b|c"),
        Predicate::And(vec![tag("a"), Predicate::Or(vec![tag("b"), tag("c")])])
    );
}

#[test]
fn negation_covers_whole_or_expression() {
    assert_eq!(parse("-bob"), tag("bob").negate());

    let either = Predicate::Or(vec![tag("a"), tag("b")]);
    assert_eq!(parse("-a|b"), either.clone().negate());
    assert_eq!(parse("-(a|b)"), either.negate());

    assert_eq!(
        parse("sea -boat"),
        Predicate::And(vec![tag("sea"), tag("boat").negate()])
    );
}

#[test]
fn dangling_dash_is_ignored() {
    assert_eq!(parse("sea -"), tag("sea"));
    assert_eq!(parse("sea -/boat"), Predicate::And(vec![tag("sea"), tag("boat")]));
}

#[test]
fn qualifiers_are_case_insensitive() {
    assert_eq!(parse("OWNER:alice"), owner("alice"));
    assert_eq!(
        parse("Photog:bob camera:nikon"),
        Predicate::And(vec![
            Predicate::atom(Atom::Photographer {
                username: "bob".into(),
            }),
            Predicate::atom(Atom::Camera {
                nickname: "nikon".into(),
            }),
        ])
    );
    assert_eq!(
        parse("vis:PRIVATE"),
        Predicate::atom(Atom::Visibility {
            visibility: Visibility::Private,
        })
    );
}

#[test]
fn created_year_spans_whole_year() {
    assert_eq!(
        parse("created:2020"),
        Predicate::atom(Atom::Date(DateFilter {
            field: DateField::Created,
            relation: Relation::Eq,
            range: DateRange::between(midnight(2020, 1, 1), midnight(2021, 1, 1)),
        }))
    );
}

#[test]
fn created_from_day() {
    assert_eq!(
        parse("created:>=2020-06-01"),
        Predicate::atom(Atom::Date(DateFilter {
            field: DateField::Created,
            relation: Relation::Gte,
            range: DateRange::between(midnight(2020, 6, 1), midnight(2020, 6, 2)),
        }))
    );
}

#[test]
fn date_range_union_is_monotone() {
    let cases: &[(&str, &str, NaiveDateTime, NaiveDateTime)] = &[
        ("2019", "2020", midnight(2019, 1, 1), midnight(2021, 1, 1)),
        ("2020-03", "2020-05", midnight(2020, 3, 1), midnight(2020, 6, 1)),
        ("2020-01-31", "2020-02-29", midnight(2020, 1, 31), midnight(2020, 3, 1)),
        ("2020-05", "2020-05", midnight(2020, 5, 1), midnight(2020, 6, 1)),
    ];
    for (d1, d2, start, end) in cases {
        let input = format!("created:{d1},{d2}");
        let Predicate::Atom(Atom::Date(filter)) = parse(&input) else {
            panic!("expected date atom for {input:?}");
        };
        assert_eq!(filter.range.start(), Some(*start), "input: {input:?}");
        assert_eq!(filter.range.end(), Some(*end), "input: {input:?}");
    }
}

#[test]
fn comma_after_date_can_still_separate_terms() {
    let got = parse("created:2020,sea");
    let Predicate::And(parts) = got else {
        panic!("expected conjunction");
    };
    assert_eq!(parts.len(), 2);
    assert!(matches!(parts[0], Predicate::Atom(Atom::Date(_))));
    assert_eq!(parts[1], tag("sea"));
}

#[test]
fn dash_after_date_negates_next_term() {
    let got = parse("created:2020 -bob");
    let Predicate::And(parts) = got else {
        panic!("expected conjunction");
    };
    assert!(matches!(parts[0], Predicate::Atom(Atom::Date(_))));
    assert_eq!(parts[1], tag("bob").negate());
}

#[test]
fn reparsing_is_idempotent() {
    let tree = sample_tags();
    let parser = SearchParser::new(&tree).with_now(midnight(2024, 5, 5));
    for input in [
        "owner:alice|owner:bob",
        ":trip:paris* -vis:private",
        "created:today-1week",
    ] {
        let first = parser.parse(input).unwrap();
        let second = parser.parse(input).unwrap();
        assert_eq!(first, second, "input: {input:?}");
    }
    assert_eq!(
        parse("owner:alice|owner:bob"),
        Predicate::Or(vec![owner("alice"), owner("bob")])
    );
}

#[test]
fn missing_qualifier_value() {
    match parse_err("camera:") {
        ParseError::Unexpected {
            expected,
            found,
            remaining,
            ..
        } => {
            assert_eq!(expected, "identifier");
            assert_eq!(found, TokenKind::Eof);
            assert!(remaining.is_empty());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unexpected_token_lists_remaining_input() {
    match parse_err("sea ) owner:bob") {
        ParseError::Unexpected {
            expected,
            found,
            offset,
            remaining,
            ..
        } => {
            assert_eq!(expected, "'/' or end of query");
            assert_eq!(found, TokenKind::RParen);
            assert_eq!(offset, 4);
            assert_eq!(remaining, vec!["owner", ":", "bob"]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unbalanced_and_empty_parentheses() {
    assert!(matches!(
        parse_err("(sea"),
        ParseError::Unexpected {
            found: TokenKind::Eof,
            ..
        }
    ));
    assert!(matches!(
        parse_err("()"),
        ParseError::Unexpected {
            found: TokenKind::RParen,
            ..
        }
    ));
}

#[test]
fn unknown_qualifier() {
    let err = parse_err("colour:red");
    assert_eq!(
        err,
        ParseError::UnknownPredicate {
            name: "colour".into(),
            offset: 0,
        }
    );
    assert!(err.to_string().contains(":qualified:tag"));
}

#[test]
fn invalid_visibility() {
    assert_eq!(
        parse_err("vis:hidden"),
        ParseError::InvalidVisibility {
            value: "hidden".into(),
            offset: 4,
        }
    );
    assert!(matches!(
        parse_err("vis:3"),
        ParseError::InvalidVisibility { .. }
    ));
}

#[test]
fn lexical_failure_is_token_error() {
    let err = parse_search("sea ~boat").unwrap_err();
    assert_eq!(err.kind(), SearchErrorKind::Token);
    assert_eq!(err.offset(), 4);
    match err {
        SearchError::Token(tok) => assert_eq!(tok.remainder, "~boat"),
        other => panic!("expected token error, got {other:?}"),
    }
}

#[test]
fn deep_nesting_is_rejected() {
    let input = "(".repeat(1000);
    let err = parse_search(&input).unwrap_err();
    assert_eq!(err.kind(), SearchErrorKind::TooDeep);
    assert!(err.is_client_error());

    let tree = TagTree::new();
    let parser = SearchParser::new(&tree).with_max_depth(3);
    assert!(parser.parse("(((sea)))").is_ok());
    assert_eq!(
        parser.parse("((((sea))))").unwrap_err().kind(),
        SearchErrorKind::TooDeep
    );
}

#[test]
fn trailing_pipe_does_not_widen() {
    assert_eq!(parse("sea|"), tag("sea"));
    assert_eq!(parse("sea|boat|"), tag("sea").or(tag("boat")));
    assert_eq!(parse("-sea|"), tag("sea").negate());
    assert_eq!(parse("owner:bob sea|"), owner("bob").and(tag("sea")));
}

#[test]
fn configured_depth_is_capped() {
    let tree = TagTree::new();
    let parser = SearchParser::new(&tree).with_max_depth(usize::MAX);
    assert_eq!(parser.max_depth(), packrat_runtime::MAX_QUERY_DEPTH_CEILING);

    let err = parser.parse(&"(".repeat(200_000)).unwrap_err();
    assert!(matches!(
        err,
        SearchError::Parse(ParseError::TooDeep { limit, .. })
            if limit == packrat_runtime::MAX_QUERY_DEPTH_CEILING
    ));
}

#[test]
fn deepest_allowed_query_fits_a_small_stack() {
    let depth = packrat_runtime::MAX_QUERY_DEPTH_CEILING;
    let terms = format!("{}sea{}", "(".repeat(depth), ")".repeat(depth));
    let dates = format!("created:{}2020{}", "(".repeat(depth), ")".repeat(depth));

    let handle = std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(move || {
            let parser = SearchParser::new(&crate::tags::NoTags).with_max_depth(depth);
            (parser.parse(&terms).is_ok(), parser.parse(&dates).is_ok())
        })
        .unwrap();
    assert_eq!(handle.join().unwrap(), (true, true));
}

#[test]
fn parser_is_shareable_across_threads() {
    let tree = sample_tags();
    let parser = SearchParser::new(&tree);
    std::thread::scope(|s| {
        let handles: Vec<_> = ["a|b", "owner:x", ":trip*"]
            .into_iter()
            .map(|q| s.spawn(move || parser.parse(q).is_ok()))
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    });
}
