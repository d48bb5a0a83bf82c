use super::*;
use chrono::NaiveDate;

fn tag(word: &str) -> Predicate {
    Predicate::atom(Atom::Tag {
        word: word.to_owned(),
    })
}

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn year_2020(relation: Relation) -> DateFilter {
    DateFilter {
        field: DateField::Created,
        relation,
        range: DateRange::between(midnight(2020, 1, 1), midnight(2021, 1, 1)),
    }
}

#[test]
fn and_flattens_and_drops_identity() {
    let p = tag("a").and(Predicate::all()).and(tag("b").and(tag("c")));
    assert_eq!(p, Predicate::And(vec![tag("a"), tag("b"), tag("c")]));

    assert_eq!(Predicate::all().and(tag("a")), tag("a"));
    assert!(Predicate::all().and(Predicate::all()).is_all());
}

#[test]
fn or_flattens_and_skips_identity() {
    let p = tag("a").or(tag("b").or(tag("c")));
    assert_eq!(p, Predicate::Or(vec![tag("a"), tag("b"), tag("c")]));

    assert_eq!(tag("a").or(Predicate::all()), tag("a"));
    assert_eq!(
        Predicate::or_all([Predicate::all(), tag("a"), Predicate::all(), tag("b")]),
        Predicate::Or(vec![tag("a"), tag("b")])
    );
    assert!(Predicate::all().or(Predicate::all()).is_all());
}

#[test]
fn negate_collapses_double_negation() {
    let p = tag("a").negate();
    assert_eq!(p, Predicate::Not(Box::new(tag("a"))));
    assert_eq!(p.negate(), tag("a"));
}

#[test]
fn atom_count_walks_the_tree() {
    let p = tag("a").and(tag("b").or(tag("c")).negate());
    assert_eq!(p.atom_count(), 3);
    assert_eq!(Predicate::all().atom_count(), 0);
}

#[test]
fn keywords_are_case_insensitive() {
    assert_eq!(Visibility::from_keyword("PUBLIC"), Some(Visibility::Public));
    assert_eq!(Visibility::from_keyword("hidden"), None);
    assert_eq!(DateField::from_keyword("Uploaded"), Some(DateField::Uploaded));
    assert_eq!(DateField::from_keyword("updated"), None);
}

#[test]
fn relation_bounds_follow_range_edges() {
    let start = Some(midnight(2020, 1, 1));
    let end = Some(midnight(2021, 1, 1));
    let cases: &[(Relation, (Option<NaiveDateTime>, Option<NaiveDateTime>))] = &[
        (Relation::Eq, (start, end)),
        (Relation::Lt, (None, start)),
        (Relation::Lte, (None, end)),
        (Relation::Gte, (start, None)),
        (Relation::Gt, (end, None)),
    ];
    for (relation, expected) in cases {
        assert_eq!(year_2020(*relation).bounds(), *expected, "{relation:?}");
    }
}

#[test]
fn date_filter_matching() {
    let mid_2020 = midnight(2020, 7, 1);
    let new_year = midnight(2021, 1, 1);
    let late_2019 = midnight(2019, 12, 31);

    assert!(year_2020(Relation::Eq).matches(mid_2020));
    assert!(!year_2020(Relation::Eq).matches(new_year));
    assert!(year_2020(Relation::Lt).matches(late_2019));
    assert!(!year_2020(Relation::Lt).matches(mid_2020));
    assert!(year_2020(Relation::Lte).matches(mid_2020));
    assert!(!year_2020(Relation::Lte).matches(new_year));
    assert!(year_2020(Relation::Gte).matches(mid_2020));
    assert!(!year_2020(Relation::Gt).matches(mid_2020));
    assert!(year_2020(Relation::Gt).matches(new_year));
}

#[test]
fn instant_relations_agree_at_the_timestamp() {
    let at = midnight(2020, 6, 1);
    let filter = |relation| DateFilter {
        field: DateField::Modified,
        relation,
        range: DateRange::instant(at),
    };

    let cases = [
        (Relation::Lt, false),
        (Relation::Lte, true),
        (Relation::Eq, true),
        (Relation::Gte, true),
        (Relation::Gt, false),
    ];
    for (relation, expected) in cases {
        assert_eq!(filter(relation).matches(at), expected, "{relation:?}");
    }

    let later = midnight(2020, 6, 2);
    assert!(!filter(Relation::Eq).matches(later));
    assert!(!filter(Relation::Lte).matches(later));
    assert!(filter(Relation::Gt).matches(later));
}

#[test]
fn display_is_compact_sexpr() {
    let p = tag("a")
        .or(tag("b"))
        .negate()
        .and(Predicate::atom(Atom::Owner {
            username: "alice".into(),
        }));
    assert_eq!(p.to_string(), "(and (not (or tag:a tag:b)) owner:alice)");
    assert_eq!(Predicate::all().to_string(), "*");

    let d = Predicate::atom(Atom::Date(year_2020(Relation::Gte)));
    assert_eq!(
        d.to_string(),
        "created>=[2020-01-01 00:00:00 - 2021-01-01 00:00:00]"
    );
}

#[test]
fn serializes_with_kind_tags() {
    let p = Predicate::atom(Atom::Visibility {
        visibility: Visibility::Public,
    })
    .and(tag("sea"));
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "and": [
                { "atom": { "kind": "visibility", "visibility": "public" } },
                { "atom": { "kind": "tag", "word": "sea" } }
            ]
        })
    );
}
