use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::dsl::daterange::DateRange;
use crate::tags::TagId;

/// A compiled search: the predicate handed to the picture repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    pub predicate: Predicate,
}

impl Query {
    /// True for empty queries, which filter nothing.
    pub fn matches_everything(&self) -> bool {
        self.predicate.is_all()
    }
}

/// Boolean expression over picture attributes.
///
/// `And(vec![])` is the identity and matches every picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Atom(Atom),
}

impl Predicate {
    pub fn all() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Predicate::And(children) if children.is_empty())
    }

    pub fn atom(atom: Atom) -> Self {
        Predicate::Atom(atom)
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::and_all([self, other])
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::or_all([self, other])
    }

    pub fn negate(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// Conjunction that flattens nested `And`s and drops identities.
    pub fn and_all(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut out = Vec::new();
        for part in parts {
            match part {
                Predicate::And(children) => out.extend(children),
                other => out.push(other),
            }
        }

        if out.len() == 1 {
            out.pop().unwrap_or_else(Predicate::all)
        } else {
            Predicate::And(out)
        }
    }

    /// Disjunction that flattens nested `Or`s. Identity operands stand for a
    /// missing term (`sea|`) and are skipped, so they never widen the result.
    pub fn or_all(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut out = Vec::new();
        for part in parts {
            match part {
                p if p.is_all() => {}
                Predicate::Or(children) => out.extend(children),
                other => out.push(other),
            }
        }

        match out.len() {
            0 => Predicate::all(),
            1 => out.pop().unwrap_or_else(Predicate::all),
            _ => Predicate::Or(out),
        }
    }

    /// Number of atoms in the tree.
    pub fn atom_count(&self) -> usize {
        match self {
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().map(Predicate::atom_count).sum()
            }
            Predicate::Not(inner) => inner.atom_count(),
            Predicate::Atom(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Restricted,
    Private,
}

impl Visibility {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "restricted" => Some(Visibility::Restricted),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Restricted => "restricted",
            Visibility::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateField {
    Created,
    Uploaded,
    Modified,
}

impl DateField {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "created" => Some(DateField::Created),
            "uploaded" => Some(DateField::Uploaded),
            "modified" => Some(DateField::Modified),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateField::Created => "created",
            DateField::Uploaded => "uploaded",
            DateField::Modified => "modified",
        }
    }
}

/// Comparison between a timestamp field and a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Lt,
    Lte,
    Eq,
    Gte,
    Gt,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Lt => "<",
            Relation::Lte => "<=",
            Relation::Eq => "=",
            Relation::Gte => ">=",
            Relation::Gt => ">",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateFilter {
    pub field: DateField,
    pub relation: Relation,
    pub range: DateRange,
}

impl DateFilter {
    /// Inclusive lower and exclusive upper bound on the field value.
    ///
    /// `<=` cuts at the range's exclusive end and `>` starts there, so
    /// `<=2020` keeps all of 2020 and `>2020` starts at 2021-01-01. An
    /// instant such as `now` is treated as containing only itself.
    pub fn bounds(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        let (start, end) = (self.range.start(), self.range.exclusive_end());
        match self.relation {
            Relation::Eq => (start, end),
            Relation::Lt => (None, start),
            Relation::Lte => (None, end),
            Relation::Gte => (start, None),
            Relation::Gt => (end, None),
        }
    }

    pub fn matches(&self, value: NaiveDateTime) -> bool {
        let (lower, upper) = self.bounds();
        lower.is_none_or(|l| value >= l) && upper.is_none_or(|u| value < u)
    }
}

/// Leaf filters over picture attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Atom {
    /// Exact, case-insensitive tag word; stored lowercased.
    Tag { word: String },
    /// Qualified tag path, resolved to the identities it matches.
    TagPath {
        path: Vec<String>,
        include_descendants: bool,
        tags: Vec<TagId>,
    },
    Id { id: u64 },
    Owner { username: String },
    Photographer { username: String },
    Camera { nickname: String },
    Visibility { visibility: Visibility },
    Date(DateFilter),
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Tag { word } => write!(f, "tag:{word}"),
            Atom::TagPath {
                path,
                include_descendants,
                tags,
            } => {
                write!(f, "path::{}", path.join(":"))?;
                if *include_descendants {
                    f.write_str("*")?;
                }
                write!(f, "[{}]", tags.len())
            }
            Atom::Id { id } => write!(f, "id:{id}"),
            Atom::Owner { username } => write!(f, "owner:{username}"),
            Atom::Photographer { username } => write!(f, "photog:{username}"),
            Atom::Camera { nickname } => write!(f, "camera:{nickname}"),
            Atom::Visibility { visibility } => write!(f, "vis:{}", visibility.as_str()),
            Atom::Date(filter) => write!(
                f,
                "{}{}[{}]",
                filter.field.as_str(),
                filter.relation.symbol(),
                filter.range
            ),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (op, children) = match self {
            Predicate::Atom(atom) => return write!(f, "{atom}"),
            Predicate::Not(inner) => return write!(f, "(not {inner})"),
            Predicate::And(children) if children.is_empty() => return f.write_str("*"),
            Predicate::And(children) => ("and", children),
            Predicate::Or(children) => ("or", children),
        };

        write!(f, "({op}")?;
        for child in children {
            write!(f, " {child}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
#[path = "ast_tests.rs"]
mod tests;
