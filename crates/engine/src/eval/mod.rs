mod helpers;
mod predicates;

pub use helpers::{diff_sorted, intersect_sorted, union_sorted};
use log::debug;
pub use predicates::{atom_matches, eval_atom};

use crate::{
    dsl::{Predicate, Query},
    gallery::{Gallery, Picture, PictureId, Viewer},
};

/// What a picture collection must offer for a compiled query to be applied
/// to it. Each call narrows the collection.
pub trait PictureFilter: Sized {
    /// Keep only pictures matching `predicate`.
    fn apply_filter(self, predicate: &Predicate) -> Self;

    /// Drop pictures matching `predicate`.
    fn apply_exclude(self, predicate: &Predicate) -> Self;
}

impl Query {
    /// Apply the top-level conjunction step by step: negated parts become
    /// exclusions, everything else a filter. The identity applies nothing.
    pub fn apply<F: PictureFilter>(&self, collection: F) -> F {
        let step = |acc: F, part: &Predicate| match part {
            Predicate::Not(inner) => acc.apply_exclude(inner),
            other => acc.apply_filter(other),
        };

        match &self.predicate {
            Predicate::And(children) => children.iter().fold(collection, step),
            other => step(collection, other),
        }
    }
}

/// Candidates matching `predicate`, evaluated set-wise. Input and output are
/// sorted ascending.
pub fn eval_predicate(
    gallery: &Gallery,
    predicate: &Predicate,
    candidates: &[PictureId],
) -> Vec<PictureId> {
    match predicate {
        Predicate::Atom(atom) => eval_atom(gallery, atom, candidates),

        Predicate::And(children) => {
            let mut current = candidates.to_vec();
            for child in children {
                if current.is_empty() {
                    break;
                }
                current = eval_predicate(gallery, child, &current);
            }
            current
        }

        Predicate::Or(children) => {
            let mut acc: Vec<PictureId> = Vec::new();
            for child in children {
                let subset = eval_predicate(gallery, child, candidates);
                if acc.is_empty() {
                    acc = subset;
                } else if !subset.is_empty() {
                    acc = union_sorted(&acc, &subset);
                }
            }
            acc
        }

        Predicate::Not(inner) => {
            let matched = eval_predicate(gallery, inner, candidates);
            diff_sorted(candidates, &matched)
        }
    }
}

/// In-memory [`PictureFilter`]: a sorted id list over a gallery.
#[derive(Debug, Clone)]
pub struct Selection<'g> {
    gallery: &'g Gallery,
    ids: Vec<PictureId>,
}

impl<'g> Selection<'g> {
    pub fn new(gallery: &'g Gallery, mut ids: Vec<PictureId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self { gallery, ids }
    }

    /// Everything `viewer` may see.
    pub fn visible(gallery: &'g Gallery, viewer: &Viewer) -> Self {
        Self {
            gallery,
            ids: gallery.visible_to(viewer),
        }
    }

    pub fn ids(&self) -> &[PictureId] {
        &self.ids
    }

    pub fn into_ids(self) -> Vec<PictureId> {
        self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn pictures(&self) -> impl Iterator<Item = &'g Picture> + '_ {
        let gallery = self.gallery;
        self.ids.iter().filter_map(move |&id| gallery.get(id))
    }
}

impl PictureFilter for Selection<'_> {
    fn apply_filter(self, predicate: &Predicate) -> Self {
        let ids = eval_predicate(self.gallery, predicate, &self.ids);
        debug!("filter {predicate}: {} -> {}", self.ids.len(), ids.len());
        Self { ids, ..self }
    }

    fn apply_exclude(self, predicate: &Predicate) -> Self {
        let matched = eval_predicate(self.gallery, predicate, &self.ids);
        let ids = diff_sorted(&self.ids, &matched);
        debug!("exclude {predicate}: {} -> {}", self.ids.len(), ids.len());
        Self { ids, ..self }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
