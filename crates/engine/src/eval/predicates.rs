use crate::dsl::Atom;
use crate::eval::helpers::intersect_sorted;
use crate::gallery::{Gallery, Picture, PictureId};

/// Candidates matching a single atom.
pub fn eval_atom(gallery: &Gallery, atom: &Atom, candidates: &[PictureId]) -> Vec<PictureId> {
    match atom {
        Atom::Id { id } => intersect_sorted(candidates, &[*id]),
        Atom::TagPath { tags, .. } if tags.is_empty() => Vec::new(),
        _ => candidates
            .iter()
            .copied()
            .filter(|&id| {
                gallery
                    .get(id)
                    .is_some_and(|picture| atom_matches(gallery, atom, picture))
            })
            .collect(),
    }
}

pub fn atom_matches(gallery: &Gallery, atom: &Atom, picture: &Picture) -> bool {
    match atom {
        Atom::Tag { word } => picture
            .tags
            .iter()
            .any(|&tag| gallery.tags().word(tag) == Some(word.as_str())),
        Atom::TagPath { tags, .. } => tags.iter().any(|&tag| picture.has_tag(tag)),
        Atom::Id { id } => picture.id == *id,
        Atom::Owner { username } => picture.owner == *username,
        Atom::Photographer { username } => picture.photographer.as_ref() == Some(username),
        Atom::Camera { nickname } => picture.camera.as_ref() == Some(nickname),
        Atom::Visibility { visibility } => picture.visibility == *visibility,
        Atom::Date(filter) => filter.matches(picture.date(filter.field)),
    }
}
