use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use chrono::NaiveDateTime;
use hashbrown::{HashMap, HashSet};
use log::debug;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::dsl::{DateField, Visibility};
use crate::tags::{TagId, TagTree};

pub type PictureId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Picture {
    pub id: PictureId,
    pub owner: String,
    pub photographer: Option<String>,
    pub camera: Option<String>,
    pub visibility: Visibility,
    pub created: NaiveDateTime,
    pub uploaded: NaiveDateTime,
    pub modified: NaiveDateTime,
    pub tags: SmallVec<[TagId; 4]>,
    pub deleted: bool,
}

impl Picture {
    pub fn date(&self, field: DateField) -> NaiveDateTime {
        match field {
            DateField::Created => self.created,
            DateField::Uploaded => self.uploaded,
            DateField::Modified => self.modified,
        }
    }

    pub fn has_tag(&self, tag: TagId) -> bool {
        self.tags.contains(&tag)
    }
}

/// Who is searching. Decides the starting set of every search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(String),
    Superuser,
}

#[derive(Debug)]
pub enum GalleryError {
    Io(io::Error),
    Json(serde_json::Error),
    InvalidTag { picture: PictureId, path: String },
    DuplicatePicture(PictureId),
}

impl fmt::Display for GalleryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GalleryError::Io(err) => write!(f, "failed to read gallery: {err}"),
            GalleryError::Json(err) => write!(f, "malformed gallery fixture: {err}"),
            GalleryError::InvalidTag { picture, path } => {
                write!(f, "picture {picture} has an invalid tag path \"{path}\"")
            }
            GalleryError::DuplicatePicture(id) => write!(f, "picture {id} appears twice"),
        }
    }
}

impl std::error::Error for GalleryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GalleryError::Io(err) => Some(err),
            GalleryError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for GalleryError {
    fn from(err: io::Error) -> Self {
        GalleryError::Io(err)
    }
}

impl From<serde_json::Error> for GalleryError {
    fn from(err: serde_json::Error) -> Self {
        GalleryError::Json(err)
    }
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

/// One picture as written in a fixture file. Tags are canonical paths.
#[derive(Debug, Clone, Deserialize)]
pub struct PictureRecord {
    pub id: PictureId,
    pub owner: String,
    #[serde(default)]
    pub photographer: Option<String>,
    #[serde(default)]
    pub camera: Option<String>,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    pub created: NaiveDateTime,
    /// Defaults to `created`.
    #[serde(default)]
    pub uploaded: Option<NaiveDateTime>,
    /// Defaults to `uploaded`.
    #[serde(default)]
    pub modified: Option<NaiveDateTime>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deleted: bool,
}

/// JSON form of a gallery.
///
/// ```json
/// {
///   "friends": { "alice": ["bob"] },
///   "pictures": [
///     { "id": 1, "owner": "alice", "created": "2020-06-01T10:00:00",
///       "tags": [":trip:paris"] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryFixture {
    /// Owner to the users they list as friends.
    #[serde(default)]
    pub friends: BTreeMap<String, Vec<String>>,
    pub pictures: Vec<PictureRecord>,
}

/// In-memory picture repository: a tag hierarchy, pictures kept sorted by
/// id, and each owner's friend list.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    tags: TagTree,
    pictures: Vec<Picture>,
    friends: HashMap<String, HashSet<String>>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(tags: TagTree) -> Self {
        Self {
            tags,
            ..Self::default()
        }
    }

    pub fn tags(&self) -> &TagTree {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagTree {
        &mut self.tags
    }

    pub fn len(&self) -> usize {
        self.pictures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pictures.is_empty()
    }

    pub fn insert(&mut self, picture: Picture) -> Result<(), GalleryError> {
        match self.pictures.binary_search_by_key(&picture.id, |p| p.id) {
            Ok(_) => Err(GalleryError::DuplicatePicture(picture.id)),
            Err(pos) => {
                self.pictures.insert(pos, picture);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: PictureId) -> Option<&Picture> {
        self.pictures
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|pos| &self.pictures[pos])
    }

    pub fn add_friend(&mut self, owner: &str, friend: &str) {
        self.friends
            .entry(owner.to_owned())
            .or_default()
            .insert(friend.to_owned());
    }

    /// True when `owner` lists `user` as a friend.
    pub fn is_friend(&self, owner: &str, user: &str) -> bool {
        self.friends
            .get(owner)
            .is_some_and(|friends| friends.contains(user))
    }

    /// Ids of every live picture, ascending.
    pub fn all(&self) -> Vec<PictureId> {
        self.pictures
            .iter()
            .filter(|p| !p.deleted)
            .map(|p| p.id)
            .collect()
    }

    pub fn can_see(&self, viewer: &Viewer, picture: &Picture) -> bool {
        if picture.deleted {
            return false;
        }
        match viewer {
            Viewer::Superuser => true,
            Viewer::Anonymous => picture.visibility == Visibility::Public,
            Viewer::User(name) => match picture.visibility {
                Visibility::Public => true,
                _ if picture.owner == *name => true,
                Visibility::Restricted => self.is_friend(&picture.owner, name),
                Visibility::Private => false,
            },
        }
    }

    /// Ids the viewer may see, ascending. Every search starts here.
    pub fn visible_to(&self, viewer: &Viewer) -> Vec<PictureId> {
        self.pictures
            .iter()
            .filter(|p| self.can_see(viewer, p))
            .map(|p| p.id)
            .collect()
    }

    pub fn from_fixture(fixture: GalleryFixture) -> Result<Self, GalleryError> {
        let mut gallery = Gallery::new();

        for (owner, friends) in &fixture.friends {
            for friend in friends {
                gallery.add_friend(owner, friend);
            }
        }

        for record in fixture.pictures {
            let mut tags = SmallVec::new();
            for path in &record.tags {
                let tag = gallery
                    .tags
                    .get_or_create(path)
                    .ok_or_else(|| GalleryError::InvalidTag {
                        picture: record.id,
                        path: path.clone(),
                    })?;
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }

            let uploaded = record.uploaded.unwrap_or(record.created);
            gallery.insert(Picture {
                id: record.id,
                owner: record.owner,
                photographer: record.photographer,
                camera: record.camera,
                visibility: record.visibility,
                created: record.created,
                uploaded,
                modified: record.modified.unwrap_or(uploaded),
                tags,
                deleted: record.deleted,
            })?;
        }

        debug!(
            "gallery loaded with {} pictures and {} tags",
            gallery.len(),
            gallery.tags.len()
        );
        Ok(gallery)
    }

    pub fn from_json(json: &str) -> Result<Self, GalleryError> {
        Self::from_fixture(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, GalleryError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
#[path = "gallery_tests.rs"]
pub(crate) mod tests;
