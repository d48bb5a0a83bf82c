use std::collections::VecDeque;
use std::fmt;

use hashbrown::HashMap;
use serde::Serialize;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TagId(pub u32);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-only view of a hierarchical tag namespace, consulted by the search
/// parser for `:qualified:tag` terms.
pub trait TagHierarchy {
    /// Resolve a path of tag words from the root, case-insensitively.
    fn resolve_path(&self, path: &[&str]) -> Option<TagId>;

    /// The tag itself followed by every tag nested below it.
    fn more_specific(&self, tag: TagId) -> Vec<TagId>;
}

/// A hierarchy with no tags, for callers that never search qualified tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTags;

impl TagHierarchy for NoTags {
    fn resolve_path(&self, _path: &[&str]) -> Option<TagId> {
        None
    }

    fn more_specific(&self, tag: TagId) -> Vec<TagId> {
        vec![tag]
    }
}

/// `[letter][letter|digit|_|-]*`
pub fn is_tag_word(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Split a user-supplied tag path into canonical words.
///
/// Surrounding spaces and colons are stripped, the text is lowercased,
/// inner spaces are squashed out and runs of `:` separate words.
pub fn canonical_words(path: &str) -> Option<SmallVec<[String; 4]>> {
    let trimmed = path
        .trim_matches(|c: char| c == ' ' || c == ':')
        .to_lowercase()
        .replace(' ', "");

    let words: SmallVec<[String; 4]> = trimmed
        .split(':')
        .filter(|w| !w.is_empty())
        .map(str::to_owned)
        .collect();

    if words.is_empty() || !words.iter().all(|w| is_tag_word(w)) {
        return None;
    }
    Some(words)
}

#[derive(Debug, Clone)]
struct TagNode {
    word: String,
    scope: Option<TagId>,
    children: SmallVec<[TagId; 4]>,
}

/// In-memory tag hierarchy. Top-level tags have no scope.
#[derive(Debug, Clone, Default)]
pub struct TagTree {
    nodes: Vec<TagNode>,
    index: HashMap<(Option<TagId>, String), TagId>,
}

impl TagTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, tag: TagId) -> Option<&TagNode> {
        self.nodes.get(tag.0 as usize)
    }

    fn child(&self, scope: Option<TagId>, word: &str) -> Option<TagId> {
        self.index.get(&(scope, word.to_owned())).copied()
    }

    /// Look up an existing tag by path (`:trip:paris`, `trip:paris`).
    pub fn lookup(&self, path: &str) -> Option<TagId> {
        let words = canonical_words(path)?;
        words
            .iter()
            .try_fold(None, |scope, word| self.child(scope, word).map(Some))?
    }

    /// Look up a tag by path, creating any missing levels.
    ///
    /// Returns `None` only when the path is not a valid tag path.
    pub fn get_or_create(&mut self, path: &str) -> Option<TagId> {
        let words = canonical_words(path)?;
        let mut scope = None;

        for word in words {
            let id = match self.child(scope, &word) {
                Some(id) => id,
                None => self.insert(scope, word)?,
            };
            scope = Some(id);
        }

        scope
    }

    fn insert(&mut self, scope: Option<TagId>, word: String) -> Option<TagId> {
        let id = TagId(u32::try_from(self.nodes.len()).ok()?);
        self.nodes.push(TagNode {
            word: word.clone(),
            scope,
            children: SmallVec::new(),
        });
        if let Some(parent) = scope {
            self.nodes[parent.0 as usize].children.push(id);
        }
        self.index.insert((scope, word), id);
        Some(id)
    }

    /// Last component of the tag's path.
    pub fn word(&self, tag: TagId) -> Option<&str> {
        self.node(tag).map(|n| n.word.as_str())
    }

    pub fn parent(&self, tag: TagId) -> Option<TagId> {
        self.node(tag).and_then(|n| n.scope)
    }

    /// Tags from the top level down to `tag`, inclusive.
    pub fn tag_path(&self, tag: TagId) -> Vec<TagId> {
        let mut path = Vec::new();
        let mut current = self.node(tag).map(|_| tag);
        while let Some(id) = current {
            path.push(id);
            current = self.parent(id);
        }
        path.reverse();
        path
    }

    pub fn depth(&self, tag: TagId) -> usize {
        self.tag_path(tag).len()
    }

    /// `:a:b:c` form of the tag.
    pub fn canonical(&self, tag: TagId) -> Option<String> {
        self.node(tag)?;
        let mut out = String::new();
        for id in self.tag_path(tag) {
            out.push(':');
            out.push_str(self.word(id).unwrap_or_default());
        }
        Some(out)
    }

    /// True when `tag` sits strictly below `other`.
    pub fn is_more_specific(&self, tag: TagId, other: TagId) -> bool {
        let mut current = self.parent(tag);
        while let Some(id) = current {
            if id == other {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

impl TagHierarchy for TagTree {
    fn resolve_path(&self, path: &[&str]) -> Option<TagId> {
        if path.is_empty() {
            return None;
        }
        let mut scope = None;
        for word in path {
            let word = word.to_lowercase();
            if !is_tag_word(&word) {
                return None;
            }
            scope = Some(self.child(scope, &word)?);
        }
        scope
    }

    fn more_specific(&self, tag: TagId) -> Vec<TagId> {
        let Some(_) = self.node(tag) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut queue = VecDeque::from([tag]);
        while let Some(id) = queue.pop_front() {
            out.push(id);
            if let Some(node) = self.node(id) {
                queue.extend(node.children.iter().copied());
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "tags_tests.rs"]
mod tests;
