//! Invalidation tags and the tag-to-key index

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use dashmap::DashMap;

use super::key::CacheKey;

/// Invalidation label attached to cache entries on a successful fetch
///
/// A tag has a kind ("Posts") and optionally an id narrowing it to one
/// resource ("Posts:programming").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    kind: Cow<'static, str>,
    id: Option<String>,
}

impl Tag {
    /// Creates a generic tag of the given kind
    pub fn new(kind: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// Creates a tag scoped to one identifier
    pub fn with_id(kind: impl Into<Cow<'static, str>>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.kind, id),
            None => f.write_str(&self.kind),
        }
    }
}

/// Maps each tag to the cache keys whose latest successful fetch provided it
///
/// The index may briefly hold a superset of the entries' real tags while a
/// fetch result is being written; callers re-check the entry itself.
#[derive(Debug, Default)]
pub struct TagIndex {
    by_tag: DashMap<Tag, HashSet<CacheKey>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `key` with every tag in `tags`
    pub fn associate<'a>(&self, key: &CacheKey, tags: impl IntoIterator<Item = &'a Tag>) {
        for tag in tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    /// Removes the association between `key` and every tag in `tags`
    pub fn dissociate<'a>(&self, key: &CacheKey, tags: impl IntoIterator<Item = &'a Tag>) {
        for tag in tags {
            if let Some(mut keys) = self.by_tag.get_mut(tag) {
                keys.remove(key);
            }
            self.by_tag.remove_if(tag, |_, keys| keys.is_empty());
        }
    }

    /// Keys currently associated with `tag`
    pub fn keys_for(&self, tag: &Tag) -> Vec<CacheKey> {
        self.by_tag
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every indexed tag of the given kind, with or without an id
    pub fn tags_of_kind(&self, kind: &str) -> Vec<Tag> {
        self.by_tag
            .iter()
            .filter(|item| item.key().kind() == kind)
            .map(|item| item.key().clone())
            .collect()
    }

    /// Number of distinct tags with at least one key
    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(name: &str) -> CacheKey {
        CacheKey::new(name, &json!({})).unwrap()
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(Tag::new("Posts").to_string(), "Posts");
        assert_eq!(
            Tag::with_id("Posts", "programming").to_string(),
            "Posts:programming"
        );
    }

    #[test]
    fn test_tag_equality_includes_id() {
        assert_ne!(Tag::new("Posts"), Tag::with_id("Posts", "rust"));
        assert_ne!(Tag::with_id("Posts", "rust"), Tag::with_id("Posts", "go"));
        assert_eq!(Tag::with_id("Posts", "rust"), Tag::with_id("Posts", "rust"));
        assert_eq!(Tag::with_id("Posts", "rust").kind(), "Posts");
        assert_eq!(Tag::with_id("Posts", "rust").id(), Some("rust"));
    }

    #[test]
    fn test_associate_and_lookup() {
        let index = TagIndex::new();
        let tag = Tag::with_id("Posts", "rust");
        index.associate(&key("a"), [&tag]);
        index.associate(&key("b"), [&tag]);

        let mut keys = index.keys_for(&tag);
        keys.sort();
        assert_eq!(keys, vec![key("a"), key("b")]);
        assert!(index.keys_for(&Tag::new("Posts")).is_empty());
    }

    #[test]
    fn test_dissociate_drops_empty_tags() {
        let index = TagIndex::new();
        let tag = Tag::new("Comments");
        index.associate(&key("a"), [&tag]);
        assert_eq!(index.len(), 1);

        index.dissociate(&key("a"), [&tag]);
        assert!(index.keys_for(&tag).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_dissociate_unknown_tag_is_noop() {
        let index = TagIndex::new();
        index.dissociate(&key("a"), [&Tag::new("Posts")]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_tags_of_kind() {
        let index = TagIndex::new();
        index.associate(&key("a"), [&Tag::new("Posts")]);
        index.associate(&key("b"), [&Tag::with_id("Posts", "rust")]);
        index.associate(&key("c"), [&Tag::with_id("Comments", "abc")]);

        let mut tags = index.tags_of_kind("Posts");
        tags.sort();
        assert_eq!(tags, vec![Tag::new("Posts"), Tag::with_id("Posts", "rust")]);
    }
}
