//! Subtype relation between tags
//!
//! Every tag has at most one direct supertag, so the relation is a forest.
//! Walks up the forest stop after a fixed number of hops instead of
//! tracking visited tags, which keeps a cyclic definition from looping.
//!
//! A missing tag stands for an untyped pointer: every tag converts to it
//! implicitly, and it converts to a concrete tag only explicitly.

use rustc_hash::FxHashMap;
use serde::Serialize;
use xth_util::atom::Tag;

/// How a pointer's tag relates to an expected tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagRelation {
    Unrelated,
    Equal,
    /// The tag is a descendant of the expected tag (upcast)
    ImplicitlyCastable,
    /// The expected tag is a descendant of the tag (downcast)
    ExplicitlyCastable,
}

/// Subtag to supertag edges.
#[derive(Debug, Clone)]
pub struct SubtagTable {
    edges: FxHashMap<Tag, Tag>,
    depth_limit: usize,
}

impl SubtagTable {
    pub fn new(depth_limit: usize) -> Self {
        Self {
            edges: FxHashMap::default(),
            depth_limit,
        }
    }

    /// Declare `supertag` as the direct supertag of `subtag`
    ///
    /// An untyped supertag, or a tag made its own supertag, is ignored.
    /// Redefining replaces the previous supertag.
    pub fn define(&mut self, subtag: &Tag, supertag: Option<&Tag>) {
        let Some(supertag) = supertag else {
            return;
        };
        if subtag == supertag {
            return;
        }
        if let Some(old) = self.edges.insert(subtag.clone(), supertag.clone()) {
            log::debug!("subtag {}: supertag {} replaced by {}", subtag, old, supertag);
        }
    }

    /// Remove the supertag of `tag`. Returns whether one was defined.
    pub fn remove(&mut self, tag: &Tag) -> bool {
        self.edges.remove(tag.as_str()).is_some()
    }

    pub fn supertag(&self, tag: &Tag) -> Option<&Tag> {
        self.edges.get(tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Every (subtag, supertag) edge, sorted by subtag
    pub fn edges(&self) -> Vec<(Tag, Tag)> {
        let mut edges: Vec<_> = self
            .edges
            .iter()
            .map(|(sub, sup)| (sub.clone(), sup.clone()))
            .collect();
        edges.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        edges
    }

    /// Whether a pointer tagged `tag` may be used where `expected` is
    /// required: equal tags, an untyped expectation, or `expected` reached
    /// by walking up from `tag`.
    pub fn compatible(&self, tag: Option<&Tag>, expected: Option<&Tag>) -> bool {
        let Some(expected) = expected else {
            return true;
        };
        let Some(tag) = tag else {
            return false;
        };
        tag == expected || self.is_ancestor(tag, expected)
    }

    /// Whether `ancestor` is a strict supertag of `tag` within the depth limit
    pub fn is_ancestor(&self, tag: &Tag, ancestor: &Tag) -> bool {
        let mut current = tag;
        for _ in 0..self.depth_limit {
            match self.supertag(current) {
                Some(sup) if sup == ancestor => return true,
                Some(sup) => current = sup,
                None => return false,
            }
        }
        false
    }

    /// Classify `tag` against `expected`
    pub fn relation(&self, tag: Option<&Tag>, expected: Option<&Tag>) -> TagRelation {
        match (tag, expected) {
            (None, None) => TagRelation::Equal,
            (Some(_), None) => TagRelation::ImplicitlyCastable,
            (None, Some(_)) => TagRelation::ExplicitlyCastable,
            (Some(tag), Some(expected)) => {
                if tag == expected {
                    TagRelation::Equal
                } else if self.is_ancestor(tag, expected) {
                    TagRelation::ImplicitlyCastable
                } else if self.is_ancestor(expected, tag) {
                    TagRelation::ExplicitlyCastable
                } else {
                    TagRelation::Unrelated
                }
            }
        }
    }
}
