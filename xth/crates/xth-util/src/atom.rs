//! Atom tables - interned string tokens used as type tags.
//!
//! A [`Tag`] is a cheap, clonable handle to an immutable string. Tags
//! produced by the same [`AtomTable`] share storage, so equality between
//! them is a pointer comparison. Tags from different tables (or built with
//! [`Tag::new`]) still compare equal when their text is equal.
//!
//! # Performance Characteristics
//!
//! - **Interning (hit)**: O(1) - hash lookup only
//! - **Interning (miss)**: O(1) - hash insert + allocation
//! - **Tag comparison**: O(1) when both tags come from the same table
//!
//! # Thread Safety
//!
//! `Tag` is `Send + Sync`. `AtomTable` takes `&mut self` for interning and
//! is meant to be owned by a single context.

use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Interned string token.
#[derive(Clone)]
pub struct Tag(Arc<str>);

impl Tag {
    /// Create a tag outside of any atom table.
    pub fn new(text: &str) -> Self {
        Tag(Arc::from(text))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if both tags share the same interned storage.
    #[inline]
    pub fn ptr_eq(a: &Tag, b: &Tag) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Number of live holders of this token, including its atom table.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl PartialEq for Tag {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Tag::ptr_eq(self, other) || *self.0 == *other.0
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    // Must agree with `str`'s hash for `Borrow<str>` lookups.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(text: &str) -> Self {
        Tag::new(text)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", &*self.0)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Statistics about an atom table.
///
/// # Examples
///
/// ```
/// use xth_util::atom::AtomTable;
///
/// let mut atoms = AtomTable::new();
/// atoms.intern("Handle");
/// atoms.intern("Handle");
/// let stats = atoms.stats();
/// assert_eq!(stats.count, 1);
/// assert_eq!(stats.hits, 1);
/// assert_eq!(stats.misses, 1);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AtomStats {
    /// Number of interned strings
    pub count: usize,
    /// Number of lookups that found an existing atom
    pub hits: usize,
    /// Number of lookups that created a new atom
    pub misses: usize,
}

impl AtomStats {
    /// Fraction of intern calls that were hits (0.0 when nothing was interned).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Per-context string intern table.
#[derive(Debug, Default)]
pub struct AtomTable {
    atoms: FxHashSet<Tag>,
    hits: usize,
    misses: usize,
}

impl AtomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning the shared token for it.
    pub fn intern(&mut self, text: &str) -> Tag {
        if let Some(tag) = self.atoms.get(text) {
            self.hits += 1;
            return tag.clone();
        }
        self.misses += 1;
        let tag = Tag::new(text);
        self.atoms.insert(tag.clone());
        tag
    }

    /// Look up an existing atom without interning.
    pub fn get(&self, text: &str) -> Option<Tag> {
        self.atoms.get(text).cloned()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.atoms.contains(text)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.atoms.iter()
    }

    pub fn stats(&self) -> AtomStats {
        AtomStats {
            count: self.atoms.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Drop every atom. Tags already handed out stay valid.
    pub fn clear(&mut self) {
        self.atoms.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
