//! Tagged pointer values
//!
//! A [`TaggedPtr`] pairs a raw address with an optional type tag. It is a
//! plain value: creating one does not register anything. Its text form is
//! `0x<hex address>^<tag>`, with the address zero padded to the pointer
//! width, or `NULL` for a null pointer with no tag.

use crate::error::{PointerError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::mem;
use std::str::FromStr;
use xth_util::atom::Tag;

const ADDRESS_WIDTH: usize = 2 * mem::size_of::<usize>();

/// `0x` followed by the zero-padded lowercase hex address
pub fn format_address(address: usize) -> String {
    format!("0x{:0width$x}", address, width = ADDRESS_WIDTH)
}

/// An address with an optional type tag.
///
/// An empty tag is the same as no tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaggedPtr {
    address: usize,
    tag: Option<Tag>,
}

impl TaggedPtr {
    pub fn new(address: usize, tag: Option<Tag>) -> Self {
        Self {
            address,
            tag: tag.filter(|t| !t.is_empty()),
        }
    }

    /// Untagged null pointer
    pub const fn null() -> Self {
        Self {
            address: 0,
            tag: None,
        }
    }

    #[inline]
    pub fn address(&self) -> usize {
        self.address
    }

    #[inline]
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.address == 0
    }

    pub fn into_parts(self) -> (usize, Option<Tag>) {
        (self.address, self.tag)
    }
}

impl fmt::Display for TaggedPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            None if self.address == 0 => f.write_str("NULL"),
            tag => write!(
                f,
                "{}^{}",
                format_address(self.address),
                tag.as_ref().map_or("", Tag::as_str)
            ),
        }
    }
}

impl FromStr for TaggedPtr {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "NULL" {
            return Ok(TaggedPtr::null());
        }
        let invalid = || PointerError::Format {
            value: s.to_string(),
        };

        let rest = s.strip_prefix("0x").ok_or_else(invalid)?;
        let (hex, tag) = match rest.split_once('^') {
            Some((hex, tag)) => (hex, Some(tag)),
            None => (rest, None),
        };
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let address = usize::from_str_radix(hex, 16).map_err(|_| invalid())?;
        Ok(TaggedPtr::new(address, tag.map(Tag::new)))
    }
}

impl Serialize for TaggedPtr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Anything a tagged pointer can be read from.
pub trait PointerSource {
    fn to_tagged(&self) -> Result<TaggedPtr>;
}

impl PointerSource for TaggedPtr {
    fn to_tagged(&self) -> Result<TaggedPtr> {
        Ok(self.clone())
    }
}

impl PointerSource for str {
    fn to_tagged(&self) -> Result<TaggedPtr> {
        self.parse()
    }
}

impl PointerSource for String {
    fn to_tagged(&self) -> Result<TaggedPtr> {
        self.parse()
    }
}

/// Wrap an address and tag into a value. Never touches a registry.
pub fn wrap(address: usize, tag: Option<&Tag>) -> TaggedPtr {
    TaggedPtr::new(address, tag.cloned())
}

/// Address of a tagged pointer value, ignoring its tag
pub fn unwrap<V: PointerSource + ?Sized>(value: &V) -> Result<usize> {
    value.to_tagged().map(|p| p.address)
}

/// Tag of a tagged pointer value
pub fn tag_of<V: PointerSource + ?Sized>(value: &V) -> Result<Option<Tag>> {
    value.to_tagged().map(|p| p.tag)
}

/// Outcome of comparing two pointer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// Different addresses
    Unequal,
    /// Same address and same tag
    Equal,
    /// Same address, tags differ or only one side is tagged
    Indeterminate,
}

impl Comparison {
    /// 1 for equal, 0 for unequal, -1 for indeterminate
    pub fn as_i32(self) -> i32 {
        match self {
            Comparison::Unequal => 0,
            Comparison::Equal => 1,
            Comparison::Indeterminate => -1,
        }
    }
}

/// Compare two pointer values by address, then by tag
pub fn compare<A, B>(a: &A, b: &B) -> Result<Comparison>
where
    A: PointerSource + ?Sized,
    B: PointerSource + ?Sized,
{
    let a = a.to_tagged()?;
    let b = b.to_tagged()?;
    if a.address != b.address {
        return Ok(Comparison::Unequal);
    }
    Ok(match (&a.tag, &b.tag) {
        (None, None) => Comparison::Equal,
        (Some(x), Some(y)) if x == y => Comparison::Equal,
        _ => Comparison::Indeterminate,
    })
}
