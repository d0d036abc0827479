//! Registry records

use serde::Serialize;
use xth_util::atom::Tag;

/// How a registered address is reference counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Registration {
    /// Single owner; one unregister removes the record
    Uncounted,
    /// Each compatible registration adds a reference, each unregister
    /// drops one. Saturates at `u32::MAX`.
    Counted(u32),
    /// Immune to unregister; only invalidation removes it
    Pinned,
}

impl Registration {
    /// Short name as shown by pointer info queries
    pub fn label(&self) -> &'static str {
        match self {
            Registration::Uncounted => "safe",
            Registration::Counted(_) => "counted",
            Registration::Pinned => "pinned",
        }
    }

    /// Same mode, ignoring the count
    pub fn same_mode(&self, other: &Registration) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, Registration::Pinned)
    }
}

/// Registry entry for one address.
///
/// Holding the tag keeps the token alive for as long as the record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointerRecord {
    pub tag: Option<Tag>,
    pub registration: Registration,
}

impl PointerRecord {
    pub(crate) fn new(tag: Option<Tag>, registration: Registration) -> Self {
        // Pins carry no tag
        let tag = if registration.is_pinned() { None } else { tag };
        Self { tag, registration }
    }

    /// Reference count, if counted
    pub fn ref_count(&self) -> Option<u32> {
        match self.registration {
            Registration::Counted(n) => Some(n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Registration::Uncounted.label(), "safe");
        assert_eq!(Registration::Counted(4).label(), "counted");
        assert_eq!(Registration::Pinned.label(), "pinned");
    }

    #[test]
    fn test_same_mode_ignores_count() {
        assert!(Registration::Counted(1).same_mode(&Registration::Counted(9)));
        assert!(!Registration::Counted(1).same_mode(&Registration::Uncounted));
    }

    #[test]
    fn test_pinned_record_drops_tag() {
        let record = PointerRecord::new(Some(Tag::new("T")), Registration::Pinned);
        assert_eq!(record.tag, None);
        assert_eq!(record.ref_count(), None);
    }
}
