//! Introspection of pointer values and registrations

use crate::error::Result;
use crate::record::Registration;
use crate::registry::PointerRegistry;
use crate::subtag::TagRelation;
use crate::tagged::PointerSource;
use serde::Serialize;
use xth_util::atom::Tag;

/// Outcome of checking an address against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// No record for the address
    Missing,
    /// Registered, but under an unrelated tag
    WrongTag,
    /// Registered with exactly the expected tag
    Ok,
    /// Registered with a descendant of the expected tag
    Derived,
}

impl RegistrationStatus {
    pub fn is_usable(self) -> bool {
        matches!(self, RegistrationStatus::Ok | RegistrationStatus::Derived)
    }
}

/// How a value's tag matches its registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatch {
    Exact,
    Derived,
    Mismatch,
}

impl TagMatch {
    pub fn label(self) -> &'static str {
        match self {
            TagMatch::Exact => "exact",
            TagMatch::Derived => "derived",
            TagMatch::Mismatch => "mismatch",
        }
    }
}

/// A pointer value broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dissection {
    pub address: usize,
    pub tag: Option<Tag>,
    /// The value's tag against the expected tag
    pub relation: TagRelation,
    /// The registration against the value's tag
    pub registration: RegistrationStatus,
}

/// What the registry knows about a pointer value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointerInfo {
    pub tag: Option<Tag>,
    /// `None` when the address is not registered
    pub registration: Option<Registration>,
    pub matched: Option<TagMatch>,
    pub registered_tag: Option<Tag>,
}

impl PointerInfo {
    /// `none`, `safe`, `counted` or `pinned`
    pub fn registration_label(&self) -> &'static str {
        self.registration.as_ref().map_or("none", Registration::label)
    }
}

/// Registry occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub pointers: usize,
    pub uncounted: usize,
    pub counted: usize,
    pub pinned: usize,
    pub subtags: usize,
    pub atoms: usize,
}

impl PointerRegistry {
    /// Four-way status of `address` against `expected`. Never fails.
    pub fn registration_status(&self, address: usize, expected: Option<&Tag>) -> RegistrationStatus {
        let Some(record) = self.pointers.get(&address) else {
            return RegistrationStatus::Missing;
        };
        match self.subtags.relation(record.tag.as_ref(), expected) {
            TagRelation::Equal => RegistrationStatus::Ok,
            TagRelation::ImplicitlyCastable => RegistrationStatus::Derived,
            _ => RegistrationStatus::WrongTag,
        }
    }

    /// Split `value` and relate it to `expected` and to its registration
    pub fn dissect<V: PointerSource + ?Sized>(
        &self,
        value: &V,
        expected: Option<&Tag>,
    ) -> Result<Dissection> {
        let (address, tag) = value.to_tagged()?.into_parts();
        Ok(Dissection {
            address,
            relation: self.subtags.relation(tag.as_ref(), expected),
            registration: self.registration_status(address, tag.as_ref()),
            tag,
        })
    }

    pub fn info<V: PointerSource + ?Sized>(&self, value: &V) -> Result<PointerInfo> {
        let (address, tag) = value.to_tagged()?.into_parts();
        let Some(record) = self.pointers.get(&address) else {
            return Ok(PointerInfo {
                tag,
                registration: None,
                matched: None,
                registered_tag: None,
            });
        };
        let matched = match self.subtags.relation(record.tag.as_ref(), tag.as_ref()) {
            TagRelation::Equal => TagMatch::Exact,
            TagRelation::ImplicitlyCastable => TagMatch::Derived,
            _ => TagMatch::Mismatch,
        };
        Ok(PointerInfo {
            tag,
            registration: Some(record.registration),
            matched: Some(matched),
            registered_tag: record.tag.clone(),
        })
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            pointers: self.pointers.len(),
            subtags: self.subtags.len(),
            atoms: self.atoms().len(),
            ..Default::default()
        };
        for record in self.pointers.values() {
            match record.registration {
                Registration::Uncounted => stats.uncounted += 1,
                Registration::Counted(_) => stats.counted += 1,
                Registration::Pinned => stats.pinned += 1,
            }
        }
        stats
    }
}
