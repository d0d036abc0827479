//! Pointer Registry - registration and verification of tagged addresses
//!
//! The registry records which raw addresses are live and what they are
//! tagged as. It does not own the memory behind those addresses; it only
//! tracks bookkeeping the caller hands it.
//!
//! # Registration modes
//!
//! 1. **Uncounted** - one owner. Registering again with a compatible tag is
//!    a no-op, one unregister removes the record.
//! 2. **Counted** - each compatible registration adds a reference, each
//!    unregister drops one.
//! 3. **Pinned** - untagged and immune to unregister. Only invalidation
//!    removes it, and pinning an address always wins over other modes.
//!
//! Re-registering with an incompatible tag, or in a different mode, is
//! handled by the configured [`ReregisterPolicy`].
//!
//! # Thread Safety
//!
//! No internal locking. A registry is `Send`; callers that share one put it
//! behind a mutex.

use crate::config::{RegistryConfig, ReregisterPolicy};
use crate::error::{PointerError, Result};
use crate::record::{PointerRecord, Registration};
use crate::subtag::{SubtagTable, TagRelation};
use crate::tagged::{PointerSource, TaggedPtr};
use indexmap::map::Entry;
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use xth_util::atom::{AtomTable, Tag};

type PointerMap = IndexMap<usize, PointerRecord, BuildHasherDefault<FxHasher>>;

/// How much of a record's count an unregister drops.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Release {
    /// Drop one reference
    One,
    /// Remove the record whatever its count or pin
    All,
}

/// Per-context table of registered pointers and tag relations.
///
/// # Examples
///
/// ```rust
/// use xth_ptr::{PointerRegistry, RegistryConfig, RegistrationStatus};
///
/// let mut registry = PointerRegistry::new(RegistryConfig::default())?;
/// let dog = registry.tag("Dog");
/// let animal = registry.tag("Animal");
/// registry.subtag_define(&dog, Some(&animal));
///
/// registry.register(0x1000, Some(&dog))?;
/// assert_eq!(
///     registry.verify_tagged(0x1000, Some(&animal))?,
///     RegistrationStatus::Derived
/// );
/// # Ok::<(), xth_ptr::PointerError>(())
/// ```
#[derive(Debug)]
pub struct PointerRegistry {
    pub(crate) pointers: PointerMap,
    pub(crate) subtags: SubtagTable,
    atoms: AtomTable,
    config: RegistryConfig,
}

impl Default for PointerRegistry {
    fn default() -> Self {
        let config = RegistryConfig::default();
        Self {
            pointers: PointerMap::default(),
            subtags: SubtagTable::new(config.subtag_depth_limit),
            atoms: AtomTable::new(),
            config,
        }
    }
}

impl PointerRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pointers: PointerMap::default(),
            subtags: SubtagTable::new(config.subtag_depth_limit),
            atoms: AtomTable::new(),
            config,
        })
    }

    /// Registry configured from the environment
    pub fn from_env() -> Result<Self> {
        Self::new(RegistryConfig::from_env()?)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Intern `text` in this registry's atom table
    pub fn tag(&mut self, text: &str) -> Tag {
        self.atoms.intern(text)
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    // ------------------------------------------------------------------
    // Unwrapping
    // ------------------------------------------------------------------

    /// Unwrap `value`, checking its tag against `expected`
    ///
    /// A null pointer with no tag passes any check.
    pub fn unwrap_tagged<V: PointerSource + ?Sized>(
        &self,
        value: &V,
        expected: Option<&Tag>,
    ) -> Result<(usize, Option<Tag>)> {
        let ptr = value.to_tagged()?;
        let checked = expected.is_some() && (!ptr.is_null() || ptr.tag().is_some());
        if checked && !self.subtags.compatible(ptr.tag(), expected) {
            return Err(PointerError::mismatch(expected, ptr.tag()));
        }
        Ok(ptr.into_parts())
    }

    /// Unwrap `value` if its tag matches any of `tags`
    ///
    /// On failure the error names the last tag tried.
    pub fn unwrap_any_of<V: PointerSource + ?Sized>(
        &self,
        value: &V,
        tags: &[Tag],
    ) -> Result<(usize, Option<Tag>)> {
        let ptr = value.to_tagged()?;
        for tag in tags {
            if let Ok(parts) = self.unwrap_tagged(&ptr, Some(tag)) {
                return Ok(parts);
            }
        }
        Err(PointerError::mismatch(tags.last(), ptr.tag()))
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register `address` with a single owner
    pub fn register(&mut self, address: usize, tag: Option<&Tag>) -> Result<TaggedPtr> {
        self.register_as(address, tag, Registration::Uncounted)
    }

    /// Register `address`, adding a reference if already registered compatibly
    pub fn register_counted(&mut self, address: usize, tag: Option<&Tag>) -> Result<TaggedPtr> {
        self.register_as(address, tag, Registration::Counted(1))
    }

    /// Pin `address`; pins carry no tag
    pub fn pin(&mut self, address: usize) -> Result<TaggedPtr> {
        self.register_as(address, None, Registration::Pinned)
    }

    fn register_as(
        &mut self,
        address: usize,
        tag: Option<&Tag>,
        registration: Registration,
    ) -> Result<TaggedPtr> {
        if address == 0 {
            return Err(PointerError::NullPointer);
        }
        let value = TaggedPtr::new(address, tag.cloned());

        let record = match self.pointers.entry(address) {
            Entry::Vacant(slot) => {
                slot.insert(PointerRecord::new(value.tag().cloned(), registration));
                return Ok(value);
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        if record.registration.is_pinned() {
            return Ok(value);
        }
        if registration.is_pinned() {
            *record = PointerRecord::new(None, Registration::Pinned);
            return Ok(value);
        }

        let compatible = self.subtags.compatible(value.tag(), record.tag.as_ref());
        match (record.registration, registration) {
            (Registration::Uncounted, Registration::Uncounted) if compatible => {}
            (Registration::Counted(n), Registration::Counted(_)) if compatible => {
                record.registration = Registration::Counted(n.saturating_add(1));
            }
            _ => match self.config.reregister_policy {
                ReregisterPolicy::Overwrite => {
                    log::debug!(
                        "pointer {}: overwriting {} registration {:?}",
                        value,
                        record.registration.label(),
                        record.tag
                    );
                    *record = PointerRecord::new(value.tag().cloned(), registration);
                }
                ReregisterPolicy::Reject => {
                    let existing = TaggedPtr::new(address, record.tag.clone());
                    log::warn!("pointer {}: conflicts with registration {}", value, existing);
                    return Err(PointerError::RegistrationConflict {
                        value: value.to_string(),
                        existing: existing.to_string(),
                    });
                }
            },
        }
        Ok(value)
    }

    /// Drop one reference to `address`
    ///
    /// Pinned addresses are left alone. Fails if `address` has no record.
    pub fn unregister(&mut self, address: usize) -> Result<()> {
        self.release(address, None, Release::One).map(|_| ())
    }

    /// As [`unregister`](Self::unregister), but the registered tag must be
    /// compatible with `expected`
    pub fn unregister_tagged(&mut self, address: usize, expected: Option<&Tag>) -> Result<()> {
        self.release(address, expected, Release::One).map(|_| ())
    }

    /// Remove `address` whatever its count or pin
    ///
    /// Returns whether a record was removed. Absence is not an error.
    pub fn invalidate(&mut self, address: usize) -> bool {
        self.pointers.shift_remove(&address).is_some()
    }

    /// As [`invalidate`](Self::invalidate), but the registered tag must be
    /// compatible with `expected`
    pub fn invalidate_tagged(&mut self, address: usize, expected: Option<&Tag>) -> Result<bool> {
        self.release(address, expected, Release::All)
    }

    fn release(&mut self, address: usize, expected: Option<&Tag>, release: Release) -> Result<bool> {
        let Some(record) = self.pointers.get_mut(&address) else {
            return match release {
                Release::All => Ok(false),
                Release::One => Err(PointerError::not_registered(address, expected)),
            };
        };
        if !self.subtags.compatible(record.tag.as_ref(), expected) {
            return Err(PointerError::mismatch(expected, record.tag.as_ref()));
        }

        let remove = match (release, record.registration) {
            (Release::All, _) => true,
            (Release::One, Registration::Pinned) => false,
            (Release::One, Registration::Counted(n)) if n > 1 => {
                record.registration = Registration::Counted(n - 1);
                false
            }
            (Release::One, _) => true,
        };
        if remove {
            self.pointers.shift_remove(&address);
        }
        Ok(remove)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether `address` has a record. NULL is never registered.
    pub fn registered(&self, address: usize) -> bool {
        address != 0 && self.pointers.contains_key(&address)
    }

    /// Fail unless `address` is registered
    pub fn verify(&self, address: usize) -> Result<()> {
        if address == 0 {
            return Err(PointerError::NullPointer);
        }
        if self.pointers.contains_key(&address) {
            Ok(())
        } else {
            Err(PointerError::not_registered(address, None))
        }
    }

    /// Check that `address` is registered with a tag compatible with
    /// `expected`
    ///
    /// Returns [`Ok`](crate::RegistrationStatus::Ok) for an exact match and
    /// [`Derived`](crate::RegistrationStatus::Derived) when the registered
    /// tag is a descendant of `expected`.
    pub fn verify_tagged(
        &self,
        address: usize,
        expected: Option<&Tag>,
    ) -> Result<crate::RegistrationStatus> {
        let Some(record) = self.pointers.get(&address) else {
            return Err(PointerError::not_registered(address, expected));
        };
        if !self.subtags.compatible(record.tag.as_ref(), expected) {
            return Err(PointerError::mismatch(expected, record.tag.as_ref()));
        }
        Ok(self.registration_status(address, expected))
    }

    pub fn record(&self, address: usize) -> Option<&PointerRecord> {
        self.pointers.get(&address)
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Every registered pointer, in registration order
    ///
    /// With a filter only records with exactly that tag are listed; an empty
    /// filter tag lists the untagged records.
    pub fn enumerate(&self, filter: Option<&Tag>) -> Vec<TaggedPtr> {
        self.pointers
            .iter()
            .filter(|(_, record)| match filter {
                None => true,
                Some(tag) if tag.is_empty() => record.tag.is_none(),
                Some(tag) => record.tag.as_ref() == Some(tag),
            })
            .map(|(&address, record)| TaggedPtr::new(address, record.tag.clone()))
            .collect()
    }

    /// Forget every pointer and subtag definition
    pub fn clear(&mut self) {
        log::debug!(
            "pointer registry: clearing {} pointers and {} subtags",
            self.pointers.len(),
            self.subtags.len()
        );
        self.pointers.clear();
        self.subtags.clear();
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// Unwrap `value`, then verify its registration against its own tag
    pub fn obj_verify<V: PointerSource + ?Sized>(
        &self,
        value: &V,
        expected: Option<&Tag>,
    ) -> Result<(usize, Option<Tag>)> {
        let (address, tag) = self.unwrap_tagged(value, expected)?;
        if address == 0 {
            return Err(PointerError::NullPointer);
        }
        self.verify_tagged(address, tag.as_ref())?;
        Ok((address, tag))
    }

    /// Verify `value` against the first of `tags` that its tag matches
    pub fn verify_any_of<V: PointerSource + ?Sized>(
        &self,
        value: &V,
        tags: &[Tag],
    ) -> Result<(usize, Option<Tag>)> {
        let (address, tag) = self.unwrap_any_of(value, tags)?;
        self.verify_tagged(address, tag.as_ref())?;
        Ok((address, tag))
    }

    /// Unwrap `value` and drop one reference to it. NULL is a no-op.
    pub fn obj_unregister<V: PointerSource + ?Sized>(
        &mut self,
        value: &V,
        expected: Option<&Tag>,
    ) -> Result<usize> {
        let (address, tag) = self.unwrap_tagged(value, expected)?;
        if address != 0 {
            self.unregister_tagged(address, tag.as_ref())?;
        }
        Ok(address)
    }

    /// Unregister `value` if its tag matches any of `tags`
    pub fn unregister_any_of<V: PointerSource + ?Sized>(
        &mut self,
        value: &V,
        tags: &[Tag],
    ) -> Result<usize> {
        let (address, tag) = self.unwrap_any_of(value, tags)?;
        self.unregister_tagged(address, tag.as_ref())?;
        Ok(address)
    }

    /// Retag `value` as `new_tag`
    ///
    /// The old and new tags must be related in one direction or the other.
    /// A registered, unpinned pointer has its record retagged too.
    pub fn cast<V: PointerSource + ?Sized>(
        &mut self,
        value: &V,
        new_tag: Option<&Tag>,
    ) -> Result<TaggedPtr> {
        let (address, old_tag) = value.to_tagged()?.into_parts();
        let old_tag = old_tag.as_ref();
        let related = |a: Option<&Tag>, b: Option<&Tag>| {
            self.subtags.compatible(a, b) || self.subtags.compatible(b, a)
        };

        match self.pointers.get(&address) {
            Some(record) => {
                if !related(old_tag, record.tag.as_ref()) {
                    return Err(PointerError::mismatch(record.tag.as_ref(), old_tag));
                }
            }
            None if self.config.cast_requires_registration && address != 0 => {
                return Err(PointerError::not_registered(address, old_tag));
            }
            None => {}
        }
        if !related(old_tag, new_tag) {
            return Err(PointerError::mismatch(new_tag, old_tag));
        }

        if let Some(record) = self.pointers.get_mut(&address) {
            if !record.registration.is_pinned() {
                record.tag = new_tag.cloned();
            }
        }
        Ok(TaggedPtr::new(address, new_tag.cloned()))
    }

    // ------------------------------------------------------------------
    // Subtags
    // ------------------------------------------------------------------

    /// Declare `supertag` as the direct supertag of `subtag`
    pub fn subtag_define(&mut self, subtag: &Tag, supertag: Option<&Tag>) {
        self.subtags.define(subtag, supertag);
    }

    /// Remove the supertag of `tag`, if any
    pub fn subtag_remove(&mut self, tag: &Tag) {
        self.subtags.remove(tag);
    }

    /// Every (subtag, supertag) definition
    pub fn subtags(&self) -> Vec<(Tag, Tag)> {
        self.subtags.edges()
    }

    /// Classify `tag` against `expected`
    pub fn tag_relation(&self, tag: Option<&Tag>, expected: Option<&Tag>) -> TagRelation {
        self.subtags.relation(tag, expected)
    }
}
