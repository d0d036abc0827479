//! Test utilities for the registry test suite

#![allow(dead_code)]

use xth_ptr::{PointerRegistry, RegistryConfig, ReregisterPolicy, Tag};

/// Addresses used across tests; any non-zero value works
pub const P1: usize = 0x7f00_1000;
pub const P2: usize = 0x7f00_2000;
pub const P3: usize = 0x7f00_3000;

/// ============================================================================
/// REGISTRY FIXTURE
/// ============================================================================

/// Registry with a small tag hierarchy
///
/// ```text
/// Dog ──▶ Mammal ──▶ Animal        Car
/// ```
pub struct Zoo {
    pub registry: PointerRegistry,
    pub dog: Tag,
    pub mammal: Tag,
    pub animal: Tag,
    pub car: Tag,
}

impl Zoo {
    pub fn new() -> Self {
        Self::with_policy(ReregisterPolicy::Overwrite)
    }

    pub fn with_policy(policy: ReregisterPolicy) -> Self {
        let mut registry = PointerRegistry::new(RegistryConfig {
            reregister_policy: policy,
            ..Default::default()
        })
        .expect("default registry config is valid");
        let dog = registry.tag("Dog");
        let mammal = registry.tag("Mammal");
        let animal = registry.tag("Animal");
        let car = registry.tag("Car");
        registry.subtag_define(&dog, Some(&mammal));
        registry.subtag_define(&mammal, Some(&animal));
        Self {
            registry,
            dog,
            mammal,
            animal,
            car,
        }
    }
}

/// Hex digits of an address as they appear in the text form
pub fn hex(address: usize) -> String {
    format!("{:0width$x}", address, width = 2 * std::mem::size_of::<usize>())
}
