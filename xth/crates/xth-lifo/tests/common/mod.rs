//! Test utilities for the arena test suite

#![allow(dead_code)]

use std::cell::Cell;
use std::ptr::NonNull;
use xth_lifo::{Lifo, LifoConfig, LifoFlags};

/// Chunk size used by most tests
pub const TEST_CHUNK_SIZE: usize = 8192;

/// Allocation alignment
pub const ALIGNMENT: usize = 8;

/// ============================================================================
/// ARENA FIXTURE
/// ============================================================================

/// Arena backed by the global heap with the test chunk size
pub fn arena() -> Lifo {
    Lifo::new(LifoConfig {
        chunk_size: TEST_CHUNK_SIZE,
        ..Default::default()
    })
    .expect("arena creation with default allocator should succeed")
}

thread_local! {
    static LIVE_BLOCKS: Cell<isize> = const { Cell::new(0) };
    static FAIL_AFTER: Cell<Option<usize>> = const { Cell::new(None) };
}

fn tracking_alloc(size: usize) -> Option<NonNull<u8>> {
    let allowed = FAIL_AFTER.with(|f| match f.get() {
        Some(0) => false,
        Some(n) => {
            f.set(Some(n - 1));
            true
        }
        None => true,
    });
    if !allowed {
        return None;
    }
    let ptr = xth_lifo::chunk::system_alloc(size)?;
    LIVE_BLOCKS.with(|l| l.set(l.get() + 1));
    Some(ptr)
}

unsafe fn tracking_free(ptr: NonNull<u8>, size: usize) {
    LIVE_BLOCKS.with(|l| l.set(l.get() - 1));
    xth_lifo::chunk::system_free(ptr, size)
}

/// Arena whose allocator counts live blocks on the current thread
pub fn tracked_arena(flags: LifoFlags) -> Lifo<xth_lifo::FnAllocator> {
    Lifo::with_fns(Some(tracking_alloc), Some(tracking_free), TEST_CHUNK_SIZE, flags)
        .expect("tracked arena creation should succeed")
}

/// Blocks currently held from the tracking allocator on this thread
pub fn live_blocks() -> isize {
    LIVE_BLOCKS.with(|l| l.get())
}

/// Let `n` more allocations succeed, then fail every one after
pub fn fail_after(n: usize) {
    FAIL_AFTER.with(|f| f.set(Some(n)));
}

pub fn stop_failing() {
    FAIL_AFTER.with(|f| f.set(None));
}

/// ============================================================================
/// ASSERTIONS
/// ============================================================================

pub fn assert_aligned(ptr: NonNull<u8>, context: &str) {
    assert_eq!(
        ptr.as_ptr() as usize % ALIGNMENT,
        0,
        "{}: address {:p} is not {}-byte aligned",
        context,
        ptr,
        ALIGNMENT
    );
}

/// Assert that no two `(address, len)` ranges overlap
pub fn assert_disjoint(ranges: &[(usize, usize)]) {
    let mut sorted = ranges.to_vec();
    sorted.sort_unstable();
    for pair in sorted.windows(2) {
        let (a, a_len) = pair[0];
        let (b, _) = pair[1];
        assert!(
            a + a_len <= b,
            "ranges {:#x}+{} and {:#x} overlap",
            a,
            a_len,
            b
        );
    }
}

pub fn fill_pattern(ptr: NonNull<u8>, len: usize, seed: u8) {
    for i in 0..len {
        unsafe { ptr.as_ptr().add(i).write(seed.wrapping_add(i as u8)) };
    }
}

pub fn assert_pattern(ptr: NonNull<u8>, len: usize, seed: u8) {
    for i in 0..len {
        let byte = unsafe { ptr.as_ptr().add(i).read() };
        assert_eq!(byte, seed.wrapping_add(i as u8), "byte {} differs", i);
    }
}
