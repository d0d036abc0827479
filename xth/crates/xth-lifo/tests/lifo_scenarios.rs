//! Arena behaviour tests - allocation, marks and resizing end to end
//!
//! ============================================================================
//! EACH TEST PINS DOWN ONE OBSERVABLE ARENA GUARANTEE
//! ============================================================================

mod common;

use common::{
    arena, assert_aligned, assert_disjoint, assert_pattern, fail_after, fill_pattern,
    live_blocks, stop_failing, tracked_arena, ALIGNMENT, TEST_CHUNK_SIZE,
};
use xth_lifo::{LifoError, LifoFlags};

/// ============================================================================
/// BASIC ALLOCATION
/// ============================================================================

/// Two small allocations land side by side in the first chunk
///
/// **Bug this finds:** Wrong rounding, allocations straying into new chunks
/// **Invariant verified:** Rounded, non-overlapping regions; arena stays valid
#[test]
fn test_two_allocations_in_first_chunk() {
    // Arrange
    let mut lifo = arena();
    assert!(lifo.validate().is_ok());

    // Act
    let a = lifo.alloc(100).unwrap();
    assert!(lifo.validate().is_ok());
    let b = lifo.alloc(50).unwrap();

    // Assert
    assert_aligned(a, "first allocation");
    assert_aligned(b, "second allocation");
    assert_disjoint(&[(a.as_ptr() as usize, 104), (b.as_ptr() as usize, 56)]);
    assert_eq!(lifo.stats().chunks, 1);
    assert_eq!(lifo.stats().big_blocks, 0);
    assert!(lifo.validate().is_ok());
}

/// Every allocation between two marks is disjoint from every other
///
/// **Bug this finds:** Big-block path reusing chunk space, off-by-one bumps
/// **Invariant verified:** Pairwise disjoint ranges, each rounded to alignment
#[test]
fn test_property_allocations_never_overlap() {
    use proptest::prelude::*;

    proptest!(|(sizes in proptest::collection::vec(1usize..6000, 1..40))| {
        let mut lifo = arena();
        let mark = lifo.push_mark().unwrap();
        let mut ranges = Vec::new();
        for &size in &sizes {
            let p = lifo.alloc(size).unwrap();
            let rounded = (size + ALIGNMENT - 1) / ALIGNMENT * ALIGNMENT;
            prop_assert_eq!(lifo.last_alloc_size(), Some(rounded));
            ranges.push((p.as_ptr() as usize, rounded));
        }
        assert_disjoint(&ranges);
        prop_assert!(lifo.validate().is_ok());
        lifo.pop_mark(mark).unwrap();
    });
}

/// ============================================================================
/// MARK DISCIPLINE
/// ============================================================================

/// push/alloc/pop restores the free space exactly
///
/// **Bug this finds:** Pops that leak chunk space or fail to restore offsets
/// **Invariant verified:** remaining() is identical before push and after pop
#[test]
fn test_property_mark_round_trip() {
    use proptest::prelude::*;

    proptest!(|(prefix in 1usize..4000, n in 1usize..40000)| {
        let mut lifo = arena();
        lifo.alloc(prefix).unwrap();
        let before = lifo.remaining();
        let stats_before = lifo.stats();

        let mark = lifo.push_mark().unwrap();
        lifo.alloc(n).unwrap();
        lifo.pop_mark(mark).unwrap();

        prop_assert_eq!(lifo.remaining(), before);
        prop_assert_eq!(lifo.stats(), stats_before);
    });
}

/// Popping releases every block obtained under the mark
///
/// **Bug this finds:** Leaked chunks or big blocks on pop
/// **Invariant verified:** Allocator sees all blocks returned
#[test]
fn test_pop_returns_blocks_to_allocator() {
    let mut lifo = tracked_arena(LifoFlags::NONE);
    let baseline = live_blocks();

    let mark = lifo.push_mark().unwrap();
    for _ in 0..20 {
        lifo.alloc(3000).unwrap();
    }
    lifo.alloc(50_000).unwrap();
    assert!(live_blocks() > baseline);

    lifo.pop_mark(mark).unwrap();
    assert_eq!(live_blocks(), baseline);

    lifo.close();
    assert_eq!(live_blocks(), 0);
}

/// Nested frames unwind one at a time
///
/// **Bug this finds:** pop_frame popping too much or too little
/// **Invariant verified:** Each pop_frame restores the enclosing frame
#[test]
fn test_nested_frames() {
    let mut lifo = arena();
    let mut remaining = Vec::new();

    for depth in 0..5 {
        remaining.push(lifo.remaining());
        let p = lifo.push_frame(500 * (depth + 1)).unwrap();
        fill_pattern(p, 500, depth as u8);
    }
    assert_eq!(lifo.mark_depth(), 5);

    while let Some(expected) = remaining.pop() {
        lifo.pop_frame();
        assert_eq!(lifo.remaining(), expected);
    }
    assert_eq!(lifo.mark_depth(), 0);
    assert!(lifo.validate().is_ok());
}

/// ============================================================================
/// EXPAND / SHRINK
/// ============================================================================

/// Expanding with room to spare keeps the address
///
/// **Bug this finds:** Needless copies on the fast path
/// **Invariant verified:** Same address, size grows by the rounded increment
#[test]
fn test_expand_in_place_keeps_address() {
    let mut lifo = arena();
    let p = lifo.alloc(128).unwrap();
    fill_pattern(p, 128, 3);

    let q = lifo.expand_last(100, false).unwrap();

    assert_eq!(p, q);
    assert_eq!(lifo.last_alloc_size(), Some(232));
    assert_pattern(q, 128, 3);
}

/// Expanding without room moves the data
///
/// **Bug this finds:** Lost contents on relocation, overlapping copies
/// **Invariant verified:** New address, old bytes preserved as a prefix
#[test]
fn test_expand_with_copy_preserves_prefix() {
    let mut lifo = arena();
    let fill = lifo.remaining() - 2000;
    lifo.alloc(fill).unwrap();

    let p = lifo.alloc(1900).unwrap();
    fill_pattern(p, 1900, 42);

    let q = lifo.expand_last(4000, false).unwrap();

    assert_ne!(p, q);
    assert_pattern(q, 1900, 42);
    assert!(lifo.last_alloc_size().unwrap() >= 1900 + 4000);
    assert!(lifo.validate().is_ok());
}

/// Growing a buffer repeatedly behaves like a vector
///
/// **Bug this finds:** Big-block reallocation leaking or corrupting data
/// **Invariant verified:** Contents survive many expansions
#[test]
fn test_repeated_growth() {
    let mut lifo = tracked_arena(LifoFlags::NONE);
    let mark = lifo.push_mark().unwrap();

    let mut len = 64;
    let mut p = lifo.alloc(len).unwrap();
    fill_pattern(p, len, 9);
    while len < 200_000 {
        p = lifo.expand_last(len, false).unwrap();
        assert_pattern(p, len, 9);
        len *= 2;
        fill_pattern(p, len, 9);
    }

    lifo.pop_mark(mark).unwrap();
    assert!(lifo.validate().is_ok());
    assert_eq!(lifo.stats().big_blocks, 0);
}

/// Resizing down then up stays in place within the chunk
#[test]
fn test_resize_round_trip() {
    let mut lifo = arena();
    let p = lifo.alloc(1000).unwrap();
    assert_eq!(lifo.resize_last(10, true).unwrap(), p);
    assert_eq!(lifo.resize_last(1000, true).unwrap(), p);
    assert_eq!(lifo.last_alloc_size(), Some(1000));
}

/// ============================================================================
/// FAILURE POLICY
/// ============================================================================

/// Allocation failures come back as errors and leave the arena usable
///
/// **Bug this finds:** Half-applied state after a failed allocation
/// **Invariant verified:** OutOfMemory error, arena still validates
#[test]
fn test_out_of_memory_is_reported() {
    let mut lifo = tracked_arena(LifoFlags::NONE);
    fail_after(0);

    let err = lifo.alloc(TEST_CHUNK_SIZE * 4).unwrap_err();
    assert!(matches!(err, LifoError::OutOfMemory { .. }));
    assert!(err.is_recoverable());
    assert!(lifo.validate().is_ok());
    assert!(lifo.alloc(64).is_ok());

    stop_failing();
}

/// The panic policy turns allocation failure into a panic
#[test]
#[should_panic(expected = "memlifo")]
fn test_out_of_memory_panics_when_asked() {
    let mut lifo = tracked_arena(LifoFlags::PANIC_ON_FAIL);
    fail_after(0);
    let _ = lifo.alloc(TEST_CHUNK_SIZE * 4);
}

/// expand_last reports failure even under the panic policy
#[test]
fn test_expand_failure_does_not_panic() {
    let mut lifo = tracked_arena(LifoFlags::PANIC_ON_FAIL);
    let p = lifo.alloc(64).unwrap();
    fail_after(0);

    let result = lifo.expand_last(TEST_CHUNK_SIZE * 4, false);
    stop_failing();

    assert!(matches!(result, Err(LifoError::OutOfMemory { .. })));
    assert_eq!(lifo.last_alloc_size(), Some(64));
    assert_eq!(lifo.expand_last(8, true).unwrap(), p);
}
