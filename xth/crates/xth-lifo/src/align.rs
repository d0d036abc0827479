//! Alignment Utilities
//!
//! Every size handed out by the arena is a multiple of [`ALIGNMENT`].

use std::mem;

/// Allocation granularity (size of a double)
pub const ALIGNMENT: usize = mem::size_of::<f64>();

/// Alignment requested for chunk and big-block memory from the system
pub const CHUNK_ALIGN: usize = 16;

/// Largest single request the arena accepts
pub const MAX_ALLOC: usize = isize::MAX as usize - CHUNK_ALIGN;

/// Align value up to [`ALIGNMENT`]
///
/// Callers must check `value <= MAX_ALLOC` first.
///
/// # Examples
/// ```
/// use xth_lifo::align::align_up;
/// assert_eq!(align_up(100), 104);
/// assert_eq!(align_up(64), 64);
/// ```
#[inline]
pub const fn align_up(value: usize) -> usize {
    (value + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Align value down to [`ALIGNMENT`]
#[inline]
pub const fn align_down(value: usize) -> usize {
    value & !(ALIGNMENT - 1)
}

#[inline]
pub const fn is_aligned(value: usize) -> bool {
    value & (ALIGNMENT - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 8);
        assert_eq!(align_up(8), 8);
        assert_eq!(align_up(50), 56);
        assert_eq!(align_up(MAX_ALLOC) % ALIGNMENT, 0);
    }

    #[test]
    fn test_align_down() {
        assert_eq!(align_down(7), 0);
        assert_eq!(align_down(15), 8);
        assert_eq!(align_down(16), 16);
    }

    #[test]
    fn test_is_aligned() {
        assert!(is_aligned(0));
        assert!(is_aligned(24));
        assert!(!is_aligned(25));
    }
}
