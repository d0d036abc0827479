//! Growing and shrinking the most recent allocation
//!
//! Only the last allocation made under the current mark can be resized.
//! Mainstream allocations grow in place while the current chunk has room;
//! otherwise the contents move to a new block. Big blocks are reallocated
//! and the old block is released. Shrinking a big block does nothing.

use crate::align::{align_down, align_up, MAX_ALLOC};
use crate::arena::Lifo;
use crate::chunk::ChunkAllocator;
use crate::error::{LifoError, Result};
use std::mem;
use std::ptr::{self, NonNull};

impl<A: ChunkAllocator> Lifo<A> {
    /// Grow the last allocation by `increment` bytes
    ///
    /// Returns the (possibly moved) allocation, whose first bytes are the
    /// old contents. With `in_place_only`, fails instead of moving. If
    /// nothing was allocated since the last mark this is `alloc(increment)`.
    ///
    /// Never panics, whatever the arena's failure policy.
    pub fn expand_last(&mut self, increment: usize, in_place_only: bool) -> Result<NonNull<u8>> {
        let Some(last) = self.top().last_alloc else {
            return self.alloc_raw(increment, false).map(|(ptr, _)| ptr);
        };
        if increment > MAX_ALLOC {
            return Err(LifoError::InvalidSize { size: increment });
        }
        let incr = align_up(increment);
        let is_big = self.is_big_block(last);

        if !is_big && self.remaining() >= incr {
            self.top_mut().free += incr;
            return Ok(last);
        }

        if in_place_only {
            return Err(LifoError::CannotExpandInPlace { increment });
        }

        let old_size = self.last_size(last, is_big);
        let new_size = old_size
            .checked_add(incr)
            .filter(|&n| n <= MAX_ALLOC)
            .ok_or(LifoError::InvalidSize { size: increment })?;

        if is_big {
            let block = self.acquire(new_size)?;
            // SAFETY: distinct blocks, old block holds old_size bytes
            unsafe { ptr::copy_nonoverlapping(last.as_ptr(), block.ptr.as_ptr(), old_size) };
            let slot = self.top().big_count - 1;
            let old = mem::replace(&mut self.big_blocks[slot], block);
            // SAFETY: old block no longer on the stack
            unsafe { self.release(old) };
            self.top_mut().last_alloc = Some(block.ptr);
            Ok(block.ptr)
        } else {
            // The fast path failed, so this lands in a new chunk or big block
            let (moved, _) = self.alloc_raw(new_size, false)?;
            // SAFETY: old allocation stays live until the mark is popped
            unsafe { ptr::copy_nonoverlapping(last.as_ptr(), moved.as_ptr(), old_size) };
            Ok(moved)
        }
    }

    /// Shrink the last allocation by `decrement` bytes, in place
    ///
    /// The decrement is rounded down to the alignment and ignored when it
    /// exceeds the allocation's size. Big blocks are left as they are.
    pub fn shrink_last(&mut self, decrement: usize) -> Result<NonNull<u8>> {
        let last = self.top().last_alloc.ok_or(LifoError::NoLastAllocation)?;
        if !self.is_big_block(last) {
            let old_size = self.last_size(last, false);
            let decr = align_down(decrement);
            if decr <= old_size {
                self.top_mut().free -= decr;
            }
        }
        Ok(last)
    }

    /// Resize the last allocation to `new_size` bytes
    pub fn resize_last(&mut self, new_size: usize, in_place_only: bool) -> Result<NonNull<u8>> {
        let last = self.top().last_alloc.ok_or(LifoError::NoLastAllocation)?;
        if new_size > MAX_ALLOC {
            return Err(LifoError::InvalidSize { size: new_size });
        }
        let new_size = align_up(new_size);
        let is_big = self.is_big_block(last);
        let old_size = self.last_size(last, is_big);

        if !is_big && new_size <= old_size {
            self.top_mut().free -= old_size - new_size;
            return Ok(last);
        }

        if old_size >= new_size {
            self.shrink_last(old_size - new_size)
        } else {
            self.expand_last(new_size - old_size, in_place_only)
        }
    }

    /// Current size of the last allocation
    pub fn last_alloc_size(&self) -> Option<usize> {
        let last = self.top().last_alloc?;
        Some(self.last_size(last, self.is_big_block(last)))
    }

    fn is_big_block(&self, ptr: NonNull<u8>) -> bool {
        let big_count = self.top().big_count;
        big_count > 0 && self.big_blocks[big_count - 1].ptr == ptr
    }

    fn last_size(&self, last: NonNull<u8>, is_big: bool) -> usize {
        if is_big {
            self.big_blocks[self.top().big_count - 1].size
        } else {
            let offset = last.as_ptr() as usize - self.current_chunk().start();
            self.top().free - offset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LifoConfig, LifoFlags};

    fn arena() -> Lifo {
        Lifo::new(LifoConfig {
            chunk_size: 8192,
            ..Default::default()
        })
        .unwrap()
    }

    fn fill(p: NonNull<u8>, len: usize) {
        for i in 0..len {
            unsafe { p.as_ptr().add(i).write(i as u8) };
        }
    }

    fn check(p: NonNull<u8>, len: usize) {
        for i in 0..len {
            assert_eq!(unsafe { p.as_ptr().add(i).read() }, i as u8);
        }
    }

    // ========================================================================
    // EXPAND TESTS
    // ========================================================================

    #[test]
    fn test_expand_in_place() {
        let mut lifo = arena();
        let p = lifo.alloc(64).unwrap();
        let before = lifo.remaining();

        let q = lifo.expand_last(30, true).unwrap();
        assert_eq!(p, q);
        assert_eq!(lifo.remaining(), before - 32);
        assert_eq!(lifo.last_alloc_size(), Some(96));
    }

    #[test]
    fn test_expand_moves_when_chunk_full() {
        let mut lifo = arena();
        let remaining = lifo.remaining();
        let p = lifo.alloc(remaining - 16).unwrap();
        fill(p, 200);

        assert_eq!(
            lifo.expand_last(64, true),
            Err(LifoError::CannotExpandInPlace { increment: 64 })
        );
        let q = lifo.expand_last(64, false).unwrap();
        assert_ne!(p, q);
        check(q, 200);
        assert_eq!(lifo.last_alloc_size(), Some(remaining - 16 + 64));
    }

    #[test]
    fn test_expand_big_block_reallocates() {
        let mut lifo = arena();
        let remaining = lifo.remaining();
        let p = lifo.alloc(remaining + 8).unwrap();
        fill(p, 100);

        let q = lifo.expand_last(8, false).unwrap();
        assert_ne!(p, q);
        check(q, 100);
        assert_eq!(lifo.big_blocks.len(), 1);
        assert_eq!(lifo.big_blocks[0].ptr, q);
        assert_eq!(lifo.last_alloc_size(), Some(remaining + 16));
    }

    #[test]
    fn test_expand_big_block_in_place_fails() {
        let mut lifo = arena();
        let remaining = lifo.remaining();
        lifo.alloc(remaining + 8).unwrap();
        assert!(lifo.expand_last(8, true).is_err());
    }

    #[test]
    fn test_expand_without_last_alloc_allocates() {
        let mut lifo = arena();
        lifo.push_mark().unwrap();
        let before = lifo.remaining();
        let p = lifo.expand_last(40, true).unwrap();
        assert_eq!(lifo.top().last_alloc, Some(p));
        assert_eq!(lifo.remaining(), before - 40);
    }

    #[test]
    fn test_expand_never_panics() {
        let mut lifo = Lifo::new(LifoConfig::with_hint(8192, LifoFlags::PANIC_ON_FAIL)).unwrap();
        lifo.alloc(8).unwrap();
        let remaining = lifo.remaining();
        let err = lifo.expand_last(remaining + 8, true).unwrap_err();
        assert!(matches!(err, LifoError::CannotExpandInPlace { .. }));
        assert!(lifo.expand_last(usize::MAX, false).is_err());
    }

    // ========================================================================
    // SHRINK / RESIZE TESTS
    // ========================================================================

    #[test]
    fn test_shrink_rounds_down() {
        let mut lifo = arena();
        let p = lifo.alloc(64).unwrap();
        let before = lifo.remaining();

        assert_eq!(lifo.shrink_last(15).unwrap(), p);
        assert_eq!(lifo.remaining(), before + 8);
        assert_eq!(lifo.last_alloc_size(), Some(56));
    }

    #[test]
    fn test_shrink_past_size_is_ignored() {
        let mut lifo = arena();
        lifo.alloc(16).unwrap();
        let before = lifo.remaining();
        lifo.shrink_last(64).unwrap();
        assert_eq!(lifo.remaining(), before);
    }

    #[test]
    fn test_shrink_big_block_is_noop() {
        let mut lifo = arena();
        let remaining = lifo.remaining();
        let p = lifo.alloc(remaining + 8).unwrap();
        assert_eq!(lifo.shrink_last(8).unwrap(), p);
        assert_eq!(lifo.last_alloc_size(), Some(remaining + 8));
    }

    #[test]
    fn test_shrink_and_resize_need_last_alloc() {
        let mut lifo = arena();
        assert_eq!(lifo.shrink_last(8), Err(LifoError::NoLastAllocation));
        assert_eq!(lifo.resize_last(8, false), Err(LifoError::NoLastAllocation));
        assert_eq!(lifo.last_alloc_size(), None);
    }

    #[test]
    fn test_resize_both_directions() {
        let mut lifo = arena();
        let p = lifo.alloc(100).unwrap();

        assert_eq!(lifo.resize_last(40, true).unwrap(), p);
        assert_eq!(lifo.last_alloc_size(), Some(40));

        assert_eq!(lifo.resize_last(300, true).unwrap(), p);
        assert_eq!(lifo.last_alloc_size(), Some(304));
    }

    #[test]
    fn test_resize_big_block_grows_by_copy() {
        let mut lifo = arena();
        let remaining = lifo.remaining();
        let p = lifo.alloc(remaining + 8).unwrap();
        fill(p, 64);

        let q = lifo.resize_last(remaining + 800, false).unwrap();
        check(q, 64);
        assert_eq!(lifo.last_alloc_size(), Some(align_up(remaining + 800)));

        // Smaller target on a big block keeps the block
        assert_eq!(lifo.resize_last(8, false).unwrap(), q);
    }
}
