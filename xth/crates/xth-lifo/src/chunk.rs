//! Chunk Allocation - the arena's plug point for backing memory
//!
//! The arena never calls the global allocator directly. Every chunk and big
//! block is obtained through a [`ChunkAllocator`], so embedders can route
//! arena memory through a pool or a debugging allocator.

use crate::align::{ALIGNMENT, CHUNK_ALIGN};
use crate::error::{LifoError, Result};
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Source of chunk memory.
///
/// Returned blocks must be aligned to at least 8 bytes.
pub trait ChunkAllocator {
    /// Allocate `size` bytes, or `None` on failure.
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Release a block returned by [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator with the same
    /// `size`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize);
}

/// Default allocator backed by the global heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl ChunkAllocator for SystemAllocator {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        system_alloc(size)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        system_free(ptr, size)
    }
}

/// Allocate function for [`FnAllocator`]
pub type AllocFn = fn(usize) -> Option<NonNull<u8>>;

/// Free function for [`FnAllocator`]
pub type FreeFn = unsafe fn(NonNull<u8>, usize);

/// Allocator built from a plain allocate/free function pair.
#[derive(Debug, Clone, Copy)]
pub struct FnAllocator {
    alloc_fn: AllocFn,
    free_fn: FreeFn,
}

impl FnAllocator {
    /// Build from an optional function pair.
    ///
    /// With no allocate function the global heap is used. An allocate
    /// function without a free function is rejected.
    pub fn new(alloc_fn: Option<AllocFn>, free_fn: Option<FreeFn>) -> Result<Self> {
        match (alloc_fn, free_fn) {
            (None, _) => Ok(Self {
                alloc_fn: system_alloc,
                free_fn: system_free,
            }),
            (Some(_), None) => Err(LifoError::InvalidParam(
                "allocate function supplied without a free function".to_string(),
            )),
            (Some(alloc_fn), Some(free_fn)) => Ok(Self { alloc_fn, free_fn }),
        }
    }
}

impl Default for FnAllocator {
    fn default() -> Self {
        Self {
            alloc_fn: system_alloc,
            free_fn: system_free,
        }
    }
}

impl ChunkAllocator for FnAllocator {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let ptr = (self.alloc_fn)(size)?;
        debug_assert_eq!(ptr.as_ptr() as usize % ALIGNMENT, 0);
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        (self.free_fn)(ptr, size)
    }
}

/// Allocate from the global heap with chunk alignment.
pub fn system_alloc(size: usize) -> Option<NonNull<u8>> {
    let layout = Layout::from_size_align(size.max(1), CHUNK_ALIGN).ok()?;
    // SAFETY: layout has non-zero size.
    NonNull::new(unsafe { alloc::alloc(layout) })
}

/// Release memory obtained from [`system_alloc`].
///
/// # Safety
///
/// `ptr` must have been returned by `system_alloc(size)`.
pub unsafe fn system_free(ptr: NonNull<u8>, size: usize) {
    // The same layout was accepted when the block was allocated.
    let layout = Layout::from_size_align_unchecked(size.max(1), CHUNK_ALIGN);
    alloc::dealloc(ptr.as_ptr(), layout)
}

/// A block of backing memory: a chunk or a big block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
    pub(crate) ptr: NonNull<u8>,
    pub(crate) size: usize,
}

impl Block {
    #[inline]
    pub(crate) fn start(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// One past the last byte
    #[inline]
    pub(crate) fn end(&self) -> usize {
        self.start() + self.size
    }

    #[inline]
    pub(crate) fn contains(&self, addr: usize) -> bool {
        addr >= self.start() && addr < self.end()
    }

    /// Pointer `offset` bytes into the block
    ///
    /// # Safety
    ///
    /// `offset` must be at most `self.size`.
    #[inline]
    pub(crate) unsafe fn at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.size);
        NonNull::new_unchecked(self.ptr.as_ptr().add(offset))
    }
}
