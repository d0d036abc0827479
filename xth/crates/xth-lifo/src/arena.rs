//! Arena Core - chunked bump allocation
//!
//! The arena keeps a stack of chunks and a stack of big blocks. The topmost
//! mark records how much of each stack it owns and the free offset into its
//! current chunk, so allocation is a bump of that offset in the common case.
//!
//! # Allocation paths
//!
//! 1. **Fast path**: the request fits in the current chunk. Bump the free
//!    offset.
//! 2. **New chunk**: less than an eighth of a chunk is left. Start a fresh
//!    chunk (oversized when the request exceeds half a chunk) and carve the
//!    request from its start.
//! 3. **Big block**: otherwise the request gets its own block on the current
//!    mark's big-block stack and the free offset is left alone, so the
//!    remaining chunk space is not wasted.

use crate::align::{align_up, MAX_ALLOC};
use crate::chunk::{AllocFn, Block, ChunkAllocator, FnAllocator, FreeFn, SystemAllocator};
use crate::config::{LifoConfig, LifoFlags};
use crate::error::{LifoError, Result};
use std::mem;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) const LIFO_MAGIC: u32 = 0x4c69_666f;
pub(crate) const MARK_MAGIC: u32 = 0xa019_3d4f;

static NEXT_LIFO_ID: AtomicU64 = AtomicU64::new(1);

/// Saved arena state at a checkpoint.
#[derive(Debug, Clone)]
pub(crate) struct MarkState {
    pub(crate) magic: u32,
    /// 1 for the bottom mark, +1 per level
    pub(crate) seq: u32,
    /// Identity of the handle that refers to this mark
    pub(crate) id: u64,
    /// Owning arena
    pub(crate) lifo_id: u64,
    /// Chunks owned by this mark and everything below it
    pub(crate) chunk_count: usize,
    /// Big blocks owned by this mark and everything below it
    pub(crate) big_count: usize,
    /// Free offset into `chunks[chunk_count - 1]`
    pub(crate) free: usize,
    /// Most recent allocation, if any since the mark was pushed
    pub(crate) last_alloc: Option<NonNull<u8>>,
}

/// Chunk space consumed by each mark
pub(crate) const MARK_FOOTPRINT: usize = align_up(mem::size_of::<MarkState>());

/// Region-based LIFO allocator.
///
/// Memory handed out stays valid until the mark it was allocated under is
/// popped, or the arena is dropped. Callers never free individual blocks.
///
/// The arena is not internally synchronized and is neither `Send` nor
/// `Sync`; use one arena per thread.
///
/// # Examples
///
/// ```rust
/// use xth_lifo::{Lifo, LifoConfig};
///
/// let mut lifo = Lifo::new(LifoConfig::default()).unwrap();
/// let mark = lifo.push_mark().unwrap();
/// let p = lifo.alloc(100).unwrap();
/// unsafe { p.as_ptr().write_bytes(0, 100) };
/// lifo.pop_mark(mark).unwrap();
/// assert!(lifo.validate().is_ok());
/// ```
pub struct Lifo<A: ChunkAllocator = SystemAllocator> {
    pub(crate) magic: u32,
    pub(crate) id: u64,
    pub(crate) allocator: A,
    pub(crate) chunk_size: usize,
    pub(crate) flags: LifoFlags,
    pub(crate) chunks: Vec<Block>,
    pub(crate) big_blocks: Vec<Block>,
    /// `marks[0]` is the bottom mark; the last entry is current
    pub(crate) marks: Vec<MarkState>,
    pub(crate) bottom_id: u64,
    pub(crate) next_mark_id: u64,
}

impl Lifo<SystemAllocator> {
    /// Create an arena backed by the global heap
    pub fn new(config: LifoConfig) -> Result<Self> {
        Self::with_allocator(SystemAllocator, config)
    }
}

impl Lifo<FnAllocator> {
    /// Create an arena from an allocate/free function pair
    ///
    /// With `alloc_fn` of `None` the global heap is used. Supplying an
    /// allocate function without a free function is an
    /// [`InvalidParam`](LifoError::InvalidParam) error.
    pub fn with_fns(
        alloc_fn: Option<AllocFn>,
        free_fn: Option<FreeFn>,
        chunk_hint: usize,
        flags: LifoFlags,
    ) -> Result<Self> {
        let allocator = FnAllocator::new(alloc_fn, free_fn)?;
        Self::with_allocator(allocator, LifoConfig::with_hint(chunk_hint, flags))
    }
}

impl<A: ChunkAllocator> Lifo<A> {
    /// Create an arena that draws memory from `allocator`
    ///
    /// Allocates the first chunk and carves the bottom mark from it.
    pub fn with_allocator(allocator: A, config: LifoConfig) -> Result<Self> {
        config.validate()?;
        let chunk_size = config.effective_chunk_size();
        let flags = config.flags();

        let Some(ptr) = allocator.allocate(chunk_size) else {
            if flags.contains(LifoFlags::PANIC_ON_FAIL) {
                panic!("Could not initialize memlifo: {} byte chunk", chunk_size);
            }
            log::warn!("memlifo init: failed to allocate {} byte chunk", chunk_size);
            return Err(LifoError::OutOfMemory {
                requested: chunk_size,
            });
        };

        let id = NEXT_LIFO_ID.fetch_add(1, Ordering::Relaxed);
        let bottom = MarkState {
            magic: MARK_MAGIC,
            seq: 1,
            id: 0,
            lifo_id: id,
            chunk_count: 1,
            big_count: 0,
            free: MARK_FOOTPRINT,
            last_alloc: None,
        };

        log::debug!("memlifo {}: initialized, chunk size {}", id, chunk_size);

        Ok(Self {
            magic: LIFO_MAGIC,
            id,
            allocator,
            chunk_size,
            flags,
            chunks: vec![Block { ptr, size: chunk_size }],
            big_blocks: Vec::new(),
            marks: vec![bottom],
            bottom_id: 0,
            next_mark_id: 1,
        })
    }

    /// Allocate `size` bytes, rounded up to the alignment
    pub fn alloc(&mut self, size: usize) -> Result<NonNull<u8>> {
        self.alloc_raw(size, false)
            .map(|(ptr, _)| ptr)
            .map_err(|err| self.fail(err))
    }

    /// Allocate at least `min_size` bytes
    ///
    /// When the request is served from the current chunk the rest of that
    /// chunk is claimed as well. Returns the pointer and the usable size.
    pub fn alloc_min(&mut self, min_size: usize) -> Result<(NonNull<u8>, usize)> {
        self.alloc_raw(min_size, true).map_err(|err| self.fail(err))
    }

    /// Chunk size in use after clamping and rounding
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn flags(&self) -> LifoFlags {
        self.flags
    }

    /// Free bytes left in the current chunk
    pub fn remaining(&self) -> usize {
        self.current_chunk().size - self.top().free
    }

    /// Release all memory held by the arena
    pub fn close(self) {
        drop(self)
    }

    pub(crate) fn alloc_raw(
        &mut self,
        size: usize,
        claim_rest: bool,
    ) -> Result<(NonNull<u8>, usize)> {
        if size == 0 || size > MAX_ALLOC {
            return Err(LifoError::InvalidSize { size });
        }
        let sz = align_up(size);
        let top = self.top_index();
        let chunk = self.current_chunk();
        let free = self.marks[top].free;
        let remaining = chunk.size - free;

        if sz <= remaining {
            let actual = if claim_rest { remaining } else { sz };
            // SAFETY: free + actual <= chunk.size
            let ptr = unsafe { chunk.at(free) };
            let mark = &mut self.marks[top];
            mark.free = free + actual;
            mark.last_alloc = Some(ptr);
            return Ok((ptr, actual));
        }

        if remaining < self.chunk_size / 8 {
            // Oversize the chunk for large requests so the next ones fit too
            let new_chunk_size = if sz > self.chunk_size / 2 {
                sz.checked_add(self.chunk_size)
                    .filter(|&n| n <= MAX_ALLOC)
                    .unwrap_or(sz)
            } else {
                self.chunk_size
            };
            let block = self.acquire(new_chunk_size)?;
            self.chunks.push(block);
            let chunk_count = self.chunks.len();
            let mark = &mut self.marks[top];
            mark.chunk_count = chunk_count;
            mark.free = sz;
            mark.last_alloc = Some(block.ptr);
            log::trace!(
                "memlifo {}: new chunk {} of {} bytes",
                self.id,
                chunk_count,
                new_chunk_size
            );
            Ok((block.ptr, sz))
        } else {
            let block = self.acquire(sz)?;
            self.big_blocks.push(block);
            let big_count = self.big_blocks.len();
            let mark = &mut self.marks[top];
            mark.big_count = big_count;
            mark.last_alloc = Some(block.ptr);
            log::trace!("memlifo {}: big block of {} bytes", self.id, sz);
            Ok((block.ptr, sz))
        }
    }

    #[inline]
    pub(crate) fn top_index(&self) -> usize {
        self.marks.len() - 1
    }

    #[inline]
    pub(crate) fn top(&self) -> &MarkState {
        &self.marks[self.top_index()]
    }

    #[inline]
    pub(crate) fn top_mut(&mut self) -> &mut MarkState {
        let top = self.top_index();
        &mut self.marks[top]
    }

    #[inline]
    pub(crate) fn current_chunk(&self) -> Block {
        self.chunks[self.top().chunk_count - 1]
    }

    pub(crate) fn acquire(&mut self, size: usize) -> Result<Block> {
        match self.allocator.allocate(size) {
            Some(ptr) => Ok(Block { ptr, size }),
            None => {
                log::warn!("memlifo {}: failed to allocate {} bytes", self.id, size);
                Err(LifoError::OutOfMemory { requested: size })
            }
        }
    }

    /// # Safety
    ///
    /// `block` must have been obtained from `acquire` and no longer be
    /// referenced by the chunk or big-block stacks.
    pub(crate) unsafe fn release(&self, block: Block) {
        self.allocator.deallocate(block.ptr, block.size)
    }

    /// Apply the panic-on-failure policy
    pub(crate) fn fail(&self, err: LifoError) -> LifoError {
        if self.flags.contains(LifoFlags::PANIC_ON_FAIL) {
            panic!("memlifo {}: {}", self.id, err);
        }
        err
    }

    /// Free every chunk and big block above the first `chunk_count` and
    /// `big_count` entries. Big blocks go first.
    pub(crate) fn release_above(&mut self, chunk_count: usize, big_count: usize) {
        while self.big_blocks.len() > big_count {
            if let Some(block) = self.big_blocks.pop() {
                // SAFETY: popped from the stack, nothing refers to it now
                unsafe { self.release(block) };
            }
        }
        while self.chunks.len() > chunk_count {
            if let Some(block) = self.chunks.pop() {
                // SAFETY: as above
                unsafe { self.release(block) };
            }
        }
    }
}

impl<A: ChunkAllocator> Drop for Lifo<A> {
    fn drop(&mut self) {
        log::debug!(
            "memlifo {}: closing, releasing {} chunks and {} big blocks",
            self.id,
            self.chunks.len(),
            self.big_blocks.len()
        );
        self.release_above(0, 0);
        self.marks.clear();
        self.magic = 0;
    }
}

impl<A: ChunkAllocator> std::fmt::Debug for Lifo<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifo")
            .field("id", &self.id)
            .field("chunk_size", &self.chunk_size)
            .field("chunks", &self.chunks.len())
            .field("big_blocks", &self.big_blocks.len())
            .field("marks", &self.marks.len())
            .finish()
    }
}
