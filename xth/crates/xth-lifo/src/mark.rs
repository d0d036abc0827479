//! Marks and frames
//!
//! A mark is a checkpoint. Pushing one freezes the enclosing mark's view of
//! the arena; popping it releases every chunk and big block obtained since,
//! and makes the enclosing mark current again. Popping an interior mark
//! implicitly pops everything above it.
//!
//! A frame is a mark plus one allocation, fused into a single bump when
//! both fit in the current chunk.

use crate::align::{align_up, MAX_ALLOC};
use crate::arena::{Lifo, MarkState, MARK_FOOTPRINT, MARK_MAGIC};
use crate::chunk::ChunkAllocator;
use crate::error::{LifoError, Result};
use std::ptr::NonNull;

/// Handle to a pushed mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mark {
    lifo_id: u64,
    depth: usize,
    id: u64,
}

impl Mark {
    /// Position on the mark stack; the bottom mark is depth 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_bottom(&self) -> bool {
        self.depth == 0
    }
}

impl<A: ChunkAllocator> Lifo<A> {
    /// Push a new mark
    pub fn push_mark(&mut self) -> Result<Mark> {
        self.push_mark_raw().map_err(|err| self.fail(err))
    }

    /// Pop `mark` and every mark above it
    ///
    /// Popping the bottom mark is a no-op. A handle that was already popped,
    /// or that belongs to another arena, is rejected.
    pub fn pop_mark(&mut self, mark: Mark) -> Result<()> {
        let live = mark.lifo_id == self.id
            && mark.depth < self.marks.len()
            && self.marks[mark.depth].id == mark.id;
        if !live {
            return Err(LifoError::InvalidMark { id: mark.id });
        }
        if mark.is_bottom() {
            return Ok(());
        }
        self.unwind_to(mark.depth - 1);
        Ok(())
    }

    /// Push a mark and allocate `size` bytes under it
    pub fn push_frame(&mut self, size: usize) -> Result<NonNull<u8>> {
        self.push_frame_raw(size, false)
            .map(|(ptr, _)| ptr)
            .map_err(|err| self.fail(err))
    }

    /// Push a mark and allocate at least `min_size` bytes under it
    ///
    /// See [`alloc_min`](Lifo::alloc_min) for how the actual size is chosen.
    pub fn push_frame_min(&mut self, min_size: usize) -> Result<(NonNull<u8>, usize)> {
        self.push_frame_raw(min_size, true)
            .map_err(|err| self.fail(err))
    }

    /// Pop the current mark. No-op when only the bottom mark is left.
    pub fn pop_frame(&mut self) {
        if self.marks.len() > 1 {
            self.unwind_to(self.marks.len() - 2);
        }
    }

    /// Handle for the current mark
    pub fn top_mark(&self) -> Mark {
        self.handle(self.top_index())
    }

    /// Handle for the bottom mark
    pub fn bottom_mark(&self) -> Mark {
        self.handle(0)
    }

    /// Number of marks above the bottom mark
    pub fn mark_depth(&self) -> usize {
        self.marks.len() - 1
    }

    fn handle(&self, depth: usize) -> Mark {
        Mark {
            lifo_id: self.id,
            depth,
            id: self.marks[depth].id,
        }
    }

    fn next_state(&mut self, chunk_count: usize, free: usize) -> MarkState {
        let top = self.top();
        let state = MarkState {
            magic: MARK_MAGIC,
            seq: top.seq + 1,
            id: self.next_mark_id,
            lifo_id: self.id,
            chunk_count,
            big_count: top.big_count,
            free,
            last_alloc: None,
        };
        self.next_mark_id += 1;
        state
    }

    fn push_mark_raw(&mut self) -> Result<Mark> {
        let top = self.top();
        let (top_chunks, top_free) = (top.chunk_count, top.free);

        let (chunk_count, free) = if MARK_FOOTPRINT <= self.remaining() {
            (top_chunks, top_free + MARK_FOOTPRINT)
        } else {
            // Dedicated chunk. The enclosing mark keeps its own chunk list.
            let block = self.acquire(self.chunk_size)?;
            self.chunks.push(block);
            (self.chunks.len(), MARK_FOOTPRINT)
        };

        let state = self.next_state(chunk_count, free);
        self.marks.push(state);
        log::trace!("memlifo {}: push mark {}", self.id, self.mark_depth());
        Ok(self.top_mark())
    }

    fn push_frame_raw(&mut self, size: usize, claim_rest: bool) -> Result<(NonNull<u8>, usize)> {
        if size == 0 || size > MAX_ALLOC {
            return Err(LifoError::InvalidSize { size });
        }
        let sz = align_up(size);
        let chunk = self.current_chunk();
        let top = self.top();
        let (top_chunks, top_free) = (top.chunk_count, top.free);

        let fits = sz
            .checked_add(MARK_FOOTPRINT)
            .is_some_and(|total| total <= chunk.size - top_free);
        if fits {
            let start = top_free + MARK_FOOTPRINT;
            let end = if claim_rest { chunk.size } else { start + sz };
            // SAFETY: start <= end <= chunk.size
            let ptr = unsafe { chunk.at(start) };
            let mut state = self.next_state(top_chunks, end);
            state.last_alloc = Some(ptr);
            self.marks.push(state);
            return Ok((ptr, end - start));
        }

        let mark = self.push_mark_raw()?;
        match self.alloc_raw(size, claim_rest) {
            Ok(result) => Ok(result),
            Err(err) => {
                self.unwind_to(mark.depth - 1);
                Err(err)
            }
        }
    }

    /// Make `marks[depth]` current, releasing everything above it
    pub(crate) fn unwind_to(&mut self, depth: usize) {
        let target = &self.marks[depth];
        let (chunk_count, big_count) = (target.chunk_count, target.big_count);
        self.release_above(chunk_count, big_count);
        self.marks.truncate(depth + 1);
        log::trace!("memlifo {}: popped to mark {}", self.id, depth);
    }
}
