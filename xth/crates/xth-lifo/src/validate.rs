//! Structural validation of an arena
//!
//! Each violated invariant maps to its own negative diagnostic code so tests
//! and debug hooks can tell failure classes apart.

use crate::arena::{Lifo, LIFO_MAGIC, MARK_MAGIC};
use crate::chunk::ChunkAllocator;
use thiserror::Error;

/// A violated arena invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Corruption {
    #[error("arena magic is corrupt")]
    BadArenaMagic,

    #[error("mark {depth} refers to chunks or big blocks that do not exist")]
    BrokenBlockList { depth: usize },

    #[error("arena has no bottom mark")]
    MissingMarks,

    #[error("mark {depth} magic is corrupt")]
    BadMarkMagic { depth: usize },

    #[error("mark {depth} has sequence {found}, expected {expected}")]
    SequenceGap {
        depth: usize,
        expected: u32,
        found: u32,
    },

    #[error("mark {depth} belongs to another arena")]
    ForeignMark { depth: usize },

    #[error("mark walk did not end at the bottom mark")]
    BottomMismatch,

    #[error("mark {depth} last allocation lies below its chunk")]
    LastAllocBelowChunk { depth: usize },

    #[error("mark {depth} last allocation is outside its chunk and not a big block")]
    LastAllocOutsideChunk { depth: usize },

    #[error("mark {depth} free offset is past the end of its chunk")]
    FreePastChunkEnd { depth: usize },
}

impl Corruption {
    /// Negative diagnostic code for this violation
    pub fn code(&self) -> i32 {
        match self {
            Corruption::BadArenaMagic => -1,
            Corruption::BrokenBlockList { .. } => -2,
            Corruption::MissingMarks => -3,
            Corruption::BadMarkMagic { .. } => -4,
            Corruption::SequenceGap { .. } => -5,
            Corruption::ForeignMark { .. } => -6,
            Corruption::BottomMismatch => -7,
            Corruption::LastAllocBelowChunk { .. } => -8,
            Corruption::LastAllocOutsideChunk { .. } => -9,
            Corruption::FreePastChunkEnd { .. } => -10,
        }
    }
}

impl<A: ChunkAllocator> Lifo<A> {
    /// Check the arena's internal invariants
    ///
    /// Walks the mark stack from the current mark down to the bottom mark.
    pub fn validate(&self) -> Result<(), Corruption> {
        if self.magic != LIFO_MAGIC {
            return Err(Corruption::BadArenaMagic);
        }
        if self.marks.is_empty() {
            return Err(Corruption::MissingMarks);
        }

        let mut above: Option<(usize, usize)> = None;
        for (depth, mark) in self.marks.iter().enumerate().rev() {
            if mark.magic != MARK_MAGIC {
                return Err(Corruption::BadMarkMagic { depth });
            }
            let expected = depth as u32 + 1;
            if mark.seq != expected {
                return Err(Corruption::SequenceGap {
                    depth,
                    expected,
                    found: mark.seq,
                });
            }
            if mark.lifo_id != self.id {
                return Err(Corruption::ForeignMark { depth });
            }

            // Lists only grow going up the stack
            let (chunk_limit, big_limit) = above.unwrap_or((self.chunks.len(), self.big_blocks.len()));
            if mark.chunk_count == 0 || mark.chunk_count > chunk_limit || mark.big_count > big_limit {
                return Err(Corruption::BrokenBlockList { depth });
            }
            above = Some((mark.chunk_count, mark.big_count));

            let chunk = self.chunks[mark.chunk_count - 1];
            if let Some(last) = mark.last_alloc {
                let addr = last.as_ptr() as usize;
                let big_head = mark
                    .big_count
                    .checked_sub(1)
                    .map(|i| self.big_blocks[i].start());
                if big_head != Some(addr) {
                    if addr < chunk.start() {
                        return Err(Corruption::LastAllocBelowChunk { depth });
                    }
                    if !chunk.contains(addr) {
                        return Err(Corruption::LastAllocOutsideChunk { depth });
                    }
                }
            }

            if mark.free > chunk.size {
                return Err(Corruption::FreePastChunkEnd { depth });
            }
        }

        if self.marks[0].id != self.bottom_id {
            return Err(Corruption::BottomMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LifoConfig;
    use std::ptr::NonNull;

    fn busy_arena() -> Lifo {
        let mut lifo = Lifo::new(LifoConfig {
            chunk_size: 8192,
            ..Default::default()
        })
        .unwrap();
        lifo.alloc(100).unwrap();
        lifo.push_mark().unwrap();
        lifo.alloc(200).unwrap();
        lifo.push_mark().unwrap();
        lifo.alloc(20000).unwrap();
        lifo
    }

    #[test]
    fn test_valid_arena() {
        let lifo = busy_arena();
        assert_eq!(lifo.validate(), Ok(()));
    }

    #[test]
    fn test_bad_arena_magic() {
        let mut lifo = busy_arena();
        lifo.magic = 0;
        let err = lifo.validate().unwrap_err();
        assert_eq!(err, Corruption::BadArenaMagic);
        assert_eq!(err.code(), -1);
        lifo.magic = LIFO_MAGIC;
    }

    #[test]
    fn test_bad_mark_magic() {
        let mut lifo = busy_arena();
        lifo.marks[1].magic = 7;
        assert_eq!(lifo.validate().unwrap_err().code(), -4);
    }

    #[test]
    fn test_sequence_gap() {
        let mut lifo = busy_arena();
        lifo.marks[2].seq = 9;
        assert_eq!(lifo.validate().unwrap_err().code(), -5);
    }

    #[test]
    fn test_foreign_mark() {
        let mut lifo = busy_arena();
        lifo.marks[1].lifo_id += 1000;
        assert_eq!(
            lifo.validate(),
            Err(Corruption::ForeignMark { depth: 1 })
        );
    }

    #[test]
    fn test_bottom_mismatch() {
        let mut lifo = busy_arena();
        lifo.marks[0].id = 42;
        assert_eq!(lifo.validate().unwrap_err().code(), -7);
    }

    #[test]
    fn test_last_alloc_outside_chunk() {
        let mut lifo = busy_arena();
        let chunk = lifo.chunks[0];
        lifo.marks[1].last_alloc = NonNull::new((chunk.end() + 64) as *mut u8);
        assert_eq!(lifo.validate().unwrap_err().code(), -9);
    }

    #[test]
    fn test_last_alloc_below_chunk() {
        let mut lifo = busy_arena();
        let chunk = lifo.chunks[0];
        lifo.marks[1].last_alloc = NonNull::new((chunk.start() - 64) as *mut u8);
        assert_eq!(
            lifo.validate(),
            Err(Corruption::LastAllocBelowChunk { depth: 1 })
        );
    }

    #[test]
    fn test_free_past_chunk_end() {
        let mut lifo = busy_arena();
        lifo.marks[0].free = lifo.chunks[0].size + 8;
        assert_eq!(lifo.validate().unwrap_err().code(), -10);
    }

    #[test]
    fn test_broken_block_list() {
        let mut lifo = busy_arena();
        lifo.marks[1].big_count = 5;
        assert_eq!(lifo.validate().unwrap_err().code(), -2);
    }

    #[test]
    fn test_big_block_last_alloc_is_valid() {
        let lifo = busy_arena();
        let top = lifo.marks.last().unwrap();
        assert_eq!(top.last_alloc, Some(lifo.big_blocks[0].ptr));
        assert!(lifo.validate().is_ok());
    }
}
