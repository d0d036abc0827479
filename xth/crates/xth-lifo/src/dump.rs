//! Arena statistics and structured dumps

use crate::arena::Lifo;
use crate::chunk::ChunkAllocator;
use serde::Serialize;

/// Memory held by an arena
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LifoStats {
    pub chunks: usize,
    pub big_blocks: usize,
    /// Marks including the bottom mark
    pub marks: usize,
    pub chunk_bytes: usize,
    pub big_block_bytes: usize,
    /// Free bytes in the current chunk
    pub remaining: usize,
}

impl LifoStats {
    pub fn total_bytes(&self) -> usize {
        self.chunk_bytes + self.big_block_bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDump {
    pub address: usize,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkDump {
    pub magic: u32,
    pub seq: u32,
    pub chunk_count: usize,
    pub big_block_count: usize,
    pub free_offset: usize,
    pub last_alloc: Option<usize>,
}

/// Snapshot of an arena's internal state, bottom mark first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifoDump {
    pub magic: u32,
    pub chunk_size: usize,
    pub flags: u32,
    pub chunks: Vec<BlockDump>,
    pub big_blocks: Vec<BlockDump>,
    pub marks: Vec<MarkDump>,
}

impl LifoDump {
    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

impl<A: ChunkAllocator> Lifo<A> {
    pub fn stats(&self) -> LifoStats {
        LifoStats {
            chunks: self.chunks.len(),
            big_blocks: self.big_blocks.len(),
            marks: self.marks.len(),
            chunk_bytes: self.chunks.iter().map(|c| c.size).sum(),
            big_block_bytes: self.big_blocks.iter().map(|b| b.size).sum(),
            remaining: self.remaining(),
        }
    }

    pub fn dump(&self) -> LifoDump {
        let block = |b: &crate::chunk::Block| BlockDump {
            address: b.start(),
            size: b.size,
        };
        LifoDump {
            magic: self.magic,
            chunk_size: self.chunk_size,
            flags: self.flags.bits(),
            chunks: self.chunks.iter().map(block).collect(),
            big_blocks: self.big_blocks.iter().map(block).collect(),
            marks: self
                .marks
                .iter()
                .map(|m| MarkDump {
                    magic: m.magic,
                    seq: m.seq,
                    chunk_count: m.chunk_count,
                    big_block_count: m.big_count,
                    free_offset: m.free,
                    last_alloc: m.last_alloc.map(|p| p.as_ptr() as usize),
                })
                .collect(),
        }
    }
}
