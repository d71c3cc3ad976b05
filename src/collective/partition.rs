use crate::error::{NwayError, Result};
use std::ops::Range;

/// Split of a vector into pipelined blocks.
///
/// All blocks hold `block_len` elements except the last, which holds
/// `last_len` with `0 < last_len <= block_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    total_len: usize,
    block_len: usize,
    n_blocks: usize,
    last_len: usize,
}

impl BlockLayout {
    /// Pick the block size for a vector of `total_len` elements.
    ///
    /// `max_block_len` is the largest transfer the substrate should carry in
    /// one write; `max_blocks` bounds pipeline depth (pending notifications
    /// per source).
    pub fn plan(total_len: usize, max_block_len: usize, max_blocks: usize) -> Result<Self> {
        if total_len == 0 {
            return Err(NwayError::config("cannot reduce an empty vector"));
        }
        if max_block_len == 0 || max_blocks == 0 {
            return Err(NwayError::config(
                "block length and block count ceilings must be positive",
            ));
        }

        let block_len = max_block_len.min(total_len);
        let n_blocks = total_len.div_ceil(block_len);
        if n_blocks > max_blocks {
            return Err(NwayError::config(format!(
                "{total_len} elements need {n_blocks} blocks of {block_len}, limit is {max_blocks}"
            )));
        }
        let last_len = total_len - (n_blocks - 1) * block_len;

        Ok(Self {
            total_len,
            block_len,
            n_blocks,
            last_len,
        })
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn n_blocks(&self) -> usize {
        self.n_blocks
    }

    pub fn last_len(&self) -> usize {
        self.last_len
    }

    /// Length of block `block` in elements.
    pub fn len_of(&self, block: usize) -> usize {
        debug_assert!(block < self.n_blocks, "block {block} out of range");
        if block + 1 == self.n_blocks {
            self.last_len
        } else {
            self.block_len
        }
    }

    /// Element range covered by block `block`.
    pub fn range(&self, block: usize) -> Range<usize> {
        let start = block * self.block_len;
        start..start + self.len_of(block)
    }
}

/// Bound the requested fan-in by the world size.
///
/// More children than `world - 1` are never useful. The notification id space
/// needs no fan-in bound: tags are laid out per source rank, so
/// [`TagSpace::new`](super::TagSpace::new) admitting `world * n_blocks` ids
/// already covers every tree shape.
pub fn restrict_fan_in(requested: u32, world: u32) -> Result<u32> {
    if requested < 1 {
        return Err(NwayError::config("fan-in must be at least 1"));
    }
    if world < 1 {
        return Err(NwayError::config("world size must be at least 1"));
    }
    Ok(requested.min(world.saturating_sub(1).max(1)))
}
